// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod calculator;
pub mod forms;
pub mod ids;
pub mod invoice;
pub mod model;
pub mod selector;
pub mod state;
pub mod suppression;

pub use calculator::*;
pub use forms::*;
pub use ids::*;
pub use invoice::*;
pub use model::*;
pub use selector::*;
pub use state::*;
pub use suppression::*;
