// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::SelectorConfig;

/// One record from a remote list, keyed by field name.
///
/// The selector never interprets the fields beyond the keys its
/// configuration names, so any endpoint's rows fit without a schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListItem {
    fields: BTreeMap<String, String>,
}

impl ListItem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Missing fields render as empty cells.
    pub fn field(&self, key: &str) -> &str {
        self.get(key).unwrap_or("")
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for ListItem
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LookupSource {
    Supplier,
    Item,
    Unit,
    Size,
    Scrap,
    State,
}

impl LookupSource {
    pub const ALL: [Self; 6] = [
        Self::Unit,
        Self::Size,
        Self::Scrap,
        Self::State,
        Self::Item,
        Self::Supplier,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Supplier => "supplier",
            Self::Item => "item",
            Self::Unit => "unit",
            Self::Size => "size",
            Self::Scrap => "scrap",
            Self::State => "state",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "supplier" => Some(Self::Supplier),
            "item" => Some(Self::Item),
            "unit" => Some(Self::Unit),
            "size" => Some(Self::Size),
            "scrap" => Some(Self::Scrap),
            "state" => Some(Self::State),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Supplier => "suppliers",
            Self::Item => "items",
            Self::Unit => "units",
            Self::Size => "sizes",
            Self::Scrap => "scrap",
            Self::State => "states",
        }
    }

    /// Path under the API base URL that serves this collection page by page.
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::Supplier => "suppliers",
            Self::Item => "items",
            Self::Unit => "units",
            Self::Size => "sizes",
            Self::Scrap => "scraps",
            Self::State => "states",
        }
    }

    pub fn selector_config(self) -> SelectorConfig {
        match self {
            Self::Supplier => SelectorConfig::new("Select supplier")
                .placeholder("search name, code or city")
                .column("code", "Code", 10)
                .column("name", "Name", 28)
                .column("city", "City", 16)
                .column("gstin", "GSTIN", 18)
                .search_fields(["name", "code", "city"]),
            Self::Item => SelectorConfig::new("Select item")
                .placeholder("search item name or code")
                .column("code", "Code", 10)
                .column("name", "Name", 28)
                .column("unit", "Unit", 6)
                .column("purchase_rate", "P.Rate", 10)
                .column("sale_rate", "S.Rate", 10)
                .search_fields(["name", "code"]),
            Self::Unit => SelectorConfig::new("Units")
                .placeholder("search unit")
                .column("code", "Code", 8)
                .column("name", "Unit", 20)
                .column("decimals", "Decimals", 8)
                .search_fields(["name", "code"]),
            Self::Size => SelectorConfig::new("Sizes")
                .placeholder("search size")
                .column("code", "Code", 8)
                .column("name", "Size", 20)
                .search_fields(["name", "code"]),
            Self::Scrap => SelectorConfig::new("Scrap")
                .placeholder("search scrap")
                .column("code", "Code", 8)
                .column("name", "Scrap", 24)
                .column("rate", "Rate", 10)
                .search_fields(["name", "code"]),
            Self::State => SelectorConfig::new("States")
                .placeholder("search state")
                .column("code", "Code", 6)
                .column("name", "State", 24)
                .column("state_code", "GST Code", 8)
                .search_fields(["name", "code"]),
        }
    }
}
