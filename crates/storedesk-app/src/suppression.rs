// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::time::{Duration, Instant};

pub const DEFAULT_SUPPRESSION_TTL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuppressionToken<K> {
    pub key: K,
    pub armed_at: Instant,
    pub ttl: Duration,
}

impl<K> SuppressionToken<K> {
    pub fn is_live(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.armed_at) < self.ttl
    }
}

/// Swallows one follow-up key after an overlay closes, so the key that
/// confirmed the overlay does not also act on the screen underneath.
///
/// The token is spent by the very next event, matching or not, and never
/// fires once its ttl has passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSuppression<K> {
    token: Option<SuppressionToken<K>>,
}

impl<K> Default for InputSuppression<K> {
    fn default() -> Self {
        Self { token: None }
    }
}

impl<K: PartialEq> InputSuppression<K> {
    pub fn arm(&mut self, key: K, now: Instant) {
        self.arm_for(key, now, DEFAULT_SUPPRESSION_TTL);
    }

    pub fn arm_for(&mut self, key: K, now: Instant, ttl: Duration) {
        self.token = Some(SuppressionToken {
            key,
            armed_at: now,
            ttl,
        });
    }

    pub fn is_armed(&self) -> bool {
        self.token.is_some()
    }

    /// Returns true when `key` should be ignored.
    pub fn consume(&mut self, key: &K, now: Instant) -> bool {
        self.token
            .take()
            .is_some_and(|token| token.key == *key && token.is_live(now))
    }
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_SUPPRESSION_TTL, InputSuppression};
    use std::time::{Duration, Instant};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Key {
        Enter,
        Tab,
    }

    #[test]
    fn suppresses_exactly_one_matching_event() {
        let mut suppression = InputSuppression::default();
        let now = Instant::now();
        suppression.arm(Key::Enter, now);

        assert!(suppression.consume(&Key::Enter, now));
        assert!(!suppression.consume(&Key::Enter, now));
        assert!(!suppression.is_armed());
    }

    #[test]
    fn other_key_spends_the_token() {
        let mut suppression = InputSuppression::default();
        let now = Instant::now();
        suppression.arm(Key::Enter, now);

        assert!(!suppression.consume(&Key::Tab, now));
        assert!(!suppression.consume(&Key::Enter, now));
    }

    #[test]
    fn expired_token_does_not_suppress() {
        let mut suppression = InputSuppression::default();
        let now = Instant::now();
        suppression.arm(Key::Enter, now);

        assert!(!suppression.consume(&Key::Enter, now + DEFAULT_SUPPRESSION_TTL));
    }

    #[test]
    fn custom_ttl_is_honored() {
        let mut suppression = InputSuppression::default();
        let now = Instant::now();
        suppression.arm_for(Key::Enter, now, Duration::from_secs(2));

        assert!(suppression.consume(&Key::Enter, now + Duration::from_secs(1)));
    }
}
