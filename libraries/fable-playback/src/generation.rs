//! Session generation counter
//!
//! Every timer and every media request is stamped with the generation that was
//! current when it was scheduled. Page changes, language changes, resets and
//! teardown advance the generation first, so anything stamped earlier becomes
//! a no-op when it eventually fires.

use serde::{Deserialize, Serialize};

/// Monotonic session generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Generation(u64);

impl Generation {
    /// Fresh generation for a new session
    pub fn new() -> Self {
        Self(0)
    }

    /// Advance to the next generation and return it
    pub fn advance(&mut self) -> Self {
        self.0 += 1;
        *self
    }

    /// Raw counter value
    pub fn value(self) -> u64 {
        self.0
    }

    /// Whether work stamped with `stamp` is still current
    pub fn is_current(self, stamp: Generation) -> bool {
        self == stamp
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_invalidates_older_stamps() {
        let mut generation = Generation::new();
        let stamp = generation;
        assert!(generation.is_current(stamp));

        generation.advance();
        assert!(!generation.is_current(stamp));
        assert!(generation > stamp);
    }
}
