//! Three-valued transform decisions
//!
//! A stage cannot always tell whether a payload needs work: an early
//! progressive chunk may not even reveal its format yet. `Unset` defers
//! the call until a later payload settles it.

use serde::{Deserialize, Serialize};

/// Outcome of asking whether a payload should be transformed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    /// The payload should be transformed
    Yes,
    /// The payload should pass through untouched
    No,
    /// Not enough information yet; retry on the next payload
    Unset,
}

impl Decision {
    /// Maps a settled boolean onto `Yes` or `No`.
    pub fn from_bool(value: bool) -> Self {
        if value {
            Decision::Yes
        } else {
            Decision::No
        }
    }

    /// True unless the decision is still `Unset`
    pub fn is_set(self) -> bool {
        !matches!(self, Decision::Unset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bool() {
        assert_eq!(Decision::from_bool(true), Decision::Yes);
        assert_eq!(Decision::from_bool(false), Decision::No);
    }

    #[test]
    fn test_is_set() {
        assert!(Decision::Yes.is_set());
        assert!(Decision::No.is_set());
        assert!(!Decision::Unset.is_set());
    }
}
