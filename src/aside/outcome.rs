//! Cached outcome of an adapted operation.

use serde::{Deserialize, Serialize};

/// Result of an operation that may legitimately produce nothing.
///
/// Caching `Null` separates "ran and produced no value" from "never ran":
/// a stored `Null` is a hit, and a hit short-circuits the underlying
/// operation just like a stored value does.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum CachedOutcome<V> {
    /// The operation completed and produced no value.
    Null,
    /// The operation produced this value.
    Value(V),
}

impl<V> CachedOutcome<V> {
    /// Wrap an optional result, mapping `None` to [`Null`](Self::Null).
    pub fn from_option(value: Option<V>) -> Self {
        match value {
            Some(value) => CachedOutcome::Value(value),
            None => CachedOutcome::Null,
        }
    }

    /// Whether this outcome records an absent result.
    pub const fn is_null(&self) -> bool {
        matches!(self, CachedOutcome::Null)
    }

    /// The value, if any.
    pub fn value(&self) -> Option<&V> {
        match self {
            CachedOutcome::Value(value) => Some(value),
            CachedOutcome::Null => None,
        }
    }

    /// Unwrap into an optional value.
    pub fn into_value(self) -> Option<V> {
        match self {
            CachedOutcome::Value(value) => Some(value),
            CachedOutcome::Null => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_option_round_trips() {
        assert_eq!(
            CachedOutcome::from_option(Some(7u32)).into_value(),
            Some(7)
        );
        assert_eq!(CachedOutcome::<u32>::from_option(None).into_value(), None);
        assert!(CachedOutcome::<u32>::Null.is_null());
        assert!(!CachedOutcome::Value(1u32).is_null());
    }

    #[test]
    fn serialized_form_tags_the_outcome() {
        let stored = serde_json::to_string(&CachedOutcome::Value(7u32)).unwrap();
        assert_eq!(stored, r#"{"outcome":"value","value":7}"#);

        let absent = serde_json::to_string(&CachedOutcome::<u32>::Null).unwrap();
        assert_eq!(absent, r#"{"outcome":"null"}"#);

        let back: CachedOutcome<u32> = serde_json::from_str(&stored).unwrap();
        assert_eq!(back, CachedOutcome::Value(7));
    }
}
