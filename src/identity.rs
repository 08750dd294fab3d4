// (c) Copyright 2025 Helsing GmbH. All rights reserved.
//! Stable identities for sequence elements.
//!
//! Without configuration, sequence elements are compared to the initial element at the same
//! index. An [`ArrayIdentity`] entry maps a sequence's path pattern (indices stripped, see
//! [`FieldPath::pattern`]) to the name of a key field; elements of such sequences are compared
//! to the initial element carrying the same key value instead, so reordering alone never makes
//! a form dirty.

use crate::{FieldPath, Segment, error::ConfigError};
use ahash::AHashMap;

/// Pattern to identity key field, fixed when the form is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArrayIdentity {
    keys: AHashMap<String, String>,
}

impl ArrayIdentity {
    /// No identities: every sequence is compared by position.
    pub fn none() -> Self {
        Self::default()
    }

    /// Builds the identity table, rejecting patterns that are not index-free dotted paths and
    /// empty key field names.
    ///
    /// ```
    /// use formstate::ArrayIdentity;
    ///
    /// let identity = ArrayIdentity::new([("groups.items", "id")]).unwrap();
    /// assert_eq!(identity.key_for("groups.items"), Some("id"));
    /// assert!(ArrayIdentity::new([("groups.0.items", "id")]).is_err());
    /// ```
    pub fn new<I, P, K>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (P, K)>,
        P: Into<String>,
        K: Into<String>,
    {
        let mut keys = AHashMap::new();
        for (pattern, key) in entries {
            let (pattern, key) = (pattern.into(), key.into());
            let parsed = FieldPath::parse(&pattern)?;
            if parsed.segments().iter().any(Segment::is_index) {
                return Err(ConfigError::IndexInPattern { pattern });
            }
            if key.is_empty() {
                return Err(ConfigError::EmptyIdentityKey { pattern });
            }
            keys.insert(pattern, key);
        }
        Ok(Self { keys })
    }

    /// The identity key field for sequences at `pattern`, if any.
    pub fn key_for(&self, pattern: &str) -> Option<&str> {
        self.keys.get(pattern).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_patterns() {
        assert!(matches!(
            ArrayIdentity::new([("a..b", "id")]),
            Err(ConfigError::InvalidPattern(_))
        ));
        assert!(matches!(
            ArrayIdentity::new([("a.1", "id")]),
            Err(ConfigError::IndexInPattern { pattern }) if pattern == "a.1"
        ));
        assert!(matches!(
            ArrayIdentity::new([("a", "")]),
            Err(ConfigError::EmptyIdentityKey { .. })
        ));
    }

    #[test]
    fn root_sequences_may_have_an_identity() {
        let identity = ArrayIdentity::new([("", "id")]).unwrap();
        assert_eq!(identity.key_for(""), Some("id"));
        assert_eq!(identity.key_for("other"), None);
    }

    #[test]
    fn none_is_empty() {
        assert!(ArrayIdentity::none().is_empty());
    }
}
