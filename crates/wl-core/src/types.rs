//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A block or meeting spans no time at all.
    #[error("duration must be positive, got {seconds}s")]
    NonPositiveDuration { seconds: i64 },

    /// The lunch window does not describe a forward range within one day.
    #[error("lunch window start {start} must be before end {end}")]
    InvalidLunchWindow { start: String, end: String },

    /// Unknown merge policy name.
    #[error("invalid merge policy: {value}")]
    InvalidMergePolicy { value: String },
}

/// Generates a validated string newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new value after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the value as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated issue key.
    ///
    /// Usually a tracker ticket key such as `PRJ-42`, but raw branch names
    /// (`main`, `support`, `2.3.1`) are accepted as well. Must be non-blank.
    IssueKey, "issue key"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_key_rejects_empty() {
        assert!(IssueKey::new("").is_err());
        assert!(IssueKey::new("   ").is_err());
        assert!(IssueKey::new("PRJ-1").is_ok());
    }

    #[test]
    fn issue_key_serializes_as_plain_string() {
        let key = IssueKey::new("PRJ-12").unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"PRJ-12\"");
        let parsed: IssueKey = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, key);
    }

    #[test]
    fn issue_key_serde_rejects_empty() {
        let result: Result<IssueKey, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }

    #[test]
    fn issue_key_as_ref() {
        let key = IssueKey::new("main").unwrap();
        let s: &str = key.as_ref();
        assert_eq!(s, "main");
    }
}
