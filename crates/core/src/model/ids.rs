use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique identifier for a subject (the person taking an assessment).
///
/// Supplied by the authentication collaborator; opaque to this crate.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubjectId(u64);

/// Unique identifier for an instrument (a questionnaire definition).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstrumentId(u64);

/// Unique identifier for an item within an instrument.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(u64);

/// Unique identifier for a selectable option on an item.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OptionId(u64);

macro_rules! impl_u64_id {
    ($name:ident) => {
        impl $name {
            #[must_use]
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the underlying u64 value
            #[must_use]
            pub fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<u64>().map($name::new).map_err(|_| ParseIdError {
                    kind: stringify!($name).to_string(),
                })
            }
        }
    };
}

impl_u64_id!(SubjectId);
impl_u64_id!(InstrumentId);
impl_u64_id!(ItemId);
impl_u64_id!(OptionId);

/// Row-backed identifier for an assignment record.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssignmentId(i64);

/// Row-backed identifier for a response record.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResponseId(i64);

macro_rules! impl_i64_id {
    ($name:ident) => {
        impl $name {
            #[must_use]
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            /// Returns the underlying i64 value
            #[must_use]
            pub fn value(&self) -> i64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

impl_i64_id!(AssignmentId);
impl_i64_id!(ResponseId);

/// Identifier for a forced-choice type (e.g. the nine types of an
/// enneagram-style instrument).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeTag(u8);

impl TypeTag {
    #[must_use]
    pub fn new(tag: u8) -> Self {
        Self(tag)
    }

    /// Returns the underlying u8 value
    #[must_use]
    pub fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Debug for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeTag({})", self.0)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TypeTag {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u8>().map(TypeTag::new).map_err(|_| ParseIdError {
            kind: "TypeTag".to_string(),
        })
    }
}

/// Error type for parsing an ID from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: String,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_id_display() {
        let id = SubjectId::new(42);
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn instrument_id_from_str() {
        let id: InstrumentId = "123".parse().unwrap();
        assert_eq!(id, InstrumentId::new(123));
    }

    #[test]
    fn item_id_from_str_invalid() {
        let result = "not-a-number".parse::<ItemId>();
        assert!(result.is_err());
    }

    #[test]
    fn type_tag_orders_numerically() {
        assert!(TypeTag::new(3) < TypeTag::new(7));
    }

    #[test]
    fn response_id_roundtrips_value() {
        let id = ResponseId::new(-1);
        assert_eq!(id.value(), -1);
    }

    #[test]
    fn option_id_roundtrip() {
        let original = OptionId::new(42);
        let serialized = original.to_string();
        let deserialized: OptionId = serialized.parse().unwrap();
        assert_eq!(original, deserialized);
    }
}
