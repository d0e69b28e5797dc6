//! Three-state optional fields
//!
//! A plain `Option<T>` cannot tell "not provided" apart from "explicitly
//! cleared". Partial-update requests need both, so every optional attribute of
//! a request or response type is a [`Field<T>`]:
//!
//! - [`Field::Absent`] - not provided, omitted from the wire payload
//! - [`Field::Null`] - explicitly cleared, sent as JSON `null`
//! - [`Field::Set`] - provided, sent verbatim even when it is a zero value
//!
//! When used with serde directly, pair it with
//! `#[serde(default, skip_serializing_if = "Field::is_absent")]` so a missing
//! key decodes to `Absent` and `Absent` never reaches the output.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Three-state optional value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field<T> {
    /// Not provided
    Absent,
    /// Explicitly null
    Null,
    /// Provided value (zero values included)
    Set(T),
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Field::Absent
    }
}

impl<T> Field<T> {
    /// Replace the state with `Set(value)`
    pub fn set(&mut self, value: T) {
        *self = Field::Set(value);
    }

    /// Replace the state with `Null`, dropping any held value
    pub fn set_null(&mut self) {
        *self = Field::Null;
    }

    /// Return the field to `Absent`
    pub fn clear(&mut self) {
        *self = Field::Absent;
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Field::Absent)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Field::Null)
    }

    pub fn is_set(&self) -> bool {
        matches!(self, Field::Set(_))
    }

    /// Borrow the held value, if any
    pub fn value(&self) -> Option<&T> {
        match self {
            Field::Set(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_ref(&self) -> Field<&T> {
        match self {
            Field::Absent => Field::Absent,
            Field::Null => Field::Null,
            Field::Set(v) => Field::Set(v),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Field<U> {
        match self {
            Field::Absent => Field::Absent,
            Field::Null => Field::Null,
            Field::Set(v) => Field::Set(f(v)),
        }
    }

    /// Collapse to an `Option`, losing the absent/null distinction
    pub fn into_option(self) -> Option<T> {
        match self {
            Field::Set(v) => Some(v),
            _ => None,
        }
    }

    /// Layer `higher` over `self`.
    ///
    /// An absent higher value leaves `self` intact; anything else (including
    /// an explicit null) replaces it.
    #[must_use]
    pub fn merge(self, higher: Field<T>) -> Field<T> {
        match higher {
            Field::Absent => self,
            other => other,
        }
    }
}

impl<T: Clone> Field<T> {
    /// Borrowing form of [`Field::merge`]
    #[must_use]
    pub fn merged(&self, higher: &Field<T>) -> Field<T> {
        self.clone().merge(higher.clone())
    }
}

impl Field<String> {
    pub fn as_deref(&self) -> Option<&str> {
        self.value().map(String::as_str)
    }
}

impl<T> From<T> for Field<T> {
    fn from(value: T) -> Self {
        Field::Set(value)
    }
}

impl<T> From<Option<T>> for Field<T> {
    /// `None` becomes an explicit null
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Field::Set(v),
            None => Field::Null,
        }
    }
}

impl From<&str> for Field<String> {
    fn from(value: &str) -> Self {
        Field::Set(value.to_string())
    }
}

impl<T: Serialize> Serialize for Field<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Field::Set(v) => v.serialize(serializer),
            Field::Absent | Field::Null => serializer.serialize_none(),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Field<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Only reached when the key is present; a missing key takes the default.
        Option::<T>::deserialize(deserializer).map(Field::from)
    }
}
