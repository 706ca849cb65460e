//! Scalar values read from entity attributes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Enums indexed by their declared variant name.
///
/// Indexing by name rather than ordinal keeps stored values stable when
/// variants are reordered and lets queries use the readable name
/// (`Person.DAY:TUESDAY`).
pub trait EnumLabel {
    /// The declared name of this variant.
    fn label(&self) -> &'static str;
}

/// A scalar attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Absent value; never written to a document.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// Text.
    Text(String),
    /// Enum variant by declared name.
    Enum(String),
}

impl FieldValue {
    /// Builds an enum value from its label.
    pub fn from_enum<E: EnumLabel>(value: &E) -> Self {
        Self::Enum(value.label().to_string())
    }

    /// Returns true for [`FieldValue::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Renders the value as index text.
    ///
    /// Floats always carry a fractional part (`1.0`, not `1`) so that the
    /// same number indexes identically whatever its magnitude.
    #[must_use]
    pub fn to_index_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Float(f) => {
                if f.is_finite() && f.fract() == 0.0 {
                    format!("{f:.1}")
                } else {
                    f.to_string()
                }
            }
            Self::Text(s) | Self::Enum(s) => s.clone(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_index_text())
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

macro_rules! int_from {
    ($($t:ty),*) => {
        $(impl From<$t> for FieldValue {
            fn from(value: $t) -> Self {
                Self::Int(i64::from(value))
            }
        })*
    };
}

int_from!(i8, i16, i32, i64, u8, u16, u32);

impl From<f32> for FieldValue {
    /// Widens through the shortest decimal form of the `f32`, so `1.2f32`
    /// renders as `1.2` rather than `1.2000000476837158`.
    fn from(value: f32) -> Self {
        let widened = value
            .to_string()
            .parse::<f64>()
            .unwrap_or_else(|_| f64::from(value));
        Self::Float(widened)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<&String> for FieldValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}
