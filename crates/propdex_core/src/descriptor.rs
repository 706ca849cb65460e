//! Property index descriptors.

use crate::error::{IndexError, IndexResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default relevance multiplier for a field.
pub const DEFAULT_BOOST: f32 = 1.0;

/// Sort order declared for an indexed property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IndexType {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
    /// No declared order.
    #[default]
    None,
}

impl IndexType {
    /// The declared name (`"ASC"`, `"DESC"` or `"NONE"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
            Self::None => "NONE",
        }
    }
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexType {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ASC" => Ok(Self::Asc),
            "DESC" => Ok(Self::Desc),
            "" | "NONE" => Ok(Self::None),
            other => Err(IndexError::invalid_argument(format!(
                "unknown index type: {other}"
            ))),
        }
    }
}

/// Describes one indexable property of an entity.
///
/// `field_name` is the attribute name on the entity; `index_name` is the
/// column alias the value is indexed under (`Person.AGE` for a property
/// `age` aliased `AGE`). Everything but the boost is fixed at
/// construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyIndex {
    field_name: String,
    index_name: String,
    index_type: IndexType,
    boost: f32,
}

impl PropertyIndex {
    /// Creates a descriptor with the default boost.
    pub fn new(
        field_name: impl Into<String>,
        index_name: impl Into<String>,
        index_type: IndexType,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            index_name: index_name.into(),
            index_type,
            boost: DEFAULT_BOOST,
        }
    }

    /// Creates a descriptor whose index name equals the field name.
    pub fn named(field_name: impl Into<String>) -> Self {
        let field_name = field_name.into();
        Self::new(field_name.clone(), field_name, IndexType::None)
    }

    /// Parses the index type from its declared name.
    pub fn parse(
        field_name: impl Into<String>,
        index_name: impl Into<String>,
        index_type: &str,
    ) -> IndexResult<Self> {
        Ok(Self::new(field_name, index_name, index_type.parse()?))
    }

    /// Sets the boost, builder style.
    pub fn with_boost(mut self, boost: f32) -> IndexResult<Self> {
        self.set_boost(boost)?;
        Ok(self)
    }

    /// Attribute name on the entity.
    #[must_use]
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    /// Column alias used in the index.
    #[must_use]
    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Declared sort order.
    #[must_use]
    pub fn index_type(&self) -> IndexType {
        self.index_type
    }

    /// Relevance multiplier.
    #[must_use]
    pub fn boost(&self) -> f32 {
        self.boost
    }

    /// Changes the relevance multiplier.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidArgument`] for negative or non-finite values.
    pub fn set_boost(&mut self, boost: f32) -> IndexResult<()> {
        if !boost.is_finite() || boost < 0.0 {
            return Err(IndexError::invalid_argument(format!(
                "boost must be a finite non-negative number, got {boost}"
            )));
        }
        self.boost = boost;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_boost_and_type() {
        let mut pi = PropertyIndex::parse("empName", "EMP_NAME", "ASC").unwrap();
        pi.set_boost(1.2).unwrap();

        assert_eq!(pi.boost(), 1.2f32);
        assert_eq!(pi.index_type().as_str(), "ASC");
        assert_eq!(pi.field_name(), "empName");
        assert_eq!(pi.index_name(), "EMP_NAME");
    }

    #[test]
    fn default_boost() {
        let pi = PropertyIndex::named("age");
        assert_eq!(pi.boost(), DEFAULT_BOOST);
        assert_eq!(pi.index_name(), "age");
        assert_eq!(pi.index_type(), IndexType::None);
    }

    #[test]
    fn rejects_bad_boost() {
        let mut pi = PropertyIndex::named("age");
        assert!(pi.set_boost(-1.0).is_err());
        assert!(pi.set_boost(f32::NAN).is_err());
        assert!(pi.set_boost(f32::INFINITY).is_err());
        assert_eq!(pi.boost(), DEFAULT_BOOST);
        assert!(pi.set_boost(0.0).is_ok());
    }

    #[test]
    fn index_type_parsing() {
        assert_eq!("asc".parse::<IndexType>().unwrap(), IndexType::Asc);
        assert_eq!("DESC".parse::<IndexType>().unwrap(), IndexType::Desc);
        assert_eq!("".parse::<IndexType>().unwrap(), IndexType::None);
        assert!("sideways".parse::<IndexType>().is_err());
        assert_eq!(IndexType::Desc.to_string(), "DESC");
    }
}
