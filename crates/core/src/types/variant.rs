//! Size/color variant keys.
//!
//! Cart lines are keyed by `"size_color"`, e.g. `"M_navy blue"`. Sizes never
//! contain an underscore, so the key splits on the first `_` and everything
//! after it is the color.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Errors that can occur when parsing a [`VariantKey`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VariantKeyError {
    /// The key has no `_` separator.
    #[error("variant key must look like size_color, got {0:?}")]
    MissingSeparator(String),
    /// The size part is empty.
    #[error("variant size cannot be empty")]
    EmptySize,
    /// The color part is empty.
    #[error("variant color cannot be empty")]
    EmptyColor,
}

/// A product variant identified by size and color.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariantKey {
    size: String,
    color: String,
}

impl VariantKey {
    /// Build a key from its parts.
    ///
    /// # Errors
    ///
    /// Returns an error if either part is blank or the size contains `_`.
    pub fn new(size: &str, color: &str) -> Result<Self, VariantKeyError> {
        let size = size.trim();
        let color = color.trim();
        if size.is_empty() {
            return Err(VariantKeyError::EmptySize);
        }
        if size.contains('_') {
            return Err(VariantKeyError::MissingSeparator(format!("{size}_{color}")));
        }
        if color.is_empty() {
            return Err(VariantKeyError::EmptyColor);
        }
        Ok(Self {
            size: size.to_owned(),
            color: color.to_owned(),
        })
    }

    /// The size part.
    #[must_use]
    pub fn size(&self) -> &str {
        &self.size
    }

    /// The color part.
    #[must_use]
    pub fn color(&self) -> &str {
        &self.color
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.size, self.color)
    }
}

impl FromStr for VariantKey {
    type Err = VariantKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (size, color) = s
            .split_once('_')
            .ok_or_else(|| VariantKeyError::MissingSeparator(s.to_owned()))?;
        Self::new(size, color)
    }
}

impl Serialize for VariantKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VariantKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_color_keeps_later_underscores() {
        let key: VariantKey = "XL_sea_green".parse().unwrap();
        assert_eq!(key.size(), "XL");
        assert_eq!(key.color(), "sea_green");
        assert_eq!(key.to_string(), "XL_sea_green");
    }

    #[test]
    fn test_missing_separator() {
        assert!(matches!(
            "M".parse::<VariantKey>(),
            Err(VariantKeyError::MissingSeparator(_))
        ));
    }

    #[test]
    fn test_blank_parts_rejected() {
        assert_eq!(VariantKey::new(" ", "red"), Err(VariantKeyError::EmptySize));
        assert_eq!(VariantKey::new("M", ""), Err(VariantKeyError::EmptyColor));
    }

    #[test]
    fn test_size_with_underscore_rejected() {
        assert!(VariantKey::new("X_L", "red").is_err());
    }

    #[test]
    fn test_serializes_as_string() {
        let key = VariantKey::new("S", "black").unwrap();
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"S_black\"");
    }
}
