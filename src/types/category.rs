//! Hierarchical category names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error returned for malformed category names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CategoryError {
    /// A dotted segment was empty (`"a..b"`, `".a"`, `"a."`).
    #[error("empty segment in category name: {0:?}")]
    EmptySegment(String),
    /// The name contained whitespace or control characters.
    #[error("invalid character in category name: {0:?}")]
    InvalidCharacter(String),
}

/// Dotted category path such as `svc.net.http`.
///
/// The empty name is the root category. Every other name has exactly one
/// parent, obtained by dropping the last segment.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CategoryName(String);

impl CategoryName {
    /// Validate and wrap a category name.
    pub fn new(name: impl Into<String>) -> Result<Self, CategoryError> {
        let name = name.into();
        if name.is_empty() {
            return Ok(Self::root());
        }
        if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(CategoryError::InvalidCharacter(name));
        }
        if name.split('.').any(str::is_empty) {
            return Err(CategoryError::EmptySegment(name));
        }
        Ok(Self(name))
    }

    /// The root category.
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Whether this is the root category.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the full dotted name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parent category; `None` for the root.
    pub fn parent(&self) -> Option<CategoryName> {
        if self.is_root() {
            return None;
        }
        Some(match self.0.rsplit_once('.') {
            Some((prefix, _)) => Self(prefix.to_string()),
            None => Self::root(),
        })
    }

    /// Ancestors from the nearest parent up to and including the root.
    pub fn ancestors(&self) -> Vec<CategoryName> {
        let mut out = Vec::new();
        let mut cursor = self.parent();
        while let Some(name) = cursor {
            cursor = name.parent();
            out.push(name);
        }
        out
    }
}

impl fmt::Display for CategoryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            f.write_str("<root>")
        } else {
            f.write_str(&self.0)
        }
    }
}

impl TryFrom<String> for CategoryName {
    type Error = CategoryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for CategoryName {
    type Error = CategoryError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CategoryName> for String {
    fn from(name: CategoryName) -> Self {
        name.0
    }
}
