//! Validated property-set name.
//!
//! [`PropertySetName`] is the trailing URL segment that identifies a
//! property set. It becomes a single path element under the configured
//! root, so anything that would change the node hierarchy is rejected.

use std::fmt;

/// Reason a raw name was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    /// The name is empty.
    #[error("Missing property-set name")]
    Empty,

    /// The name contains a `/` and would create nested nodes.
    #[error("Property-set name must not contain '/': {0:?}")]
    Separator(String),

    /// The name contains control characters.
    #[error("Property-set name must not contain control characters: {0:?}")]
    Control(String),

    /// `.` and `..` are not valid node names.
    #[error("Property-set name must not be a relative path element: {0:?}")]
    Relative(String),
}

/// Name of a property set, safe to use as a single node path element.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertySetName(String);

impl PropertySetName {
    /// Validates `raw` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns a [`NameError`] if the name is empty, contains `/` or a
    /// control character, or is `.`/`..`.
    pub fn parse(raw: &str) -> Result<Self, NameError> {
        if raw.is_empty() {
            return Err(NameError::Empty);
        }
        if raw.contains('/') {
            return Err(NameError::Separator(raw.to_string()));
        }
        if raw.chars().any(char::is_control) {
            return Err(NameError::Control(raw.to_string()));
        }
        if raw == "." || raw == ".." {
            return Err(NameError::Relative(raw.to_string()));
        }
        Ok(Self(raw.to_string()))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PropertySetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PropertySetName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
