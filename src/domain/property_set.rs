//! Property sets and their JSON representation.
//!
//! A property set is carried as a flat JSON object of strings, both in HTTP
//! bodies and as the payload of its ZooKeeper node. The name never appears
//! in the payload.

use std::collections::BTreeMap;

use serde_json::Value;

use super::PropertySetName;

/// Key/value entries of a property set.
pub type Entries = BTreeMap<String, String>;

/// Reason a payload could not be read as a property set.
#[derive(Debug, thiserror::Error)]
pub enum EntriesError {
    /// The payload is not valid JSON.
    #[error("Malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The payload is valid JSON but not an object.
    #[error("Expected a JSON object of string values, got {0}")]
    NotAnObject(&'static str),

    /// A member of the object is not a string.
    #[error("Value of '{key}' must be a string, got {kind}")]
    NonString {
        /// Offending key.
        key: String,
        /// JSON type of the offending value.
        kind: &'static str,
    },
}

/// A named, flat mapping from string keys to string values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySet {
    name: PropertySetName,
    entries: Entries,
}

impl PropertySet {
    /// Creates an empty property set.
    #[must_use]
    pub fn new(name: PropertySetName) -> Self {
        Self {
            name,
            entries: Entries::new(),
        }
    }

    /// Creates a property set holding `entries`.
    #[must_use]
    pub fn with_entries(name: PropertySetName, entries: Entries) -> Self {
        Self { name, entries }
    }

    /// Decodes a JSON object of strings into a property set.
    ///
    /// # Errors
    ///
    /// Returns an [`EntriesError`] if `payload` is not a JSON object whose
    /// values are all strings.
    pub fn from_json(name: PropertySetName, payload: &[u8]) -> Result<Self, EntriesError> {
        let value: Value = serde_json::from_slice(payload)?;
        let Value::Object(members) = value else {
            return Err(EntriesError::NotAnObject(json_kind(&value)));
        };

        let mut entries = Entries::new();
        for (key, value) in members {
            match value {
                Value::String(s) => {
                    entries.insert(key, s);
                }
                other => {
                    return Err(EntriesError::NonString {
                        key,
                        kind: json_kind(&other),
                    });
                }
            }
        }
        Ok(Self { name, entries })
    }

    /// Serializes the entries as a JSON object.
    ///
    /// # Errors
    ///
    /// Returns a [`serde_json::Error`] if serialization fails.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.entries)
    }

    /// Name of the set.
    #[must_use]
    pub fn name(&self) -> &PropertySetName {
        &self.name
    }

    /// Entries of the set.
    #[must_use]
    pub fn entries(&self) -> &Entries {
        &self.entries
    }

    /// Consumes the set, returning its entries.
    #[must_use]
    pub fn into_entries(self) -> Entries {
        self.entries
    }

    /// Looks up a single value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Sets a value, returning the previous one.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    /// Overwrites entries with those of `update`, keeping keys it omits.
    pub fn merge(&mut self, update: Self) {
        self.entries.extend(update.entries);
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the set has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
