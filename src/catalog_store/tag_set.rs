//! Tag set codec.
//!
//! Tags and categories live in a single TEXT column each, encoded as a JSON
//! array of strings (`["Classical","Romantic"]`). The same column definition
//! works on any SQL backend, unlike dialect-specific array types.
//!
//! Tags form an ordered set: trimmed, non-empty, no duplicates. Categories use
//! the same encoding but keep whatever list the uploader provided.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TagSetError {
    #[error("empty tag")]
    Empty,

    #[error("tag '{0}' not found")]
    NotFound(String),

    #[error("malformed tag list: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Ordered, deduplicated set of non-empty tags.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "Vec<String>", from = "Vec<String>")]
pub struct TagSet {
    tags: Vec<String>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from raw values: each is trimmed, blanks are dropped and
    /// only the first occurrence of a value is kept.
    pub fn from_values<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for value in values {
            let _ = set.insert(value.as_ref());
        }
        set
    }

    /// Decodes the stored representation. Empty text decodes to an empty set.
    pub fn decode(text: &str) -> Result<Self, TagSetError> {
        Ok(Self::from_values(decode_list(text)?))
    }

    pub fn encode(&self) -> String {
        encode_list(&self.tags)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Adds `value` (trimmed). Returns `Ok(false)` when it was already present.
    pub fn insert(&mut self, value: &str) -> Result<bool, TagSetError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(TagSetError::Empty);
        }
        if self.contains(value) {
            return Ok(false);
        }
        self.tags.push(value.to_string());
        Ok(true)
    }

    /// Removes the exact match of `value` (trimmed).
    pub fn remove(&mut self, value: &str) -> Result<(), TagSetError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(TagSetError::Empty);
        }
        let index = self
            .tags
            .iter()
            .position(|t| t == value)
            .ok_or_else(|| TagSetError::NotFound(value.to_string()))?;
        self.tags.remove(index);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl From<Vec<String>> for TagSet {
    fn from(values: Vec<String>) -> Self {
        Self::from_values(values)
    }
}

impl From<TagSet> for Vec<String> {
    fn from(set: TagSet) -> Self {
        set.tags
    }
}

/// Appends `value` to the encoded set `current` and returns the new encoding.
/// Appending a value that is already present leaves the encoding unchanged.
pub fn append(current: &str, value: &str) -> Result<String, TagSetError> {
    let mut set = TagSet::decode(current)?;
    if set.insert(value)? {
        Ok(set.encode())
    } else {
        Ok(current.to_string())
    }
}

/// Removes `value` from the encoded set `current` and returns the new encoding.
pub fn remove(current: &str, value: &str) -> Result<String, TagSetError> {
    let mut set = TagSet::decode(current)?;
    set.remove(value)?;
    Ok(set.encode())
}

/// Encodes a plain list (no deduplication), as used for categories.
pub fn encode_list<S: Serialize>(values: &[S]) -> String {
    // A slice of strings always serializes
    serde_json::to_string(values).unwrap_or_else(|_| String::from("[]"))
}

/// Decodes a plain list. Empty text and JSON `null` decode to an empty list.
pub fn decode_list(text: &str) -> Result<Vec<String>, serde_json::Error> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    let values: Option<Vec<String>> = serde_json::from_str(text)?;
    Ok(values.unwrap_or_default())
}
