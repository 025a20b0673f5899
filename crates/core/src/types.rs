use std::fmt;

use serde::{Deserialize, Serialize};

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Chip identifier as it appears in the tracker's `id` column.
///
/// Kept as the raw text so integer and string ids both round-trip through
/// the tracker unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChipId(String);

impl ChipId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The id as an integer, when the tracker stores numeric ids.
    pub fn as_integer(&self) -> Option<i64> {
        self.0.parse().ok()
    }

    /// JSON value for the id: a number when the text is a canonical integer
    /// (`"17"`), a string otherwise (`"007"`, `"+5"`, `"c-9"`).
    pub fn to_json(&self) -> serde_json::Value {
        match self.as_integer() {
            Some(n) if n.to_string() == self.0 => serde_json::Value::from(n),
            _ => serde_json::Value::from(self.0.clone()),
        }
    }
}

impl fmt::Display for ChipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChipId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<i64> for ChipId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}
