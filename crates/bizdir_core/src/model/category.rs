//! Category reference model.

use serde::{Deserialize, Serialize};

/// Category a business can be listed under.
///
/// Categories are seeded at bootstrap and only ever attached/detached by
/// business writes, never created by them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Internal storage key. Zero for categories that were never resolved.
    #[serde(skip)]
    pub id: i64,
    pub alias: String,
    #[serde(default)]
    pub name: String,
}

impl Category {
    /// Builds an unresolved reference carrying only the alias.
    pub fn with_alias(alias: impl Into<String>) -> Self {
        Self {
            id: 0,
            alias: alias.into(),
            name: String::new(),
        }
    }
}
