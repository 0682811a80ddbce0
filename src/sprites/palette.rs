use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::Color;

/// Symbolic colour keys mapped to concrete colour values (`#rrggbb`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Palette(BTreeMap<String, String>);

impl Palette {
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Palette(entries)
    }

    /// Resolve a cell value to its colour string. Keys missing from the
    /// palette pass through unchanged and are treated as literal colours.
    pub fn resolve<'a>(&'a self, key: &'a str) -> &'a str {
        self.0.get(key).map(String::as_str).unwrap_or(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Resolve and parse into a terminal colour.
    pub fn color(&self, key: &str) -> Option<Color> {
        Color::parse(self.resolve(key))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
