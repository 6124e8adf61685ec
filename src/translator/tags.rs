//! Label to tag conversion and series identity.

use crate::core::Labels;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stand-in for empty label values. Tags cannot end with `:`.
pub const EMPTY_VALUE_PLACEHOLDER: &str = "n/a";

/// Joins the parts of a series key.
const KEY_SEPARATOR: &str = "}{";

/// Characters escaped with a backslash inside each key part, so that label
/// values containing the separator cannot collide with other tag sets.
const KEY_ESCAPED: [char; 3] = ['\\', '{', '}'];

/// Canonical identity of one (metric name, tag set) combination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesKey(String);

impl SeriesKey {
    /// Builds the key for `name` and `tags`; tag order does not matter.
    pub fn new(name: &str, tags: &[String]) -> Self {
        let mut dimensions: Vec<&str> = tags.iter().map(String::as_str).collect();
        dimensions.push(name);
        dimensions.sort_unstable();

        let mut key = String::with_capacity(dimensions.iter().map(|d| d.len() + 2).sum());
        for (i, dimension) in dimensions.iter().enumerate() {
            if i > 0 {
                key.push_str(KEY_SEPARATOR);
            }
            for c in dimension.chars() {
                if KEY_ESCAPED.contains(&c) {
                    key.push('\\');
                }
                key.push(c);
            }
        }
        SeriesKey(key)
    }

    /// Returns the string representation of the key
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Formats a single `key:value` tag.
pub fn format_tag(key: &str, value: &str) -> String {
    let value = if value.is_empty() {
        EMPTY_VALUE_PLACEHOLDER
    } else {
        value
    };
    format!("{}:{}", key, value)
}

/// Maps labels to tags, keeping label order.
pub fn get_tags(labels: &Labels) -> Vec<String> {
    labels.iter().map(|(k, v)| format_tag(k, v)).collect()
}

/// Series key for a metric name and its tags.
pub fn series_key(name: &str, tags: &[String]) -> SeriesKey {
    SeriesKey::new(name, tags)
}
