//! Typed field descriptors built from the raw schema
//!
//! The original configuration distinguishes leaf categories from named
//! groups of categories with a `type` marker; that becomes the tagged
//! `CategoryEntry` enum here.

use serde::{Deserialize, Serialize};

/// The time (x-axis) field; exactly one per configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeField {
    pub key: String,
    pub alias: String,
}

/// The weighting field used as the denominator in weighted aggregation;
/// exactly one per configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightField {
    pub key: String,
    pub alias: String,
    pub units: String,
}

/// Aggregation strategy for a variable field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableKind {
    /// Area-weighted mean across a time bucket
    Continuous,
    /// The weighting field itself; reduces to a plain sum
    Weight,
    /// Unweighted sum across a time bucket
    Total,
}

/// A plottable variable field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableField {
    pub key: String,
    pub alias: String,
    pub units: String,
    #[serde(rename = "type")]
    pub kind: VariableKind,
}

/// A leaf value of a stratum
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub key: String,
    pub alias: String,
    pub color: String,
}

/// One entry of a stratum: either a leaf category or a named union of
/// leaf categories within the same stratum
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CategoryEntry {
    Item(Category),
    Group {
        key: String,
        alias: String,
        color: String,
        /// Keys of the sibling leaf categories composing this group
        items: Vec<String>,
    },
}

impl CategoryEntry {
    pub fn key(&self) -> &str {
        match self {
            CategoryEntry::Item(c) => &c.key,
            CategoryEntry::Group { key, .. } => key,
        }
    }

    pub fn alias(&self) -> &str {
        match self {
            CategoryEntry::Item(c) => &c.alias,
            CategoryEntry::Group { alias, .. } => alias,
        }
    }

    pub fn color(&self) -> &str {
        match self {
            CategoryEntry::Item(c) => &c.color,
            CategoryEntry::Group { color, .. } => color,
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, CategoryEntry::Group { .. })
    }

    /// Leaf keys this entry stands for: itself for a leaf category, the
    /// member items for a group
    pub fn expanded_keys(&self) -> Vec<&str> {
        match self {
            CategoryEntry::Item(c) => vec![c.key.as_str()],
            CategoryEntry::Group { items, .. } => items.iter().map(String::as_str).collect(),
        }
    }
}

/// A categorical dimension used to filter and split records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StratumField {
    pub key: String,
    pub alias: String,
    /// Ordered leaf categories followed by groups, as declared
    pub categories: Vec<CategoryEntry>,
}

impl StratumField {
    /// Look up an entry (leaf or group) by key
    pub fn entry(&self, key: &str) -> Option<&CategoryEntry> {
        self.categories.iter().find(|c| c.key() == key)
    }

    /// Keys of all leaf categories in this stratum
    pub fn leaf_keys(&self) -> Vec<&str> {
        self.categories
            .iter()
            .filter(|c| !c.is_group())
            .map(|c| c.key())
            .collect()
    }

    /// The group entries of this stratum
    pub fn groups(&self) -> impl Iterator<Item = &CategoryEntry> {
        self.categories.iter().filter(|c| c.is_group())
    }
}

/// Reference to the stratum currently splitting the chart into series
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesField {
    pub key: String,
    pub alias: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stratum() -> StratumField {
        StratumField {
            key: "REGION".to_string(),
            alias: "Region".to_string(),
            categories: vec![
                CategoryEntry::Item(Category {
                    key: "N".to_string(),
                    alias: "North".to_string(),
                    color: "#1f77b4".to_string(),
                }),
                CategoryEntry::Item(Category {
                    key: "S".to_string(),
                    alias: "South".to_string(),
                    color: "#aec7e8".to_string(),
                }),
                CategoryEntry::Group {
                    key: "ALL".to_string(),
                    alias: "All regions".to_string(),
                    color: "#ff7f0e".to_string(),
                    items: vec!["N".to_string(), "S".to_string()],
                },
            ],
        }
    }

    #[test]
    fn test_expanded_keys() {
        let s = stratum();
        assert_eq!(s.entry("N").unwrap().expanded_keys(), vec!["N"]);
        assert_eq!(s.entry("ALL").unwrap().expanded_keys(), vec!["N", "S"]);
    }

    #[test]
    fn test_leaf_keys_exclude_groups() {
        let s = stratum();
        assert_eq!(s.leaf_keys(), vec!["N", "S"]);
        assert_eq!(s.groups().count(), 1);
    }

    #[test]
    fn test_entry_serializes_with_type_tag() {
        let s = stratum();
        let leaf = serde_json::to_value(s.entry("N").unwrap()).unwrap();
        assert_eq!(leaf["type"], "item");
        let group = serde_json::to_value(s.entry("ALL").unwrap()).unwrap();
        assert_eq!(group["type"], "group");
        assert_eq!(group["items"], serde_json::json!(["N", "S"]));
    }
}
