//! Result item types shared between search workers and the presentation layer.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single match produced by a search worker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedItem {
    /// Unique locator of the match, e.g. an absolute path or a desktop entry id.
    pub item: String,
    /// Display name.
    pub name: String,
    /// Icon name or path. Empty when the worker has none.
    #[serde(default)]
    pub icon: String,
    /// Content type such as a MIME type or `application`.
    #[serde(default)]
    pub kind: String,
    /// Name of the worker that produced this item.
    #[serde(default)]
    pub searcher: String,
    /// Worker-specific key/value data (launch command, match score, ...).
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl MatchedItem {
    /// Create an item with the given locator and display name.
    pub fn new(item: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            item: item.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the icon.
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    /// Set the content type.
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Set the producing worker's name.
    pub fn with_searcher(mut self, searcher: impl Into<String>) -> Self {
        self.searcher = searcher.into();
        self
    }

    /// Attach one extra key/value pair.
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// Matches grouped by category key (`"file"`, `"folder"`, `"application"`, ...).
///
/// Each group keeps the order in which items were reported.
pub type MatchedItemMap = BTreeMap<String, Vec<MatchedItem>>;

/// Returns true when no group holds any item.
///
/// A map containing only empty groups counts as empty.
pub fn is_empty_map(map: &MatchedItemMap) -> bool {
    map.values().all(Vec::is_empty)
}

/// Total number of items across all groups.
pub fn item_count(map: &MatchedItemMap) -> usize {
    map.values().map(Vec::len).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_all_fields() {
        let item = MatchedItem::new("/home/u/notes.txt", "notes.txt")
            .with_icon("text-plain")
            .with_kind("text/plain")
            .with_searcher("file")
            .with_extra("depth", "2");
        assert_eq!(item.item, "/home/u/notes.txt");
        assert_eq!(item.name, "notes.txt");
        assert_eq!(item.icon, "text-plain");
        assert_eq!(item.kind, "text/plain");
        assert_eq!(item.searcher, "file");
        assert_eq!(item.extra.get("depth").map(String::as_str), Some("2"));
    }

    #[test]
    fn map_with_only_empty_groups_is_empty() {
        let mut map = MatchedItemMap::new();
        assert!(is_empty_map(&map));
        map.insert("file".into(), vec![]);
        assert!(is_empty_map(&map));
        map.insert("folder".into(), vec![MatchedItem::new("/tmp", "tmp")]);
        assert!(!is_empty_map(&map));
    }

    #[test]
    fn item_count_sums_groups() {
        let mut map = MatchedItemMap::new();
        map.insert("file".into(), vec![MatchedItem::new("a", "a"), MatchedItem::new("b", "b")]);
        map.insert("folder".into(), vec![MatchedItem::new("c", "c")]);
        assert_eq!(item_count(&map), 3);
    }

    #[test]
    fn missing_optional_fields_deserialize_to_defaults() {
        let item: MatchedItem =
            serde_json::from_str(r#"{"item":"/a","name":"a"}"#).expect("deserialize");
        assert_eq!(item.item, "/a");
        assert!(item.icon.is_empty());
        assert!(item.extra.is_empty());
    }
}
