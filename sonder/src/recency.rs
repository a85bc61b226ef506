//! Bounded, most-recent-first list of activated symbols
//!
//! Only glyphs are stored; they are resolved against the catalog on read.
//! The persisted payload is a JSON array of glyph strings.

use tracing::{debug, warn};

use crate::interface::{KeyValueStore, Symbol};
use crate::models::Catalog;
use crate::persist::PersistQueue;

pub struct RecencyCache {
    key: String,
    limit: usize,
    glyphs: Vec<String>,
    writer: PersistQueue,
}

impl RecencyCache {
    /// Read the stored list once.
    ///
    /// Entries the catalog no longer knows are dropped; a payload that is not a
    /// JSON string array is reset to `[]`. A failing store starts empty and is
    /// left untouched.
    pub fn load(
        store: &dyn KeyValueStore,
        key: &str,
        limit: usize,
        catalog: &Catalog,
        writer: PersistQueue,
    ) -> Self {
        let stored = match store.get(key.to_string()) {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Failed to read recent symbols: {}", e);
                None
            }
        };

        let mut glyphs = Vec::new();
        if let Some(payload) = stored {
            match serde_json::from_str::<Vec<String>>(&payload) {
                Ok(entries) => {
                    for glyph in entries {
                        if glyphs.len() == limit {
                            break;
                        }
                        if catalog.symbol_by_glyph(&glyph).is_some() && !glyphs.contains(&glyph) {
                            glyphs.push(glyph);
                        }
                    }
                }
                Err(e) => {
                    warn!("Discarding malformed recent symbols payload: {}", e);
                    writer.submit(key.to_string(), "[]".to_string());
                }
            }
        }
        debug!(count = glyphs.len(), "recent symbols loaded");

        Self {
            key: key.to_string(),
            limit,
            glyphs,
            writer,
        }
    }

    /// Move `symbol` to the front and persist the list
    pub fn record(&mut self, symbol: &Symbol) {
        self.glyphs.retain(|glyph| glyph != &symbol.glyph);
        self.glyphs.insert(0, symbol.glyph.clone());
        self.glyphs.truncate(self.limit);

        match serde_json::to_string(&self.glyphs) {
            Ok(payload) => self.writer.submit(self.key.clone(), payload),
            Err(e) => warn!("Failed to encode recent symbols: {}", e),
        }
    }

    pub fn glyphs(&self) -> &[String] {
        &self.glyphs
    }

    pub fn symbols(&self, catalog: &Catalog) -> Vec<Symbol> {
        self.glyphs
            .iter()
            .filter_map(|glyph| catalog.symbol_by_glyph(glyph))
            .cloned()
            .collect()
    }

    pub fn writer(&self) -> &PersistQueue {
        &self.writer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryKeyValueStore;
    use crate::models::fixtures::small_catalog;
    use std::sync::Arc;
    use tokio::runtime::Handle;

    const KEY: &str = "recent-symbols";

    fn open(store: &Arc<MemoryKeyValueStore>, limit: usize) -> RecencyCache {
        let writer = PersistQueue::spawn(store.clone(), &Handle::current());
        RecencyCache::load(store.as_ref(), KEY, limit, &small_catalog(), writer)
    }

    fn stored(store: &MemoryKeyValueStore) -> Option<String> {
        store.get(KEY.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_record_moves_to_front_without_duplicates() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let mut cache = open(&store, 12);
        let catalog = small_catalog();
        let alpha = catalog.symbol_by_glyph("α").unwrap();
        let beta = catalog.symbol_by_glyph("β").unwrap();

        cache.record(alpha);
        cache.record(beta);
        cache.record(alpha);
        assert_eq!(cache.glyphs(), ["α", "β"]);

        cache.writer().flush().await;
        assert_eq!(stored(&store).as_deref(), Some(r#"["α","β"]"#));
    }

    #[tokio::test]
    async fn test_list_is_bounded() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let mut cache = open(&store, 3);
        let catalog = small_catalog();
        for glyph in ["α", "β", "π", "∑", "∫"] {
            cache.record(catalog.symbol_by_glyph(glyph).unwrap());
        }
        assert_eq!(cache.glyphs(), ["∫", "∑", "π"]);
    }

    #[tokio::test]
    async fn test_load_resolves_and_drops_unknown_glyphs() {
        let store = Arc::new(MemoryKeyValueStore::with_entry(KEY, r#"["Ω","ℏ","α"]"#));
        let cache = open(&store, 12);
        assert_eq!(cache.glyphs(), ["Ω", "α"]);

        let names: Vec<String> = cache.symbols(&small_catalog()).into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["Ohm".to_string(), "Alpha".to_string()]);
    }

    #[tokio::test]
    async fn test_load_collapses_duplicates_and_overflow() {
        let store = Arc::new(MemoryKeyValueStore::with_entry(KEY, r#"["α","α","β","π","∑"]"#));
        let cache = open(&store, 3);
        assert_eq!(cache.glyphs(), ["α", "β", "π"]);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_reset() {
        let store = Arc::new(MemoryKeyValueStore::with_entry(KEY, "{not json"));
        let cache = open(&store, 12);
        assert!(cache.glyphs().is_empty());
        cache.writer().flush().await;
        assert_eq!(stored(&store).as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_wrong_shape_payload_is_reset() {
        let store = Arc::new(MemoryKeyValueStore::with_entry(KEY, r#"{"recent":["α"]}"#));
        let cache = open(&store, 12);
        assert!(cache.glyphs().is_empty());
        cache.writer().flush().await;
        assert_eq!(stored(&store).as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_missing_payload_starts_empty_without_writing() {
        let store = Arc::new(MemoryKeyValueStore::new());
        let cache = open(&store, 12);
        cache.writer().flush().await;
        assert!(cache.glyphs().is_empty());
        assert_eq!(stored(&store), None);
    }
}
