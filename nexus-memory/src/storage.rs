//! RocksDB storage for memory nodes
//!
//! One row per memory under `mem:<id>`, encoded as a MessagePack map so rows
//! written before a field existed still decode (missing fields take their
//! serde defaults). An in-memory snapshot mirrors the table; all mutations go
//! through a single writer lock and are flushed before returning.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use rocksdb::{Direction, IteratorMode, Options, DB};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use crate::error::{MemoryError, Result};
use crate::node::{MemoryId, MemoryNode, MemoryType};

pub(crate) const MEMORY_PREFIX: &str = "mem:";

pub(crate) fn memory_key(id: &MemoryId) -> String {
    format!("{}{}", MEMORY_PREFIX, id)
}

pub(crate) fn encode_node(node: &MemoryNode) -> Result<Vec<u8>> {
    Ok(rmp_serde::to_vec_named(node)?)
}

pub(crate) fn decode_node(bytes: &[u8]) -> Result<MemoryNode> {
    Ok(rmp_serde::from_slice(bytes)?)
}

/// Writer-side state, only touched while holding the write lock
struct WriterState {
    next_sequence: u64,
}

/// RocksDB-based memory store
pub struct MemoryStore {
    db: Arc<DB>,
    /// Point-in-time view of every row, ordered by insertion sequence
    snapshot: RwLock<BTreeMap<u64, MemoryNode>>,
    /// id -> insertion sequence
    index: DashMap<MemoryId, u64>,
    writer: Mutex<WriterState>,
}

impl MemoryStore {
    /// Open (or create) a MemoryStore at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path)?;

        let fresh = !path.join("CURRENT").exists();

        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_max_background_jobs(2);
        opts.set_bytes_per_sync(1048576); // 1MB
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let db = DB::open(&opts, path)?;

        crate::migration::migrate_if_needed(&db, fresh)?;

        log::info!("MemoryStore opened at: {}", path.display());

        let store = Self {
            db: Arc::new(db),
            snapshot: RwLock::new(BTreeMap::new()),
            index: DashMap::new(),
            writer: Mutex::new(WriterState { next_sequence: 1 }),
        };

        store.load_cache()?;
        Ok(store)
    }

    /// Load existing memories into the snapshot on startup
    fn load_cache(&self) -> Result<()> {
        let mut nodes = Vec::new();
        let iter = self
            .db
            .iterator(IteratorMode::From(MEMORY_PREFIX.as_bytes(), Direction::Forward));

        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(MEMORY_PREFIX.as_bytes()) {
                break;
            }

            let node = decode_node(&value).map_err(|e| {
                MemoryError::corrupted(format!(
                    "row {} cannot be decoded: {}",
                    String::from_utf8_lossy(&key),
                    e
                ))
            })?;
            nodes.push(node);
        }

        // Rows without a sequence (imported) fall back to creation order
        nodes.sort_by(|a, b| {
            a.sequence
                .cmp(&b.sequence)
                .then(a.temporal.created_at.cmp(&b.temporal.created_at))
                .then(a.id.cmp(&b.id))
        });

        let mut writer = self.writer.lock();
        let mut snapshot = self.snapshot.write();
        let mut next = 1;
        for mut node in nodes {
            if node.sequence < next {
                node.sequence = next;
            }
            next = node.sequence + 1;
            self.index.insert(node.id, node.sequence);
            snapshot.insert(node.sequence, node);
        }
        writer.next_sequence = next;

        if !snapshot.is_empty() {
            log::info!("Loaded {} memories from disk", snapshot.len());
        }

        Ok(())
    }

    /// Create and persist a new memory
    ///
    /// Fails with a validation error when `content` is empty or blank.
    pub fn create(
        &self,
        content: &str,
        memory_type: MemoryType,
        importance: Option<i64>,
        tags: Vec<String>,
    ) -> Result<MemoryId> {
        let mut builder = MemoryNode::builder()
            .memory_type(memory_type)
            .content(content)
            .tags(tags);
        if let Some(importance) = importance {
            builder = builder.importance(importance);
        }

        self.insert(builder.build()?)
    }

    /// Persist a fully built memory
    ///
    /// The node keeps its own timestamps and counters. Ids must be unique,
    /// `base_confidence` must lie in [0, 1] and the last access cannot
    /// precede creation.
    pub fn insert(&self, mut node: MemoryNode) -> Result<MemoryId> {
        if node.content.trim().is_empty() {
            return Err(MemoryError::validation("content must not be empty"));
        }
        if !(0.0..=1.0).contains(&node.base_confidence) {
            return Err(MemoryError::validation(format!(
                "base confidence {} is outside [0, 1]",
                node.base_confidence
            )));
        }
        if node.temporal.last_accessed < node.temporal.created_at {
            return Err(MemoryError::validation(
                "last access precedes creation time",
            ));
        }

        let mut writer = self.writer.lock();
        if self.index.contains_key(&node.id) {
            return Err(MemoryError::validation(format!(
                "memory {} already exists",
                node.id
            )));
        }

        node.sequence = writer.next_sequence;
        self.persist(&node)?;
        writer.next_sequence += 1;

        let id = node.id;
        self.index.insert(id, node.sequence);
        self.snapshot.write().insert(node.sequence, node);

        log::debug!("Stored memory {}", id);
        Ok(id)
    }

    /// Get a memory by ID
    pub fn get(&self, id: &MemoryId) -> Option<MemoryNode> {
        let sequence = *self.index.get(id)?;
        self.snapshot.read().get(&sequence).cloned()
    }

    /// Snapshot of every memory in insertion order
    pub fn get_all(&self) -> Vec<MemoryNode> {
        self.snapshot.read().values().cloned().collect()
    }

    /// Record a retrieval of `id` now
    pub fn touch(&self, id: &MemoryId) -> Result<bool> {
        self.touch_at(id, Utc::now())
    }

    /// Record a retrieval of `id` at `now`
    ///
    /// Returns `false` without error when the memory no longer exists.
    pub fn touch_at(&self, id: &MemoryId, now: DateTime<Utc>) -> Result<bool> {
        let _writer = self.writer.lock();

        let Some(sequence) = self.index.get(id).map(|s| *s) else {
            log::debug!("touch skipped, memory {} not found", id);
            return Ok(false);
        };

        let Some(mut node) = self.snapshot.read().get(&sequence).cloned() else {
            log::debug!("touch skipped, memory {} not found", id);
            return Ok(false);
        };

        node.record_access(now);
        self.persist(&node)?;
        self.snapshot.write().insert(sequence, node);
        Ok(true)
    }

    /// Delete a memory permanently
    ///
    /// Idempotent: returns `false` when there was nothing to delete.
    pub fn delete(&self, id: &MemoryId) -> Result<bool> {
        let _writer = self.writer.lock();

        self.db.delete(memory_key(id).as_bytes())?;
        self.db.flush()?;

        let removed = match self.index.remove(id) {
            Some((_, sequence)) => self.snapshot.write().remove(&sequence).is_some(),
            None => false,
        };

        if removed {
            log::debug!("Deleted memory {}", id);
        }
        Ok(removed)
    }

    /// Find memories with a specific tag
    pub fn find_by_tag(&self, tag: &str) -> Vec<MemoryNode> {
        self.snapshot
            .read()
            .values()
            .filter(|node| node.has_tag(tag))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Get store statistics
    pub fn stats(&self) -> serde_json::Value {
        let mut by_type: HashMap<String, usize> = HashMap::new();
        let mut by_tag: HashMap<String, usize> = HashMap::new();
        let mut total_usage = 0u64;

        let snapshot = self.snapshot.read();
        for memory in snapshot.values() {
            *by_type.entry(memory.memory_type.to_string()).or_insert(0) += 1;
            for tag in &memory.tags {
                *by_tag.entry(tag.clone()).or_insert(0) += 1;
            }
            total_usage += memory.usage_count;
        }

        serde_json::json!({
            "totalMemories": snapshot.len(),
            "totalUsage": total_usage,
            "byType": by_type,
            "byTag": by_tag,
        })
    }

    /// Write one row and flush it to disk
    fn persist(&self, node: &MemoryNode) -> Result<()> {
        self.db
            .put(memory_key(&node.id).as_bytes(), encode_node(node)?)?;
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::temporal::TemporalMetadata;
    use chrono::Duration;
    use tempfile::TempDir;

    fn open_store() -> (TempDir, MemoryStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = MemoryStore::open(temp_dir.path()).unwrap();
        (temp_dir, store)
    }

    #[test]
    fn test_create_and_get() {
        let (_dir, store) = open_store();

        let id = store
            .create(
                "user likes dark mode",
                MemoryType::Preference,
                None,
                vec!["ui".into()],
            )
            .unwrap();

        let memory = store.get(&id).unwrap();
        assert_eq!(memory.content, "user likes dark mode");
        assert_eq!(memory.memory_type, MemoryType::Preference);
        assert_eq!(memory.importance, 1);
        assert_eq!(memory.usage_count, 0);
        assert_eq!(memory.base_confidence, 1.0);
        assert_eq!(memory.tags, vec!["ui"]);
        assert_eq!(memory.temporal.created_at, memory.temporal.last_accessed);
    }

    #[test]
    fn test_create_rejects_empty_content() {
        let (_dir, store) = open_store();

        for content in ["", "   ", "\n\t"] {
            let result = store.create(content, MemoryType::Fact, None, vec![]);
            assert!(matches!(result, Err(MemoryError::Validation(_))));
        }
        assert!(store.is_empty());
    }

    #[test]
    fn test_insert_rejects_duplicate_id() {
        let (_dir, store) = open_store();
        let node = MemoryNode::builder().content("a").build().unwrap();
        let copy = node.clone();

        store.insert(node).unwrap();
        assert!(matches!(
            store.insert(copy),
            Err(MemoryError::Validation(_))
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_insert_rejects_out_of_range_confidence() {
        let (_dir, store) = open_store();

        for confidence in [3.0, -0.5, f64::NAN] {
            let mut node = MemoryNode::builder().content("x").build().unwrap();
            node.base_confidence = confidence;
            assert!(matches!(
                store.insert(node),
                Err(MemoryError::Validation(_))
            ));
        }
        assert!(store.is_empty());
    }

    #[test]
    fn test_insert_rejects_access_before_creation() {
        let (_dir, store) = open_store();
        let created = Utc::now();
        let temporal = TemporalMetadata {
            created_at: created,
            last_accessed: created - Duration::hours(1),
        };
        let node = MemoryNode::builder()
            .content("x")
            .temporal(temporal)
            .build()
            .unwrap();

        assert!(matches!(
            store.insert(node),
            Err(MemoryError::Validation(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_get_all_insertion_order() {
        let (_dir, store) = open_store();
        let ids: Vec<_> = ["one", "two", "three"]
            .iter()
            .map(|c| store.create(c, MemoryType::Fact, None, vec![]).unwrap())
            .collect();

        let all: Vec<_> = store.get_all().into_iter().map(|m| m.id).collect();
        assert_eq!(all, ids);
    }

    #[test]
    fn test_touch_updates_usage() {
        let (_dir, store) = open_store();
        let t0 = Utc::now() - Duration::days(1);
        let node = MemoryNode::builder()
            .content("x")
            .created_at(t0)
            .build()
            .unwrap();
        let id = store.insert(node).unwrap();

        let now = Utc::now();
        assert!(store.touch_at(&id, now).unwrap());
        assert!(store.touch_at(&id, now).unwrap());

        let memory = store.get(&id).unwrap();
        assert_eq!(memory.usage_count, 2);
        assert_eq!(memory.temporal.last_accessed, now);
        assert_eq!(memory.temporal.created_at, t0);
    }

    #[test]
    fn test_touch_missing_is_noop() {
        let (_dir, store) = open_store();
        assert!(!store.touch(&MemoryId::new()).unwrap());
    }

    #[test]
    fn test_delete_idempotent() {
        let (_dir, store) = open_store();
        let id = store.create("x", MemoryType::Fact, None, vec![]).unwrap();

        assert!(store.delete(&id).unwrap());
        assert!(!store.delete(&id).unwrap());
        assert!(!store.delete(&MemoryId::new()).unwrap());
        assert!(store.get(&id).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_find_by_tag() {
        let (_dir, store) = open_store();
        store
            .create("a", MemoryType::Fact, None, vec!["rust".into()])
            .unwrap();
        store
            .create("b", MemoryType::Fact, None, vec!["python".into()])
            .unwrap();

        let found = store.find_by_tag("rust");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].content, "a");
    }

    #[test]
    fn test_persistence_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let (first, second) = {
            let store = MemoryStore::open(temp_dir.path()).unwrap();
            let first = store.create("first", MemoryType::Skill, Some(4), vec![]).unwrap();
            let second = store.create("second", MemoryType::Project, None, vec![]).unwrap();
            store.touch(&second).unwrap();
            (first, second)
        };

        let store = MemoryStore::open(temp_dir.path()).unwrap();
        let all = store.get_all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, first);
        assert_eq!(all[0].importance, 4);
        assert_eq!(all[0].memory_type, MemoryType::Skill);
        assert_eq!(all[1].id, second);
        assert_eq!(all[1].usage_count, 1);

        // Sequence keeps growing after reopen
        let third = store.create("third", MemoryType::Fact, None, vec![]).unwrap();
        assert_eq!(store.get_all().last().unwrap().id, third);
    }

    #[test]
    fn test_delete_persists() {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = MemoryStore::open(temp_dir.path()).unwrap();
            let id = store.create("gone", MemoryType::Fact, None, vec![]).unwrap();
            store.delete(&id).unwrap();
        }

        let store = MemoryStore::open(temp_dir.path()).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_unknown_type_round_trips() {
        let temp_dir = TempDir::new().unwrap();
        let id = {
            let store = MemoryStore::open(temp_dir.path()).unwrap();
            store
                .create("x", MemoryType::parse("episode"), None, vec![])
                .unwrap()
        };

        let store = MemoryStore::open(temp_dir.path()).unwrap();
        assert_eq!(
            store.get(&id).unwrap().memory_type,
            MemoryType::Other("episode".into())
        );
    }

    #[test]
    fn test_stats() {
        let (_dir, store) = open_store();
        store
            .create("a", MemoryType::Fact, None, vec!["x".into()])
            .unwrap();
        store
            .create("b", MemoryType::Preference, None, vec!["x".into(), "y".into()])
            .unwrap();

        let stats = store.stats();
        assert_eq!(stats["totalMemories"], 2);
        assert_eq!(stats["byType"]["fact"], 1);
        assert_eq!(stats["byType"]["preference"], 1);
        assert_eq!(stats["byTag"]["x"], 2);
        assert_eq!(stats["byTag"]["y"], 1);
    }

    #[test]
    fn test_concurrent_readers_see_whole_rows() {
        let (_dir, store) = open_store();
        let store = Arc::new(store);
        let id = store.create("shared", MemoryType::Fact, None, vec![]).unwrap();

        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for _ in 0..50 {
                    store.touch(&id).unwrap();
                }
            })
        };

        for _ in 0..50 {
            for memory in store.get_all() {
                assert_eq!(memory.content, "shared");
                assert!(memory.temporal.created_at <= memory.temporal.last_accessed);
            }
        }

        writer.join().unwrap();
        assert_eq!(store.get(&id).unwrap().usage_count, 50);
    }
}
