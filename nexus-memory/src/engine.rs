//! Memory engine facade
//!
//! Owns one store and wires the confidence, search and retention components
//! to it. This is the surface collaborators (transports, schedulers, the CLI)
//! call into; nothing here is global, every engine is constructed explicitly.

use chrono::Utc;
use std::path::Path;
use std::sync::Arc;

use crate::config::MemoryConfig;
use crate::confidence::ConfidenceEngine;
use crate::error::{MemoryError, Result};
use crate::node::{MemoryId, MemoryNode, MemoryType};
use crate::retention::{PruneCandidate, RetentionManager, SweepReport};
use crate::search::{render_context, MemorySearch, SearchResult};
use crate::storage::MemoryStore;

pub struct MemoryEngine {
    store: Arc<MemoryStore>,
    confidence: ConfidenceEngine,
    search: MemorySearch,
    retention: RetentionManager,
    config: MemoryConfig,
}

impl MemoryEngine {
    /// Open the store at `path` and build an engine around it
    pub fn open(path: impl AsRef<Path>, config: MemoryConfig) -> Result<Self> {
        let store = Arc::new(MemoryStore::open(path)?);
        Self::with_store(store, config)
    }

    /// Build an engine around an already opened store
    pub fn with_store(store: Arc<MemoryStore>, config: MemoryConfig) -> Result<Self> {
        config.validate()?;
        let confidence = ConfidenceEngine::new(config.confidence.clone());
        let search = MemorySearch::new(
            Arc::clone(&store),
            confidence.clone(),
            config.search.clone(),
        );
        let retention = RetentionManager::new(
            Arc::clone(&store),
            confidence.clone(),
            config.retention.clone(),
        );

        Ok(Self {
            store,
            confidence,
            search,
            retention,
            config,
        })
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    pub fn confidence_engine(&self) -> &ConfidenceEngine {
        &self.confidence
    }

    pub fn search_engine(&self) -> &MemorySearch {
        &self.search
    }

    pub fn retention_manager(&self) -> &RetentionManager {
        &self.retention
    }

    /// Store a new memory; `memory_type` is a free-form label
    pub fn create_memory(
        &self,
        content: &str,
        memory_type: &str,
        importance: Option<i64>,
        tags: Vec<String>,
    ) -> Result<MemoryId> {
        self.store
            .create(content, MemoryType::parse(memory_type), importance, tags)
    }

    /// Ranked content for `query`, best first
    pub fn search_memory(&self, query: &str, k: usize) -> Result<Vec<String>> {
        Ok(self
            .search(query, k)?
            .into_iter()
            .map(|r| r.memory.content)
            .collect())
    }

    /// Ranked results with scores, best first
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        self.search.search(query, k)
    }

    /// Ranked results rendered as `- content` lines for prompt injection
    pub fn search_context(&self, query: &str, k: usize) -> Result<String> {
        Ok(render_context(&self.search(query, k)?))
    }

    /// Prune low-confidence memories, returning how many were removed
    pub fn run_retention_sweep(&self) -> Result<usize> {
        self.retention.sweep()
    }

    pub fn sweep_report(&self) -> Result<SweepReport> {
        self.retention.sweep_report_at(Utc::now())
    }

    pub fn retention_preview(&self) -> Vec<PruneCandidate> {
        self.retention.preview_at(Utc::now())
    }

    /// Look up a memory, failing when it does not exist
    pub fn get(&self, id: &MemoryId) -> Result<MemoryNode> {
        self.store
            .get(id)
            .ok_or_else(|| MemoryError::not_found(id.to_string()))
    }

    /// Current confidence of a memory
    pub fn confidence_of(&self, id: &MemoryId) -> Result<f64> {
        let node = self.get(id)?;
        Ok(self.confidence.score(&node, Utc::now()))
    }

    /// Administrative delete; idempotent
    pub fn delete_memory(&self, id: &MemoryId) -> Result<bool> {
        self.store.delete(id)
    }

    /// Store statistics plus confidence figures at the current time
    pub fn stats(&self) -> serde_json::Value {
        let now = Utc::now();
        let nodes = self.store.get_all();
        let mean_confidence = if nodes.is_empty() {
            0.0
        } else {
            nodes
                .iter()
                .map(|n| self.confidence.score(n, now))
                .sum::<f64>()
                / nodes.len() as f64
        };

        let mut stats = self.store.stats();
        stats["meanConfidence"] = serde_json::json!(mean_confidence);
        stats["pruneCandidates"] = serde_json::json!(self.retention.preview_at(now).len());
        stats["pruneThreshold"] = serde_json::json!(self.config.retention.prune_threshold);
        stats
    }
}

/// Parse a memory id given by a caller
pub fn parse_id(s: &str) -> Result<MemoryId> {
    Ok(s.trim().parse::<MemoryId>()?)
}
