//! Nexus Memory Layer
//!
//! Persistent memory for the Nexus assistant: short facts, preferences,
//! project notes and skills, each carrying a confidence score that decays
//! with age and is reinforced by retrieval.
//!
//! ## Features
//!
//! - **Confidence decay** - Per-type half-lives (fact 180d, preference 90d, project 60d, skill 365d)
//! - **Usage reinforcement** - Logarithmic bonus for memories that keep getting retrieved
//! - **Relevance-gated ranking** - Term matches + confidence + importance
//! - **Retention sweeps** - Prune memories whose confidence fell below a threshold
//! - **RocksDB persistence** - Every mutation flushed before it returns
//!
//! ## Example
//!
//! ```ignore
//! use nexus_memory::{MemoryConfig, MemoryEngine};
//!
//! let engine = MemoryEngine::open(&db_path, MemoryConfig::default())?;
//!
//! engine.create_memory("user likes dark mode", "preference", None, vec!["ui".into()])?;
//!
//! let hits = engine.search_memory("dark mode", 5)?;
//! let removed = engine.run_retention_sweep()?;
//! ```

pub mod confidence;
pub mod config;
pub mod engine;
pub mod error;
pub mod migration;
pub mod node;
pub mod retention;
pub mod search;
pub mod storage;
pub mod temporal;

// Re-exports for convenience
pub use confidence::{ConfidenceConfig, ConfidenceEngine, HalfLives};
pub use config::MemoryConfig;
pub use engine::{parse_id, MemoryEngine};
pub use error::MemoryError;
pub use node::{MemoryId, MemoryNode, MemoryNodeBuilder, MemoryNodeBuilderError, MemoryType};
pub use retention::{PruneCandidate, RetentionConfig, RetentionManager, SweepReport};
pub use search::{render_context, MemorySearch, RelevanceGate, SearchConfig, SearchResult};
pub use storage::MemoryStore;
pub use temporal::TemporalMetadata;
