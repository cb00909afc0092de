//! Engine configuration
//!
//! Every section is optional in the JSON file; missing values take defaults.
//!
//! ```json
//! {
//!   "confidence": { "reinforcement": 0.1 },
//!   "search": { "relevance_gate": "fallback_to_confidence" },
//!   "retention": { "prune_threshold": 0.05, "sweep_interval_secs": 3600 }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::confidence::ConfidenceConfig;
use crate::error::Result;
use crate::retention::RetentionConfig;
use crate::search::SearchConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub confidence: ConfidenceConfig,
    pub search: SearchConfig,
    pub retention: RetentionConfig,
}

impl MemoryConfig {
    /// Load and validate a JSON config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        log::debug!("Loaded memory config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.confidence.validate()?;
        self.search.validate()?;
        self.retention.validate()
    }
}
