//! Retention sweep
//!
//! Deletes memories whose confidence has decayed below the prune threshold.
//! Every deletion is flushed on its own, so an interrupted sweep leaves a
//! valid, partially pruned store and the next sweep picks up the rest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::confidence::ConfidenceEngine;
use crate::error::{MemoryError, Result};
use crate::node::{MemoryId, MemoryNode};
use crate::storage::MemoryStore;

/// Retention configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Memories scoring strictly below this are pruned (default: 0.1)
    pub prune_threshold: f64,
    /// Interval between scheduled sweeps in seconds (default: one day)
    pub sweep_interval_secs: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            prune_threshold: 0.1,
            sweep_interval_secs: 24 * 60 * 60,
        }
    }
}

impl RetentionConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.prune_threshold) {
            return Err(MemoryError::validation(format!(
                "prune_threshold must be within 0.0..=1.0, got {}",
                self.prune_threshold
            )));
        }
        if self.sweep_interval_secs == 0 {
            return Err(MemoryError::validation(
                "sweep_interval_secs must be positive",
            ));
        }
        Ok(())
    }
}

/// Outcome of one sweep
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    /// Memories examined
    pub scanned: usize,
    /// Memories deleted by this sweep
    pub removed: Vec<MemoryId>,
    /// Memories below threshold that were already gone when deleted
    pub already_gone: usize,
}

impl SweepReport {
    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }
}

/// A memory the next sweep would prune
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PruneCandidate {
    pub id: MemoryId,
    pub confidence: f64,
}

/// Prunes low-confidence memories from a store
pub struct RetentionManager {
    store: Arc<MemoryStore>,
    confidence: ConfidenceEngine,
    config: RetentionConfig,
}

impl RetentionManager {
    pub fn new(store: Arc<MemoryStore>, confidence: ConfidenceEngine, config: RetentionConfig) -> Self {
        Self {
            store,
            confidence,
            config,
        }
    }

    pub fn config(&self) -> &RetentionConfig {
        &self.config
    }

    /// Sweep now, returning the number of memories removed
    pub fn sweep(&self) -> Result<usize> {
        Ok(self.sweep_report_at(Utc::now())?.removed_count())
    }

    /// Sweep as of `now`, returning the number of memories removed
    pub fn sweep_at(&self, now: DateTime<Utc>) -> Result<usize> {
        Ok(self.sweep_report_at(now)?.removed_count())
    }

    /// Sweep as of `now` with a detailed report
    pub fn sweep_report_at(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        log::debug!(
            "Running retention sweep (threshold {})",
            self.config.prune_threshold
        );

        let snapshot = self.store.get_all();
        self.prune(&snapshot, now)
    }

    /// Delete the nodes of `snapshot` that fall below the threshold at `now`
    ///
    /// Nodes deleted since the snapshot was taken count as `already_gone`.
    pub(crate) fn prune(&self, snapshot: &[MemoryNode], now: DateTime<Utc>) -> Result<SweepReport> {
        let mut report = SweepReport {
            scanned: snapshot.len(),
            ..SweepReport::default()
        };

        for node in snapshot {
            let confidence = self.confidence.score(node, now);
            if confidence >= self.config.prune_threshold {
                continue;
            }

            if self.store.delete(&node.id)? {
                log::debug!("Pruned memory {} (confidence {:.4})", node.id, confidence);
                report.removed.push(node.id);
            } else {
                report.already_gone += 1;
            }
        }

        if !report.removed.is_empty() {
            log::info!(
                "Pruned {} low-confidence memory nodes ({} scanned)",
                report.removed.len(),
                report.scanned
            );
        }

        Ok(report)
    }

    /// Memories a sweep at `now` would prune, without deleting anything
    pub fn preview_at(&self, now: DateTime<Utc>) -> Vec<PruneCandidate> {
        self.store
            .get_all()
            .iter()
            .filter_map(|node| {
                let confidence = self.confidence.score(node, now);
                (confidence < self.config.prune_threshold).then_some(PruneCandidate {
                    id: node.id,
                    confidence,
                })
            })
            .collect()
    }
}
