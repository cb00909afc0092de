//! Lexical retrieval ranked by relevance, confidence and importance
//!
//! score = relevance × relevance_weight
//!       + confidence × confidence_weight
//!       + importance × importance_weight
//!
//! where relevance is the number of query terms found as substrings of the
//! lowercased content. Memories returned by a search are touched in the
//! store, which is what feeds usage reinforcement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

use crate::confidence::ConfidenceEngine;
use crate::error::{MemoryError, Result};
use crate::node::MemoryNode;
use crate::storage::MemoryStore;

/// What to do with memories that match no query term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelevanceGate {
    /// Zero-relevance memories are never returned
    #[default]
    Strict,
    /// When nothing matches, rank every memory by confidence and importance
    FallbackToConfidence,
}

/// Search configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Result count used when the caller does not pass one (default: 5)
    pub limit: usize,
    /// Weight per matched query term (default: 2.0)
    pub relevance_weight: f64,
    /// Weight of the confidence score (default: 1.0)
    pub confidence_weight: f64,
    /// Weight of the importance value (default: 1.0)
    pub importance_weight: f64,
    /// Zero-relevance policy
    pub relevance_gate: RelevanceGate,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            limit: 5,
            relevance_weight: 2.0,
            confidence_weight: 1.0,
            importance_weight: 1.0,
            relevance_gate: RelevanceGate::Strict,
        }
    }
}

impl SearchConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, weight) in [
            ("relevance_weight", self.relevance_weight),
            ("confidence_weight", self.confidence_weight),
            ("importance_weight", self.importance_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(MemoryError::validation(format!(
                    "{} must be a non-negative number, got {}",
                    name, weight
                )));
            }
        }
        Ok(())
    }
}

/// Search result with scores
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The matched memory
    pub memory: MemoryNode,
    /// Combined score
    pub score: f64,
    /// Number of query terms found in the content
    pub relevance: usize,
    /// Confidence at query time
    pub confidence: f64,
    /// Distinct query terms that matched
    pub matched_terms: Vec<String>,
}

/// Split a query into lowercase whitespace-separated terms
pub fn tokenize(query: &str) -> Vec<String> {
    query.split_whitespace().map(str::to_lowercase).collect()
}

/// Count query terms that occur in `text` (already lowercased)
pub fn relevance(terms: &[String], text: &str) -> usize {
    terms.iter().filter(|t| text.contains(t.as_str())).count()
}

/// Render results the way they are injected into a prompt
pub fn render_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| format!("- {}", r.memory.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Ranks memories from a store snapshot
pub struct MemorySearch {
    store: Arc<MemoryStore>,
    confidence: ConfidenceEngine,
    config: SearchConfig,
}

impl MemorySearch {
    /// Create new search engine
    pub fn new(store: Arc<MemoryStore>, confidence: ConfidenceEngine, config: SearchConfig) -> Self {
        Self {
            store,
            confidence,
            config,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Search now and reinforce the returned memories
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        self.search_at(query, k, Utc::now())
    }

    /// Search as of `now` and reinforce the returned memories
    pub fn search_at(&self, query: &str, k: usize, now: DateTime<Utc>) -> Result<Vec<SearchResult>> {
        let snapshot = self.store.get_all();
        let mut results = self.rank(query, &snapshot, k, now);
        self.reinforce(&mut results, now)?;

        log::debug!(
            "search {:?} returned {} of {} memories",
            query,
            results.len(),
            snapshot.len()
        );
        Ok(results)
    }

    /// Touch every result in the store
    pub(crate) fn reinforce(&self, results: &mut [SearchResult], now: DateTime<Utc>) -> Result<()> {
        for result in results.iter_mut() {
            // A concurrent delete may have removed it; the hit still stands
            if self.store.touch_at(&result.memory.id, now)? {
                result.memory.record_access(now);
            }
        }
        Ok(())
    }

    /// Rank `memories` for `query` without touching the store
    pub fn rank(
        &self,
        query: &str,
        memories: &[MemoryNode],
        k: usize,
        now: DateTime<Utc>,
    ) -> Vec<SearchResult> {
        let terms = tokenize(query);
        if terms.is_empty() || k == 0 || memories.is_empty() {
            return Vec::new();
        }

        let mut results: Vec<SearchResult> = memories
            .iter()
            .filter_map(|memory| {
                let text = memory.searchable_text();
                let relevance = relevance(&terms, &text);
                if relevance == 0 {
                    return None;
                }
                let mut matched_terms: Vec<String> = Vec::new();
                for term in terms.iter().filter(|t| text.contains(t.as_str())) {
                    if !matched_terms.contains(term) {
                        matched_terms.push(term.clone());
                    }
                }
                Some(self.scored(memory, relevance, matched_terms, now))
            })
            .collect();

        if results.is_empty() && self.config.relevance_gate == RelevanceGate::FallbackToConfidence
        {
            results = memories
                .iter()
                .map(|memory| self.scored(memory, 0, Vec::new(), now))
                .collect();
        }

        results.sort_by(compare_results);
        results.truncate(k);
        results
    }

    fn scored(
        &self,
        memory: &MemoryNode,
        relevance: usize,
        matched_terms: Vec<String>,
        now: DateTime<Utc>,
    ) -> SearchResult {
        let confidence = self.confidence.score(memory, now);
        let score = relevance as f64 * self.config.relevance_weight
            + confidence * self.config.confidence_weight
            + memory.importance as f64 * self.config.importance_weight;

        SearchResult {
            memory: memory.clone(),
            score,
            relevance,
            confidence,
            matched_terms,
        }
    }
}

/// Score descending, then newest first, then latest insertion first
fn compare_results(a: &SearchResult, b: &SearchResult) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.memory.temporal.created_at.cmp(&a.memory.temporal.created_at))
        .then_with(|| b.memory.sequence.cmp(&a.memory.sequence))
}
