//! Confidence scoring
//!
//! confidence = base_confidence × recency_factor × usage_factor, capped at 1.0
//!
//! - recency_factor = 0.5 ^ (age / half_life), half-life chosen by memory type
//! - usage_factor = 1 + ln(usage_count + 1) × reinforcement
//!
//! Scoring is a pure function of the node and the evaluation time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MemoryError, Result};
use crate::node::{MemoryNode, MemoryType};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Half-lives per memory type, in days
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HalfLives {
    pub fact_days: f64,
    pub preference_days: f64,
    pub project_days: f64,
    pub skill_days: f64,
}

impl Default for HalfLives {
    fn default() -> Self {
        Self {
            fact_days: 180.0,
            preference_days: 90.0,
            project_days: 60.0,
            skill_days: 365.0,
        }
    }
}

impl HalfLives {
    /// Half-life in days for a type; unknown types decay like facts
    pub fn days_for(&self, memory_type: &MemoryType) -> f64 {
        match memory_type {
            MemoryType::Fact | MemoryType::Other(_) => self.fact_days,
            MemoryType::Preference => self.preference_days,
            MemoryType::Project => self.project_days,
            MemoryType::Skill => self.skill_days,
        }
    }
}

/// Confidence scoring configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    /// Weight of the logarithmic usage bonus (default: 0.15)
    pub reinforcement: f64,
    /// Decay half-lives per memory type
    pub half_lives: HalfLives,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            reinforcement: 0.15,
            half_lives: HalfLives::default(),
        }
    }
}

impl ConfidenceConfig {
    /// Set the reinforcement constant
    pub fn with_reinforcement(mut self, reinforcement: f64) -> Self {
        self.reinforcement = reinforcement;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.reinforcement.is_finite() || self.reinforcement < 0.0 {
            return Err(MemoryError::validation(format!(
                "reinforcement must be a non-negative number, got {}",
                self.reinforcement
            )));
        }

        let h = &self.half_lives;
        for (name, days) in [
            ("fact", h.fact_days),
            ("preference", h.preference_days),
            ("project", h.project_days),
            ("skill", h.skill_days),
        ] {
            if !days.is_finite() || days <= 0.0 {
                return Err(MemoryError::validation(format!(
                    "{} half-life must be positive, got {}",
                    name, days
                )));
            }
        }
        Ok(())
    }
}

/// Scores memories by age, usage and base trust
#[derive(Debug, Clone, Default)]
pub struct ConfidenceEngine {
    config: ConfidenceConfig,
}

impl ConfidenceEngine {
    pub fn new(config: ConfidenceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConfidenceConfig {
        &self.config
    }

    /// Half-life in seconds for a memory type
    pub fn half_life_seconds(&self, memory_type: &MemoryType) -> f64 {
        self.config.half_lives.days_for(memory_type) * SECONDS_PER_DAY
    }

    /// Exponential decay factor for a memory at `now`, in (0, 1]
    pub fn recency_factor(&self, node: &MemoryNode, now: DateTime<Utc>) -> f64 {
        let elapsed = node.temporal.age_seconds_at(now);
        let half_life = self.half_life_seconds(&node.memory_type);
        0.5_f64.powf(elapsed / half_life)
    }

    /// Sub-linear reinforcement from repeated retrieval, >= 1
    pub fn usage_factor(&self, usage_count: u64) -> f64 {
        1.0 + (usage_count as f64 + 1.0).ln() * self.config.reinforcement
    }

    /// Confidence of `node` at `now`, always within 0.0..=1.0
    pub fn score(&self, node: &MemoryNode, now: DateTime<Utc>) -> f64 {
        let base = node.base_confidence.clamp(0.0, 1.0);
        let raw = base * self.recency_factor(node, now) * self.usage_factor(node.usage_count);
        if raw.is_nan() {
            return 0.0;
        }
        raw.clamp(0.0, 1.0)
    }
}
