//! Memory node types and builders
//!
//! Core types for representing memories in Nexus.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::temporal::TemporalMetadata;

/// Unique identifier for memory nodes
///
/// Backed by a random v4 UUID and rendered as 32 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemoryId(pub Uuid);

impl MemoryId {
    /// Create a new random MemoryId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for MemoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MemoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl std::str::FromStr for MemoryId {
    type Err = uuid::Error;

    /// Accepts both the simple hex form and the hyphenated UUID form
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Category of a memory, which selects its decay policy
///
/// Unknown categories are kept verbatim and decay like facts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum MemoryType {
    #[default]
    Fact,
    Preference,
    Project,
    Skill,
    Other(String),
}

impl MemoryType {
    /// Parse a type label; never fails
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "" | "fact" => Self::Fact,
            "preference" => Self::Preference,
            "project" => Self::Project,
            "skill" => Self::Skill,
            _ => Self::Other(label.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Fact => "fact",
            Self::Preference => "preference",
            Self::Project => "project",
            Self::Skill => "skill",
            Self::Other(label) => label,
        }
    }

    /// Whether this is one of the built-in categories
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemoryType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl Serialize for MemoryType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MemoryType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Self::parse(&label))
    }
}

fn default_importance() -> i64 {
    1
}

fn default_base_confidence() -> f64 {
    1.0
}

/// A single stored unit of content with decay and usage metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryNode {
    /// Unique identifier
    pub id: MemoryId,
    /// Category, selects the half-life
    #[serde(rename = "type", default)]
    pub memory_type: MemoryType,
    /// Text payload
    pub content: String,
    /// Creation and access timestamps
    pub temporal: TemporalMetadata,
    /// Additive ranking weight
    #[serde(default = "default_importance")]
    pub importance: i64,
    /// Number of retrievals that surfaced this memory
    #[serde(default)]
    pub usage_count: u64,
    /// Trust assigned at creation (0.0 to 1.0)
    #[serde(default = "default_base_confidence")]
    pub base_confidence: f64,
    /// Free-text labels
    #[serde(default)]
    pub tags: Vec<String>,
    /// Insertion sequence, keeps snapshot order stable across restarts
    #[serde(default)]
    pub(crate) sequence: u64,
}

impl MemoryNode {
    /// Create a new builder for MemoryNode
    pub fn builder() -> MemoryNodeBuilder {
        MemoryNodeBuilder::new()
    }

    /// Lowercased content used for lexical matching
    pub fn searchable_text(&self) -> String {
        self.content.to_lowercase()
    }

    /// Record a retrieval at `now`
    pub fn record_access(&mut self, now: chrono::DateTime<chrono::Utc>) {
        self.temporal.touch(now);
        self.usage_count = self.usage_count.saturating_add(1);
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Builder for MemoryNode with fluent API
#[derive(Debug, Default)]
pub struct MemoryNodeBuilder {
    id: Option<MemoryId>,
    memory_type: Option<MemoryType>,
    content: Option<String>,
    temporal: Option<TemporalMetadata>,
    importance: Option<i64>,
    usage_count: u64,
    base_confidence: Option<f64>,
    tags: Vec<String>,
}

impl MemoryNodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the memory ID (auto-generated if not set)
    pub fn id(mut self, id: MemoryId) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the memory type (defaults to fact)
    pub fn memory_type(mut self, memory_type: MemoryType) -> Self {
        self.memory_type = Some(memory_type);
        self
    }

    /// Set the memory type from a free-form label
    pub fn type_label(self, label: &str) -> Self {
        self.memory_type(MemoryType::parse(label))
    }

    /// Set as fact
    pub fn fact(self) -> Self {
        self.memory_type(MemoryType::Fact)
    }

    /// Set as preference
    pub fn preference(self) -> Self {
        self.memory_type(MemoryType::Preference)
    }

    /// Set as project note
    pub fn project(self) -> Self {
        self.memory_type(MemoryType::Project)
    }

    /// Set as skill
    pub fn skill(self) -> Self {
        self.memory_type(MemoryType::Skill)
    }

    /// Set the content
    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Set temporal metadata
    pub fn temporal(mut self, temporal: TemporalMetadata) -> Self {
        self.temporal = Some(temporal);
        self
    }

    /// Set the creation time (access time starts equal to it)
    pub fn created_at(self, at: chrono::DateTime<chrono::Utc>) -> Self {
        self.temporal(TemporalMetadata::created_at(at))
    }

    /// Set the importance weight
    pub fn importance(mut self, importance: i64) -> Self {
        self.importance = Some(importance);
        self
    }

    /// Set the usage counter
    pub fn usage_count(mut self, usage_count: u64) -> Self {
        self.usage_count = usage_count;
        self
    }

    /// Set base confidence, clamped to 0.0..=1.0
    pub fn base_confidence(mut self, confidence: f64) -> Self {
        self.base_confidence = Some(confidence);
        self
    }

    /// Add a tag
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Set multiple tags
    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Build the MemoryNode
    pub fn build(self) -> Result<MemoryNode, MemoryNodeBuilderError> {
        let content = self.content.ok_or(MemoryNodeBuilderError::MissingContent)?;
        if content.trim().is_empty() {
            return Err(MemoryNodeBuilderError::EmptyContent);
        }

        let base_confidence = match self.base_confidence {
            Some(c) if c.is_nan() => return Err(MemoryNodeBuilderError::InvalidConfidence),
            Some(c) => c.clamp(0.0, 1.0),
            None => default_base_confidence(),
        };

        let mut tags: Vec<String> = Vec::with_capacity(self.tags.len());
        for tag in self.tags {
            let tag = tag.trim();
            if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
                tags.push(tag.to_string());
            }
        }

        Ok(MemoryNode {
            id: self.id.unwrap_or_default(),
            memory_type: self.memory_type.unwrap_or_default(),
            content,
            temporal: self.temporal.unwrap_or_else(TemporalMetadata::new_current),
            importance: self.importance.unwrap_or_else(default_importance),
            usage_count: self.usage_count,
            base_confidence,
            tags,
            sequence: 0,
        })
    }
}

/// Errors that can occur when building a MemoryNode
#[derive(Debug, thiserror::Error)]
pub enum MemoryNodeBuilderError {
    #[error("Missing required field: content")]
    MissingContent,
    #[error("Content must not be empty")]
    EmptyContent,
    #[error("Base confidence must be a number")]
    InvalidConfidence,
}
