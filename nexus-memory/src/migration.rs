//! Database migration utilities
//!
//! Handles format migrations to preserve user data across versions.
//!
//! - v1: flat JSON rows mirroring the old `memory_nodes` table
//!   (unix-second timestamps, comma separated tags)
//! - v2: MessagePack-encoded [`MemoryNode`] maps

use chrono::{DateTime, TimeZone, Utc};
use rocksdb::{Direction, IteratorMode, WriteBatch, DB};
use serde::Deserialize;

use crate::error::{MemoryError, Result};
use crate::node::{MemoryId, MemoryNode, MemoryType};
use crate::storage::{decode_node, encode_node, memory_key, MEMORY_PREFIX};
use crate::temporal::TemporalMetadata;

/// Database version stored in metadata
pub(crate) const DB_VERSION_KEY: &[u8] = b"_db_version";
pub(crate) const CURRENT_VERSION: u32 = 2;

/// Rows a migration could not read are moved here, out of the `mem:` range
pub(crate) const QUARANTINE_PREFIX: &str = "bad:";

pub(crate) fn quarantine_key(key: &[u8]) -> Vec<u8> {
    let mut quarantined = QUARANTINE_PREFIX.as_bytes().to_vec();
    quarantined.extend_from_slice(key);
    quarantined
}

/// Row layout written by v1 builds
#[derive(Debug, Deserialize)]
struct LegacyRow {
    id: String,
    #[serde(rename = "type", default)]
    memory_type: Option<String>,
    content: String,
    timestamp: i64,
    #[serde(default)]
    last_accessed: Option<i64>,
    #[serde(default)]
    importance: Option<i64>,
    #[serde(default)]
    usage_count: Option<u64>,
    #[serde(default)]
    base_confidence: Option<f64>,
    #[serde(default)]
    tags: Option<String>,
}

impl LegacyRow {
    fn into_node(self) -> Result<MemoryNode> {
        let created_at = unix_seconds(self.timestamp)?;
        let mut temporal = TemporalMetadata::created_at(created_at);
        if let Some(last) = self.last_accessed {
            temporal.touch(unix_seconds(last)?);
        }

        let id = match self.id.parse::<MemoryId>() {
            Ok(id) => id,
            Err(_) => {
                let id = MemoryId::new();
                log::debug!("Legacy id {} re-keyed as {}", self.id, id);
                id
            }
        };

        let tags = self
            .tags
            .unwrap_or_default()
            .split(',')
            .map(str::to_string)
            .collect();

        let mut builder = MemoryNode::builder()
            .id(id)
            .memory_type(MemoryType::parse(self.memory_type.as_deref().unwrap_or("")))
            .content(self.content)
            .temporal(temporal)
            .usage_count(self.usage_count.unwrap_or(0))
            .tags(tags);
        if let Some(importance) = self.importance {
            builder = builder.importance(importance);
        }
        if let Some(confidence) = self.base_confidence {
            builder = builder.base_confidence(confidence);
        }

        Ok(builder.build()?)
    }
}

fn unix_seconds(secs: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .ok_or_else(|| MemoryError::corrupted(format!("timestamp out of range: {}", secs)))
}

/// Read the stored schema version; stores without the key are v1
pub(crate) fn read_version(db: &DB) -> Result<u32> {
    match db.get(DB_VERSION_KEY)? {
        Some(bytes) => {
            let version_bytes: [u8; 4] = bytes
                .as_slice()
                .try_into()
                .map_err(|_| MemoryError::corrupted("Invalid version format"))?;
            Ok(u32::from_le_bytes(version_bytes))
        }
        None => Ok(1),
    }
}

/// Check if database needs migration and perform if needed
///
/// `fresh` is true when the database did not exist before this open; such
/// stores are simply stamped with the current version.
pub fn migrate_if_needed(db: &DB, fresh: bool) -> Result<()> {
    if fresh {
        log::debug!("New database, stamping version {}", CURRENT_VERSION);
        db.put(DB_VERSION_KEY, CURRENT_VERSION.to_le_bytes())?;
        db.flush()?;
        return Ok(());
    }

    let current_version = read_version(db)?;

    log::info!(
        "Database version: {} (current: {})",
        current_version,
        CURRENT_VERSION
    );

    if current_version > CURRENT_VERSION {
        log::warn!(
            "Database was written by a newer build (v{}); unknown fields will be ignored",
            current_version
        );
        return Ok(());
    }

    if current_version < CURRENT_VERSION {
        log::warn!(
            "Database needs migration from v{} to v{}",
            current_version,
            CURRENT_VERSION
        );
        perform_migration(db, current_version)?;

        db.put(DB_VERSION_KEY, CURRENT_VERSION.to_le_bytes())?;
        db.flush()?;

        log::info!("Migration completed successfully");
    }

    Ok(())
}

/// Perform migration from old version to current
fn perform_migration(db: &DB, from_version: u32) -> Result<()> {
    match from_version {
        1 => migrate_v1_to_v2(db),
        _ => Err(MemoryError::corrupted(format!(
            "Unknown database version: {}",
            from_version
        ))),
    }
}

/// Migrate from v1 (flat JSON rows) to v2 (MessagePack nodes)
fn migrate_v1_to_v2(db: &DB) -> Result<()> {
    log::info!("Migrating database from v1 to v2...");

    let mut migrated: Vec<(Box<[u8]>, MemoryNode)> = Vec::new();
    let mut skipped: Vec<(Box<[u8]>, Box<[u8]>)> = Vec::new();
    let iter = db.iterator(IteratorMode::From(MEMORY_PREFIX.as_bytes(), Direction::Forward));

    for item in iter {
        let (key, value) = item?;
        if !key.starts_with(MEMORY_PREFIX.as_bytes()) {
            break;
        }

        match serde_json::from_slice::<LegacyRow>(&value) {
            Ok(row) => match row.into_node() {
                Ok(node) => migrated.push((key, node)),
                Err(e) => {
                    log::error!(
                        "Failed to convert legacy row {}: {}. Skipping.",
                        String::from_utf8_lossy(&key),
                        e
                    );
                    skipped.push((key, value));
                }
            },
            Err(json_err) => match decode_node(&value) {
                Ok(node) => {
                    log::debug!(
                        "Row already in v2 format: {}",
                        String::from_utf8_lossy(&key)
                    );
                    migrated.push((key, node));
                }
                Err(decode_err) => {
                    log::error!(
                        "Failed to read row {}: JSON error: {}, MessagePack error: {}. Skipping.",
                        String::from_utf8_lossy(&key),
                        json_err,
                        decode_err
                    );
                    skipped.push((key, value));
                }
            },
        }
    }

    log::info!(
        "Found {} memories to migrate ({} skipped)",
        migrated.len(),
        skipped.len()
    );

    // v1 had no insertion sequence; creation time is the closest order
    migrated.sort_by(|a, b| a.1.temporal.created_at.cmp(&b.1.temporal.created_at));

    let mut batch = WriteBatch::default();
    for (sequence, (old_key, mut node)) in migrated.into_iter().enumerate() {
        node.sequence = sequence as u64 + 1;
        let new_key = memory_key(&node.id);
        if old_key.as_ref() != new_key.as_bytes() {
            batch.delete(&old_key);
        }
        batch.put(new_key.as_bytes(), encode_node(&node)?);
    }
    for (key, value) in &skipped {
        batch.put(quarantine_key(key), value);
        batch.delete(key);
    }

    db.write(batch)?;
    db.flush()?;
    Ok(())
}
