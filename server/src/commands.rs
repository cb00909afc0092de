//! One-shot command execution against a memory engine.
//!
//! Every command produces a JSON value; `main` decides how to print it.

use chrono::{DateTime, Utc};
use nexus_memory::{parse_id, MemoryEngine, MemoryNode, SearchResult};
use serde::Serialize;

use crate::cli::Command;
use crate::error::{CliError, CliResult};

// ==========================================
// Responses
// ==========================================

/// A memory as shown to callers.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryView {
    pub id: String,
    #[serde(rename = "type")]
    pub memory_type: String,
    pub content: String,
    pub importance: i64,
    pub usage_count: u64,
    pub confidence: f64,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
}

impl MemoryView {
    fn new(node: &MemoryNode, confidence: f64) -> Self {
        Self {
            id: node.id.to_string(),
            memory_type: node.memory_type.as_str().to_string(),
            content: node.content.clone(),
            importance: node.importance,
            usage_count: node.usage_count,
            confidence,
            tags: node.tags.clone(),
            created_at: node.temporal.created_at,
            last_accessed: node.temporal.last_accessed,
        }
    }
}

/// One ranked search hit.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub id: String,
    pub content: String,
    pub score: f64,
    pub relevance: usize,
    pub confidence: f64,
    pub matched_terms: Vec<String>,
}

impl From<&SearchResult> for SearchHit {
    fn from(result: &SearchResult) -> Self {
        Self {
            id: result.memory.id.to_string(),
            content: result.memory.content.clone(),
            score: result.score,
            relevance: result.relevance,
            confidence: result.confidence,
            matched_terms: result.matched_terms.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepResponse {
    pub dry_run: bool,
    pub scanned: usize,
    pub removed: Vec<String>,
    pub already_gone: usize,
}

// ==========================================
// Dispatch
// ==========================================

/// Run a one-shot command. `Serve` is handled by the scheduler instead.
pub fn execute(engine: &MemoryEngine, command: &Command) -> CliResult<serde_json::Value> {
    match command {
        Command::Add {
            content,
            memory_type,
            importance,
            tags,
        } => {
            let id = engine.create_memory(content, memory_type, *importance, tags.clone())?;
            tracing::info!("Stored memory {}", id);
            Ok(serde_json::json!({ "id": id.to_string(), "success": true }))
        }

        Command::Search { query, limit, .. } => {
            let query = query.join(" ");
            let k = limit.unwrap_or(engine.config().search.limit);
            let results = engine.search(&query, k)?;
            tracing::debug!("Search {:?} returned {} results", query, results.len());

            let response = SearchResponse {
                query,
                results: results.iter().map(SearchHit::from).collect(),
            };
            Ok(serde_json::to_value(response)?)
        }

        Command::Show { id } => {
            let id = parse_id(id)?;
            let node = engine.get(&id)?;
            let confidence = engine.confidence_of(&id)?;
            Ok(serde_json::to_value(MemoryView::new(&node, confidence))?)
        }

        Command::List { tag } => {
            let nodes = match tag {
                Some(tag) => engine.store().find_by_tag(tag),
                None => engine.store().get_all(),
            };
            let now = Utc::now();
            let views: Vec<MemoryView> = nodes
                .iter()
                .map(|node| MemoryView::new(node, engine.confidence_engine().score(node, now)))
                .collect();
            Ok(serde_json::to_value(views)?)
        }

        Command::Delete { id } => {
            let id = parse_id(id)?;
            let existed = engine.delete_memory(&id)?;
            Ok(serde_json::json!({ "id": id.to_string(), "deleted": existed, "success": true }))
        }

        Command::Sweep { dry_run: true } => {
            let candidates = engine.retention_preview();
            Ok(serde_json::to_value(SweepResponse {
                dry_run: true,
                scanned: engine.store().len(),
                removed: candidates.iter().map(|c| c.id.to_string()).collect(),
                already_gone: 0,
            })?)
        }

        Command::Sweep { dry_run: false } => {
            let report = engine.sweep_report()?;
            Ok(serde_json::to_value(SweepResponse {
                dry_run: false,
                scanned: report.scanned,
                removed: report.removed.iter().map(|id| id.to_string()).collect(),
                already_gone: report.already_gone,
            })?)
        }

        Command::Stats => Ok(engine.stats()),

        Command::Serve { .. } => Err(CliError::InvalidArgument(
            "serve runs the retention scheduler and has no one-shot result".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_memory::MemoryConfig;
    use tempfile::TempDir;

    fn engine() -> (TempDir, MemoryEngine) {
        let temp_dir = TempDir::new().unwrap();
        let engine = MemoryEngine::open(temp_dir.path(), MemoryConfig::default()).unwrap();
        (temp_dir, engine)
    }

    fn add(engine: &MemoryEngine, content: &str, memory_type: &str, tags: &[&str]) -> String {
        let value = execute(
            engine,
            &Command::Add {
                content: content.to_string(),
                memory_type: memory_type.to_string(),
                importance: None,
                tags: tags.iter().map(|t| t.to_string()).collect(),
            },
        )
        .unwrap();
        value["id"].as_str().unwrap().to_string()
    }

    #[test]
    fn test_add_then_show() {
        let (_dir, engine) = engine();
        let id = add(&engine, "user likes dark mode", "preference", &["ui"]);
        assert_eq!(id.len(), 32);

        let shown = execute(&engine, &Command::Show { id: id.clone() }).unwrap();
        assert_eq!(shown["id"], id);
        assert_eq!(shown["type"], "preference");
        assert_eq!(shown["content"], "user likes dark mode");
        assert_eq!(shown["importance"], 1);
        assert_eq!(shown["usageCount"], 0);
        assert_eq!(shown["tags"][0], "ui");
        assert!(shown["confidence"].as_f64().unwrap() > 0.999);
    }

    #[test]
    fn test_add_empty_content_fails() {
        let (_dir, engine) = engine();
        let err = execute(
            &engine,
            &Command::Add {
                content: "  ".to_string(),
                memory_type: "fact".to_string(),
                importance: None,
                tags: vec![],
            },
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_search_reinforces_hits() {
        let (_dir, engine) = engine();
        let id = add(&engine, "user likes dark mode", "preference", &[]);
        add(&engine, "project uses rust", "project", &[]);

        let value = execute(
            &engine,
            &Command::Search {
                query: vec!["dark".into(), "mode".into()],
                limit: None,
                context: false,
            },
        )
        .unwrap();

        assert_eq!(value["query"], "dark mode");
        let results = value["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["id"], id);
        assert_eq!(results[0]["relevance"], 2);

        let shown = execute(&engine, &Command::Show { id }).unwrap();
        assert_eq!(shown["usageCount"], 1);
    }

    #[test]
    fn test_search_limit_zero() {
        let (_dir, engine) = engine();
        add(&engine, "dark mode", "fact", &[]);

        let value = execute(
            &engine,
            &Command::Search {
                query: vec!["dark".into()],
                limit: Some(0),
                context: false,
            },
        )
        .unwrap();
        assert!(value["results"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_list_filters_by_tag() {
        let (_dir, engine) = engine();
        add(&engine, "first", "fact", &["a"]);
        add(&engine, "second", "fact", &["b"]);

        let all = execute(&engine, &Command::List { tag: None }).unwrap();
        let all = all.as_array().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0]["content"], "first");
        assert_eq!(all[1]["content"], "second");

        let tagged = execute(&engine, &Command::List { tag: Some("b".into()) }).unwrap();
        let tagged = tagged.as_array().unwrap();
        assert_eq!(tagged.len(), 1);
        assert_eq!(tagged[0]["content"], "second");
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (_dir, engine) = engine();
        let id = add(&engine, "temporary", "fact", &[]);

        let first = execute(&engine, &Command::Delete { id: id.clone() }).unwrap();
        assert_eq!(first["deleted"], true);
        let second = execute(&engine, &Command::Delete { id: id.clone() }).unwrap();
        assert_eq!(second["deleted"], false);
        assert_eq!(second["success"], true);

        let err = execute(&engine, &Command::Show { id }).unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_show_bad_id() {
        let (_dir, engine) = engine();
        let err = execute(&engine, &Command::Show { id: "zzz".into() }).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_sweep_fresh_store_removes_nothing() {
        let (_dir, engine) = engine();
        add(&engine, "fresh", "fact", &[]);

        let preview = execute(&engine, &Command::Sweep { dry_run: true }).unwrap();
        assert_eq!(preview["dryRun"], true);
        assert_eq!(preview["scanned"], 1);
        assert!(preview["removed"].as_array().unwrap().is_empty());

        let report = execute(&engine, &Command::Sweep { dry_run: false }).unwrap();
        assert_eq!(report["dryRun"], false);
        assert!(report["removed"].as_array().unwrap().is_empty());
        assert_eq!(engine.store().len(), 1);
    }

    #[test]
    fn test_stats() {
        let (_dir, engine) = engine();
        add(&engine, "a", "fact", &[]);
        add(&engine, "b", "skill", &[]);

        let stats = execute(&engine, &Command::Stats).unwrap();
        assert_eq!(stats["totalMemories"], 2);
    }

    #[test]
    fn test_serve_is_not_one_shot() {
        let (_dir, engine) = engine();
        let err = execute(&engine, &Command::Serve { interval_secs: None }).unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument(_)));
    }
}
