use chrono::{Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nexus_memory::{ConfidenceEngine, MemoryNode, MemorySearch, MemoryStore, MemoryType, SearchConfig};
use std::sync::Arc;

const TYPES: [MemoryType; 4] = [
    MemoryType::Fact,
    MemoryType::Preference,
    MemoryType::Project,
    MemoryType::Skill,
];

fn sample_nodes(count: usize) -> Vec<MemoryNode> {
    let now = Utc::now();
    (0..count)
        .map(|i| {
            MemoryNode::builder()
                .memory_type(TYPES[i % TYPES.len()].clone())
                .content(format!("memory {} about topic {} and detail {}", i, i % 17, i % 5))
                .created_at(now - Duration::days((i % 400) as i64))
                .usage_count((i % 13) as u64)
                .build()
                .unwrap()
        })
        .collect()
}

fn bench_confidence(c: &mut Criterion) {
    let engine = ConfidenceEngine::default();
    let nodes = sample_nodes(1_000);
    let now = Utc::now();

    c.bench_function("confidence_1k", |b| {
        b.iter(|| {
            nodes
                .iter()
                .map(|n| engine.score(black_box(n), now))
                .sum::<f64>()
        })
    });
}

fn bench_rank(c: &mut Criterion) {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let store = Arc::new(MemoryStore::open(temp_dir.path()).unwrap());
    let search = MemorySearch::new(store, ConfidenceEngine::default(), SearchConfig::default());
    let nodes = sample_nodes(5_000);
    let now = Utc::now();

    c.bench_function("rank_5k", |b| {
        b.iter(|| search.rank(black_box("topic 3 detail"), &nodes, 10, now))
    });
}

criterion_group!(benches, bench_confidence, bench_rank);
criterion_main!(benches);
