//! A three-document corpus for demos and offline runs.
use ragfuse_core::types::{meta_keys, IngestDocument};

pub fn sample_corpus() -> Vec<IngestDocument> {
    vec![
        IngestDocument::new(
            "# Database Performance Tuning\n\n\
             Indexes speed up reads at the cost of slower writes. Measure query latency before and after each change.\n\n\
             Connection pooling avoids the overhead of opening a connection per request and is usually the cheapest \
             performance win for busy services.",
        )
        .with_meta(meta_keys::TITLE, "Database Performance Tuning")
        .with_meta(meta_keys::CATEGORY, "databases")
        .with_meta(meta_keys::TAGS, "performance,indexing,pooling")
        .with_meta(meta_keys::SOURCE, "db-performance.md"),
        IngestDocument::new(
            "# Caching Strategies\n\n\
             A read-through cache keeps hot data in memory and cuts latency for repeated lookups. Pick a TTL that \
             matches how stale the data may be.\n\n\
             Cache invalidation is the hard part: prefer explicit eviction on writes over short TTLs when \
             correctness matters.",
        )
        .with_meta(meta_keys::TITLE, "Caching Strategies")
        .with_meta(meta_keys::CATEGORY, "architecture")
        .with_meta(meta_keys::TAGS, "caching,latency")
        .with_meta(meta_keys::SOURCE, "caching.md"),
        IngestDocument::new(
            "# Team Onboarding\n\n\
             New engineers pair with a buddy during their first week and ship a small change by Friday.\n\n\
             Access requests go through the service desk; expect one business day for approval.",
        )
        .with_meta(meta_keys::TITLE, "Team Onboarding")
        .with_meta(meta_keys::CATEGORY, "process")
        .with_meta(meta_keys::SOURCE, "onboarding.md"),
    ]
}
