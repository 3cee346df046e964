//! Unit tests for configuration value objects

use recs_domain::value_objects::{
    CacheConfig, IndexConfig, IndexKind, PersonalizationConfig, RequestContext, SearchConfig,
};

#[test]
fn test_search_defaults() {
    let config = SearchConfig::default();
    assert!((config.selectivity_threshold - 0.10).abs() < 1e-9);
    assert_eq!(config.overfetch_factor, 5);
    assert_eq!(config.max_overfetch_factor, 10);
}

#[test]
fn test_context_weights() {
    let config = PersonalizationConfig::default();
    let feed = config.weights_for(RequestContext::Feed);
    assert!(feed.long_term > feed.session);
    assert!(feed.query.abs() < 1e-6);

    let search = config.weights_for(RequestContext::Search);
    assert!(search.query > search.long_term + search.session);

    let similar = config.weights_for(RequestContext::Similar);
    assert!((similar.query - 0.9).abs() < 1e-6);
}

#[test]
fn test_index_kind_serde() {
    let config = IndexConfig {
        kind: IndexKind::Ivf {
            nlist: 4,
            nprobe: 2,
        },
        ..IndexConfig::with_dimensions(8)
    };
    let json = serde_json::to_string(&config).unwrap();
    assert!(json.contains("\"type\":\"ivf\""));
    let back: IndexConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}

#[test]
fn test_partial_config_uses_defaults() {
    let config: CacheConfig = serde_json::from_str(r#"{"result_ttl_secs": 60}"#).unwrap();
    assert_eq!(config.result_ttl_secs, 60);
    assert_eq!(config.max_entries, CacheConfig::default().max_entries);
    assert!(config.product_ttl_secs.is_none());
}
