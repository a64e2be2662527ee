use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use proptest::prelude::*;

use buildctx::config::ConfigCache;
use buildctx::config::model::{Config, ResolvedConfig};

fn resolved_stub() -> Arc<ResolvedConfig> {
    Arc::new(ResolvedConfig {
        config: Config::default(),
        source_path: None,
        hash: "0".repeat(64),
        dependencies: BTreeSet::new(),
    })
}

proptest! {
    #[test]
    fn lru_never_exceeds_capacity(
        capacity in 1usize..8,
        keys in prop::collection::vec("[a-e]", 1..64),
    ) {
        let mut cache = ConfigCache::new(capacity);
        for key in keys {
            cache.insert(PathBuf::from(format!("/{key}")), resolved_stub(), HashMap::new());
            prop_assert!(cache.len() <= capacity);
        }
    }

    #[test]
    fn generations_only_ever_advance(
        keys in prop::collection::vec("[a-c]", 1..64),
    ) {
        let mut cache = ConfigCache::new(4);
        let mut seen: HashMap<PathBuf, u64> = HashMap::new();
        for key in keys {
            let path = PathBuf::from(format!("/{key}"));
            cache.invalidate(&path);
            let generation = cache.generation(&path);
            let previous = seen.insert(path, generation).unwrap_or(0);
            prop_assert!(generation > previous);
        }
    }
}

#[test]
fn least_recently_used_entry_is_evicted_first() {
    let mut cache = ConfigCache::new(2);
    let a = PathBuf::from("/a");
    let b = PathBuf::from("/b");
    let c = PathBuf::from("/c");

    cache.insert(a.clone(), resolved_stub(), HashMap::new());
    cache.insert(b.clone(), resolved_stub(), HashMap::new());

    // Refresh /a so /b becomes the oldest.
    assert!(cache.lookup(&a).is_some());

    cache.insert(c.clone(), resolved_stub(), HashMap::new());
    assert_eq!(cache.len(), 2);
    assert!(cache.lookup(&a).is_some());
    assert!(cache.lookup(&b).is_none());
    assert!(cache.lookup(&c).is_some());
}

#[test]
fn invalidation_survives_eviction() {
    let mut cache = ConfigCache::new(1);
    let a = PathBuf::from("/a");
    let b = PathBuf::from("/b");

    cache.insert(a.clone(), resolved_stub(), HashMap::new());
    cache.invalidate(&a);

    // /a is gone and /b evicts nothing relevant, yet /a's generation holds.
    cache.insert(b.clone(), resolved_stub(), HashMap::new());
    assert_eq!(cache.generation(&a), 1);

    // Reinserting /a tags the entry with the current generation.
    cache.insert(a.clone(), resolved_stub(), HashMap::new());
    let entry = cache.lookup(&a).expect("entry present");
    assert_eq!(entry.generation, 1);
}
