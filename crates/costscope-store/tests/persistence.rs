use costscope_engine::test_support::{builtin_engine, mixed_use_described, nashville_office};
use costscope_models::config::StoreConfig;
use costscope_store::{CachedStore, ResultStore, StoredResult};

fn config(dir: &tempfile::TempDir) -> StoreConfig {
    StoreConfig {
        sqlite_path: dir.path().join("results.db").to_string_lossy().into_owned(),
        memory_max_capacity: 10,
    }
}

#[test]
fn results_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let engine = builtin_engine().unwrap();
    let result = engine.calculate(&nashville_office()).unwrap();

    {
        let store = CachedStore::open(&config(&dir)).unwrap();
        store.put(&StoredResult::new("office-1", result.clone())).unwrap();
    }

    let reopened = CachedStore::open(&config(&dir)).unwrap();
    assert_eq!(reopened.hot_cache_size(), 0);

    let fetched = reopened.get("office-1").unwrap().unwrap();
    assert_eq!(fetched.result, result);
    assert_eq!(fetched.result.without_timestamp(), result.without_timestamp());
    assert_eq!(reopened.hot_cache_size(), 1);
}

#[test]
fn stored_result_still_builds_the_same_table() {
    let dir = tempfile::tempdir().unwrap();
    let engine = builtin_engine().unwrap();
    let result = engine.calculate(&nashville_office()).unwrap();
    let expected = engine.scenario_table("office-1", &result).unwrap();

    let store = CachedStore::open(&config(&dir)).unwrap();
    store.put(&StoredResult::new("office-1", result)).unwrap();
    let fetched = store.get("office-1").unwrap().unwrap();
    let rebuilt = engine.scenario_table("office-1", &fetched.result).unwrap();

    assert_eq!(rebuilt.rows, expected.rows);
    assert_eq!(rebuilt.columns, expected.columns);
}

#[test]
fn mixed_use_split_is_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let engine = builtin_engine().unwrap();
    let result = engine
        .calculate(&mixed_use_described("Mostly residential with ground floor office"))
        .unwrap();

    let store = CachedStore::open(&config(&dir)).unwrap();
    store.put(&StoredResult::new("mixed-1", result.clone())).unwrap();
    assert!(store.remove("mixed-1").unwrap());
    assert!(store.get("mixed-1").unwrap().is_none());

    store.put(&StoredResult::new("mixed-1", result.clone())).unwrap();
    let fetched = store.get("mixed-1").unwrap().unwrap();
    assert_eq!(fetched.result.mixed_use_split, result.mixed_use_split);
    assert_eq!(store.len().unwrap(), 1);
}
