use std::io::Write;
use std::path::Path;

use costscope::models::config::CostscopeConfig;
use costscope::store::ResultStore;
use costscope_engine::test_support::{nashville_office, request};
use rust_decimal::Decimal;

fn registry_dir() -> String {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../costscope-registry/data")
        .to_string_lossy()
        .into_owned()
}

fn write_config(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("costscope.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(body.as_bytes()).unwrap();
    path
}

#[test]
fn sample_config_parses() {
    let sample = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/costscope.toml");
    let config = costscope::load_config(Some(&sample)).unwrap();
    assert!(config.registry.strict);
    assert!(config.store.is_some());
}

#[test]
fn missing_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = costscope::load_config(Some(&dir.path().join("absent.toml")));
    assert!(result.is_err());
}

#[test]
fn strict_registry_from_directory_matches_builtin() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        &format!(
            "[registry]\ndir = {:?}\nstrict = true\n",
            registry_dir()
        ),
    );
    let from_dir = costscope::build_engine(&costscope::load_config(Some(&path)).unwrap()).unwrap();
    let builtin = costscope::build_engine(&CostscopeConfig::default()).unwrap();

    let a = from_dir.calculate(&nashville_office()).unwrap();
    let b = builtin.calculate(&nashville_office()).unwrap();
    assert_eq!(a.without_timestamp(), b.without_timestamp());
}

#[test]
fn end_to_end_with_store() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("results.db");
    let path = write_config(
        &dir,
        &format!(
            "[engine]\ndealshield = true\n\n[store]\nsqlite_path = {:?}\n",
            db.to_string_lossy()
        ),
    );
    let config = costscope::load_config(Some(&path)).unwrap();
    let engine = costscope::build_engine(&config).unwrap();
    let store = costscope::build_store(&config).unwrap().unwrap();

    let apartments = request(
        "multifamily",
        Some("luxury_apartments"),
        Decimal::from(150_000),
        "Charlotte, NC",
    );
    let record = costscope::calculate(&engine, Some(&store), None, &apartments).unwrap();

    let stored = store.get(&record.request_id).unwrap().unwrap();
    let table = engine
        .scenario_table(&stored.request_id, &stored.result)
        .unwrap();
    assert_eq!(table.request_id, record.request_id);
    assert_eq!(table.rows[0].scenario_id, "base");
    assert_eq!(store.recent(5).unwrap().len(), 1);
}

#[test]
fn disabling_dealshield_omits_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "[engine]\ndealshield = false\n");
    let engine = costscope::build_engine(&costscope::load_config(Some(&path)).unwrap()).unwrap();

    let result = engine.calculate(&nashville_office()).unwrap();
    assert!(result.dealshield_scenarios.is_none());
}
