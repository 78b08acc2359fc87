//! Integration tests over the registry compiled into the binary and the
//! on-disk layout it mirrors.

use std::fs;

use costscope_models::building::Trade;
use costscope_models::dealshield::{CONSERVATIVE_ROW, UGLY_ROW};
use costscope_registry::loader::BUILTIN_SOURCES;
use costscope_registry::validate::share_epsilon;
use costscope_registry::{Registry, RegistryError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn write_builtin_to(dir: &std::path::Path) {
    for (path, contents) in BUILTIN_SOURCES {
        let target = dir.join(path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(target, contents).unwrap();
    }
}

#[test]
fn every_subtype_has_unit_trade_shares() {
    let registry = Registry::builtin().unwrap();
    for bt in registry.building_types() {
        for (name, config) in &bt.subtypes {
            let diff = (config.trades.total() - Decimal::ONE).abs();
            assert!(diff <= share_epsilon(), "{}/{name}", bt.building_type);
        }
    }
}

#[test]
fn every_scope_profile_covers_all_trades() {
    let registry = Registry::builtin().unwrap();
    for profile in registry.scope_profiles() {
        for trade in Trade::ALL {
            assert!(!profile.items(trade).is_empty(), "{} {}", profile.id, trade.as_str());
            let diff = (profile.share_total(trade) - Decimal::ONE).abs();
            assert!(diff <= share_epsilon(), "{} {}", profile.id, trade.as_str());
        }
    }
}

#[test]
fn every_tile_profile_declares_conservative_and_ugly() {
    let registry = Registry::builtin().unwrap();
    let mut count = 0;
    for profile in registry.tile_profiles() {
        let conservative = profile.row(CONSERVATIVE_ROW).unwrap();
        let ugly = profile.row(UGLY_ROW).unwrap();
        let ugly_tiles: Vec<&str> = ugly.stress_tiles().collect();
        for tile in conservative.stress_tiles() {
            assert!(ugly_tiles.contains(&tile), "{} {tile}", profile.id);
        }
        count += 1;
    }
    assert_eq!(count, 5);
}

#[test]
fn every_bound_subtype_has_content() {
    let registry = Registry::builtin().unwrap();
    for bt in registry.building_types() {
        for config in bt.subtypes.values() {
            if let Some(profile) = &config.dealshield_tile_profile {
                assert!(registry.content_for(profile).is_some(), "{profile}");
            }
        }
    }
}

#[test]
fn city_only_override_is_declared_for_office() {
    let registry = Registry::builtin().unwrap();
    let office = registry.building_type("office").unwrap();
    let nashville = office.regional.city_only_overrides["nashville"];
    assert_eq!(nashville.cost, dec!(0.98));
    assert_eq!(nashville.revenue, dec!(1.05));
}

#[test]
fn from_dir_matches_builtin() {
    let dir = tempfile::tempdir().unwrap();
    write_builtin_to(dir.path());

    let loaded = Registry::from_dir(dir.path()).unwrap();
    let builtin = Registry::builtin().unwrap();
    assert_eq!(
        loaded.building_types().count(),
        builtin.building_types().count()
    );
    assert!(loaded.validate().is_empty());
    assert_eq!(
        loaded.get_config("office", Some("class_a")).unwrap().config,
        builtin.get_config("office", Some("class_a")).unwrap().config
    );
}

#[test]
fn strict_load_rejects_a_broken_directory() {
    let dir = tempfile::tempdir().unwrap();
    write_builtin_to(dir.path());

    let office = dir.path().join("buildings/office.toml");
    let broken = fs::read_to_string(&office)
        .unwrap()
        .replace("baseline_subtype = \"class_b\"", "baseline_subtype = \"class_c\"");
    fs::write(&office, broken).unwrap();

    let lenient = Registry::load(dir.path().to_str(), false).unwrap();
    assert_eq!(lenient.validate().len(), 1);

    match Registry::load(dir.path().to_str(), true) {
        Err(RegistryError::Integrity(violations)) => {
            assert_eq!(violations[0].scope, "office");
        }
        other => panic!("expected integrity failure, got {other:?}"),
    }
}
