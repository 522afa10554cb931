//! Configuration loading tests against files on disk

use drillsense::config::loader::{load_config, DEFAULT_CONFIG_FILE};
use drillsense::{ConfigSources, CouponConfig, CouponError};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn shipped_config_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config")
}

fn config_dir_with_defaults() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::copy(
        shipped_config_dir().join(DEFAULT_CONFIG_FILE),
        dir.path().join(DEFAULT_CONFIG_FILE),
    )
    .unwrap();
    dir
}

#[test]
fn test_shipped_site_overrides_replace_keys() {
    let merged = ConfigSources::new(shipped_config_dir())
        .with_site("ORANGE")
        .load();
    let config = CouponConfig::from_map(merged).unwrap();

    assert_eq!(config.coupon_name, "bdsense_cpn");
    assert_eq!(config.font_type, "simple");
    assert_eq!(config.top_mask_name, "sm_top");
    // Keys absent from the site file keep their defaults
    assert_eq!(config.pth_hole_size, 40.0);
}

#[test]
fn test_unknown_site_uses_defaults() {
    let merged = ConfigSources::new(shipped_config_dir())
        .with_site("NOWHERE")
        .load();
    let config = CouponConfig::from_map(merged).unwrap();

    assert_eq!(config.coupon_name, "bd_sense_cpn");
    assert_eq!(config.top_mask_name, "smt");
}

#[test]
fn test_broken_site_file_degrades_to_defaults() {
    let dir = config_dir_with_defaults();
    fs::write(dir.path().join("BROKEN_DepthSensing.json"), "{ \"coupon_name\": ").unwrap();

    let merged = ConfigSources::new(dir.path()).with_site("BROKEN").load();
    let config = CouponConfig::from_map(merged).unwrap();

    assert_eq!(config.coupon_name, "bd_sense_cpn");
}

#[test]
fn test_site_override_is_shallow() {
    let dir = config_dir_with_defaults();
    fs::write(
        dir.path().join("EAST_DepthSensing.json"),
        r#"{"pth_hole_pad_size": 70, "thieving_rout_width": 9}"#,
    )
    .unwrap();

    let merged = ConfigSources::new(dir.path()).with_site("EAST").load();
    let config = CouponConfig::from_map(merged).unwrap();

    assert_eq!(config.pth_hole_pad_size, 70.0);
    assert_eq!(config.thieving_rout_width, 9.0);
    assert_eq!(config.drill_sense_hole_pad_size, 24.0);
}

#[test]
fn test_missing_config_dir_falls_back_to_embedded_defaults() {
    let dir = TempDir::new().unwrap();

    let merged = ConfigSources::new(dir.path().join("absent")).load();

    assert_eq!(merged["coupon_name"], "bd_sense_cpn");
}

#[test]
fn test_explicit_missing_default_file_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope.json");

    assert!(load_config(&missing).is_empty());

    let merged = ConfigSources::new(dir.path())
        .with_default_path(&missing)
        .load();
    let result = CouponConfig::from_map(merged);

    assert!(matches!(result, Err(CouponError::Config(_))));
}

#[test]
fn test_missing_required_key_is_named() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(DEFAULT_CONFIG_FILE),
        r#"{"coupon_name": "partial", "pth_hole_lay_name": "drill"}"#,
    )
    .unwrap();

    let merged = ConfigSources::new(dir.path()).load();
    match CouponConfig::from_map(merged) {
        Err(CouponError::Config(msg)) => assert!(msg.contains("drill_sense_lay_name")),
        other => panic!("expected config error, got {:?}", other),
    }
}
