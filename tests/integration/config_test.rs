//! Configuration file tests

use poly_history::config::Config;
use poly_history::export::ExportFormat;
use std::path::Path;

#[test]
fn test_example_config_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config.toml.example");
    let config = Config::load(&path).unwrap();

    config.validate().unwrap();
    assert_eq!(config.discovery.page_size, 100);
    assert_eq!(config.export.format, ExportFormat::Csv);
    assert_eq!(config.selection.target_outcome, "Yes");
}

#[test]
fn test_invalid_config_rejected_before_use() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[export]\nfilename_pattern = \"static.csv\"\n").unwrap();

    assert!(Config::load(&path).is_ok());
    assert!(Config::load_or_default(Some(&path)).is_err());
}
