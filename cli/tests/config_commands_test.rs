use rankscope_cli::commands::{config, load_config};
use rankscope_core::AppConfig;
use tempfile::TempDir;

#[test]
fn test_init_writes_loadable_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("rankscope").join("config.toml");

    let written = config::init(Some(&path), false).unwrap();
    assert_eq!(written, path);
    assert!(path.exists());

    let loaded = load_config(Some(&path)).unwrap();
    let defaults = AppConfig::default();
    assert_eq!(loaded.analysis.competitor_count, defaults.analysis.competitor_count);
    assert_eq!(loaded.providers.serp_zone, "serp_api1");
}

#[test]
fn test_init_refuses_to_overwrite_without_force() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[analysis]\ncompetitor_count = 7\n").unwrap();

    let err = config::init(Some(&path), false).unwrap_err();
    assert!(err.to_string().contains("already exists"));
    assert!(std::fs::read_to_string(&path).unwrap().contains("= 7"));

    config::init(Some(&path), true).unwrap();
    assert!(!std::fs::read_to_string(&path).unwrap().contains("= 7"));
}

#[test]
fn test_show_prints_effective_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[scoring]\nreadability = 0.5\n").unwrap();

    let shown = config::show(Some(&path)).unwrap();
    assert!(shown.contains("[scoring]"));
    assert!(shown.contains("readability = 0.5"));
    assert!(shown.contains("[governor]"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[governor]\nmax_concurrent_per_provider = 0\n").unwrap();

    let err = load_config(Some(&path)).unwrap_err();
    assert!(format!("{err:#}").contains("max_concurrent_per_provider"));
}

#[test]
fn test_missing_explicit_config_is_an_error() {
    let dir = TempDir::new().unwrap();
    assert!(load_config(Some(&dir.path().join("absent.toml"))).is_err());
}
