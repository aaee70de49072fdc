use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use std::fs;
use tempfile::tempdir;
use threaded_inventory::config::{Config, ConfigError, LongPathMode, ENV_PREFIX};

#[test]
fn test_config_load_from_env() {
    std::env::set_var("INVENTORY_HASH_BATCH_SIZE", "250");
    std::env::set_var("INVENTORY_LONG_PATHS", "always");

    let figment = Figment::from(Serialized::defaults(Config::default())).merge(Env::prefixed(ENV_PREFIX));
    let config = Config::from_figment(figment).unwrap();

    assert_eq!(config.hash_batch_size, 250);
    assert_eq!(config.long_paths, LongPathMode::Always);

    std::env::remove_var("INVENTORY_HASH_BATCH_SIZE");
    std::env::remove_var("INVENTORY_LONG_PATHS");
}

#[test]
fn test_env_wins_over_file() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "example_limit = 5\nduplicate_page_size = 10\n").unwrap();
    std::env::set_var("INVENTORY_EXAMPLE_LIMIT", "7");

    let figment = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&config_path))
        .merge(Env::prefixed(ENV_PREFIX).only(&["example_limit"]));
    let config = Config::from_figment(figment).unwrap();
    std::env::remove_var("INVENTORY_EXAMPLE_LIMIT");

    assert_eq!(config.example_limit, 7);
    assert_eq!(config.duplicate_page_size, 10);
}

#[test]
fn test_config_load_explicit_file() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("inventory.toml");
    fs::write(&config_path, "prefetch_depth = 2\nfollow_symlinks = true\n").unwrap();

    let config = Config::load(Some(&config_path)).unwrap();
    assert_eq!(config.prefetch_depth, 2);
    assert!(config.follow_symlinks);
}

#[test]
fn test_config_invalid_toml() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "prefetch_depth = = 3").unwrap();

    let err = Config::load(Some(&config_path)).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}
