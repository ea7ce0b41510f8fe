use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use finddupe::config::{unknown_keys, Config, ConfigError};
use finddupe::output::script::ScriptType;
use std::fs;
use std::sync::Mutex;
use tempfile::tempdir;

static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn clear_env() {
    for (key, _) in std::env::vars() {
        if key.starts_with("FINDDUPE_") {
            std::env::remove_var(key);
        }
    }
}

#[test]
fn test_config_load_defaults() {
    let figment = Figment::from(Serialized::defaults(Config::default()));
    let config: Config = figment.extract().unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn test_config_load_from_toml() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(
        &config_path,
        r#"
skip_zero_length = false
allow_readonly = true
link_limit = 64
script_type = "batch"
"#,
    )
    .unwrap();

    let config = Config::load(Some(&config_path)).unwrap();

    assert!(!config.skip_zero_length);
    assert!(config.allow_readonly);
    assert_eq!(config.link_limit, 64);
    assert_eq!(config.script_type, ScriptType::Batch);
    assert!(config.show_progress);
}

#[test]
fn test_env_overrides_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "link_limit = 64\nfollow_links = false\n").unwrap();

    std::env::set_var("FINDDUPE_LINK_LIMIT", "8");
    std::env::set_var("FINDDUPE_FOLLOW_LINKS", "true");
    let config: Config = Figment::from(Serialized::defaults(Config::default()))
        .merge(Toml::file(&config_path))
        .merge(Env::prefixed("FINDDUPE_"))
        .extract()
        .unwrap();
    clear_env();

    assert_eq!(config.link_limit, 8);
    assert!(config.follow_links);
}

#[test]
fn test_invalid_value_is_an_error() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("config.toml");
    fs::write(&config_path, "link_limit = \"lots\"\n").unwrap();

    let result = Config::load(Some(&config_path));
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_save_round_trip_through_toml() {
    let config = Config {
        link_limit: 10,
        script_type: ScriptType::Posix,
        ..Config::default()
    };
    let content = toml::to_string_pretty(&config).unwrap();
    assert!(content.contains("link_limit = 10"));
    assert!(content.contains("script_type = \"posix\""));
}

#[test]
fn test_unknown_keys_get_suggestions() {
    let table: toml::Table = "skip_zero_lenght = true\nbogus = 1\n".parse().unwrap();
    let unknown = unknown_keys(&table);

    assert_eq!(unknown.len(), 2);
    assert!(unknown.contains(&("skip_zero_lenght".to_string(), Some("skip_zero_length"))));
    assert!(unknown.contains(&("bogus".to_string(), None)));
}
