//! Persistent configuration.
//!
//! Settings are layered, later layers winning:
//!
//! 1. Built-in defaults
//! 2. `config.toml` in the platform config directory, or the file named by
//!    `--config`
//! 3. `FINDDUPE_*` environment variables (e.g. `FINDDUPE_LINK_LIMIT=500`)
//! 4. Command-line flags, applied by the caller
//!
//! Unknown keys in a config file are reported with a suggestion for the
//! closest known key.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::actions::DEFAULT_LINK_LIMIT;
use crate::output::script::ScriptType;

/// Prefix of the environment variables read by [`Config::load`].
pub const ENV_PREFIX: &str = "FINDDUPE_";

const KNOWN_KEYS: &[&str] = &[
    "skip_zero_length",
    "allow_readonly",
    "follow_links",
    "hide_unreadable_warning",
    "show_progress",
    "link_limit",
    "script_type",
];

/// Errors raised while loading configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    /// A layer could not be parsed or has a value of the wrong type.
    #[error("invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),
}

/// Persistent defaults for a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Skip zero-length files.
    pub skip_zero_length: bool,
    /// Allow read-only duplicates to be eliminated.
    pub allow_readonly: bool,
    /// Follow symbolic links while walking.
    pub follow_links: bool,
    /// Do not warn about unreadable files.
    pub hide_unreadable_warning: bool,
    /// Show the progress spinner on a terminal.
    pub show_progress: bool,
    /// Per-file hard link cap.
    pub link_limit: u64,
    /// Script dialect written by `--script`.
    pub script_type: ScriptType,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            skip_zero_length: true,
            allow_readonly: false,
            follow_links: false,
            hide_unreadable_warning: false,
            show_progress: true,
            link_limit: DEFAULT_LINK_LIMIT,
            script_type: ScriptType::detect(),
        }
    }
}

impl Config {
    /// Load the layered configuration.
    ///
    /// `explicit` replaces the platform config file and must exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] for a missing explicit file and
    /// [`ConfigError::Invalid`] if any layer fails to parse.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match explicit {
            Some(path) if !path.exists() => return Err(ConfigError::NotFound(path.to_path_buf())),
            Some(path) => Some(path.to_path_buf()),
            None => Self::default_path(),
        };
        if let Some(path) = &file {
            warn_unknown_keys(path);
        }
        Self::figment(file.as_deref()).extract().map_err(|e| Box::new(e).into())
    }

    /// The figment behind [`load`](Self::load), without the existence check.
    #[must_use]
    pub fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = file {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// `config.toml` in the platform config directory.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "finddupe").map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

fn warn_unknown_keys(path: &Path) {
    let Ok(content) = fs::read_to_string(path) else {
        return;
    };
    let Ok(table) = content.parse::<toml::Table>() else {
        // Reported by the extraction itself.
        return;
    };
    for (key, suggestion) in unknown_keys(&table) {
        match suggestion {
            Some(known) => log::warn!(
                "Unknown config key '{}' in '{}', did you mean '{}'?",
                key,
                path.display(),
                known
            ),
            None => log::warn!("Unknown config key '{}' in '{}'", key, path.display()),
        }
    }
}

/// Keys of `table` that the config does not know, each with the closest
/// known key if one is near enough.
#[must_use]
pub fn unknown_keys(table: &toml::Table) -> Vec<(String, Option<&'static str>)> {
    table
        .keys()
        .filter(|key| !KNOWN_KEYS.contains(&key.as_str()))
        .map(|key| (key.clone(), suggest_key(key)))
        .collect()
}

fn suggest_key(key: &str) -> Option<&'static str> {
    KNOWN_KEYS
        .iter()
        .map(|known| (*known, strsim::jaro_winkler(key, known)))
        .filter(|(_, score)| *score > 0.8)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(known, _)| known)
}
