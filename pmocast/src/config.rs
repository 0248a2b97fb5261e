//! Configuration of the cast backend.
//!
//! The configuration is the embedded `pmocast.yaml` merged with an optional
//! `config.yaml` found in the configuration directory, then with
//! `PMOCAST_CONFIG__<SECTION>__<KEY>` environment variables.
//!
//! The directory is searched in the following order:
//! 1. The directory given to [`CastConfig::load`] if not empty
//! 2. The `PMOCAST_CONFIG` environment variable
//! 3. `.pmocast` in the current directory
//! 4. `.pmocast` in the user's home directory

use std::{env, fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::info;

const DEFAULT_CONFIG: &str = include_str!("pmocast.yaml");

const ENV_CONFIG_DIR: &str = "PMOCAST_CONFIG";
const ENV_PREFIX: &str = "PMOCAST_CONFIG__";
const CONFIG_FILE: &str = "config.yaml";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiverConfig {
    pub host: Option<String>,
    pub port: u16,
    pub connect_timeout_secs: u64,
    /// Verify the receiver TLS certificate. Cast devices use self-signed ones.
    pub verify_host: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Content type sent with every load; detected from the URI when unset.
    pub content_type: Option<String>,
    pub watch_interval_ms: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastConfig {
    pub receiver: ReceiverConfig,
    pub playback: PlaybackConfig,
}

impl Default for CastConfig {
    fn default() -> Self {
        // L'embarqué est validé par les tests
        serde_yaml::from_str(DEFAULT_CONFIG).expect("Embedded pmocast.yaml is invalid")
    }
}

impl CastConfig {
    /// Loads the configuration, see the module documentation for the lookup order.
    pub fn load(directory: &str) -> Result<Self> {
        let config_dir = find_config_dir(directory);
        info!(config_dir = %config_dir, "Using config directory");
        let path = Path::new(&config_dir).join(CONFIG_FILE);

        let external = match fs::read_to_string(&path) {
            Ok(content) => {
                info!(config_file = %path.display(), "Loaded config file");
                Some(content)
            }
            Err(_) => {
                info!(
                    config_file = %path.display(),
                    "Config file not found, using default embedded config"
                );
                None
            }
        };

        Self::from_sources(external.as_deref(), env::vars())
    }

    /// Builds a configuration from an optional YAML document and a set of
    /// environment variables.
    pub fn from_sources(
        external: Option<&str>,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self> {
        let mut value: Value = serde_yaml::from_str(DEFAULT_CONFIG)?;
        if let Some(external) = external {
            let external: Value =
                serde_yaml::from_str(external).context("Invalid pmocast configuration")?;
            merge_yaml(&mut value, &lower_keys_value(external));
        }
        apply_env_overrides(&mut value, vars);

        serde_yaml::from_value(value).context("Invalid pmocast configuration")
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.receiver.connect_timeout_secs)
    }

    pub fn watch_interval(&self) -> Duration {
        Duration::from_millis(self.playback.watch_interval_ms)
    }
}

fn find_config_dir(directory: &str) -> String {
    if !directory.is_empty() {
        return directory.to_string();
    }

    if let Ok(env_path) = env::var(ENV_CONFIG_DIR) {
        info!(env_var = ENV_CONFIG_DIR, path = %env_path, "Trying to load config from env");
        return env_path;
    }

    if Path::new(".pmocast").exists() {
        return ".pmocast".to_string();
    }

    if let Some(home) = home_dir() {
        let home_config = home.join(".pmocast");
        if home_config.exists() {
            return home_config.to_string_lossy().to_string();
        }
    }

    ".pmocast".to_string()
}

fn apply_env_overrides(config: &mut Value, vars: impl IntoIterator<Item = (String, String)>) {
    for (key, value) in vars {
        if let Some(path) = key.strip_prefix(ENV_PREFIX) {
            let key_path = path
                .split("__")
                .map(|s| s.to_lowercase())
                .collect::<Vec<_>>();
            set_value(config, &key_path, convert_env_value(&value));
        }
    }
}

fn set_value(data: &mut Value, path: &[String], value: Value) {
    if path.is_empty() {
        *data = value;
        return;
    }
    if let Value::Mapping(map) = data {
        let key = Value::String(path[0].clone());
        if path.len() == 1 {
            map.insert(key, value);
        } else {
            let entry = map.entry(key).or_insert(Value::Mapping(Mapping::new()));
            set_value(entry, &path[1..], value);
        }
    }
}

fn convert_env_value(value: &str) -> Value {
    serde_yaml::from_str::<Value>(value).unwrap_or_else(|_| Value::String(value.to_string()))
}

fn lower_keys_value(value: Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(k, v)| {
                    let k = match k {
                        Value::String(s) => Value::String(s.to_lowercase()),
                        other => other,
                    };
                    (k, lower_keys_value(v))
                })
                .collect(),
        ),
        Value::Sequence(seq) => Value::Sequence(seq.into_iter().map(lower_keys_value).collect()),
        _ => value,
    }
}

fn merge_yaml(default: &mut Value, external: &Value) {
    match (default, external) {
        (Value::Mapping(dmap), Value::Mapping(emap)) => {
            for (k, v) in emap {
                match dmap.get_mut(k) {
                    Some(dv) => merge_yaml(dv, v),
                    None => {
                        dmap.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (d, e) => *d = e.clone(),
    }
}
