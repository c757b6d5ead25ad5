//! Connection settings.
//!
//! Settings come from (lowest to highest priority) the built-in defaults, an
//! optional YAML document, and `PMOICY__*` environment variables:
//!
//! ```yaml
//! metadata: true
//! user_agent: "myplayer/1.0"
//! connect_timeout_secs: 5
//! proxy: "http://127.0.0.1:3128"
//! ```
//!
//! `PMOICY__METADATA=true` overrides `metadata`, and so on (key lowercased,
//! value parsed as YAML, falling back to a plain string). String keys such
//! as `user_agent` always take the raw value, so `PMOICY__USER_AGENT=1.0`
//! stays `"1.0"`.

use std::{env, fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::error::Result;

/// Prefix of environment variables overriding configuration keys
pub const ENV_PREFIX: &str = "PMOICY__";

/// Default User-Agent
pub const DEFAULT_USER_AGENT: &str = concat!("pmoicy/", env!("CARGO_PKG_VERSION"));

/// Keys whose environment overrides are never parsed as YAML scalars
const STRING_KEYS: &[&str] = &["user_agent", "proxy"];

/// Default connect timeout. No read timeout is applied: live streams never end.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Settings used to build an [`IcyClient`](crate::IcyClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IcyConfig {
    /// Ask the server for interleaved metadata (`Icy-MetaData: 1`)
    pub metadata: bool,
    pub user_agent: String,
    pub connect_timeout_secs: u64,
    /// Proxy URL used for every scheme
    pub proxy: Option<String>,
}

impl Default for IcyConfig {
    fn default() -> Self {
        Self {
            metadata: false,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            proxy: None,
        }
    }
}

impl IcyConfig {
    /// Defaults with metadata requested
    pub fn with_metadata() -> Self {
        Self {
            metadata: true,
            ..Self::default()
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Parse a YAML document. Missing keys keep their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load a YAML file, then apply `PMOICY__*` environment overrides.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading ICY client configuration from {}", path.display());
        let text = fs::read_to_string(path)?;
        Self::from_sources(&text, env::vars())
    }

    /// Defaults plus `PMOICY__*` environment overrides.
    pub fn from_env() -> Result<Self> {
        Self::from_sources("", env::vars())
    }

    fn from_sources(
        yaml: &str,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self> {
        let mut value = if yaml.trim().is_empty() {
            Value::Mapping(Mapping::new())
        } else {
            serde_yaml::from_str(yaml)?
        };
        apply_env_overrides(&mut value, vars);
        Ok(serde_yaml::from_value(value)?)
    }
}

fn apply_env_overrides(config: &mut Value, vars: impl IntoIterator<Item = (String, String)>) {
    let Value::Mapping(map) = config else {
        return;
    };
    for (key, value) in vars {
        let Some(name) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        debug!("Configuration override from environment: {}", key);
        let name = name.to_lowercase();
        let value = if STRING_KEYS.contains(&name.as_str()) {
            Value::String(value)
        } else {
            convert_env_value(&value)
        };
        map.insert(Value::String(name), value);
    }
}

fn convert_env_value(value: &str) -> Value {
    serde_yaml::from_str::<Value>(value).unwrap_or_else(|_| Value::String(value.to_string()))
}
