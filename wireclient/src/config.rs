//! Session configuration (spec §6 `[AMBIENT]`), loaded the `pmoconfig` way:
//! embedded YAML defaults, merged with an optional external `config.yaml`,
//! then environment-variable overrides, exposed behind a process-wide
//! singleton. Unlike `pmoconfig`'s dynamic `serde_yaml::Value` tree (built
//! for a config surface nobody fully enumerates ahead of time), this one is
//! a fixed, small `SessionConfig` struct deserialized directly — the shape
//! (load -> merge defaults -> env overrides -> typed getters) is kept, the
//! dynamic-path accessor machinery is not, because the field set here is
//! closed (spec §6 names every field `session_init` needs).

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

const DEFAULT_CONFIG: &str = include_str!("default_config.yaml");
const ENV_CONFIG_DIR: &str = "WIRECLIENT_CONFIG";
const ENV_PREFIX: &str = "WIRECLIENT_CONFIG__";

/// Per-request-kind retry delays (spec §4.D: "`RETRY_MS` defaults to 30
/// seconds for playlist loads; other request kinds have their own
/// constants").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub container_load: u64,
    pub playlist_load: u64,
    pub browse: u64,
    pub playlist_change: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    pub user_agent: String,
    pub cache_dir: PathBuf,
    /// Opaque application key bytes, handed verbatim to the out-of-scope
    /// handshake collaborator (spec §1 supplement on `sp_session.c`).
    #[serde(with = "hex_bytes")]
    pub app_key: Vec<u8>,
    pub retry_ms: RetryConfig,
    pub socket_poll_ms: u64,
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&wireproto::bytes_to_hex(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        wireproto::hex_to_bytes(&s).ok_or_else(|| serde::de::Error::custom("app_key is not valid hex"))
    }
}

impl SessionConfig {
    /// Loads configuration the way `Config::load_config` does: find a
    /// config directory (explicit arg, then env var, then `.wireclient` in
    /// cwd, then in `$HOME`), merge the external `config.yaml` over the
    /// embedded defaults, then apply `WIRECLIENT_CONFIG__*` env overrides.
    pub fn load(directory: &str) -> Result<Self> {
        let config_dir = Self::find_config_dir(directory);
        let config_path = Path::new(&config_dir).join("config.yaml");

        let mut value: serde_yaml::Value =
            serde_yaml::from_str(DEFAULT_CONFIG).context("embedded default config is malformed")?;

        if let Ok(bytes) = fs::read(&config_path) {
            info!(path = %config_path.display(), "loaded external wireclient config");
            let external: serde_yaml::Value = serde_yaml::from_slice(&bytes)?;
            merge_yaml(&mut value, &external);
        } else {
            info!(path = %config_path.display(), "no external config found, using embedded defaults");
        }

        apply_env_overrides(&mut value);

        let config: SessionConfig = serde_yaml::from_value(value)?;
        Ok(config)
    }

    fn find_config_dir(directory: &str) -> String {
        if !directory.is_empty() {
            return directory.to_string();
        }
        if let Ok(path) = env::var(ENV_CONFIG_DIR) {
            return path;
        }
        if Path::new(".wireclient").exists() {
            return ".wireclient".to_string();
        }
        if let Some(home) = dirs::home_dir() {
            let candidate = home.join(".wireclient");
            if candidate.exists() {
                return candidate.to_string_lossy().to_string();
            }
        }
        ".wireclient".to_string()
    }
}

/// Deep-merges `overlay` into `base`, overlay winning on scalar conflicts.
fn merge_yaml(base: &mut serde_yaml::Value, overlay: &serde_yaml::Value) {
    use serde_yaml::Value;
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (k, v) in overlay_map {
                match base_map.get_mut(k) {
                    Some(existing) => merge_yaml(existing, v),
                    None => {
                        base_map.insert(k.clone(), v.clone());
                    }
                }
            }
        }
        (base_slot, overlay_value) => {
            *base_slot = overlay_value.clone();
        }
    }
}

/// Applies `WIRECLIENT_CONFIG__HOST`, `WIRECLIENT_CONFIG__PORT`, etc. as
/// top-level string overrides. Nested keys (e.g. retry delays) are not
/// overridden this way; edit `config.yaml` for those.
fn apply_env_overrides(value: &mut serde_yaml::Value) {
    let serde_yaml::Value::Mapping(map) = value else {
        return;
    };
    for (key, val) in env::vars() {
        let Some(field) = key.strip_prefix(ENV_PREFIX) else {
            continue;
        };
        let field = field.to_lowercase();
        let slot = serde_yaml::Value::String(field.clone());
        if map.contains_key(&slot) {
            map.insert(slot, serde_yaml::Value::String(val));
        }
    }
}

lazy_static! {
    static ref CONFIG: Arc<SessionConfig> =
        Arc::new(SessionConfig::load("").expect("failed to load wireclient configuration"));
}

/// Process-wide singleton accessor, mirroring `pmoconfig::get_config`.
pub fn get_config() -> Arc<SessionConfig> {
    CONFIG.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_parse() {
        let value: serde_yaml::Value = serde_yaml::from_str(DEFAULT_CONFIG).unwrap();
        let config: SessionConfig = serde_yaml::from_value(value).unwrap();
        assert_eq!(config.port, 4070);
        assert_eq!(config.retry_ms.playlist_load, 30_000);
    }

    #[test]
    fn merge_overlay_overrides_scalars_and_keeps_unset_fields() {
        let mut base: serde_yaml::Value = serde_yaml::from_str(DEFAULT_CONFIG).unwrap();
        let overlay: serde_yaml::Value = serde_yaml::from_str("port: 9999\n").unwrap();
        merge_yaml(&mut base, &overlay);
        let config: SessionConfig = serde_yaml::from_value(base).unwrap();
        assert_eq!(config.port, 9999);
        assert_eq!(config.host, "gateway.example-streaming.net");
    }
}
