//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.watson-ware/config.json`) and environment.
//! Env values override the file so credentials can stay out of it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::ware::WareOptions;
use crate::watson::ConnectionSettings;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Ware options: connection settings and workspace id.
    #[serde(default)]
    pub watson: WareOptions,

    /// Log target for the ware. Defaults to `botmaster::watson_conversation_ware`.
    #[serde(default)]
    pub log_target: Option<String>,
}

/// Read a non-empty, trimmed env var.
fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

/// Resolve ware options: env WATSON_USERNAME, WATSON_PASSWORD, WATSON_URL and
/// WATSON_WORKSPACE_ID override config. Settings are created when any credential env var is set.
pub fn resolve_ware_options(config: &Config) -> WareOptions {
    resolve_ware_options_with(config, env_value)
}

fn resolve_ware_options_with(
    config: &Config,
    env: impl Fn(&str) -> Option<String>,
) -> WareOptions {
    let mut options = config.watson.clone();

    let username = env("WATSON_USERNAME");
    let password = env("WATSON_PASSWORD");
    let url = env("WATSON_URL");
    if username.is_some() || password.is_some() || url.is_some() {
        let settings = options
            .settings
            .get_or_insert_with(ConnectionSettings::default);
        if let Some(u) = username {
            settings.username = u;
        }
        if let Some(p) = password {
            settings.password = p;
        }
        if let Some(u) = url {
            settings.url = u;
        }
    }

    options.workspace_id = env("WATSON_WORKSPACE_ID").or_else(|| {
        options
            .workspace_id
            .as_ref()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    });
    options
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("WATSON_WARE_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".watson-ware").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the default path (or WATSON_WARE_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

/// Write a config template with placeholder credentials if no file exists. Returns true when written.
pub fn write_template(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating config directory {}", dir.display()))?;
    }
    let template = Config {
        watson: WareOptions::new(
            ConnectionSettings::new("your_username", "your_password"),
            "your_workspace_id",
        ),
        log_target: None,
    };
    let s = serde_json::to_string_pretty(&template).context("serializing config template")?;
    std::fs::write(path, s).with_context(|| format!("writing config to {}", path.display()))?;
    log::info!("created config template at {}", path.display());
    Ok(true)
}
