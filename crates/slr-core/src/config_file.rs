use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Config;

/// On-disk TOML configuration.
/// Every field is optional so a partial file only overrides what it names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub backend: Option<BackendSection>,
    pub assistant: Option<AssistantSection>,
    pub storage: Option<StorageSection>,
    pub display: Option<DisplaySection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendSection {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantSection {
    pub api_key: Option<String>,
    pub strategy: Option<String>,
    pub sites: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageSection {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplaySection {
    pub theme: Option<String>,
}

/// Name of the per-directory override file.
pub const LOCAL_CONFIG: &str = ".slr-partner.toml";

/// Platform config path: `<config_dir>/slr-partner/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("slr-partner").join("config.toml"))
}

/// Load the platform config with `./.slr-partner.toml` layered on top.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(LOCAL_CONFIG));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load one config file. `None` if it is missing or does not parse.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparsable config file");
            None
        }
    }
}

fn pick<S, T: Clone>(
    overlay: &Option<S>,
    base: &Option<S>,
    field: impl Fn(&S) -> Option<T>,
) -> Option<T> {
    overlay
        .as_ref()
        .and_then(&field)
        .or_else(|| base.as_ref().and_then(&field))
}

/// Merge two configs field by field; `overlay` wins where it has a value.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    ConfigFile {
        backend: Some(BackendSection {
            base_url: pick(&overlay.backend, &base.backend, |b| b.base_url.clone()),
            timeout_secs: pick(&overlay.backend, &base.backend, |b| b.timeout_secs),
        }),
        assistant: Some(AssistantSection {
            api_key: pick(&overlay.assistant, &base.assistant, |a| a.api_key.clone()),
            strategy: pick(&overlay.assistant, &base.assistant, |a| a.strategy.clone()),
            sites: pick(&overlay.assistant, &base.assistant, |a| a.sites.clone()),
        }),
        storage: Some(StorageSection {
            path: pick(&overlay.storage, &base.storage, |s| s.path.clone()),
        }),
        display: Some(DisplaySection {
            theme: pick(&overlay.display, &base.display, |d| d.theme.clone()),
        }),
    }
}

impl ConfigFile {
    /// Copy every value this file sets onto `config`.
    pub fn apply(&self, config: &mut Config) {
        if let Some(backend) = &self.backend {
            if let Some(url) = &backend.base_url {
                config.base_url = url.clone();
            }
            if backend.timeout_secs.is_some() {
                config.timeout_secs = backend.timeout_secs;
            }
        }
        if let Some(assistant) = &self.assistant {
            if let Some(key) = assistant.api_key.as_ref().filter(|k| !k.is_empty()) {
                config.api_key = Some(key.clone());
            }
            if let Some(strategy) = &assistant.strategy {
                config.strategy = strategy.clone();
            }
            if let Some(sites) = &assistant.sites {
                config.sites = sites.clone();
            }
        }
        if let Some(path) = self.storage.as_ref().and_then(|s| s.path.as_ref()) {
            config.storage_path = Some(PathBuf::from(path));
        }
        if let Some(theme) = self.display.as_ref().and_then(|d| d.theme.as_ref()) {
            config.theme = theme.clone();
        }
    }

    /// Snapshot of a resolved config, for writing back to disk.
    pub fn from_config(config: &Config) -> Self {
        ConfigFile {
            backend: Some(BackendSection {
                base_url: Some(config.base_url.clone()),
                timeout_secs: config.timeout_secs,
            }),
            assistant: Some(AssistantSection {
                api_key: config.api_key.clone(),
                strategy: Some(config.strategy.clone()),
                sites: Some(config.sites.clone()),
            }),
            storage: config.storage_path.as_ref().map(|p| StorageSection {
                path: Some(p.display().to_string()),
            }),
            display: Some(DisplaySection {
                theme: Some(config.theme.clone()),
            }),
        }
    }
}

pub const ENV_BACKEND_URL: &str = "SLR_BACKEND_URL";
pub const ENV_API_KEY: &str = "GEMINI_API_KEY";

/// Overlay environment variables. Blank values are ignored.
pub fn apply_env(config: &mut Config) {
    apply_vars(config, |name| std::env::var(name).ok());
}

fn apply_vars(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(url) = var(ENV_BACKEND_URL).filter(|v| !v.trim().is_empty()) {
        config.base_url = url;
    }
    if let Some(key) = var(ENV_API_KEY).filter(|v| !v.trim().is_empty()) {
        config.api_key = Some(key);
    }
}

/// Save `config` to the platform config path.
pub fn save_config(config: &ConfigFile) -> Result<PathBuf, String> {
    let path = config_path().ok_or_else(|| "Could not determine config directory".to_string())?;
    save_to_path(config, &path)?;
    Ok(path)
}

pub fn save_to_path(config: &ConfigFile, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let content =
        toml::to_string_pretty(config).map_err(|e| format!("Failed to serialize config: {}", e))?;
    std::fs::write(path, content).map_err(|e| format!("Failed to write config: {}", e))
}
