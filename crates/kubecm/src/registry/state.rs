//! Persisted record of configured registries.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{RegistryError, Result};
use super::resource::API_VERSION;
use super::template::Variables;

pub const STATE_KIND: &str = "KubecmConfig";

const CONFIG_FILE: &str = "config.yaml";
const REGISTRIES_DIR: &str = "registries";

/// Contents of `<root>/config.yaml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KubecmConfig {
    pub api_version: String,
    pub kind: String,
    #[serde(default)]
    pub registries: Vec<RegistryEntry>,
}

impl Default for KubecmConfig {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: STATE_KIND.to_string(),
            registries: Vec::new(),
        }
    }
}

impl KubecmConfig {
    pub fn get_registry(&self, name: &str) -> Option<&RegistryEntry> {
        self.registries.iter().find(|r| r.name == name)
    }

    pub fn get_registry_mut(&mut self, name: &str) -> Option<&mut RegistryEntry> {
        self.registries.iter_mut().find(|r| r.name == name)
    }

    /// Removes a registry entry. Returns false when there was none.
    pub fn remove_registry(&mut self, name: &str) -> bool {
        let before = self.registries.len();
        self.registries.retain(|r| r.name != name);
        self.registries.len() != before
    }
}

/// One configured registry and its ownership ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    pub name: String,
    pub url: String,
    #[serde(rename = "ref")]
    pub git_ref: String,
    pub role: String,
    #[serde(default)]
    pub variables: Variables,
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
    /// Context names written by the last non-dry-run sync.
    #[serde(default)]
    pub managed_contexts: Vec<String>,
}

impl RegistryEntry {
    pub fn manages(&self, context: &str) -> bool {
        self.managed_contexts.iter().any(|c| c == context)
    }
}

/// Reads and writes the state file under an explicit root directory.
#[derive(Debug, Clone)]
pub struct StateStore {
    root: PathBuf,
}

impl StateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `~/.kubecm`, when a home directory can be determined.
    pub fn default_root() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".kubecm"))
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Directory holding the local clone of a registry.
    pub fn registry_dir(&self, name: &str) -> PathBuf {
        self.root.join(REGISTRIES_DIR).join(name)
    }

    /// Loads the state file. A missing file yields an empty config.
    pub fn load(&self) -> Result<KubecmConfig> {
        let path = self.config_path();
        if !path.exists() {
            return Ok(KubecmConfig::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| RegistryError::ReadFile {
            path: path.clone(),
            source: e,
        })?;
        if content.trim().is_empty() {
            return Ok(KubecmConfig::default());
        }

        serde_yaml::from_str(&content).map_err(|e| RegistryError::ParseYaml {
            path,
            message: e.to_string(),
        })
    }

    /// Writes the state file, creating the root directory if needed.
    pub fn save(&self, config: &KubecmConfig) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|e| RegistryError::WriteFile {
            path: self.root.clone(),
            source: e,
        })?;

        let path = self.config_path();
        let content =
            serde_yaml::to_string(config).map_err(|e| RegistryError::SerializeYaml(e.to_string()))?;
        fs::write(&path, content).map_err(|e| RegistryError::WriteFile { path, source: e })?;

        log::debug!("Saved registry state to {}", self.config_path().display());
        Ok(())
    }
}
