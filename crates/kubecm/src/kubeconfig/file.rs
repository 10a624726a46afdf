//! Reading and writing kubeconfig files.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use super::{Kubeconfig, KubeconfigError, Result};

/// Resolves the kubeconfig path the way `kubectl` does for writes: the first
/// entry of a `KUBECONFIG`-style path list, else `~/.kube/config`.
pub fn default_path(kubeconfig_env: Option<&OsStr>) -> Option<PathBuf> {
    kubeconfig_env
        .and_then(|value| std::env::split_paths(value).find(|p| !p.as_os_str().is_empty()))
        .or_else(|| dirs::home_dir().map(|home| home.join(".kube").join("config")))
}

/// Loads a kubeconfig. A missing file yields an empty document.
pub fn load(path: &Path) -> Result<Kubeconfig> {
    if !path.exists() {
        log::debug!("Kubeconfig {} does not exist, starting empty", path.display());
        return Ok(Kubeconfig::new());
    }

    let content = fs::read_to_string(path).map_err(|e| KubeconfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    Kubeconfig::from_yaml(&content)
}

/// Writes a kubeconfig, creating parent directories as needed.
pub fn save(path: &Path, config: &Kubeconfig) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| KubeconfigError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let content = config.to_yaml()?;
    fs::write(path, content).map_err(|e| KubeconfigError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    log::debug!("Wrote kubeconfig to {}", path.display());
    Ok(())
}
