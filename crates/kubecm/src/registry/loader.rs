//! Loader for a cloned registry repository.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use walkdir::WalkDir;

use super::error::{RegistryError, Result};
use super::resource::{ClusterDefinition, RegistryMeta, Role, UserOverlay};

/// Name of the repository metadata file.
pub const REGISTRY_FILE: &str = "registry.yaml";

const ROLES_DIR: &str = "roles";
const CLUSTERS_DIR: &str = "clusters";
const FRAGMENTS_DIR: &str = "fragments";
const USERS_DIR: &str = "users";

/// Reads resources out of a registry directory. Nothing is cached; every
/// call goes back to disk.
pub struct RepositoryLoader {
    /// Root directory of the local clone.
    repo_dir: PathBuf,
}

impl RepositoryLoader {
    /// Creates a loader for the given directory.
    ///
    /// Fails with [`RegistryError::RepositoryNotFound`] when the directory
    /// does not exist.
    pub fn new(repo_dir: impl Into<PathBuf>) -> Result<Self> {
        let repo_dir = repo_dir.into();
        if !repo_dir.is_dir() {
            return Err(RegistryError::RepositoryNotFound(repo_dir));
        }
        Ok(Self { repo_dir })
    }

    /// Returns the repository directory path.
    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    /// Loads `registry.yaml`.
    pub fn load_meta(&self) -> Result<RegistryMeta> {
        let path = self.repo_dir.join(REGISTRY_FILE);
        if !path.is_file() {
            return Err(RegistryError::MissingRegistryFile(path));
        }
        load_file(&path)
    }

    /// Loads `roles/<name>.yaml` (or `.yml`).
    pub fn load_role(&self, name: &str) -> Result<Role> {
        let path = self
            .find_resource(ROLES_DIR, name)
            .ok_or_else(|| RegistryError::RoleNotFound(name.to_string()))?;
        let mut role: Role = load_file(&path)?;
        if role.metadata.name.is_empty() {
            role.metadata.name = name.to_string();
        }
        Ok(role)
    }

    /// Loads a cluster definition, looking in `clusters/` before `fragments/`.
    pub fn load_cluster(&self, name: &str) -> Result<ClusterDefinition> {
        let path = self
            .find_resource(CLUSTERS_DIR, name)
            .or_else(|| self.find_resource(FRAGMENTS_DIR, name))
            .ok_or_else(|| RegistryError::ClusterNotFound(name.to_string()))?;
        log::debug!("Loading cluster '{}' from {}", name, path.display());
        load_file(&path)
    }

    /// Loads `users/<name>.yaml`.
    pub fn load_user(&self, name: &str) -> Result<UserOverlay> {
        let path = self
            .find_resource(USERS_DIR, name)
            .ok_or_else(|| RegistryError::UserNotFound(name.to_string()))?;
        load_file(&path)
    }

    /// Lists role names found under `roles/`, sorted.
    pub fn list_roles(&self) -> Result<Vec<String>> {
        let roles_dir = self.repo_dir.join(ROLES_DIR);
        if !roles_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in WalkDir::new(&roles_dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| RegistryError::ReadDirectory {
                path: roles_dir.clone(),
                source: e.into(),
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let is_yaml = matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("yaml") | Some("yml")
            );
            let stem = path.file_stem().and_then(|s| s.to_str());
            if let (true, Some(stem)) = (is_yaml, stem) {
                if !stem.starts_with('.') {
                    names.push(stem.to_string());
                }
            }
        }

        names.sort();
        names.dedup();
        Ok(names)
    }

    fn find_resource(&self, dir: &str, name: &str) -> Option<PathBuf> {
        let base = self.repo_dir.join(dir);
        ["yaml", "yml"]
            .iter()
            .map(|ext| base.join(format!("{}.{}", name, ext)))
            .find(|p| p.is_file())
    }
}

/// Reads and parses one YAML resource file.
pub fn load_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|e| RegistryError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    serde_yaml::from_str(&content).map_err(|e| RegistryError::ParseYaml {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
