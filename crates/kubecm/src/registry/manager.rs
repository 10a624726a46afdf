//! Registry use cases: add, update, remove, list and sync.

use std::fs;
use std::path::Path;

use serde::Serialize;

use super::error::{RegistryError, Result};
use super::git::RepositoryFetcher;
use super::loader::RepositoryLoader;
use super::provider::ClusterProviders;
use super::state::{KubecmConfig, RegistryEntry, StateStore};
use super::sync::{SyncResult, Syncer};
use super::template::Variables;
use super::validation::{resolve_variables, validate_registry_name, validate_role_contexts};
use crate::kubeconfig::Kubeconfig;

/// Ref used when `add` is not given one.
pub const DEFAULT_REF: &str = "main";

/// Parameters of `registry add`.
#[derive(Debug, Clone, Default)]
pub struct AddRegistry {
    pub name: String,
    pub url: String,
    pub git_ref: Option<String>,
    pub role: String,
    pub variables: Variables,
}

/// Parameters of `registry update`. `None` keeps the current value; given
/// variables are merged over the stored ones.
#[derive(Debug, Clone, Default)]
pub struct UpdateRegistry {
    pub role: Option<String>,
    pub git_ref: Option<String>,
    pub variables: Variables,
}

/// Per-registry outcome of a sync over all registries.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySyncOutcome {
    pub registry: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<SyncResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Ties the state store, the repository fetcher and the sync engine together.
pub struct RegistryManager {
    store: StateStore,
    fetcher: Box<dyn RepositoryFetcher>,
    providers: Box<dyn ClusterProviders>,
}

impl RegistryManager {
    pub fn new(
        store: StateStore,
        fetcher: Box<dyn RepositoryFetcher>,
        providers: Box<dyn ClusterProviders>,
    ) -> Self {
        Self {
            store,
            fetcher,
            providers,
        }
    }

    /// Lists configured registries in insertion order.
    pub fn list(&self) -> Result<Vec<RegistryEntry>> {
        Ok(self.store.load()?.registries)
    }

    /// Roles available in a registry's local clone.
    pub fn roles(&self, name: &str) -> Result<Vec<String>> {
        let state = self.store.load()?;
        find(&state, name)?;
        RepositoryLoader::new(self.store.registry_dir(name))?.list_roles()
    }

    /// Clones a registry, validates role and variables, and records it.
    ///
    /// Nothing is synced yet. The clone is removed again when validation fails.
    pub fn add(&self, params: AddRegistry) -> Result<RegistryEntry> {
        validate_registry_name(&params.name)?;

        let mut state = self.store.load()?;
        if state.get_registry(&params.name).is_some() {
            return Err(RegistryError::RegistryAlreadyExists(params.name));
        }

        let git_ref = params.git_ref.unwrap_or_else(|| DEFAULT_REF.to_string());
        let repo_dir = self.store.registry_dir(&params.name);
        if repo_dir.exists() {
            log::warn!(
                "Removing leftover clone at {} before adding '{}'",
                repo_dir.display(),
                params.name
            );
            remove_clone(&repo_dir)?;
        }

        let prepared = self
            .fetcher
            .fetch(&params.url, &git_ref, &repo_dir)
            .and_then(|_| check_repository(&repo_dir, &params.role, &params.variables));

        let variables = match prepared {
            Ok(variables) => variables,
            Err(e) => {
                if let Err(cleanup) = remove_clone(&repo_dir) {
                    log::warn!("Failed to clean up {}: {}", repo_dir.display(), cleanup);
                }
                return Err(e);
            }
        };

        let entry = RegistryEntry {
            name: params.name,
            url: params.url,
            git_ref,
            role: params.role,
            variables,
            last_sync: None,
            managed_contexts: Vec::new(),
        };
        state.registries.push(entry.clone());
        self.store.save(&state)?;

        log::info!("Added registry '{}' (role '{}')", entry.name, entry.role);
        Ok(entry)
    }

    /// Changes role, ref or variables of a registry and re-validates.
    ///
    /// Contexts are not touched here; the next sync reconciles them.
    pub fn update(&self, name: &str, params: UpdateRegistry) -> Result<RegistryEntry> {
        let mut state = self.store.load()?;
        let current = find(&state, name)?.clone();

        let git_ref = params.git_ref.unwrap_or_else(|| current.git_ref.clone());
        let role = params.role.unwrap_or_else(|| current.role.clone());
        let mut provided = current.variables.clone();
        provided.extend(params.variables);

        let repo_dir = self.store.registry_dir(name);
        if git_ref != current.git_ref || !repo_dir.exists() {
            self.fetcher.fetch(&current.url, &git_ref, &repo_dir)?;
        }
        let variables = check_repository(&repo_dir, &role, &provided)?;

        let entry = state
            .get_registry_mut(name)
            .ok_or_else(|| RegistryError::RegistryNotFound(name.to_string()))?;
        entry.git_ref = git_ref;
        entry.role = role;
        entry.variables = variables;
        let updated = entry.clone();
        self.store.save(&state)?;

        log::info!("Updated registry '{}'", name);
        Ok(updated)
    }

    /// Removes the contexts a registry manages from `kubeconfig`.
    ///
    /// Nothing is persisted: call [`RegistryManager::forget`] once the edited
    /// kubeconfig has been saved. With `keep_contexts` the kubeconfig is left
    /// alone. Returns the names of removed contexts.
    pub fn remove_contexts(
        &self,
        name: &str,
        kubeconfig: &mut Kubeconfig,
        keep_contexts: bool,
    ) -> Result<Vec<String>> {
        let state = self.store.load()?;
        let entry = find(&state, name)?;

        let mut removed = Vec::new();
        if !keep_contexts {
            for context in &entry.managed_contexts {
                if kubeconfig.has_context(context) {
                    kubeconfig.remove_context(context)?;
                    removed.push(context.clone());
                }
            }
        }
        Ok(removed)
    }

    /// Drops a registry from the state file and deletes its clone.
    pub fn forget(&self, name: &str) -> Result<()> {
        let mut state = self.store.load()?;
        find(&state, name)?;

        state.remove_registry(name);
        self.store.save(&state)?;
        remove_clone(&self.store.registry_dir(name))?;

        log::info!("Removed registry '{}'", name);
        Ok(())
    }

    /// Fetches one registry and reconciles it into `kubeconfig`.
    ///
    /// The state file is only written for a real run.
    pub fn sync(&self, name: &str, kubeconfig: &mut Kubeconfig, dry_run: bool) -> Result<SyncResult> {
        let mut state = self.store.load()?;
        let result = self.sync_entry(&mut state, name, kubeconfig, dry_run)?;
        if !dry_run {
            self.store.save(&state)?;
        }
        Ok(result)
    }

    /// Syncs every registry in turn. A failing registry does not stop the rest.
    pub fn sync_all(
        &self,
        kubeconfig: &mut Kubeconfig,
        dry_run: bool,
    ) -> Result<Vec<RegistrySyncOutcome>> {
        let mut state = self.store.load()?;
        let names: Vec<String> = state.registries.iter().map(|r| r.name.clone()).collect();

        let mut outcomes = Vec::with_capacity(names.len());
        for name in names {
            let outcome = match self.sync_entry(&mut state, &name, kubeconfig, dry_run) {
                Ok(result) => RegistrySyncOutcome {
                    registry: name,
                    result: Some(result),
                    error: None,
                },
                Err(e) => {
                    log::error!("Sync of registry '{}' failed: {}", name, e);
                    RegistrySyncOutcome {
                        registry: name,
                        result: None,
                        error: Some(e.to_string()),
                    }
                }
            };
            outcomes.push(outcome);
        }

        if !dry_run {
            self.store.save(&state)?;
        }
        Ok(outcomes)
    }

    fn sync_entry(
        &self,
        state: &mut KubecmConfig,
        name: &str,
        kubeconfig: &mut Kubeconfig,
        dry_run: bool,
    ) -> Result<SyncResult> {
        let entry = state
            .get_registry_mut(name)
            .ok_or_else(|| RegistryError::RegistryNotFound(name.to_string()))?;
        let repo_dir = self.store.registry_dir(name);

        self.fetcher.fetch(&entry.url, &entry.git_ref, &repo_dir)?;

        Syncer::new(self.providers.as_ref())
            .dry_run(dry_run)
            .sync(&repo_dir, entry, kubeconfig)
    }
}

fn find<'a>(state: &'a KubecmConfig, name: &str) -> Result<&'a RegistryEntry> {
    state
        .get_registry(name)
        .ok_or_else(|| RegistryError::RegistryNotFound(name.to_string()))
}

/// Validates the role and fills variable defaults against a local clone.
fn check_repository(repo_dir: &Path, role: &str, provided: &Variables) -> Result<Variables> {
    let loader = RepositoryLoader::new(repo_dir)?;
    let meta = loader.load_meta()?;
    let variables = resolve_variables(&meta, provided)?;

    match loader.load_role(role) {
        Ok(role) => {
            validate_role_contexts(&role)?;
        }
        Err(RegistryError::RoleNotFound(missing)) => {
            let available = loader.list_roles().unwrap_or_default();
            log::error!(
                "Role '{}' not found in {}; available roles: {}",
                missing,
                meta.name(),
                available.join(", ")
            );
            return Err(RegistryError::RoleNotFound(missing));
        }
        Err(e) => return Err(e),
    }

    Ok(variables)
}

fn remove_clone(dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    fs::remove_dir_all(dir).map_err(|e| RegistryError::WriteFile {
        path: dir.to_path_buf(),
        source: e,
    })
}
