//! Reconciliation of a registry role against a live kubeconfig.
//!
//! The role declares a desired set of contexts. The registry entry remembers
//! which contexts the previous sync wrote (`managedContexts`). Those two sets
//! and the live kubeconfig decide, per context name, whether to add, update,
//! skip or prune. Contexts the registry never wrote are never touched.

use std::collections::HashSet;
use std::path::Path;

use chrono::Utc;
use serde::Serialize;

use super::error::{RegistryError, Result};
use super::loader::RepositoryLoader;
use super::provider::{apply_user_overlay, resolve_triple, ClusterProviders};
use super::resource::NormalizedContext;
use super::state::RegistryEntry;
use super::template::{Render, Variables};
use super::validation::validate_role_contexts;
use crate::kubeconfig::{ContextTriple, Kubeconfig};

/// Outcome of one sync run, by context name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub added: Vec<String>,
    pub updated: Vec<String>,
    /// Managed contexts that already matched the registry.
    pub unchanged: Vec<String>,
    pub removed: Vec<String>,
    /// Declared names held by a context this registry does not own.
    pub skipped: Vec<String>,
    /// Per-context failures. These do not fail the sync as a whole.
    pub errors: Vec<String>,
}

impl SyncResult {
    /// True when the run added, updated or removed anything.
    pub fn has_changes(&self) -> bool {
        !(self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty())
    }
}

enum Action {
    Add,
    Update,
    Unchanged,
    Skip,
}

/// Runs the reconciliation for one registry.
pub struct Syncer<'a> {
    providers: &'a dyn ClusterProviders,
    dry_run: bool,
}

impl<'a> Syncer<'a> {
    pub fn new(providers: &'a dyn ClusterProviders) -> Self {
        Self {
            providers,
            dry_run: false,
        }
    }

    /// Classify without touching the kubeconfig or the registry entry.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Syncs `entry`'s role from the clone at `repo_dir` into `kubeconfig`.
    ///
    /// Fails before any mutation when the repository or role cannot be loaded
    /// or the role is invalid. Everything after that is collected per context.
    pub fn sync(
        &self,
        repo_dir: &Path,
        entry: &mut RegistryEntry,
        kubeconfig: &mut Kubeconfig,
    ) -> Result<SyncResult> {
        let loader = RepositoryLoader::new(repo_dir)?;
        let role = loader.load_role(&entry.role)?;
        let declarations = validate_role_contexts(&role)?;

        log::info!(
            "Syncing registry '{}' role '{}' ({} contexts{})",
            entry.name,
            entry.role,
            declarations.len(),
            if self.dry_run { ", dry run" } else { "" }
        );

        let managed: HashSet<&str> = entry.managed_contexts.iter().map(String::as_str).collect();
        let mut desired: Vec<String> = Vec::with_capacity(declarations.len());
        let mut result = SyncResult::default();

        for named in &declarations {
            let name = named.name.as_str();
            let is_live = kubeconfig.has_context(name);
            let is_managed = managed.contains(name);

            let triple = match self.resolve(&loader, &named.decl, &entry.variables) {
                Ok(triple) => triple,
                Err(e) => {
                    log::warn!("Context '{}' from registry '{}': {}", name, entry.name, e);
                    result.errors.push(format!("{}: {}", name, e));
                    continue;
                }
            };

            let action = match (is_live, is_managed) {
                (false, _) => Action::Add,
                (true, true) if kubeconfig.holds_triple(name, &triple) => Action::Unchanged,
                (true, true) => Action::Update,
                (true, false) => Action::Skip,
            };

            if matches!(action, Action::Add | Action::Update) {
                let shared: Vec<&str> = kubeconfig
                    .contexts_sharing(name)
                    .into_iter()
                    .filter(|c| !managed.contains(c))
                    .collect();
                if !shared.is_empty() {
                    log::warn!(
                        "Cluster/user '{}' is also used by unmanaged contexts {:?}, overwriting",
                        name,
                        shared
                    );
                }
            }

            match action {
                Action::Skip => {
                    log::warn!(
                        "Context '{}' exists and is not managed by registry '{}', skipping",
                        name,
                        entry.name
                    );
                    result.skipped.push(name.to_string());
                    continue;
                }
                Action::Unchanged => result.unchanged.push(name.to_string()),
                Action::Add => {
                    if !self.dry_run {
                        kubeconfig.upsert_triple(name, triple);
                    }
                    result.added.push(name.to_string());
                }
                Action::Update => {
                    if !self.dry_run {
                        kubeconfig.upsert_triple(name, triple);
                    }
                    result.updated.push(name.to_string());
                }
            }
            desired.push(name.to_string());
        }

        let desired_set: HashSet<&str> = desired.iter().map(String::as_str).collect();
        for stale in &entry.managed_contexts {
            if desired_set.contains(stale.as_str()) || !kubeconfig.has_context(stale) {
                continue;
            }
            if !self.dry_run {
                kubeconfig.remove_context(stale)?;
            }
            result.removed.push(stale.clone());
        }

        if !self.dry_run {
            entry.managed_contexts = desired;
            entry.last_sync = Some(Utc::now());
        }

        log::info!(
            "Registry '{}': {} added, {} updated, {} unchanged, {} removed, {} skipped, {} errors",
            entry.name,
            result.added.len(),
            result.updated.len(),
            result.unchanged.len(),
            result.removed.len(),
            result.skipped.len(),
            result.errors.len()
        );

        Ok(result)
    }

    /// Loads, templates and resolves one declaration, applying its user overlay.
    fn resolve(
        &self,
        loader: &RepositoryLoader,
        decl: &NormalizedContext,
        vars: &Variables,
    ) -> Result<ContextTriple> {
        let definition = loader.load_cluster(&decl.cluster_ref)?;
        let spec = definition.spec.render(vars)?;
        let mut triple = resolve_triple(&spec, self.providers)?;

        if let Some(user) = decl.user.as_deref() {
            let overlay = loader.load_user(user)?.spec.render(vars)?;
            apply_user_overlay(&mut triple.auth_info, &spec.provider, &overlay).map_err(
                |mismatch| RegistryError::ProviderMismatch {
                    user: user.to_string(),
                    user_provider: mismatch.user_provider,
                    cluster_provider: spec.provider.clone(),
                },
            )?;
        }

        Ok(triple)
    }
}
