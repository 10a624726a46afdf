//! Merge primitives shared by the plain kubeconfig commands and registry sync.
//!
//! A context name is the merge key. Clusters and users have no identity beyond
//! the name they are stored under, so removing a context only removes the
//! cluster or user when no surviving context still points at it.

use serde::Serialize;

use super::{Context, Kubeconfig, KubeconfigError, Result};

/// What [`Kubeconfig::remove_context`] actually deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovedEntries {
    pub context: String,
    /// Set when the cluster was no longer referenced and got deleted.
    pub cluster: Option<String>,
    /// Set when the user was no longer referenced and got deleted.
    pub user: Option<String>,
}

/// Outcome of merging another kubeconfig into this one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeReport {
    pub added: Vec<String>,
    pub replaced: Vec<String>,
}

impl Kubeconfig {
    fn cluster_in_use(&self, cluster: &str) -> bool {
        self.contexts.iter().any(|c| c.context.cluster == cluster)
    }

    fn user_in_use(&self, user: &str) -> bool {
        self.contexts.iter().any(|c| c.context.user == user)
    }

    /// Removes a context, then its cluster and user if nothing else uses them.
    ///
    /// Clears `current-context` when it pointed at the removed context.
    pub fn remove_context(&mut self, name: &str) -> Result<RemovedEntries> {
        let idx = self
            .contexts
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| KubeconfigError::ContextNotFound(name.to_string()))?;
        let removed = self.contexts.remove(idx);

        let mut report = RemovedEntries {
            context: removed.name.clone(),
            ..Default::default()
        };

        let cluster = removed.context.cluster;
        if !self.cluster_in_use(&cluster) {
            let before = self.clusters.len();
            self.clusters.retain(|c| c.name != cluster);
            if self.clusters.len() != before {
                report.cluster = Some(cluster);
            }
        }

        let user = removed.context.user;
        if !self.user_in_use(&user) {
            let before = self.auth_infos.len();
            self.auth_infos.retain(|u| u.name != user);
            if self.auth_infos.len() != before {
                report.user = Some(user);
            }
        }

        if self.current_context.as_deref() == Some(name) {
            self.current_context = None;
        }

        log::debug!(
            "Removed context '{}' (cluster removed: {:?}, user removed: {:?})",
            report.context,
            report.cluster,
            report.user
        );

        Ok(report)
    }

    /// Renames a context, keeping `current-context` pointed at it.
    pub fn rename_context(&mut self, from: &str, to: &str) -> Result<()> {
        if from == to {
            return Ok(());
        }
        if self.has_context(to) {
            return Err(KubeconfigError::ContextExists(to.to_string()));
        }

        let entry = self
            .contexts
            .iter_mut()
            .find(|c| c.name == from)
            .ok_or_else(|| KubeconfigError::ContextNotFound(from.to_string()))?;
        entry.name = to.to_string();

        if self.current_context.as_deref() == Some(from) {
            self.current_context = Some(to.to_string());
        }
        Ok(())
    }

    /// Makes `name` the current context.
    pub fn switch_context(&mut self, name: &str) -> Result<()> {
        if !self.has_context(name) {
            return Err(KubeconfigError::ContextNotFound(name.to_string()));
        }
        self.current_context = Some(name.to_string());
        Ok(())
    }

    /// Merges every context of `other` into this kubeconfig.
    ///
    /// Each incoming cluster and user is stored under the context name. When
    /// that name is already taken by an unrelated cluster or user, a numeric
    /// suffix is appended. An existing context of the same name is an error
    /// unless `overwrite` is set, in which case the old context is removed first.
    pub fn merge_from(&mut self, other: &Kubeconfig, overwrite: bool) -> Result<MergeReport> {
        if !overwrite {
            if let Some(clash) = other.contexts.iter().find(|c| self.has_context(&c.name)) {
                return Err(KubeconfigError::ContextExists(clash.name.clone()));
            }
        }

        let mut report = MergeReport::default();

        for incoming in &other.contexts {
            let triple = other.triple(&incoming.name)?;
            let name = incoming.name.as_str();

            let replaced = self.has_context(name);
            if replaced {
                self.remove_context(name)?;
            }

            let cluster_name = match self.cluster(name) {
                Some(existing) if *existing != triple.cluster => {
                    unique_name(name, |n| self.cluster(n).is_some())
                }
                _ => name.to_string(),
            };
            let user_name = match self.auth_info(name) {
                Some(existing) if *existing != triple.auth_info => {
                    unique_name(name, |n| self.auth_info(n).is_some())
                }
                _ => name.to_string(),
            };

            self.upsert_cluster(&cluster_name, triple.cluster);
            self.upsert_auth_info(&user_name, triple.auth_info);
            self.upsert_context(
                name,
                Context {
                    cluster: cluster_name,
                    user: user_name,
                    namespace: triple.namespace,
                    extra: incoming.context.extra.clone(),
                },
            );

            if replaced {
                report.replaced.push(name.to_string());
            } else {
                report.added.push(name.to_string());
            }
        }

        if self.current_context.is_none() {
            self.current_context = other.current_context.clone();
        }

        Ok(report)
    }
}

/// First `base-N` (N from 1) for which `taken` returns false.
fn unique_name(base: &str, taken: impl Fn(&str) -> bool) -> String {
    (1..)
        .map(|n| format!("{}-{}", base, n))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| base.to_string())
}
