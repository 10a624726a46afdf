//! Kubeconfig document model.
//!
//! The types mirror the on-disk `kubectl` format closely enough to round-trip
//! files written by other tools: fields this crate does not interpret are kept
//! in `extra` maps and written back unchanged.

pub mod file;
pub mod merge;

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use merge::{MergeReport, RemovedEntries};

/// Errors raised while reading, writing or editing a kubeconfig.
#[derive(Error, Debug)]
pub enum KubeconfigError {
    #[error("Failed to read kubeconfig '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write kubeconfig '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse kubeconfig: {0}")]
    Parse(String),

    #[error("Failed to serialize kubeconfig: {0}")]
    Serialize(String),

    #[error("Context not found: {0}")]
    ContextNotFound(String),

    #[error("Context already exists: {0}")]
    ContextExists(String),

    #[error("Context '{context}' references missing {kind} '{name}'")]
    DanglingReference {
        context: String,
        kind: &'static str,
        name: String,
    },
}

/// Result type for kubeconfig operations.
pub type Result<T> = std::result::Result<T, KubeconfigError>;

/// A whole kubeconfig document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Kubeconfig {
    #[serde(rename = "apiVersion", default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub clusters: Vec<NamedCluster>,

    #[serde(rename = "users", default, deserialize_with = "null_as_default")]
    pub auth_infos: Vec<NamedAuthInfo>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub contexts: Vec<NamedContext>,

    #[serde(
        rename = "current-context",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub current_context: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedCluster {
    pub name: String,
    #[serde(default)]
    pub cluster: Cluster,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Cluster {
    #[serde(default)]
    pub server: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_authority: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate_authority_data: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure_skip_tls_verify: Option<bool>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedAuthInfo {
    pub name: String,
    #[serde(rename = "user", default)]
    pub auth_info: AuthInfo,
}

/// Credentials for one kubeconfig user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AuthInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_certificate: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_certificate_data: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_key_data: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec: Option<ExecConfig>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// Exec credential plugin configuration (`aws eks get-token`, `kubelogin`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    #[serde(default)]
    pub command: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_default")]
    pub env: Vec<ExecEnvVar>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interactive_mode: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provide_cluster_info: Option<bool>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecEnvVar {
    pub name: String,
    pub value: String,
}

impl ExecConfig {
    /// Sets an environment variable, replacing an existing entry of the same name.
    pub fn set_env(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.env.iter_mut().find(|e| e.name == name) {
            Some(existing) => existing.value = value,
            None => self.env.push(ExecEnvVar {
                name: name.to_string(),
                value,
            }),
        }
    }

    /// Sets `--flag value` in the argument list, replacing an existing value.
    pub fn set_arg(&mut self, flag: &str, value: impl Into<String>) {
        let value = value.into();
        match self.args.iter().position(|a| a == flag) {
            Some(idx) if idx + 1 < self.args.len() => self.args[idx + 1] = value,
            Some(_) => self.args.push(value),
            None => {
                self.args.push(flag.to_string());
                self.args.push(value);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedContext {
    pub name: String,
    #[serde(default)]
    pub context: Context,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    #[serde(default)]
    pub cluster: String,

    #[serde(default)]
    pub user: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// One cluster/user/context triple, detached from any document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextTriple {
    pub cluster: Cluster,
    pub auth_info: AuthInfo,
    pub namespace: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Kubeconfig {
    /// Creates an empty `kind: Config` document.
    pub fn new() -> Self {
        Self {
            api_version: Some("v1".to_string()),
            kind: Some("Config".to_string()),
            ..Default::default()
        }
    }

    /// Parses a kubeconfig from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::new());
        }
        serde_yaml::from_str(text).map_err(|e| KubeconfigError::Parse(e.to_string()))
    }

    /// Serializes the kubeconfig to YAML text.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| KubeconfigError::Serialize(e.to_string()))
    }

    pub fn context(&self, name: &str) -> Option<&Context> {
        self.contexts
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.context)
    }

    pub fn has_context(&self, name: &str) -> bool {
        self.context(name).is_some()
    }

    pub fn cluster(&self, name: &str) -> Option<&Cluster> {
        self.clusters
            .iter()
            .find(|c| c.name == name)
            .map(|c| &c.cluster)
    }

    pub fn auth_info(&self, name: &str) -> Option<&AuthInfo> {
        self.auth_infos
            .iter()
            .find(|u| u.name == name)
            .map(|u| &u.auth_info)
    }

    /// Context names in document order.
    pub fn context_names(&self) -> Vec<&str> {
        self.contexts.iter().map(|c| c.name.as_str()).collect()
    }

    /// Returns the triple behind a named context.
    pub fn triple(&self, context_name: &str) -> Result<ContextTriple> {
        let context = self
            .context(context_name)
            .ok_or_else(|| KubeconfigError::ContextNotFound(context_name.to_string()))?;

        let cluster =
            self.cluster(&context.cluster)
                .ok_or_else(|| KubeconfigError::DanglingReference {
                    context: context_name.to_string(),
                    kind: "cluster",
                    name: context.cluster.clone(),
                })?;

        let auth_info =
            self.auth_info(&context.user)
                .ok_or_else(|| KubeconfigError::DanglingReference {
                    context: context_name.to_string(),
                    kind: "user",
                    name: context.user.clone(),
                })?;

        Ok(ContextTriple {
            cluster: cluster.clone(),
            auth_info: auth_info.clone(),
            namespace: context.namespace.clone(),
        })
    }

    /// The triple a single-cluster kubeconfig stands for: the current context if
    /// set, otherwise the first context.
    pub fn primary_triple(&self) -> Option<Result<ContextTriple>> {
        let name = self
            .current_context
            .as_deref()
            .filter(|name| self.has_context(name))
            .or_else(|| self.contexts.first().map(|c| c.name.as_str()))?;
        Some(self.triple(name))
    }

    /// Inserts or replaces the cluster stored under `name`.
    pub fn upsert_cluster(&mut self, name: &str, cluster: Cluster) {
        match self.clusters.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.cluster = cluster,
            None => self.clusters.push(NamedCluster {
                name: name.to_string(),
                cluster,
            }),
        }
    }

    /// Inserts or replaces the user stored under `name`.
    pub fn upsert_auth_info(&mut self, name: &str, auth_info: AuthInfo) {
        match self.auth_infos.iter_mut().find(|u| u.name == name) {
            Some(existing) => existing.auth_info = auth_info,
            None => self.auth_infos.push(NamedAuthInfo {
                name: name.to_string(),
                auth_info,
            }),
        }
    }

    /// Inserts or replaces the context stored under `name`.
    pub fn upsert_context(&mut self, name: &str, context: Context) {
        match self.contexts.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.context = context,
            None => self.contexts.push(NamedContext {
                name: name.to_string(),
                context,
            }),
        }
    }

    /// Writes a triple with cluster, user and context all keyed by `name`.
    pub fn upsert_triple(&mut self, name: &str, triple: ContextTriple) {
        self.upsert_cluster(name, triple.cluster);
        self.upsert_auth_info(name, triple.auth_info);
        self.upsert_context(
            name,
            Context {
                cluster: name.to_string(),
                user: name.to_string(),
                namespace: triple.namespace,
                extra: BTreeMap::new(),
            },
        );
    }

    /// Contexts other than `name` pointing at the cluster or user stored
    /// under `name`.
    pub fn contexts_sharing(&self, name: &str) -> Vec<&str> {
        self.contexts
            .iter()
            .filter(|c| c.name != name && (c.context.cluster == name || c.context.user == name))
            .map(|c| c.name.as_str())
            .collect()
    }

    /// True when `name` already holds exactly this triple under the
    /// same-name convention used by [`Kubeconfig::upsert_triple`].
    pub fn holds_triple(&self, name: &str, triple: &ContextTriple) -> bool {
        let Some(context) = self.context(name) else {
            return false;
        };
        context.cluster == name
            && context.user == name
            && context.namespace == triple.namespace
            && self.cluster(name) == Some(&triple.cluster)
            && self.auth_info(name) == Some(&triple.auth_info)
    }
}
