//! K8s-style resource types for registry repositories.
//!
//! Every file in a registry is one YAML document with `apiVersion`, `kind`
//! and `metadata`, followed by kind-specific top-level fields. The first
//! three are informational and never checked.

use serde::{Deserialize, Serialize};

use super::template::{render_opt, resolve_template, Render, TemplateError, Variables};

/// API version written into files this crate generates.
pub const API_VERSION: &str = "kubecm.io/v1alpha1";

/// Metadata for a resource, following K8s conventions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A generic K8s-style resource wrapper. Kind-specific fields sit at the top
/// level of the document next to `metadata`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource<T> {
    #[serde(default)]
    pub api_version: String,

    #[serde(default)]
    pub kind: String,

    #[serde(default)]
    pub metadata: ObjectMeta,

    #[serde(flatten)]
    pub spec: T,
}

impl<T> Resource<T> {
    pub fn new(kind: &str, name: &str, spec: T) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: kind.to_string(),
            metadata: ObjectMeta {
                name: name.to_string(),
                description: None,
            },
            spec,
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }
}

// ============================================================================
// Registry metadata
// ============================================================================

/// Contents of `registry.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrySpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<VariableSpec>,
}

/// A variable the registry expects callers to bind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableSpec {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

pub type RegistryMeta = Resource<RegistrySpec>;

// ============================================================================
// Roles
// ============================================================================

/// Contents of `roles/<name>.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_prefix: Option<String>,

    /// Legacy declaration list: one context per fragment name.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fragments: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contexts: Vec<ContextDecl>,
}

/// One entry of a role's `contexts` list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextDecl {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,

    /// Deprecated alias of `cluster`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fragment: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A declaration after both role formats have been folded together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedContext {
    /// Cluster or fragment reference. Empty when the entry named neither.
    pub cluster_ref: String,
    pub user: Option<String>,
    pub name: Option<String>,
}

impl NormalizedContext {
    /// The context name this declaration produces.
    pub fn context_name(&self, prefix: Option<&str>) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            return name.to_string();
        }
        match prefix.filter(|p| !p.is_empty()) {
            Some(prefix) => format!("{}-{}", prefix, self.cluster_ref),
            None => self.cluster_ref.clone(),
        }
    }
}

impl RoleSpec {
    /// Folds the two declaration formats into one list. A non-empty
    /// `contexts` list supersedes `fragments` entirely.
    pub fn normalized_contexts(&self) -> Vec<NormalizedContext> {
        if !self.contexts.is_empty() {
            return self
                .contexts
                .iter()
                .map(|decl| NormalizedContext {
                    cluster_ref: decl
                        .cluster
                        .clone()
                        .filter(|c| !c.is_empty())
                        .or_else(|| decl.fragment.clone())
                        .unwrap_or_default(),
                    user: decl.user.clone().filter(|u| !u.is_empty()),
                    name: decl.name.clone().filter(|n| !n.is_empty()),
                })
                .collect();
        }

        self.fragments
            .iter()
            .map(|fragment| NormalizedContext {
                cluster_ref: fragment.clone(),
                user: None,
                name: None,
            })
            .collect()
    }
}

pub type Role = Resource<RoleSpec>;

// ============================================================================
// Clusters and fragments
// ============================================================================

/// Contents of `clusters/<name>.yaml` or `fragments/<name>.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterSpec {
    #[serde(default)]
    pub provider: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws: Option<AwsParams>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure: Option<AzureParams>,

    /// Embedded kubeconfig text for the `static` provider.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsParams {
    #[serde(default)]
    pub region: String,

    #[serde(default)]
    pub cluster: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureParams {
    #[serde(default)]
    pub subscription_id: String,

    #[serde(default)]
    pub resource_group: String,

    #[serde(default)]
    pub cluster: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

pub type ClusterDefinition = Resource<ClusterSpec>;

impl Render for AwsParams {
    fn render(&self, vars: &Variables) -> Result<Self, TemplateError> {
        Ok(Self {
            region: resolve_template(&self.region, vars)?,
            cluster: resolve_template(&self.cluster, vars)?,
            profile: render_opt(&self.profile, vars)?,
        })
    }
}

impl Render for AzureParams {
    fn render(&self, vars: &Variables) -> Result<Self, TemplateError> {
        Ok(Self {
            subscription_id: resolve_template(&self.subscription_id, vars)?,
            resource_group: resolve_template(&self.resource_group, vars)?,
            cluster: resolve_template(&self.cluster, vars)?,
            tenant_id: render_opt(&self.tenant_id, vars)?,
        })
    }
}

impl Render for ClusterSpec {
    fn render(&self, vars: &Variables) -> Result<Self, TemplateError> {
        Ok(Self {
            provider: self.provider.clone(),
            aws: self.aws.as_ref().map(|a| a.render(vars)).transpose()?,
            azure: self.azure.as_ref().map(|a| a.render(vars)).transpose()?,
            kubeconfig: render_opt(&self.kubeconfig, vars)?,
        })
    }
}

// ============================================================================
// User overlays
// ============================================================================

/// Contents of `users/<name>.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserSpec {
    #[serde(default)]
    pub provider: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aws: Option<AwsUserParams>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azure: Option<AzureUserParams>,

    #[serde(rename = "static", default, skip_serializing_if = "Option::is_none")]
    pub static_auth: Option<StaticUserParams>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsUserParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureUserParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticUserParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_certificate_data: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_key_data: Option<String>,
}

pub type UserOverlay = Resource<UserSpec>;

impl Render for UserSpec {
    fn render(&self, vars: &Variables) -> Result<Self, TemplateError> {
        Ok(Self {
            provider: self.provider.clone(),
            aws: self
                .aws
                .as_ref()
                .map(|a| -> Result<_, TemplateError> {
                    Ok(AwsUserParams {
                        profile: render_opt(&a.profile, vars)?,
                    })
                })
                .transpose()?,
            azure: self
                .azure
                .as_ref()
                .map(|a| -> Result<_, TemplateError> {
                    Ok(AzureUserParams {
                        tenant_id: render_opt(&a.tenant_id, vars)?,
                    })
                })
                .transpose()?,
            static_auth: self
                .static_auth
                .as_ref()
                .map(|s| -> Result<_, TemplateError> {
                    Ok(StaticUserParams {
                        token: render_opt(&s.token, vars)?,
                        client_certificate_data: render_opt(&s.client_certificate_data, vars)?,
                        client_key_data: render_opt(&s.client_key_data, vars)?,
                    })
                })
                .transpose()?,
        })
    }
}
