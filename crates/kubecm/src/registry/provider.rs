//! Turning cluster definitions into concrete kubeconfig entries.

use thiserror::Error;

use super::resource::{AwsParams, AzureParams, ClusterSpec, UserSpec};
use crate::kubeconfig::{AuthInfo, ContextTriple, Kubeconfig};

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("static cluster has an empty kubeconfig")]
    EmptyKubeconfig,

    #[error("failed to parse kubeconfig: {0}")]
    Parse(String),

    #[error("provider '{provider}' requires a '{section}' section")]
    MissingSection {
        provider: &'static str,
        section: &'static str,
    },

    #[error("unsupported provider '{0}'")]
    UnsupportedProvider(String),

    #[error("resolved kubeconfig contains no context")]
    NoContext,

    #[error("{program} failed: {message}")]
    Command { program: String, message: String },

    #[error("AWS API error: {0}")]
    Aws(String),
}

impl ProviderError {
    /// Wraps any AWS SDK or runtime error.
    pub fn aws<E: std::fmt::Display>(err: E) -> Self {
        ProviderError::Aws(err.to_string())
    }
}

/// Cloud collaborators that produce kubeconfigs for managed clusters.
pub trait ClusterProviders {
    /// Returns a kubeconfig for an EKS cluster.
    fn aws_kubeconfig(&self, params: &AwsParams) -> Result<Kubeconfig, ProviderError>;

    /// Returns raw kubeconfig bytes for an AKS cluster.
    fn azure_kubeconfig(&self, params: &AzureParams) -> Result<Vec<u8>, ProviderError>;
}

/// A cluster definition after provider dispatch has been decided.
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterSource<'a> {
    Static(&'a str),
    Aws(&'a AwsParams),
    Azure(&'a AzureParams),
}

impl<'a> ClusterSource<'a> {
    /// Picks the source for a (templated) cluster definition.
    pub fn from_spec(spec: &'a ClusterSpec) -> Result<Self, ProviderError> {
        match spec.provider.as_str() {
            "static" => Ok(ClusterSource::Static(
                spec.kubeconfig.as_deref().unwrap_or_default(),
            )),
            "aws" => spec
                .aws
                .as_ref()
                .map(ClusterSource::Aws)
                .ok_or(ProviderError::MissingSection {
                    provider: "aws",
                    section: "aws",
                }),
            "azure" => spec
                .azure
                .as_ref()
                .map(ClusterSource::Azure)
                .ok_or(ProviderError::MissingSection {
                    provider: "azure",
                    section: "azure",
                }),
            other => Err(ProviderError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Resolves a cluster definition to a kubeconfig.
pub fn resolve_cluster(
    spec: &ClusterSpec,
    providers: &dyn ClusterProviders,
) -> Result<Kubeconfig, ProviderError> {
    match ClusterSource::from_spec(spec)? {
        ClusterSource::Static(text) => parse_kubeconfig(text),
        ClusterSource::Aws(params) => providers.aws_kubeconfig(params),
        ClusterSource::Azure(params) => {
            let bytes = providers.azure_kubeconfig(params)?;
            let text = String::from_utf8(bytes).map_err(|e| ProviderError::Parse(e.to_string()))?;
            let mut config = parse_kubeconfig(&text)?;
            if let Some(tenant) = params.tenant_id.as_deref().filter(|t| !t.is_empty()) {
                for user in &mut config.auth_infos {
                    if let Some(exec) = user.auth_info.exec.as_mut() {
                        exec.set_arg("--tenant-id", tenant);
                    }
                }
            }
            Ok(config)
        }
    }
}

/// Resolves a cluster definition down to the single triple it stands for.
pub fn resolve_triple(
    spec: &ClusterSpec,
    providers: &dyn ClusterProviders,
) -> Result<ContextTriple, ProviderError> {
    let config = resolve_cluster(spec, providers)?;
    config
        .primary_triple()
        .ok_or(ProviderError::NoContext)?
        .map_err(|e| ProviderError::Parse(e.to_string()))
}

fn parse_kubeconfig(text: &str) -> Result<Kubeconfig, ProviderError> {
    if text.trim().is_empty() {
        return Err(ProviderError::EmptyKubeconfig);
    }
    Kubeconfig::from_yaml(text).map_err(|e| ProviderError::Parse(e.to_string()))
}

/// Why a user overlay could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayMismatch {
    pub user_provider: String,
}

/// Applies a templated user overlay to a resolved auth-info.
///
/// Only fields the overlay sets are touched. The overlay must target the same
/// provider as the cluster it is applied to.
pub fn apply_user_overlay(
    auth: &mut AuthInfo,
    cluster_provider: &str,
    overlay: &UserSpec,
) -> Result<(), OverlayMismatch> {
    if overlay.provider != cluster_provider {
        return Err(OverlayMismatch {
            user_provider: overlay.provider.clone(),
        });
    }

    match overlay.provider.as_str() {
        "aws" => {
            let profile = overlay.aws.as_ref().and_then(|a| a.profile.as_deref());
            if let (Some(profile), Some(exec)) = (profile, auth.exec.as_mut()) {
                exec.set_env("AWS_PROFILE", profile);
            }
        }
        "azure" => {
            let tenant = overlay.azure.as_ref().and_then(|a| a.tenant_id.as_deref());
            if let (Some(tenant), Some(exec)) = (tenant, auth.exec.as_mut()) {
                exec.set_arg("--tenant-id", tenant);
            }
        }
        "static" => {
            if let Some(params) = &overlay.static_auth {
                if params.token.is_some() {
                    auth.token = params.token.clone();
                }
                if params.client_certificate_data.is_some() {
                    auth.client_certificate_data = params.client_certificate_data.clone();
                }
                if params.client_key_data.is_some() {
                    auth.client_key_data = params.client_key_data.clone();
                }
            }
        }
        _ => {}
    }

    Ok(())
}
