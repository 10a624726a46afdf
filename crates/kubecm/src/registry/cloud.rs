//! Cloud provider collaborators: the AWS SDK for EKS, the `az` CLI for AKS.

use std::process::Command;

use aws_sdk_eks::error::DisplayErrorContext;
use aws_sdk_eks::Client;

use super::provider::{ClusterProviders, ProviderError};
use super::resource::{AwsParams, AzureParams};
use crate::kubeconfig::{AuthInfo, Cluster, ContextTriple, ExecConfig, Kubeconfig};

const EXEC_API_VERSION: &str = "client.authentication.k8s.io/v1beta1";

/// Default [`ClusterProviders`]: EKS through `aws-sdk-eks`, AKS through `az`.
#[derive(Debug, Clone)]
pub struct CloudProviders {
    az_bin: String,
}

impl Default for CloudProviders {
    fn default() -> Self {
        Self {
            az_bin: "az".to_string(),
        }
    }
}

impl CloudProviders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the `az` binary, mainly for wrappers and tests.
    pub fn with_az_bin(az_bin: impl Into<String>) -> Self {
        Self {
            az_bin: az_bin.into(),
        }
    }
}

impl ClusterProviders for CloudProviders {
    fn aws_kubeconfig(&self, params: &AwsParams) -> Result<Kubeconfig, ProviderError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ProviderError::aws)?;
        let endpoint = runtime.block_on(describe_eks_cluster(params))?;
        eks_kubeconfig(params, endpoint)
    }

    fn azure_kubeconfig(&self, params: &AzureParams) -> Result<Vec<u8>, ProviderError> {
        let args = [
            "aks",
            "get-credentials",
            "--subscription",
            params.subscription_id.as_str(),
            "--resource-group",
            params.resource_group.as_str(),
            "--name",
            params.cluster.as_str(),
            "--file",
            "-",
        ];
        run(&self.az_bin, &args)
    }
}

// ============================================================================
// EKS
// ============================================================================

/// The parts of an EKS cluster description a kubeconfig needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EksEndpoint {
    pub name: String,
    pub endpoint: Option<String>,
    pub certificate_authority_data: Option<String>,
}

async fn describe_eks_cluster(params: &AwsParams) -> Result<EksEndpoint, ProviderError> {
    let mut config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(params.region.clone()));
    if let Some(profile) = params.profile.as_deref() {
        log::debug!("Using AWS profile: {}", profile);
        config_loader = config_loader.profile_name(profile);
    }
    let config = config_loader.load().await;
    let client = Client::new(&config);

    log::debug!(
        "Describing EKS cluster {} in {}",
        params.cluster,
        params.region
    );
    let response = client
        .describe_cluster()
        .name(&params.cluster)
        .send()
        .await
        .map_err(|e| ProviderError::aws(DisplayErrorContext(&e)))?;

    let cluster = response
        .cluster()
        .ok_or_else(|| ProviderError::Parse(format!("cluster '{}' not described", params.cluster)))?;

    Ok(EksEndpoint {
        name: cluster.name().unwrap_or(&params.cluster).to_string(),
        endpoint: cluster.endpoint().map(str::to_string),
        certificate_authority_data: cluster
            .certificate_authority()
            .and_then(|ca| ca.data())
            .map(str::to_string),
    })
}

/// Builds a kubeconfig for a described EKS cluster.
///
/// Authentication runs `aws eks get-token` through an exec plugin; the
/// profile, when set, is passed as `AWS_PROFILE`.
pub fn eks_kubeconfig(params: &AwsParams, eks: EksEndpoint) -> Result<Kubeconfig, ProviderError> {
    let server = eks.endpoint.filter(|e| !e.is_empty()).ok_or_else(|| {
        ProviderError::Parse(format!("cluster '{}' has no endpoint yet", eks.name))
    })?;

    let mut exec = ExecConfig {
        api_version: Some(EXEC_API_VERSION.to_string()),
        command: "aws".to_string(),
        args: vec![
            "eks".to_string(),
            "get-token".to_string(),
            "--cluster-name".to_string(),
            eks.name.clone(),
            "--region".to_string(),
            params.region.clone(),
            "--output".to_string(),
            "json".to_string(),
        ],
        ..Default::default()
    };
    if let Some(profile) = params.profile.as_deref() {
        exec.set_env("AWS_PROFILE", profile);
    }

    let mut config = Kubeconfig::new();
    config.upsert_triple(
        &eks.name,
        ContextTriple {
            cluster: Cluster {
                server,
                certificate_authority_data: eks.certificate_authority_data,
                ..Default::default()
            },
            auth_info: AuthInfo {
                exec: Some(exec),
                ..Default::default()
            },
            namespace: None,
        },
    );
    config.current_context = Some(eks.name);
    Ok(config)
}

// ============================================================================
// AKS
// ============================================================================

fn run(program: &str, args: &[&str]) -> Result<Vec<u8>, ProviderError> {
    log::debug!("Running {} {}", program, args.join(" "));

    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| ProviderError::Command {
            program: program.to_string(),
            message: e.to_string(),
        })?;

    if output.status.success() {
        Ok(output.stdout)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        Err(ProviderError::Command {
            program: program.to_string(),
            message: if stderr.is_empty() {
                format!("exit code {}", output.status.code().unwrap_or(-1))
            } else {
                stderr
            },
        })
    }
}
