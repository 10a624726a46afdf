//! Registry-specific error types.

use std::path::PathBuf;
use thiserror::Error;

use super::provider::ProviderError;
use super::template::TemplateError;
use crate::kubeconfig::KubeconfigError;

/// Errors that can occur during registry operations.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Failed to read directory '{path}': {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML in '{path}': {message}")]
    ParseYaml { path: PathBuf, message: String },

    #[error("Failed to serialize YAML: {0}")]
    SerializeYaml(String),

    #[error("Registry repository not found: {0}")]
    RepositoryNotFound(PathBuf),

    #[error("Registry metadata file not found: {0}")]
    MissingRegistryFile(PathBuf),

    #[error("Role '{0}' not found in registry")]
    RoleNotFound(String),

    #[error("Cluster '{0}' not found in clusters/ or fragments/")]
    ClusterNotFound(String),

    #[error("User '{0}' not found in registry")]
    UserNotFound(String),

    #[error("Invalid role '{role}': {message}")]
    InvalidRole { role: String, message: String },

    #[error("Missing required variables: {}", .0.join(", "))]
    MissingVariables(Vec<String>),

    #[error("Invalid variable binding '{0}', expected KEY=VALUE")]
    InvalidVariable(String),

    #[error("Registry not found: {0}")]
    RegistryNotFound(String),

    #[error("Registry already exists: {0}")]
    RegistryAlreadyExists(String),

    #[error("Invalid registry name '{0}'")]
    InvalidName(String),

    #[error(
        "User '{user}' targets provider '{user_provider}' but cluster uses '{cluster_provider}'"
    )]
    ProviderMismatch {
        user: String,
        user_provider: String,
        cluster_provider: String,
    },

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Kubeconfig error: {0}")]
    Kubeconfig(#[from] KubeconfigError),

    #[error("Git operation failed: {0}")]
    GitOperation(String),

    #[error("Git network error: {0}")]
    GitNetworkError(String),

    #[error("Git authentication failed: {0}")]
    GitAuthFailed(String),

    #[error("Git ref '{0}' not found")]
    GitRefNotFound(String),

    #[error("Git repository not initialized")]
    GitNotInitialized,
}

impl From<std::io::Error> for RegistryError {
    fn from(err: std::io::Error) -> Self {
        RegistryError::ReadFile {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl RegistryError {
    /// Returns true if the error is likely transient and the operation can be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RegistryError::GitNetworkError(_))
    }
}

/// Classifies a git stderr string into a more specific error variant.
pub fn classify_git_error(stderr: &str) -> RegistryError {
    let lower = stderr.to_lowercase();

    if lower.contains("could not resolve host")
        || lower.contains("connection refused")
        || lower.contains("connection timed out")
        || lower.contains("network is unreachable")
        || lower.contains("unable to access")
        || lower.contains("failed to connect")
        || lower.contains("couldn't connect to server")
        || lower.contains("the remote end hung up unexpectedly")
    {
        return RegistryError::GitNetworkError(stderr.trim().to_string());
    }

    if lower.contains("authentication failed")
        || lower.contains("permission denied")
        || lower.contains("invalid credentials")
    {
        return RegistryError::GitAuthFailed(stderr.trim().to_string());
    }

    if lower.contains("did not match any file(s) known to git")
        || lower.contains("couldn't find remote ref")
        || lower.contains("remote branch") && lower.contains("not found")
    {
        return RegistryError::GitRefNotFound(stderr.trim().to_string());
    }

    RegistryError::GitOperation(stderr.trim().to_string())
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
