//! Git-distributed cluster registries.
//!
//! A registry is a Git repository of K8s-style YAML resources:
//! - `registry.yaml` with metadata and declared variables
//! - `roles/` listing the contexts a role gets
//! - `clusters/` (or legacy `fragments/`) describing how to reach a cluster
//! - `users/` with per-provider auth overlays
//!
//! Syncing a registry reconciles the role's contexts into a kubeconfig while
//! leaving contexts it does not own alone.

pub mod cloud;
pub mod error;
pub mod git;
pub mod loader;
pub mod manager;
pub mod provider;
pub mod resource;
pub mod state;
pub mod sync;
pub mod template;
pub mod validation;

pub use cloud::CloudProviders;
pub use error::{classify_git_error, RegistryError, Result};
pub use git::{GitFetcher, GitRepository, RepositoryFetcher};
pub use loader::RepositoryLoader;
pub use manager::{AddRegistry, RegistryManager, RegistrySyncOutcome, UpdateRegistry, DEFAULT_REF};
pub use provider::{
    apply_user_overlay, resolve_cluster, resolve_triple, ClusterProviders, ClusterSource,
    ProviderError,
};
pub use resource::{
    AwsParams, AzureParams, ClusterDefinition, ClusterSpec, ContextDecl, NormalizedContext,
    ObjectMeta, RegistryMeta, Resource, Role, RoleSpec, UserOverlay, UserSpec, VariableSpec,
    API_VERSION,
};
pub use state::{KubecmConfig, RegistryEntry, StateStore};
pub use sync::{SyncResult, Syncer};
pub use template::{resolve_template, TemplateError, Variables};
pub use validation::{
    parse_variable, resolve_variables, validate_registry_name, validate_role_contexts,
    NamedDeclaration,
};
