pub mod error;
pub mod kubeconfig;
pub mod registry;

pub use error::{KubecmError, Result};
pub use kubeconfig::{ContextTriple, Kubeconfig, KubeconfigError, MergeReport, RemovedEntries};
pub use registry::{
    CloudProviders, GitFetcher, RegistryEntry, RegistryError, RegistryManager, StateStore,
    SyncResult,
};
