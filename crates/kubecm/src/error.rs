use thiserror::Error;

use crate::kubeconfig::KubeconfigError;
use crate::registry::RegistryError;

#[derive(Error, Debug)]
pub enum KubecmError {
    #[error("Kubeconfig error: {0}")]
    Kubeconfig(#[from] KubeconfigError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

pub type Result<T> = std::result::Result<T, KubecmError>;
