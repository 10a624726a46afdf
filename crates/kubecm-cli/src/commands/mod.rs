//! Command handlers.

pub mod kubeconfig;
pub mod registry;

use std::path::Path;

use kubecm::kubeconfig::file;
use kubecm::Kubeconfig;

/// Loads the kubeconfig, applies `edit`, and writes it back when `edit`
/// reports a change.
pub fn edit_kubeconfig<T>(
    path: &Path,
    edit: impl FnOnce(&mut Kubeconfig) -> kubecm::Result<(T, bool)>,
) -> kubecm::Result<T> {
    let mut config = file::load(path)?;
    let (value, changed) = edit(&mut config)?;
    if changed {
        file::save(path, &config)?;
        tracing::debug!("Saved kubeconfig {}", path.display());
    }
    Ok(value)
}
