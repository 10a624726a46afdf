//! Plain kubeconfig commands: list, switch, rename, delete, add.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use kubecm::kubeconfig::file;
use kubecm::StateStore;

use super::edit_kubeconfig;
use crate::cli::OutputFormat;
use crate::output;

pub fn list(kubeconfig: &Path, home: &Path, format: OutputFormat) -> Result<()> {
    let config = file::load(kubeconfig)?;
    let registries = StateStore::new(home).load()?.registries;
    output::print_contexts(&config, &registries, format)
}

pub fn switch(kubeconfig: &Path, context: &str) -> Result<()> {
    edit_kubeconfig(kubeconfig, |config| {
        config.switch_context(context)?;
        Ok(((), true))
    })?;
    println!("Switched to context \"{}\".", context);
    Ok(())
}

pub fn rename(kubeconfig: &Path, from: &str, to: &str) -> Result<()> {
    edit_kubeconfig(kubeconfig, |config| {
        config.rename_context(from, to)?;
        Ok(((), from != to))
    })?;
    println!("Context \"{}\" renamed to \"{}\".", from, to);
    Ok(())
}

pub fn delete(kubeconfig: &Path, context: &str) -> Result<()> {
    let removed = edit_kubeconfig(kubeconfig, |config| {
        let removed = config.remove_context(context)?;
        Ok((removed, true))
    })?;

    println!("Deleted context \"{}\".", removed.context);
    if let Some(cluster) = removed.cluster {
        info!("Deleted unused cluster '{}'", cluster);
    }
    if let Some(user) = removed.user {
        info!("Deleted unused user '{}'", user);
    }
    Ok(())
}

pub fn add(kubeconfig: &Path, source: &Path, overwrite: bool) -> Result<()> {
    let incoming = file::load(source)?;
    if incoming.contexts.is_empty() {
        anyhow::bail!("{} contains no contexts", source.display());
    }

    let report = edit_kubeconfig(kubeconfig, |config| {
        let report = config.merge_from(&incoming, overwrite)?;
        Ok((report, true))
    })
    .with_context(|| format!("failed to merge {}", source.display()))?;

    for name in &report.added {
        println!("Added context \"{}\".", name);
    }
    for name in &report.replaced {
        println!("Replaced context \"{}\".", name);
    }
    Ok(())
}
