//! `kubecm registry ...` commands.

use std::path::Path;

use anyhow::Result;
use tracing::{info, warn};

use kubecm::kubeconfig::file;
use kubecm::registry::{
    parse_variable, AddRegistry, CloudProviders, GitFetcher, RegistryManager, StateStore,
    UpdateRegistry, Variables,
};

use super::edit_kubeconfig;
use crate::cli::{OutputFormat, Paths, RegistryCommand};
use crate::output;

/// Builds a manager backed by `git` and the cloud CLIs.
pub fn manager(home: &Path) -> RegistryManager {
    RegistryManager::new(
        StateStore::new(home),
        Box::new(GitFetcher),
        Box::new(CloudProviders::new()),
    )
}

pub fn run(paths: &Paths, command: &RegistryCommand) -> Result<()> {
    let manager = manager(&paths.home);

    match command {
        RegistryCommand::Add {
            name,
            url,
            role,
            git_ref,
            vars,
        } => {
            let entry = manager.add(AddRegistry {
                name: name.clone(),
                url: url.clone(),
                git_ref: Some(git_ref.clone()),
                role: role.clone(),
                variables: parse_variables(vars)?,
            })?;
            println!(
                "Registry '{}' added (role '{}', ref '{}'). Run 'kubecm registry sync {}' to fetch its contexts.",
                entry.name, entry.role, entry.git_ref, entry.name
            );
            Ok(())
        }
        RegistryCommand::List { output } => output::print_registries(&manager.list()?, *output),
        RegistryCommand::Sync {
            name,
            all,
            dry_run,
            output,
        } => sync(&manager, &paths.kubeconfig, name.as_deref(), *all, *dry_run, *output),
        RegistryCommand::Update {
            name,
            role,
            git_ref,
            vars,
        } => {
            let entry = manager.update(
                name,
                UpdateRegistry {
                    role: role.clone(),
                    git_ref: git_ref.clone(),
                    variables: parse_variables(vars)?,
                },
            )?;
            println!(
                "Registry '{}' updated (role '{}', ref '{}').",
                entry.name, entry.role, entry.git_ref
            );
            Ok(())
        }
        RegistryCommand::Remove {
            name,
            keep_contexts,
        } => {
            let removed = edit_kubeconfig(&paths.kubeconfig, |config| {
                let removed = manager.remove_contexts(name, config, *keep_contexts)?;
                let changed = !removed.is_empty();
                Ok((removed, changed))
            })?;
            manager.forget(name)?;
            for context in &removed {
                println!("Deleted context \"{}\".", context);
            }
            println!("Registry '{}' removed.", name);
            Ok(())
        }
        RegistryCommand::Roles { name } => {
            for role in manager.roles(name)? {
                println!("{}", role);
            }
            Ok(())
        }
    }
}

fn sync(
    manager: &RegistryManager,
    kubeconfig: &Path,
    name: Option<&str>,
    all: bool,
    dry_run: bool,
    format: OutputFormat,
) -> Result<()> {
    let mut config = file::load(kubeconfig)?;

    match name {
        Some(name) if !all => {
            let result = manager.sync(name, &mut config, dry_run)?;
            if !dry_run && result.has_changes() {
                file::save(kubeconfig, &config)?;
            }
            if !result.errors.is_empty() {
                warn!("Registry '{}' synced with {} errors", name, result.errors.len());
            }
            output::print_sync(name, &result, dry_run, format)
        }
        _ => {
            let outcomes = manager.sync_all(&mut config, dry_run)?;
            let changed = outcomes
                .iter()
                .filter_map(|o| o.result.as_ref())
                .any(|r| r.has_changes());
            if !dry_run && changed {
                file::save(kubeconfig, &config)?;
            }
            info!("Synced {} registries", outcomes.len());
            output::print_sync_all(&outcomes, dry_run, format)
        }
    }
}

fn parse_variables(bindings: &[String]) -> Result<Variables> {
    let mut vars = Variables::new();
    for binding in bindings {
        let (key, value) = parse_variable(binding)?;
        vars.insert(key, value);
    }
    Ok(vars)
}
