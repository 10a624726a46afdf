//! Table and JSON rendering for command results.

use anyhow::Result;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use kubecm::registry::{RegistrySyncOutcome, SyncResult};
use kubecm::{Kubeconfig, RegistryEntry};

use crate::cli::OutputFormat;

#[derive(Tabled, Serialize)]
struct ContextRow {
    #[tabled(rename = "CURRENT")]
    #[serde(skip)]
    marker: &'static str,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "CLUSTER")]
    cluster: String,
    #[tabled(rename = "USER")]
    user: String,
    #[tabled(rename = "NAMESPACE")]
    namespace: String,
    #[tabled(rename = "REGISTRY")]
    registry: String,
    #[tabled(skip)]
    current: bool,
}

#[derive(Tabled)]
struct RegistryRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "ROLE")]
    role: String,
    #[tabled(rename = "REF")]
    git_ref: String,
    #[tabled(rename = "CONTEXTS")]
    contexts: usize,
    #[tabled(rename = "LAST SYNC")]
    last_sync: String,
    #[tabled(rename = "URL")]
    url: String,
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_table<T: Tabled>(rows: Vec<T>) {
    let mut table = Table::new(rows);
    table.with(Style::blank());
    println!("{}", table);
}

/// Prints the contexts of a kubeconfig, kubectl style, with the registry
/// owning each one.
pub fn print_contexts(
    config: &Kubeconfig,
    registries: &[RegistryEntry],
    format: OutputFormat,
) -> Result<()> {
    let current = config.current_context.as_deref();
    let rows: Vec<ContextRow> = config
        .contexts
        .iter()
        .map(|c| {
            let is_current = current == Some(c.name.as_str());
            ContextRow {
                marker: if is_current { "*" } else { "" },
                name: c.name.clone(),
                cluster: c.context.cluster.clone(),
                user: c.context.user.clone(),
                namespace: c.context.namespace.clone().unwrap_or_default(),
                registry: registries
                    .iter()
                    .find(|r| r.manages(&c.name))
                    .map(|r| r.name.clone())
                    .unwrap_or_default(),
                current: is_current,
            }
        })
        .collect();

    match format {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Table => {
            if rows.is_empty() {
                println!("No contexts found.");
            } else {
                print_table(rows);
            }
            Ok(())
        }
    }
}

pub fn print_registries(entries: &[RegistryEntry], format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(entries);
    }
    if entries.is_empty() {
        println!("No registries configured.");
        return Ok(());
    }

    let rows = entries
        .iter()
        .map(|e| RegistryRow {
            name: e.name.clone(),
            role: e.role.clone(),
            git_ref: e.git_ref.clone(),
            contexts: e.managed_contexts.len(),
            last_sync: e
                .last_sync
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "never".to_string()),
            url: e.url.clone(),
        })
        .collect();
    print_table::<RegistryRow>(rows);
    Ok(())
}

/// Human-readable summary lines for one sync result.
pub fn sync_summary(registry: &str, result: &SyncResult, dry_run: bool) -> Vec<String> {
    let prefix = if dry_run { "[DRY RUN] " } else { "" };
    let mut lines = vec![format!(
        "{}Registry '{}': {} added, {} updated, {} unchanged, {} removed, {} skipped",
        prefix,
        registry,
        result.added.len(),
        result.updated.len(),
        result.unchanged.len(),
        result.removed.len(),
        result.skipped.len()
    )];

    let sections: [(&str, &[String]); 4] = [
        ("+", &result.added),
        ("~", &result.updated),
        ("-", &result.removed),
        ("!", &result.skipped),
    ];
    for (mark, names) in sections {
        lines.extend(names.iter().map(|n| format!("  {} {}", mark, n)));
    }
    lines.extend(result.errors.iter().map(|e| format!("  error: {}", e)));
    lines
}

pub fn print_sync(
    registry: &str,
    result: &SyncResult,
    dry_run: bool,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(result),
        OutputFormat::Table => {
            for line in sync_summary(registry, result, dry_run) {
                println!("{}", line);
            }
            Ok(())
        }
    }
}

pub fn print_sync_all(
    outcomes: &[RegistrySyncOutcome],
    dry_run: bool,
    format: OutputFormat,
) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(outcomes);
    }
    if outcomes.is_empty() {
        println!("No registries configured.");
    }
    for outcome in outcomes {
        match (&outcome.result, &outcome.error) {
            (Some(result), _) => {
                for line in sync_summary(&outcome.registry, result, dry_run) {
                    println!("{}", line);
                }
            }
            (None, Some(error)) => println!("Registry '{}': failed: {}", outcome.registry, error),
            (None, None) => {}
        }
    }
    Ok(())
}
