//! CLI configuration and argument parsing.

use std::ffi::OsStr;
use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};

use kubecm::kubeconfig::file;
use kubecm::StateStore;

/// Kubeconfig manager with Git-distributed cluster registries.
///
/// Merges, renames, switches and deletes kubeconfig contexts, and keeps a set
/// of contexts in sync with a registry repository.
#[derive(Parser, Debug, Clone)]
#[command(name = "kubecm")]
#[command(version, about = "Kubeconfig manager with Git-distributed cluster registries")]
pub struct Args {
    /// Kubeconfig file to edit (first entry of a KUBECONFIG list is used)
    #[arg(long, global = true, env = "KUBECONFIG")]
    pub kubeconfig: Option<String>,

    /// State directory holding registry config and clones [default: ~/.kubecm]
    #[arg(long, global = true, env = "KUBECM_HOME")]
    pub home: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn", env = "KUBECM_LOG_LEVEL")]
    pub log_level: String,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    #[value(alias = "text")]
    Table,
    Json,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Manage cluster registries
    #[command(subcommand)]
    Registry(RegistryCommand),

    /// List contexts in the kubeconfig
    #[command(alias = "ls")]
    List {
        #[arg(long, short, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },

    /// Set the current context
    Switch {
        #[arg(value_name = "CONTEXT")]
        context: String,
    },

    /// Rename a context
    Rename {
        #[arg(value_name = "OLD")]
        from: String,
        #[arg(value_name = "NEW")]
        to: String,
    },

    /// Delete a context, and its cluster and user when nothing else uses them
    #[command(alias = "rm")]
    Delete {
        #[arg(value_name = "CONTEXT")]
        context: String,
    },

    /// Merge another kubeconfig file into the kubeconfig
    Add {
        /// Kubeconfig file to merge
        #[arg(long, short)]
        file: PathBuf,

        /// Replace contexts that already exist
        #[arg(long)]
        overwrite: bool,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum RegistryCommand {
    /// Clone a registry and record it
    #[command(after_help = r#"Examples:
  kubecm registry add --name acme --url git@github.com:acme/clusters.git --role devops --var Username=alice"#)]
    Add {
        #[arg(long)]
        name: String,

        /// Git URL of the registry repository
        #[arg(long)]
        url: String,

        /// Role whose contexts are synced
        #[arg(long)]
        role: String,

        /// Branch, tag or commit to track
        #[arg(long = "ref", default_value = kubecm::registry::DEFAULT_REF)]
        git_ref: String,

        /// Template variable binding, repeatable
        #[arg(long = "var", value_name = "KEY=VALUE")]
        vars: Vec<String>,
    },

    /// List configured registries
    #[command(alias = "ls")]
    List {
        #[arg(long, short, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },

    /// Reconcile registry contexts into the kubeconfig
    #[command(after_help = r#"Examples:
  kubecm registry sync acme            Sync one registry
  kubecm registry sync --all --dry-run Show what syncing every registry would do"#)]
    Sync {
        /// Registry to sync
        #[arg(value_name = "NAME", required_unless_present = "all", conflicts_with = "all")]
        name: Option<String>,

        /// Sync every configured registry
        #[arg(long)]
        all: bool,

        /// Report planned changes without writing anything
        #[arg(long)]
        dry_run: bool,

        #[arg(long, short, value_enum, default_value_t = OutputFormat::Table)]
        output: OutputFormat,
    },

    /// Change role, ref or variables of a registry
    Update {
        #[arg(value_name = "NAME")]
        name: String,

        #[arg(long)]
        role: Option<String>,

        #[arg(long = "ref")]
        git_ref: Option<String>,

        /// Template variable binding, repeatable
        #[arg(long = "var", value_name = "KEY=VALUE")]
        vars: Vec<String>,
    },

    /// Forget a registry and remove the contexts it manages
    #[command(alias = "rm")]
    Remove {
        #[arg(value_name = "NAME")]
        name: String,

        /// Leave the registry's contexts in the kubeconfig
        #[arg(long)]
        keep_contexts: bool,
    },

    /// List roles offered by a registry
    Roles {
        #[arg(value_name = "NAME")]
        name: String,
    },
}

/// Paths derived from the global flags.
#[derive(Debug, Clone)]
pub struct Paths {
    pub kubeconfig: PathBuf,
    pub home: PathBuf,
}

impl Paths {
    pub fn from_args(args: &Args) -> Result<Self> {
        let kubeconfig = file::default_path(args.kubeconfig.as_deref().map(OsStr::new))
            .ok_or_else(|| anyhow!("cannot determine kubeconfig path; pass --kubeconfig"))?;
        let home = args
            .home
            .clone()
            .or_else(StateStore::default_root)
            .ok_or_else(|| anyhow!("cannot determine home directory; pass --home"))?;

        Ok(Self { kubeconfig, home })
    }
}
