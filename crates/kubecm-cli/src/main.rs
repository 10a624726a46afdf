//! kubecm - kubeconfig manager with Git-distributed cluster registries.

mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use cli::{Args, Command, LogFormat, Paths};

fn main() {
    let args = Args::parse();

    if let Err(e) = init_tracing(&args.log_level, args.log_format) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    debug!("Starting kubecm v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(&args) {
        debug!("Command failed: {:?}", e);
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let paths = Paths::from_args(args)?;
    debug!(
        "Using kubeconfig {} and home {}",
        paths.kubeconfig.display(),
        paths.home.display()
    );

    match &args.command {
        Command::Registry(command) => commands::registry::run(&paths, command),
        Command::List { output } => {
            commands::kubeconfig::list(&paths.kubeconfig, &paths.home, *output)
        }
        Command::Switch { context } => commands::kubeconfig::switch(&paths.kubeconfig, context),
        Command::Rename { from, to } => commands::kubeconfig::rename(&paths.kubeconfig, from, to),
        Command::Delete { context } => commands::kubeconfig::delete(&paths.kubeconfig, context),
        Command::Add { file, overwrite } => {
            commands::kubeconfig::add(&paths.kubeconfig, file, *overwrite)
        }
    }
}

/// Installs the tracing subscriber and routes `log` records from the library
/// into it. `RUST_LOG` takes precedence over `--log-level`.
fn init_tracing(log_level: &str, format: LogFormat) -> Result<()> {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .map_err(|e| anyhow::anyhow!("Failed to initialize log filter: {}", e))?;

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match format {
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish())?,
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
    }

    tracing_log::LogTracer::init()?;
    Ok(())
}
