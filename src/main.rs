/*============================================================
  Synavera Project: Extension Updater
  Module: extension_updater::main
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Standalone entry point. Loads configuration and the
    extension manifest, wires the Confluence source with
    terminal collaborators and runs one update check.

  Security / Safety Notes:
    Operates within user privileges. Performs HTTPS GET
    requests and spawns the editor launcher only.

  Dependencies:
    clap for CLI parsing.

  Operational Scope:
    Invoked manually or by a low-frequency scheduler; one run
    per invocation.

  Revision History:
    2026-10-16 COD  Authored updater driver binary.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Result-first error handling with deterministic exits
    - Structured logging following Synavera cadence
    - Configurable execution via CLI and config file
============================================================*/

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{ArgAction, Parser};

use extension_updater::code_cli::CodeCliExecutor;
use extension_updater::state::JsonStateStore;
use extension_updater::terminal::TerminalUi;
use extension_updater::{
    ConfluenceSource, ExtensionManifest, HostServices, Logger, Result, UpdateOrchestrator,
    UpdateOutcome, UpdaterConfig,
};

/// Command-line arguments for the extension updater.
#[derive(Debug, Parser)]
#[command(
    name = "extension-updater",
    version,
    author = "Synavera Systems",
    about = "Checks for, downloads and installs new extension releases"
)]
struct Cli {
    /// Override configuration file path.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Extension `package.json` to read name and publisher from.
    #[arg(long, value_name = "PATH")]
    manifest: Option<PathBuf>,
    /// Override persisted state file path.
    #[arg(long, value_name = "PATH")]
    state: Option<PathBuf>,
    /// Explicit log file path.
    #[arg(long, value_name = "PATH")]
    log: Option<PathBuf>,
    /// Editor launcher used to install packages.
    #[arg(long, value_name = "PROGRAM", default_value = "code")]
    code: PathBuf,
    /// Install the latest release even when it is not newer.
    #[arg(long, action = ArgAction::SetTrue)]
    force: bool,
    /// Report when no newer release exists.
    #[arg(long, action = ArgAction::SetTrue)]
    notify_up_to_date: bool,
    /// Enable verbose logging to stderr.
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("[extension-updater] {err}");
            err.exit_code()
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = UpdaterConfig::load_from_optional_path(cli.config.as_deref())?;

    let log_path = cli
        .log
        .clone()
        .unwrap_or_else(|| Logger::session_path(&config.log_dir()));
    let logger = Arc::new(Logger::new(Some(log_path), cli.verbose)?);
    logger.info("INIT", "Extension updater starting.");

    let manifest_path = cli.manifest.clone().unwrap_or_else(|| config.manifest_path());
    let manifest = ExtensionManifest::load(&manifest_path)?;
    logger.info(
        "MANIFEST",
        format!("{} ({})", manifest.display_name, manifest.full_name()),
    );

    let mut options = config.updater.options();
    options.force_reinstall |= cli.force;
    options.show_up_to_date_notification |= cli.notify_up_to_date;

    let state_path = cli.state.clone().unwrap_or_else(|| config.state_path());
    let store = JsonStateStore::open(&state_path)?;
    logger.debug("STATE", format!("Using {}", store.path().display()));

    let source = ConfluenceSource::new(&config.confluence, &manifest, logger.clone())?;
    let host = HostServices {
        store: Arc::new(store),
        ui: Arc::new(TerminalUi::new(logger.clone())),
        executor: Arc::new(CodeCliExecutor::new(cli.code.clone(), logger.clone())),
    };

    let updater = UpdateOrchestrator::new(manifest, options, Arc::new(source), host, logger.clone())?;
    let outcome = updater.check_and_install().await;

    conclude(&logger, outcome)
}

/// Log the run summary and seal the log; the workflow result always wins.
fn conclude(logger: &Logger, outcome: Result<UpdateOutcome>) -> Result<ExitCode> {
    match &outcome {
        Ok(UpdateOutcome::UpToDate { installed, latest }) => logger.info(
            "SUMMARY",
            format!("up to date (installed={installed} latest={latest})"),
        ),
        Ok(UpdateOutcome::Declined { latest }) => {
            logger.info("SUMMARY", format!("update to {latest} declined"))
        }
        Ok(UpdateOutcome::Installed { version, reloaded }) => logger.info(
            "SUMMARY",
            format!("installed {version} (reloaded={reloaded})"),
        ),
        Err(err) => logger.error("SUMMARY", err.to_string()),
    }
    if let Err(err) = logger.finalize() {
        logger.warn("FINALIZE", err.to_string());
    }

    outcome.map(|_| ExitCode::SUCCESS)
}
