//! TBlock Guard bootstrap executable.
//!
//! Usage:
//!   tblock-bootstrap [--license-key KEY] [--install-root DIR] [-- INSTALLER ARGS]

use std::process::ExitCode;

use clap::Parser;
use tblock_bootstrap::{logging, Args, BootstrapError, Config, Orchestrator};
use tblock_license::{FileKeyCache, LicenseBroker};
use tblock_stage::Stager;
use tracing::{debug, info};

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(args: Args) -> Result<(), BootstrapError> {
    let config = Config::from_args(args)?;
    debug!(
        "Endpoint {}, payload {}, root {}",
        config.broker.endpoint,
        config.payload_path.display(),
        config.install_root.display()
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| BootstrapError::Config(format!("cannot start runtime: {e}")))?;

    let broker = LicenseBroker::new(config.broker.clone())?;
    let cache = FileKeyCache::new(&config.cache_path);
    let stager = Stager::new(&config.install_root, &config.entry_point);

    let mut orchestrator = Orchestrator::new(cache, broker, stager, config.payload_path.clone())
        .run_installer(config.run_installer)
        .installer_args(config.installer_args.clone())
        .listen_for_interrupts(true);

    let phase = runtime.block_on(orchestrator.run(config.key_input.clone()))?;
    info!("Bootstrap {}", phase);
    Ok(())
}
