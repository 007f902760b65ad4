//! Command line and environment configuration.

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tblock_license::{
    BrokerConfig, DEFAULT_CACHE_PATH, DEFAULT_LICENSE_API_URL, DEFAULT_TIMEOUT_SECS,
    LICENSE_API_ENV,
};
use tblock_stage::{DEFAULT_ENTRY_POINT, DEFAULT_INSTALL_ROOT};

use crate::error::BootstrapError;

/// File name of the encrypted payload shipped next to the executable.
pub const PAYLOAD_FILE_NAME: &str = "payload.bin";

#[derive(Parser, Debug)]
#[command(name = "tblock-bootstrap", version)]
#[command(about = "Decrypts and installs the licensed TBlock Guard payload")]
pub struct Args {
    /// License key to use instead of prompting
    #[arg(long, env = "TBLOCK_LICENSE_KEY", hide_env_values = true)]
    pub license_key: Option<String>,

    /// Never prompt; fall back to the cached key
    #[arg(long)]
    pub non_interactive: bool,

    /// Authorization endpoint
    #[arg(long, env = LICENSE_API_ENV, default_value = DEFAULT_LICENSE_API_URL)]
    pub api_url: String,

    /// Authorization request timeout in seconds
    #[arg(long, env = "TBLOCK_LICENSE_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Where the last working license key is remembered
    #[arg(long, env = "TBLOCK_LICENSE_CACHE", default_value = DEFAULT_CACHE_PATH)]
    pub cache_path: PathBuf,

    /// Encrypted payload (defaults to payload.bin next to this executable)
    #[arg(long, env = "TBLOCK_PAYLOAD")]
    pub payload: Option<PathBuf>,

    /// Installation root, replaced as a whole
    #[arg(long, env = "TBLOCK_INSTALL_ROOT", default_value = DEFAULT_INSTALL_ROOT)]
    pub install_root: PathBuf,

    /// Installer path inside the installation root
    #[arg(long, default_value = DEFAULT_ENTRY_POINT)]
    pub entry_point: PathBuf,

    /// Stop after the new installation is in place
    #[arg(long)]
    pub skip_installer: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Arguments passed through to the installer
    #[arg(last = true)]
    pub installer_args: Vec<OsString>,
}

/// Where the license key for this run comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyInput {
    /// Given up front (flag or environment).
    Provided(String),
    /// Ask the operator on the terminal.
    Interactive,
    /// No operator available; the cached key or nothing.
    NonInteractive,
}

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Config {
    pub broker: BrokerConfig,
    pub cache_path: PathBuf,
    pub payload_path: PathBuf,
    pub install_root: PathBuf,
    pub entry_point: PathBuf,
    pub run_installer: bool,
    pub installer_args: Vec<OsString>,
    pub key_input: KeyInput,
}

impl Config {
    /// Resolves parsed arguments into a run configuration.
    pub fn from_args(args: Args) -> Result<Self, BootstrapError> {
        let payload_path = match args.payload {
            Some(path) => path,
            None => default_payload_path()?,
        };

        let key_input = match (args.license_key, args.non_interactive) {
            (Some(key), _) => KeyInput::Provided(key),
            (None, true) => KeyInput::NonInteractive,
            (None, false) => KeyInput::Interactive,
        };

        if args.timeout_secs == 0 {
            return Err(BootstrapError::Config(
                "timeout must be at least one second".to_string(),
            ));
        }

        Ok(Self {
            broker: BrokerConfig {
                endpoint: args.api_url,
                timeout: Duration::from_secs(args.timeout_secs),
            },
            cache_path: args.cache_path,
            payload_path,
            install_root: args.install_root,
            entry_point: args.entry_point,
            run_installer: !args.skip_installer,
            installer_args: args.installer_args,
            key_input,
        })
    }
}

/// `payload.bin` in the directory holding the running executable.
fn default_payload_path() -> Result<PathBuf, BootstrapError> {
    let exe = std::env::current_exe()
        .map_err(|e| BootstrapError::Config(format!("cannot locate executable: {e}")))?;
    Ok(exe.with_file_name(PAYLOAD_FILE_NAME))
}
