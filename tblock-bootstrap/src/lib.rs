//! TBlock Guard bootstrap.
//!
//! Resolves a license key, trades it for the payload key, decrypts the
//! bundled archive, swaps the result into the installation root and hands
//! over to the installer it contains. Every failure ends the run with a
//! distinct exit code (see [`exit_code`]).

pub mod config;
pub mod error;
pub mod invoker;
pub mod logging;
pub mod orchestrator;
pub mod prompt;

pub use config::{Args, Config, KeyInput};
pub use error::{exit_code, BootstrapError};
pub use invoker::{invoke, InvokeError};
pub use orchestrator::{listen_for_interrupt, InterruptListener, Orchestrator, Phase};
