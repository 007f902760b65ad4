//! The bootstrap state machine.
//!
//! `Idle → KeyResolved → Authorized → Decrypted → Staged → Promoted →
//! Invoked → Done`. Any error ends the run; the error kind decides the exit
//! code. The abort signal is checked at every boundary.

use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;

use tblock_crypto::{decrypt_archive, read_archive};
use tblock_license::{resolve_license_key, KeyCache, LicenseBroker};
use tblock_stage::{AbortSignal, Stager};
use tracing::{debug, info, warn};

use crate::config::KeyInput;
use crate::error::BootstrapError;
use crate::invoker::invoke;
use crate::prompt;

/// Progress of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Idle,
    KeyResolved,
    Authorized,
    Decrypted,
    Staged,
    Promoted,
    Invoked,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::KeyResolved => "key resolved",
            Self::Authorized => "authorized",
            Self::Decrypted => "decrypted",
            Self::Staged => "staged",
            Self::Promoted => "promoted",
            Self::Invoked => "invoked",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

type Observer = Box<dyn FnMut(Phase) + Send>;

/// Sequences one bootstrap run.
pub struct Orchestrator<C> {
    cache: C,
    broker: LicenseBroker,
    stager: Stager,
    payload_path: PathBuf,
    run_installer: bool,
    installer_args: Vec<OsString>,
    abort: AbortSignal,
    observer: Option<Observer>,
    listen_for_interrupts: bool,
    phase: Phase,
}

impl<C: KeyCache> Orchestrator<C> {
    /// Creates an orchestrator that installs the payload at `payload_path`.
    pub fn new(cache: C, broker: LicenseBroker, stager: Stager, payload_path: PathBuf) -> Self {
        Self {
            cache,
            broker,
            stager,
            payload_path,
            run_installer: true,
            installer_args: Vec::new(),
            abort: AbortSignal::new(),
            observer: None,
            listen_for_interrupts: false,
            phase: Phase::Idle,
        }
    }

    /// Whether to run the installer after promotion.
    pub fn run_installer(mut self, enabled: bool) -> Self {
        self.run_installer = enabled;
        self
    }

    /// Extra arguments for the installer.
    pub fn installer_args(mut self, args: Vec<OsString>) -> Self {
        self.installer_args = args;
        self
    }

    /// Shares an abort signal, typically one a signal listener triggers.
    pub fn abort_signal(mut self, abort: AbortSignal) -> Self {
        self.abort = abort;
        self
    }

    /// Trigger the abort signal on SIGINT, SIGTERM or SIGHUP once the key
    /// is resolved.
    ///
    /// Before that point the signals keep their default behavior so a
    /// pending prompt can be left at once.
    pub fn listen_for_interrupts(mut self, enabled: bool) -> Self {
        self.listen_for_interrupts = enabled;
        self
    }

    /// Called with each phase the run enters.
    pub fn on_transition(mut self, observer: impl FnMut(Phase) + Send + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// Returns the key cache.
    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Returns the last phase entered.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    fn enter(&mut self, phase: Phase) {
        debug!("Phase {} -> {}", self.phase, phase);
        self.phase = phase;
        if let Some(observer) = self.observer.as_mut() {
            observer(phase);
        }
    }

    fn checkpoint(&self) -> Result<(), BootstrapError> {
        self.abort.check().map_err(BootstrapError::from)
    }

    /// Runs the whole pipeline.
    pub async fn run(&mut self, input: KeyInput) -> Result<Phase, BootstrapError> {
        self.checkpoint()?;

        // Idle -> KeyResolved
        let cached = self.cache.load();
        let typed = match input {
            KeyInput::Provided(key) => key,
            KeyInput::Interactive => {
                prompt::read_key(cached.as_ref()).map_err(BootstrapError::Prompt)?
            }
            KeyInput::NonInteractive => String::new(),
        };
        let license_key =
            resolve_license_key(cached.as_ref(), &typed).ok_or(BootstrapError::NoLicenseKey)?;
        self.enter(Phase::KeyResolved);
        let _listener = if self.listen_for_interrupts {
            match listen_for_interrupt(self.abort.clone()) {
                Ok(listener) => Some(listener),
                Err(e) => {
                    warn!("Could not install signal handlers: {}", e);
                    None
                }
            }
        } else {
            None
        };
        self.checkpoint()?;

        // KeyResolved -> Authorized
        let payload_key = self.broker.exchange(&license_key).await?;
        info!("License accepted");
        self.enter(Phase::Authorized);
        self.checkpoint()?;

        // Authorized -> Decrypted
        let blob = read_archive(&self.payload_path)?;
        let plaintext = decrypt_archive(&blob, &payload_key)?;
        drop(payload_key);
        info!("Payload decrypted ({} bytes)", plaintext.len());
        self.enter(Phase::Decrypted);

        // Best effort. The only error a run swallows.
        if let Err(e) = self.cache.save(&license_key) {
            warn!("Could not cache license key: {}", e);
        }
        self.checkpoint()?;

        // Decrypted -> Staged
        let stager = self.stager.clone();
        let abort = self.abort.clone();
        let staged = tokio::task::spawn_blocking(move || stager.stage(&plaintext, &abort))
            .await
            .map_err(|e| BootstrapError::InstallFailed(format!("staging task failed: {e}")))??;
        self.enter(Phase::Staged);
        self.checkpoint()?;

        // Staged -> Promoted
        let stager = self.stager.clone();
        let abort = self.abort.clone();
        let root = tokio::task::spawn_blocking(move || stager.promote(staged, &abort))
            .await
            .map_err(|e| BootstrapError::InstallFailed(format!("promotion task failed: {e}")))??;
        self.enter(Phase::Promoted);

        if !self.run_installer {
            info!("Installer skipped; {} is ready", root.display());
            self.enter(Phase::Done);
            return Ok(self.phase);
        }
        self.checkpoint()?;

        // Promoted -> Invoked -> Done
        let entry_point = self.stager.entry_point().to_path_buf();
        let args = self.installer_args.clone();
        tokio::task::spawn_blocking(move || invoke(&root, &entry_point, &args))
            .await
            .map_err(|e| BootstrapError::InstallFailed(format!("installer task failed: {e}")))??;
        self.enter(Phase::Invoked);
        self.enter(Phase::Done);

        Ok(self.phase)
    }
}

/// Triggers `abort` on SIGINT, SIGTERM or SIGHUP. Lives until the returned
/// guard is dropped.
///
/// The handlers are registered before this returns; from then on those
/// signals no longer terminate the process.
#[cfg(unix)]
pub fn listen_for_interrupt(abort: AbortSignal) -> std::io::Result<InterruptListener> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut hangup = signal(SignalKind::hangup())?;

    let handle = tokio::spawn(async move {
        let name = tokio::select! {
            _ = interrupt.recv() => "SIGINT",
            _ = terminate.recv() => "SIGTERM",
            _ = hangup.recv() => "SIGHUP",
        };
        warn!("{} received, stopping at the next safe point", name);
        abort.trigger();
    });
    Ok(InterruptListener { handle })
}

/// Triggers `abort` on Ctrl-C. Lives until the returned guard is dropped.
#[cfg(not(unix))]
pub fn listen_for_interrupt(abort: AbortSignal) -> std::io::Result<InterruptListener> {
    let handle = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping at the next safe point");
            abort.trigger();
        }
    });
    Ok(InterruptListener { handle })
}

/// Guard for the signal listener task.
pub struct InterruptListener {
    handle: tokio::task::JoinHandle<()>,
}

impl Drop for InterruptListener {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
