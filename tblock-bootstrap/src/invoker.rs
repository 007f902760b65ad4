//! Hand-off to the installer shipped inside the payload.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("cannot launch installer {}: {source}", .path.display())]
    Launch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("installer {}", describe_exit(.code))]
    Failed { code: Option<i32> },
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("exited with status {c}"),
        None => "was terminated by a signal".to_string(),
    }
}

/// Runs `<root>/<entry_point>` with `root` as working directory and waits.
///
/// Standard streams are inherited so the installer can talk to the operator.
pub fn invoke(root: &Path, entry_point: &Path, args: &[OsString]) -> Result<(), InvokeError> {
    let program = root.join(entry_point);
    info!("Running installer {}", program.display());

    let status = Command::new(&program)
        .args(args)
        .current_dir(root)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|source| InvokeError::Launch {
            path: program.clone(),
            source,
        })?;

    if status.success() {
        info!("Installer finished");
        Ok(())
    } else {
        Err(InvokeError::Failed {
            code: status.code(),
        })
    }
}
