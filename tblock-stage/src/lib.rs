//! Installation staging for the TBlock Guard bootstrap.
//!
//! A decrypted payload is a zip archive. Staging turns it into a directory
//! tree next to the installation root:
//! - `extract/`: raw archive contents (files, directories, Unix symlinks)
//! - `payload/`: the normalized tree, wrapper directories flattened
//! - `previous/`: the old root, parked here during promotion
//!
//! Promotion is a rename swap, so the installation root holds either the
//! complete old tree or the complete new tree. Concurrent runs against the
//! same root are not coordinated and may race.

mod abort;
mod error;
mod extract;
mod stager;

pub use abort::AbortSignal;
pub use error::{StageError, StageResult};
pub use stager::{StagedPayload, Stager, DEFAULT_ENTRY_POINT, DEFAULT_INSTALL_ROOT};
