//! Payload decryption for the TBlock Guard bootstrap.
//!
//! The bundled archive is sealed with AES-256-GCM under a key that
//! only the authorization service hands out. Decryption is the single
//! place where a wrong or revoked key is detected, and it doubles as a
//! tamper check on the artifact.

mod cipher;
mod error;
mod key;

pub use cipher::{
    decrypt, decrypt_archive, read_archive, seal, EncryptedArchive, NONCE_SIZE, TAG_SIZE,
};
pub use error::{CryptoError, CryptoResult};
pub use key::{PayloadKey, KEY_SIZE};
