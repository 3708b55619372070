//! Encryption collaborator for sensitive consent fields.
//!
//! Encryption-at-rest is owned by the surrounding system; this core
//! sees an opaque encrypt/decrypt pair used only for fields flagged
//! sensitive (the consent signature). The cipher is optional at
//! construction — when absent or failing, the sensitive field is
//! dropped from persistence with a warning, and the consent write goes
//! through regardless. A cipher fault must never block an access
//! decision.

use thiserror::Error;
use vigil_types::ErrorCode;

/// Cipher collaborator error.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The cipher backend rejected or failed the operation.
    #[error("cipher operation failed: {0}")]
    Failed(String),
}

impl ErrorCode for CipherError {
    fn code(&self) -> &'static str {
        match self {
            Self::Failed(_) => "CIPHER_FAILED",
        }
    }

    fn is_recoverable(&self) -> bool {
        true
    }
}

/// Opaque field-level encryption.
pub trait RecordCipher: Send + Sync {
    /// Encrypts a plaintext field value.
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError>;

    /// Decrypts a previously encrypted field value.
    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError>;
}
