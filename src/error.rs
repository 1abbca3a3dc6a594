//! Error taxonomy for every component of the vault core.
//!
//! Every fallible operation returns a closed, `thiserror`-derived enum —
//! never a process-global status indicator and never a bare `String`. See
//! §7 of the spec for the taxonomy this mirrors.

use thiserror::Error;

/// Errors from the KDF & Hasher component (§4.2).
#[derive(Debug, Error)]
pub enum KdfError {
  #[error("argon2 parameters invalid: {0}")]
  InvalidParams(String),
  #[error("argon2 derivation failed: {0}")]
  DerivationFailed(String),
}

/// Errors from the AEAD envelope component (§4.3).
#[derive(Debug, Error)]
pub enum AeadError {
  #[error("blob too short: got {got} bytes, need at least {min} (nonce + tag)")]
  InvalidSize { got: usize, min: usize },
  #[error("AEAD seal failed")]
  SealFailed,
  #[error("AEAD open failed: tag mismatch or corrupted ciphertext")]
  OpenFailed,
}

/// Errors from the Titan Key Manager (§4.4).
///
/// Variant names are kept close to the original `stk_return_code` taxonomy
/// per the design note in §9 that asks for a structured result rather than
/// a global status, while staying recognizable against the component table.
#[derive(Debug, Error)]
pub enum TitanError {
  #[error("titan key hash/KDF operation failed")]
  UtilErr(#[from] KdfError),
  #[error("short read or write on titan blob")]
  MemIoErr,
  #[error("system call failed: {0}")]
  SyscallErr(#[from] std::io::Error),
  #[error("unsupported titan blob version byte: {0:#x}")]
  UnsupportedVersion(u8),
  #[error("path resolution failed: {0}")]
  ServiceErr(String),
  #[error("titan blob failed integrity validation (tampered)")]
  Tampered,
  #[error("no titan key file present")]
  NoKeyFile,
  #[error("a valid titan key already exists")]
  AlreadyExists,
}

/// Errors from the Unlock Flow (§4.5).
#[derive(Debug, Error)]
pub enum UnlockError {
  #[error("failed to load the titan key: {0}")]
  Titan(#[from] TitanError),
  #[error("key derivation failed: {0}")]
  Kdf(#[from] KdfError),
  /// Verification tag mismatch. Deliberately carries no further detail —
  /// §7 requires this not to leak structural information.
  #[error("invalid passphrase")]
  InvalidPassphrase,
}

/// Errors from the Record Envelope Layer (§4.6).
#[derive(Debug, Error)]
pub enum RecordError {
  #[error("failed to seal field: {0}")]
  Seal(#[from] AeadError),
  #[error("failed to open field (wrong key or corrupted record)")]
  Open,
}

/// Errors from the config collaborator's contract (§4.7).
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("config key not found: {0}")]
  NotFound(String),
  #[error("config value has unexpected length: got {got}, want {want}")]
  InvalidLength { got: usize, want: usize },
  #[error("verified write failed: value read back did not match what was written")]
  VerificationFailed,
}

/// Errors from the orchestration facade (`service::VaultService`).
#[derive(Debug, Error)]
pub enum VaultError {
  #[error(transparent)]
  Titan(#[from] TitanError),
  #[error(transparent)]
  Unlock(#[from] UnlockError),
  #[error(transparent)]
  Record(#[from] RecordError),
  #[error(transparent)]
  Config(#[from] ConfigError),
  #[error("vault is locked")]
  Locked,
  #[error("a vault already exists at this path")]
  AlreadyInitialized,
  #[error("too many failed attempts; retry in {0} seconds")]
  RateLimited(u64),
  #[error("entry not found: {0}")]
  NotFound(String),
}
