//! cvault-core: the at-rest crypto core of a local credential vault.
//!
//! - [`primitives`] - CSPRNG bytes, constant-time compare, scoped zeroize
//! - [`kdf`] - Argon2id key derivation and hashing
//! - [`aead`] - AES-256-GCM envelope seal/open
//! - [`titan`] - the machine-resident titan key's lifecycle
//! - [`unlock`] - passphrase + titan key + salt → master key
//! - [`record`] - cleartext/opaque credential record mapping
//! - [`config`] - the config collaborator's contract and a reference store
//! - [`charset`] - password-generation charset policies
//! - [`error`] - the per-component error taxonomy
//! - [`service`] - the orchestration facade tying the above together
//!
//! # Architecture
//!
//! ```text
//! service::VaultService ─── first-run setup, unlock, record CRUD
//!     │
//!     ├── titan ────── machine-resident key lifecycle
//!     ├── unlock ────── passphrase + titan key + salt → master key
//!     │     ├── kdf ──── Argon2id derivation/hashing
//!     │     └── titan
//!     ├── record ────── cleartext ⇄ opaque mapping
//!     │     └── aead ─── AES-256-GCM seal/open
//!     └── config ────── salt / verification tag / KDF params
//!
//! Disk ────────── titan key blob (0600) + config collaborator
//! ```
//!
//! # Security properties
//!
//! - **Argon2id** key derivation, salted, with the titan key mixed in as
//!   associated secret data
//! - **AES-256-GCM** authenticated encryption for every sealed field
//! - **Zeroize** for every secret-carrying buffer on every exit path
//! - **Constant-time** comparison for verification tags and MACs
//! - Rate limiting on failed unlock attempts ([`service::FailedAttemptTracker`])

pub mod aead;
pub mod charset;
pub mod config;
pub mod error;
pub mod kdf;
pub mod primitives;
pub mod record;
pub mod service;
pub mod titan;
pub mod unlock;
