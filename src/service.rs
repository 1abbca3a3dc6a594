//! Orchestration facade (SPEC_FULL component 8): wires the crypto core,
//! a [`ConfigStore`], and a failed-attempt rate limiter together into the
//! two data flows from §2 ("First-run setup" and "Unlock").
//!
//! This is ambient glue, not part of the crypto-core budget — grounded on
//! the teacher's `commands.rs` (session/entries lock ordering,
//! `create_vault`/`unlock_vault` shape) and `models::FailedAttemptTracker`.
//! Unlike the crypto-core modules, this layer is allowed to log: it uses
//! `tracing` for non-secret lifecycle events, never for passphrases, keys,
//! or plaintext record fields.

use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::{keys, ConfigStore};
use crate::error::VaultError;
use crate::primitives::random_bytes;
use crate::record::{open_record, seal_record, OpaqueRecord, Record};
use crate::titan;
use crate::unlock::{self, MasterKey};

/// Maximum failed unlock attempts before lockout, ported from the
/// teacher's `models::MAX_FAILED_ATTEMPTS`.
pub const MAX_FAILED_ATTEMPTS: u32 = 5;
/// Lockout duration after exceeding [`MAX_FAILED_ATTEMPTS`], ported from
/// the teacher's `models::LOCKOUT_DURATION_SECS`.
pub const LOCKOUT_DURATION_SECS: u64 = 30;

/// Current config schema version this crate writes at first-run setup.
pub const SCHEMA_VERSION: u32 = 1;

/// Tracks failed unlock attempts for rate limiting, ported near-verbatim
/// from the teacher's `models::FailedAttemptTracker`.
#[derive(Debug, Default)]
pub struct FailedAttemptTracker {
  count: u32,
  locked_until: Option<Instant>,
}

impl FailedAttemptTracker {
  /// Records a failed attempt. Returns the lockout duration if the
  /// threshold was just exceeded.
  pub fn record_failure(&mut self) -> Option<u64> {
    self.count += 1;
    if self.count >= MAX_FAILED_ATTEMPTS {
      self.locked_until = Some(Instant::now() + Duration::from_secs(LOCKOUT_DURATION_SECS));
      Some(LOCKOUT_DURATION_SECS)
    } else {
      None
    }
  }

  /// Returns the remaining lockout in seconds if currently locked out;
  /// resets the tracker once the lockout has expired.
  pub fn check_lockout(&mut self) -> Option<u64> {
    if let Some(until) = self.locked_until {
      let now = Instant::now();
      if now < until {
        return Some(until.duration_since(now).as_secs());
      }
      self.count = 0;
      self.locked_until = None;
    }
    None
  }

  pub fn reset(&mut self) {
    self.count = 0;
    self.locked_until = None;
  }
}

/// Ties the crypto core to a [`ConfigStore`] and a titan blob path,
/// presenting the two data flows from §2 as a small synchronous API.
///
/// Lock order, when both are held: `session` before `failed_attempts` —
/// matching the teacher's documented "session → entries" ordering.
pub struct VaultService<C: ConfigStore> {
  titan_path: PathBuf,
  vault_path: PathBuf,
  config: C,
  session: Mutex<Option<MasterKey>>,
  failed_attempts: Mutex<FailedAttemptTracker>,
}

impl<C: ConfigStore> VaultService<C> {
  pub fn new(titan_path: PathBuf, vault_path: PathBuf, config: C) -> Self {
    Self {
      titan_path,
      vault_path,
      config,
      session: Mutex::new(None),
      failed_attempts: Mutex::new(FailedAttemptTracker::default()),
    }
  }

  /// First-run setup (§2): generates and persists the titan key, a fresh
  /// salt, and the verification tag for `passphrase`, records the titan
  /// key path and vault path so a later process can find them, then
  /// unlocks the freshly created vault.
  pub fn create_vault(&self, passphrase: &[u8]) -> Result<(), VaultError> {
    if self.config.contains(keys::SALT) {
      return Err(VaultError::AlreadyInitialized);
    }

    titan::init(&self.titan_path)?;
    let titan_key = titan::load(&self.titan_path)?;

    let mut salt = [0u8; 32];
    random_bytes(&mut salt);

    let (master_key, verification_tag) =
      unlock::derive_for_setup(passphrase, &titan_key, &salt)?;

    self.config.put(keys::SALT, &salt).map_err(VaultError::from)?;
    self
      .config
      .put(keys::VERIFICATION_KEY, &verification_tag)
      .map_err(VaultError::from)?;
    self
      .config
      .put(keys::SCHEMA_VERSION, &SCHEMA_VERSION.to_le_bytes())
      .map_err(VaultError::from)?;
    self
      .config
      .put(keys::TITAN_KEY_PATH, self.titan_path.to_string_lossy().as_bytes())
      .map_err(VaultError::from)?;
    self
      .config
      .put(keys::VAULT_PATH, self.vault_path.to_string_lossy().as_bytes())
      .map_err(VaultError::from)?;

    *self.session.lock().expect("session mutex poisoned") = Some(master_key);
    tracing::info!("vault created and unlocked");
    Ok(())
  }

  /// Unlock (§2): loads the titan key, the salt, and the stored
  /// verification tag, then runs [`unlock::unlock`]. Enforces the
  /// failed-attempt rate limiter before attempting anything expensive.
  pub fn unlock_vault(&self, passphrase: &[u8]) -> Result<(), VaultError> {
    {
      let mut tracker = self.failed_attempts.lock().expect("rate limit mutex poisoned");
      if let Some(remaining) = tracker.check_lockout() {
        return Err(VaultError::RateLimited(remaining));
      }
    }

    let salt: [u8; 32] = self
      .config
      .get_fixed_or_err(keys::SALT)
      .map_err(VaultError::from)?;
    let verification_tag: [u8; 32] = self
      .config
      .get_fixed_or_err(keys::VERIFICATION_KEY)
      .map_err(VaultError::from)?;

    match unlock::unlock(&self.titan_path, passphrase, &salt, &verification_tag) {
      Ok(master_key) => {
        self.failed_attempts.lock().expect("rate limit mutex poisoned").reset();
        *self.session.lock().expect("session mutex poisoned") = Some(master_key);
        tracing::info!("vault unlocked");
        Ok(())
      }
      Err(err) => {
        let mut tracker = self.failed_attempts.lock().expect("rate limit mutex poisoned");
        if let Some(duration) = tracker.record_failure() {
          tracing::warn!(lockout_secs = duration, "too many failed unlock attempts");
        } else {
          tracing::warn!("unlock attempt failed");
        }
        Err(VaultError::from(err))
      }
    }
  }

  /// Immediately clears the in-memory session, matching the teacher's
  /// `AppState::lock_now`.
  pub fn lock(&self) {
    *self.session.lock().expect("session mutex poisoned") = None;
    tracing::info!("vault locked");
  }

  pub fn is_locked(&self) -> bool {
    self.session.lock().expect("session mutex poisoned").is_none()
  }

  /// Seals `record` under the current session's master key and returns
  /// the opaque form to be handed to the record store collaborator.
  pub fn seal(&self, record: &Record) -> Result<OpaqueRecord, VaultError> {
    let session = self.session.lock().expect("session mutex poisoned");
    let master_key = session.as_ref().ok_or(VaultError::Locked)?;
    Ok(seal_record(master_key, record)?)
  }

  /// Opens `opaque` under the current session's master key.
  pub fn open(&self, opaque: &OpaqueRecord) -> Result<Record, VaultError> {
    let session = self.session.lock().expect("session mutex poisoned");
    let master_key = session.as_ref().ok_or(VaultError::Locked)?;
    Ok(open_record(master_key, opaque)?)
  }
}

/// Small helper extension so `VaultService` can read fixed-length config
/// values through the trait object without depending on
/// `InMemoryConfigStore` specifically.
trait FixedConfigRead {
  fn get_fixed_or_err(&self, key: &str) -> Result<[u8; 32], crate::error::ConfigError>;
}

impl<C: ConfigStore + ?Sized> FixedConfigRead for C {
  fn get_fixed_or_err(&self, key: &str) -> Result<[u8; 32], crate::error::ConfigError> {
    let bytes = self.get(key)?;
    if bytes.len() != 32 {
      return Err(crate::error::ConfigError::InvalidLength {
        got: bytes.len(),
        want: 32,
      });
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::InMemoryConfigStore;
  use tempfile::tempdir;

  fn service(dir: &tempfile::TempDir) -> VaultService<InMemoryConfigStore> {
    let titan_path = dir.path().join("titan.key");
    let vault_path = dir.path().join("vault.db");
    VaultService::new(titan_path, vault_path, InMemoryConfigStore::new())
  }

  #[test]
  fn create_then_unlock_round_trip() {
    let dir = tempdir().unwrap();
    let svc = service(&dir);

    svc.create_vault(b"correct horse battery staple").unwrap();
    assert!(!svc.is_locked());

    svc.lock();
    assert!(svc.is_locked());

    svc.unlock_vault(b"correct horse battery staple").unwrap();
    assert!(!svc.is_locked());
  }

  #[test]
  fn create_vault_twice_is_rejected() {
    let dir = tempdir().unwrap();
    let svc = service(&dir);
    svc.create_vault(b"pw").unwrap();
    let err = svc.create_vault(b"pw").unwrap_err();
    assert!(matches!(err, VaultError::AlreadyInitialized));
  }

  #[test]
  fn wrong_passphrase_locks_out_after_max_attempts() {
    let dir = tempdir().unwrap();
    let svc = service(&dir);
    svc.create_vault(b"correct horse battery staple").unwrap();
    svc.lock();

    for _ in 0..MAX_FAILED_ATTEMPTS - 1 {
      assert!(svc.unlock_vault(b"wrong").is_err());
    }
    let err = svc.unlock_vault(b"wrong").unwrap_err();
    assert!(matches!(err, VaultError::Unlock(_)));

    let err2 = svc.unlock_vault(b"correct horse battery staple").unwrap_err();
    assert!(matches!(err2, VaultError::RateLimited(_)));
  }

  #[test]
  fn seal_and_open_require_unlocked_session() {
    let dir = tempdir().unwrap();
    let svc = service(&dir);
    let record = Record::new(b"svc".to_vec(), b"user".to_vec(), b"pw".to_vec(), vec![]);

    assert!(matches!(svc.seal(&record), Err(VaultError::Locked)));

    svc.create_vault(b"pw").unwrap();
    let opaque = svc.seal(&record).expect("seal");
    let recovered = svc.open(&opaque).expect("open");
    assert_eq!(recovered.service, record.service);

    svc.lock();
    assert!(matches!(svc.open(&opaque), Err(VaultError::Locked)));
  }
}
