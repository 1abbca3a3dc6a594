//! Unlock Flow (§4.5): combines passphrase + titan key + salt into a master
//! key and a separately-hashed verification tag, then compares that tag
//! against a stored one in constant time — without ever persisting or
//! logging the passphrase.
//!
//! There is no single original-source file this corresponds to — in
//! `CVault` this sequencing lives inline in the repository/service callers
//! that wire `titan_key_service` and `crypto_core` together. This module
//! makes that sequencing an explicit, independently testable unit, per
//! §4.5's numbered algorithm.

use std::path::Path;

use zeroize::Zeroizing;

use crate::error::UnlockError;
use crate::kdf;
use crate::primitives::constant_time_eq;
use crate::titan;

/// Result of a successful unlock: the master key, ready to be handed to
/// the session. Wrapped in `Zeroizing` so it is scrubbed the moment the
/// caller drops it.
pub type MasterKey = Zeroizing<[u8; 32]>;

/// Runs the unlock algorithm from §4.5 step by step:
///
/// 1. Load the titan key (abort on any failure).
/// 2. Derive 64 bytes of material from (passphrase, titan key, salt);
///    zeroize the titan key immediately after.
/// 3. Split into `master_key` and `raw_verify`.
/// 4. Hash `raw_verify` with `salt` into a candidate tag.
/// 5. Zeroize `raw_verify`.
/// 6. Constant-time compare the candidate tag against `stored_verification_tag`.
/// 7. Zeroize the candidate tag.
/// 8. On match, return the master key; otherwise zeroize everything and
///    report [`UnlockError::InvalidPassphrase`].
///
/// This sequence is not reorderable: every intermediate buffer is
/// zeroized before the function returns on every exit path (§5 ordering
/// constraint).
pub fn unlock(
  titan_path: &Path,
  passphrase: &[u8],
  salt: &[u8; 32],
  stored_verification_tag: &[u8; 32],
) -> Result<MasterKey, UnlockError> {
  let titan_key = titan::load(titan_path)?;

  let mut material = Zeroizing::new(kdf::derive_material(passphrase, &titan_key, salt)?);
  drop(titan_key);

  let mut master_key = Zeroizing::new([0u8; 32]);
  master_key.copy_from_slice(&material[0..32]);

  let mut raw_verify = Zeroizing::new([0u8; 32]);
  raw_verify.copy_from_slice(&material[32..64]);
  material.fill(0);

  let candidate_tag = Zeroizing::new(kdf::hash_key(raw_verify.as_ref(), salt)?);
  raw_verify.fill(0);

  let ok = constant_time_eq(candidate_tag.as_ref(), stored_verification_tag);

  if ok {
    Ok(master_key)
  } else {
    master_key.fill(0);
    Err(UnlockError::InvalidPassphrase)
  }
}

/// First-run setup (§2 "First-run setup" data flow), factored out of
/// §4.5 since it shares the split/hash steps with `unlock` but skips the
/// comparison: derive material from a fresh passphrase, split it, and hash
/// the raw verification key into the tag that will be persisted.
///
/// Returns `(master_key, verification_tag)`. The caller is responsible for
/// persisting `verification_tag` (and the salt it was already given) to
/// the config collaborator.
pub fn derive_for_setup(
  passphrase: &[u8],
  titan_key: &[u8; 32],
  salt: &[u8; 32],
) -> Result<(MasterKey, [u8; 32]), UnlockError> {
  let mut material = Zeroizing::new(kdf::derive_material(passphrase, titan_key, salt)?);

  let mut master_key = Zeroizing::new([0u8; 32]);
  master_key.copy_from_slice(&material[0..32]);

  let mut raw_verify = Zeroizing::new([0u8; 32]);
  raw_verify.copy_from_slice(&material[32..64]);
  material.fill(0);

  let verification_tag = kdf::hash_key(raw_verify.as_ref(), salt)?;
  raw_verify.fill(0);

  Ok((master_key, verification_tag))
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::tempdir;

  #[test]
  fn setup_then_unlock_succeeds_with_correct_passphrase() {
    let dir = tempdir().unwrap();
    let titan_path = dir.path().join("titan.key");
    titan::init(&titan_path).expect("init titan");
    let titan_key = titan::load(&titan_path).expect("load titan");

    let salt = [0x01u8; 32];
    let passphrase = b"correct horse battery staple";

    let (setup_master_key, tag) =
      derive_for_setup(passphrase, &titan_key, &salt).expect("setup");

    let unlocked = unlock(&titan_path, passphrase, &salt, &tag).expect("unlock");
    assert_eq!(*unlocked, *setup_master_key);
  }

  #[test]
  fn wrong_passphrase_is_rejected() {
    let dir = tempdir().unwrap();
    let titan_path = dir.path().join("titan.key");
    titan::init(&titan_path).expect("init titan");
    let titan_key = titan::load(&titan_path).expect("load titan");

    let salt = [0x01u8; 32];
    let (_master_key, tag) =
      derive_for_setup(b"correct horse battery staple", &titan_key, &salt).expect("setup");

    let err = unlock(&titan_path, b"tr0ub4dor&3", &salt, &tag).unwrap_err();
    assert!(matches!(err, UnlockError::InvalidPassphrase));
  }

  #[test]
  fn tampered_titan_blob_aborts_unlock() {
    let dir = tempdir().unwrap();
    let titan_path = dir.path().join("titan.key");
    titan::init(&titan_path).expect("init titan");
    let titan_key = titan::load(&titan_path).expect("load titan");

    let salt = [0x01u8; 32];
    let (_master_key, tag) =
      derive_for_setup(b"correct horse battery staple", &titan_key, &salt).expect("setup");

    // Flip a byte inside the MAC region of the titan blob on disk.
    use std::os::unix::fs::PermissionsExt;
    let mut bytes = std::fs::read(&titan_path).unwrap();
    bytes[40] ^= 0x01;
    std::fs::write(&titan_path, &bytes).unwrap();
    std::fs::set_permissions(&titan_path, std::fs::Permissions::from_mode(0o600)).unwrap();

    let err = unlock(&titan_path, b"correct horse battery staple", &salt, &tag).unwrap_err();
    assert!(matches!(err, UnlockError::Titan(crate::error::TitanError::Tampered)));
  }
}
