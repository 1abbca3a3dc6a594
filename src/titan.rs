//! Titan Key Manager (§4.4): initialization, validation, loading, and
//! wiping of the machine-resident secret.
//!
//! Grounded directly on `original_source/src/service/titan_key_service.c`
//! and its header — this module is the closest thing in this crate to a
//! line-by-line port, restructured around returned `Result`s instead of the
//! original's global `tk_status` (§9's explicit design note).
//!
//! State machine (§4.4):
//!
//! ```text
//!    ABSENT ──init──▶ PRESENT_VALID ──wipe──▶ ABSENT
//!                        │  ▲
//!                        │  └──(load verifies)
//!                        └──tamper detected──▶ PRESENT_INVALID
//! ```

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::Path;

use zeroize::Zeroizing;

use crate::error::TitanError;
use crate::kdf;
use crate::primitives::{constant_time_eq, random_bytes};

/// Version byte for the only blob format this crate supports.
pub const VERSION: u8 = 0x01;
/// Length of the titan key material itself.
pub const KEY_LEN: usize = 32;
/// Length of the embedded MAC.
pub const MAC_LEN: usize = 32;
/// Total on-disk blob size: `version(1) ‖ key(32) ‖ mac(32)`.
pub const BLOB_LEN: usize = 1 + KEY_LEN + MAC_LEN;

/// Required file mode: owner read/write only.
const REQUIRED_MODE: u32 = 0o600;

/// Fixed 32-byte salt used to MAC the titan key (§9 "Fixed-salt titan
/// MAC" design note). Kept fixed for v1 per the recorded Open Question
/// decision in DESIGN.md; changing it would require a new version byte.
const FIXED_MAC_SALT: [u8; 32] = {
  let mut salt = [0u8; 32];
  salt[0] = 0x06;
  salt
};

/// Generates a fresh titan key and persists it as a versioned,
/// MAC-protected blob at `path` with mode 0600.
///
/// Refuses with [`TitanError::AlreadyExists`] if a current, *valid* titan
/// blob is already present — matching the original's
/// `is_exists_titan_key() && is_valid_titan_key()` guard. A blob that
/// exists but fails validation (tampered) does not block re-initialization.
pub fn init(path: &Path) -> Result<(), TitanError> {
  if validate(path).is_ok() {
    return Err(TitanError::AlreadyExists);
  }

  let mut titan_key = Zeroizing::new([0u8; KEY_LEN]);
  random_bytes(titan_key.as_mut());

  let mac = kdf::hash_key(titan_key.as_ref(), &FIXED_MAC_SALT)?;

  let mut blob = Zeroizing::new(Vec::with_capacity(BLOB_LEN));
  blob.push(VERSION);
  blob.extend_from_slice(titan_key.as_ref());
  blob.extend_from_slice(&mac);

  write_blob_atomically(path, &blob)
}

/// Cheap structural check with no cryptographic verification (§4.4
/// `Validate`): the file must exist, be a regular file, be exactly
/// [`BLOB_LEN`] bytes, and have mode exactly 0600.
pub fn validate(path: &Path) -> Result<(), TitanError> {
  let metadata = match fs::symlink_metadata(path) {
    Ok(m) => m,
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(TitanError::NoKeyFile),
    Err(e) => return Err(TitanError::SyscallErr(e)),
  };

  if !metadata.file_type().is_file() {
    return Err(TitanError::Tampered);
  }
  if metadata.len() != BLOB_LEN as u64 {
    return Err(TitanError::Tampered);
  }
  if metadata.permissions().mode() & 0o777 != REQUIRED_MODE {
    return Err(TitanError::Tampered);
  }

  Ok(())
}

/// Full integrity check (§4.4 `Load`): validates structure, reads the
/// blob, dispatches on the version byte, recomputes the MAC, and compares
/// it in constant time against the stored MAC.
///
/// Every local buffer is zeroized before returning on every exit path.
pub fn load(path: &Path) -> Result<Zeroizing<[u8; KEY_LEN]>, TitanError> {
  validate(path)?;

  let mut bytes = Zeroizing::new(fs::read(path).map_err(TitanError::SyscallErr)?);
  if bytes.len() != BLOB_LEN {
    return Err(TitanError::MemIoErr);
  }

  let version = bytes[0];
  if version != VERSION {
    return Err(TitanError::UnsupportedVersion(version));
  }

  let mut titan_key = Zeroizing::new([0u8; KEY_LEN]);
  titan_key.copy_from_slice(&bytes[1..1 + KEY_LEN]);
  let mac_read = &bytes[1 + KEY_LEN..BLOB_LEN];

  let mac_computed = kdf::hash_key(titan_key.as_ref(), &FIXED_MAC_SALT)?;

  if !constant_time_eq(mac_read, &mac_computed) {
    bytes.as_mut().fill(0);
    return Err(TitanError::Tampered);
  }

  bytes.as_mut().fill(0);
  Ok(titan_key)
}

/// Removes the titan blob from disk. No secure-overwrite is promised — the
/// contract is "the path no longer names this blob" (§4.4), matching the
/// original's plain `unlink()`.
pub fn wipe(path: &Path) -> Result<(), TitanError> {
  match fs::symlink_metadata(path) {
    Ok(_) => {}
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(TitanError::NoKeyFile),
    Err(e) => return Err(TitanError::SyscallErr(e)),
  }
  fs::remove_file(path).map_err(TitanError::SyscallErr)
}

/// Writes `blob` to `path` atomically: create a sibling temp file with
/// mode 0600, write and flush it, then rename over the destination.
/// Renaming within the same directory is atomic on POSIX filesystems.
fn write_blob_atomically(path: &Path, blob: &[u8]) -> Result<(), TitanError> {
  let file_name = path
    .file_name()
    .ok_or_else(|| TitanError::ServiceErr("titan path has no file name".to_string()))?;
  let mut tmp_name = file_name.to_os_string();
  tmp_name.push(".tmp");
  let tmp_path = path.with_file_name(tmp_name);

  if let Some(parent) = path.parent() {
    if !parent.as_os_str().is_empty() {
      fs::create_dir_all(parent).map_err(TitanError::SyscallErr)?;
    }
  }

  let mut file = OpenOptions::new()
    .write(true)
    .create(true)
    .truncate(true)
    .mode(REQUIRED_MODE)
    .open(&tmp_path)
    .map_err(TitanError::SyscallErr)?;

  file.write_all(blob).map_err(TitanError::SyscallErr)?;
  file.sync_all().map_err(TitanError::SyscallErr)?;
  drop(file);

  // Belt-and-suspenders: some platforms' create() respects umask over the
  // requested mode, so re-assert it explicitly before publishing the file.
  fs::set_permissions(&tmp_path, fs::Permissions::from_mode(REQUIRED_MODE))
    .map_err(TitanError::SyscallErr)?;

  fs::rename(&tmp_path, path).map_err(TitanError::SyscallErr)?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::os::unix::fs::symlink;
  use tempfile::tempdir;

  #[test]
  fn init_then_load_round_trips_the_key() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("titan.key");

    init(&path).expect("init");
    let loaded = load(&path).expect("load");
    assert_eq!(loaded.len(), KEY_LEN);

    let metadata = fs::metadata(&path).unwrap();
    assert_eq!(metadata.len(), BLOB_LEN as u64);
    assert_eq!(metadata.permissions().mode() & 0o777, REQUIRED_MODE);
  }

  #[test]
  fn init_refuses_when_valid_blob_exists() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("titan.key");

    init(&path).expect("first init");
    let err = init(&path).unwrap_err();
    assert!(matches!(err, TitanError::AlreadyExists));
  }

  #[test]
  fn load_missing_file_is_no_key_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("titan.key");
    let err = load(&path).unwrap_err();
    assert!(matches!(err, TitanError::NoKeyFile));
  }

  #[test]
  fn any_single_bit_flip_makes_load_report_tampered() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("titan.key");
    init(&path).expect("init");

    let original = fs::read(&path).unwrap();
    for i in 0..original.len() {
      let mut tampered = original.clone();
      tampered[i] ^= 0x01;
      fs::write(&path, &tampered).unwrap();
      fs::set_permissions(&path, fs::Permissions::from_mode(REQUIRED_MODE)).unwrap();

      let err = load(&path).unwrap_err();
      assert!(
        matches!(err, TitanError::Tampered | TitanError::UnsupportedVersion(_)),
        "byte {i} flip produced unexpected error: {err:?}"
      );
    }
  }

  #[test]
  fn validate_rejects_wrong_size() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("titan.key");
    fs::write(&path, vec![0u8; BLOB_LEN - 1]).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(REQUIRED_MODE)).unwrap();
    assert!(matches!(validate(&path), Err(TitanError::Tampered)));

    fs::write(&path, vec![0u8; BLOB_LEN + 1]).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(REQUIRED_MODE)).unwrap();
    assert!(matches!(validate(&path), Err(TitanError::Tampered)));
  }

  #[test]
  fn validate_rejects_wrong_mode() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("titan.key");
    fs::write(&path, vec![0u8; BLOB_LEN]).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
    assert!(matches!(validate(&path), Err(TitanError::Tampered)));
  }

  #[test]
  fn validate_rejects_directory() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("titan.key");
    fs::create_dir(&path).unwrap();
    assert!(matches!(validate(&path), Err(TitanError::Tampered)));
  }

  #[test]
  fn validate_rejects_symlink() {
    let dir = tempdir().unwrap();
    let real = dir.path().join("real.key");
    let link = dir.path().join("titan.key");
    fs::write(&real, vec![0u8; BLOB_LEN]).unwrap();
    fs::set_permissions(&real, fs::Permissions::from_mode(REQUIRED_MODE)).unwrap();
    symlink(&real, &link).unwrap();
    assert!(matches!(validate(&link), Err(TitanError::Tampered)));
  }

  #[test]
  fn wipe_removes_file_and_fails_if_absent() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("titan.key");
    init(&path).expect("init");
    wipe(&path).expect("wipe");
    assert!(!path.exists());
    assert!(matches!(wipe(&path), Err(TitanError::NoKeyFile)));
  }
}
