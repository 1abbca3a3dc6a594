//! Config-Keyed Parameters (§4.7): the durable storage contract for salt,
//! verification tag, and KDF parameters, modeled as the "config
//! collaborator" the spec names throughout but treats as external.
//!
//! Grounded on `original_source/include/CVault/models/config_keys.h`
//! (`CFG_*` string constants) and `db_config_service.h` (the verified-write
//! protocol: every write is read back and compared in constant time).

use std::collections::HashMap;

use crate::error::ConfigError;
use crate::primitives::constant_time_eq;

/// Reserved config key string literals, bit-exact with §4.7's table and
/// `config_keys.h`'s `CFG_*` macros.
pub mod keys {
  pub const SALT: &str = "salt";
  pub const VERIFICATION_KEY: &str = "verification_key";
  pub const KDF_ITERATIONS: &str = "kdf_iterations";
  pub const KDF_MEMORY: &str = "kdf_memory";
  pub const KDF_PARALLELISM: &str = "kdf_parallelism";
  pub const SCHEMA_VERSION: &str = "schema_version";
  pub const TITAN_KEY_PATH: &str = "titan_key_path";
  pub const VAULT_PATH: &str = "vault_path";
}

/// Default KDF cost parameters (§4.7), used when the optional keys are
/// absent from the store.
pub const DEFAULT_KDF_ITERATIONS: u32 = 3;
pub const DEFAULT_KDF_MEMORY: u32 = 262_144;
pub const DEFAULT_KDF_PARALLELISM: u32 = 2;

/// The config collaborator's contract: a string-keyed, opaque-bytes map
/// with a verified-write protocol. Any relational or file-backed store
/// implementing this trait can stand in for [`InMemoryConfigStore`].
pub trait ConfigStore {
  fn get(&self, key: &str) -> Result<Vec<u8>, ConfigError>;
  fn put(&mut self, key: &str, value: &[u8]) -> Result<(), ConfigError>;
  fn delete(&mut self, key: &str) -> Result<(), ConfigError>;
  fn contains(&self, key: &str) -> bool;
}

/// Reference `ConfigStore` implementation backed by a `HashMap`. Exercises
/// the verified-write protocol described in §4.7: after every `put`, the
/// value is read back and compared in constant time; after every
/// `delete`, the key's absence is re-checked. A real collaborator backed
/// by a relational engine is expected to uphold the same contract.
#[derive(Debug, Default)]
pub struct InMemoryConfigStore {
  rows: HashMap<String, Vec<u8>>,
}

impl InMemoryConfigStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Convenience accessor matching §4.7's fixed-length keys.
  pub fn get_fixed<const N: usize>(&self, key: &str) -> Result<[u8; N], ConfigError> {
    let bytes = self.get(key)?;
    if bytes.len() != N {
      return Err(ConfigError::InvalidLength {
        got: bytes.len(),
        want: N,
      });
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
  }

  /// Reads an optional LE `u32` config value, falling back to `default`
  /// when the key is absent (§4.7: `kdf_iterations`/`kdf_memory`/
  /// `kdf_parallelism` are all optional).
  pub fn get_u32_or(&self, key: &str, default: u32) -> Result<u32, ConfigError> {
    if !self.contains(key) {
      return Ok(default);
    }
    let bytes = self.get(key)?;
    if bytes.len() != 4 {
      return Err(ConfigError::InvalidLength {
        got: bytes.len(),
        want: 4,
      });
    }
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
  }

  pub fn put_u32(&mut self, key: &str, value: u32) -> Result<(), ConfigError> {
    self.put(key, &value.to_le_bytes())
  }
}

impl ConfigStore for InMemoryConfigStore {
  fn get(&self, key: &str) -> Result<Vec<u8>, ConfigError> {
    self
      .rows
      .get(key)
      .cloned()
      .ok_or_else(|| ConfigError::NotFound(key.to_string()))
  }

  fn put(&mut self, key: &str, value: &[u8]) -> Result<(), ConfigError> {
    self.rows.insert(key.to_string(), value.to_vec());

    // Verified-write protocol (§4.7): read back and compare in constant time.
    let readback = self
      .rows
      .get(key)
      .ok_or(ConfigError::VerificationFailed)?;
    if readback.len() != value.len() || !constant_time_eq(readback, value) {
      return Err(ConfigError::VerificationFailed);
    }
    Ok(())
  }

  fn delete(&mut self, key: &str) -> Result<(), ConfigError> {
    self.rows.remove(key);
    if self.rows.contains_key(key) {
      return Err(ConfigError::VerificationFailed);
    }
    Ok(())
  }

  fn contains(&self, key: &str) -> bool {
    self.rows.contains_key(key)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn put_then_get_round_trips() {
    let mut store = InMemoryConfigStore::new();
    store.put(keys::SALT, &[0x01u8; 32]).unwrap();
    let salt: [u8; 32] = store.get_fixed(keys::SALT).unwrap();
    assert_eq!(salt, [0x01u8; 32]);
  }

  #[test]
  fn get_missing_key_is_not_found() {
    let store = InMemoryConfigStore::new();
    assert!(matches!(store.get(keys::SALT), Err(ConfigError::NotFound(_))));
  }

  #[test]
  fn optional_kdf_params_fall_back_to_defaults() {
    let store = InMemoryConfigStore::new();
    assert_eq!(
      store.get_u32_or(keys::KDF_ITERATIONS, DEFAULT_KDF_ITERATIONS).unwrap(),
      DEFAULT_KDF_ITERATIONS
    );
  }

  #[test]
  fn put_u32_then_get_u32_or_returns_stored_value() {
    let mut store = InMemoryConfigStore::new();
    store.put_u32(keys::KDF_MEMORY, 131_072).unwrap();
    assert_eq!(store.get_u32_or(keys::KDF_MEMORY, DEFAULT_KDF_MEMORY).unwrap(), 131_072);
  }

  #[test]
  fn delete_is_idempotent_and_verified() {
    let mut store = InMemoryConfigStore::new();
    store.put(keys::VAULT_PATH, b"/tmp/vault.db").unwrap();
    store.delete(keys::VAULT_PATH).unwrap();
    assert!(!store.contains(keys::VAULT_PATH));
    // Deleting an already-absent key still succeeds.
    store.delete(keys::VAULT_PATH).unwrap();
  }

  #[test]
  fn fixed_getter_rejects_wrong_length() {
    let mut store = InMemoryConfigStore::new();
    store.put(keys::SALT, &[0x01u8; 31]).unwrap();
    let err = store.get_fixed::<32>(keys::SALT).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidLength { got: 31, want: 32 }));
  }
}
