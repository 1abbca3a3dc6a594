//! KDF & Hasher (§4.2): password-based key derivation and a salted hash,
//! both backed by Argon2id — the same memory-hard family the teacher's
//! `vault::derive_key` already uses, retuned to this spec's cost
//! parameters and, for `derive_material`, mixed with an associated secret
//! (the titan key).

use argon2::{Algorithm, Argon2, Params, Version};

use crate::error::KdfError;

/// Iterations (`t_cost`), per §4.2.
pub const T_COST: u32 = 3;
/// Memory cost in KiB (`m_cost`), per §4.2 — 256 MiB.
pub const M_COST: u32 = 262_144;
/// Parallelism (`p_cost`), per §4.2.
pub const P_COST: u32 = 2;

/// Output length of [`derive_material`].
pub const MATERIAL_LEN: usize = 64;
/// Output length of [`hash_key`].
pub const HASH_LEN: usize = 32;

/// Runs Argon2id with `titan_key` mixed in as the associated secret and
/// derives 64 bytes of key material from `passphrase` and `salt`.
///
/// The passphrase is treated as an opaque byte string; no Unicode
/// normalization is performed, matching §4.2 ("no normalization
/// specified").
pub fn derive_material(
  passphrase: &[u8],
  titan_key: &[u8; 32],
  salt: &[u8; 32],
) -> Result<[u8; MATERIAL_LEN], KdfError> {
  let params = Params::new(M_COST, T_COST, P_COST, Some(MATERIAL_LEN))
    .map_err(|e| KdfError::InvalidParams(e.to_string()))?;
  let argon2 = Argon2::new_with_secret(titan_key, Algorithm::Argon2id, Version::V0x13, params)
    .map_err(|e| KdfError::InvalidParams(e.to_string()))?;

  let mut out = [0u8; MATERIAL_LEN];
  argon2
    .hash_password_into(passphrase, salt, &mut out)
    .map_err(|e| KdfError::DerivationFailed(e.to_string()))?;
  Ok(out)
}

/// Runs Argon2id (same costs as [`derive_material`], no associated secret)
/// and hashes `key` with `salt` into a 32-byte tag. Used both for the
/// stored verification tag (§4.5) and the titan-blob MAC (§4.4).
pub fn hash_key(key: &[u8], salt: &[u8; 32]) -> Result<[u8; HASH_LEN], KdfError> {
  let params = Params::new(M_COST, T_COST, P_COST, Some(HASH_LEN))
    .map_err(|e| KdfError::InvalidParams(e.to_string()))?;
  let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

  let mut out = [0u8; HASH_LEN];
  argon2
    .hash_password_into(key, salt, &mut out)
    .map_err(|e| KdfError::DerivationFailed(e.to_string()))?;
  Ok(out)
}
