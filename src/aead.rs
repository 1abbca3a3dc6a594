//! AEAD Envelope (§4.3): seals/opens an arbitrary plaintext field into a
//! self-contained `nonce ‖ ciphertext ‖ tag` blob.
//!
//! Grounded on the teacher's `vault::save_with_key`/`load_with_password`
//! for the call shape, but the cipher is AES-256-GCM (not the teacher's
//! XChaCha20-Poly1305) to match the spec's fixed 12-byte-nonce/16-byte-tag
//! wire format (§6). `aes-gcm` exposes the same `aead::{Aead, KeyInit}`
//! traits the teacher already codes against, via `maxBogovick-vfs-desktop`'s
//! dependency on the same crate.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};

use crate::error::AeadError;
use crate::primitives::random_bytes;

/// Nonce length, per §4.3/§6.
pub const NONCE_LEN: usize = 12;
/// GCM tag length, per §4.3/§6.
pub const TAG_LEN: usize = 16;
/// Minimum valid blob length (nonce + tag, zero-length plaintext).
pub const MIN_BLOB_LEN: usize = NONCE_LEN + TAG_LEN;

/// Seals `plaintext` under `master_key`, producing a `blob` of
/// `plaintext.len() + 28` bytes: a fresh random 12-byte nonce, the
/// ciphertext, and a 16-byte authentication tag.
///
/// Nonces are drawn from the OS CSPRNG for every call (never a counter) to
/// avoid catastrophic nonce reuse under GCM, per §4.3.
pub fn seal(master_key: &[u8; 32], plaintext: &[u8]) -> Result<Vec<u8>, AeadError> {
  let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(master_key));

  let mut nonce_bytes = [0u8; NONCE_LEN];
  random_bytes(&mut nonce_bytes);
  let nonce = Nonce::from_slice(&nonce_bytes);

  let ciphertext = cipher
    .encrypt(nonce, plaintext)
    .map_err(|_| AeadError::SealFailed)?;

  let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
  blob.extend_from_slice(&nonce_bytes);
  blob.extend_from_slice(&ciphertext);
  Ok(blob)
}

/// Opens a `blob` produced by [`seal`] under `master_key`, returning the
/// original plaintext. Fails if the blob is shorter than [`MIN_BLOB_LEN`]
/// or if tag verification fails (wrong key, wrong nonce, or corrupted
/// ciphertext — these are deliberately indistinguishable).
pub fn open(master_key: &[u8; 32], blob: &[u8]) -> Result<Vec<u8>, AeadError> {
  if blob.len() < MIN_BLOB_LEN {
    return Err(AeadError::InvalidSize {
      got: blob.len(),
      min: MIN_BLOB_LEN,
    });
  }

  let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(master_key));
  let nonce = Nonce::from_slice(&blob[..NONCE_LEN]);
  let ciphertext_and_tag = &blob[NONCE_LEN..];

  cipher
    .decrypt(nonce, ciphertext_and_tag)
    .map_err(|_| AeadError::OpenFailed)
}
