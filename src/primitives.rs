//! Low-level primitives the rest of the core builds on (§4.1): CSPRNG bytes,
//! constant-time comparison, and scoped zeroization.
//!
//! These functions never log and never allocate more than requested; they
//! are the leaves of the dependency graph (~5% of the core per §2).

use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;

/// Sanity cap mirroring the original `MAX_LEN` in `security_utils.c`. Not a
/// hard security boundary — just a tripwire against a wildly wrong size
/// reaching a zeroize call.
pub const ZEROIZE_SANITY_CAP: usize = 200;

/// Overwrites `buf` with zero bytes in a way the optimizer cannot elide,
/// refusing to run on buffers larger than [`ZEROIZE_SANITY_CAP`].
///
/// Most call sites in this crate zero fixed-size arrays or `Vec<u8>`
/// directly via `zeroize::Zeroize`; this free function exists for the rare
/// case for a raw byte slice whose size should be sanity-checked before
/// scrubbing, matching the original `secure_memset` contract.
pub fn zeroize_checked(buf: &mut [u8]) -> Result<(), ZeroizeSizeError> {
  if buf.len() > ZEROIZE_SANITY_CAP {
    return Err(ZeroizeSizeError { len: buf.len() });
  }
  zeroize::Zeroize::zeroize(buf);
  Ok(())
}

#[derive(Debug, thiserror::Error)]
#[error("zeroize size {len} exceeds sanity cap of {ZEROIZE_SANITY_CAP}")]
pub struct ZeroizeSizeError {
  len: usize,
}

/// Fills `out` with cryptographically secure random bytes from the OS
/// CSPRNG. `rand::rngs::OsRng` draws directly from the platform source
/// (`getrandom`/`/dev/urandom`-equivalent) and cannot silently return fewer
/// bytes than requested, unlike the raw syscall the original wraps.
pub fn random_bytes(out: &mut [u8]) {
  OsRng.fill_bytes(out);
}

/// Returns `n` cryptographically secure random bytes.
pub fn random_vec(n: usize) -> Vec<u8> {
  let mut buf = vec![0u8; n];
  random_bytes(&mut buf);
  buf
}

/// Constant-time equality over two equal-length byte slices (§4.1, §8
/// property 6). Returns `false` immediately for mismatched lengths — length
/// is not treated as secret anywhere this is called (every call site in
/// this crate compares fixed-size tags).
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
  if a.len() != b.len() {
    return false;
  }
  a.ct_eq(b).into()
}
