//! Password generator (SPEC_FULL §1 expansion): charset policies and
//! unbiased random password generation, ported from
//! `original_source/src/utils/security_utils.c: generate_password`.
//!
//! This module lives outside the crypto core proper — §1 names
//! "password-generation charset policy" as an out-of-scope collaborator
//! concern — but it is included here as ambient tooling the core does not
//! depend on.

use crate::primitives::random_bytes;

/// Which character set to draw from, mirroring the original's
/// `charset_flag` enum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Charset {
  Full,
  AlphaNumeric,
  Alpha,
  Upper,
  Lower,
  DigitsAndSymbols,
  Symbols,
  Digits,
}

impl Charset {
  fn chars(self) -> &'static [u8] {
    match self {
      Charset::Full => {
        b"abcdefghijklmnopqrstuvwxyz\
          ABCDEFGHIJKLMNOPQRSTUVWXYZ\
          0123456789\
          !@_#)$%=^+&*(-"
      }
      Charset::AlphaNumeric => {
        b"abcdefghijklmnopqrstuvwxyz\
          ABCDEFGHIJKLMNOPQRSTUVWXYZ\
          0123456789"
      }
      Charset::Alpha => b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ",
      Charset::Upper => b"ABCDEFGHIJKLMNOPQRSTUVWXYZ",
      Charset::Lower => b"abcdefghijklmnopqrstuvwxyz",
      Charset::DigitsAndSymbols => b"0123456789!@#$%^&*()-_=+",
      Charset::Symbols => b"!@#$%^&*()-_=+",
      Charset::Digits => b"0123456789",
    }
  }
}

/// Maximum generated password length, mirroring the original's `MAX_LEN`.
pub const MAX_PASSWORD_LEN: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum CharsetError {
  #[error("requested password length {0} is out of bounds (0, {MAX_PASSWORD_LEN}]")]
  InvalidLength(usize),
}

/// Generates a random password of `length` characters drawn from `charset`.
///
/// Uses rejection sampling against the OS CSPRNG to avoid modulo bias: a
/// drawn byte is discarded and redrawn whenever it falls in the tail that
/// would make some characters more likely than others, exactly as the
/// original's `bias_threshold` logic does.
pub fn generate_password(length: usize, charset: Charset) -> Result<String, CharsetError> {
  if length == 0 || length > MAX_PASSWORD_LEN {
    return Err(CharsetError::InvalidLength(length));
  }

  let chars = charset.chars();
  let charset_size = chars.len() as u16;
  let max_rand: u16 = 256;
  let bias_threshold = max_rand - (max_rand % charset_size);

  let mut out = Vec::with_capacity(length);
  let mut one_byte = [0u8; 1];
  for _ in 0..length {
    loop {
      random_bytes(&mut one_byte);
      let candidate = one_byte[0] as u16;
      if candidate < bias_threshold {
        out.push(chars[(candidate % charset_size) as usize]);
        break;
      }
    }
  }

  // Charset bytes are all ASCII, so this never fails.
  Ok(String::from_utf8(out).expect("charset is ASCII"))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn generates_requested_length() {
    let pw = generate_password(16, Charset::Full).unwrap();
    assert_eq!(pw.chars().count(), 16);
  }

  #[test]
  fn digits_only_charset_produces_only_digits() {
    let pw = generate_password(64, Charset::Digits).unwrap();
    assert!(pw.bytes().all(|b| b.is_ascii_digit()));
  }

  #[test]
  fn rejects_zero_and_oversized_length() {
    assert!(generate_password(0, Charset::Full).is_err());
    assert!(generate_password(MAX_PASSWORD_LEN + 1, Charset::Full).is_err());
  }

  #[test]
  fn two_generations_differ_with_overwhelming_probability() {
    let a = generate_password(32, Charset::Full).unwrap();
    let b = generate_password(32, Charset::Full).unwrap();
    assert_ne!(a, b);
  }
}
