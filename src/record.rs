//! Record Envelope Layer (§4.6): maps between cleartext records and their
//! opaque (sealed) on-disk counterpart.
//!
//! Per §9's "duplicated data models" design note, this crate uses exactly
//! ONE internal cleartext representation ([`Record`]) instead of the
//! original's two interchangeable C shapes (`IntVaultEntry` with C strings,
//! `ExtVaultEntry` with length-carrying buffers). [`OpaqueRecord`] is the
//! sealed counterpart; conversion only happens in [`seal_record`] /
//! [`open_record`].

use chrono::{DateTime, Utc};
use uuid::Uuid;
use zeroize::Zeroize;

use crate::aead;
use crate::error::RecordError;

/// A cleartext credential record. `notes` may legitimately be empty;
/// `service`, `username`, and `password` are required-present (possibly
/// empty strings, but always `Some`-equivalent — there is no null state
/// for them at this layer).
#[derive(Clone, Debug)]
pub struct Record {
  /// RFC 4122 v4 UUID, 36-character ASCII form.
  pub uuid: String,
  pub service: Vec<u8>,
  pub username: Vec<u8>,
  pub password: Vec<u8>,
  pub notes: Vec<u8>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Zeroize for Record {
  fn zeroize(&mut self) {
    self.uuid.zeroize();
    self.service.zeroize();
    self.username.zeroize();
    self.password.zeroize();
    self.notes.zeroize();
  }
}

impl Drop for Record {
  fn drop(&mut self) {
    self.zeroize();
  }
}

impl Record {
  /// Creates a new record with a freshly generated UUID v4 and the current
  /// timestamp for both `created_at` and `updated_at`.
  pub fn new(service: Vec<u8>, username: Vec<u8>, password: Vec<u8>, notes: Vec<u8>) -> Self {
    let now = Utc::now();
    Self {
      uuid: Uuid::new_v4().to_string(),
      service,
      username,
      password,
      notes,
      created_at: now,
      updated_at: now,
    }
  }

  /// Refreshes `updated_at` to the current time.
  pub fn touch(&mut self) {
    self.updated_at = Utc::now();
  }
}

/// The sealed, opaque counterpart of [`Record`]: every field value is an
/// AEAD blob (§4.3 format) instead of plaintext bytes. `uuid`,
/// `created_at`, and `updated_at` carry over verbatim, unsealed — they are
/// not secret (§4.6).
#[derive(Clone, Debug)]
pub struct OpaqueRecord {
  pub uuid: String,
  pub service_blob: Vec<u8>,
  pub username_blob: Vec<u8>,
  pub password_blob: Vec<u8>,
  pub notes_blob: Vec<u8>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Seals every field of `record` under `master_key`, carrying `uuid`,
/// `created_at`, and `updated_at` verbatim (§4.6).
pub fn seal_record(master_key: &[u8; 32], record: &Record) -> Result<OpaqueRecord, RecordError> {
  Ok(OpaqueRecord {
    uuid: record.uuid.clone(),
    service_blob: aead::seal(master_key, &record.service)?,
    username_blob: aead::seal(master_key, &record.username)?,
    password_blob: aead::seal(master_key, &record.password)?,
    notes_blob: aead::seal(master_key, &record.notes)?,
    created_at: record.created_at,
    updated_at: record.updated_at,
  })
}

/// Opens every field of `opaque` under `master_key`. If any field fails to
/// open, the whole operation fails and any fields already decoded are
/// zeroized before returning (§4.6) — resolving the Open Question in §9
/// about the original's `read_entry` sizing `notes` from `password_len`:
/// here every field is always sized from its own blob's length, never
/// another field's.
pub fn open_record(master_key: &[u8; 32], opaque: &OpaqueRecord) -> Result<Record, RecordError> {
  let mut service = aead::open(master_key, &opaque.service_blob).map_err(|_| RecordError::Open)?;

  let username = match aead::open(master_key, &opaque.username_blob) {
    Ok(v) => v,
    Err(_) => {
      service.zeroize();
      return Err(RecordError::Open);
    }
  };

  let password = match aead::open(master_key, &opaque.password_blob) {
    Ok(v) => v,
    Err(_) => {
      service.zeroize();
      let mut username = username;
      username.zeroize();
      return Err(RecordError::Open);
    }
  };

  let notes = match aead::open(master_key, &opaque.notes_blob) {
    Ok(v) => v,
    Err(_) => {
      service.zeroize();
      let mut username = username;
      username.zeroize();
      let mut password = password;
      password.zeroize();
      return Err(RecordError::Open);
    }
  };

  Ok(Record {
    uuid: opaque.uuid.clone(),
    service,
    username,
    password,
    notes,
    created_at: opaque.created_at,
    updated_at: opaque.updated_at,
  })
}
