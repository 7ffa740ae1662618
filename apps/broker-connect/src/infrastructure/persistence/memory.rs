//! In-Memory Credential Store
//!
//! Map-backed `CredentialStore` adapter. Sensitive fields are held sealed
//! even in memory, so this backend exercises the exact codec path the
//! durable backend uses.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::application::ports::{CredentialStore, StoreError};
use crate::domain::credential::{BrokerCredential, CredentialPatch, FieldUpdate, UserId};
use crate::infrastructure::sealing::{CodecError, SecretCodec};

/// One record at rest: sensitive fields sealed, status fields plain.
#[derive(Debug, Clone, Default)]
struct SealedRecord {
    api_key: Option<String>,
    api_secret: Option<String>,
    access_token: Option<String>,
    is_connected: bool,
    balance: Decimal,
    last_sync: Option<DateTime<Utc>>,
}

/// A patch with its sensitive updates already sealed, prepared outside the
/// map lock so codec work never blocks readers.
struct SealedPatch {
    api_key: FieldUpdate<String>,
    api_secret: FieldUpdate<String>,
    access_token: FieldUpdate<String>,
    last_sync: FieldUpdate<DateTime<Utc>>,
    is_connected: Option<bool>,
    balance: Option<Decimal>,
}

/// In-memory `CredentialStore` implementation.
pub struct InMemoryCredentialStore {
    codec: SecretCodec,
    records: RwLock<HashMap<UserId, SealedRecord>>,
}

impl InMemoryCredentialStore {
    /// Create an empty store sealing through the given codec.
    #[must_use]
    pub fn new(codec: SecretCodec) -> Self {
        Self {
            codec,
            records: RwLock::new(HashMap::new()),
        }
    }

    fn seal_field(&self, update: FieldUpdate<String>) -> Result<FieldUpdate<String>, StoreError> {
        Ok(match update {
            FieldUpdate::Keep => FieldUpdate::Keep,
            FieldUpdate::Unset => FieldUpdate::Unset,
            FieldUpdate::Set(value) => FieldUpdate::Set(seal(&self.codec, &value)?),
        })
    }

    fn seal_patch(&self, patch: CredentialPatch) -> Result<SealedPatch, StoreError> {
        Ok(SealedPatch {
            api_key: self.seal_field(patch.api_key)?,
            api_secret: self.seal_field(patch.api_secret)?,
            access_token: self.seal_field(patch.access_token)?,
            last_sync: patch.last_sync,
            is_connected: patch.is_connected,
            balance: patch.balance,
        })
    }

    fn decode(&self, record: &SealedRecord) -> Result<BrokerCredential, StoreError> {
        Ok(BrokerCredential {
            api_key: open_opt(&self.codec, record.api_key.as_deref())?,
            api_secret: open_opt(&self.codec, record.api_secret.as_deref())?,
            access_token: open_opt(&self.codec, record.access_token.as_deref())?,
            is_connected: record.is_connected,
            balance: record.balance,
            last_sync: record.last_sync,
        })
    }

    #[cfg(test)]
    fn raw(&self, user_id: &UserId) -> Option<SealedRecord> {
        self.records
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(user_id)
            .cloned()
    }
}

fn seal(codec: &SecretCodec, value: &str) -> Result<String, StoreError> {
    codec.seal(value).map_err(codec_error)
}

fn open_opt(codec: &SecretCodec, value: Option<&str>) -> Result<Option<String>, StoreError> {
    value
        .map(|sealed| codec.open(sealed).map_err(codec_error))
        .transpose()
}

fn codec_error(err: CodecError) -> StoreError {
    StoreError::Codec {
        message: err.to_string(),
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get(&self, user_id: &UserId) -> Result<BrokerCredential, StoreError> {
        let sealed = {
            let records = self
                .records
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            records
                .get(user_id)
                .cloned()
                .ok_or_else(|| StoreError::NotFound {
                    user_id: user_id.clone(),
                })?
        };
        self.decode(&sealed)
    }

    async fn set(
        &self,
        user_id: &UserId,
        patch: CredentialPatch,
    ) -> Result<BrokerCredential, StoreError> {
        let sealed_patch = self.seal_patch(patch)?;

        let merged = {
            let mut records = self
                .records
                .write()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            let record = records
                .get_mut(user_id)
                .ok_or_else(|| StoreError::NotFound {
                    user_id: user_id.clone(),
                })?;

            // Field-wise merge: untouched siblings keep their stored bytes.
            record.api_key = sealed_patch.api_key.resolve(record.api_key.take());
            record.api_secret = sealed_patch.api_secret.resolve(record.api_secret.take());
            record.access_token = sealed_patch.access_token.resolve(record.access_token.take());
            record.last_sync = sealed_patch.last_sync.resolve(record.last_sync.take());
            if let Some(connected) = sealed_patch.is_connected {
                record.is_connected = connected;
            }
            if let Some(balance) = sealed_patch.balance {
                record.balance = balance;
            }
            // Connected-without-token never survives a merge.
            if record.access_token.is_none() {
                record.is_connected = false;
            }
            record.clone()
        };

        self.decode(&merged)
    }

    async fn clear(&self, user_id: &UserId) -> Result<(), StoreError> {
        let mut records = self
            .records
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let record = records
            .get_mut(user_id)
            .ok_or_else(|| StoreError::NotFound {
                user_id: user_id.clone(),
            })?;
        *record = SealedRecord::default();
        Ok(())
    }

    async fn enroll(&self, user_id: &UserId) -> Result<(), StoreError> {
        let mut records = self
            .records
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        records.entry(user_id.clone()).or_default();
        Ok(())
    }
}
