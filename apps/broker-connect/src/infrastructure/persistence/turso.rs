//! Turso-backed credential store.
//!
//! Persists one row per portal user in a local Turso database file.
//! Sensitive columns (`api_key`, `api_secret`, `access_token`) hold sealed
//! ciphertext and are opened on read. Every `set` runs as a single merge
//! UPDATE, so a partially applied patch can never land on disk.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::info;
use turso::{Builder, Connection, Value};

use crate::application::ports::{CredentialStore, StoreError};
use crate::domain::credential::{BrokerCredential, CredentialPatch, FieldUpdate, UserId};
use crate::infrastructure::sealing::{CodecError, SecretCodec};

const SCHEMA: &str = "\
    CREATE TABLE IF NOT EXISTS broker_credentials (\
        user_id      TEXT PRIMARY KEY,\
        api_key      TEXT,\
        api_secret   TEXT,\
        access_token TEXT,\
        is_connected INTEGER NOT NULL DEFAULT 0,\
        balance      TEXT NOT NULL DEFAULT '0',\
        last_sync    TEXT,\
        updated_at   TEXT NOT NULL\
    )";

const SELECT_SQL: &str = "\
    SELECT api_key, api_secret, access_token, is_connected, balance, last_sync \
    FROM broker_credentials WHERE user_id = ?1";

// Each patch field carries a mode parameter (0 keep, 1 set, 2 unset) next to
// its value. Column references on the right-hand side of SET read the
// pre-update row, so the merged token expression is repeated inside the
// `is_connected` branch to clamp the flag when the merge leaves no token.
const MERGE_SQL: &str = "\
    UPDATE broker_credentials SET \
        api_key      = CASE ?1 WHEN 1 THEN ?2 WHEN 2 THEN NULL ELSE api_key END,\
        api_secret   = CASE ?3 WHEN 1 THEN ?4 WHEN 2 THEN NULL ELSE api_secret END,\
        access_token = CASE ?5 WHEN 1 THEN ?6 WHEN 2 THEN NULL ELSE access_token END,\
        last_sync    = CASE ?7 WHEN 1 THEN ?8 WHEN 2 THEN NULL ELSE last_sync END,\
        is_connected = CASE \
            WHEN (CASE ?5 WHEN 1 THEN ?6 WHEN 2 THEN NULL ELSE access_token END) IS NULL THEN 0 \
            ELSE COALESCE(?9, is_connected) \
        END,\
        balance      = COALESCE(?10, balance),\
        updated_at   = ?11 \
    WHERE user_id = ?12";

const CLEAR_SQL: &str = "\
    UPDATE broker_credentials SET \
        api_key = NULL, api_secret = NULL, access_token = NULL,\
        is_connected = 0, balance = '0', last_sync = NULL, updated_at = ?1 \
    WHERE user_id = ?2";

const ENROLL_SQL: &str = "\
    INSERT OR IGNORE INTO broker_credentials (user_id, is_connected, balance, updated_at) \
    VALUES (?1, 0, '0', ?2)";

/// Credential store persisted to a local Turso database file.
pub struct TursoCredentialStore {
    codec: SecretCodec,
    conn: Mutex<Connection>,
}

impl TursoCredentialStore {
    /// Open (or create) the database at `path` and run schema setup.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the schema
    /// statement fails.
    pub async fn open(path: &str, codec: SecretCodec) -> Result<Self, StoreError> {
        let db = Builder::new_local(path).build().await.map_err(db_error)?;
        let conn = db.connect().map_err(db_error)?;
        conn.execute(SCHEMA, ()).await.map_err(db_error)?;

        info!(path, "credential database opened");

        Ok(Self {
            codec,
            conn: Mutex::new(conn),
        })
    }

    fn seal_field(&self, update: FieldUpdate<String>) -> Result<FieldUpdate<String>, StoreError> {
        Ok(match update {
            FieldUpdate::Set(plain) => {
                FieldUpdate::Set(self.codec.seal(&plain).map_err(codec_error)?)
            }
            other => other,
        })
    }

    async fn fetch_row(
        conn: &Connection,
        user_id: &UserId,
    ) -> Result<Option<turso::Row>, StoreError> {
        let mut rows = conn
            .query(SELECT_SQL, [Value::Text(user_id.to_string())])
            .await
            .map_err(db_error)?;
        rows.next().await.map_err(db_error)
    }

    fn open_column(
        &self,
        row: &turso::Row,
        index: usize,
        column: &str,
    ) -> Result<Option<String>, StoreError> {
        match text_column(row, index, column)? {
            Some(sealed) => self.codec.open(&sealed).map(Some).map_err(codec_error),
            None => Ok(None),
        }
    }

    fn decode_row(&self, row: &turso::Row) -> Result<BrokerCredential, StoreError> {
        let api_key = self.open_column(row, 0, "api_key")?;
        let api_secret = self.open_column(row, 1, "api_secret")?;
        let access_token = self.open_column(row, 2, "access_token")?;

        let is_connected = match row.get_value(3).map_err(db_error)? {
            Value::Integer(flag) => flag != 0,
            _ => return Err(column_error("is_connected")),
        };

        let balance = match row.get_value(4).map_err(db_error)? {
            Value::Text(text) => text.parse::<Decimal>().map_err(|err| StoreError::Unavailable {
                message: format!("balance column is not a decimal: {err}"),
            })?,
            _ => return Err(column_error("balance")),
        };

        let last_sync = match row.get_value(5).map_err(db_error)? {
            Value::Null => None,
            Value::Text(text) => Some(parse_timestamp(&text)?),
            _ => return Err(column_error("last_sync")),
        };

        Ok(BrokerCredential {
            api_key,
            api_secret,
            access_token,
            is_connected,
            balance,
            last_sync,
        })
    }
}

fn db_error(err: turso::Error) -> StoreError {
    StoreError::Unavailable {
        message: err.to_string(),
    }
}

fn codec_error(err: CodecError) -> StoreError {
    StoreError::Codec {
        message: err.to_string(),
    }
}

fn column_error(column: &str) -> StoreError {
    StoreError::Unavailable {
        message: format!("column {column} has an unexpected type"),
    }
}

fn text_column(row: &turso::Row, index: usize, column: &str) -> Result<Option<String>, StoreError> {
    match row.get_value(index).map_err(db_error)? {
        Value::Null => Ok(None),
        Value::Text(text) => Ok(Some(text)),
        _ => Err(column_error(column)),
    }
}

fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(text)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|err| StoreError::Unavailable {
            message: format!("last_sync column is not a timestamp: {err}"),
        })
}

fn mode_params(update: &FieldUpdate<String>) -> (Value, Value) {
    match update {
        FieldUpdate::Keep => (Value::Integer(0), Value::Null),
        FieldUpdate::Set(value) => (Value::Integer(1), Value::Text(value.clone())),
        FieldUpdate::Unset => (Value::Integer(2), Value::Null),
    }
}

#[async_trait]
impl CredentialStore for TursoCredentialStore {
    async fn get(&self, user_id: &UserId) -> Result<BrokerCredential, StoreError> {
        let conn = self.conn.lock().await;
        let row = Self::fetch_row(&conn, user_id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                user_id: user_id.clone(),
            })?;
        drop(conn);

        self.decode_row(&row)
    }

    async fn set(
        &self,
        user_id: &UserId,
        patch: CredentialPatch,
    ) -> Result<BrokerCredential, StoreError> {
        // Seal before touching the connection so a codec failure leaves the
        // row untouched.
        let api_key = self.seal_field(patch.api_key)?;
        let api_secret = self.seal_field(patch.api_secret)?;
        let access_token = self.seal_field(patch.access_token)?;

        let (key_mode, key_value) = mode_params(&api_key);
        let (secret_mode, secret_value) = mode_params(&api_secret);
        let (token_mode, token_value) = mode_params(&access_token);
        let (sync_mode, sync_value) = match patch.last_sync {
            FieldUpdate::Keep => (Value::Integer(0), Value::Null),
            FieldUpdate::Set(at) => (Value::Integer(1), Value::Text(at.to_rfc3339())),
            FieldUpdate::Unset => (Value::Integer(2), Value::Null),
        };
        let connected = patch
            .is_connected
            .map_or(Value::Null, |flag| Value::Integer(i64::from(flag)));
        let balance = patch
            .balance
            .map_or(Value::Null, |amount| Value::Text(amount.to_string()));

        let params = [
            key_mode,
            key_value,
            secret_mode,
            secret_value,
            token_mode,
            token_value,
            sync_mode,
            sync_value,
            connected,
            balance,
            Value::Text(Utc::now().to_rfc3339()),
            Value::Text(user_id.to_string()),
        ];

        let conn = self.conn.lock().await;
        let changed = conn.execute(MERGE_SQL, params).await.map_err(db_error)?;
        if changed == 0 {
            return Err(StoreError::NotFound {
                user_id: user_id.clone(),
            });
        }

        let row = Self::fetch_row(&conn, user_id)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                user_id: user_id.clone(),
            })?;
        drop(conn);

        self.decode_row(&row)
    }

    async fn clear(&self, user_id: &UserId) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        let changed = conn
            .execute(
                CLEAR_SQL,
                [
                    Value::Text(Utc::now().to_rfc3339()),
                    Value::Text(user_id.to_string()),
                ],
            )
            .await
            .map_err(db_error)?;

        if changed == 0 {
            return Err(StoreError::NotFound {
                user_id: user_id.clone(),
            });
        }
        Ok(())
    }

    async fn enroll(&self, user_id: &UserId) -> Result<(), StoreError> {
        let conn = self.conn.lock().await;
        conn.execute(
            ENROLL_SQL,
            [
                Value::Text(user_id.to_string()),
                Value::Text(Utc::now().to_rfc3339()),
            ],
        )
        .await
        .map_err(db_error)?;
        Ok(())
    }
}
