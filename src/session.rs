//! Signed-in credential and the store that keeps it across restarts.

use std::fmt;

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::logging::{log, obj, v_str, Domain, Level};

/// Opaque record identifying the signed-in actor.
///
/// The sync core only threads it through to the transport; the transport
/// turns it into an `Authorization` header.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl Credential {
    pub fn bearer(user_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            email: None,
            full_name: None,
            access_token: access_token.into(),
            token_type: None,
        }
    }

    /// Header value: `<token_type or "Bearer"> <access_token>`.
    pub fn authorization(&self) -> String {
        let scheme = self
            .token_type
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("Bearer");
        format!("{} {}", scheme, self.access_token)
    }

    /// Short SHA-256 prefix of the token, safe to log.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.access_token.as_bytes());
        hex::encode(&digest[..6])
    }

    pub fn is_usable(&self) -> bool {
        !self.access_token.trim().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("user_id", &self.user_id)
            .field("email", &self.email)
            .field("token", &format_args!("[{}]", self.fingerprint()))
            .finish()
    }
}

/// Holds at most one credential.
pub trait SessionStore {
    fn load(&self) -> Result<Option<Credential>>;
    fn save(&mut self, credential: &Credential) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
}

/// Parse a stored record; unreadable or token-less records count as signed out.
fn decode_record(raw: &str) -> Option<Credential> {
    serde_json::from_str::<Credential>(raw)
        .ok()
        .filter(Credential::is_usable)
}

pub struct SqliteSessionStore {
    conn: Connection,
}

impl SqliteSessionStore {
    pub fn open(path: &str) -> Result<Self> {
        let mut store = Self { conn: Connection::open(path)? };
        store.init()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let mut store = Self { conn: Connection::open_in_memory()? };
        store.init()?;
        Ok(store)
    }

    fn init(&mut self) -> Result<()> {
        self.conn.execute_batch(
            "BEGIN;
            CREATE TABLE IF NOT EXISTS session (
                slot INTEGER PRIMARY KEY CHECK (slot = 0),
                record TEXT NOT NULL,
                saved_at TEXT NOT NULL
            );
            COMMIT;",
        )?;
        Ok(())
    }
}

impl SessionStore for SqliteSessionStore {
    fn load(&self) -> Result<Option<Credential>> {
        let raw: Option<String> = self
            .conn
            .query_row("SELECT record FROM session WHERE slot = 0", [], |row| row.get(0))
            .optional()?;
        Ok(raw.as_deref().and_then(decode_record))
    }

    fn save(&mut self, credential: &Credential) -> Result<()> {
        let record = serde_json::to_string(credential)?;
        self.conn.execute(
            "INSERT OR REPLACE INTO session (slot, record, saved_at) VALUES (0, ?1, ?2)",
            params![record, crate::logging::ts_now()],
        )?;
        log(
            Level::Info,
            Domain::Session,
            "session.saved",
            obj(&[
                ("user_id", v_str(&credential.user_id)),
                ("token_fp", v_str(&credential.fingerprint())),
            ]),
        );
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.conn.execute("DELETE FROM session", [])?;
        log(Level::Info, Domain::Session, "session.cleared", obj(&[]));
        Ok(())
    }
}

/// Process-local store, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    record: Option<String>,
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Credential>> {
        Ok(self.record.as_deref().and_then(decode_record))
    }

    fn save(&mut self, credential: &Credential) -> Result<()> {
        self.record = Some(serde_json::to_string(credential)?);
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.record = None;
        Ok(())
    }
}
