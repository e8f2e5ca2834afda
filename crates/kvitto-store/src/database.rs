// SPDX-FileCopyrightText: 2026 Kvitto Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All access goes through tokio-rusqlite's single background thread. Do NOT
//! create additional `Connection` instances for writes.

use kvitto_core::KvittoError;

/// Handle to the single async SQLite connection.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

impl Database {
    /// Open (creating if needed) the database at `path`, apply PRAGMAs, and
    /// run pending migrations.
    pub async fn open(path: &str, wal_mode: bool) -> Result<Self, KvittoError> {
        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| map_tr_err(tokio_rusqlite::Error::from(e)))?;

        conn.call(move |conn| {
            let journal = if wal_mode { "WAL" } else { "DELETE" };
            conn.pragma_update(None, "journal_mode", journal)?;
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(|conn| crate::migrations::run_migrations(conn))
            .await
            .map_err(|e| KvittoError::Storage {
                source: Box::new(e),
            })?;

        tracing::debug!(path = %path, wal = wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The underlying async connection handle.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Close the connection, flushing WAL.
    pub async fn close(&self) -> Result<(), KvittoError> {
        self.conn.clone().close().await.map_err(map_tr_err)
    }
}

/// Map a tokio-rusqlite error into the workspace storage error.
pub(crate) fn map_tr_err(e: tokio_rusqlite::Error) -> KvittoError {
    KvittoError::Storage {
        source: Box::new(e),
    }
}
