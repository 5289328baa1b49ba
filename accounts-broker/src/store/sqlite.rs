//! SQLite-based storage implementation

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};

use super::{
    Account, AccountRepo, AccountStatus, AccountStore, ConfirmationId, ConfirmationRequest,
    Purpose, StoreResult,
};
use crate::error::BrokerError;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

const ACCOUNT_COLUMNS: &str = "id, name, surname, password_digest, must_reset_on_next_login, \
     status, password_updated_at, created_at, updated_at";

const CONFIRMATION_COLUMNS: &str = "id, account_id, purpose, redeemed, redeemed_at, created_at";

fn unavailable(e: rusqlite::Error) -> BrokerError {
    BrokerError::StoreUnavailable(e.to_string())
}

/// SQLite-based account store
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path
    pub fn open(path: &str) -> Result<Self, BrokerError> {
        let conn = Connection::open(path).map_err(unavailable)?;
        Self::with_connection(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self, BrokerError> {
        let conn = Connection::open_in_memory().map_err(unavailable)?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, BrokerError> {
        Self::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| BrokerError::StoreUnavailable("sqlite connection lock poisoned".into()))
    }

    /// Run database migrations
    fn migrate(conn: &Connection) -> Result<(), BrokerError> {
        let current_version = Self::get_schema_version(conn)?;

        if current_version < SCHEMA_VERSION {
            tracing::info!(
                current = current_version,
                target = SCHEMA_VERSION,
                "Running database migrations"
            );

            if current_version < 1 {
                Self::migrate_v1(conn)?;
            }

            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )
            .map_err(unavailable)?;

            tracing::info!("Database migrations complete");
        }

        Ok(())
    }

    /// Get current schema version (0 if no schema exists)
    fn get_schema_version(conn: &Connection) -> Result<i32, BrokerError> {
        let table_exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
                [],
                |row| row.get(0),
            )
            .map_err(unavailable)?;

        if !table_exists {
            return Ok(0);
        }

        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0).map(|v| v.unwrap_or(0))
        })
        .map_err(unavailable)
    }

    /// Migration to version 1: initial schema
    fn migrate_v1(conn: &Connection) -> Result<(), BrokerError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            CREATE TABLE IF NOT EXISTS accounts (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                surname TEXT NOT NULL,
                password_digest TEXT NOT NULL,
                must_reset_on_next_login INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL,
                password_updated_at TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Confirmation requests outlive their account (audit trail)
            CREATE TABLE IF NOT EXISTS confirmations (
                id TEXT PRIMARY KEY,
                account_id TEXT NOT NULL,
                purpose TEXT NOT NULL,
                redeemed INTEGER NOT NULL DEFAULT 0,
                redeemed_at TEXT,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_confirmations_account ON confirmations(account_id);
            "#,
        )
        .map_err(unavailable)?;

        Ok(())
    }
}

fn conversion_error(idx: usize, what: &str, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        format!("unknown {} '{}'", what, value).into(),
    )
}

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    let status: String = row.get(5)?;
    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        surname: row.get(2)?,
        password_digest: row.get(3)?,
        must_reset_on_next_login: row.get(4)?,
        status: AccountStatus::from_str(&status)
            .ok_or_else(|| conversion_error(5, "status", &status))?,
        password_updated_at: row.get::<_, DateTime<Utc>>(6)?,
        created_at: row.get::<_, DateTime<Utc>>(7)?,
        updated_at: row.get::<_, DateTime<Utc>>(8)?,
    })
}

fn confirmation_from_row(row: &Row<'_>) -> rusqlite::Result<ConfirmationRequest> {
    let id: String = row.get(0)?;
    let purpose: String = row.get(2)?;
    Ok(ConfirmationRequest {
        id: id
            .parse::<ConfirmationId>()
            .map_err(|_| conversion_error(0, "confirmation id", &id))?,
        account_id: row.get(1)?,
        purpose: Purpose::from_str(&purpose)
            .ok_or_else(|| conversion_error(2, "purpose", &purpose))?,
        redeemed: row.get(3)?,
        redeemed_at: row.get::<_, Option<DateTime<Utc>>>(4)?,
        created_at: row.get::<_, DateTime<Utc>>(5)?,
    })
}

/// Queries over one connection, or over an open transaction
struct SqliteRepo<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteRepo<'c> {
    fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

impl AccountRepo for SqliteRepo<'_> {
    fn find_account(&self, id: &str) -> StoreResult<Option<Account>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM accounts WHERE id = ?1", ACCOUNT_COLUMNS),
                params![id],
                account_from_row,
            )
            .optional()
            .map_err(unavailable)
    }

    fn create_account(&self, account: &Account) -> StoreResult<()> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO accounts ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    ACCOUNT_COLUMNS
                ),
                params![
                    account.id,
                    account.name,
                    account.surname,
                    account.password_digest,
                    account.must_reset_on_next_login,
                    account.status.as_str(),
                    account.password_updated_at,
                    account.created_at,
                    account.updated_at,
                ],
            )
            .map_err(|e| match e.sqlite_error_code() {
                Some(ErrorCode::ConstraintViolation) => BrokerError::AlreadyExists,
                _ => unavailable(e),
            })?;
        Ok(())
    }

    fn update_account(&self, account: &Account) -> StoreResult<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE accounts SET name = ?2, surname = ?3, password_digest = ?4, \
                 must_reset_on_next_login = ?5, status = ?6, password_updated_at = ?7, \
                 updated_at = ?8 WHERE id = ?1",
                params![
                    account.id,
                    account.name,
                    account.surname,
                    account.password_digest,
                    account.must_reset_on_next_login,
                    account.status.as_str(),
                    account.password_updated_at,
                    account.updated_at,
                ],
            )
            .map_err(unavailable)?;

        if rows == 0 {
            return Err(BrokerError::NotFound);
        }
        Ok(())
    }

    fn delete_account(&self, id: &str) -> StoreResult<()> {
        let rows = self
            .conn
            .execute("DELETE FROM accounts WHERE id = ?1", params![id])
            .map_err(unavailable)?;

        if rows == 0 {
            return Err(BrokerError::NotFound);
        }
        Ok(())
    }

    fn find_confirmation(
        &self,
        id: &ConfirmationId,
        purpose: Purpose,
    ) -> StoreResult<Option<ConfirmationRequest>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM confirmations WHERE id = ?1 AND purpose = ?2",
                    CONFIRMATION_COLUMNS
                ),
                params![id.to_string(), purpose.as_str()],
                confirmation_from_row,
            )
            .optional()
            .map_err(unavailable)
    }

    fn create_confirmation(&self, request: &ConfirmationRequest) -> StoreResult<()> {
        self.conn
            .execute(
                &format!(
                    "INSERT INTO confirmations ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    CONFIRMATION_COLUMNS
                ),
                params![
                    request.id.to_string(),
                    request.account_id,
                    request.purpose.as_str(),
                    request.redeemed,
                    request.redeemed_at,
                    request.created_at,
                ],
            )
            .map_err(|e| match e.sqlite_error_code() {
                Some(ErrorCode::ConstraintViolation) => BrokerError::AlreadyExists,
                _ => unavailable(e),
            })?;
        Ok(())
    }

    fn update_confirmation(&self, request: &ConfirmationRequest) -> StoreResult<()> {
        let rows = self
            .conn
            .execute(
                "UPDATE confirmations SET redeemed = ?2, redeemed_at = ?3 WHERE id = ?1",
                params![request.id.to_string(), request.redeemed, request.redeemed_at],
            )
            .map_err(unavailable)?;

        if rows == 0 {
            return Err(BrokerError::NotFound);
        }
        Ok(())
    }

    fn list_confirmations(&self, account_id: &str) -> StoreResult<Vec<ConfirmationRequest>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {} FROM confirmations WHERE account_id = ?1 ORDER BY created_at",
                CONFIRMATION_COLUMNS
            ))
            .map_err(unavailable)?;

        let rows = stmt
            .query_map(params![account_id], confirmation_from_row)
            .map_err(unavailable)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(unavailable)
    }
}

impl AccountRepo for SqliteStore {
    fn find_account(&self, id: &str) -> StoreResult<Option<Account>> {
        let conn = self.lock()?;
        SqliteRepo::new(&conn).find_account(id)
    }

    fn create_account(&self, account: &Account) -> StoreResult<()> {
        let conn = self.lock()?;
        SqliteRepo::new(&conn).create_account(account)
    }

    fn update_account(&self, account: &Account) -> StoreResult<()> {
        let conn = self.lock()?;
        SqliteRepo::new(&conn).update_account(account)
    }

    fn delete_account(&self, id: &str) -> StoreResult<()> {
        let conn = self.lock()?;
        SqliteRepo::new(&conn).delete_account(id)
    }

    fn find_confirmation(
        &self,
        id: &ConfirmationId,
        purpose: Purpose,
    ) -> StoreResult<Option<ConfirmationRequest>> {
        let conn = self.lock()?;
        SqliteRepo::new(&conn).find_confirmation(id, purpose)
    }

    fn create_confirmation(&self, request: &ConfirmationRequest) -> StoreResult<()> {
        let conn = self.lock()?;
        SqliteRepo::new(&conn).create_confirmation(request)
    }

    fn update_confirmation(&self, request: &ConfirmationRequest) -> StoreResult<()> {
        let conn = self.lock()?;
        SqliteRepo::new(&conn).update_confirmation(request)
    }

    fn list_confirmations(&self, account_id: &str) -> StoreResult<Vec<ConfirmationRequest>> {
        let conn = self.lock()?;
        SqliteRepo::new(&conn).list_confirmations(account_id)
    }
}

impl AccountStore for SqliteStore {
    fn with_transaction<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&dyn AccountRepo) -> StoreResult<T>,
    {
        let mut conn = self.lock()?;
        let tx = conn.transaction().map_err(unavailable)?;

        // Dropping `tx` without commit rolls back
        let out = f(&SqliteRepo::new(&tx))?;
        tx.commit().map_err(unavailable)?;
        Ok(out)
    }
}
