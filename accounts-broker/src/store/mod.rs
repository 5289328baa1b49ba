//! Storage abstractions for accounts and confirmation requests

pub mod memory;
pub mod models;
pub mod sqlite;

pub use memory::InMemoryAccountStore;
pub use models::*;
pub use sqlite::SqliteStore;

use crate::error::BrokerError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, BrokerError>;

/// Account and confirmation persistence.
///
/// Implemented by the stores themselves (each call is its own unit of work)
/// and by the handle passed into [`AccountStore::with_transaction`].
pub trait AccountRepo {
    /// Get an account by identifier
    fn find_account(&self, id: &str) -> StoreResult<Option<Account>>;

    /// Insert a new account. Fails with `AlreadyExists` on a duplicate id.
    fn create_account(&self, account: &Account) -> StoreResult<()>;

    /// Overwrite an existing account. Fails with `NotFound` if absent.
    fn update_account(&self, account: &Account) -> StoreResult<()>;

    /// Remove an account. Its confirmation requests are kept.
    fn delete_account(&self, id: &str) -> StoreResult<()>;

    /// Get a confirmation request matching both id and purpose
    fn find_confirmation(
        &self,
        id: &ConfirmationId,
        purpose: Purpose,
    ) -> StoreResult<Option<ConfirmationRequest>>;

    /// Insert a new confirmation request
    fn create_confirmation(&self, request: &ConfirmationRequest) -> StoreResult<()>;

    /// Overwrite an existing confirmation request
    fn update_confirmation(&self, request: &ConfirmationRequest) -> StoreResult<()>;

    /// All confirmation requests of an account, oldest first
    fn list_confirmations(&self, account_id: &str) -> StoreResult<Vec<ConfirmationRequest>>;
}

/// A shared account store with transactional groups of writes
pub trait AccountStore: AccountRepo + Send + Sync {
    /// Run `f` as one atomic unit of work.
    ///
    /// Writes made through the handle become visible only if `f` returns
    /// `Ok`; on `Err` nothing is persisted. Transactions are serialized.
    fn with_transaction<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&dyn AccountRepo) -> StoreResult<T>;
}
