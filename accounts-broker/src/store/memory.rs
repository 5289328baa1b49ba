//! In-memory storage implementation

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::RwLock;

use super::{
    Account, AccountRepo, AccountStore, ConfirmationId, ConfirmationRequest, Purpose, StoreResult,
};
use crate::error::BrokerError;

#[derive(Debug, Clone, Default)]
struct Tables {
    accounts: HashMap<String, Account>,
    confirmations: HashMap<ConfirmationId, ConfirmationRequest>,
}

impl Tables {
    fn find_account(&self, id: &str) -> Option<Account> {
        self.accounts.get(id).cloned()
    }

    fn create_account(&mut self, account: &Account) -> StoreResult<()> {
        if self.accounts.contains_key(&account.id) {
            return Err(BrokerError::AlreadyExists);
        }
        self.accounts.insert(account.id.clone(), account.clone());
        Ok(())
    }

    fn update_account(&mut self, account: &Account) -> StoreResult<()> {
        match self.accounts.get_mut(&account.id) {
            Some(existing) => {
                *existing = account.clone();
                Ok(())
            }
            None => Err(BrokerError::NotFound),
        }
    }

    fn delete_account(&mut self, id: &str) -> StoreResult<()> {
        self.accounts
            .remove(id)
            .map(|_| ())
            .ok_or(BrokerError::NotFound)
    }

    fn find_confirmation(
        &self,
        id: &ConfirmationId,
        purpose: Purpose,
    ) -> Option<ConfirmationRequest> {
        self.confirmations
            .get(id)
            .filter(|c| c.purpose == purpose)
            .cloned()
    }

    fn create_confirmation(&mut self, request: &ConfirmationRequest) -> StoreResult<()> {
        if self.confirmations.contains_key(&request.id) {
            return Err(BrokerError::AlreadyExists);
        }
        self.confirmations.insert(request.id, request.clone());
        Ok(())
    }

    fn update_confirmation(&mut self, request: &ConfirmationRequest) -> StoreResult<()> {
        match self.confirmations.get_mut(&request.id) {
            Some(existing) => {
                *existing = request.clone();
                Ok(())
            }
            None => Err(BrokerError::NotFound),
        }
    }

    fn list_confirmations(&self, account_id: &str) -> Vec<ConfirmationRequest> {
        let mut list: Vec<_> = self
            .confirmations
            .values()
            .filter(|c| c.account_id == account_id)
            .cloned()
            .collect();
        list.sort_by_key(|c| c.created_at);
        list
    }
}

fn poisoned<E>(_: E) -> BrokerError {
    BrokerError::StoreUnavailable("in-memory store lock poisoned".to_string())
}

/// In-memory account store
pub struct InMemoryAccountStore {
    tables: RwLock<Tables>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }
}

impl Default for InMemoryAccountStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountRepo for InMemoryAccountStore {
    fn find_account(&self, id: &str) -> StoreResult<Option<Account>> {
        Ok(self.tables.read().map_err(poisoned)?.find_account(id))
    }

    fn create_account(&self, account: &Account) -> StoreResult<()> {
        self.tables.write().map_err(poisoned)?.create_account(account)
    }

    fn update_account(&self, account: &Account) -> StoreResult<()> {
        self.tables.write().map_err(poisoned)?.update_account(account)
    }

    fn delete_account(&self, id: &str) -> StoreResult<()> {
        self.tables.write().map_err(poisoned)?.delete_account(id)
    }

    fn find_confirmation(
        &self,
        id: &ConfirmationId,
        purpose: Purpose,
    ) -> StoreResult<Option<ConfirmationRequest>> {
        Ok(self
            .tables
            .read()
            .map_err(poisoned)?
            .find_confirmation(id, purpose))
    }

    fn create_confirmation(&self, request: &ConfirmationRequest) -> StoreResult<()> {
        self.tables
            .write()
            .map_err(poisoned)?
            .create_confirmation(request)
    }

    fn update_confirmation(&self, request: &ConfirmationRequest) -> StoreResult<()> {
        self.tables
            .write()
            .map_err(poisoned)?
            .update_confirmation(request)
    }

    fn list_confirmations(&self, account_id: &str) -> StoreResult<Vec<ConfirmationRequest>> {
        Ok(self
            .tables
            .read()
            .map_err(poisoned)?
            .list_confirmations(account_id))
    }
}

/// Copy of the tables that a transaction writes to
struct Staged {
    tables: RefCell<Tables>,
}

impl AccountRepo for Staged {
    fn find_account(&self, id: &str) -> StoreResult<Option<Account>> {
        Ok(self.tables.borrow().find_account(id))
    }

    fn create_account(&self, account: &Account) -> StoreResult<()> {
        self.tables.borrow_mut().create_account(account)
    }

    fn update_account(&self, account: &Account) -> StoreResult<()> {
        self.tables.borrow_mut().update_account(account)
    }

    fn delete_account(&self, id: &str) -> StoreResult<()> {
        self.tables.borrow_mut().delete_account(id)
    }

    fn find_confirmation(
        &self,
        id: &ConfirmationId,
        purpose: Purpose,
    ) -> StoreResult<Option<ConfirmationRequest>> {
        Ok(self.tables.borrow().find_confirmation(id, purpose))
    }

    fn create_confirmation(&self, request: &ConfirmationRequest) -> StoreResult<()> {
        self.tables.borrow_mut().create_confirmation(request)
    }

    fn update_confirmation(&self, request: &ConfirmationRequest) -> StoreResult<()> {
        self.tables.borrow_mut().update_confirmation(request)
    }

    fn list_confirmations(&self, account_id: &str) -> StoreResult<Vec<ConfirmationRequest>> {
        Ok(self.tables.borrow().list_confirmations(account_id))
    }
}

impl AccountStore for InMemoryAccountStore {
    fn with_transaction<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&dyn AccountRepo) -> StoreResult<T>,
    {
        // Holding the write lock for the whole unit serializes transactions.
        // The staged copy is the full table set, so each transaction costs
        // O(rows); this store is meant for development and tests.
        let mut tables = self.tables.write().map_err(poisoned)?;
        let staged = Staged {
            tables: RefCell::new(tables.clone()),
        };

        let out = f(&staged)?;
        *tables = staged.tables.into_inner();
        Ok(out)
    }
}
