//! Account lifecycle: creation, credential checks and password replacement
//!
//! This component never touches session tokens.

use std::sync::Arc;

use accounts_core::{PasswordHasher, PasswordPolicy};
use chrono::{DateTime, Duration, Utc};

use crate::error::BrokerError;
use crate::store::{normalize_id, Account, AccountRepo, AccountStatus, AccountStore};

/// Default password validity window
pub const DEFAULT_PASSWORD_VALIDITY_DAYS: i64 = 30;

pub struct AccountService<S> {
    store: Arc<S>,
    hasher: Box<dyn PasswordHasher>,
    policy: PasswordPolicy,
    /// Zero means passwords never expire
    password_validity: Duration,
}

impl<S: AccountStore> AccountService<S> {
    pub fn new(
        store: Arc<S>,
        hasher: Box<dyn PasswordHasher>,
        policy: PasswordPolicy,
        password_validity: Duration,
    ) -> Self {
        Self {
            store,
            hasher,
            policy,
            password_validity,
        }
    }

    pub fn policy(&self) -> &PasswordPolicy {
        &self.policy
    }

    /// Validate registration input and build the account to persist
    pub fn new_account(
        &self,
        id: &str,
        name: &str,
        surname: &str,
        password: &str,
    ) -> Result<Account, BrokerError> {
        let id = normalize_id(id);
        if id.is_empty() {
            return Err(BrokerError::InvalidInput("an email address is required".into()));
        }
        if name.trim().is_empty() {
            return Err(BrokerError::InvalidInput("a name is required".into()));
        }
        self.policy.check(password)?;

        let now = Utc::now();
        Ok(Account {
            id: id.to_string(),
            name: name.trim().to_string(),
            surname: surname.trim().to_string(),
            password_digest: self.hasher.digest(password)?,
            must_reset_on_next_login: false,
            status: AccountStatus::PendingConfirmation,
            password_updated_at: now,
            created_at: now,
            updated_at: now,
        })
    }

    /// Persist a new account through `repo`
    pub fn create_in(&self, repo: &dyn AccountRepo, account: &Account) -> Result<(), BrokerError> {
        if repo.find_account(&account.id)?.is_some() {
            return Err(BrokerError::AlreadyExists);
        }
        repo.create_account(account)?;
        tracing::info!(account = %account.id, "Account created");
        Ok(())
    }

    /// Get an account by identifier
    pub fn get(&self, id: &str) -> Result<Account, BrokerError> {
        self.store
            .find_account(normalize_id(id))?
            .ok_or(BrokerError::NotFound)
    }

    /// Remove an account (administrative)
    pub fn delete(&self, id: &str) -> Result<(), BrokerError> {
        let id = normalize_id(id);
        self.store.delete_account(id)?;
        tracing::info!(account = %id, "Account deleted");
        Ok(())
    }

    /// Check a password against the stored digest only, ignoring freshness
    pub fn check_password(&self, id: &str, password: &str) -> Result<Account, BrokerError> {
        let account = self
            .store
            .find_account(normalize_id(id))?
            .ok_or(BrokerError::AuthenticationFailed)?;

        if !self.hasher.compare(password, &account.password_digest)? {
            return Err(BrokerError::AuthenticationFailed);
        }
        Ok(account)
    }

    /// Verify credentials and the password-freshness policy
    pub fn verify_credentials(&self, id: &str, password: &str) -> Result<Account, BrokerError> {
        self.verify_credentials_at(id, password, Utc::now())
    }

    pub fn verify_credentials_at(
        &self,
        id: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<Account, BrokerError> {
        let account = self.check_password(id, password)?;

        if account.must_reset_on_next_login {
            tracing::debug!(account = %id, "Password reset forced");
            return Err(BrokerError::PasswordResetRequired);
        }
        if !self.is_password_current(&account, now) {
            tracing::debug!(account = %id, "Password expired");
            return Err(BrokerError::PasswordResetRequired);
        }

        Ok(account)
    }

    /// Whether the account's password is inside the validity window at `now`
    pub fn is_password_current(&self, account: &Account, now: DateTime<Utc>) -> bool {
        if self.password_validity <= Duration::zero() {
            return true;
        }
        // A deadline past the calendar's end never arrives
        match account
            .password_updated_at
            .checked_add_signed(self.password_validity)
        {
            Some(deadline) => now < deadline,
            None => true,
        }
    }

    /// Replace an account's password. The old password is not checked.
    pub fn set_password(
        &self,
        id: &str,
        new_password: &str,
        force_reset_next: bool,
    ) -> Result<(), BrokerError> {
        self.store
            .with_transaction(|repo| self.set_password_in(repo, id, new_password, force_reset_next))
    }

    pub fn set_password_in(
        &self,
        repo: &dyn AccountRepo,
        id: &str,
        new_password: &str,
        force_reset_next: bool,
    ) -> Result<(), BrokerError> {
        let id = normalize_id(id);
        let mut account = repo.find_account(id)?.ok_or(BrokerError::NotFound)?;

        let now = Utc::now();
        account.password_digest = self.hasher.digest(new_password)?;
        account.password_updated_at = now;
        account.must_reset_on_next_login = force_reset_next;
        account.updated_at = now;
        repo.update_account(&account)?;

        tracing::info!(account = %id, force_reset_next, "Password replaced");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryAccountStore;
    use accounts_core::Sha256Hasher;

    fn service(validity: Duration) -> AccountService<InMemoryAccountStore> {
        AccountService::new(
            Arc::new(InMemoryAccountStore::new()),
            Box::new(Sha256Hasher),
            PasswordPolicy::default(),
            validity,
        )
    }

    fn register(
        accounts: &AccountService<InMemoryAccountStore>,
        id: &str,
        name: &str,
        password: &str,
    ) -> Result<Account, BrokerError> {
        let account = accounts.new_account(id, name, "Lu", password)?;
        accounts
            .store
            .with_transaction(|repo| accounts.create_in(repo, &account))?;
        Ok(account)
    }

    #[test]
    fn test_register_validates_input() {
        let accounts = service(Duration::days(30));

        assert!(matches!(
            register(&accounts, "", "Ana", "pw123"),
            Err(BrokerError::InvalidInput(_))
        ));
        assert!(matches!(
            register(&accounts, "a@x.com", " ", "pw123"),
            Err(BrokerError::InvalidInput(_))
        ));
        assert!(matches!(
            register(&accounts, "a@x.com", "Ana", ""),
            Err(BrokerError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_register_stores_digest_not_cleartext() {
        let accounts = service(Duration::days(30));
        let account = register(&accounts, "a@x.com", "Ana", "pw123").unwrap();

        assert_ne!(account.password_digest, "pw123");
        assert_eq!(account.status, AccountStatus::PendingConfirmation);
        assert!(!account.must_reset_on_next_login);
        assert!(matches!(
            register(&accounts, "a@x.com", "Otra", "pw456"),
            Err(BrokerError::AlreadyExists)
        ));
    }

    #[test]
    fn test_unknown_account_and_wrong_password_look_the_same() {
        let accounts = service(Duration::days(30));
        register(&accounts, "a@x.com", "Ana", "pw123").unwrap();

        assert!(matches!(
            accounts.verify_credentials("nobody@x.com", "pw123"),
            Err(BrokerError::AuthenticationFailed)
        ));
        assert!(matches!(
            accounts.verify_credentials("a@x.com", "wrong"),
            Err(BrokerError::AuthenticationFailed)
        ));
        assert!(accounts.verify_credentials("a@x.com", "pw123").is_ok());
    }

    #[test]
    fn test_password_age_boundary() {
        let accounts = service(Duration::hours(24));
        let account = register(&accounts, "a@x.com", "Ana", "pw123").unwrap();
        let updated = account.password_updated_at;

        let stale = updated + Duration::hours(24) + Duration::seconds(1);
        assert!(matches!(
            accounts.verify_credentials_at("a@x.com", "pw123", stale),
            Err(BrokerError::PasswordResetRequired)
        ));

        let fresh = updated + Duration::hours(23) + Duration::minutes(59) + Duration::seconds(59);
        assert!(accounts.verify_credentials_at("a@x.com", "pw123", fresh).is_ok());
    }

    #[test]
    fn test_zero_validity_never_expires() {
        let accounts = service(Duration::zero());
        let account = register(&accounts, "a@x.com", "Ana", "pw123").unwrap();

        let much_later = account.password_updated_at + Duration::days(3650);
        assert!(accounts
            .verify_credentials_at("a@x.com", "pw123", much_later)
            .is_ok());
    }

    #[test]
    fn test_forced_reset_then_cleared() {
        let accounts = service(Duration::days(30));
        register(&accounts, "a@x.com", "Ana", "pw123").unwrap();

        accounts.set_password("a@x.com", "temp", true).unwrap();
        assert!(matches!(
            accounts.verify_credentials("a@x.com", "temp"),
            Err(BrokerError::PasswordResetRequired)
        ));

        accounts.set_password("a@x.com", "final", false).unwrap();
        assert!(accounts.verify_credentials("a@x.com", "final").is_ok());
        assert!(matches!(
            accounts.verify_credentials("a@x.com", "pw123"),
            Err(BrokerError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_validity_past_calendar_end_never_expires() {
        let accounts = service(Duration::try_days(200_000_000).unwrap());
        register(&accounts, "a@x.com", "Ana", "pw123").unwrap();

        assert!(accounts.verify_credentials("a@x.com", "pw123").is_ok());
    }

    #[test]
    fn test_padded_identifier_is_normalized() {
        let accounts = service(Duration::days(30));
        let account = register(&accounts, " a@x.com ", "Ana", "pw123").unwrap();
        assert_eq!(account.id, "a@x.com");

        assert!(accounts.verify_credentials(" a@x.com ", "pw123").is_ok());
        assert!(accounts.verify_credentials("a@x.com", "pw123").is_ok());
        assert_eq!(accounts.get("	a@x.com").unwrap().id, "a@x.com");

        accounts.set_password(" a@x.com", "newpw", false).unwrap();
        assert!(accounts.verify_credentials("a@x.com", "newpw").is_ok());

        accounts.delete("a@x.com ").unwrap();
        assert!(matches!(accounts.get("a@x.com"), Err(BrokerError::NotFound)));
    }

    #[test]
    fn test_set_password_unknown_account() {
        let accounts = service(Duration::days(30));
        assert!(matches!(
            accounts.set_password("ghost@x.com", "pw", false),
            Err(BrokerError::NotFound)
        ));
    }
}
