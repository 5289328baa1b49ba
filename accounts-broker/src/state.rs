//! Application state and the operations exposed to the routing layer
//!
//! `AppState` wires the three core components together. Anonymous
//! operations go straight to `AccountService` / `ConfirmationWorkflow`;
//! protected ones are gated by `SessionManager` in the route handlers.

use std::sync::Arc;

use accounts_core::{ConfirmationTemplate, SigningKey};

use crate::accounts::AccountService;
use crate::config::Config;
use crate::confirmation::ConfirmationWorkflow;
use crate::error::BrokerError;
use crate::notifier::Notifier;
use crate::session::{IssuedToken, SessionManager};
use crate::store::{
    Account, AccountStatus, AccountStore, ConfirmationId, ConfirmationRequest, Purpose,
};

pub struct AppState<S, N> {
    pub store: Arc<S>,
    pub accounts: AccountService<S>,
    pub confirmations: ConfirmationWorkflow<S, N>,
    pub sessions: SessionManager,
    /// Refuse login while the account is `PendingConfirmation`
    pub require_confirmed_login: bool,
}

impl<S, N> AppState<S, N>
where
    S: AccountStore,
    N: Notifier,
{
    /// Build state with the bundled confirmation and reset mail bodies
    pub fn new(
        config: &Config,
        signing_key: SigningKey,
        store: S,
        notifier: N,
    ) -> Result<Self, BrokerError> {
        Self::with_templates(
            config,
            signing_key,
            store,
            notifier,
            ConfirmationTemplate::account_confirmation(config.confirm_account_url.clone())?,
            ConfirmationTemplate::password_reset(config.confirm_reset_url.clone())?,
        )
    }

    pub fn with_templates(
        config: &Config,
        signing_key: SigningKey,
        store: S,
        notifier: N,
        account_template: ConfirmationTemplate,
        reset_template: ConfirmationTemplate,
    ) -> Result<Self, BrokerError> {
        let store = Arc::new(store);
        let notifier = Arc::new(notifier);

        let accounts = AccountService::new(
            Arc::clone(&store),
            config.hash_scheme.hasher(),
            config.password_policy,
            config.password_validity()?,
        );
        let confirmations = ConfirmationWorkflow::new(
            Arc::clone(&store),
            notifier,
            account_template,
            reset_template,
        );
        let sessions = SessionManager::new(signing_key, config.session_duration()?);

        Ok(Self {
            store,
            accounts,
            confirmations,
            sessions,
            require_confirmed_login: config.require_confirmed_login,
        })
    }

    /// Create an account and send its confirmation code.
    ///
    /// The account and its first confirmation request commit together. If
    /// the notice cannot be sent the account stays `PendingConfirmation`
    /// with a valid request, and `resend_confirmation` can be retried.
    pub fn register(
        &self,
        id: &str,
        name: &str,
        surname: &str,
        password: &str,
    ) -> Result<ConfirmationRequest, BrokerError> {
        let account = self.accounts.new_account(id, name, surname, password)?;

        let (request, notice) = self.store.with_transaction(|repo| {
            self.accounts.create_in(repo, &account)?;
            self.confirmations
                .issue_in(repo, &account, Purpose::AccountCreation)
        })?;

        self.confirmations.deliver(&notice)?;
        Ok(request)
    }

    /// Redeem an account-creation code, confirming the account
    pub fn redeem_confirmation(&self, request_id: &ConfirmationId) -> Result<String, BrokerError> {
        self.confirmations
            .redeem(request_id, Purpose::AccountCreation)
    }

    /// Send another account-creation code
    pub fn resend_confirmation(&self, account_id: &str) -> Result<ConfirmationRequest, BrokerError> {
        let account = self.accounts.get(account_id)?;
        if account.status == AccountStatus::Confirmed {
            return Err(BrokerError::InvalidInput("account is already confirmed".into()));
        }
        self.confirmations
            .reissue(account_id, Purpose::AccountCreation)
    }

    /// Issue a password-reset code
    pub fn request_password_reset(&self, account_id: &str) -> Result<ConfirmationRequest, BrokerError> {
        self.confirmations.issue(account_id, Purpose::PasswordReset)
    }

    /// Redeem a password-reset code and set the new password atomically
    pub fn redeem_password_reset(
        &self,
        request_id: &ConfirmationId,
        new_password: &str,
    ) -> Result<String, BrokerError> {
        self.accounts.policy().check(new_password)?;

        self.store.with_transaction(|repo| {
            let request = self
                .confirmations
                .redeem_in(repo, request_id, Purpose::PasswordReset)?;
            self.accounts
                .set_password_in(repo, &request.account_id, new_password, false)?;
            Ok(request.account_id)
        })
    }

    /// Replace a password after verifying the current one.
    ///
    /// Only the digest is checked, so an account whose password has expired
    /// can still change it.
    pub fn change_password(
        &self,
        account_id: &str,
        current_password: &str,
        new_password: &str,
        new_password_confirm: &str,
    ) -> Result<(), BrokerError> {
        if new_password != new_password_confirm {
            return Err(BrokerError::InvalidInput("passwords do not match".into()));
        }
        self.accounts.check_password(account_id, current_password)?;
        self.accounts.policy().check(new_password)?;
        self.accounts.set_password(account_id, new_password, false)
    }

    /// Verify credentials and mint a session token
    pub fn login(&self, account_id: &str, password: &str) -> Result<IssuedToken, BrokerError> {
        let account = self.accounts.verify_credentials(account_id, password)?;

        if self.require_confirmed_login && account.status != AccountStatus::Confirmed {
            return Err(BrokerError::ConfirmationRequired);
        }

        tracing::info!(account = %account.id, "Login");
        self.sessions.issue(&account.id)
    }

    /// Hand back an already-expired token
    pub fn logout(&self) -> Result<IssuedToken, BrokerError> {
        self.sessions.revoke()
    }

    /// Who is calling, without extending the session
    pub fn validate_session(&self, token: &str) -> Result<String, BrokerError> {
        self.sessions.extract_subject(token)
    }

    /// The caller's account, looked up by session subject
    pub fn account(&self, account_id: &str) -> Result<Account, BrokerError> {
        self.accounts.get(account_id)
    }

    /// Delete an account after re-checking its password
    pub fn cancel_account(&self, account_id: &str, password: &str) -> Result<(), BrokerError> {
        self.accounts.check_password(account_id, password)?;
        self.accounts.delete(account_id)
    }
}
