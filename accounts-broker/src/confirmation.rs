//! Single-use confirmation codes for account creation and password reset
//!
//! A request moves `Issued -> Redeemed` exactly once and never expires.
//! Issuing a new request does not invalidate older ones of the same purpose.

use std::sync::Arc;

use accounts_core::ConfirmationTemplate;
use chrono::Utc;

use crate::error::BrokerError;
use crate::notifier::Notifier;
use crate::store::{
    normalize_id, Account, AccountRepo, AccountStatus, AccountStore, ConfirmationId,
    ConfirmationRequest, Purpose,
};

/// A rendered message waiting to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub to: String,
    pub subject: String,
    pub body: String,
}

pub struct ConfirmationWorkflow<S, N> {
    store: Arc<S>,
    notifier: Arc<N>,
    account_template: ConfirmationTemplate,
    reset_template: ConfirmationTemplate,
}

impl<S, N> ConfirmationWorkflow<S, N>
where
    S: AccountStore,
    N: Notifier,
{
    pub fn new(
        store: Arc<S>,
        notifier: Arc<N>,
        account_template: ConfirmationTemplate,
        reset_template: ConfirmationTemplate,
    ) -> Self {
        Self {
            store,
            notifier,
            account_template,
            reset_template,
        }
    }

    fn template(&self, purpose: Purpose) -> &ConfirmationTemplate {
        match purpose {
            Purpose::AccountCreation => &self.account_template,
            Purpose::PasswordReset => &self.reset_template,
        }
    }

    /// Issue a confirmation request and notify the account owner.
    ///
    /// The request row and the rendered body are committed together; the
    /// message is sent after commit. A send failure is reported as
    /// `NotifierUnavailable` and the request stays valid, so issuing again
    /// is always safe.
    pub fn issue(
        &self,
        account_id: &str,
        purpose: Purpose,
    ) -> Result<ConfirmationRequest, BrokerError> {
        let (request, notice) = self.store.with_transaction(|repo| {
            let account = repo
                .find_account(normalize_id(account_id))?
                .ok_or(BrokerError::NotFound)?;
            self.issue_in(repo, &account, purpose)
        })?;

        self.deliver(&notice)?;
        Ok(request)
    }

    /// Resend: issue another request of the same purpose
    pub fn reissue(
        &self,
        account_id: &str,
        purpose: Purpose,
    ) -> Result<ConfirmationRequest, BrokerError> {
        tracing::debug!(account = %account_id, purpose = ?purpose, "Reissuing confirmation");
        self.issue(account_id, purpose)
    }

    /// Persist a request for `account` through `repo` and render its notice
    pub fn issue_in(
        &self,
        repo: &dyn AccountRepo,
        account: &Account,
        purpose: Purpose,
    ) -> Result<(ConfirmationRequest, Notice), BrokerError> {
        let request = ConfirmationRequest::new(account.id.clone(), purpose);
        repo.create_confirmation(&request)?;

        let body = self
            .template(purpose)
            .render_for(&account.name, &request.id.to_string())?;

        tracing::info!(account = %account.id, purpose = ?purpose, "Confirmation issued");

        let notice = Notice {
            to: account.id.clone(),
            subject: purpose.subject().to_string(),
            body,
        };
        Ok((request, notice))
    }

    /// Send a rendered notice
    pub fn deliver(&self, notice: &Notice) -> Result<(), BrokerError> {
        self.notifier
            .send(
                &notice.to,
                self.notifier.sender_alias(),
                &notice.subject,
                &notice.body,
            )
            .map_err(|e| {
                tracing::warn!(to = %notice.to, error = %e, "Notification not sent");
                BrokerError::NotifierUnavailable(e)
            })
    }

    /// Redeem a request and return the owning account's identifier.
    ///
    /// For `AccountCreation` the account is marked `Confirmed` in the same
    /// transaction.
    pub fn redeem(&self, request_id: &ConfirmationId, purpose: Purpose) -> Result<String, BrokerError> {
        let request = self
            .store
            .with_transaction(|repo| self.redeem_in(repo, request_id, purpose))?;
        Ok(request.account_id)
    }

    pub fn redeem_in(
        &self,
        repo: &dyn AccountRepo,
        request_id: &ConfirmationId,
        purpose: Purpose,
    ) -> Result<ConfirmationRequest, BrokerError> {
        let mut request = repo
            .find_confirmation(request_id, purpose)?
            .ok_or(BrokerError::NotFound)?;

        if request.redeemed {
            return Err(BrokerError::AlreadyRedeemed);
        }

        let now = Utc::now();
        request.redeemed = true;
        request.redeemed_at = Some(now);
        repo.update_confirmation(&request)?;

        if purpose == Purpose::AccountCreation {
            let mut account = repo
                .find_account(&request.account_id)?
                .ok_or(BrokerError::NotFound)?;
            if account.status != AccountStatus::Confirmed {
                account.status = AccountStatus::Confirmed;
                account.updated_at = now;
                repo.update_account(&account)?;
            }
        }

        tracing::info!(
            account = %request.account_id,
            purpose = ?purpose,
            "Confirmation redeemed"
        );
        Ok(request)
    }
}
