//! Sign-up provisioning
//!
//! Creating a user touches two systems: the auth service owns the account and
//! the directory owns the profile entry. The entry is written under bounded
//! retry; if that gives up the account is deleted again so no half-registered
//! user is left behind.

use std::sync::Arc;

use contracts::{
    AccountIdentity, AuthService, ContractError, DirectoryBackend, DirectoryEntry, RetryConfig,
};
use directory_sync::{retry, DirectorySession};
use tracing::{error, info, instrument, warn};

use crate::auth::AuthSession;
use crate::error::Result;

/// Outcome of a successful sign-up
#[derive(Debug, Clone, PartialEq)]
pub struct Provisioned {
    pub account: AccountIdentity,
    pub entry: DirectoryEntry,
}

pub struct Provisioner<A, B> {
    auth: Arc<AuthSession<A>>,
    directory: Arc<DirectorySession<B>>,
    retry: RetryConfig,
}

impl<A: AuthService, B: DirectoryBackend> Provisioner<A, B> {
    pub fn new(
        auth: Arc<AuthSession<A>>,
        directory: Arc<DirectorySession<B>>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            auth,
            directory,
            retry,
        }
    }

    /// Create account, sign in, then create the directory entry
    ///
    /// # Atomicity
    /// If the entry cannot be created within the retry budget the new account
    /// is deleted and `RetryExhausted` is returned.
    #[instrument(name = "provision_sign_up", skip(self, password))]
    pub async fn sign_up(&self, name: &str, email: &str, password: &str) -> Result<Provisioned> {
        let account = self.auth.create_account(email, password, name).await?;

        match self.create_entry(&account, name).await {
            Ok(entry) => {
                info!(account_id = %account.id, entry_id = %entry.id, "sign-up completed");
                Ok(Provisioned { account, entry })
            }
            Err(err) => {
                warn!(
                    account_id = %account.id,
                    error = %err,
                    "directory entry not created, removing account"
                );
                self.compensate(&account).await;
                Err(err.into())
            }
        }
    }

    /// Make sure a signed-in account has a directory entry
    ///
    /// Reuses a cached entry when present. The account is never deleted here.
    #[instrument(name = "provision_ensure_entry", skip(self, account), fields(account_id = %account.id))]
    pub async fn ensure_entry(&self, account: &AccountIdentity) -> Result<DirectoryEntry> {
        let existing = self
            .directory
            .state()
            .entries
            .iter()
            .find(|entry| entry.account_id == account.id)
            .cloned();

        match existing {
            Some(entry) => {
                self.directory.set_current_user(account.id.clone()).await;
                Ok(entry)
            }
            None => Ok(self.create_entry(account, &account.name).await?),
        }
    }

    async fn create_entry(
        &self,
        account: &AccountIdentity,
        name: &str,
    ) -> std::result::Result<DirectoryEntry, ContractError> {
        let template = DirectoryEntry::new("", account.id.clone(), name);
        retry("create directory entry", &self.retry, move |_| {
            self.directory.create_user(template.clone())
        })
        .await
    }

    /// Delete the account; failures are logged only
    async fn compensate(&self, account: &AccountIdentity) {
        match self.auth.service().delete_account(&account.id).await {
            Ok(()) => {
                info!(account_id = %account.id, "account removed after failed provisioning");
                self.auth.refresh().await;
            }
            Err(err) => {
                error!(
                    account_id = %account.id,
                    error = %err,
                    "failed to remove account after failed provisioning"
                );
            }
        }
    }
}
