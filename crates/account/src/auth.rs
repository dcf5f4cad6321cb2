//! Auth session state
//!
//! Wraps an [`AuthService`] and publishes who is signed in.

use std::sync::Arc;

use contracts::{AccountIdentity, AuthService, ContractError};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::error::{AccountError, Result};

/// Published sign-in state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub logged_in: bool,
    pub account: Option<AccountIdentity>,
    pub last_error: Option<String>,
}

pub struct AuthSession<A> {
    service: Arc<A>,
    state_tx: watch::Sender<AuthState>,
}

impl<A: AuthService> AuthSession<A> {
    pub fn new(service: Arc<A>) -> Self {
        let (state_tx, _) = watch::channel(AuthState::default());
        Self { service, state_tx }
    }

    pub fn service(&self) -> &Arc<A> {
        &self.service
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state_tx.subscribe()
    }

    pub fn state(&self) -> AuthState {
        self.state_tx.borrow().clone()
    }

    pub fn current_account(&self) -> Option<AccountIdentity> {
        self.state_tx.borrow().account.clone()
    }

    /// Restore a session that may already exist
    pub async fn initialize(&self) -> Option<AccountIdentity> {
        self.refresh().await
    }

    /// Re-read the active account
    ///
    /// Any failure counts as logged out.
    #[instrument(name = "auth_refresh", skip(self))]
    pub async fn refresh(&self) -> Option<AccountIdentity> {
        match self.service.get_account().await {
            Ok(Some(account)) => {
                debug!(account_id = %account.id, "session restored");
                self.signed_in(account.clone());
                Some(account)
            }
            Ok(None) => {
                self.signed_out(None);
                None
            }
            Err(err) => {
                debug!(error = %err, "no usable session");
                self.signed_out(None);
                None
            }
        }
    }

    #[instrument(name = "auth_login", skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<AccountIdentity> {
        let result = async {
            self.service.create_session(email, password).await?;
            self.service
                .get_account()
                .await?
                .ok_or_else(|| ContractError::auth("session opened but no account returned"))
        }
        .await;

        match result {
            Ok(account) => {
                info!(account_id = %account.id, "signed in");
                self.signed_in(account.clone());
                Ok(account)
            }
            Err(err) => {
                warn!(error = %err, "sign in failed");
                let err = AccountError::login(email, err.to_string());
                self.signed_out(Some(err.to_string()));
                Err(err)
            }
        }
    }

    #[instrument(name = "auth_login_anonymous", skip(self))]
    pub async fn login_anonymous(&self) -> Result<AccountIdentity> {
        let result = async {
            self.service.create_anonymous_session().await?;
            self.service
                .get_account()
                .await?
                .ok_or_else(|| ContractError::auth("anonymous session has no account"))
        }
        .await;

        match result {
            Ok(account) => {
                info!(account_id = %account.id, "signed in anonymously");
                self.signed_in(account.clone());
                Ok(account)
            }
            Err(err) => {
                self.signed_out(Some(err.to_string()));
                Err(err.into())
            }
        }
    }

    #[instrument(name = "auth_logout", skip(self))]
    pub async fn logout(&self) -> Result<()> {
        if !self.state_tx.borrow().logged_in {
            return Err(AccountError::NotLoggedIn);
        }
        match self.service.delete_session().await {
            Ok(()) => {
                info!("signed out");
                self.signed_out(None);
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "sign out failed");
                self.state_tx
                    .send_modify(|state| state.last_error = Some(err.to_string()));
                Err(err.into())
            }
        }
    }

    /// Create an account and sign into it
    #[instrument(name = "auth_create_account", skip(self, password))]
    pub async fn create_account(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<AccountIdentity> {
        if let Err(err) = self.service.create_account(email, password, name).await {
            warn!(error = %err, "account creation failed");
            let err = AccountError::account_creation(email, err.to_string());
            self.state_tx
                .send_modify(|state| state.last_error = Some(err.to_string()));
            return Err(err);
        }
        self.login(email, password).await
    }

    fn signed_in(&self, account: AccountIdentity) {
        self.state_tx.send_replace(AuthState {
            logged_in: true,
            account: Some(account),
            last_error: None,
        });
    }

    fn signed_out(&self, last_error: Option<String>) {
        self.state_tx.send_replace(AuthState {
            logged_in: false,
            account: None,
            last_error,
        });
    }
}
