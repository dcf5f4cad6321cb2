//! Mock auth service
//!
//! In-memory accounts and a single active session, with failure injection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{AccountId, AccountIdentity, AuthService, ContractError};
use tracing::{debug, instrument};

/// Auth operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthOp {
    GetAccount,
    CreateAccount,
    CreateSession,
    DeleteSession,
    AnonymousSession,
    DeleteAccount,
}

#[derive(Debug)]
struct StoredAccount {
    identity: AccountIdentity,
    password: String,
}

#[derive(Debug, Default)]
struct AuthState {
    accounts: Vec<StoredAccount>,
    session: Option<AccountId>,
    failures: HashMap<AuthOp, u32>,
    calls: HashMap<AuthOp, u32>,
}

/// Cloning shares accounts and the active session
#[derive(Debug, Clone, Default)]
pub struct MockAuthService {
    state: Arc<Mutex<AuthState>>,
    next_id: Arc<AtomicU32>,
}

impl MockAuthService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account without opening a session
    pub fn with_account(self, email: &str, password: &str, name: &str) -> Self {
        let identity = self.allocate(email, name);
        self.lock().accounts.push(StoredAccount {
            identity,
            password: password.to_string(),
        });
        self
    }

    /// Register an account with a known id
    pub fn with_identity(self, identity: AccountIdentity, password: &str) -> Self {
        self.lock().accounts.push(StoredAccount {
            identity,
            password: password.to_string(),
        });
        self
    }

    /// Fail the next `times` calls of `op`
    pub fn fail_next(&self, op: AuthOp, times: u32) {
        self.lock().failures.insert(op, times);
    }

    pub fn call_count(&self, op: AuthOp) -> u32 {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn accounts(&self) -> Vec<AccountIdentity> {
        self.lock()
            .accounts
            .iter()
            .map(|stored| stored.identity.clone())
            .collect()
    }

    pub fn active_session(&self) -> Option<AccountId> {
        self.lock().session.clone()
    }

    fn lock(&self) -> MutexGuard<'_, AuthState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn allocate(&self, email: &str, name: &str) -> AccountIdentity {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        AccountIdentity {
            id: AccountId::from(format!("acc-{n}")),
            email: email.to_string(),
            name: name.to_string(),
        }
    }

    fn enter(&self, state: &mut AuthState, op: AuthOp) -> Result<(), ContractError> {
        *state.calls.entry(op).or_default() += 1;
        if let Some(remaining) = state.failures.get_mut(&op) {
            if *remaining > 0 {
                *remaining -= 1;
                debug!(?op, remaining = *remaining, "injected failure");
                return Err(ContractError::transport(format!("mock {op:?} failure")));
            }
        }
        Ok(())
    }
}

impl AuthService for MockAuthService {
    #[instrument(name = "mock_get_account", skip(self))]
    async fn get_account(&self) -> Result<Option<AccountIdentity>, ContractError> {
        let mut state = self.lock();
        self.enter(&mut state, AuthOp::GetAccount)?;
        let Some(active) = state.session.clone() else {
            return Ok(None);
        };
        Ok(state
            .accounts
            .iter()
            .find(|stored| stored.identity.id == active)
            .map(|stored| stored.identity.clone()))
    }

    #[instrument(name = "mock_create_account", skip(self, password))]
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<AccountIdentity, ContractError> {
        let mut state = self.lock();
        self.enter(&mut state, AuthOp::CreateAccount)?;
        if state
            .accounts
            .iter()
            .any(|stored| stored.identity.email == email)
        {
            return Err(ContractError::auth(format!(
                "account with email '{email}' already exists"
            )));
        }

        let identity = self.allocate(email, name);
        state.accounts.push(StoredAccount {
            identity: identity.clone(),
            password: password.to_string(),
        });
        Ok(identity)
    }

    #[instrument(name = "mock_create_session", skip(self, password))]
    async fn create_session(&self, email: &str, password: &str) -> Result<(), ContractError> {
        let mut state = self.lock();
        self.enter(&mut state, AuthOp::CreateSession)?;
        let id = state
            .accounts
            .iter()
            .find(|stored| stored.identity.email == email && stored.password == password)
            .map(|stored| stored.identity.id.clone())
            .ok_or_else(|| ContractError::auth("invalid credentials"))?;
        state.session = Some(id);
        Ok(())
    }

    #[instrument(name = "mock_delete_session", skip(self))]
    async fn delete_session(&self) -> Result<(), ContractError> {
        let mut state = self.lock();
        self.enter(&mut state, AuthOp::DeleteSession)?;
        match state.session.take() {
            Some(_) => Ok(()),
            None => Err(ContractError::auth("no active session")),
        }
    }

    #[instrument(name = "mock_create_anonymous_session", skip(self))]
    async fn create_anonymous_session(&self) -> Result<(), ContractError> {
        let mut state = self.lock();
        self.enter(&mut state, AuthOp::AnonymousSession)?;
        let identity = self.allocate("", "");
        state.session = Some(identity.id.clone());
        state.accounts.push(StoredAccount {
            identity,
            password: String::new(),
        });
        Ok(())
    }

    #[instrument(name = "mock_delete_account", skip(self), fields(id = %id))]
    async fn delete_account(&self, id: &AccountId) -> Result<(), ContractError> {
        let mut state = self.lock();
        self.enter(&mut state, AuthOp::DeleteAccount)?;
        let index = state
            .accounts
            .iter()
            .position(|stored| stored.identity.id == *id)
            .ok_or_else(|| ContractError::not_found("account", id.as_str()))?;
        state.accounts.remove(index);
        if state.session.as_ref() == Some(id) {
            state.session = None;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_login_roundtrip() {
        let auth = MockAuthService::new().with_account("ada@example.test", "pw", "Ada");
        assert!(auth.get_account().await.unwrap().is_none());

        auth.create_session("ada@example.test", "pw").await.unwrap();
        let account = auth.get_account().await.unwrap().unwrap();
        assert_eq!(account.name, "Ada");

        auth.delete_session().await.unwrap();
        assert!(auth.get_account().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_known_identity() {
        let identity = AccountIdentity {
            id: AccountId::new("acc-ada"),
            email: "ada@example.test".into(),
            name: "Ada".into(),
        };
        let auth = MockAuthService::new().with_identity(identity.clone(), "pw");
        auth.create_session("ada@example.test", "pw").await.unwrap();
        assert_eq!(auth.get_account().await.unwrap(), Some(identity));
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let auth = MockAuthService::new().with_account("ada@example.test", "pw", "Ada");
        let err = auth.create_session("ada@example.test", "nope").await.unwrap_err();
        assert!(matches!(err, ContractError::Auth { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let auth = MockAuthService::new().with_account("ada@example.test", "pw", "Ada");
        assert!(auth
            .create_account("ada@example.test", "pw2", "Other")
            .await
            .is_err());
        assert_eq!(auth.accounts().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_account_ends_session() {
        let auth = MockAuthService::new();
        let account = auth.create_account("bo@example.test", "pw", "Bo").await.unwrap();
        auth.create_session("bo@example.test", "pw").await.unwrap();

        auth.delete_account(&account.id).await.unwrap();
        assert!(auth.active_session().is_none());
        assert!(auth.delete_account(&account.id).await.is_err());
    }

    #[tokio::test]
    async fn test_anonymous_session() {
        let auth = MockAuthService::new();
        auth.create_anonymous_session().await.unwrap();
        let account = auth.get_account().await.unwrap().unwrap();
        assert!(account.email.is_empty());
    }
}
