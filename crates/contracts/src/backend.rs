//! Collaborator traits: directory backend and auth service
//!
//! Both are implemented outside the sync core (vendor SDK in production,
//! in-memory mocks in tests).

use serde::{Deserialize, Serialize};

use crate::{AccountId, ContractError, DirectoryEntry, EntryId, Query};

/// Auth account record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountIdentity {
    #[serde(alias = "$id")]
    pub id: AccountId,
    pub email: String,
    pub name: String,
}

/// Remote user directory
#[trait_variant::make(DirectoryBackend: Send)]
pub trait LocalDirectoryBackend {
    /// Fetch all entries matching `queries`, in backend order
    async fn list_users(&self, queries: &[Query]) -> Result<Vec<DirectoryEntry>, ContractError>;

    /// Look up the entry owned by `account_id`
    async fn get_user(&self, account_id: &AccountId) -> Result<Option<DirectoryEntry>, ContractError>;

    /// Store a new entry; the backend assigns the storage id
    async fn create_user(&self, entry: &DirectoryEntry) -> Result<DirectoryEntry, ContractError>;

    /// Overwrite the entry owned by `account_id`
    ///
    /// `Ok(None)` signals that no such entry exists.
    async fn update_user(
        &self,
        account_id: &AccountId,
        entry: &DirectoryEntry,
    ) -> Result<Option<DirectoryEntry>, ContractError>;

    /// Delete by storage id
    async fn delete_user(&self, id: &EntryId) -> Result<(), ContractError>;
}

/// Account and session management
#[trait_variant::make(AuthService: Send)]
pub trait LocalAuthService {
    /// Account behind the active session, `None` when logged out
    async fn get_account(&self) -> Result<Option<AccountIdentity>, ContractError>;

    async fn create_account(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<AccountIdentity, ContractError>;

    async fn create_session(&self, email: &str, password: &str) -> Result<(), ContractError>;

    async fn delete_session(&self) -> Result<(), ContractError>;

    async fn create_anonymous_session(&self) -> Result<(), ContractError>;

    async fn delete_account(&self, id: &AccountId) -> Result<(), ContractError>;
}
