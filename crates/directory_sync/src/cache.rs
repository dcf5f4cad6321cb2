//! Reconciling directory cache.
//!
//! Holds one entry per account. Snapshots replace everything; real-time
//! events upsert by storage id (falling back to the account key) and
//! deletions are idempotent.
//!
//! Iteration order is snapshot order followed by append order. Replacing an
//! entry keeps its position.

use std::collections::{BTreeSet, HashMap};

use contracts::{AccountId, ChangeEvent, Coordinate, DeletePolicy, DirectoryEntry, EntryId, EventKind};
use indexmap::IndexMap;
use tracing::{debug, instrument, trace};

use crate::proximity::ProximityFilter;

/// Outcome of applying a change to the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// New entry appended
    Inserted,
    /// Existing entry replaced in place
    Replaced,
    /// Entry removed
    Removed,
    /// Nothing changed
    Ignored,
}

impl Applied {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inserted => "inserted",
            Self::Replaced => "replaced",
            Self::Removed => "removed",
            Self::Ignored => "ignored",
        }
    }
}

/// Inputs of the derived view
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewQuery {
    /// Case-insensitive substring over name and interests; empty disables
    pub search_text: String,
    /// Keep entries sharing at least one of these tags; empty disables
    pub selected_interests: Vec<String>,
    /// Where "nearby" is measured from; `None` yields an empty view
    pub reference: Option<Coordinate>,
}

/// In-memory mirror of the remote directory
#[derive(Debug, Default)]
pub struct ReconcilingCache {
    entries: IndexMap<AccountId, DirectoryEntry>,
    /// Storage id -> account key
    by_id: HashMap<EntryId, AccountId>,
    current_account: Option<AccountId>,
    /// Last known copy of the current user, kept even when the cache does
    /// not (yet) hold it
    current_entry: Option<DirectoryEntry>,
}

impl ReconcilingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, account_id: &AccountId) -> Option<&DirectoryEntry> {
        self.entries.get(account_id)
    }

    pub fn get_by_id(&self, id: &EntryId) -> Option<&DirectoryEntry> {
        self.by_id.get(id).and_then(|account| self.entries.get(account))
    }

    /// Owned copies of all entries in iteration order
    pub fn entries(&self) -> Vec<DirectoryEntry> {
        self.entries.values().cloned().collect()
    }

    /// Discard everything and install a snapshot
    ///
    /// A repeated account id replaces the earlier occurrence in place. The
    /// current-user designation survives; its cached copy is refreshed when
    /// the snapshot contains it.
    #[instrument(level = "debug", name = "cache_replace_all", skip_all)]
    pub fn replace_all<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = DirectoryEntry>,
    {
        self.entries.clear();
        self.by_id.clear();

        for entry in entries {
            if let Some(previous) = self.entries.get(&entry.account_id) {
                self.by_id.remove(&previous.id);
            }
            self.by_id.insert(entry.id.clone(), entry.account_id.clone());
            self.entries.insert(entry.account_id.clone(), entry);
        }

        if let Some(account) = &self.current_account {
            if let Some(entry) = self.entries.get(account) {
                self.current_entry = Some(entry.clone());
            }
        }

        debug!(count = self.entries.len(), "snapshot installed");
    }

    /// Upsert keyed by storage id
    ///
    /// Replaces the entry with the same `id` in place; failing that, the
    /// entry of the same account in place; otherwise appends.
    pub fn apply_update(&mut self, entry: DirectoryEntry) -> Applied {
        let slot = self
            .by_id
            .get(&entry.id)
            .cloned()
            .or_else(|| self.entries.contains_key(&entry.account_id).then(|| entry.account_id.clone()));

        if self.is_current(&entry.account_id) {
            self.current_entry = Some(entry.clone());
        }

        match slot {
            Some(old_account) => {
                self.replace_at(&old_account, entry);
                Applied::Replaced
            }
            None => {
                self.append(entry);
                Applied::Inserted
            }
        }
    }

    /// Create is an upsert whose target usually does not exist yet
    pub fn apply_create(&mut self, entry: DirectoryEntry) -> Applied {
        self.apply_update(entry)
    }

    /// Apply a decoded real-time change under `policy`
    pub fn apply(&mut self, event: ChangeEvent, policy: DeletePolicy) -> Applied {
        match event.kind {
            EventKind::Create => self.apply_create(event.entry),
            EventKind::Update => self.apply_update(event.entry),
            EventKind::Delete => {
                let allowed = match policy {
                    DeletePolicy::RemoveAny => true,
                    DeletePolicy::CurrentUserOnly => self.is_current(&event.entry.account_id),
                    DeletePolicy::Ignore => false,
                };
                if !allowed {
                    trace!(entry_id = %event.entry.id, ?policy, "delete ignored by policy");
                    return Applied::Ignored;
                }
                let removed = match self.remove_by_id(&event.entry.id) {
                    Some(entry) => Some(entry),
                    None => self.remove(&event.entry.account_id),
                };
                if removed.is_some() {
                    Applied::Removed
                } else {
                    Applied::Ignored
                }
            }
        }
    }

    /// Remove by account; absent keys are a no-op
    ///
    /// Clears the current user when it is the one removed.
    pub fn remove(&mut self, account_id: &AccountId) -> Option<DirectoryEntry> {
        let removed = self.entries.shift_remove(account_id)?;
        self.by_id.remove(&removed.id);
        if self.is_current(account_id) {
            self.clear_current_user();
        }
        Some(removed)
    }

    /// Remove by storage id; absent ids are a no-op
    pub fn remove_by_id(&mut self, id: &EntryId) -> Option<DirectoryEntry> {
        let account = self.by_id.get(id).cloned()?;
        self.remove(&account)
    }

    /// Designate the session's own account
    pub fn set_current_user(&mut self, account_id: AccountId) {
        self.current_entry = self.entries.get(&account_id).cloned();
        self.current_account = Some(account_id);
    }

    /// Designate the session's own entry, whether or not it is cached
    pub fn set_current_entry(&mut self, entry: DirectoryEntry) {
        self.current_account = Some(entry.account_id.clone());
        self.current_entry = Some(entry);
    }

    pub fn clear_current_user(&mut self) {
        self.current_account = None;
        self.current_entry = None;
    }

    pub fn current_account(&self) -> Option<&AccountId> {
        self.current_account.as_ref()
    }

    pub fn current_user(&self) -> Option<DirectoryEntry> {
        let account = self.current_account.as_ref()?;
        self.entries
            .get(account)
            .cloned()
            .or_else(|| self.current_entry.clone())
    }

    /// Filtered projection
    ///
    /// Pipeline: drop self, search text, interest intersection, proximity.
    pub fn view(&self, query: &ViewQuery, proximity: &ProximityFilter) -> Vec<DirectoryEntry> {
        let needle = query.search_text.to_lowercase();

        let candidates = self
            .entries
            .values()
            .filter(|entry| !self.is_current(&entry.account_id))
            .filter(|entry| {
                needle.is_empty()
                    || entry.name.to_lowercase().contains(&needle)
                    || entry.joined_interests().to_lowercase().contains(&needle)
            })
            .filter(|entry| {
                query.selected_interests.is_empty()
                    || entry.shares_interest_with(&query.selected_interests)
            })
            .cloned();

        proximity.filter(candidates, query.reference)
    }

    /// Sorted union of every entry's interests
    pub fn all_interests(&self) -> Vec<String> {
        self.entries
            .values()
            .filter_map(|entry| entry.interests.as_ref())
            .flatten()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn is_current(&self, account_id: &AccountId) -> bool {
        self.current_account.as_ref() == Some(account_id)
    }

    fn append(&mut self, entry: DirectoryEntry) {
        trace!(entry_id = %entry.id, account_id = %entry.account_id, "entry appended");
        self.by_id.insert(entry.id.clone(), entry.account_id.clone());
        self.entries.insert(entry.account_id.clone(), entry);
    }

    fn replace_at(&mut self, old_account: &AccountId, entry: DirectoryEntry) {
        let Some(index) = self.entries.get_index_of(old_account) else {
            self.append(entry);
            return;
        };
        let old_id = self.entries[index].id.clone();
        self.by_id.remove(&old_id);
        self.by_id.insert(entry.id.clone(), entry.account_id.clone());

        if *old_account == entry.account_id {
            self.entries[index] = entry;
            trace!(index, "entry replaced in place");
            return;
        }

        // The record now belongs to another account: evict that account's
        // existing entry so each account keeps a single entry
        if let Some(other) = self.entries.shift_remove(&entry.account_id) {
            if other.id != entry.id {
                self.by_id.remove(&other.id);
            }
        }
        let index = self.entries.get_index_of(old_account).unwrap_or(index);
        self.entries.shift_remove_index(index);
        let index = index.min(self.entries.len());
        self.entries.shift_insert(index, entry.account_id.clone(), entry);
        trace!(index, "entry re-keyed in place");
    }
}
