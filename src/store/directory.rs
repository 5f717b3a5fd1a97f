use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::protocol::UserName;
use crate::store::{Credential, StoreError, UserId};

#[derive(Debug, Clone)]
pub(crate) struct Account {
    pub id: UserId,
    pub credential: Credential,
}

/// Account and contact tables shared by the store backends.
///
/// Plain data, no locking and no I/O: callers hold it behind their own
/// mutex, and `FileStore` mutates a clone so a failed write leaves the live
/// tables untouched.
#[derive(Debug, Clone)]
pub(crate) struct Directory {
    accounts: BTreeMap<UserName, Account>,
    names: HashMap<UserId, UserName>,
    /// (owner, contact) edges; one-directional.
    contacts: BTreeSet<(UserId, UserId)>,
    next_id: UserId,
}

impl Default for Directory {
    fn default() -> Self {
        Self {
            accounts: BTreeMap::new(),
            names: HashMap::new(),
            contacts: BTreeSet::new(),
            next_id: 1,
        }
    }
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted rows. Edges naming unknown ids are dropped.
    pub fn from_rows(
        accounts: Vec<(UserId, UserName, Credential)>,
        edges: Vec<(UserId, UserId)>,
    ) -> Self {
        let mut dir = Self::new();
        for (id, name, credential) in accounts {
            dir.next_id = dir.next_id.max(id.saturating_add(1));
            dir.names.insert(id, name.clone());
            dir.accounts.insert(name, Account { id, credential });
        }
        for (owner, contact) in edges {
            if dir.names.contains_key(&owner) && dir.names.contains_key(&contact) {
                dir.contacts.insert((owner, contact));
            }
        }
        dir
    }

    pub fn insert_account(
        &mut self,
        username: &str,
        credential: Credential,
    ) -> Result<UserId, StoreError> {
        if self.accounts.contains_key(username) {
            return Err(StoreError::UsernameTaken);
        }
        let id = self.next_id;
        self.next_id += 1;
        self.names.insert(id, username.to_owned());
        self.accounts
            .insert(username.to_owned(), Account { id, credential });
        Ok(id)
    }

    pub fn account(&self, username: &str) -> Option<&Account> {
        self.accounts.get(username)
    }

    pub fn id_of(&self, username: &str) -> Option<UserId> {
        self.accounts.get(username).map(|a| a.id)
    }

    pub fn contains_id(&self, id: UserId) -> bool {
        self.names.contains_key(&id)
    }

    pub fn add_contact(&mut self, owner: UserId, contact: &str) -> Result<(), StoreError> {
        let contact_id = self.id_of(contact).ok_or(StoreError::UnknownUser)?;
        if contact_id == owner {
            return Err(StoreError::SelfContact);
        }
        if !self.contacts.insert((owner, contact_id)) {
            return Err(StoreError::ContactExists);
        }
        Ok(())
    }

    pub fn remove_contact(&mut self, owner: UserId, contact: &str) -> Result<(), StoreError> {
        let contact_id = self.id_of(contact).ok_or(StoreError::UnknownUser)?;
        if !self.contacts.remove(&(owner, contact_id)) {
            return Err(StoreError::ContactMissing);
        }
        Ok(())
    }

    pub fn contacts_of(&self, owner: UserId) -> Vec<UserName> {
        let mut out: Vec<UserName> = self
            .contacts
            .range((owner, UserId::MIN)..=(owner, UserId::MAX))
            .filter_map(|(_, contact)| self.names.get(contact).cloned())
            .collect();
        out.sort();
        out
    }

    pub fn search(&self, query: &str, exclude: UserId, limit: usize) -> Vec<UserName> {
        let needle = query.to_ascii_lowercase();
        self.accounts
            .iter()
            .filter(|(_, acc)| acc.id != exclude)
            .filter(|(name, _)| name.to_ascii_lowercase().contains(&needle))
            .map(|(name, _)| name.clone())
            .take(limit)
            .collect()
    }

    pub fn accounts(&self) -> impl Iterator<Item = (&UserName, &Account)> {
        self.accounts.iter()
    }

    pub fn edges(&self) -> impl Iterator<Item = &(UserId, UserId)> {
        self.contacts.iter()
    }
}

/// Names must be non-empty and fit the `:`-separated record format.
pub(crate) fn check_storable(username: &str) -> Result<(), StoreError> {
    if username.is_empty() || username.contains(':') || username.chars().any(char::is_control) {
        return Err(StoreError::InvalidUsername);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::store::PasswordHasher;

    fn cred() -> Credential {
        PasswordHasher::new(1).hash("pw").unwrap()
    }

    fn with_users(names: &[&str]) -> Directory {
        let mut dir = Directory::new();
        for n in names {
            dir.insert_account(n, cred()).unwrap();
        }
        dir
    }

    #[test]
    fn duplicate_username_is_taken() {
        let mut dir = with_users(&["alice"]);
        assert!(matches!(
            dir.insert_account("alice", cred()),
            Err(StoreError::UsernameTaken)
        ));
    }

    #[test]
    fn contact_edge_rules() {
        let mut dir = with_users(&["alice", "bob", "carol"]);
        let alice = dir.id_of("alice").unwrap();

        dir.add_contact(alice, "carol").unwrap();
        dir.add_contact(alice, "bob").unwrap();
        assert_eq!(dir.contacts_of(alice), vec!["bob", "carol"]);

        assert!(matches!(dir.add_contact(alice, "bob"), Err(StoreError::ContactExists)));
        assert!(matches!(dir.add_contact(alice, "alice"), Err(StoreError::SelfContact)));
        assert!(matches!(dir.add_contact(alice, "zed"), Err(StoreError::UnknownUser)));

        // edges are one-directional
        let bob = dir.id_of("bob").unwrap();
        assert!(dir.contacts_of(bob).is_empty());

        dir.remove_contact(alice, "bob").unwrap();
        assert!(matches!(
            dir.remove_contact(alice, "bob"),
            Err(StoreError::ContactMissing)
        ));
        assert_eq!(dir.contacts_of(alice), vec!["carol"]);
    }

    #[test]
    fn search_is_case_insensitive_sorted_and_limited() {
        let dir = with_users(&["Anna", "hannah", "bob", "joanna", "me"]);
        let me = dir.id_of("me").unwrap();
        assert_eq!(dir.search("ANN", me, 20), vec!["Anna", "hannah", "joanna"]);
        assert_eq!(dir.search("ann", me, 2), vec!["Anna", "hannah"]);
        assert!(dir.search("zzz", me, 20).is_empty());
    }

    #[test]
    fn search_excludes_caller() {
        let dir = with_users(&["sam", "samantha"]);
        let sam = dir.id_of("sam").unwrap();
        assert_eq!(dir.search("sam", sam, 20), vec!["samantha"]);
    }

    #[test]
    fn rows_restore_next_id_and_drop_dangling_edges() {
        let rows = vec![(4, "dora".to_string(), cred()), (9, "eve".to_string(), cred())];
        let mut dir = Directory::from_rows(rows, vec![(4, 9), (4, 77)]);
        assert_eq!(dir.contacts_of(4), vec!["eve"]);
        assert_eq!(dir.edges().count(), 1);
        let id = dir.insert_account("finn", cred()).unwrap();
        assert_eq!(id, 10);
    }
}
