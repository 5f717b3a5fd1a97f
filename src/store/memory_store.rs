use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::protocol::UserName;
use crate::store::directory::{Directory, check_storable};
use crate::store::{PasswordHasher, Store, StoreError, UserId};

#[derive(Debug, Default)]
struct Tables {
    dir: Directory,
    avatars: HashMap<UserId, Vec<u8>>,
}

/// In-process store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    hasher: PasswordHasher,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hasher(hasher: PasswordHasher) -> Self {
        Self {
            tables: Mutex::default(),
            hasher,
        }
    }

    /// Builder-style helper: registers `username`, ignoring duplicates.
    pub fn with_user(self, username: &str, password: &str) -> Self {
        let _ = self.register_account(username, password);
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Internal("store lock poisoned"))
    }
}

impl Store for MemoryStore {
    fn register_account(&self, username: &str, password: &str) -> Result<UserId, StoreError> {
        check_storable(username)?;
        if self.lock()?.dir.id_of(username).is_some() {
            return Err(StoreError::UsernameTaken);
        }
        // Hash outside the lock; insert re-checks for a racing registration.
        let credential = self.hasher.hash(password)?;
        self.lock()?.dir.insert_account(username, credential)
    }

    fn authenticate(&self, username: &str, password: &str) -> Result<UserId, StoreError> {
        let (id, credential) = {
            let tables = self.lock()?;
            let acc = tables.dir.account(username).ok_or(StoreError::UnknownUser)?;
            (acc.id, acc.credential.clone())
        };
        if credential.verify(password)? {
            Ok(id)
        } else {
            Err(StoreError::InvalidPassword)
        }
    }

    fn add_contact(&self, owner: UserId, contact: &str) -> Result<(), StoreError> {
        self.lock()?.dir.add_contact(owner, contact)
    }

    fn remove_contact(&self, owner: UserId, contact: &str) -> Result<(), StoreError> {
        self.lock()?.dir.remove_contact(owner, contact)
    }

    fn list_contacts(&self, owner: UserId) -> Result<Vec<UserName>, StoreError> {
        Ok(self.lock()?.dir.contacts_of(owner))
    }

    fn search_users(
        &self,
        query: &str,
        exclude: UserId,
        limit: usize,
    ) -> Result<Vec<UserName>, StoreError> {
        Ok(self.lock()?.dir.search(query, exclude, limit))
    }

    fn set_avatar(&self, owner: UserId, data: &[u8]) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        if !tables.dir.contains_id(owner) {
            return Err(StoreError::UnknownUser);
        }
        if data.is_empty() {
            tables.avatars.remove(&owner);
        } else {
            tables.avatars.insert(owner, data.to_vec());
        }
        Ok(())
    }

    fn get_avatar(&self, username: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let tables = self.lock()?;
        Ok(tables
            .dir
            .id_of(username)
            .and_then(|id| tables.avatars.get(&id).cloned()))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;

    fn store() -> MemoryStore {
        MemoryStore::with_hasher(PasswordHasher::new(2))
    }

    #[test]
    fn register_then_authenticate() {
        let s = store();
        let id = s.register_account("alice", "secret").unwrap();
        assert_eq!(s.authenticate("alice", "secret").unwrap(), id);
        assert!(matches!(
            s.authenticate("alice", "nope"),
            Err(StoreError::InvalidPassword)
        ));
        assert!(matches!(
            s.authenticate("ghost", "secret"),
            Err(StoreError::UnknownUser)
        ));
        assert!(matches!(
            s.register_account("alice", "other"),
            Err(StoreError::UsernameTaken)
        ));
    }

    #[test]
    fn avatar_set_get_and_clear() {
        let s = store();
        let id = s.register_account("bob", "pw12").unwrap();
        assert_eq!(s.get_avatar("bob").unwrap(), None);

        s.set_avatar(id, &[1, 2, 3]).unwrap();
        assert_eq!(s.get_avatar("bob").unwrap(), Some(vec![1, 2, 3]));

        s.set_avatar(id, &[]).unwrap();
        assert_eq!(s.get_avatar("bob").unwrap(), None);
        assert_eq!(s.get_avatar("nobody").unwrap(), None);
    }

    #[test]
    fn avatar_for_unknown_owner_is_rejected() {
        let s = store();
        assert!(matches!(s.set_avatar(42, &[1]), Err(StoreError::UnknownUser)));
    }

    #[test]
    fn unstorable_usernames_are_rejected() {
        let s = store();
        assert!(matches!(
            s.register_account("", "pw12"),
            Err(StoreError::InvalidUsername)
        ));
        assert!(matches!(
            s.register_account("a:b", "pw12"),
            Err(StoreError::InvalidUsername)
        ));
    }
}
