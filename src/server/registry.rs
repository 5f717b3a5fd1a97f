use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::protocol::UserName;
use crate::server::session::Session;

/// Online users: username -> live session.
///
/// One mutex guards the map. Callers that need to do I/O against several
/// sessions take a `snapshot` and release the lock first.
#[derive(Debug, Default)]
pub struct Registry {
    online: Mutex<BTreeMap<UserName, Arc<Session>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // The map is always left consistent, so a poisoned lock is still usable.
    fn map(&self) -> MutexGuard<'_, BTreeMap<UserName, Arc<Session>>> {
        self.online.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert-if-absent. `false` means the name is already online.
    pub fn insert(&self, username: &str, session: Arc<Session>) -> bool {
        let mut map = self.map();
        if map.contains_key(username) {
            return false;
        }
        map.insert(username.to_owned(), session);
        true
    }

    pub fn remove(&self, username: &str) -> Option<Arc<Session>> {
        self.map().remove(username)
    }

    pub fn lookup(&self, username: &str) -> Option<Arc<Session>> {
        self.map().get(username).cloned()
    }

    pub fn contains(&self, username: &str) -> bool {
        self.map().contains_key(username)
    }

    /// Copy of all entries, ordered by username.
    pub fn snapshot(&self) -> Vec<(UserName, Arc<Session>)> {
        self.map()
            .iter()
            .map(|(name, session)| (name.clone(), Arc::clone(session)))
            .collect()
    }

    pub fn usernames(&self) -> Vec<UserName> {
        self.map().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use crate::server::testing::session_pair;
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn insert_is_exclusive_per_username() {
        let reg = Registry::new();
        let (a, _) = session_pair(1);
        let (b, _) = session_pair(2);
        let a = Arc::new(a);

        assert!(reg.insert("alice", Arc::clone(&a)));
        assert!(!reg.insert("alice", Arc::new(b)));
        assert_eq!(reg.lookup("alice").unwrap().id(), 1);
        assert_eq!(reg.len(), 1);

        assert_eq!(reg.remove("alice").unwrap().id(), 1);
        assert!(reg.remove("alice").is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn snapshot_is_sorted_and_detached() {
        let reg = Registry::new();
        for (id, name) in [(1, "carol"), (2, "alice"), (3, "bob")] {
            let (s, _) = session_pair(id);
            reg.insert(name, Arc::new(s));
        }
        let snap = reg.snapshot();
        reg.remove("bob");

        let names: Vec<_> = snap.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob", "carol"]);
        assert_eq!(reg.usernames(), vec!["alice", "carol"]);
    }

    #[test]
    fn racing_inserts_have_one_winner() {
        let reg = Arc::new(Registry::new());
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let reg = Arc::clone(&reg);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let (s, _) = session_pair(i);
                    barrier.wait();
                    reg.insert("same", Arc::new(s))
                })
            })
            .collect();

        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(wins, 1);
        assert_eq!(reg.len(), 1);
    }
}
