use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard},
};

use crate::log::{LogSink, NoopLogSink};
use crate::protocol::UserName;
use crate::sink_warn;
use crate::store::directory::{Directory, check_storable};
use crate::store::{Credential, PasswordHasher, Store, StoreError, UserId};

const ACCOUNTS_FILE: &str = "accounts.db";
const CONTACTS_FILE: &str = "contacts.db";
const AVATAR_DIR: &str = "avatars";

/// Directory-backed store.
///
/// Layout under `root`:
/// - `accounts.db`: `id:username:iterations:salt_hex:hash_hex` per line
/// - `contacts.db`: `owner_id:contact_id` per line
/// - `avatars/<id>.bin`: raw avatar bytes
///
/// Each mutation is applied to a copy of the tables, written to a temp file
/// and renamed into place; only then does the copy replace the live tables.
pub struct FileStore {
    root: PathBuf,
    dir: Mutex<Directory>,
    hasher: PasswordHasher,
    log: Arc<dyn LogSink>,
}

impl FileStore {
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with(root, PasswordHasher::default(), Arc::new(NoopLogSink))
    }

    /// Open (or create) the store at `root`. Malformed lines are skipped
    /// with a warning.
    pub fn open_with(
        root: impl AsRef<Path>,
        hasher: PasswordHasher,
        log: Arc<dyn LogSink>,
    ) -> Result<Self, StoreError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join(AVATAR_DIR))?;

        let accounts = read_lines(&root.join(ACCOUNTS_FILE))?
            .into_iter()
            .enumerate()
            .filter_map(|(n, line)| {
                let row = parse_account(&line);
                if row.is_none() {
                    sink_warn!(log, "ignoring malformed line {} in {}", n + 1, ACCOUNTS_FILE);
                }
                row
            })
            .collect();

        let edges = read_lines(&root.join(CONTACTS_FILE))?
            .into_iter()
            .enumerate()
            .filter_map(|(n, line)| {
                let edge = parse_edge(&line);
                if edge.is_none() {
                    sink_warn!(log, "ignoring malformed line {} in {}", n + 1, CONTACTS_FILE);
                }
                edge
            })
            .collect();

        Ok(Self {
            root,
            dir: Mutex::new(Directory::from_rows(accounts, edges)),
            hasher,
            log,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn lock(&self) -> Result<MutexGuard<'_, Directory>, StoreError> {
        self.dir
            .lock()
            .map_err(|_| StoreError::Internal("store lock poisoned"))
    }

    /// Apply `f` to a copy, persist the file it touches, then commit.
    fn mutate<T>(
        &self,
        file: &str,
        f: impl FnOnce(&mut Directory) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut live = self.lock()?;
        let mut next = live.clone();
        let out = f(&mut next)?;

        let contents = match file {
            ACCOUNTS_FILE => render_accounts(&next),
            _ => render_edges(&next),
        };
        if let Err(e) = write_atomically(&self.root.join(file), contents.as_bytes()) {
            sink_warn!(self.log, "failed to persist {}: {}", file, e);
            return Err(e.into());
        }

        *live = next;
        Ok(out)
    }

    fn avatar_path(&self, id: UserId) -> PathBuf {
        self.root.join(AVATAR_DIR).join(format!("{id}.bin"))
    }
}

impl Store for FileStore {
    fn register_account(&self, username: &str, password: &str) -> Result<UserId, StoreError> {
        check_storable(username)?;
        if self.lock()?.id_of(username).is_some() {
            return Err(StoreError::UsernameTaken);
        }
        let credential = self.hasher.hash(password)?;
        self.mutate(ACCOUNTS_FILE, |dir| dir.insert_account(username, credential))
    }

    fn authenticate(&self, username: &str, password: &str) -> Result<UserId, StoreError> {
        let (id, credential) = {
            let dir = self.lock()?;
            let acc = dir.account(username).ok_or(StoreError::UnknownUser)?;
            (acc.id, acc.credential.clone())
        };
        if credential.verify(password)? {
            Ok(id)
        } else {
            Err(StoreError::InvalidPassword)
        }
    }

    fn add_contact(&self, owner: UserId, contact: &str) -> Result<(), StoreError> {
        self.mutate(CONTACTS_FILE, |dir| dir.add_contact(owner, contact))
    }

    fn remove_contact(&self, owner: UserId, contact: &str) -> Result<(), StoreError> {
        self.mutate(CONTACTS_FILE, |dir| dir.remove_contact(owner, contact))
    }

    fn list_contacts(&self, owner: UserId) -> Result<Vec<UserName>, StoreError> {
        Ok(self.lock()?.contacts_of(owner))
    }

    fn search_users(
        &self,
        query: &str,
        exclude: UserId,
        limit: usize,
    ) -> Result<Vec<UserName>, StoreError> {
        Ok(self.lock()?.search(query, exclude, limit))
    }

    fn set_avatar(&self, owner: UserId, data: &[u8]) -> Result<(), StoreError> {
        // Held across the write so two updates for one user can't interleave.
        let dir = self.lock()?;
        if !dir.contains_id(owner) {
            return Err(StoreError::UnknownUser);
        }
        let path = self.avatar_path(owner);
        if data.is_empty() {
            match fs::remove_file(&path) {
                Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e.into()),
                _ => {}
            }
        } else {
            write_atomically(&path, data)?;
        }
        drop(dir);
        Ok(())
    }

    fn get_avatar(&self, username: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let Some(id) = self.lock()?.id_of(username) else {
            return Ok(None);
        };
        match fs::read(self.avatar_path(id)) {
            Ok(bytes) if bytes.is_empty() => Ok(None),
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

// ---- On-disk format ------------------------------------------------------

fn read_lines(path: &Path) -> io::Result<Vec<String>> {
    match fs::read_to_string(path) {
        Ok(s) => Ok(s
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(str::to_owned)
            .collect()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

fn parse_account(line: &str) -> Option<(UserId, UserName, Credential)> {
    let mut parts = line.splitn(3, ':');
    let id = parts.next()?.parse::<UserId>().ok()?;
    let name = parts.next().filter(|n| !n.is_empty())?.to_owned();
    let credential = Credential::from_record(parts.next()?)?;
    Some((id, name, credential))
}

fn parse_edge(line: &str) -> Option<(UserId, UserId)> {
    let (owner, contact) = line.split_once(':')?;
    Some((owner.parse().ok()?, contact.parse().ok()?))
}

fn render_accounts(dir: &Directory) -> String {
    let mut buf = String::new();
    for (name, acc) in dir.accounts() {
        buf.push_str(&format!("{}:{}:{}\n", acc.id, name, acc.credential.to_record()));
    }
    buf
}

fn render_edges(dir: &Directory) -> String {
    let mut buf = String::new();
    for (owner, contact) in dir.edges() {
        buf.push_str(&format!("{owner}:{contact}\n"));
    }
    buf
}

/// Write to `<path>.tmp` then rename over `path`.
fn write_atomically(path: &Path, data: &[u8]) -> io::Result<()> {
    let tmp = path.with_extension("tmp");
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(data)?;
        f.sync_all()?;
    }
    fs::rename(tmp, path)
}
