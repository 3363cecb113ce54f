//! The persistence gateway.
//!
//! A [`SessionStore`] mirrors the [`Session`] into a key-value store under a
//! single key. It never mutates the session it is given; it only serializes
//! it, restores it at startup, and purges it on reset.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use utf8path::Path;

use crate::error::{Error, Result};
use crate::observability::{SNAPSHOT_CORRUPT, SNAPSHOT_PURGES, SNAPSHOT_SAVES};
use crate::session::{Identity, Session};
use crate::types::Message;

/// The key the session snapshot is stored under.
pub const SNAPSHOT_KEY: &str = "persist:root";

////////////////////////////////////////////// KvStore /////////////////////////////////////////////

/// A durable string-to-string store.
pub trait KvStore: Send + Sync {
    /// Returns the value under `key`, or `None` if absent.
    fn get(&self, key: &str) -> Result<Option<String>>;
    /// Stores `value` under `key`, replacing what was there.
    fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Removes `key`; removing an absent key succeeds.
    fn remove(&self, key: &str) -> Result<()>;
}

impl<T: KvStore> KvStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

//////////////////////////////////////////// MemoryStore ///////////////////////////////////////////

/// An in-process [`KvStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

///////////////////////////////////////////// FileStore ////////////////////////////////////////////

/// A [`KvStore`] keeping one file per key under a directory.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write leaves either the old value or the new one.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: Path<'static>,
}

impl FileStore {
    /// Opens a store rooted at `root`, creating the directory if needed.
    pub fn open(root: Path<'_>) -> Result<Self> {
        std::fs::create_dir_all(&root)
            .map_err(|err| Error::io(format!("could not create {}: {err}", root.as_str()), err))?;
        Ok(Self {
            root: root.into_owned(),
        })
    }

    /// The directory this store writes to.
    pub fn root(&self) -> &Path<'static> {
        &self.root
    }

    fn path_for(&self, key: &str) -> Path<'static> {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let file = format!("{name}.json");
        self.root.join(file.as_str()).into_owned()
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::io(format!("could not read {}: {err}", path.as_str()), err)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let tmp = format!("{}.tmp", path.as_str());
        std::fs::write(&tmp, value)
            .map_err(|err| Error::io(format!("could not write {tmp}: {err}"), err))?;
        std::fs::rename(&tmp, &path)
            .map_err(|err| Error::io(format!("could not replace {}: {err}", path.as_str()), err))
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(Error::io(format!("could not remove {}: {err}", path.as_str()), err)),
        }
    }
}

///////////////////////////////////////////// Snapshot /////////////////////////////////////////////

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    passphrase: Option<String>,
    #[serde(default)]
    hostname: Option<String>,
    #[serde(default, rename = "threadId")]
    thread_id: Option<String>,
    #[serde(default)]
    messages: Vec<Message>,
}

impl From<&Session> for Snapshot {
    fn from(session: &Session) -> Self {
        Self {
            passphrase: session.passphrase().map(String::from),
            hostname: session.host().map(String::from),
            thread_id: session.session_id().map(String::from),
            messages: session.messages().to_vec(),
        }
    }
}

impl TryFrom<Snapshot> for Session {
    type Error = Error;

    fn try_from(snapshot: Snapshot) -> Result<Self> {
        let identity = match (snapshot.hostname, snapshot.thread_id) {
            (Some(host), Some(session_id)) => Some(Identity { host, session_id }),
            (None, None) => None,
            _ => {
                return Err(Error::invalid_transition(
                    "snapshot holds half of a session identity",
                ));
            }
        };
        Session::restore(snapshot.passphrase, identity, snapshot.messages)
    }
}

/// Serializes a session into its snapshot text.
pub fn serialize(session: &Session) -> Result<String> {
    Ok(serde_json::to_string(&Snapshot::from(session))?)
}

/// Restores a session from snapshot text, failing on malformed input.
pub fn deserialize(text: &str) -> Result<Session> {
    let snapshot: Snapshot = serde_json::from_str(text)?;
    Session::try_from(snapshot)
}

//////////////////////////////////////////// SessionStore //////////////////////////////////////////

/// Loads, saves and purges the session snapshot.
pub struct SessionStore {
    kv: Box<dyn KvStore>,
    key: String,
}

impl SessionStore {
    /// Creates a gateway over `kv` using [`SNAPSHOT_KEY`].
    pub fn new(kv: impl KvStore + 'static) -> Self {
        Self::with_key(kv, SNAPSHOT_KEY)
    }

    /// Creates a gateway over `kv` using a custom key.
    pub fn with_key(kv: impl KvStore + 'static, key: impl Into<String>) -> Self {
        Self {
            kv: Box::new(kv),
            key: key.into(),
        }
    }

    /// Restores the persisted session.
    ///
    /// An absent, unreadable or corrupt snapshot yields an empty session.
    pub fn load(&self) -> Session {
        let text = match self.kv.get(&self.key) {
            Ok(Some(text)) => text,
            Ok(None) => return Session::new(),
            Err(err) => {
                SNAPSHOT_CORRUPT.click();
                tracing::warn!(key = %self.key, error = %err, "could not read session snapshot");
                return Session::new();
            }
        };
        match deserialize(&text) {
            Ok(session) => {
                tracing::debug!(
                    key = %self.key,
                    messages = session.messages().len(),
                    "restored session snapshot"
                );
                session
            }
            Err(err) => {
                SNAPSHOT_CORRUPT.click();
                tracing::warn!(key = %self.key, error = %err, "discarding corrupt session snapshot");
                Session::new()
            }
        }
    }

    /// Writes the full session.
    pub fn save(&self, session: &Session) -> Result<()> {
        let text = serialize(session)?;
        self.kv.set(&self.key, &text)?;
        SNAPSHOT_SAVES.click();
        Ok(())
    }

    /// Removes the snapshot.
    pub fn purge(&self) -> Result<()> {
        self.kv.remove(&self.key)?;
        SNAPSHOT_PURGES.click();
        tracing::debug!(key = %self.key, "purged session snapshot");
        Ok(())
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore").field("key", &self.key).finish()
    }
}
