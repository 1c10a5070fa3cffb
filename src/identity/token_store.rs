//! Durable client-local cache of the credential pair and identity snapshot.
//! The store is a cache, not a source of truth: anything unreadable is reported
//! as absent and left for the session layer to clear.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use super::credential::Credential;
use super::principal::Identity;
use crate::error::ClientError;

pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";
pub const USER_DATA_KEY: &str = "user_data";

const ALL_KEYS: [&str; 3] = [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_DATA_KEY];

/// Key/value persistence underneath the token store. `put_all` must apply every
/// entry or none of them.
pub trait StorageBackend: Send + Sync {
    fn read_all(&self) -> Result<BTreeMap<String, String>>;
    fn put_all(&self, entries: &[(&str, &str)]) -> Result<()>;
    fn remove_all(&self, keys: &[&str]) -> Result<()>;
}

#[derive(Default)]
pub struct MemoryStorage {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self { Self::default() }
}

impl StorageBackend for MemoryStorage {
    fn read_all(&self) -> Result<BTreeMap<String, String>> { Ok(self.entries.read().clone()) }

    fn put_all(&self, entries: &[(&str, &str)]) -> Result<()> {
        let mut map = self.entries.write();
        for (k, v) in entries {
            map.insert((*k).to_string(), (*v).to_string());
        }
        Ok(())
    }

    fn remove_all(&self, keys: &[&str]) -> Result<()> {
        let mut map = self.entries.write();
        for k in keys {
            map.remove(*k);
        }
        Ok(())
    }
}

/// One JSON object per file. Writes go through a sibling temp file and a rename.
pub struct FileStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStorage {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into(), write_lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path { &self.path }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
            }
        }
        let body = serde_json::to_vec_pretty(map)?;
        let tmp = self.tmp_path();
        std::fs::write(&tmp, body).with_context(|| format!("writing {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path).with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }
}

impl StorageBackend for FileStorage {
    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        let map = serde_json::from_str(&text)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(map)
    }

    fn put_all(&self, entries: &[(&str, &str)]) -> Result<()> {
        let _guard = self.write_lock.lock();
        // An unreadable file is replaced rather than merged.
        let mut map = self.read_all().unwrap_or_default();
        for (k, v) in entries {
            map.insert((*k).to_string(), (*v).to_string());
        }
        self.write_map(&map)
    }

    fn remove_all(&self, keys: &[&str]) -> Result<()> {
        let _guard = self.write_lock.lock();
        if !self.path.exists() {
            return Ok(());
        }
        let mut map = match self.read_all() {
            Ok(m) => m,
            Err(_) => BTreeMap::new(),
        };
        for k in keys {
            map.remove(*k);
        }
        if map.is_empty() {
            std::fs::remove_file(&self.path).with_context(|| format!("removing {}", self.path.display()))?;
            Ok(())
        } else {
            self.write_map(&map)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSession {
    pub credential: Credential,
    pub identity: Identity,
}

pub struct TokenStore {
    backend: RwLock<Box<dyn StorageBackend>>,
}

impl TokenStore {
    pub fn new(backend: Box<dyn StorageBackend>) -> Self { Self { backend: RwLock::new(backend) } }

    pub fn in_memory() -> Self { Self::new(Box::new(MemoryStorage::new())) }

    pub fn file<P: Into<PathBuf>>(path: P) -> Self { Self::new(Box::new(FileStorage::new(path))) }

    /// Persist tokens and identity together, replacing any previous value.
    pub fn save(&self, credential: &Credential, identity: &Identity) -> Result<()> {
        let user_data = serde_json::to_string(identity)?;
        self.backend.read().put_all(&[
            (ACCESS_TOKEN_KEY, credential.access_token()),
            (REFRESH_TOKEN_KEY, credential.refresh_token()),
            (USER_DATA_KEY, user_data.as_str()),
        ])?;
        debug!(target: "newsdesk::store", "session saved user_id={}", identity.id);
        Ok(())
    }

    /// Swap the durable backend for process memory after it refused a write.
    /// The old backend is cleared best-effort so it cannot resurrect a stale session.
    pub fn fall_back_to_memory(&self) {
        let mut backend = self.backend.write();
        if let Err(e) = backend.remove_all(&ALL_KEYS) {
            warn!(target: "newsdesk::store", "clearing durable store before fallback failed: {:#}", e);
        }
        *backend = Box::new(MemoryStorage::new());
        warn!(target: "newsdesk::store", "session storage now in memory only");
    }

    /// Stored session, or `None` when nothing usable is stored.
    pub fn load(&self) -> Option<StoredSession> {
        match self.inspect() {
            Ok(found) => found,
            Err(e) => {
                warn!(target: "newsdesk::store", "ignoring stored session: {}", e);
                None
            }
        }
    }

    /// Liveness read of the credential alone.
    pub fn credential(&self) -> Option<Credential> {
        let map = self.backend.read().read_all().ok()?;
        let access = map.get(ACCESS_TOKEN_KEY)?;
        let refresh = map.get(REFRESH_TOKEN_KEY)?;
        Credential::new(access.as_str(), refresh.as_str()).ok()
    }

    /// Remove all three keys. Clearing an empty store is a no-op.
    pub fn clear(&self) -> Result<()> {
        self.backend.read().remove_all(&ALL_KEYS)?;
        debug!(target: "newsdesk::store", "session cleared");
        Ok(())
    }

    fn inspect(&self) -> Result<Option<StoredSession>, ClientError> {
        let map = self
            .backend
            .read()
            .read_all()
            .map_err(|e| ClientError::malformed(format!("{:#}", e)))?;
        let present: Vec<&str> = ALL_KEYS.iter().copied().filter(|k| map.contains_key(*k)).collect();
        if present.is_empty() {
            return Ok(None);
        }
        if present.len() != ALL_KEYS.len() {
            return Err(ClientError::malformed(format!("partial session, only {:?} present", present)));
        }
        let credential = Credential::new(map[ACCESS_TOKEN_KEY].as_str(), map[REFRESH_TOKEN_KEY].as_str())?;
        let identity: Identity = serde_json::from_str(&map[USER_DATA_KEY])
            .map_err(|e| ClientError::malformed(format!("user_data: {}", e)))?;
        if !identity.is_well_formed() {
            return Err(ClientError::malformed("user_data lacks a stable id or username"));
        }
        Ok(Some(StoredSession { credential, identity }))
    }
}
