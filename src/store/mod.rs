//! Subscription persistence.
//!
//! # Responsibilities
//! - Durable record of which owner monitors which URL
//! - Seed the monitor at startup (`load_all`)
//! - Answer listing queries for the command surface
//!
//! # Design Decisions
//! - Concurrent map in memory, whole-file JSON snapshot on every mutation
//! - Writes go to a temp file first and are renamed into place
//! - A mutation whose snapshot fails to write is rolled back in memory
//! - One writer per file: `open` takes an exclusive lock on `<path>.lock`
//!   for the store's lifetime, so a second process (an offline `add`
//!   while `run` is active) is refused instead of being overwritten later.
//!   The OS drops the lock when the process exits.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::DashMap;
use fs2::FileExt;
use thiserror::Error;

use crate::scheduler::OwnerId;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store file is corrupt: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store {} is in use by another process (is `run` active?)", .0.display())]
    Locked(PathBuf),
}

/// A thread-safe subscription store.
#[derive(Clone, Default)]
pub struct SubscriptionStore {
    inner: Arc<DashMap<OwnerId, BTreeSet<String>>>,
    persistence_path: Option<PathBuf>,
    // Serializes mutate-then-snapshot so an older snapshot never
    // overwrites a newer one
    save_lock: Arc<Mutex<()>>,
    _writer_lock: Option<Arc<File>>,
}

fn lock_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".lock");
    PathBuf::from(name)
}

fn acquire_writer_lock(path: &Path) -> Result<File, StoreError> {
    let lock_path = lock_path(path);
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&lock_path)?;

    FileExt::try_lock_exclusive(&file).map_err(|e| {
        if e.kind() == ErrorKind::WouldBlock
            || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
        {
            StoreError::Locked(path.to_path_buf())
        } else {
            StoreError::Io(e)
        }
    })?;
    Ok(file)
}

impl SubscriptionStore {
    /// Create an empty store that is never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the store at `path`. A missing file is an empty store.
    ///
    /// Fails with [`StoreError::Locked`] while another process holds the
    /// same file open.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let writer_lock = acquire_writer_lock(path)?;
        let store = Self {
            persistence_path: Some(path.to_path_buf()),
            _writer_lock: Some(Arc::new(writer_lock)),
            ..Self::in_memory()
        };

        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No subscription file yet, starting empty");
                return Ok(store);
            }
            Err(e) => return Err(e.into()),
        };

        let map: BTreeMap<OwnerId, BTreeSet<String>> = serde_json::from_reader(BufReader::new(file))?;
        for (owner, urls) in map {
            if !urls.is_empty() {
                store.inner.insert(owner, urls);
            }
        }

        tracing::info!(
            path = %path.display(),
            subscriptions = store.count(),
            "Loaded subscriptions"
        );
        Ok(store)
    }

    fn lock_saves(&self) -> MutexGuard<'_, ()> {
        self.save_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write the current state to disk (no-op for in-memory stores).
    pub fn save(&self) -> Result<(), StoreError> {
        let _guard = self.lock_saves();
        self.persist()
    }

    // Caller holds `save_lock`.
    fn persist(&self) -> Result<(), StoreError> {
        let Some(path) = &self.persistence_path else {
            return Ok(());
        };

        let map: BTreeMap<OwnerId, BTreeSet<String>> = self
            .inner
            .iter()
            .map(|r| (*r.key(), r.value().clone()))
            .collect();

        let tmp = path.with_extension("json.tmp");
        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer_pretty(&mut writer, &map)?;
            writer.flush()?;
        }
        fs::rename(&tmp, path)?;

        tracing::debug!(path = %path.display(), owners = map.len(), "Saved subscriptions");
        Ok(())
    }

    fn discard(&self, owner: OwnerId, url: &str) {
        if let Some(mut urls) = self.inner.get_mut(&owner) {
            urls.remove(url);
        }
        self.inner.remove_if(&owner, |_, urls| urls.is_empty());
    }

    /// Every `(owner, url)` pair, ordered by owner then URL.
    pub fn load_all(&self) -> Vec<(OwnerId, String)> {
        let mut all: Vec<_> = self
            .inner
            .iter()
            .flat_map(|r| {
                let owner = *r.key();
                r.value()
                    .iter()
                    .map(move |url| (owner, url.clone()))
                    .collect::<Vec<_>>()
            })
            .collect();
        all.sort();
        all
    }

    /// Persist a new subscription. Returns `false` if it already existed.
    ///
    /// Nothing changes if the snapshot cannot be written.
    pub fn add(&self, owner: OwnerId, url: &str) -> Result<bool, StoreError> {
        let _guard = self.lock_saves();
        if !self.inner.entry(owner).or_default().insert(url.to_string()) {
            return Ok(false);
        }

        if let Err(e) = self.persist() {
            self.discard(owner, url);
            return Err(e);
        }
        Ok(true)
    }

    /// Drop a subscription. Returns `false` if it was not stored.
    ///
    /// Nothing changes if the snapshot cannot be written.
    pub fn remove(&self, owner: OwnerId, url: &str) -> Result<bool, StoreError> {
        let _guard = self.lock_saves();
        let removed = match self.inner.get_mut(&owner) {
            Some(mut urls) => urls.remove(url),
            None => false,
        };
        if !removed {
            return Ok(false);
        }
        self.inner.remove_if(&owner, |_, urls| urls.is_empty());

        if let Err(e) = self.persist() {
            self.inner.entry(owner).or_default().insert(url.to_string());
            return Err(e);
        }
        Ok(true)
    }

    pub fn contains(&self, owner: OwnerId, url: &str) -> bool {
        self.inner
            .get(&owner)
            .map(|urls| urls.contains(url))
            .unwrap_or(false)
    }

    /// URLs monitored for `owner`, sorted.
    pub fn list(&self, owner: OwnerId) -> Vec<String> {
        self.inner
            .get(&owner)
            .map(|urls| urls.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Total number of subscriptions.
    pub fn count(&self) -> usize {
        self.inner.iter().map(|r| r.value().len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("http-monitor-{}-{}.json", name, std::process::id()))
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("http-monitor-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_store_operations() {
        let store = SubscriptionStore::in_memory();
        let owner = OwnerId(1);

        assert!(store.add(owner, "https://b.example").unwrap());
        assert!(store.add(owner, "https://a.example").unwrap());
        assert!(!store.add(owner, "https://a.example").unwrap());
        assert_eq!(store.list(owner), vec!["https://a.example", "https://b.example"]);
        assert_eq!(store.count(), 2);

        assert!(store.remove(owner, "https://a.example").unwrap());
        assert!(!store.remove(owner, "https://a.example").unwrap());
        assert!(!store.remove(OwnerId(9), "https://a.example").unwrap());
        assert!(!store.contains(owner, "https://a.example"));
    }

    #[test]
    fn test_persistence() {
        let path = temp_path("persistence");
        let _ = fs::remove_file(&path);

        let store = SubscriptionStore::open(&path).unwrap();
        assert_eq!(store.count(), 0);
        store.add(OwnerId(7), "https://a.example").unwrap();
        store.add(OwnerId(3), "https://b.example").unwrap();
        store.add(OwnerId(3), "https://c.example").unwrap();
        store.remove(OwnerId(3), "https://c.example").unwrap();

        // Load new instance once the first writer is gone
        drop(store);
        let loaded = SubscriptionStore::open(&path).unwrap();
        assert_eq!(
            loaded.load_all(),
            vec![
                (OwnerId(3), "https://b.example".to_string()),
                (OwnerId(7), "https://a.example".to_string()),
            ]
        );

        // Cleanup
        fs::remove_file(&path).unwrap_or_default();
        fs::remove_file(lock_path(&path)).unwrap_or_default();
    }

    #[test]
    fn test_corrupt_file() {
        let path = temp_path("corrupt");
        fs::write(&path, "{ not json").unwrap();

        let err = SubscriptionStore::open(&path).err().unwrap();
        assert!(matches!(err, StoreError::Json(_)));

        fs::remove_file(&path).unwrap_or_default();
        fs::remove_file(lock_path(&path)).unwrap_or_default();
    }

    #[test]
    fn test_second_writer_refused() {
        let dir = temp_dir("locked");
        let path = dir.join("subs.json");

        let first = SubscriptionStore::open(&path).unwrap();
        first.add(OwnerId(1), "https://a.example").unwrap();

        let err = SubscriptionStore::open(&path).err().unwrap();
        assert!(matches!(err, StoreError::Locked(_)));

        // Clones share the lock; it is released with the last one
        let clone = first.clone();
        drop(first);
        assert!(SubscriptionStore::open(&path).is_err());
        drop(clone);

        let reopened = SubscriptionStore::open(&path).unwrap();
        assert!(reopened.contains(OwnerId(1), "https://a.example"));

        drop(reopened);
        fs::remove_dir_all(&dir).unwrap_or_default();
    }

    #[test]
    fn test_failed_save_rolls_back() {
        let dir = temp_dir("rollback");
        let store = SubscriptionStore::open(dir.join("subs.json")).unwrap();
        let owner = OwnerId(4);
        store.add(owner, "https://kept.example").unwrap();

        // Snapshots cannot be written once the directory is gone
        fs::remove_dir_all(&dir).unwrap();

        assert!(matches!(store.add(owner, "https://new.example"), Err(StoreError::Io(_))));
        assert!(!store.contains(owner, "https://new.example"));
        // Retrying reports the real failure, not "already stored"
        assert!(store.add(owner, "https://new.example").is_err());

        assert!(store.remove(owner, "https://kept.example").is_err());
        assert!(store.contains(owner, "https://kept.example"));
        assert_eq!(store.list(owner), vec!["https://kept.example"]);
        assert_eq!(store.count(), 1);
    }
}
