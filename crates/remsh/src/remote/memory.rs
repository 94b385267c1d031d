//! In-memory remote store implementation

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::{Duration, SystemTime};

use super::{EntryKind, RemoteEntry, RemoteStore};
use crate::error::{Error, Result};
use crate::paths;

/// In-memory remote store.
///
/// Holds every object in a map keyed by normalized path. Counts listing calls
/// and can simulate latency or a read-only service, which makes cache and
/// redirection behaviour observable in tests.
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
    next_id: AtomicU64,
    list_calls: AtomicUsize,
    list_delay_ms: AtomicU64,
    read_only: AtomicBool,
}

#[derive(Debug, Clone)]
struct StoredObject {
    entry: RemoteEntry,
    content: Vec<u8>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create a store holding only the root folder.
    pub fn new() -> Self {
        let mut objects = BTreeMap::new();
        objects.insert(
            "/".to_string(),
            StoredObject {
                entry: RemoteEntry::folder("", 0),
                content: Vec::new(),
            },
        );
        Self {
            objects: RwLock::new(objects),
            next_id: AtomicU64::new(1),
            list_calls: AtomicUsize::new(0),
            list_delay_ms: AtomicU64::new(0),
            read_only: AtomicBool::new(false),
        }
    }

    /// Number of `list_dir` calls served so far.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Delay every listing, widening the window for concurrent fetches.
    pub fn set_list_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.list_delay_ms.store(millis, Ordering::SeqCst);
    }

    /// Reject all mutations with a remote error.
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    /// Seed a file, creating missing parent folders.
    pub fn insert_file(&self, path: &str, content: impl Into<Vec<u8>>) {
        let path = paths::normalize(path);
        let content = content.into();
        let mut objects = self.write_lock();
        self.ensure_parents(&mut objects, &path);
        let mut entry = RemoteEntry::file(paths::file_name(&path), self.next_id(), 0);
        entry.size = content.len() as u64;
        entry.hash = Some(content_hash(&content));
        objects.insert(path, StoredObject { entry, content });
    }

    /// Seed a folder, creating missing parent folders.
    pub fn insert_folder(&self, path: &str) {
        let path = paths::normalize(path);
        let mut objects = self.write_lock();
        self.ensure_parents(&mut objects, &path);
        if !objects.contains_key(&path) {
            let entry = RemoteEntry::folder(paths::file_name(&path), self.next_id());
            objects.insert(
                path,
                StoredObject {
                    entry,
                    content: Vec::new(),
                },
            );
        }
    }

    /// Contents of a file, bypassing the async interface.
    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        let objects = self.read_lock();
        objects
            .get(&paths::normalize(path))
            .filter(|o| o.entry.kind == EntryKind::File)
            .map(|o| o.content.clone())
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn read_lock(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, StoredObject>> {
        self.objects.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_lock(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, StoredObject>> {
        self.objects.write().unwrap_or_else(|e| e.into_inner())
    }

    fn ensure_parents(&self, objects: &mut BTreeMap<String, StoredObject>, path: &str) {
        let mut missing = Vec::new();
        let mut current = paths::parent(path);
        while let Some(dir) = current {
            if objects.contains_key(dir) {
                break;
            }
            missing.push(dir.to_string());
            current = paths::parent(dir);
        }
        for dir in missing.into_iter().rev() {
            let entry = RemoteEntry::folder(paths::file_name(&dir), self.next_id());
            objects.insert(
                dir,
                StoredObject {
                    entry,
                    content: Vec::new(),
                },
            );
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(Error::Remote("storage is read-only".to_string()));
        }
        Ok(())
    }

    fn check_parent(objects: &BTreeMap<String, StoredObject>, path: &str) -> Result<()> {
        if let Some(parent) = paths::parent(path) {
            match objects.get(parent) {
                Some(o) if o.entry.is_folder() => {}
                Some(_) => return Err(Error::NotADirectory(parent.to_string())),
                None => return Err(Error::NotFound(parent.to_string())),
            }
        }
        Ok(())
    }

    fn store_file(&self, path: &str, content: Vec<u8>) -> Result<RemoteEntry> {
        let mut objects = self.write_lock();
        Self::check_parent(&objects, path)?;

        let now = SystemTime::now();
        let entry = match objects.get(path) {
            Some(o) if o.entry.is_folder() => return Err(Error::IsDirectory(path.to_string())),
            Some(o) => RemoteEntry {
                size: content.len() as u64,
                hash: Some(content_hash(&content)),
                modified: now,
                ..o.entry.clone()
            },
            None => {
                let mut entry = RemoteEntry::file(paths::file_name(path), self.next_id(), 0);
                entry.size = content.len() as u64;
                entry.hash = Some(content_hash(&content));
                entry
            }
        };

        objects.insert(
            path.to_string(),
            StoredObject {
                entry: entry.clone(),
                content,
            },
        );
        Ok(entry)
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn list_dir(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.list_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let path = paths::normalize(path);
        let objects = self.read_lock();
        match objects.get(&path) {
            Some(o) if o.entry.is_folder() => {}
            Some(_) => return Err(Error::NotADirectory(path)),
            None => return Err(Error::NotFound(path)),
        }

        Ok(objects
            .iter()
            .filter(|(p, _)| paths::parent(p) == Some(path.as_str()))
            .map(|(_, o)| o.entry.clone())
            .collect())
    }

    async fn stat(&self, path: &str) -> Result<RemoteEntry> {
        let path = paths::normalize(path);
        let objects = self.read_lock();
        objects
            .get(&path)
            .map(|o| o.entry.clone())
            .ok_or(Error::NotFound(path))
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let path = paths::normalize(path);
        let objects = self.read_lock();
        match objects.get(&path) {
            Some(o) if o.entry.is_folder() => Err(Error::IsDirectory(path)),
            Some(o) => Ok(o.content.clone()),
            None => Err(Error::NotFound(path)),
        }
    }

    async fn write_file(&self, path: &str, content: &[u8]) -> Result<RemoteEntry> {
        self.check_writable()?;
        self.store_file(&paths::normalize(path), content.to_vec())
    }

    async fn append_file(&self, path: &str, content: &[u8]) -> Result<RemoteEntry> {
        self.check_writable()?;
        let path = paths::normalize(path);
        let mut combined = match self.read_lock().get(&path) {
            Some(o) if o.entry.is_folder() => return Err(Error::IsDirectory(path)),
            Some(o) => o.content.clone(),
            None => Vec::new(),
        };
        combined.extend_from_slice(content);
        self.store_file(&path, combined)
    }

    async fn mkdir(&self, path: &str, parents: bool) -> Result<RemoteEntry> {
        self.check_writable()?;
        let path = paths::normalize(path);
        let mut objects = self.write_lock();

        if let Some(existing) = objects.get(&path) {
            if parents && existing.entry.is_folder() {
                return Ok(existing.entry.clone());
            }
            return Err(Error::AlreadyExists(path));
        }

        if parents {
            self.ensure_parents(&mut objects, &path);
        } else {
            Self::check_parent(&objects, &path)?;
        }

        let entry = RemoteEntry::folder(paths::file_name(&path), self.next_id());
        objects.insert(
            path,
            StoredObject {
                entry: entry.clone(),
                content: Vec::new(),
            },
        );
        Ok(entry)
    }

    async fn remove(&self, path: &str, recursive: bool) -> Result<()> {
        self.check_writable()?;
        let path = paths::normalize(path);
        if path == "/" {
            return Err(Error::Remote("refusing to remove the root folder".to_string()));
        }

        let mut objects = self.write_lock();
        if !objects.contains_key(&path) {
            return Err(Error::NotFound(path));
        }

        let descendants: Vec<String> = objects
            .keys()
            .filter(|p| paths::is_descendant(p, &path))
            .cloned()
            .collect();
        if !descendants.is_empty() && !recursive {
            return Err(Error::Remote(format!("{path}: folder not empty")));
        }

        for p in descendants {
            objects.remove(&p);
        }
        objects.remove(&path);
        Ok(())
    }

    async fn rename(&self, from: &str, to: &str) -> Result<RemoteEntry> {
        self.check_writable()?;
        let from = paths::normalize(from);
        let to = paths::normalize(to);
        let mut objects = self.write_lock();

        if !objects.contains_key(&from) {
            return Err(Error::NotFound(from));
        }
        if objects.contains_key(&to) {
            return Err(Error::AlreadyExists(to));
        }
        if paths::is_descendant(&to, &from) {
            return Err(Error::Remote(format!("cannot move {from} into itself")));
        }
        Self::check_parent(&objects, &to)?;

        let moved: Vec<String> = objects
            .keys()
            .filter(|p| **p == from || paths::is_descendant(p, &from))
            .cloned()
            .collect();

        let mut renamed = None;
        for old in moved {
            if let Some(mut object) = objects.remove(&old) {
                let new_path = format!("{to}{}", &old[from.len()..]);
                if old == from {
                    object.entry.name = paths::file_name(&to).to_string();
                    object.entry.modified = SystemTime::now();
                    renamed = Some(object.entry.clone());
                }
                objects.insert(new_path, object);
            }
        }

        renamed.ok_or_else(|| Error::Internal("renamed entry vanished".to_string()))
    }
}

/// SHA-256 of the content, hex encoded.
fn content_hash(content: &[u8]) -> String {
    Sha256::digest(content)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
