//! Remote storage interface
//!
//! The shell never talks to the network directly. Everything it needs from the
//! storage service goes through [`RemoteStore`]:
//! - `list_dir` is the listing client the cache falls back to on a miss
//! - `read_file` / `write_file` / `append_file` back the redirection adapters
//! - the rest serve the builtins that create, rename and delete objects
//!
//! [`MemoryStore`] is an in-process implementation for tests and the CLI.

mod adapters;
mod memory;

pub use adapters::{RemoteReader, RemoteWriter};
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::error::Result;

/// Async remote storage trait.
///
/// All paths are normalized and absolute.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Immediate children of a folder.
    async fn list_dir(&self, path: &str) -> Result<Vec<RemoteEntry>>;

    /// Metadata for one object.
    async fn stat(&self, path: &str) -> Result<RemoteEntry>;

    /// Download a file's contents.
    async fn read_file(&self, path: &str) -> Result<Vec<u8>>;

    /// Create or replace a file.
    async fn write_file(&self, path: &str, content: &[u8]) -> Result<RemoteEntry>;

    /// Append to a file, creating it if missing.
    async fn append_file(&self, path: &str, content: &[u8]) -> Result<RemoteEntry>;

    /// Create a folder. Parents must exist unless `parents` is set.
    async fn mkdir(&self, path: &str, parents: bool) -> Result<RemoteEntry>;

    /// Delete an object. Non-empty folders need `recursive`.
    async fn remove(&self, path: &str, recursive: bool) -> Result<()>;

    /// Move or rename an object.
    async fn rename(&self, from: &str, to: &str) -> Result<RemoteEntry>;
}

/// Kind of a remote object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Folder,
    File,
}

/// Metadata for one remote object, as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    /// Entry name (not full path)
    pub name: String,
    pub kind: EntryKind,
    /// Service-assigned object id
    pub id: u64,
    /// Size in bytes (0 for folders)
    pub size: u64,
    /// Content hash, when the service provides one
    pub hash: Option<String>,
    pub created: SystemTime,
    pub modified: SystemTime,
}

impl RemoteEntry {
    /// Create a folder entry.
    pub fn folder(name: impl Into<String>, id: u64) -> Self {
        let now = SystemTime::now();
        Self {
            name: name.into(),
            kind: EntryKind::Folder,
            id,
            size: 0,
            hash: None,
            created: now,
            modified: now,
        }
    }

    /// Create a file entry.
    pub fn file(name: impl Into<String>, id: u64, size: u64) -> Self {
        let now = SystemTime::now();
        Self {
            name: name.into(),
            kind: EntryKind::File,
            id,
            size,
            hash: None,
            created: now,
            modified: now,
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind == EntryKind::Folder
    }
}
