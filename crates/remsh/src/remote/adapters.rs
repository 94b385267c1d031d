//! Redirection adapters
//!
//! Make a remote object look like a local byte stream for the duration of one
//! redirection. The reader downloads on open; the writer collects bytes and
//! uploads them in [`RemoteWriter::finish`].

use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};
use tracing::debug;

use super::RemoteStore;
use crate::cache::VirtualCache;
use crate::error::{Error, Result};
use crate::interpreter::MemoryWriter;
use crate::paths;

/// `< path`: a downloaded remote file.
#[derive(Debug)]
pub struct RemoteReader {
    inner: io::Cursor<Vec<u8>>,
}

impl RemoteReader {
    /// Download `path`. Fails with `NotFound` or `IsDirectory`.
    pub async fn open(remote: &dyn RemoteStore, cache: &VirtualCache, path: &str) -> Result<Self> {
        if cache.get(path).is_some_and(|e| e.is_folder()) {
            return Err(Error::IsDirectory(path.to_string()));
        }
        let content = remote.read_file(path).await?;
        debug!(path, bytes = content.len(), "opened input redirection");
        Ok(Self {
            inner: io::Cursor::new(content),
        })
    }
}

impl AsyncRead for RemoteReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

/// `> path` / `>> path`: collects output, uploads on [`finish`](Self::finish).
pub struct RemoteWriter {
    remote: Arc<dyn RemoteStore>,
    cache: Arc<VirtualCache>,
    path: String,
    append: bool,
    buffer: MemoryWriter,
}

impl RemoteWriter {
    /// Prepare a write to `path`.
    ///
    /// Fails when the target is a folder or its parent folder is missing.
    pub async fn create(
        remote: Arc<dyn RemoteStore>,
        cache: Arc<VirtualCache>,
        path: &str,
        append: bool,
    ) -> Result<Self> {
        let path = paths::normalize(path);
        check_target(remote.as_ref(), &cache, &path).await?;
        debug!(path = %path, append, "opened output redirection");
        Ok(Self {
            remote,
            cache,
            path,
            append,
            buffer: MemoryWriter::new(),
        })
    }

    /// Handle for the command to write into.
    pub fn sink(&self) -> MemoryWriter {
        self.buffer.clone()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Upload the collected bytes and record the new entry in the cache.
    pub async fn finish(self) -> Result<()> {
        let content = self.buffer.take();
        let entry = if self.append {
            self.remote.append_file(&self.path, &content).await?
        } else {
            self.remote.write_file(&self.path, &content).await?
        };
        debug!(path = %self.path, bytes = content.len(), "closed output redirection");
        self.cache.add(entry, &self.path);
        Ok(())
    }
}

async fn check_target(remote: &dyn RemoteStore, cache: &VirtualCache, path: &str) -> Result<()> {
    let existing = match cache.get(path) {
        Some(entry) => Some(entry),
        None => match remote.stat(path).await {
            Ok(entry) => Some(entry),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e),
        },
    };

    match existing {
        Some(entry) if entry.is_folder() => Err(Error::IsDirectory(path.to_string())),
        Some(_) => Ok(()),
        None => {
            let Some(parent) = paths::parent(path) else {
                return Err(Error::IsDirectory(path.to_string()));
            };
            let folder = match cache.get(parent) {
                Some(entry) => entry,
                None => remote.stat(parent).await?,
            };
            if folder.is_folder() {
                Ok(())
            } else {
                Err(Error::NotADirectory(parent.to_string()))
            }
        }
    }
}
