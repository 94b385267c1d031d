//! Filling the cache from the remote listing client
//!
//! - [`ensure_children`]: foreground listing on a cache miss
//! - [`spawn_prefetch`]: background listing, at most one in flight per folder
//! - [`preload`]: breadth-first folder tree listing at session start

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::VirtualCache;
use crate::error::Result;
use crate::paths;
use crate::remote::{RemoteEntry, RemoteStore};

/// Listings of a folder that keeps changing locally before one is served
/// uncached.
const LISTING_ATTEMPTS: usize = 3;

/// Children of `dir`, listing and caching them first if they are not loaded.
///
/// Waits for a listing already in flight instead of starting another one.
pub async fn ensure_children(
    cache: &VirtualCache,
    remote: &dyn RemoteStore,
    dir: &str,
) -> Result<Vec<RemoteEntry>> {
    let dir = paths::normalize(dir);
    let mut attempts = 0;

    loop {
        if let Some(children) = cache.get_children(&dir) {
            return Ok(children);
        }

        // Registered before the claim so a fetch finishing in between still wakes us.
        let fetched = cache.fetched();
        tokio::pin!(fetched);
        fetched.as_mut().enable();
        if !cache.begin_fetch(&dir) {
            trace!(dir = %dir, "waiting for in-flight listing");
            fetched.await;
            continue;
        }

        debug!(dir = %dir, "cache miss, listing folder");
        let mut entries = match remote.list_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                cache.finish_fetch(&dir, None);
                return Err(e);
            }
        };
        attempts += 1;

        if cache.finish_fetch(&dir, Some(entries.clone())) {
            continue;
        }
        if attempts >= LISTING_ATTEMPTS {
            warn!(dir = %dir, attempts, "folder keeps changing, serving listing uncached");
            entries.sort_by(|a, b| a.name.cmp(&b.name));
            return Ok(entries);
        }
        debug!(dir = %dir, "folder changed while listing, listing again");
    }
}

/// List `dir` in the background.
///
/// Returns `None` without spawning when the folder is already loaded or a
/// listing for it is already in flight. Failures are logged, not surfaced.
/// A listing that went stale while in flight is dropped.
pub fn spawn_prefetch(
    cache: Arc<VirtualCache>,
    remote: Arc<dyn RemoteStore>,
    dir: &str,
) -> Option<JoinHandle<()>> {
    let dir = paths::normalize(dir);
    if !cache.begin_fetch(&dir) {
        return None;
    }

    debug!(dir = %dir, "prefetching folder");
    Some(tokio::spawn(async move {
        match remote.list_dir(&dir).await {
            Ok(entries) => {
                if !cache.finish_fetch(&dir, Some(entries)) {
                    debug!(dir = %dir, "folder changed while prefetching, listing dropped");
                }
            }
            Err(e) => {
                cache.finish_fetch(&dir, None);
                warn!(dir = %dir, error = %e, "prefetch failed");
            }
        }
    }))
}

/// List folders breadth-first from `root`, `depth` levels deep.
///
/// Depth 1 lists `root` only. A failure on `root` is returned; failures
/// below it are logged and skipped. Returns the number of folders listed.
pub async fn preload(
    cache: &VirtualCache,
    remote: &dyn RemoteStore,
    root: &str,
    depth: usize,
) -> Result<usize> {
    let root = paths::normalize(root);
    let mut frontier = vec![root.clone()];
    let mut listed = 0;

    for level in 0..depth {
        let mut next = Vec::new();
        for dir in frontier {
            let children = match ensure_children(cache, remote, &dir).await {
                Ok(children) => children,
                Err(e) if dir == root => return Err(e),
                Err(e) => {
                    warn!(dir = %dir, error = %e, "preload skipped folder");
                    continue;
                }
            };
            listed += 1;
            next.extend(
                children
                    .iter()
                    .filter(|e| e.is_folder())
                    .map(|e| paths::join(&dir, &e.name)),
            );
        }
        debug!(level, folders = listed, "preload level done");
        frontier = next;
    }

    Ok(listed)
}
