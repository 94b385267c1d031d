//! Virtual file cache
//!
//! An in-process mirror of the remote path structure, filled lazily one folder
//! listing at a time. Nodes are keyed by normalized absolute path. A folder's
//! children are either unknown (never listed, or invalidated) or complete:
//! a listing is installed whole under one lock, so a partial child set is
//! never observable.
//!
//! Listings fetched from the remote are installed through
//! [`VirtualCache::begin_fetch`] / [`VirtualCache::finish_fetch`]. Any local
//! change to a folder while its listing is in flight makes that listing stale,
//! and a stale listing is dropped instead of overwriting the change.
//!
//! There is no eviction. A storage-context switch replaces the cache.

pub mod loader;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::futures::Notified;
use tokio::sync::Notify;

use crate::glob::Pattern;
use crate::paths;
use crate::remote::RemoteEntry;

#[derive(Debug, Clone, Default)]
struct Node {
    /// Metadata, absent for folders known only as a path (e.g. listed before
    /// their own entry was seen)
    entry: Option<RemoteEntry>,
    /// Child names; `None` until the folder has been listed
    children: Option<BTreeSet<String>>,
}

#[derive(Debug)]
struct Tree {
    nodes: BTreeMap<String, Node>,
    /// Folders with a listing in flight, flagged once the listing is stale
    in_flight: HashMap<String, bool>,
}

impl Tree {
    fn new() -> Self {
        Self {
            nodes: root_only(),
            in_flight: HashMap::new(),
        }
    }

    /// A listing of `dir` that is in flight no longer reflects local state.
    fn touch(&mut self, dir: &str) {
        if let Some(stale) = self.in_flight.get_mut(dir) {
            *stale = true;
        }
    }

    /// Like [`touch`](Self::touch), for `dir` and every folder below it.
    fn touch_subtree(&mut self, dir: &str) {
        for (path, stale) in self.in_flight.iter_mut() {
            if path == dir || paths::is_descendant(path, dir) {
                *stale = true;
            }
        }
    }

    /// Replace `dir`'s child set with `entries` and mark it loaded.
    ///
    /// Every cached child missing from the listing is dropped with its
    /// subtree, whether or not the folder was loaded before. Surviving
    /// children keep their own loaded state.
    fn install(&mut self, dir: &str, entries: Vec<RemoteEntry>) {
        let names: BTreeSet<String> = entries.iter().map(|e| e.name.clone()).collect();
        let mut previous = self
            .nodes
            .get_mut(dir)
            .and_then(|n| n.children.take())
            .unwrap_or_default();
        previous.extend(direct_children(&self.nodes, dir));

        for stale in previous.difference(&names) {
            let path = paths::join(dir, stale);
            remove_subtree(&mut self.nodes, &path);
            self.nodes.remove(&path);
        }

        for entry in entries {
            let path = paths::join(dir, &entry.name);
            let node = self.nodes.entry(path).or_default();
            if !entry.is_folder() {
                node.children = None;
            }
            node.entry = Some(entry);
        }

        self.nodes.entry(dir.to_string()).or_default().children = Some(names);
    }
}

/// Path-keyed cache of remote metadata.
#[derive(Debug)]
pub struct VirtualCache {
    tree: RwLock<Tree>,
    /// Woken whenever an in-flight listing finishes
    fetched: Notify,
}

impl Default for VirtualCache {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualCache {
    /// Create a cache that knows only the root folder.
    pub fn new() -> Self {
        Self {
            tree: RwLock::new(Tree::new()),
            fetched: Notify::new(),
        }
    }

    /// Cached metadata for a path.
    pub fn get(&self, path: &str) -> Option<RemoteEntry> {
        let path = paths::normalize(path);
        self.read().nodes.get(&path).and_then(|n| n.entry.clone())
    }

    /// Insert or replace one entry, keeping any loaded children.
    ///
    /// When the parent folder is loaded the name joins its child set, so
    /// objects created by a command show up without a re-listing.
    pub fn add(&self, entry: RemoteEntry, path: &str) {
        let path = paths::normalize(path);
        let mut tree = self.write();

        if let Some(parent) = paths::parent(&path) {
            tree.touch(parent);
            if let Some(children) = tree.nodes.get_mut(parent).and_then(|n| n.children.as_mut()) {
                children.insert(paths::file_name(&path).to_string());
            }
        }

        tree.nodes.entry(path).or_default().entry = Some(entry);
    }

    /// Replace a folder's complete child set and mark it loaded.
    ///
    /// Cached children not in `entries` are dropped with their subtrees;
    /// children that survive keep their own loaded state.
    pub fn add_children(&self, dir: &str, entries: Vec<RemoteEntry>) {
        let dir = paths::normalize(dir);
        let mut tree = self.write();
        tree.touch(&dir);
        tree.install(&dir, entries);
    }

    /// A loaded folder's children, sorted by name. `None` if not loaded.
    pub fn get_children(&self, dir: &str) -> Option<Vec<RemoteEntry>> {
        let dir = paths::normalize(dir);
        let tree = self.read();
        let names = tree.nodes.get(&dir)?.children.as_ref()?;
        Some(
            names
                .iter()
                .filter_map(|name| tree.nodes.get(&paths::join(&dir, name))?.entry.clone())
                .collect(),
        )
    }

    /// Whether the folder's children are loaded.
    pub fn has_children(&self, dir: &str) -> bool {
        let dir = paths::normalize(dir);
        self.read()
            .nodes
            .get(&dir)
            .is_some_and(|n| n.children.is_some())
    }

    /// Forget a folder's children, forcing the next access to list it again.
    /// The folder's own entry and its ancestors are untouched.
    pub fn invalidate_children(&self, dir: &str) {
        let dir = paths::normalize(dir);
        let mut tree = self.write();
        tree.touch_subtree(&dir);
        remove_subtree(&mut tree.nodes, &dir);
        if let Some(node) = tree.nodes.get_mut(&dir) {
            node.children = None;
        }
    }

    /// Remove a path and everything below it.
    pub fn remove(&self, path: &str) {
        let path = paths::normalize(path);
        if path == "/" {
            self.clear();
            return;
        }

        let mut tree = self.write();
        tree.touch_subtree(&path);
        remove_subtree(&mut tree.nodes, &path);
        tree.nodes.remove(&path);

        if let Some(parent) = paths::parent(&path) {
            tree.touch(parent);
            if let Some(children) = tree.nodes.get_mut(parent).and_then(|n| n.children.as_mut()) {
                children.remove(paths::file_name(&path));
            }
        }
    }

    /// Full paths of cached children of `dir` whose names match `pattern`.
    ///
    /// Never touches the network: an unloaded folder yields nothing.
    pub fn match_glob(&self, dir: &str, pattern: &str) -> Vec<String> {
        let dir = paths::normalize(dir);
        let tree = self.read();
        let Some(names) = tree.nodes.get(&dir).and_then(|n| n.children.as_ref()) else {
            return Vec::new();
        };
        let pattern = Pattern::new(pattern);
        names
            .iter()
            .filter(|name| pattern.matches(name))
            .map(|name| paths::join(&dir, name))
            .collect()
    }

    /// Every cached path except the root, sorted.
    pub fn all_paths(&self) -> Vec<String> {
        self.read()
            .nodes
            .iter()
            .filter(|(path, node)| path.as_str() != "/" && node.entry.is_some())
            .map(|(path, _)| path.clone())
            .collect()
    }

    /// Drop everything except the root.
    pub fn clear(&self) {
        let mut tree = self.write();
        tree.touch_subtree("/");
        tree.nodes = root_only();
    }

    /// Number of cached paths, root excluded.
    pub fn len(&self) -> usize {
        self.read().nodes.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Claim the listing of `dir`.
    ///
    /// Returns false when the folder is already loaded or another listing of
    /// it is in flight. A successful claim must be followed by
    /// [`finish_fetch`](Self::finish_fetch).
    pub fn begin_fetch(&self, dir: &str) -> bool {
        let dir = paths::normalize(dir);
        let mut tree = self.write();
        let loaded = tree.nodes.get(&dir).is_some_and(|n| n.children.is_some());
        if loaded || tree.in_flight.contains_key(&dir) {
            return false;
        }
        tree.in_flight.insert(dir, false);
        true
    }

    /// Release the claim taken by [`begin_fetch`](Self::begin_fetch),
    /// installing `entries` when given.
    ///
    /// Returns whether the listing was installed. A listing is dropped when
    /// the folder changed locally after the claim was taken.
    pub fn finish_fetch(&self, dir: &str, entries: Option<Vec<RemoteEntry>>) -> bool {
        let dir = paths::normalize(dir);
        let installed = {
            let mut tree = self.write();
            let stale = tree.in_flight.remove(&dir).unwrap_or(true);
            match entries {
                Some(entries) if !stale => {
                    tree.install(&dir, entries);
                    true
                }
                _ => false,
            }
        };
        self.fetched.notify_waiters();
        installed
    }

    /// Resolves after the next [`finish_fetch`](Self::finish_fetch) of any
    /// folder.
    fn fetched(&self) -> Notified<'_> {
        self.fetched.notified()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tree> {
        self.tree.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tree> {
        self.tree.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn root_only() -> BTreeMap<String, Node> {
    let mut nodes = BTreeMap::new();
    nodes.insert(
        "/".to_string(),
        Node {
            entry: Some(RemoteEntry::folder("", 0)),
            children: None,
        },
    );
    nodes
}

/// Remove every node strictly below `dir`.
fn remove_subtree(nodes: &mut BTreeMap<String, Node>, dir: &str) {
    let prefix = if dir == "/" {
        "/".to_string()
    } else {
        format!("{dir}/")
    };
    // Descendants share the prefix, so they form one contiguous key range.
    let doomed: Vec<String> = nodes
        .range(prefix.clone()..)
        .map(|(path, _)| path)
        .take_while(|path| path.starts_with(&prefix))
        .filter(|path| path.as_str() != "/")
        .cloned()
        .collect();
    for path in doomed {
        nodes.remove(&path);
    }
}

/// Names of the cached nodes directly below `dir`.
fn direct_children(nodes: &BTreeMap<String, Node>, dir: &str) -> Vec<String> {
    let prefix = if dir == "/" {
        "/".to_string()
    } else {
        format!("{dir}/")
    };
    nodes
        .range(prefix.clone()..)
        .map(|(path, _)| path)
        .take_while(|path| path.starts_with(&prefix))
        .map(|path| &path[prefix.len()..])
        .filter(|rest| !rest.is_empty() && !rest.contains('/'))
        .map(str::to_string)
        .collect()
}
