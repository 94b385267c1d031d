//! Per-session state shared by the executor and the builtins

use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tracing::debug;

use crate::cache::VirtualCache;
use crate::config::ShellConfig;
use crate::error::Result;
use crate::paths;
use crate::remote::{RemoteEntry, RemoteStore};

/// Which storage area the session addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageContext {
    /// Tenant (team / organisation) id; `None` for the personal area
    pub tenant: Option<String>,
    /// Whether the encrypted vault area is active
    pub vault: bool,
}

impl StorageContext {
    pub fn personal() -> Self {
        Self::default()
    }

    pub fn tenant(id: impl Into<String>) -> Self {
        Self {
            tenant: Some(id.into()),
            vault: false,
        }
    }

    pub fn vault() -> Self {
        Self {
            tenant: None,
            vault: true,
        }
    }
}

impl std::fmt::Display for StorageContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.tenant, self.vault) {
            (Some(t), true) => write!(f, "tenant:{t}/vault"),
            (Some(t), false) => write!(f, "tenant:{t}"),
            (None, true) => write!(f, "vault"),
            (None, false) => write!(f, "personal"),
        }
    }
}

/// Working directory, active cache and storage context of one shell.
///
/// Interior mutability lets builtins such as `cd` update the session through a
/// shared reference while other segments of the same pipeline run.
pub struct Session {
    cwd: RwLock<String>,
    cache: RwLock<Arc<VirtualCache>>,
    remote: RwLock<Arc<dyn RemoteStore>>,
    context: RwLock<StorageContext>,
    config: ShellConfig,
}

impl Session {
    pub fn new(remote: Arc<dyn RemoteStore>, config: ShellConfig) -> Self {
        Self {
            cwd: RwLock::new("/".to_string()),
            cache: RwLock::new(Arc::new(VirtualCache::new())),
            remote: RwLock::new(remote),
            context: RwLock::new(StorageContext::default()),
            config,
        }
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    pub fn cwd(&self) -> String {
        self.cwd.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Set the working directory. The path is resolved against the current one.
    pub fn set_cwd(&self, path: &str) {
        let resolved = self.resolve(path);
        *self.cwd.write().unwrap_or_else(|e| e.into_inner()) = resolved;
    }

    /// Resolve a path against the working directory.
    pub fn resolve(&self, path: &str) -> String {
        paths::resolve(&self.cwd(), path)
    }

    /// The active cache. Callers keep working on the returned handle even if a
    /// context switch replaces it meanwhile.
    pub fn cache(&self) -> Arc<VirtualCache> {
        self.cache.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn remote(&self) -> Arc<dyn RemoteStore> {
        self.remote.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Metadata for a path, from the cache or else from the remote store.
    /// A remote hit is recorded in the cache.
    pub async fn stat(&self, path: &str) -> Result<RemoteEntry> {
        let path = self.resolve(path);
        let cache = self.cache();
        if let Some(entry) = cache.get(&path) {
            return Ok(entry);
        }
        let entry = self.remote().stat(&path).await?;
        cache.add(entry.clone(), &path);
        Ok(entry)
    }

    pub fn context(&self) -> StorageContext {
        self.context.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Switch storage area.
    ///
    /// The cache is discarded wholesale and the working directory returns to
    /// the root. A new remote client replaces the current one when given.
    pub fn switch_context(&self, context: StorageContext, remote: Option<Arc<dyn RemoteStore>>) {
        debug!(context = %context, "switching storage context");
        if let Some(remote) = remote {
            *self.remote.write().unwrap_or_else(|e| e.into_inner()) = remote;
        }
        *self.cache.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(VirtualCache::new());
        *self.context.write().unwrap_or_else(|e| e.into_inner()) = context;
        *self.cwd.write().unwrap_or_else(|e| e.into_inner()) = "/".to_string();
    }
}
