//! remsh - a shell over remote file storage
//!
//! Runs Unix-style command lines (pipelines, redirection, `&&` / `||` / `;`,
//! globbing) against a path-addressed remote object store, keeping a local
//! cache of folder listings to avoid repeated round-trips.
//!
//! # Example
//!
//! ```rust
//! use remsh::{MemoryStore, Shell};
//! use std::sync::Arc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let store = Arc::new(MemoryStore::new());
//!     store.insert_file("/docs/a.txt", "alpha\n");
//!
//!     let shell = Shell::builder().remote(store.clone()).build();
//!     let result = shell.exec("cd docs && cat *.txt > copy.txt").await;
//!     assert!(result.is_success());
//!     assert_eq!(store.contents("/docs/copy.txt").unwrap(), b"alpha\n");
//! }
//! ```

mod builtins;
pub mod cache;
mod config;
mod error;
pub mod glob;
mod interpreter;
mod logging_impl;
pub mod parser;
pub mod paths;
pub mod remote;
mod session;

pub use async_trait::async_trait;
pub use builtins::{Builtin, Context as BuiltinContext, Registry};
pub use config::ShellConfig;
pub use error::{Error, Result};
pub use interpreter::{
    BoxReader, BoxWriter, CancelToken, ExecResult, Executor, IoEnv, MemoryWriter, SharedWriter,
};
pub use logging_impl::LogConfig;
pub use remote::{EntryKind, MemoryStore, RemoteEntry, RemoteStore};
pub use session::{Session, StorageContext};

use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use cache::loader;
use logging_impl::format_line_for_log;

/// A shell session bound to one remote store.
pub struct Shell {
    session: Arc<Session>,
    registry: Registry,
    log_config: LogConfig,
}

impl Default for Shell {
    fn default() -> Self {
        Self::new()
    }
}

impl Shell {
    /// Create a shell over an empty in-memory store.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a builder for a customized shell.
    pub fn builder() -> ShellBuilder {
        ShellBuilder::default()
    }

    /// Run a line and collect its output.
    ///
    /// Failures, including lexical and syntax errors, are reported in
    /// [`ExecResult::error`].
    pub async fn exec(&self, line: &str) -> ExecResult {
        self.exec_with_cancel(line, &CancelToken::new()).await
    }

    /// Like [`exec`](Self::exec), stopping early when `cancel` fires.
    pub async fn exec_with_cancel(&self, line: &str, cancel: &CancelToken) -> ExecResult {
        let stdout = MemoryWriter::new();
        let stderr = MemoryWriter::new();
        let error = self
            .run_line_with_cancel(
                line,
                Box::new(stdout.clone()),
                Box::new(stderr.clone()),
                cancel,
            )
            .await
            .err();

        ExecResult {
            stdout: String::from_utf8_lossy(&stdout.take()).into_owned(),
            stderr: String::from_utf8_lossy(&stderr.take()).into_owned(),
            error,
        }
    }

    /// Run a line, streaming unredirected output to the given writers.
    pub async fn run_line(&self, line: &str, stdout: BoxWriter, stderr: BoxWriter) -> Result<()> {
        self.run_line_with_cancel(line, stdout, stderr, &CancelToken::new())
            .await
    }

    /// Like [`run_line`](Self::run_line), stopping early when `cancel` fires.
    pub async fn run_line_with_cancel(
        &self,
        line: &str,
        stdout: BoxWriter,
        stderr: BoxWriter,
        cancel: &CancelToken,
    ) -> Result<()> {
        let tokens = parser::tokenize(line)?;
        debug!(
            line = %format_line_for_log(line, tokens.len(), &self.log_config),
            "parsed line"
        );
        let chain = parser::parse_chain(&tokens)?;

        let mut stdout = SharedWriter::new(stdout);
        let mut stderr = SharedWriter::new(stderr);
        let result = Executor::new(&self.session, &self.registry, cancel)
            .run_chain(&chain, stdout.clone(), stderr.clone())
            .await;

        stdout.flush().await?;
        stderr.flush().await?;
        result
    }

    /// List the folder tree to the configured preload depth.
    pub async fn preload(&self) -> Result<usize> {
        let depth = self.session.config().preload_depth;
        let cache = self.session.cache();
        let remote = self.session.remote();
        let listed = loader::preload(&cache, remote.as_ref(), "/", depth).await?;
        debug!(folders = listed, depth, "preloaded folder tree");
        Ok(listed)
    }

    /// Switch storage area, discarding the cache.
    pub fn switch_context(&self, context: StorageContext, remote: Option<Arc<dyn RemoteStore>>) {
        self.session.switch_context(context, remote);
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn cwd(&self) -> String {
        self.session.cwd()
    }
}

/// Builder for customized shell configuration.
#[derive(Default)]
pub struct ShellBuilder {
    remote: Option<Arc<dyn RemoteStore>>,
    cwd: Option<String>,
    config: ShellConfig,
    log_config: LogConfig,
    context: Option<StorageContext>,
    builtins: Vec<(String, Arc<dyn Builtin>)>,
}

impl ShellBuilder {
    /// Set the remote store (default: an empty [`MemoryStore`]).
    pub fn remote(mut self, remote: Arc<dyn RemoteStore>) -> Self {
        self.remote = Some(remote);
        self
    }

    /// Set the starting working folder.
    pub fn cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn config(mut self, config: ShellConfig) -> Self {
        self.config = config;
        self
    }

    pub fn log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }

    /// Set the starting storage context.
    pub fn context(mut self, context: StorageContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Register an extra command, replacing any builtin of the same name.
    pub fn builtin(mut self, name: impl Into<String>, builtin: Box<dyn Builtin>) -> Self {
        self.builtins.push((name.into(), Arc::from(builtin)));
        self
    }

    /// Build the shell.
    pub fn build(self) -> Shell {
        let remote = self
            .remote
            .unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let session = Session::new(remote, self.config);

        if let Some(context) = self.context {
            session.switch_context(context, None);
        }
        if let Some(cwd) = self.cwd {
            session.set_cwd(&cwd);
        }

        let mut registry = Registry::with_defaults();
        for (name, builtin) in self.builtins {
            registry.register(name, builtin);
        }

        Shell {
            session: Arc::new(session),
            registry,
            log_config: self.log_config,
        }
    }
}
