//! Built-in commands
//!
//! Every command implements [`Builtin`]; the executor looks handlers up in a
//! per-session [`Registry`] and never branches on a command's name.
//!
//! # Custom Builtins
//!
//! ```rust
//! use remsh::{async_trait, Builtin, BuiltinContext};
//! use tokio::io::AsyncWriteExt;
//!
//! struct Hello;
//!
//! #[async_trait]
//! impl Builtin for Hello {
//!     async fn execute(&self, ctx: BuiltinContext<'_>) -> remsh::Result<()> {
//!         ctx.io.stdout.write_all(b"hello\n").await?;
//!         Ok(())
//!     }
//! }
//! ```
//!
//! Register via [`ShellBuilder::builtin`](crate::ShellBuilder::builtin).

mod cat;
mod echo;
mod fileops;
mod flow;
mod ls;
mod navigation;

pub use cat::Cat;
pub use echo::Echo;
pub use fileops::{Mkdir, Mv, Rm};
pub use flow::{False, True};
pub use ls::Ls;
pub use navigation::{Cd, Pwd};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::Result;
use crate::interpreter::{CancelToken, IoEnv};
use crate::session::Session;

/// Execution context handed to a builtin.
pub struct Context<'a> {
    /// Arguments after glob expansion, command name excluded
    pub args: &'a [String],

    /// Working directory, cache, remote client and storage context
    pub session: &'a Session,

    /// Standard streams; may be pipes, redirection adapters or `/dev/null`
    pub io: &'a mut IoEnv,

    /// Fires when the line is cancelled
    pub cancel: &'a CancelToken,
}

/// A command callable from a line.
///
/// Output goes to `ctx.io`; an `Err` marks the segment as failed and feeds
/// `&&` / `||` gating. Use [`Error::ExitStatus`](crate::Error::ExitStatus) for
/// a plain unsuccessful exit.
#[async_trait]
pub trait Builtin: Send + Sync {
    async fn execute(&self, ctx: Context<'_>) -> Result<()>;
}

/// Command name to handler table.
#[derive(Clone, Default)]
pub struct Registry {
    commands: HashMap<String, Arc<dyn Builtin>>,
}

impl Registry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the standard command set.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("echo", Arc::new(Echo));
        registry.register("cat", Arc::new(Cat));
        registry.register("true", Arc::new(True));
        registry.register("false", Arc::new(False));
        registry.register("pwd", Arc::new(Pwd));
        registry.register("cd", Arc::new(Cd));
        registry.register("ls", Arc::new(Ls));
        registry.register("mkdir", Arc::new(Mkdir));
        registry.register("rm", Arc::new(Rm));
        registry.register("mv", Arc::new(Mv));
        registry
    }

    /// Add or replace a command.
    pub fn register(&mut self, name: impl Into<String>, builtin: Arc<dyn Builtin>) {
        self.commands.insert(name.into(), builtin);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Builtin>> {
        self.commands.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.commands.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Split leading `-xyz` flags from operands. A lone `-` or anything after
/// `--` is an operand.
pub(crate) fn split_flags(args: &[String]) -> (Vec<char>, Vec<&str>) {
    let mut flags = Vec::new();
    let mut operands = Vec::new();
    let mut flags_done = false;

    for arg in args {
        if !flags_done && arg == "--" {
            flags_done = true;
        } else if !flags_done && arg.len() > 1 && arg.starts_with('-') {
            flags.extend(arg.chars().skip(1));
        } else {
            operands.push(arg.as_str());
        }
    }
    (flags, operands)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Helpers for running a single builtin against a memory store.

    use super::*;
    use crate::config::ShellConfig;
    use crate::error::Error;
    use crate::interpreter::MemoryWriter;
    use crate::remote::MemoryStore;

    pub struct Outcome {
        pub stdout: String,
        pub stderr: String,
        pub result: std::result::Result<(), Error>,
    }

    pub fn session_with(store: MemoryStore) -> (Session, Arc<MemoryStore>) {
        let store = Arc::new(store);
        let session = Session::new(store.clone(), ShellConfig::default().prefetch_on_cd(false));
        (session, store)
    }

    pub async fn run(
        builtin: &dyn Builtin,
        session: &Session,
        args: &[&str],
        stdin: &str,
    ) -> Outcome {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let stdout = MemoryWriter::new();
        let stderr = MemoryWriter::new();
        let mut io = IoEnv::new(
            Box::new(std::io::Cursor::new(stdin.as_bytes().to_vec())),
            Box::new(stdout.clone()),
            Box::new(stderr.clone()),
        );
        let cancel = CancelToken::new();
        let result = builtin
            .execute(Context {
                args: &args,
                session,
                io: &mut io,
                cancel: &cancel,
            })
            .await;
        Outcome {
            stdout: String::from_utf8_lossy(&stdout.take()).into_owned(),
            stderr: String::from_utf8_lossy(&stderr.take()).into_owned(),
            result,
        }
    }
}
