//! Navigation builtins (cd, pwd)

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{Builtin, Context};
use crate::cache::loader;
use crate::error::{Error, Result};

/// The cd builtin - change the working folder.
///
/// Usage: cd [DIR]
///
/// Without DIR, goes to the configured home folder. The new folder is listed
/// in the background when prefetching is enabled.
pub struct Cd;

#[async_trait]
impl Builtin for Cd {
    async fn execute(&self, ctx: Context<'_>) -> Result<()> {
        let session = ctx.session;
        let target = match ctx.args {
            [] => session.config().home.clone(),
            [dir] => dir.clone(),
            _ => return Err(Error::Usage("cd [DIR]".to_string())),
        };

        let path = session.resolve(&target);
        let entry = session.stat(&path).await.map_err(|e| match e {
            Error::NotFound(_) => Error::NotFound(target.clone()),
            other => other,
        })?;
        if !entry.is_folder() {
            return Err(Error::NotADirectory(target));
        }

        session.set_cwd(&path);
        debug!(cwd = %path, "changed directory");

        if session.config().prefetch_on_cd {
            // the handle is dropped; the listing completes on its own
            let _ = loader::spawn_prefetch(session.cache(), session.remote(), &path);
        }
        Ok(())
    }
}

/// The pwd builtin - print the working folder.
pub struct Pwd;

#[async_trait]
impl Builtin for Pwd {
    async fn execute(&self, ctx: Context<'_>) -> Result<()> {
        let cwd = ctx.session.cwd();
        ctx.io.stdout.write_all(format!("{cwd}\n").as_bytes()).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::builtins::testing::{run, session_with};
    use crate::config::ShellConfig;
    use crate::remote::MemoryStore;
    use crate::session::Session;
    use std::sync::Arc;
    use std::time::Duration;

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_file("/docs/a.txt", "a");
        store.insert_folder("/docs/sub");
        store
    }

    #[tokio::test]
    async fn test_cd_and_pwd() {
        let (session, _) = session_with(store());
        assert!(run(&Cd, &session, &["docs/sub"], "").await.result.is_ok());
        assert_eq!(run(&Pwd, &session, &[], "").await.stdout, "/docs/sub\n");

        assert!(run(&Cd, &session, &[".."], "").await.result.is_ok());
        assert_eq!(session.cwd(), "/docs");

        assert!(run(&Cd, &session, &[], "").await.result.is_ok());
        assert_eq!(session.cwd(), "/");
    }

    #[tokio::test]
    async fn test_cd_errors() {
        let (session, _) = session_with(store());
        let out = run(&Cd, &session, &["nope"], "").await;
        assert_eq!(out.result.unwrap_err().to_string(), "nope: no such file or directory");

        let out = run(&Cd, &session, &["docs/a.txt"], "").await;
        assert!(matches!(out.result, Err(Error::NotADirectory(_))));
        assert_eq!(session.cwd(), "/");

        let out = run(&Cd, &session, &["a", "b"], "").await;
        assert!(matches!(out.result, Err(Error::Usage(_))));
    }

    #[tokio::test]
    async fn test_cd_prefetches_listing() {
        let store = Arc::new(store());
        let session = Session::new(store.clone(), ShellConfig::default());

        run(&Cd, &session, &["docs"], "").await.result.unwrap();
        for _ in 0..50 {
            if session.cache().has_children("/docs") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert!(session.cache().has_children("/docs"));
        assert_eq!(store.list_calls(), 1);
    }
}
