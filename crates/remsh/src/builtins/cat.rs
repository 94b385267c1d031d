//! cat builtin

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::{Builtin, Context};
use crate::error::{Error, Result};
use crate::session::Session;

/// The cat builtin - concatenate remote files (or stdin) to stdout.
///
/// Usage: cat [FILE]...
///
/// With no FILE, or when FILE is `-`, reads stdin. A file that cannot be read
/// is reported on stderr and the remaining files are still written.
pub struct Cat;

#[async_trait]
impl Builtin for Cat {
    async fn execute(&self, ctx: Context<'_>) -> Result<()> {
        if ctx.args.is_empty() {
            tokio::io::copy(&mut ctx.io.stdin, &mut ctx.io.stdout).await?;
            return Ok(());
        }

        let mut failed = false;
        for arg in ctx.args {
            if arg == "-" {
                tokio::io::copy(&mut ctx.io.stdin, &mut ctx.io.stdout).await?;
                continue;
            }

            match read(ctx.session, arg).await {
                Ok(content) => ctx.io.stdout.write_all(&content).await?,
                Err(e) => {
                    failed = true;
                    ctx.io
                        .stderr
                        .write_all(format!("cat: {e}\n").as_bytes())
                        .await?;
                }
            }
        }

        if failed {
            return Err(Error::ExitStatus(1));
        }
        Ok(())
    }
}

async fn read(session: &Session, arg: &str) -> Result<Vec<u8>> {
    let path = session.resolve(arg);
    if session.cache().get(&path).is_some_and(|e| e.is_folder()) {
        return Err(Error::IsDirectory(arg.to_string()));
    }
    session.remote().read_file(&path).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::builtins::testing::{run, session_with};
    use crate::remote::MemoryStore;

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_file("/a.txt", "alpha\n");
        store.insert_file("/b.txt", "beta\n");
        store
    }

    #[tokio::test]
    async fn test_cat_files() {
        let (session, _) = session_with(store());
        let out = run(&Cat, &session, &["a.txt", "/b.txt"], "").await;
        assert_eq!(out.stdout, "alpha\nbeta\n");
        assert!(out.result.is_ok());
    }

    #[tokio::test]
    async fn test_cat_stdin() {
        let (session, _) = session_with(store());
        let out = run(&Cat, &session, &[], "piped").await;
        assert_eq!(out.stdout, "piped");

        let out = run(&Cat, &session, &["a.txt", "-"], "tail").await;
        assert_eq!(out.stdout, "alpha\ntail");
    }

    #[tokio::test]
    async fn test_cat_missing_continues() {
        let (session, _) = session_with(store());
        let out = run(&Cat, &session, &["nope", "b.txt"], "").await;
        assert_eq!(out.stdout, "beta\n");
        assert!(out.stderr.contains("no such file"));
        assert!(matches!(out.result, Err(Error::ExitStatus(1))));
    }
}
