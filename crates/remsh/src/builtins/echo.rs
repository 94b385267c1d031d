//! echo builtin

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::{Builtin, Context};
use crate::error::Result;

/// The echo builtin - write arguments to stdout.
///
/// Usage: echo [-n] [ARG]...
pub struct Echo;

#[async_trait]
impl Builtin for Echo {
    async fn execute(&self, ctx: Context<'_>) -> Result<()> {
        let (newline, words) = match ctx.args.first().map(String::as_str) {
            Some("-n") => (false, &ctx.args[1..]),
            _ => (true, ctx.args),
        };

        let mut line = words.join(" ");
        if newline {
            line.push('\n');
        }
        ctx.io.stdout.write_all(line.as_bytes()).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::builtins::testing::{run, session_with};
    use crate::remote::MemoryStore;

    #[tokio::test]
    async fn test_echo() {
        let (session, _) = session_with(MemoryStore::new());
        let out = run(&Echo, &session, &["hello", "world"], "").await;
        assert_eq!(out.stdout, "hello world\n");

        let out = run(&Echo, &session, &["-n", "x"], "").await;
        assert_eq!(out.stdout, "x");

        let out = run(&Echo, &session, &[], "").await;
        assert_eq!(out.stdout, "\n");
    }
}
