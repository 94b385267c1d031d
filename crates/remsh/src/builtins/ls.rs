//! ls builtin

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::{split_flags, Builtin, Context};
use crate::cache::loader;
use crate::error::{Error, Result};
use crate::remote::RemoteEntry;

/// The ls builtin - list folder contents.
///
/// Usage: ls [-la] [PATH]...
///
/// Options:
///   -l   Long format: kind, size, name
///   -a   Include names starting with `.`
///
/// Listings come from the cache; a folder that is not loaded yet is fetched
/// and cached first.
pub struct Ls;

#[async_trait]
impl Builtin for Ls {
    async fn execute(&self, ctx: Context<'_>) -> Result<()> {
        let (flags, mut operands) = split_flags(ctx.args);
        let long = flags.contains(&'l');
        let all = flags.contains(&'a');
        if operands.is_empty() {
            operands.push(".");
        }

        let session = ctx.session;
        let cache = session.cache();
        let remote = session.remote();
        let with_headers = operands.len() > 1;
        let mut out = String::new();
        let mut failed = false;

        for operand in &operands {
            let path = session.resolve(operand);
            let entry = match session.stat(&path).await {
                Ok(entry) => entry,
                Err(e) => {
                    failed = true;
                    let msg = match e {
                        Error::NotFound(_) => Error::NotFound(operand.to_string()).to_string(),
                        other => other.to_string(),
                    };
                    ctx.io
                        .stderr
                        .write_all(format!("ls: {msg}\n").as_bytes())
                        .await?;
                    continue;
                }
            };

            if !entry.is_folder() {
                out.push_str(&format_entry(&entry, operand, long));
                continue;
            }

            let children = loader::ensure_children(&cache, remote.as_ref(), &path).await?;
            if with_headers {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(&format!("{operand}:\n"));
            }
            for child in children.iter().filter(|c| all || !c.name.starts_with('.')) {
                out.push_str(&format_entry(child, &child.name, long));
            }
        }

        ctx.io.stdout.write_all(out.as_bytes()).await?;
        if failed {
            return Err(Error::ExitStatus(2));
        }
        Ok(())
    }
}

fn format_entry(entry: &RemoteEntry, shown: &str, long: bool) -> String {
    if !long {
        return format!("{shown}\n");
    }
    let kind = if entry.is_folder() { 'd' } else { '-' };
    format!("{kind} {:>10} {shown}\n", entry.size)
}
