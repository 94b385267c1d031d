//! File operation builtins - mkdir, rm, mv
//!
//! Each applies the change remotely, then updates the cache in place so the
//! next listing or glob sees it without a re-fetch.

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use super::{split_flags, Builtin, Context};
use crate::cache::VirtualCache;
use crate::error::{Error, Result};
use crate::paths;

/// The mkdir builtin - create folders.
///
/// Usage: mkdir [-p] DIR...
///
/// Options:
///   -p   Create parent folders as needed, no error if existing
pub struct Mkdir;

#[async_trait]
impl Builtin for Mkdir {
    async fn execute(&self, ctx: Context<'_>) -> Result<()> {
        let (flags, dirs) = split_flags(ctx.args);
        if dirs.is_empty() {
            return Err(Error::Usage("mkdir [-p] DIR...".to_string()));
        }
        let parents = flags.contains(&'p');
        let session = ctx.session;

        for dir in dirs {
            let path = session.resolve(dir);
            let entry = session.remote().mkdir(&path, parents).await?;
            let cache = session.cache();
            if parents {
                forget_stale_listing(&cache, &path);
            }
            cache.add(entry, &path);
            debug!(path = %path, "created folder");
        }
        Ok(())
    }
}

/// `mkdir -p` may create intermediate folders the nearest listed ancestor
/// does not know about; make that ancestor list again.
fn forget_stale_listing(cache: &VirtualCache, path: &str) {
    let mut child = path;
    while let Some(dir) = paths::parent(child) {
        if cache.has_children(dir) {
            if child != path && cache.get(child).is_none() {
                cache.invalidate_children(dir);
            }
            return;
        }
        child = dir;
    }
}

/// The rm builtin - remove files or folders.
///
/// Usage: rm [-rf] PATH...
///
/// Options:
///   -r, -R   Remove folders and their contents
///   -f       Ignore missing paths
pub struct Rm;

#[async_trait]
impl Builtin for Rm {
    async fn execute(&self, ctx: Context<'_>) -> Result<()> {
        let (flags, targets) = split_flags(ctx.args);
        let recursive = flags.iter().any(|f| *f == 'r' || *f == 'R');
        let force = flags.contains(&'f');
        if targets.is_empty() && !force {
            return Err(Error::Usage("rm [-rf] PATH...".to_string()));
        }

        let session = ctx.session;
        let mut failed = false;
        for target in targets {
            let path = session.resolve(target);
            let result = match session.stat(&path).await {
                Ok(entry) if entry.is_folder() && !recursive => {
                    Err(Error::IsDirectory(target.to_string()))
                }
                Ok(_) => session.remote().remove(&path, recursive).await,
                Err(e) if e.is_not_found() && force => continue,
                Err(e) if e.is_not_found() => Err(Error::NotFound(target.to_string())),
                Err(e) => Err(e),
            };

            match result {
                Ok(()) => {
                    session.cache().remove(&path);
                    debug!(path = %path, "removed");
                }
                Err(e) => {
                    failed = true;
                    ctx.io
                        .stderr
                        .write_all(format!("rm: {e}\n").as_bytes())
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

/// The mv builtin - move or rename.
///
/// Usage: mv SOURCE... DEST
///
/// With several sources, or when DEST is an existing folder, sources move
/// into DEST keeping their names.
pub struct Mv;

#[async_trait]
impl Builtin for Mv {
    async fn execute(&self, ctx: Context<'_>) -> Result<()> {
        let (_, operands) = split_flags(ctx.args);
        let [sources @ .., dest] = operands.as_slice() else {
            return Err(Error::Usage("mv SOURCE... DEST".to_string()));
        };
        if sources.is_empty() {
            return Err(Error::Usage("mv SOURCE... DEST".to_string()));
        }

        let session = ctx.session;
        let dest_path = session.resolve(dest);
        let into_folder = match session.stat(&dest_path).await {
            Ok(entry) => entry.is_folder(),
            Err(e) if e.is_not_found() => false,
            Err(e) => return Err(e),
        };
        if sources.len() > 1 && !into_folder {
            return Err(Error::NotADirectory(dest.to_string()));
        }

        for source in sources {
            let from = session.resolve(source);
            let to = if into_folder {
                paths::join(&dest_path, paths::file_name(&from))
            } else {
                dest_path.clone()
            };

            let entry = session.remote().rename(&from, &to).await?;
            let cache = session.cache();
            cache.remove(&from);
            cache.add(entry, &to);
            debug!(from = %from, to = %to, "moved");
        }
        Ok(())
    }
}
