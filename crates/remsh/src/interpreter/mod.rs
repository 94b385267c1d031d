//! Executor for parsed command lines
//!
//! Walks a [`CommandChain`] left to right, gating each pipeline on the outcome
//! so far. For each pipeline, in order:
//! 1. every command name is looked up, so an unknown command fails before any
//!    remote I/O
//! 2. redirections are opened (`/dev/null` never reaches the store)
//! 3. arguments are glob-expanded against the cache
//! 4. segments run, concurrently when there is more than one, connected by
//!    bounded pipes
//! 5. output redirections upload what their segment wrote
//!
//! A command's own error always wins over a failure to close its
//! redirections.

mod cancel;
mod io;
mod state;

pub use cancel::CancelToken;
pub use io::{BoxReader, BoxWriter, IoEnv, MemoryWriter, SharedWriter};
pub use state::ExecResult;

use futures_util::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace, warn};

use crate::builtins::{Builtin, Context, Registry};
use crate::error::{Error, Result};
use crate::glob::GlobExpander;
use crate::parser::{ChainOperator, CommandChain, OutputTarget, Pipeline};
use crate::remote::{RemoteReader, RemoteWriter};
use crate::session::Session;

/// Path that discards output and reads as empty, without touching the store.
pub const DEV_NULL: &str = "/dev/null";

/// Runs chains and pipelines for one session.
pub struct Executor<'a> {
    session: &'a Session,
    registry: &'a Registry,
    cancel: &'a CancelToken,
}

/// An opened `>`/`>>`/`2>`/`2>>` target.
enum OutputRedirect {
    Null,
    Remote(RemoteWriter),
}

impl OutputRedirect {
    fn writer(&self) -> BoxWriter {
        match self {
            Self::Null => Box::new(tokio::io::sink()),
            Self::Remote(remote) => Box::new(remote.sink()),
        }
    }

    async fn finish(self) -> Result<()> {
        match self {
            Self::Null => Ok(()),
            Self::Remote(remote) => remote.finish().await,
        }
    }
}

/// Everything one segment needs to run.
struct SegmentJob {
    name: String,
    handler: Arc<dyn Builtin>,
    args: Vec<String>,
    io: IoEnv,
    /// Redirections to close after the command, in order
    closers: Vec<OutputRedirect>,
    /// stdout feeds the next segment's stdin
    pipe_out: bool,
}

impl<'a> Executor<'a> {
    pub fn new(session: &'a Session, registry: &'a Registry, cancel: &'a CancelToken) -> Self {
        Self {
            session,
            registry,
            cancel,
        }
    }

    /// Run a chain. The result is that of the last pipeline that ran.
    ///
    /// `stdout` / `stderr` are where unredirected output goes; the top-level
    /// stdin is empty.
    pub async fn run_chain(
        &self,
        chain: &CommandChain,
        stdout: SharedWriter,
        stderr: SharedWriter,
    ) -> Result<()> {
        let mut status: Result<()> = Ok(());
        let mut gate = ChainOperator::None;

        for link in &chain.links {
            if !gate.allows_next(status.is_err()) {
                trace!(commands = ?link.pipeline.names(), "skipped by chain operator");
                gate = link.operator;
                continue;
            }
            if self.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            status = self.run_pipeline(&link.pipeline, &stdout, &stderr).await;
            if let Err(e) = &status {
                debug!(error = %e, "pipeline failed");
            }
            gate = link.operator;
        }

        status
    }

    /// Run one pipeline.
    ///
    /// With several segments the first failure to be detected is returned,
    /// prefixed with the failing segment's command name.
    pub async fn run_pipeline(
        &self,
        pipeline: &Pipeline,
        stdout: &SharedWriter,
        stderr: &SharedWriter,
    ) -> Result<()> {
        let (Some(first), Some(last)) = (pipeline.segments.first(), pipeline.segments.last()) else {
            return Ok(());
        };
        debug!(commands = ?pipeline.names(), "running pipeline");

        let handlers = pipeline
            .segments
            .iter()
            .map(|s| {
                self.registry
                    .get(&s.name)
                    .ok_or_else(|| Error::CommandNotFound(s.name.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        let input = match &first.input {
            Some(path) => Some(self.open_input(path).await?),
            None => None,
        };
        let mut output = match &last.output {
            Some(target) => Some(self.open_output(target).await?),
            None => None,
        };
        let mut error = match &last.error {
            Some(target) => Some(self.open_output(target).await?),
            None => None,
        };

        let cwd = self.session.cwd();
        let cache = self.session.cache();
        let remote = self.session.remote();
        let expander = GlobExpander::new(
            &cache,
            remote.as_ref(),
            &cwd,
            self.session.config().expand_quoted_globs,
        );
        let mut argvs = Vec::with_capacity(pipeline.len());
        for segment in &pipeline.segments {
            argvs.push(expander.expand(&segment.args).await?);
        }

        let last_index = pipeline.len() - 1;
        let pipe_size = self.session.config().pipe_buffer_size;
        let mut stdin: BoxReader = input.unwrap_or_else(|| Box::new(tokio::io::empty()));
        let mut jobs = Vec::with_capacity(pipeline.len());

        for (i, ((segment, handler), args)) in pipeline
            .segments
            .iter()
            .zip(handlers)
            .zip(argvs)
            .enumerate()
        {
            let pipe_out = i < last_index;
            let mut closers = Vec::new();
            let seg_stdin = std::mem::replace(&mut stdin, Box::new(tokio::io::empty()));

            let seg_stdout: BoxWriter = if pipe_out {
                let (writer, reader) = tokio::io::duplex(pipe_size);
                stdin = Box::new(reader);
                Box::new(writer)
            } else {
                match output.take() {
                    Some(redirect) => {
                        let writer = redirect.writer();
                        closers.push(redirect);
                        writer
                    }
                    None => Box::new(stdout.clone()),
                }
            };

            // `2>&1`: stderr goes wherever this segment's stdout goes
            let (seg_stdout, seg_stderr): (BoxWriter, BoxWriter) = if segment.merge_stderr {
                let shared = SharedWriter::new(seg_stdout);
                (Box::new(shared.clone()), Box::new(shared))
            } else {
                let redirect = if pipe_out { None } else { error.take() };
                let seg_stderr: BoxWriter = match redirect {
                    Some(redirect) => {
                        let writer = redirect.writer();
                        closers.push(redirect);
                        writer
                    }
                    None => Box::new(stderr.clone()),
                };
                (seg_stdout, seg_stderr)
            };

            jobs.push(SegmentJob {
                name: segment.name.clone(),
                handler,
                args,
                io: IoEnv::new(seg_stdin, seg_stdout, seg_stderr),
                closers,
                pipe_out,
            });
        }

        if jobs.len() == 1 {
            if let Some(job) = jobs.pop() {
                return self.run_segment(job).await;
            }
        }

        let mut running: FuturesUnordered<_> = jobs
            .into_iter()
            .map(|job| async move {
                let name = job.name.clone();
                (name, self.run_segment(job).await)
            })
            .collect();

        let mut first_error = None;
        while let Some((name, result)) = running.next().await {
            if let Err(e) = result {
                if first_error.is_none() {
                    debug!(command = %name, error = %e, "segment failed");
                    first_error = Some(e.in_segment(name));
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Run one segment, then release its streams and close its redirections.
    async fn run_segment(&self, job: SegmentJob) -> Result<()> {
        let SegmentJob {
            name,
            handler,
            args,
            mut io,
            closers,
            pipe_out,
        } = job;
        debug!(command = %name, args = args.len(), "dispatching segment");

        let result = tokio::select! {
            result = handler.execute(Context {
                args: &args,
                session: self.session,
                io: &mut io,
                cancel: self.cancel,
            }) => result,
            _ = self.cancel.cancelled() => Err(Error::Cancelled),
        };

        let flushed = io.stdout.flush().await;
        // dropping the write end is what signals end-of-stream downstream
        drop(io);

        // a reader that stopped early is not this segment's failure
        let result = match result {
            Err(Error::Io(e)) if pipe_out && e.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
            other => other,
        };
        if matches!(result, Err(Error::Cancelled)) {
            return result;
        }

        let mut close_error = match flushed {
            Err(e) if !(pipe_out && e.kind() == std::io::ErrorKind::BrokenPipe) => {
                Some(Error::Io(e))
            }
            _ => None,
        };
        for closer in closers {
            if let Err(e) = closer.finish().await {
                warn!(command = %name, error = %e, "closing redirection failed");
                close_error.get_or_insert(e);
            }
        }

        result?;
        match close_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn open_input(&self, path: &str) -> Result<BoxReader> {
        let path = self.session.resolve(path);
        if path == DEV_NULL {
            return Ok(Box::new(tokio::io::empty()));
        }
        let cache = self.session.cache();
        let reader = RemoteReader::open(self.session.remote().as_ref(), &cache, &path).await?;
        Ok(Box::new(reader))
    }

    async fn open_output(&self, target: &OutputTarget) -> Result<OutputRedirect> {
        let path = self.session.resolve(&target.path);
        if path == DEV_NULL {
            return Ok(OutputRedirect::Null);
        }
        let writer = RemoteWriter::create(
            self.session.remote(),
            self.session.cache(),
            &path,
            target.append,
        )
        .await?;
        Ok(OutputRedirect::Remote(writer))
    }
}
