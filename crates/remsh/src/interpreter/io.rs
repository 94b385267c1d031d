//! Standard stream plumbing for segments
//!
//! Every segment sees three boxed async streams. Depending on the pipeline they
//! are pipe ends, remote redirection adapters, `/dev/null`, or the caller's
//! streams shared through [`SharedWriter`].

use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite};

/// Boxed input stream.
pub type BoxReader = Box<dyn AsyncRead + Send + Unpin>;

/// Boxed output stream.
pub type BoxWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// The three standard streams of one segment.
pub struct IoEnv {
    pub stdin: BoxReader,
    pub stdout: BoxWriter,
    pub stderr: BoxWriter,
}

impl IoEnv {
    pub fn new(stdin: BoxReader, stdout: BoxWriter, stderr: BoxWriter) -> Self {
        Self {
            stdin,
            stdout,
            stderr,
        }
    }
}

/// Cloneable handle to one underlying writer.
///
/// Used where two streams must land in the same place: `2>&1`, and the
/// caller's stdout/stderr handed to several pipelines in turn. The underlying
/// writer is released when the last clone drops.
#[derive(Clone)]
pub struct SharedWriter {
    inner: Arc<Mutex<BoxWriter>>,
}

impl SharedWriter {
    pub fn new(writer: BoxWriter) -> Self {
        Self {
            inner: Arc::new(Mutex::new(writer)),
        }
    }

    fn poll_with<T>(
        &self,
        f: impl FnOnce(Pin<&mut BoxWriter>) -> Poll<io::Result<T>>,
    ) -> Poll<io::Result<T>> {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(Pin::new(&mut *guard))
    }
}

impl AsyncWrite for SharedWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.poll_with(|w| w.poll_write(cx, buf))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.poll_with(|w| w.poll_flush(cx))
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        // Other clones may still be writing; shutdown only flushes.
        self.poll_with(|w| w.poll_flush(cx))
    }
}

/// In-memory output buffer with cloneable handles.
///
/// Backs [`crate::Shell::exec`] output capture and the remote writer adapter,
/// which uploads the collected bytes once the command is done.
#[derive(Clone, Default)]
pub struct MemoryWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the bytes written so far, leaving the buffer empty.
    pub fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.buffer.lock().unwrap_or_else(|e| e.into_inner()))
    }

    /// Copy of the bytes written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.buffer.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl AsyncWrite for MemoryWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        self.buffer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_shared_writer_clones_interleave() {
        let sink = MemoryWriter::new();
        let shared = SharedWriter::new(Box::new(sink.clone()));
        let mut out = shared.clone();
        let mut err = shared;

        out.write_all(b"out ").await.unwrap();
        err.write_all(b"err ").await.unwrap();
        out.write_all(b"out").await.unwrap();
        err.shutdown().await.unwrap();
        out.write_all(b"!").await.unwrap();

        assert_eq!(sink.contents(), b"out err out!");
    }

    #[tokio::test]
    async fn test_memory_writer_take_empties() {
        let mut sink = MemoryWriter::new();
        sink.write_all(b"abc").await.unwrap();
        assert_eq!(sink.take(), b"abc");
        assert!(sink.contents().is_empty());
    }
}
