//! Tests for redirections against the remote store
//!
//! Covers `<`, `>`, `>>`, `2>`, `2>>`, `2>&1` and `&>`, the `/dev/null`
//! special case, and the order in which a command's own failure and a
//! failed upload are reported.

use pretty_assertions::assert_eq;
use remsh::{
    async_trait, Builtin, BuiltinContext, Error, MemoryStore, RemoteEntry, RemoteStore, Result,
    Shell, ShellConfig,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

/// Writes to both streams, then fails with status 3.
struct Noisy;

#[async_trait]
impl Builtin for Noisy {
    async fn execute(&self, ctx: BuiltinContext<'_>) -> Result<()> {
        ctx.io.stdout.write_all(b"out\n").await?;
        ctx.io.stderr.write_all(b"err\n").await?;
        Err(Error::ExitStatus(3))
    }
}

/// Delegates to a [`MemoryStore`] while counting every call.
#[derive(Default)]
struct CountingStore {
    inner: MemoryStore,
    calls: AtomicUsize,
    broken_listing: AtomicBool,
}

impl CountingStore {
    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteStore for CountingStore {
    async fn list_dir(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        self.hit();
        if self.broken_listing.load(Ordering::SeqCst) {
            return Err(Error::Remote("listing unavailable".to_string()));
        }
        self.inner.list_dir(path).await
    }

    async fn stat(&self, path: &str) -> Result<RemoteEntry> {
        self.hit();
        self.inner.stat(path).await
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        self.hit();
        self.inner.read_file(path).await
    }

    async fn write_file(&self, path: &str, content: &[u8]) -> Result<RemoteEntry> {
        self.hit();
        self.inner.write_file(path, content).await
    }

    async fn append_file(&self, path: &str, content: &[u8]) -> Result<RemoteEntry> {
        self.hit();
        self.inner.append_file(path, content).await
    }

    async fn mkdir(&self, path: &str, parents: bool) -> Result<RemoteEntry> {
        self.hit();
        self.inner.mkdir(path, parents).await
    }

    async fn remove(&self, path: &str, recursive: bool) -> Result<()> {
        self.hit();
        self.inner.remove(path, recursive).await
    }

    async fn rename(&self, from: &str, to: &str) -> Result<RemoteEntry> {
        self.hit();
        self.inner.rename(from, to).await
    }
}

fn shell_over(store: Arc<dyn RemoteStore>) -> Shell {
    Shell::builder()
        .remote(store)
        .config(ShellConfig::new().prefetch_on_cd(false))
        .builtin("noisy", Box::new(Noisy))
        .build()
}

fn setup() -> (Shell, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    store.insert_file("/docs/in.txt", "line one\nline two\n");
    store.insert_folder("/out");
    (shell_over(store.clone()), store)
}

// ============================================================================
// stdout / stdin
// ============================================================================

#[tokio::test]
async fn test_output_creates_file() {
    let (shell, store) = setup();
    let result = shell.exec("echo hello > /out/a.txt").await;
    assert!(result.is_success());
    assert_eq!(result.stdout, "");
    assert_eq!(store.contents("/out/a.txt").unwrap(), b"hello\n");

    // the upload is visible in the cache without another listing
    let entry = shell.session().cache().get("/out/a.txt").unwrap();
    assert_eq!(entry.size, 6);
}

#[tokio::test]
async fn test_output_truncates_and_append_extends() {
    let (shell, store) = setup();
    shell.exec("echo first > /out/log").await;
    shell.exec("echo second > /out/log").await;
    shell.exec("echo third >> /out/log").await;
    assert_eq!(store.contents("/out/log").unwrap(), b"second\nthird\n");
}

#[tokio::test]
async fn test_append_creates_missing_file() {
    let (shell, store) = setup();
    let result = shell.exec("echo new >> /out/fresh").await;
    assert!(result.is_success());
    assert_eq!(store.contents("/out/fresh").unwrap(), b"new\n");
}

#[tokio::test]
async fn test_input_feeds_first_segment() {
    let (shell, _) = setup();
    let result = shell.exec("cd docs && cat < in.txt | cat").await;
    assert_eq!(result.stdout, "line one\nline two\n");
}

#[tokio::test]
async fn test_input_and_output_copy() {
    let (shell, store) = setup();
    let result = shell.exec("cat < /docs/in.txt > /out/copy.txt").await;
    assert!(result.is_success());
    assert_eq!(store.contents("/out/copy.txt").unwrap(), b"line one\nline two\n");
}

#[tokio::test]
async fn test_missing_input_aborts_pipeline() {
    let (shell, store) = setup();
    let result = shell.exec("cat < /docs/none.txt > /out/copy.txt").await;
    assert!(result.error.unwrap().is_not_found());
    assert!(store.contents("/out/copy.txt").is_none());
}

#[tokio::test]
async fn test_input_from_folder_fails() {
    let (shell, _) = setup();
    shell.exec("ls /").await;
    let result = shell.exec("cat < /docs").await;
    assert!(matches!(result.error, Some(Error::IsDirectory(_))));
}

#[tokio::test]
async fn test_output_target_checks() {
    let (shell, _) = setup();
    let result = shell.exec("echo x > /out").await;
    assert!(matches!(result.error, Some(Error::IsDirectory(_))));

    let result = shell.exec("echo x > /missing/file").await;
    assert!(result.error.unwrap().is_not_found());

    let result = shell.exec("echo x > /docs/in.txt/file").await;
    assert!(matches!(result.error, Some(Error::NotADirectory(_))));
}

// ============================================================================
// stderr
// ============================================================================

#[tokio::test]
async fn test_stderr_to_file() {
    let (shell, store) = setup();
    let result = shell.exec("noisy 2> /out/err.log").await;
    assert_eq!(result.exit_code(), 3);
    assert_eq!(result.stdout, "out\n");
    assert_eq!(result.stderr, "");
    assert_eq!(store.contents("/out/err.log").unwrap(), b"err\n");

    shell.exec("noisy 2>> /out/err.log").await;
    assert_eq!(store.contents("/out/err.log").unwrap(), b"err\nerr\n");
}

#[tokio::test]
async fn test_merge_into_output_file() {
    let (shell, store) = setup();
    let result = shell.exec("noisy > /out/all.log 2>&1").await;
    assert_eq!(result.stdout, "");
    assert_eq!(result.stderr, "");
    assert_eq!(store.contents("/out/all.log").unwrap(), b"out\nerr\n");
}

#[tokio::test]
async fn test_ampersand_redirect_captures_both() {
    let (shell, store) = setup();
    let result = shell.exec("noisy &> /out/all.log").await;
    assert_eq!(result.exit_code(), 3);
    assert_eq!(result.stderr, "");
    assert_eq!(store.contents("/out/all.log").unwrap(), b"out\nerr\n");
}

#[tokio::test]
async fn test_merge_without_file_goes_to_stdout() {
    let (shell, _) = setup();
    let result = shell.exec("noisy 2>&1").await;
    assert_eq!(result.stdout, "out\nerr\n");
    assert_eq!(result.stderr, "");
}

// ============================================================================
// /dev/null
// ============================================================================

#[tokio::test]
async fn test_dev_null_never_reaches_store() {
    let store = Arc::new(CountingStore::default());
    let shell = shell_over(store.clone());

    let result = shell.exec("echo gone > /dev/null").await;
    assert!(result.is_success());
    assert_eq!(result.stdout, "");

    let result = shell.exec("cat < /dev/null").await;
    assert!(result.is_success());
    assert_eq!(result.stdout, "");

    let result = shell.exec("noisy 2> /dev/null >> /dev/null").await;
    assert_eq!(result.exit_code(), 3);
    assert_eq!(result.stdout, "");
    assert_eq!(result.stderr, "");

    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_dev_null_relative_to_root() {
    let store = Arc::new(CountingStore::default());
    let shell = shell_over(store.clone());
    let result = shell.exec("echo gone > dev/null").await;
    // resolves to /dev/null from the root
    assert!(result.is_success());
    assert_eq!(store.calls(), 0);
}

// ============================================================================
// Ordering of failures
// ============================================================================

#[tokio::test]
async fn test_unknown_command_opens_nothing() {
    let store = Arc::new(CountingStore::default());
    let shell = shell_over(store.clone());
    let result = shell.exec("nosuch < /in.txt > /out.txt").await;
    assert!(matches!(result.error, Some(Error::CommandNotFound(_))));
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn test_expansion_failure_abandons_output() {
    let store = Arc::new(CountingStore::default());
    store.inner.insert_folder("/out");
    store.broken_listing.store(true, Ordering::SeqCst);
    let shell = shell_over(store.clone());

    let result = shell.exec("echo *.txt > /out/list").await;
    assert!(matches!(result.error, Some(Error::Expansion { .. })));
    assert!(store.inner.contents("/out/list").is_none());
}

#[tokio::test]
async fn test_upload_failure_reported() {
    let (shell, store) = setup();
    store.set_read_only(true);
    let result = shell.exec("echo hi > /out/a.txt").await;
    assert!(matches!(result.error, Some(Error::Remote(_))));
    assert_eq!(result.exit_code(), 1);
}

#[tokio::test]
async fn test_command_error_wins_over_upload_failure() {
    let (shell, store) = setup();
    store.set_read_only(true);
    let result = shell.exec("noisy > /out/a.txt").await;
    assert!(matches!(result.error, Some(Error::ExitStatus(3))));
}

#[tokio::test]
async fn test_failed_command_still_uploads() {
    let (shell, store) = setup();
    let result = shell.exec("noisy > /out/partial").await;
    assert_eq!(result.exit_code(), 3);
    assert_eq!(store.contents("/out/partial").unwrap(), b"out\n");
}

#[tokio::test]
async fn test_upload_failure_gates_chain() {
    let (shell, store) = setup();
    store.set_read_only(true);
    let result = shell.exec("echo hi > /out/a.txt && echo ran").await;
    assert_eq!(result.stdout, "");

    let result = shell.exec("echo hi > /out/a.txt || echo recovered").await;
    assert_eq!(result.stdout, "recovered\n");
}
