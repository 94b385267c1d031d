//! Tests for the folder listing cache as seen through the shell
//!
//! Listings are fetched at most once per folder: `cd` prefetches in the
//! background, concurrent requests for the same folder share one fetch,
//! and a storage context switch starts from an empty cache.

use pretty_assertions::assert_eq;
use remsh::{
    async_trait, MemoryStore, RemoteEntry, RemoteStore, Result, Shell, ShellConfig,
    StorageContext,
};
use std::sync::Arc;
use std::time::Duration;

/// Takes its listing snapshot first and only then stalls, like a remote
/// whose response is slow to arrive.
struct LateListing {
    inner: Arc<MemoryStore>,
    delay: Duration,
}

#[async_trait]
impl RemoteStore for LateListing {
    async fn list_dir(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        let entries = self.inner.list_dir(path).await;
        tokio::time::sleep(self.delay).await;
        entries
    }

    async fn stat(&self, path: &str) -> Result<RemoteEntry> {
        self.inner.stat(path).await
    }

    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        self.inner.read_file(path).await
    }

    async fn write_file(&self, path: &str, content: &[u8]) -> Result<RemoteEntry> {
        self.inner.write_file(path, content).await
    }

    async fn append_file(&self, path: &str, content: &[u8]) -> Result<RemoteEntry> {
        self.inner.append_file(path, content).await
    }

    async fn mkdir(&self, path: &str, parents: bool) -> Result<RemoteEntry> {
        self.inner.mkdir(path, parents).await
    }

    async fn remove(&self, path: &str, recursive: bool) -> Result<()> {
        self.inner.remove(path, recursive).await
    }

    async fn rename(&self, from: &str, to: &str) -> Result<RemoteEntry> {
        self.inner.rename(from, to).await
    }
}

fn store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.insert_file("/docs/a.txt", "A\n");
    store.insert_file("/docs/b.txt", "B\n");
    store.insert_folder("/media");
    store
}

#[tokio::test]
async fn test_cd_prefetch_serves_later_globs() {
    let store = store();
    let shell = Shell::builder().remote(store.clone()).build();

    let result = shell.exec("cd /docs").await;
    assert!(result.is_success());
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(shell.session().cache().has_children("/docs"));
    assert_eq!(store.list_calls(), 1);

    let result = shell.exec("echo *.txt").await;
    assert_eq!(result.stdout, "a.txt b.txt\n");
    assert_eq!(store.list_calls(), 1);
}

#[tokio::test]
async fn test_repeated_cd_shares_one_fetch() {
    let store = store();
    store.set_list_delay(Duration::from_millis(30));
    let shell = Shell::builder().remote(store.clone()).build();

    let result = shell.exec("cd /docs ; cd /docs ; cd /docs").await;
    assert!(result.is_success());
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(store.list_calls(), 1);
    assert!(shell.session().cache().has_children("/docs"));
}

#[tokio::test]
async fn test_write_during_prefetch_survives() {
    let store = store();
    let remote = Arc::new(LateListing {
        inner: store.clone(),
        delay: Duration::from_millis(50),
    });
    let shell = Shell::builder().remote(remote).build();

    assert!(shell.exec("cd /docs").await.is_success());
    // let the prefetch take its snapshot
    tokio::time::sleep(Duration::from_millis(5)).await;
    assert!(shell.exec("echo hi > new.txt").await.is_success());
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(shell.exec("ls").await.stdout, "a.txt\nb.txt\nnew.txt\n");
    assert_eq!(shell.exec("echo *.txt").await.stdout, "a.txt b.txt new.txt\n");
}

#[tokio::test]
async fn test_listing_joins_in_flight_prefetch() {
    let store = store();
    store.set_list_delay(Duration::from_millis(30));
    let shell = Shell::builder().remote(store.clone()).build();

    let result = shell.exec("cd /docs && ls").await;
    assert_eq!(result.stdout, "a.txt\nb.txt\n");
    assert_eq!(store.list_calls(), 1);
}

#[tokio::test]
async fn test_prefetch_disabled() {
    let store = store();
    let shell = Shell::builder()
        .remote(store.clone())
        .config(ShellConfig::new().prefetch_on_cd(false))
        .build();

    shell.exec("cd /docs").await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(store.list_calls(), 0);
}

#[tokio::test]
async fn test_preload_depth() {
    let store = store();
    store.insert_file("/docs/deep/x.txt", "X");
    let shell = Shell::builder()
        .remote(store.clone())
        .config(ShellConfig::new().preload_depth(2))
        .build();

    // root plus its two folders
    assert_eq!(shell.preload().await.unwrap(), 3);
    let cache = shell.session().cache();
    assert!(cache.has_children("/docs"));
    assert!(!cache.has_children("/docs/deep"));

    let calls = store.list_calls();
    shell.exec("ls /docs").await;
    assert_eq!(store.list_calls(), calls);
}

#[tokio::test]
async fn test_context_switch_clears_cache() {
    let store = store();
    let shell = Shell::builder()
        .remote(store.clone())
        .config(ShellConfig::new().prefetch_on_cd(false))
        .build();

    shell.exec("cd /docs && ls").await;
    assert_eq!(store.list_calls(), 1);
    assert_eq!(shell.cwd(), "/docs");

    shell.switch_context(StorageContext::tenant("acme"), None);
    assert!(shell.session().cache().is_empty());
    assert_eq!(shell.cwd(), "/");

    shell.exec("ls /docs").await;
    assert_eq!(store.list_calls(), 2);
}

#[tokio::test]
async fn test_context_switch_with_new_remote() {
    let personal = store();
    let team = Arc::new(MemoryStore::new());
    team.insert_file("/shared/plan.md", "plan\n");
    let shell = Shell::builder().remote(personal).build();

    assert_eq!(shell.exec("ls /").await.stdout, "docs\nmedia\n");

    shell.switch_context(
        StorageContext::tenant("acme"),
        Some(team.clone() as Arc<dyn RemoteStore>),
    );
    assert_eq!(shell.exec("ls /").await.stdout, "shared\n");
    assert_eq!(shell.exec("cat /shared/*.md").await.stdout, "plan\n");
    assert_eq!(shell.session().context().to_string(), "tenant:acme");
}

#[tokio::test]
async fn test_file_ops_keep_cache_current() {
    let store = store();
    let shell = Shell::builder()
        .remote(store.clone())
        .config(ShellConfig::new().prefetch_on_cd(false))
        .build();

    shell.exec("ls /docs").await;
    let calls = store.list_calls();

    let result = shell
        .exec("mkdir /docs/old && mv /docs/a.txt /docs/old && rm /docs/b.txt")
        .await;
    assert!(result.is_success());

    assert_eq!(shell.exec("ls /docs").await.stdout, "old\n");
    assert_eq!(shell.exec("echo /docs/*/*.txt").await.stdout, "/docs/old/a.txt\n");
    assert_eq!(store.contents("/docs/old/a.txt").unwrap(), b"A\n");
    // only the new folder had to be listed
    assert_eq!(store.list_calls(), calls + 1);
}
