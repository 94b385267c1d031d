//! remsh CLI - run shell lines against an in-memory remote store
//!
//! Usage:
//!   remsh -c 'ls /docs | cat'          # Execute a command line
//!   remsh script.rsh                   # Execute each line of a file
//!   remsh --seed tree.json             # Read lines from stdin over a seeded store
//!
//! The seed manifest lists folders and files to create before the first line:
//!
//! ```json
//! { "folders": ["/media"], "files": { "/docs/a.txt": "alpha\n" } }
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use remsh::{LogConfig, MemoryStore, Shell, ShellConfig, StorageContext};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// remsh - Unix-style shell over a remote object store
#[derive(Parser, Debug)]
#[command(name = "remsh")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Execute the given command line
    #[arg(short = 'c')]
    command: Option<String>,

    /// File whose lines are executed in order
    #[arg()]
    script: Option<PathBuf>,

    /// JSON manifest of folders and files to seed the store with
    #[arg(long)]
    seed: Option<PathBuf>,

    /// Address a tenant's storage area instead of the personal one
    #[arg(long)]
    tenant: Option<String>,

    /// Use the encrypted vault area
    #[arg(long)]
    vault: bool,

    /// Starting working folder
    #[arg(long)]
    cwd: Option<String>,

    /// Do not list folders in the background after `cd`
    #[arg(long)]
    no_prefetch: bool,

    /// List the folder tree this many levels deep before the first line
    #[arg(long, default_value_t = 0)]
    preload_depth: usize,

    /// Include command line text in debug logs
    #[arg(long)]
    log_lines: bool,
}

/// Seed manifest read by `--seed`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Manifest {
    folders: Vec<String>,
    files: BTreeMap<String, String>,
}

fn main() -> ExitCode {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("remsh: failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(Args::parse())) {
        Ok(code) => ExitCode::from(code.clamp(0, 255) as u8),
        Err(e) => {
            eprintln!("remsh: {e:?}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<i32> {
    let store = Arc::new(MemoryStore::new());
    if let Some(path) = &args.seed {
        seed(&store, path)?;
    }

    let mut config = ShellConfig::new().prefetch_on_cd(!args.no_prefetch);
    if args.preload_depth > 0 {
        config = config.preload_depth(args.preload_depth);
    }
    let context = StorageContext {
        tenant: args.tenant.clone(),
        vault: args.vault,
    };

    let mut builder = Shell::builder()
        .remote(store)
        .config(config)
        .context(context)
        .log_config(LogConfig::new().log_line_content(args.log_lines));
    if let Some(cwd) = &args.cwd {
        builder = builder.cwd(cwd);
    }
    let shell = builder.build();

    if args.preload_depth > 0 {
        shell.preload().await.context("Failed to preload folder tree")?;
    }

    if let Some(cmd) = &args.command {
        return Ok(run_line(&shell, cmd).await);
    }

    if let Some(script_path) = &args.script {
        let script = std::fs::read_to_string(script_path)
            .with_context(|| format!("Failed to read script: {}", script_path.display()))?;
        let mut code = 0;
        for line in script.lines() {
            code = run_line(&shell, line).await;
        }
        return Ok(code);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut code = 0;
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        code = run_line(&shell, &line).await;
    }
    Ok(code)
}

/// Run one line with output streamed to the process, returning its exit code.
async fn run_line(shell: &Shell, line: &str) -> i32 {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return 0;
    }
    match shell
        .run_line(
            line,
            Box::new(tokio::io::stdout()),
            Box::new(tokio::io::stderr()),
        )
        .await
    {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("remsh: {e}");
            e.exit_code()
        }
    }
}

fn seed(store: &MemoryStore, path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read seed manifest: {}", path.display()))?;
    let manifest: Manifest = serde_json::from_str(&text)
        .with_context(|| format!("Invalid seed manifest: {}", path.display()))?;

    for folder in &manifest.folders {
        store.insert_folder(folder);
    }
    for (file, content) in &manifest.files {
        store.insert_file(file, content.as_bytes());
    }
    tracing::debug!(
        folders = manifest.folders.len(),
        files = manifest.files.len(),
        "seeded store"
    );
    Ok(())
}
