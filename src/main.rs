//! CLI entry point for the assetsync tool.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use assetsync_core::sync::DEFAULT_MARKER_FILE;
use assetsync_core::{
    CancellationToken, FtpConfig, FtpTransport, LocalTransport, ProgressSink, PullOptions,
    PushFile, PushOptions, RemoteTransport, SyncSession, hash_file,
};
use clap::Parser;
use serde::Serialize;
use tracing::{debug, info, warn};

mod app_config;
mod cli;
mod progress;

use app_config::{FileConfig, VerbositySetting, load_file_config};
use cli::{Args, Command, HashArgs, PullArgs, PushArgs, RemoveArgs};
use progress::SpinnerProgress;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    let loaded = load_file_config(args.config.as_deref())?;
    let config_path = loaded.path.clone();
    let loaded_from_file = loaded.loaded_from_file;
    let config = loaded.into_config();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > config > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match (args.verbose, config.verbosity) {
            (0, Some(VerbositySetting::Quiet)) => "error",
            (0, Some(VerbositySetting::Verbose | VerbositySetting::Debug)) | (1, _) => "debug",
            (0, _) => "info",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");
    if loaded_from_file {
        debug!(path = ?config_path, "configuration loaded");
    }

    let token = CancellationToken::new();
    spawn_interrupt_handler(token.clone());

    let show_spinner = !args.quiet && !args.json && !matches!(args.command, Command::Hash(_));
    let progress = SpinnerProgress::start(show_spinner);

    let outcome = match &args.command {
        Command::Pull(pull) => match build_transport(&args, &config) {
            Ok(transport) => run_pull(transport, token, pull, &config, &progress).await,
            Err(e) => Err(e),
        },
        Command::Push(push) => match build_transport(&args, &config) {
            Ok(transport) => run_push(transport, token, push, &progress).await,
            Err(e) => Err(e),
        },
        Command::Remove(remove) => match build_transport(&args, &config) {
            Ok(transport) => run_remove(transport, token, remove).await,
            Err(e) => Err(e),
        },
        Command::Hash(hash) => run_hash(hash, args.json).await,
    };
    progress.finish();

    let report = outcome?;
    if args.json {
        println!("{}", report.json);
    }
    if report.cancelled {
        bail!("Interrupted before completion; partial state kept");
    }
    Ok(())
}

/// Summary of a finished operation, rendered for `--json`.
struct Report {
    json: String,
    cancelled: bool,
}

impl Report {
    fn new<S: Serialize>(summary: &S, cancelled: bool) -> Result<Self> {
        Ok(Self {
            json: serde_json::to_string(summary).context("Failed to render summary")?,
            cancelled,
        })
    }
}

/// First Ctrl+C cancels the session; the current transfer finishes first.
fn spawn_interrupt_handler(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current transfer");
            token.cancel();
        }
    });
}

fn build_transport(args: &Args, config: &FileConfig) -> Result<Box<dyn RemoteTransport>> {
    if let Some(root) = &args.remote_dir_root {
        debug!(root = %root.display(), "using directory-backed remote");
        return Ok(Box::new(LocalTransport::new(root)));
    }

    let Some(host) = args.host.clone().or_else(|| config.host.clone()) else {
        bail!("No remote configured: pass --host, --remote-dir-root, or set `host` in the config file");
    };

    let mut ftp = FtpConfig::new(host);
    if let Some(port) = args.port.or(config.port) {
        ftp = ftp.with_port(port);
    }
    match (
        args.user.clone().or_else(|| config.username.clone()),
        config.resolved_password(),
    ) {
        (Some(user), password) => {
            ftp = ftp.with_credentials(user, password.unwrap_or_default());
        }
        (None, Some(_)) => bail!(
            "A password is configured but no user: pass --user or set `username` in the config file"
        ),
        (None, None) => debug!("no user configured, logging in anonymously"),
    }
    debug!(endpoint = %ftp.endpoint(), "using FTP remote");
    Ok(Box::new(FtpTransport::new(ftp)))
}

async fn run_pull(
    transport: Box<dyn RemoteTransport>,
    token: CancellationToken,
    args: &PullArgs,
    config: &FileConfig,
    progress: &dyn ProgressSink,
) -> Result<Report> {
    let Some(remote_root) = args.remote_root.clone().or_else(|| config.remote_root.clone()) else {
        bail!("No remote root: pass --remote-root or set `remote_root` in the config file");
    };
    let Some(local_root) = args.local_root.clone().or_else(|| config.local_root.clone()) else {
        bail!("No local root: pass --local-root or set `local_root` in the config file");
    };

    let marker = if args.no_marker {
        None
    } else {
        match config.marker_file.as_deref() {
            Some("") => None,
            Some(name) => Some(name.to_string()),
            None => Some(DEFAULT_MARKER_FILE.to_string()),
        }
    };
    let options = PullOptions::new(remote_root, local_root).with_marker_file(marker);

    let session = SyncSession::open(transport, token).await?;
    let summary = session
        .pull(&options, progress)
        .await
        .context("Pull failed")?;

    info!(
        downloaded = summary.downloaded,
        skipped = summary.skipped,
        directories = summary.directories,
        abandoned = summary.abandoned_directories,
        "Pull finished"
    );
    Report::new(&summary, summary.cancelled)
}

async fn run_push(
    transport: Box<dyn RemoteTransport>,
    token: CancellationToken,
    args: &PushArgs,
    progress: &dyn ProgressSink,
) -> Result<Report> {
    let base = match &args.base {
        Some(base) => base.clone(),
        None => std::env::current_dir().context("Failed to resolve current directory")?,
    };

    let mut files = Vec::with_capacity(args.files.len());
    for path in &args.files {
        files.push(read_push_file(&base, path).await?);
    }

    let session = SyncSession::open(transport, token).await?;
    let summary = session
        .push(
            &args.remote_dir,
            &files,
            PushOptions {
                skip_unchanged: args.skip_unchanged,
            },
            progress,
        )
        .await
        .context("Push failed")?;

    info!(
        uploaded = summary.uploaded,
        skipped = summary.skipped,
        manifests = summary.manifests_written,
        "Push finished"
    );
    Report::new(&summary, summary.cancelled)
}

async fn read_push_file(base: &Path, path: &Path) -> Result<PushFile> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .context("Failed to resolve current directory")?
            .join(path)
    };
    let base = if base.is_absolute() {
        base.to_path_buf()
    } else {
        std::env::current_dir()
            .context("Failed to resolve current directory")?
            .join(base)
    };
    let relative: PathBuf = absolute
        .strip_prefix(&base)
        .with_context(|| {
            format!(
                "'{}' is not inside base directory '{}'",
                path.display(),
                base.display()
            )
        })?
        .to_path_buf();

    let bytes = tokio::fs::read(&absolute)
        .await
        .with_context(|| format!("Failed to read '{}'", path.display()))?;
    Ok(PushFile::new(&relative.to_string_lossy(), bytes)?)
}

async fn run_remove(
    transport: Box<dyn RemoteTransport>,
    token: CancellationToken,
    args: &RemoveArgs,
) -> Result<Report> {
    let session = SyncSession::open(transport, token).await?;
    let summary = session
        .remove(&args.remote_dir, &args.path)
        .await
        .context("Remove failed")?;

    info!(
        files = summary.removed_files,
        directories = summary.removed_directories,
        purged = summary.manifest_entries_purged,
        "Remove finished"
    );
    Report::new(&summary, false)
}

#[derive(Serialize)]
struct HashLine {
    name: String,
    digest: String,
}

async fn run_hash(args: &HashArgs, json: bool) -> Result<Report> {
    let mut lines = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let digest = hash_file(path).await?;
        let name = path
            .file_name()
            .map_or_else(|| path.to_string_lossy(), |name| name.to_string_lossy())
            .into_owned();
        if !json {
            println!("{name} {digest}");
        }
        lines.push(HashLine { name, digest });
    }
    Report::new(&lines, false)
}
