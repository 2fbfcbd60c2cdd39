//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Incremental folder sync over FTP.
///
/// Assetsync mirrors a remote directory tree into a local install, uploading
/// and removing files while keeping per-directory `hashes.txt` manifests
/// current.
#[derive(Parser, Debug)]
#[command(name = "assetsync")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Config file (default: $XDG_CONFIG_HOME/assetsync/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// FTP server host
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// FTP control port (1-65535)
    #[arg(long, global = true, value_parser = clap::value_parser!(u16).range(1..))]
    pub port: Option<u16>,

    /// FTP user name (password from ASSETSYNC_PASSWORD or the config file)
    #[arg(long = "user", global = true)]
    pub user: Option<String>,

    /// Use a local directory as the remote instead of an FTP server
    #[arg(long, global = true, conflicts_with = "host")]
    pub remote_dir_root: Option<PathBuf>,

    /// Print the operation summary as JSON on stdout
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Sync operations.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bring a local install up to date with the remote tree
    Pull(PullArgs),
    /// Upload files and update remote manifests
    Push(PushArgs),
    /// Remove a remote file or directory and purge it from its manifest
    Remove(RemoveArgs),
    /// Print manifest lines (`<name> <digest>`) for local files
    Hash(HashArgs),
}

/// Arguments for `pull`.
#[derive(clap::Args, Debug)]
pub struct PullArgs {
    /// Remote directory to mirror (default from config)
    #[arg(long)]
    pub remote_root: Option<String>,

    /// Local install directory (default from config)
    #[arg(long)]
    pub local_root: Option<PathBuf>,

    /// Do not write the first-install marker
    #[arg(long)]
    pub no_marker: bool,
}

/// Arguments for `push`.
#[derive(clap::Args, Debug)]
pub struct PushArgs {
    /// Remote directory receiving the files
    #[arg(long)]
    pub remote_dir: String,

    /// Local directory the relative paths are computed from (default: current dir)
    #[arg(long)]
    pub base: Option<PathBuf>,

    /// Do not re-upload files whose digest is already in the remote manifest
    #[arg(long)]
    pub skip_unchanged: bool,

    /// Files to upload
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

/// Arguments for `remove`.
#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    /// Remote directory the path is relative to
    #[arg(long)]
    pub remote_dir: String,

    /// Relative path of the file or directory to remove
    pub path: String,
}

/// Arguments for `hash`.
#[derive(clap::Args, Debug)]
pub struct HashArgs {
    /// Files to hash
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}
