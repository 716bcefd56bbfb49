use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Check one tracked item against its downloaded files.
    #[command(alias = "c")]
    Check {
        /// Identifier of the tracked item; selects its snapshot.
        #[arg(long)]
        item: String,

        /// A downloaded file as `<download id>=<path>`, in listing order. Repeatable.
        #[arg(long = "file", required = true, value_name = "ID=PATH", value_parser = parse_download_arg)]
        files: Vec<(String, PathBuf)>,

        /// Display name of the item.
        #[arg(long)]
        name: Option<String>,

        /// Text encoding of archive entry names (e.g. cp932, shift_jis, euc-kr).
        #[arg(long)]
        encoding: Option<String>,

        /// Track only files with this extension, as a flat list.
        #[arg(long)]
        extension: Option<String>,

        /// Do not produce a changelog. Without --extension this also skips extraction.
        #[arg(long = "no-changelog", action = clap::ArgAction::SetFalse, default_value_t = true)]
        changelog: bool,

        /// Copy downloads that were not listed before into the archive directory.
        #[arg(long)]
        archive_new: bool,

        /// Report changes without saving the snapshot or archiving downloads.
        #[arg(long)]
        dry_run: bool,

        /// Path to a JSON configuration file.
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Check every item of a manifest on the worker pool.
    Cycle {
        /// JSON array of `{ "item": {...}, "downloads": [...] }` jobs. Listed downloads are consumed.
        #[arg(long)]
        manifest: PathBuf,

        /// Path to a JSON configuration file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of worker threads. [0 = auto-detect based on CPU cores]
        #[arg(long)]
        workers: Option<usize>,

        /// Report changes without saving snapshots or archiving downloads.
        #[arg(long)]
        dry_run: bool,
    },
}

/// Parses `ID=PATH`. The id may not be empty; the path may contain further `=`.
pub fn parse_download_arg(raw: &str) -> Result<(String, PathBuf), String> {
    match raw.split_once('=') {
        Some((id, path)) if !id.is_empty() && !path.is_empty() => Ok((id.to_string(), PathBuf::from(path))),
        _ => Err(format!("expected <ID>=<PATH>, got '{raw}'")),
    }
}

/// Parses command-line arguments using `clap` and returns the command to execute.
///
/// Usage errors come back as `clap::Error` so the caller decides how to print them.
pub fn run() -> Result<Commands, Box<dyn std::error::Error>> {
    let args = Args::try_parse()?;
    Ok(args.command)
}
