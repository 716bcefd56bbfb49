//! Command execution behind the `parcelwatch` binary.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::check::{CheckOutcome, Checker, Download, ItemSettings, TrackedItem, TrackingMode};
use crate::cli::{self, Commands};
use crate::config::Config;
use crate::error::WatchError;
use crate::fsx::{self as fs, item_key};
use crate::render::changelog_page;
use crate::snapshot::JsonSnapshotStore;
use crate::workers::{self, CheckJob};
use crate::logging;

/// Parses the command line and runs the selected command.
pub fn run_cli_app() -> Result<(), Box<dyn std::error::Error>> {
    let command = cli::run()?;

    match command {
        Commands::Check { item, files, name, encoding, extension, changelog, archive_new, dry_run, config } => {
            let mut config = Config::load(config.as_deref())?;
            config.dry_run |= dry_run;
            logging::init(&config.logging);

            let tracked = TrackedItem {
                name: name.unwrap_or_else(|| item.clone()),
                id: item,
                settings: ItemSettings {
                    encoding,
                    show_changelog: changelog,
                    archive_new,
                    tracking: match extension {
                        Some(extension) => TrackingMode::Attribute { extension },
                        None => TrackingMode::Hierarchical,
                    },
                },
            };
            run_check(&config, &tracked, &files)?;
        }
        Commands::Cycle { manifest, config, workers, dry_run } => {
            let mut config = Config::load(config.as_deref())?;
            config.dry_run |= dry_run;
            if let Some(workers) = workers {
                config.max_workers = workers;
            }
            logging::init(&config.logging);
            run_manifest(&config, &manifest)?;
        }
    }

    Ok(())
}

fn checker(config: &Config) -> Checker<JsonSnapshotStore> {
    Checker::new(JsonSnapshotStore::new(&config.snapshot_dir), &config.work_dir, &config.archive_dir).with_dry_run(config.dry_run)
}

fn run_check(config: &Config, item: &TrackedItem, files: &[(String, PathBuf)]) -> Result<(), WatchError> {
    fs::create_dir_all(&config.work_dir).map_err(WatchError::io(&config.work_dir))?;
    // Extraction consumes its inputs, so it gets copies.
    let scratch = tempfile::Builder::new()
        .prefix(".incoming-")
        .tempdir_in(&config.work_dir)
        .map_err(WatchError::io(&config.work_dir))?;
    let downloads = stage_downloads(scratch.path(), files)?;

    let outcome = checker(config).check(item, &downloads)?;
    let mut stdout = io::stdout().lock();
    match outcome {
        CheckOutcome::Unchanged => writeln!(stdout, "nothing changed")?,
        CheckOutcome::Skipped => writeln!(stdout, "no downloads listed, skipped")?,
        CheckOutcome::Updated(update) => {
            for path in &update.archived {
                writeln!(stdout, "archived {}", path.display())?;
            }
            match update.report {
                Some(report) if !report.digest.is_empty() => {
                    write!(stdout, "{}", report.digest)?;
                    if let Some(markup) = &report.markup {
                        let page = write_changelog(config, item, markup)?;
                        writeln!(stdout, "changelog written to {}", page.display())?;
                    }
                }
                Some(_) => writeln!(stdout, "nothing changed")?,
                None => writeln!(stdout, "listing changed")?,
            }
        }
    }
    Ok(())
}

fn stage_downloads(scratch: &Path, files: &[(String, PathBuf)]) -> Result<Vec<Download>, WatchError> {
    let mut downloads = Vec::with_capacity(files.len());
    for (index, (id, source)) in files.iter().enumerate() {
        let filename = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| WatchError::Usage(format!("'{}' does not name a file", source.display())))?;
        let target = scratch.join(index.to_string()).join(&filename);
        if source.is_dir() {
            fs::copy_tree(source, &target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(WatchError::io(parent))?;
            }
            fs::copy(source, &target).map_err(WatchError::io(source))?;
        }
        downloads.push(Download {
            id: id.clone(),
            filename,
            path: target,
        });
    }
    Ok(downloads)
}

fn write_changelog(config: &Config, item: &TrackedItem, markup: &str) -> Result<PathBuf, WatchError> {
    fs::create_dir_all(&config.changelog_dir).map_err(WatchError::io(&config.changelog_dir))?;
    let path = config.changelog_dir.join(format!("{}.html", item_key(&item.id)));
    fs::write(&path, changelog_page(&item.name, markup)).map_err(WatchError::io(&path))?;
    Ok(path)
}

fn run_manifest(config: &Config, manifest: &Path) -> Result<(), WatchError> {
    let raw = fs::read_to_string(manifest).map_err(WatchError::io(manifest))?;
    let jobs: Vec<CheckJob> = serde_json::from_str(&raw)?;
    info!(manifest = %manifest.display(), jobs = jobs.len(), "manifest loaded");

    let (results, summary) = workers::run_cycle(&checker(config), jobs, config.max_workers)?;

    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &results)?;
    writeln!(stdout)?;
    writeln!(stdout, "{summary}")?;
    Ok(())
}
