use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::{
    archive::HttpArchiveSource,
    config::DepfetchConfig,
    fetch::Fetcher,
    report::LogReporter,
    walker::{WalkSummary, Walker},
};

/// Handler to the default command
/// Fetches every dependency in the manifest tree rooted at `root`
pub fn do_fetch(
    root: &Path,
    manifest_file_name: &Path,
    config: &DepfetchConfig,
    force: bool,
) -> anyhow::Result<WalkSummary> {
    let reporter = LogReporter::new(config.progress_disabled);
    let walker = build_walker(&reporter, manifest_file_name, config)?;

    debug!("Processing {} (force: {})", root.display(), force);
    let summary = walker.process(root, force)?;

    info!(
        "Processed {} directories: {} fetched, {} up to date",
        summary.directories, summary.fetched, summary.skipped
    );
    if !summary.failed.is_empty() {
        warn!("Failed dependencies: {}", summary.failed.join(", "));
    }
    if !summary.invalid.is_empty() {
        warn!("Invalid dependencies: {}", summary.invalid.join(", "));
    }
    Ok(summary)
}

/// Handler to the clean command
pub fn do_clean(
    root: &Path,
    manifest_file_name: &Path,
    config: &DepfetchConfig,
) -> anyhow::Result<Vec<PathBuf>> {
    let reporter = LogReporter::new(config.progress_disabled);
    let walker = build_walker(&reporter, manifest_file_name, config)?;

    let removed = walker.clean(root)?;
    if removed.is_empty() {
        info!("Nothing to clean");
    } else {
        info!("Removed {} dependency directories", removed.len());
    }
    Ok(removed)
}

fn build_walker<'a>(
    reporter: &'a LogReporter,
    manifest_file_name: &Path,
    config: &DepfetchConfig,
) -> anyhow::Result<Walker<'a, HttpArchiveSource>> {
    let source = HttpArchiveSource::new(config.http_timeout)?;
    let fetcher = Fetcher::new(source, reporter, config.remove_timeout);
    Ok(Walker::new(
        fetcher,
        manifest_file_name,
        config.lock_timeout,
    ))
}
