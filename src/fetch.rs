use std::{
    io::{BufWriter, ErrorKind, Write},
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

use log::debug;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::{
    archive::{self, ArchiveError, ArchiveSource, DownloadError},
    lock::{self, LockError},
    model::descriptor::{Dependency, SourceKind},
    report::Reporter,
};

const REMOVE_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Unsupported source type: '{0}'")]
    UnsupportedSourceKind(SourceKind),
    #[error("Error while downloading {url}: {source}")]
    Download { url: String, source: DownloadError },
    #[error("Could not use a temporary download file: {0}")]
    TempFile(#[source] std::io::Error),
    #[error("Invalid archive: {0}")]
    Archive(#[from] ArchiveError),
    #[error("Could not prepare {path}: {source}")]
    Filesystem {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Lock(#[from] LockError),
}

impl FetchError {
    /// Filesystem problems around the destination itself stop the walk.
    /// Everything else only fails the dependency at hand.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FetchError::Filesystem { .. } | FetchError::Lock(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Fetched,
    Skipped,
}

/// Materializes single dependencies into their destination directories.
pub struct Fetcher<'a, S> {
    source: S,
    reporter: &'a dyn Reporter,
    remove_timeout: Duration,
}

impl<'a, S: ArchiveSource> Fetcher<'a, S> {
    pub fn new(source: S, reporter: &'a dyn Reporter, remove_timeout: Duration) -> Self {
        Fetcher {
            source,
            reporter,
            remove_timeout,
        }
    }

    pub fn reporter(&self) -> &'a dyn Reporter {
        self.reporter
    }

    pub fn remove_timeout(&self) -> Duration {
        self.remove_timeout
    }

    /// Brings `container_directory/<name>` in line with `dependency`.
    ///
    /// The lock record is only written once everything was extracted, so an
    /// error at any point leaves the destination without a lock.
    pub fn process(
        &self,
        dependency: &Dependency,
        container_directory: &Path,
        force: bool,
    ) -> Result<FetchOutcome, FetchError> {
        let name = dependency.name();
        let destination = dependency.destination(container_directory);
        let hash = dependency.content_hash();

        if destination.exists() {
            if !force && lock::is_up_to_date(&destination, &hash) {
                self.reporter
                    .info(name, "Skipped: dependency already installed");
                return Ok(FetchOutcome::Skipped);
            }
            if destination.is_dir() {
                lock::clear(&destination)?;
            }
            remove_and_wait(&destination, self.remove_timeout, name, self.reporter)?;
        }

        std::fs::create_dir_all(&destination).map_err(|source| FetchError::Filesystem {
            path: destination.clone(),
            source,
        })?;

        match dependency.source_kind() {
            SourceKind::Git => return Err(FetchError::UnsupportedSourceKind(SourceKind::Git)),
            SourceKind::Archive => self.fetch_archive(dependency, &destination)?,
        }

        lock::write(&destination, &hash)?;
        debug!("Locked {} at {}", name, hash);
        self.reporter.info(name, "Installed");
        Ok(FetchOutcome::Fetched)
    }

    fn fetch_archive(&self, dependency: &Dependency, destination: &Path) -> Result<(), FetchError> {
        let name = dependency.name();
        let url = dependency.source_url();
        self.reporter
            .info(name, &format!("Downloading archive ({})", url));

        let mut temp = NamedTempFile::new().map_err(FetchError::TempFile)?;
        let download_error = |source: DownloadError| FetchError::Download {
            url: url.to_string(),
            source,
        };
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            self.source
                .download(url, &mut writer, self.reporter)
                .map_err(&download_error)?;
            writer
                .flush()
                .map_err(|error| download_error(error.into()))?;
        }

        let mut archive = archive::open_archive(temp.reopen().map_err(FetchError::TempFile)?)?;

        self.reporter.info(name, "Extracting archive");
        let filter = dependency.extract_filter();
        let members = archive::select_members(&archive, filter.as_ref());
        let progress = self.reporter.progress("Extracting...", members.len() as u64);
        let extracted =
            archive::extract_members(&mut archive, &members, destination, progress.as_ref());
        progress.finish();
        extracted?;

        drop(archive);
        temp.close().map_err(FetchError::TempFile)?;
        Ok(())
    }
}

/// Removes `path` and waits up to `timeout` for it to disappear.
///
/// Some filesystems report success before the entry is actually gone. If it
/// is still there once the timeout elapses we carry on anyway.
pub fn remove_and_wait(
    path: &Path,
    timeout: Duration,
    subject: &str,
    reporter: &dyn Reporter,
) -> Result<(), FetchError> {
    let removed = if path.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    match removed {
        Ok(()) => {}
        Err(error) if error.kind() == ErrorKind::NotFound => {}
        Err(source) => {
            return Err(FetchError::Filesystem {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    wait_until_gone(path, timeout, subject, reporter);
    Ok(())
}

/// Polls until `path` no longer exists or `timeout` elapses.
fn wait_until_gone(path: &Path, timeout: Duration, subject: &str, reporter: &dyn Reporter) {
    if !path.exists() {
        return;
    }

    reporter.warning(
        subject,
        &format!("Waiting for '{}' to be removed...", path.display()),
    );
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if !path.exists() {
            return;
        }
        thread::sleep(REMOVE_POLL_INTERVAL);
    }
    debug!(
        "{} still present after {:?}, continuing",
        path.display(),
        timeout
    );
}
