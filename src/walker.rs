use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    time::Duration,
};

use log::{debug, trace};
use thiserror::Error;

use crate::{
    archive::ArchiveSource,
    fetch::{self, FetchError, FetchOutcome, Fetcher},
    flock::{self, FileLock},
    model::{
        manifest::{Manifest, ManifestLookup},
        ParseError,
    },
};

#[derive(Error, Debug)]
pub enum WalkError {
    #[error("Could not find {0}")]
    ManifestNotFound(PathBuf),
    #[error(transparent)]
    InvalidManifest(ParseError),
    #[error("Error while processing {name}: {source}")]
    Fetch { name: String, source: FetchError },
    #[error("Could not lock {path}: {source}")]
    Lock { path: PathBuf, source: flock::Error },
    #[error("Could not prepare {path}: {source}")]
    Filesystem {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Could not clean {path}: {source}")]
    Clean { path: PathBuf, source: FetchError },
}

/// What happened during a walk over a manifest tree.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WalkSummary {
    pub directories: usize,
    pub fetched: usize,
    pub skipped: usize,
    /// Dependencies whose fetch failed.
    pub failed: Vec<String>,
    /// Dependency entries skipped because they did not validate.
    pub invalid: Vec<String>,
    /// Nested manifests that could not be loaded.
    pub invalid_manifests: Vec<PathBuf>,
}

impl WalkSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.invalid.is_empty() && self.invalid_manifests.is_empty()
    }
}

/// Applies the [`Fetcher`] to a directory and every subdirectory its
/// manifest declares.
pub struct Walker<'a, S> {
    fetcher: Fetcher<'a, S>,
    manifest_file_name: PathBuf,
    lock_timeout: Duration,
}

impl<'a, S: ArchiveSource> Walker<'a, S> {
    pub fn new(
        fetcher: Fetcher<'a, S>,
        manifest_file_name: impl Into<PathBuf>,
        lock_timeout: Duration,
    ) -> Self {
        Walker {
            fetcher,
            manifest_file_name: manifest_file_name.into(),
            lock_timeout,
        }
    }

    /// Processes the tree rooted at `root`. The root manifest must exist and
    /// be valid; problems further down are reported and skipped.
    pub fn process(&self, root: &Path, force: bool) -> Result<WalkSummary, WalkError> {
        let manifest = self.load_root(root)?;
        let mut summary = WalkSummary::default();
        let mut visited = HashSet::new();
        self.process_manifest(root, &manifest, force, &mut visited, &mut summary)?;
        Ok(summary)
    }

    /// Removes every container directory in the tree rooted at `root`,
    /// regardless of lock state. Returns the removed directories.
    pub fn clean(&self, root: &Path) -> Result<Vec<PathBuf>, WalkError> {
        let manifest = self.load_root(root)?;
        let mut removed = Vec::new();
        let mut visited = HashSet::new();
        self.clean_manifest(root, &manifest, &mut visited, &mut removed)?;
        Ok(removed)
    }

    fn load_root(&self, root: &Path) -> Result<Manifest, WalkError> {
        match Manifest::lookup(root, &self.manifest_file_name) {
            ManifestLookup::Found(manifest) => Ok(manifest),
            ManifestLookup::NotFound { path } => Err(WalkError::ManifestNotFound(path)),
            ManifestLookup::Invalid(error) => Err(WalkError::InvalidManifest(error)),
        }
    }

    /// Loads a nested manifest. Missing or invalid manifests are reported and
    /// yield `None`.
    fn load_nested(&self, directory: &Path, summary: Option<&mut WalkSummary>) -> Option<Manifest> {
        let reporter = self.fetcher.reporter();
        let subject = directory.display().to_string();
        match Manifest::lookup(directory, &self.manifest_file_name) {
            ManifestLookup::Found(manifest) => Some(manifest),
            ManifestLookup::NotFound { path } => {
                reporter.warning(
                    &subject,
                    &format!("Could not find '{}', skipping", path.display()),
                );
                None
            }
            ManifestLookup::Invalid(error) => {
                reporter.error(&subject, &error.to_string());
                if let Some(summary) = summary {
                    summary
                        .invalid_manifests
                        .push(directory.join(&self.manifest_file_name));
                }
                None
            }
        }
    }

    fn process_manifest(
        &self,
        directory: &Path,
        manifest: &Manifest,
        force: bool,
        visited: &mut HashSet<PathBuf>,
        summary: &mut WalkSummary,
    ) -> Result<(), WalkError> {
        let Some(directory) = self.enter(directory, visited)? else {
            return Ok(());
        };
        summary.directories += 1;
        let reporter = self.fetcher.reporter();
        let manifest_path = directory.join(&self.manifest_file_name);

        let (dependencies, invalid) = manifest.dependencies();
        for entry in invalid {
            reporter.error(
                &entry.name,
                &format!(
                    "Invalid dependency in '{}': {}",
                    manifest_path.display(),
                    entry.reason
                ),
            );
            summary.invalid.push(entry.name);
        }

        if !dependencies.is_empty() {
            let container = manifest.container_directory(&directory);
            std::fs::create_dir_all(&container).map_err(|source| WalkError::Filesystem {
                path: container.clone(),
                source,
            })?;
            let lock_path = container.join(flock::LOCK_FILE_NAME);
            let _lock = FileLock::new(&lock_path, self.lock_timeout).map_err(|source| {
                WalkError::Lock {
                    path: lock_path.clone(),
                    source,
                }
            })?;

            for dependency in &dependencies {
                let name = dependency.name();
                match self.fetcher.process(dependency, &container, force) {
                    Ok(FetchOutcome::Fetched) => summary.fetched += 1,
                    Ok(FetchOutcome::Skipped) => summary.skipped += 1,
                    Err(error) if error.is_fatal() => {
                        return Err(WalkError::Fetch {
                            name: name.to_string(),
                            source: error,
                        })
                    }
                    Err(error) => {
                        reporter.error(name, &error.to_string());
                        summary.failed.push(name.to_string());
                    }
                }
            }
        }

        for subdirectory in manifest.subdirectories(&directory) {
            trace!("Descending into {}", subdirectory.display());
            if let Some(child) = self.load_nested(&subdirectory, Some(&mut *summary)) {
                self.process_manifest(&subdirectory, &child, force, visited, summary)?;
            }
        }
        Ok(())
    }

    fn clean_manifest(
        &self,
        directory: &Path,
        manifest: &Manifest,
        visited: &mut HashSet<PathBuf>,
        removed: &mut Vec<PathBuf>,
    ) -> Result<(), WalkError> {
        let Some(directory) = self.enter(directory, visited)? else {
            return Ok(());
        };
        let reporter = self.fetcher.reporter();

        let container = manifest.container_directory(&directory);
        if container.is_dir() {
            let subject = container.display().to_string();
            reporter.info(&subject, "Removing");
            fetch::remove_and_wait(&container, self.fetcher.remove_timeout(), &subject, reporter)
                .map_err(|source| WalkError::Clean {
                    path: container.clone(),
                    source,
                })?;
            removed.push(container);
        }

        for subdirectory in manifest.subdirectories(&directory) {
            if let Some(child) = self.load_nested(&subdirectory, None) {
                self.clean_manifest(&subdirectory, &child, visited, removed)?;
            }
        }
        Ok(())
    }

    /// Resolves `directory` to an absolute path and records it as visited.
    /// Returns `None` if it was seen before, which breaks subdirectory cycles.
    fn enter(
        &self,
        directory: &Path,
        visited: &mut HashSet<PathBuf>,
    ) -> Result<Option<PathBuf>, WalkError> {
        let absolute =
            std::fs::canonicalize(directory).map_err(|source| WalkError::Filesystem {
                path: directory.to_path_buf(),
                source,
            })?;
        if visited.insert(absolute.clone()) {
            Ok(Some(absolute))
        } else {
            debug!("{} was already processed", absolute.display());
            self.fetcher.reporter().warning(
                &absolute.display().to_string(),
                "Already processed in this run, skipping",
            );
            Ok(None)
        }
    }
}
