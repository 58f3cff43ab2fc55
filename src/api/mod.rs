use std::path::{Path, PathBuf};

use crate::{
    archive::ArchiveSource,
    cli::command_handlers::{do_clean, do_fetch},
    config::DepfetchConfig,
    fetch::Fetcher,
    report::Reporter,
    walker::{WalkError, WalkSummary, Walker},
};

mod builder;

pub use builder::DepFetchBuilder;

pub struct DepFetch {
    root: PathBuf,
    manifest_file_name: PathBuf,
    config: DepfetchConfig,
}

impl DepFetch {
    pub fn builder() -> DepFetchBuilder {
        DepFetchBuilder::default()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Fetches every dependency declared in the manifest tree.
    /// With `force`, up to date dependencies are fetched again.
    pub fn fetch(&self, force: bool) -> anyhow::Result<WalkSummary> {
        do_fetch(&self.root, &self.manifest_file_name, &self.config, force)
    }

    /// Same as [`fetch`](Self::fetch) with a caller supplied archive source
    /// and reporter.
    pub fn fetch_with<S: ArchiveSource>(
        &self,
        source: S,
        reporter: &dyn Reporter,
        force: bool,
    ) -> Result<WalkSummary, WalkError> {
        let fetcher = Fetcher::new(source, reporter, self.config.remove_timeout);
        Walker::new(fetcher, &self.manifest_file_name, self.config.lock_timeout)
            .process(&self.root, force)
    }

    /// Deletes every container directory in the manifest tree
    pub fn clean(&self) -> anyhow::Result<Vec<PathBuf>> {
        do_clean(&self.root, &self.manifest_file_name, &self.config)
    }
}
