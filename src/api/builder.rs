use std::{env, path::PathBuf, time::Duration};

use crate::{config::DepfetchConfig, model::manifest::MANIFEST_FILE_NAME, DepFetch};

#[derive(Default)]
pub struct DepFetchBuilder {
    root: Option<PathBuf>,
    manifest_file_name: Option<PathBuf>,
    http_timeout: Option<Duration>,
    remove_timeout: Option<Duration>,
    lock_timeout: Option<Duration>,
    progress_disabled: Option<bool>,
}

impl DepFetchBuilder {
    /// Directory holding the top level manifest.
    ///
    /// Defaults to the current directory.
    pub fn root(mut self, path: impl Into<PathBuf>) -> Self {
        self.root = Some(path.into());
        self
    }

    /// Name of the manifest file looked up in every directory.
    ///
    /// Defaults to `dependencies.json`.
    pub fn manifest_file_name(mut self, path: impl Into<PathBuf>) -> Self {
        self.manifest_file_name = Some(path.into());
        self
    }

    /// Timeout for a single archive download.
    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = Some(timeout);
        self
    }

    /// How long to wait for a removed directory to disappear.
    pub fn remove_timeout(mut self, timeout: Duration) -> Self {
        self.remove_timeout = Some(timeout);
        self
    }

    /// How long to wait for another process holding a container directory.
    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    pub fn progress_disabled(mut self, disabled: bool) -> Self {
        self.progress_disabled = Some(disabled);
        self
    }

    /// Builds with `DEPFETCH_*` environment configuration, overridden by
    /// anything set on the builder.
    pub fn try_build(self) -> anyhow::Result<DepFetch> {
        let Self {
            root,
            manifest_file_name,
            http_timeout,
            remove_timeout,
            lock_timeout,
            progress_disabled,
        } = self;
        let root = match root {
            Some(root) => root,
            None => env::current_dir()?,
        };
        let manifest_file_name =
            manifest_file_name.unwrap_or_else(|| PathBuf::from(MANIFEST_FILE_NAME));

        let defaults = DepfetchConfig::load()?;
        let config = DepfetchConfig {
            http_timeout: http_timeout.unwrap_or(defaults.http_timeout),
            remove_timeout: remove_timeout.unwrap_or(defaults.remove_timeout),
            lock_timeout: lock_timeout.unwrap_or(defaults.lock_timeout),
            progress_disabled: progress_disabled.unwrap_or(defaults.progress_disabled),
        };

        Ok(DepFetch {
            root,
            manifest_file_name,
            config,
        })
    }
}
