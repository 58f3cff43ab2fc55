use std::{
    fs::File,
    io::{Read, Seek, Write},
    path::{Path, PathBuf},
    time::Duration,
};

use log::{debug, trace};
use reqwest::blocking::Client;
use thiserror::Error;
use zip::{result::ZipError, ZipArchive};

use crate::{
    model::descriptor::ExtractFilter,
    report::{Progress, Reporter},
};

const CHUNK_SIZE: usize = 4096;

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Request to {url} failed with status {status}")]
    Status { url: String, status: u16 },
    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Not a valid zip archive: {0}")]
    Invalid(#[source] ZipError),
    #[error("Could not read archive member {name}: {source}")]
    Member { name: String, source: ZipError },
    #[error("Archive member {0} would be extracted outside of the destination")]
    UnsafePath(String),
    #[error("Could not write {path}: {source}")]
    IO {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Where archive bytes come from.
pub trait ArchiveSource {
    /// Streams the body behind `url` into `sink` and returns the number of
    /// bytes written.
    fn download(
        &self,
        url: &str,
        sink: &mut dyn Write,
        reporter: &dyn Reporter,
    ) -> Result<u64, DownloadError>;
}

impl<T: ArchiveSource + ?Sized> ArchiveSource for &T {
    fn download(
        &self,
        url: &str,
        sink: &mut dyn Write,
        reporter: &dyn Reporter,
    ) -> Result<u64, DownloadError> {
        (**self).download(url, sink, reporter)
    }
}

pub struct HttpArchiveSource {
    client: Client,
}

impl HttpArchiveSource {
    pub fn new(timeout: Duration) -> Result<Self, DownloadError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(HttpArchiveSource { client })
    }
}

impl ArchiveSource for HttpArchiveSource {
    fn download(
        &self,
        url: &str,
        sink: &mut dyn Write,
        reporter: &dyn Reporter,
    ) -> Result<u64, DownloadError> {
        trace!("GET {}", url);
        let mut response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        match response.content_length() {
            Some(total) => {
                let progress = reporter.progress("Downloading...", total);
                let written = copy_chunked(&mut response, sink, progress.as_ref());
                progress.finish();
                written
            }
            None => {
                debug!("No content length for {}, buffering the whole body", url);
                let body = response.bytes()?;
                sink.write_all(&body)?;
                Ok(body.len() as u64)
            }
        }
    }
}

fn copy_chunked(
    reader: &mut dyn Read,
    sink: &mut dyn Write,
    progress: &dyn Progress,
) -> Result<u64, DownloadError> {
    let mut buffer = [0u8; CHUNK_SIZE];
    let mut written = 0u64;
    loop {
        let read = reader.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        sink.write_all(&buffer[..read])?;
        progress.advance(read as u64);
        written += read as u64;
    }
    Ok(written)
}

pub fn open_archive<R: Read + Seek>(reader: R) -> Result<ZipArchive<R>, ArchiveError> {
    ZipArchive::new(reader).map_err(ArchiveError::Invalid)
}

/// Member names to extract, honoring `filter` when there is one.
pub fn select_members<R: Read + Seek>(
    archive: &ZipArchive<R>,
    filter: Option<&ExtractFilter>,
) -> Vec<String> {
    let members = archive.file_names();
    match filter {
        Some(filter) => filter.select(members),
        None => members.map(str::to_string).collect(),
    }
}

/// Extracts `names` into `destination`, keeping their paths inside the
/// archive.
pub fn extract_members<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    names: &[String],
    destination: &Path,
    progress: &dyn Progress,
) -> Result<(), ArchiveError> {
    for name in names {
        let mut member = archive.by_name(name).map_err(|source| ArchiveError::Member {
            name: name.clone(),
            source,
        })?;
        let relative = member
            .enclosed_name()
            .ok_or_else(|| ArchiveError::UnsafePath(name.clone()))?;
        let path = destination.join(relative);
        trace!("Extracting {} to {}", name, path.display());

        if member.is_dir() {
            create_dir_all(&path)?;
        } else {
            if let Some(parent) = path.parent() {
                create_dir_all(parent)?;
            }
            let mut file = File::create(&path).map_err(|source| io_error(&path, source))?;
            std::io::copy(&mut member, &mut file).map_err(|source| io_error(&path, source))?;
            #[cfg(unix)]
            if let Some(mode) = member.unix_mode() {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode))
                    .map_err(|source| io_error(&path, source))?;
            }
        }
        progress.advance(1);
    }
    Ok(())
}

fn create_dir_all(path: &Path) -> Result<(), ArchiveError> {
    std::fs::create_dir_all(path).map_err(|source| io_error(path, source))
}

fn io_error(path: &Path, source: std::io::Error) -> ArchiveError {
    ArchiveError::IO {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::{
        collections::HashMap,
        io::{Cursor, Write},
        sync::atomic::{AtomicUsize, Ordering},
    };

    use zip::{write::SimpleFileOptions, ZipWriter};

    use super::*;

    /// Builds a zip archive in memory. Names ending in `/` become directories.
    pub fn zip_bytes(members: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, contents) in members {
            if name.ends_with('/') {
                writer
                    .add_directory(*name, SimpleFileOptions::default())
                    .unwrap();
            } else {
                writer.start_file(*name, SimpleFileOptions::default()).unwrap();
                writer.write_all(contents.as_bytes()).unwrap();
            }
        }
        writer.finish().unwrap().into_inner()
    }

    /// Serves canned bodies by url and counts downloads.
    #[derive(Default)]
    pub struct FakeArchiveSource {
        bodies: HashMap<String, Vec<u8>>,
        downloads: AtomicUsize,
    }

    impl FakeArchiveSource {
        pub fn with(mut self, url: &str, body: Vec<u8>) -> Self {
            self.bodies.insert(url.to_string(), body);
            self
        }

        pub fn downloads(&self) -> usize {
            self.downloads.load(Ordering::SeqCst)
        }
    }

    impl ArchiveSource for FakeArchiveSource {
        fn download(
            &self,
            url: &str,
            sink: &mut dyn Write,
            _reporter: &dyn Reporter,
        ) -> Result<u64, DownloadError> {
            self.downloads.fetch_add(1, Ordering::SeqCst);
            match self.bodies.get(url) {
                Some(body) => {
                    sink.write_all(body)?;
                    Ok(body.len() as u64)
                }
                None => Err(DownloadError::Status {
                    url: url.to_string(),
                    status: 404,
                }),
            }
        }
    }
}
