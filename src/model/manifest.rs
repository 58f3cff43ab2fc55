use std::path::{Path, PathBuf};

use log::trace;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::model::{
    descriptor::Dependency,
    schema::{self, ValidationError},
    ParseError,
};

pub const MANIFEST_FILE_NAME: &str = "dependencies.json";
pub const DEFAULT_CONTAINER_DIRECTORY_NAME: &str = "dependencies";

/// Outcome of looking for a manifest in a directory.
#[derive(Debug)]
pub enum ManifestLookup {
    Found(Manifest),
    NotFound { path: PathBuf },
    Invalid(ParseError),
}

/// A validated `dependencies.json` document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub container_directory_name: Option<String>,
    #[serde(default)]
    pub dependencies: Map<String, Value>,
    #[serde(default)]
    pub subdirectories: Vec<String>,
}

/// A dependency entry that was skipped during construction.
#[derive(Debug)]
pub struct InvalidEntry {
    pub name: String,
    pub reason: EntryProblem,
}

#[derive(Debug, thiserror::Error)]
pub enum EntryProblem {
    #[error(transparent)]
    Shape(#[from] ValidationError),
    #[error(transparent)]
    Construction(#[from] ParseError),
}

impl Manifest {
    /// Looks up `file_name` inside `directory`.
    pub fn lookup(directory: &Path, file_name: &Path) -> ManifestLookup {
        let path = directory.join(file_name);
        if !path.is_file() {
            return ManifestLookup::NotFound { path };
        }
        match Manifest::from_file(&path) {
            Ok(manifest) => ManifestLookup::Found(manifest),
            Err(error) => ManifestLookup::Invalid(error),
        }
    }

    pub fn from_file(path: &Path) -> Result<Manifest, ParseError> {
        trace!("Loading manifest {}", path.display());
        let contents = std::fs::read_to_string(path).map_err(|source| ParseError::IO {
            path: path.to_path_buf(),
            source,
        })?;
        Manifest::from_json_str(&contents).map_err(|error| match error {
            ManifestError::Json(source) => ParseError::Json {
                path: path.to_path_buf(),
                source,
            },
            ManifestError::Invalid(source) => ParseError::Invalid {
                path: path.to_path_buf(),
                source,
            },
        })
    }

    pub fn from_json_str(s: &str) -> Result<Manifest, ManifestError> {
        let document: Value = serde_json::from_str(s)?;
        schema::validate_manifest(&document)?;
        Ok(Manifest::deserialize(document)?)
    }

    pub fn container_directory(&self, directory: &Path) -> PathBuf {
        directory.join(
            self.container_directory_name
                .as_deref()
                .unwrap_or(DEFAULT_CONTAINER_DIRECTORY_NAME),
        )
    }

    /// Validates and builds every dependency entry, in manifest order.
    /// Entries that fail are returned separately instead of aborting the rest.
    pub fn dependencies(&self) -> (Vec<Dependency>, Vec<InvalidEntry>) {
        let mut valid = Vec::new();
        let mut invalid = Vec::new();
        for (name, entry) in &self.dependencies {
            match build_dependency(name, entry) {
                Ok(dependency) => valid.push(dependency),
                Err(reason) => invalid.push(InvalidEntry {
                    name: name.clone(),
                    reason,
                }),
            }
        }
        (valid, invalid)
    }

    /// Declared subdirectories resolved against `directory`.
    pub fn subdirectories(&self, directory: &Path) -> Vec<PathBuf> {
        self.subdirectories
            .iter()
            .map(|subdirectory| directory.join(subdirectory))
            .collect()
    }
}

fn build_dependency(name: &str, entry: &Value) -> Result<Dependency, EntryProblem> {
    let shape = schema::validate_dependency(entry)?;
    Ok(Dependency::from_shape(name, &shape)?)
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}
