use std::path::PathBuf;

use thiserror::Error;

pub mod descriptor;
pub mod lock;
pub mod manifest;
pub mod schema;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error reading {path}: {source}")]
    IO {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("JSON parsing error in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid manifest {path}: {source}")]
    Invalid {
        path: PathBuf,
        source: schema::ValidationError,
    },
    #[error("Unknown source type `{0}`")]
    UnknownSourceKind(String),
    #[error("Dependency name `{0}` cannot be used as a directory name")]
    InvalidName(String),
}
