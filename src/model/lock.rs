use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::ParseError;

pub const LOCK_FILE_NAME: &str = "dependency.lock";

/// Contents of `<destination>/dependency.lock`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DependencyLock {
    pub dependency_hash: String,
}

impl DependencyLock {
    pub fn new(dependency_hash: impl Into<String>) -> Self {
        DependencyLock {
            dependency_hash: dependency_hash.into(),
        }
    }

    pub fn from_file(file: &Path) -> Result<DependencyLock, ParseError> {
        let contents = std::fs::read_to_string(file).map_err(|source| ParseError::IO {
            path: file.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| ParseError::Json {
            path: file.to_path_buf(),
            source,
        })
    }

    pub fn to_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn load_save_lock_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOCK_FILE_NAME);
        let lock = DependencyLock::new("abc123");

        let text = lock.to_string().unwrap();
        assert_eq!(text, r#"{"dependency_hash":"abc123"}"#);

        std::fs::write(&path, text).unwrap();
        assert_eq!(DependencyLock::from_file(&path).unwrap(), lock);
    }

    #[test]
    fn load_corrupt_lock_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(LOCK_FILE_NAME);
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            DependencyLock::from_file(&path),
            Err(ParseError::Json { .. })
        ));
    }

    #[test]
    fn load_missing_lock_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            DependencyLock::from_file(&dir.path().join(LOCK_FILE_NAME)),
            Err(ParseError::IO { .. })
        ));
    }
}
