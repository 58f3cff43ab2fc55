//! Structural validation of `dependencies.json` documents.
//!
//! Validation never builds model types. It only answers whether a JSON value
//! has the expected shape and, for dependency entries, hands back borrowed
//! views of the fields so construction can happen as a separate step.

use std::path::{Component, Path};

use serde_json::{Map, Value};
use thiserror::Error;
use url::Url;

pub const CONTAINER_DIRECTORY_NAME: &str = "container_directory_name";
pub const DEPENDENCIES: &str = "dependencies";
pub const SUBDIRECTORIES: &str = "subdirectories";

pub const URL: &str = "url";
pub const URL_TYPE: &str = "url_type";
pub const ARCHIVE_EXTRACT_ITEMS: &str = "archive_extract_items";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("expected {0} to be an object")]
    NotAnObject(String),
    #[error("expected `{field}` to be {expected}")]
    WrongType {
        field: String,
        expected: &'static str,
    },
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("`{value}` is not a valid URI: {reason}")]
    InvalidUri { value: String, reason: String },
    #[error("`{0}` must be a relative path below the manifest directory")]
    InvalidContainerName(String),
}

/// Borrowed view of a dependency entry that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyShape<'a> {
    pub url: &'a str,
    pub url_type: &'a str,
    pub extract_items: Option<&'a Value>,
}

/// Checks the top level of a manifest document.
///
/// Dependency entries are only required to be present as an object here;
/// each entry is checked on its own by [`validate_dependency`] so that one
/// bad entry does not reject the whole manifest.
pub fn validate_manifest(document: &Value) -> Result<(), ValidationError> {
    let object = as_object(document, "manifest")?;

    if let Some(value) = object.get(CONTAINER_DIRECTORY_NAME) {
        let name = value
            .as_str()
            .ok_or_else(|| wrong_type(CONTAINER_DIRECTORY_NAME, "a string"))?;
        if !is_nested_relative(name) {
            return Err(ValidationError::InvalidContainerName(name.to_string()));
        }
    }

    if let Some(value) = object.get(DEPENDENCIES) {
        if !value.is_object() {
            return Err(wrong_type(DEPENDENCIES, "an object"));
        }
    }

    if let Some(value) = object.get(SUBDIRECTORIES) {
        let all_strings = value
            .as_array()
            .is_some_and(|items| items.iter().all(Value::is_string));
        if !all_strings {
            return Err(wrong_type(SUBDIRECTORIES, "an array of strings"));
        }
    }

    Ok(())
}

pub fn validate_dependency(entry: &Value) -> Result<DependencyShape<'_>, ValidationError> {
    let object = as_object(entry, "dependency")?;

    let url = required_str(object, URL)?;
    Url::parse(url).map_err(|error| ValidationError::InvalidUri {
        value: url.to_string(),
        reason: error.to_string(),
    })?;

    let url_type = required_str(object, URL_TYPE)?;

    Ok(DependencyShape {
        url,
        url_type,
        extract_items: object.get(ARCHIVE_EXTRACT_ITEMS),
    })
}

/// True for non-empty relative paths made only of plain components, so the
/// path always names something strictly below its base directory.
fn is_nested_relative(name: &str) -> bool {
    let mut components = Path::new(name).components().peekable();
    components.peek().is_some()
        && components.all(|component| matches!(component, Component::Normal(_)))
        && !name.contains('\\')
}

fn as_object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>, ValidationError> {
    value
        .as_object()
        .ok_or_else(|| ValidationError::NotAnObject(what.to_string()))
}

fn required_str<'a>(
    object: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, ValidationError> {
    match object.get(field) {
        None => Err(ValidationError::MissingField(field)),
        Some(value) => value.as_str().ok_or_else(|| wrong_type(field, "a string")),
    }
}

fn wrong_type(field: &str, expected: &'static str) -> ValidationError {
    ValidationError::WrongType {
        field: field.to_string(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn accepts_empty_manifest() {
        assert_eq!(validate_manifest(&json!({})), Ok(()));
    }

    #[test]
    fn accepts_full_manifest() {
        let document = json!({
            "container_directory_name": "vendor",
            "dependencies": {
                "glm": { "url": "https://example.com/glm.zip", "url_type": "archive" }
            },
            "subdirectories": ["engine", "tools"]
        });
        assert_eq!(validate_manifest(&document), Ok(()));
    }

    #[test]
    fn rejects_non_object_manifest() {
        assert_eq!(
            validate_manifest(&json!(["a"])),
            Err(ValidationError::NotAnObject("manifest".to_string()))
        );
    }

    #[test]
    fn rejects_bad_subdirectories() {
        let document = json!({ "subdirectories": ["ok", 3] });
        assert_eq!(
            validate_manifest(&document),
            Err(wrong_type(SUBDIRECTORIES, "an array of strings"))
        );
    }

    #[test]
    fn rejects_bad_container_name() {
        let document = json!({ "container_directory_name": 12 });
        assert!(validate_manifest(&document).is_err());
    }

    #[test]
    fn rejects_container_names_outside_the_manifest_directory() {
        let names = [
            "", ".", "..", "./", "/", "/tmp/deps", "../deps", "deps/../..", "a\\b",
        ];
        for name in names {
            let document = json!({ "container_directory_name": name });
            assert_eq!(
                validate_manifest(&document),
                Err(ValidationError::InvalidContainerName(name.to_string())),
                "{name:?} should be rejected"
            );
        }
    }

    #[test]
    fn accepts_nested_container_names() {
        for name in ["deps", "third_party/deps", "deps/"] {
            let document = json!({ "container_directory_name": name });
            assert_eq!(validate_manifest(&document), Ok(()), "{name:?}");
        }
    }

    #[test]
    fn dependency_shape_borrows_fields() {
        let entry = json!({
            "url": "https://example.com/a.zip",
            "url_type": "archive",
            "archive_extract_items": { "dirs": ["include/"] }
        });
        let shape = validate_dependency(&entry).unwrap();
        assert_eq!(shape.url, "https://example.com/a.zip");
        assert_eq!(shape.url_type, "archive");
        assert_eq!(shape.extract_items, Some(&json!({ "dirs": ["include/"] })));
    }

    #[test]
    fn dependency_requires_url_and_type() {
        assert_eq!(
            validate_dependency(&json!({ "url_type": "archive" })),
            Err(ValidationError::MissingField(URL))
        );
        assert_eq!(
            validate_dependency(&json!({ "url": "https://example.com/a.zip" })),
            Err(ValidationError::MissingField(URL_TYPE))
        );
    }

    #[test]
    fn dependency_url_must_be_uri() {
        let entry = json!({ "url": "not a uri", "url_type": "archive" });
        assert!(matches!(
            validate_dependency(&entry),
            Err(ValidationError::InvalidUri { .. })
        ));
    }

    #[test]
    fn dependency_url_type_must_be_string() {
        let entry = json!({ "url": "https://example.com/a.zip", "url_type": 2 });
        assert_eq!(
            validate_dependency(&entry),
            Err(wrong_type(URL_TYPE, "a string"))
        );
    }
}
