use std::{
    collections::HashSet,
    fmt::{Display, Formatter},
    path::{Path, PathBuf},
    str::FromStr,
};

use log::debug;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

use crate::{
    flock,
    model::{schema::DependencyShape, ParseError},
};

#[derive(PartialEq, Eq, Hash, Debug, Clone, Copy, Ord, PartialOrd)]
pub enum SourceKind {
    Git,
    Archive,
}

/// Names used for each source kind in `dependencies.json`.
const SOURCE_KIND_NAMES: [(SourceKind, &str); 2] =
    [(SourceKind::Git, "git"), (SourceKind::Archive, "archive")];

impl SourceKind {
    pub fn name(self) -> &'static str {
        SOURCE_KIND_NAMES
            .iter()
            .find(|(kind, _)| *kind == self)
            .map(|(_, name)| *name)
            .unwrap_or_default()
    }

    pub fn names() -> impl Iterator<Item = &'static str> {
        SOURCE_KIND_NAMES.iter().map(|(_, name)| *name)
    }
}

impl FromStr for SourceKind {
    type Err = ParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.to_ascii_lowercase();
        SOURCE_KIND_NAMES
            .iter()
            .find(|(_, name)| *name == value)
            .map(|(kind, _)| *kind)
            .ok_or(ParseError::UnknownSourceKind(value))
    }
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Member selection rule for archive dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ExtractFilter {
    pub dirs: Vec<String>,
    pub files: Vec<String>,
}

impl ExtractFilter {
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty() && self.files.is_empty()
    }

    /// Members matching any directory prefix, in archive order, followed by
    /// the explicitly named files that were not already selected.
    pub fn select<'a, I>(&self, members: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let members: Vec<&str> = members.into_iter().collect();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut selected: Vec<String> = Vec::new();
        for dir in &self.dirs {
            for &member in &members {
                if member.starts_with(dir.as_str()) && seen.insert(member) {
                    selected.push(member.to_string());
                }
            }
        }
        for file in &self.files {
            if seen.insert(file.as_str()) {
                selected.push(file.clone());
            }
        }
        selected
    }
}

/// One dependency declared in a manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct Dependency {
    name: String,
    source_url: String,
    source_kind: SourceKind,
    extract_items: Option<Value>,
}

impl Dependency {
    pub fn new(
        name: impl Into<String>,
        source_url: impl Into<String>,
        source_kind: SourceKind,
        extract_items: Option<Value>,
    ) -> Result<Dependency, ParseError> {
        let name = name.into();
        if !is_valid_name(&name) {
            return Err(ParseError::InvalidName(name));
        }
        Ok(Dependency {
            name,
            source_url: source_url.into(),
            source_kind,
            extract_items,
        })
    }

    /// Builds a dependency from an entry that already passed
    /// [`validate_dependency`](crate::model::schema::validate_dependency).
    pub fn from_shape(name: &str, shape: &DependencyShape<'_>) -> Result<Dependency, ParseError> {
        let source_kind = SourceKind::from_str(shape.url_type)?;
        Dependency::new(
            name,
            shape.url,
            source_kind,
            shape.extract_items.cloned(),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source_kind
    }

    pub fn extract_items(&self) -> Option<&Value> {
        self.extract_items.as_ref()
    }

    pub fn destination(&self, container_directory: &Path) -> PathBuf {
        container_directory.join(&self.name)
    }

    /// The effective extraction filter, or `None` when every archive member
    /// should be extracted. Malformed or empty options fall back to `None`.
    pub fn extract_filter(&self) -> Option<ExtractFilter> {
        let items = self.extract_items.as_ref()?;
        match ExtractFilter::deserialize(items) {
            Ok(filter) if filter.is_empty() => None,
            Ok(filter) => Some(filter),
            Err(error) => {
                debug!(
                    "Ignoring malformed archive_extract_items for {}: {}",
                    self.name, error
                );
                None
            }
        }
    }

    /// Hex encoded SHA-256 over the url, the source kind and the extraction
    /// options, with object keys sorted.
    pub fn content_hash(&self) -> String {
        let identity = json!({
            "source_url": self.source_url,
            "source_url_type": self.source_kind.name(),
            "archive_extract_items": self.extract_items.as_ref().map(canonicalize),
        });
        let canonical = canonicalize(&identity).to_string();
        hex::encode(Sha256::digest(canonical.as_bytes()))
    }
}

impl Display for Dependency {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} {})", self.name, self.source_kind, self.source_url)
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name != flock::LOCK_FILE_NAME
        && !name.contains(['/', '\\'])
}

/// Rebuilds `value` with every object's keys in sorted order.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(object) => {
            let mut keys: Vec<&String> = object.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&object[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
