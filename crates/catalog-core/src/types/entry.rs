//! Entry model shared by every backend.

use std::collections::HashMap;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Version assigned to seed records that do not carry one.
pub const SEED_VERSION: &str = "0.0.1-seed";

/// Source code repository of an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Repository {
    pub url: String,
    pub source: String,
    pub id: String,
}

/// Version descriptor of an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionDetail {
    /// Opaque version string, ordered by the configured comparator.
    pub version: String,
    /// RFC 3339 release timestamp.
    pub release_date: String,
    /// Whether this is the single current version for its name.
    pub is_latest: bool,
}

/// Summary form of a stored entry, as returned by `list`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Entry {
    /// Backend-assigned unique identifier.
    pub id: String,
    /// Logical name; not unique across versions.
    pub name: String,
    pub description: String,
    pub repository: Repository,
    pub version_detail: VersionDetail,
}

impl Entry {
    /// Whether this entry is the latest version of its name.
    pub fn is_latest(&self) -> bool {
        self.version_detail.is_latest
    }

    /// The version string.
    pub fn version(&self) -> &str {
        &self.version_detail.version
    }
}

/// Value format of a user input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputFormat {
    #[default]
    String,
    Number,
    Boolean,
    FilePath,
}

/// A user-supplied input (argument value, header, env var).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Input {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "is_false")]
    pub is_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<InputFormat>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub value: String,
    #[serde(skip_serializing_if = "is_false")]
    pub is_secret: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub default: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub template: String,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub properties: HashMap<String, Input>,
}

/// An input whose value may reference named variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputWithVariables {
    #[serde(flatten)]
    pub input: Input,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub variables: HashMap<String, Input>,
}

/// A named input, used for environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyValueInput {
    #[serde(flatten)]
    pub input: InputWithVariables,
    pub name: String,
}

/// Kind of a runtime or package argument.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgumentType {
    #[default]
    Positional,
    Named,
}

/// A runtime or package argument.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Argument {
    #[serde(flatten)]
    pub input: InputWithVariables,
    #[serde(rename = "type")]
    pub kind: ArgumentType,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "is_false")]
    pub is_repeated: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub value_hint: String,
}

/// An installable package of an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Package {
    pub registry_name: String,
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub runtime_hint: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub runtime_arguments: Vec<Argument>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub package_arguments: Vec<Argument>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub environment_variables: Vec<KeyValueInput>,
}

/// A remote endpoint of an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Remote {
    pub transport_type: String,
    pub url: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<Input>,
}

/// Full form of an entry, as returned by `get_by_id` and accepted by `publish`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryDetail {
    #[serde(flatten)]
    pub entry: Entry,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub package_canonical: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<Package>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub remotes: Vec<Remote>,
}

impl EntryDetail {
    /// Create a detail with a name and version; everything else empty.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        let mut detail = Self::default();
        detail.entry.name = name.into();
        detail.entry.version_detail.version = version.into();
        detail
    }

    /// Set the identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.entry.id = id.into();
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.entry.description = description.into();
        self
    }

    /// Set the repository.
    pub fn with_repository(mut self, repository: Repository) -> Self {
        self.entry.repository = repository;
        self
    }

    /// Append a package.
    pub fn with_package(mut self, package: Package) -> Self {
        self.packages.push(package);
        self
    }

    /// Append a remote.
    pub fn with_remote(mut self, remote: Remote) -> Self {
        self.remotes.push(remote);
        self
    }

    /// Mark as latest or not.
    pub fn with_latest(mut self, is_latest: bool) -> Self {
        self.entry.version_detail.is_latest = is_latest;
        self
    }

    pub fn id(&self) -> &str {
        &self.entry.id
    }

    pub fn name(&self) -> &str {
        &self.entry.name
    }

    pub fn version(&self) -> &str {
        &self.entry.version_detail.version
    }

    pub fn is_latest(&self) -> bool {
        self.entry.version_detail.is_latest
    }

    /// The summary part of this detail.
    pub fn summary(&self) -> Entry {
        self.entry.clone()
    }
}

/// Current time formatted the way release dates are stored.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn is_false(value: &bool) -> bool {
    !*value
}
