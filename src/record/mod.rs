//! # Annotated Records
//!
//! The controller's input: a key/value payload plus the metadata needed to
//! decide whether and when to reconcile it. Records are built from Kubernetes
//! `Secret`s but carry no Kubernetes types past this module.

pub mod fields;
pub mod source;

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Secret;

pub use fields::{resolve, Field, RecordError, ResolvedFields};
pub use source::{RecordSource, SecretSource, SourceError};

/// A configuration record carrying provisioning intent
///
/// Values are raw bytes as stored; decoding to text happens in [`resolve`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotatedRecord {
    pub namespace: String,
    pub name: String,
    pub annotations: BTreeMap<String, String>,
    pub data: BTreeMap<String, Vec<u8>>,
    /// Opaque version stamp; changes on every update of the record
    pub resource_version: Option<String>,
}

impl AnnotatedRecord {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder helper: add a data entry
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Builder helper: add an annotation
    #[must_use]
    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Builder helper: set the resource version
    #[must_use]
    pub fn with_resource_version(mut self, version: impl Into<String>) -> Self {
        self.resource_version = Some(version.into());
        self
    }

    /// Uniqueness key: `namespace/name`
    pub fn key(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// Whether the record carries the given annotation (any value)
    pub fn has_annotation(&self, annotation_key: &str) -> bool {
        self.annotations.contains_key(annotation_key)
    }
}

impl From<Secret> for AnnotatedRecord {
    fn from(secret: Secret) -> Self {
        let metadata = secret.metadata;

        // `data` arrives already base64-decoded; `stringData` overrides it when present
        let mut data: BTreeMap<String, Vec<u8>> = secret
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|(key, value)| (key, value.0))
            .collect();
        for (key, value) in secret.string_data.unwrap_or_default() {
            data.insert(key, value.into_bytes());
        }

        Self {
            namespace: metadata.namespace.unwrap_or_default(),
            name: metadata.name.unwrap_or_default(),
            annotations: metadata.annotations.unwrap_or_default(),
            data,
            resource_version: metadata.resource_version,
        }
    }
}

/// Kind of change observed on the watch stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Added,
    Modified,
    Deleted,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Added => write!(f, "ADDED"),
            EventKind::Modified => write!(f, "MODIFIED"),
            EventKind::Deleted => write!(f, "DELETED"),
        }
    }
}

/// One change notification from the record source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordEvent {
    pub kind: EventKind,
    pub record: AnnotatedRecord,
}

impl RecordEvent {
    pub fn new(kind: EventKind, record: AnnotatedRecord) -> Self {
        Self { kind, record }
    }
}
