//! # Field Resolution
//!
//! Turns a raw [`AnnotatedRecord`] into [`ResolvedFields`].
//!
//! Each logical field accepts several alternative key spellings. The first
//! spelling present with a non-empty value wins:
//!
//! | Field        | Keys (priority order)                                                       |
//! |--------------|-----------------------------------------------------------------------------|
//! | bucket name  | `bucket-name`, `BUCKET_NAME`                                                |
//! | access key   | `access-key`, `ACCESS_KEY`, `ACCESS_KEY_ID`, `AWS_ACCESS_KEY_ID`            |
//! | secret key   | `secret-key`, `SECRET_KEY`, `SECRET_ACCESS_KEY`, `AWS_SECRET_ACCESS_KEY`    |
//! | endpoint pin | `endpoint-url`, `ENDPOINT_URL`, `AWS_ENDPOINT_URL`                          |
//! | role         | `role`, `ROLE`                                                              |
//! | user id      | `user-id`, `USER_ID`                                                        |
//! | group id     | `group-id`, `GROUP_ID`                                                      |

use std::collections::BTreeMap;
use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use super::AnnotatedRecord;

/// Errors produced while resolving a record
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// A value was not valid UTF-8
    #[error("value for key '{key}' is not valid UTF-8")]
    Decode { key: String },

    /// Required fields resolved empty, listed in canonical order
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),
}

/// Logical fields a record can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    BucketName,
    AccessKey,
    SecretKey,
    EndpointUrl,
    Role,
    UserId,
    GroupId,
}

impl Field {
    /// Fields that must resolve non-empty, in reporting order
    pub const REQUIRED: [Field; 3] = [Field::BucketName, Field::AccessKey, Field::SecretKey];

    /// Accepted key spellings in priority order
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::BucketName => &["bucket-name", "BUCKET_NAME"],
            Field::AccessKey => &[
                "access-key",
                "ACCESS_KEY",
                "ACCESS_KEY_ID",
                "AWS_ACCESS_KEY_ID",
            ],
            Field::SecretKey => &[
                "secret-key",
                "SECRET_KEY",
                "SECRET_ACCESS_KEY",
                "AWS_SECRET_ACCESS_KEY",
            ],
            Field::EndpointUrl => &["endpoint-url", "ENDPOINT_URL", "AWS_ENDPOINT_URL"],
            Field::Role => &["role", "ROLE"],
            Field::UserId => &["user-id", "USER_ID"],
            Field::GroupId => &["group-id", "GROUP_ID"],
        }
    }

    /// Canonical (first) spelling, used in error messages
    pub fn canonical(self) -> &'static str {
        self.aliases()[0]
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical())
    }
}

/// Look up a field in decoded values: first alias with a non-empty value wins
pub fn lookup(values: &BTreeMap<String, String>, field: Field) -> Option<&str> {
    field
        .aliases()
        .iter()
        .filter_map(|alias| values.get(*alias))
        .map(String::as_str)
        .find(|value| !value.is_empty())
}

/// Fields extracted from one record
///
/// Secret material is wiped from memory when the value is dropped.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct ResolvedFields {
    pub bucket_name: String,
    pub access_key: String,
    pub secret_key: String,
    pub role: Option<String>,
    pub user_id: Option<i64>,
    pub group_id: Option<i64>,
    pub endpoint_url: Option<String>,
}

impl fmt::Debug for ResolvedFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedFields")
            .field("bucket_name", &self.bucket_name)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("role", &self.role)
            .field("user_id", &self.user_id)
            .field("group_id", &self.group_id)
            .field("endpoint_url", &self.endpoint_url)
            .finish()
    }
}

/// Resolve a record into its logical fields
///
/// # Errors
///
/// - [`RecordError::Decode`] if any value is not UTF-8
/// - [`RecordError::MissingFields`] naming every required field that resolved empty
pub fn resolve(record: &AnnotatedRecord) -> Result<ResolvedFields, RecordError> {
    let mut values = decode_values(&record.data)?;

    let missing: Vec<&'static str> = Field::REQUIRED
        .iter()
        .filter(|field| lookup(&values, **field).is_none())
        .map(|field| field.canonical())
        .collect();

    let text = |field| lookup(&values, field).map(str::to_string);
    let resolved = if missing.is_empty() {
        Ok(ResolvedFields {
            bucket_name: text(Field::BucketName).unwrap_or_default(),
            access_key: text(Field::AccessKey).unwrap_or_default(),
            secret_key: text(Field::SecretKey).unwrap_or_default(),
            role: text(Field::Role),
            user_id: parse_id(lookup(&values, Field::UserId)),
            group_id: parse_id(lookup(&values, Field::GroupId)),
            endpoint_url: text(Field::EndpointUrl),
        })
    } else {
        Err(RecordError::MissingFields(missing))
    };

    for value in values.values_mut() {
        value.zeroize();
    }
    resolved
}

fn decode_values(data: &BTreeMap<String, Vec<u8>>) -> Result<BTreeMap<String, String>, RecordError> {
    data.iter()
        .map(|(key, bytes)| {
            String::from_utf8(bytes.clone())
                .map(|value| (key.clone(), value))
                .map_err(|source| {
                    tracing::debug!(key = %key, error = %source.utf8_error(), "Record value is not UTF-8");
                    RecordError::Decode { key: key.clone() }
                })
        })
        .collect()
}

/// Integer ids; anything that does not parse resolves to absent
fn parse_id(value: Option<&str>) -> Option<i64> {
    value.and_then(|v| v.trim().parse().ok())
}
