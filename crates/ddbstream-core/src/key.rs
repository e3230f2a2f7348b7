//! Key codec for `<source>#<uuid>` primary keys and sort-key namespaces.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StreamError;

/// Separator between the namespace token and the rest of a key.
pub const KEY_SEPARATOR: char = '#';

/// The logical entity a primary key points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogicalKey {
    /// Entity namespace, e.g. `"orders"`.
    pub source: String,
    /// Entity identifier.
    pub id: Uuid,
}

impl LogicalKey {
    pub fn new(source: impl Into<String>, id: Uuid) -> Self {
        Self {
            source: source.into(),
            id,
        }
    }

    /// Parse a primary key of the form `<source>#<uuid>`.
    ///
    /// The key must split into exactly two parts. The source is taken as-is;
    /// the identifier must be a UUID.
    pub fn parse(pk: &str) -> Result<Self, StreamError> {
        let mut parts = pk.split(KEY_SEPARATOR);
        let (source, raw_id) = match (parts.next(), parts.next(), parts.next()) {
            (Some(source), Some(raw_id), None) => (source, raw_id),
            _ => {
                return Err(StreamError::InvalidKeyFormat {
                    key: pk.to_string(),
                })
            }
        };

        let id = Uuid::parse_str(raw_id).map_err(|source| StreamError::MalformedIdentifier {
            value: raw_id.to_string(),
            source,
        })?;

        Ok(Self::new(source, id))
    }
}

impl FromStr for LogicalKey {
    type Err = StreamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for LogicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.source, KEY_SEPARATOR, self.id.hyphenated())
    }
}

/// Leading namespace token of a sort key.
///
/// `"orders#LINEITEM#1"` yields `"orders"`; a key without a separator is
/// returned whole.
pub fn sort_key_source(sk: &str) -> &str {
    sk.split(KEY_SEPARATOR).next().unwrap_or_default()
}
