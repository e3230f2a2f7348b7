//! Change-stream record types, shaped like DynamoDB Streams records.
//!
//! Only the operation kind and the key attributes are read by the processor;
//! everything else in the JSON payload is accepted and ignored.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::event::EventType;

// ─── OperationType ────────────────────────────────────────────────────────────

/// Kind of mutation a change record describes.
///
/// `Unknown` carries any operation name this crate does not map, so a batch
/// containing one still deserializes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OperationType {
    Insert,
    Modify,
    Remove,
    Unknown(String),
}

impl OperationType {
    /// The fixed operation → event type table. `None` for unmapped operations.
    pub fn event_type(&self) -> Option<EventType> {
        match self {
            Self::Insert => Some(EventType::Created),
            Self::Modify => Some(EventType::Updated),
            Self::Remove => Some(EventType::Deleted),
            Self::Unknown(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Insert => "INSERT",
            Self::Modify => "MODIFY",
            Self::Remove => "REMOVE",
            Self::Unknown(name) => name.as_str(),
        }
    }
}

impl From<String> for OperationType {
    fn from(name: String) -> Self {
        match name.as_str() {
            "INSERT" => Self::Insert,
            "MODIFY" => Self::Modify,
            "REMOVE" => Self::Remove,
            _ => Self::Unknown(name),
        }
    }
}

impl From<OperationType> for String {
    fn from(op: OperationType) -> Self {
        match op {
            OperationType::Unknown(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── AttributeValue ───────────────────────────────────────────────────────────

/// A typed attribute value as it appears in a record's key set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    #[serde(rename = "S")]
    S(String),
    #[serde(rename = "N")]
    N(String),
    /// Base64-encoded binary.
    #[serde(rename = "B")]
    B(String),
    #[serde(rename = "BOOL")]
    Bool(bool),
    #[serde(rename = "NULL")]
    Null(bool),
}

impl AttributeValue {
    /// The string payload, if this is a string attribute.
    pub fn as_s(&self) -> Option<&str> {
        match self {
            Self::S(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

// ─── StreamRecord ─────────────────────────────────────────────────────────────

/// The item-level part of a change record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamChange {
    /// Key attributes of the changed item.
    #[serde(rename = "Keys", default)]
    pub keys: HashMap<String, AttributeValue>,
    #[serde(
        rename = "SequenceNumber",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sequence_number: Option<String>,
}

/// One change notification from the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamRecord {
    #[serde(rename = "eventID", default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(rename = "eventName")]
    pub operation: OperationType,
    #[serde(rename = "dynamodb", default)]
    pub change: StreamChange,
}

impl StreamRecord {
    /// A record with string `PK`/`SK` keys.
    pub fn new(operation: OperationType, pk: impl Into<String>, sk: impl Into<String>) -> Self {
        Self {
            event_id: None,
            operation,
            change: StreamChange::default(),
        }
        .with_key("PK", AttributeValue::S(pk.into()))
        .with_key("SK", AttributeValue::S(sk.into()))
    }

    /// Set or replace one key attribute.
    pub fn with_key(mut self, name: impl Into<String>, value: AttributeValue) -> Self {
        self.change.keys.insert(name.into(), value);
        self
    }

    /// Look up a key attribute that must be a string.
    pub fn string_key(&self, name: &str) -> Option<&str> {
        self.change.keys.get(name).and_then(AttributeValue::as_s)
    }

    /// Parse a JSON array of records.
    pub fn batch_from_json(json: &str) -> Result<Vec<StreamRecord>, serde_json::Error> {
        serde_json::from_str(json)
    }
}
