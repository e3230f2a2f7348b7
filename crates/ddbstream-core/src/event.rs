//! Domain events produced from change-stream records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Semantic type of a domain event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Created,
    Updated,
    Deleted,
}

impl EventType {
    pub const ALL: [EventType; 3] = [EventType::Created, EventType::Updated, EventType::Deleted];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "updated" => Ok(Self::Updated),
            "deleted" => Ok(Self::Deleted),
            other => Err(format!("unknown event type '{other}'")),
        }
    }
}

/// A domain event derived from one change record.
///
/// Built per record, handed to the matching handlers, then dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Entity namespace taken from the primary key.
    pub source: String,
    /// Event type derived from the stream operation.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Entity identifier taken from the primary key.
    pub id: Uuid,
    /// Raw primary key, verbatim.
    pub pk: String,
    /// Raw sort key, verbatim.
    pub sk: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_string_forms() {
        for ty in EventType::ALL {
            assert_eq!(ty.as_str().parse::<EventType>().unwrap(), ty);
        }
        assert!("".parse::<EventType>().is_err());
    }

    #[test]
    fn event_serializes_type_in_lowercase() {
        let event = Event {
            source: "orders".into(),
            event_type: EventType::Deleted,
            id: Uuid::nil(),
            pk: "orders#00000000-0000-0000-0000-000000000000".into(),
            sk: "orders".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "deleted");
        assert_eq!(json["source"], "orders");
    }
}
