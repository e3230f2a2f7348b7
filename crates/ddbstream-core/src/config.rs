//! Processor configuration and fluent builder.
//!
//! # Example
//!
//! ```rust
//! use ddbstream_core::config::{CompositeKeyPolicy, ProcessorBuilder};
//!
//! let processor = ProcessorBuilder::new()
//!     .composite_keys(CompositeKeyPolicy::SkipRecord)
//!     .build();
//! assert_eq!(processor.handler_count(), 0);
//! ```

use serde::{Deserialize, Serialize};

use crate::processor::Processor;

/// What to do with a record whose sort-key namespace differs from the
/// primary-key source (an item addressed through a composite key).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeKeyPolicy {
    /// Stop processing the rest of the batch and return success.
    #[default]
    StopBatch,
    /// Pass over this record and continue with the next one.
    SkipRecord,
}

/// What to do with an operation outside the insert/modify/remove table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownOperationPolicy {
    /// No handler can match; continue with the next record.
    #[default]
    Ignore,
    /// Fail the batch with `StreamError::UnknownOperation`.
    Reject,
}

/// Configuration for a [`Processor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Name of the primary key attribute in the record key set.
    pub pk_attribute: String,
    /// Name of the sort key attribute in the record key set.
    pub sk_attribute: String,
    pub composite_keys: CompositeKeyPolicy,
    pub unknown_operations: UnknownOperationPolicy,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            pk_attribute: "PK".into(),
            sk_attribute: "SK".into(),
            composite_keys: CompositeKeyPolicy::default(),
            unknown_operations: UnknownOperationPolicy::default(),
        }
    }
}

impl ProcessorConfig {
    /// Parse a config from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Fluent builder for a configured [`Processor`].
#[derive(Debug, Default)]
pub struct ProcessorBuilder {
    config: ProcessorConfig,
}

impl ProcessorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the primary key attribute name.
    pub fn pk_attribute(mut self, name: impl Into<String>) -> Self {
        self.config.pk_attribute = name.into();
        self
    }

    /// Set the sort key attribute name.
    pub fn sk_attribute(mut self, name: impl Into<String>) -> Self {
        self.config.sk_attribute = name.into();
        self
    }

    pub fn composite_keys(mut self, policy: CompositeKeyPolicy) -> Self {
        self.config.composite_keys = policy;
        self
    }

    pub fn unknown_operations(mut self, policy: UnknownOperationPolicy) -> Self {
        self.config.unknown_operations = policy;
        self
    }

    pub fn build_config(self) -> ProcessorConfig {
        self.config
    }

    /// Build a processor with an empty handler registry.
    pub fn build(self) -> Processor {
        Processor::with_config(self.config)
    }
}
