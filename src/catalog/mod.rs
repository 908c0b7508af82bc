//! The read-only catalog of streams and tables.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::plan::{KeyField, NodeType};
use crate::schema::{ColumnName, LogicalSchema, SourceName};

/// Serialization format of record keys or values.
///
/// Carried through plans as metadata; the core never touches bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Json,
    Avro,
    Delimited,
    Kafka,
}

/// How the per-record timestamp is obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimestampPolicy {
    /// Use the record's own metadata timestamp
    RecordTime,
    /// Extract from a value column
    Column(ColumnName),
}

/// A catalog entry: one stream or table bound to a topic.
#[derive(Debug, Clone, PartialEq)]
pub struct Source {
    name: SourceName,
    node_type: NodeType,
    schema: LogicalSchema,
    key_field: KeyField,
    key_format: Format,
    value_format: Format,
    windowed: bool,
    timestamp_policy: TimestampPolicy,
    topic: String,
    partition_count: u32,
}

impl Source {
    /// Start building a source entry.
    pub fn builder(name: SourceName, node_type: NodeType, schema: LogicalSchema) -> SourceBuilder {
        SourceBuilder {
            name,
            node_type,
            schema,
            key_field: KeyField::none(),
            key_format: Format::Kafka,
            value_format: Format::Json,
            windowed: false,
            timestamp_policy: TimestampPolicy::RecordTime,
            topic: None,
            partition_count: 1,
        }
    }

    pub fn name(&self) -> &SourceName {
        &self.name
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn schema(&self) -> &LogicalSchema {
        &self.schema
    }

    pub fn key_field(&self) -> &KeyField {
        &self.key_field
    }

    pub fn key_format(&self) -> Format {
        self.key_format
    }

    pub fn value_format(&self) -> Format {
        self.value_format
    }

    /// Whether the source's key carries window bounds.
    pub fn is_windowed(&self) -> bool {
        self.windowed
    }

    pub fn timestamp_policy(&self) -> &TimestampPolicy {
        &self.timestamp_policy
    }

    /// The backing topic name.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn partition_count(&self) -> u32 {
        self.partition_count
    }
}

/// Builder for [`Source`].
#[derive(Debug)]
pub struct SourceBuilder {
    name: SourceName,
    node_type: NodeType,
    schema: LogicalSchema,
    key_field: KeyField,
    key_format: Format,
    value_format: Format,
    windowed: bool,
    timestamp_policy: TimestampPolicy,
    topic: Option<String>,
    partition_count: u32,
}

impl SourceBuilder {
    /// Declare the key column.
    pub fn key_field(mut self, key_field: KeyField) -> Self {
        self.key_field = key_field;
        self
    }

    pub fn key_format(mut self, format: Format) -> Self {
        self.key_format = format;
        self
    }

    pub fn value_format(mut self, format: Format) -> Self {
        self.value_format = format;
        self
    }

    pub fn windowed(mut self, windowed: bool) -> Self {
        self.windowed = windowed;
        self
    }

    pub fn timestamp_policy(mut self, policy: TimestampPolicy) -> Self {
        self.timestamp_policy = policy;
        self
    }

    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn partition_count(mut self, count: u32) -> Self {
        self.partition_count = count;
        self
    }

    /// Build the entry. The topic defaults to the source name.
    pub fn build(self) -> Source {
        Source {
            topic: self.topic.unwrap_or_else(|| self.name.to_string()),
            name: self.name,
            node_type: self.node_type,
            schema: self.schema,
            key_field: self.key_field,
            key_format: self.key_format,
            value_format: self.value_format,
            windowed: self.windowed,
            timestamp_policy: self.timestamp_policy,
            partition_count: self.partition_count,
        }
    }
}

/// Read-only lookup of named sources.
///
/// The planner never mutates the catalog.
pub trait Catalog: Send + Sync {
    /// Look up a source by name.
    fn source(&self, name: &SourceName) -> Option<Arc<Source>>;

    /// All registered source names, for error messages.
    fn source_names(&self) -> Vec<String>;
}

/// In-memory catalog for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    sources: RwLock<HashMap<String, Arc<Source>>>,
}

impl MemoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source, replacing any previous entry of the same name.
    pub fn register(&self, source: Source) {
        self.sources
            .write()
            .insert(source.name().to_string(), Arc::new(source));
    }

    /// Remove a source by name.
    pub fn deregister(&self, name: &SourceName) -> Option<Arc<Source>> {
        self.sources.write().remove(name.as_str())
    }
}

impl Catalog for MemoryCatalog {
    fn source(&self, name: &SourceName) -> Option<Arc<Source>> {
        self.sources.read().get(name.as_str()).cloned()
    }

    fn source_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sources.read().keys().cloned().collect();
        names.sort();
        names
    }
}
