//! Change records handed to the sink by the capture pipeline

use super::SinkResult;
use super::position::Position;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Controls which records are emitted and which fields their payload carries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    /// Deliver schema-change records
    pub output_ddl: bool,
    /// Include `xid` and `commit` fields
    pub include_commit_info: bool,
    /// Include the `position` field
    pub include_binlog_position: bool,
    /// Include columns whose value is null
    pub include_nulls: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_ddl: false,
            include_commit_info: true,
            include_binlog_position: false,
            include_nulls: true,
        }
    }
}

/// Upstream interface of a change record as seen by a sink
pub trait ChangeRecord {
    /// Whether the record should be delivered at all
    fn should_output(&self, config: &OutputConfig) -> bool;

    /// Wire representation of the record
    fn to_json(&self, config: &OutputConfig) -> SinkResult<String>;

    /// Marks the last record of a transaction
    fn is_tx_commit(&self) -> bool;

    /// Position to resume from once this record is handled
    fn next_position(&self) -> Position;
}

/// Kind of change a [`RowRecord`] describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowKind {
    Insert,
    Update,
    Delete,
    Ddl,
    Heartbeat,
}

impl RowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowKind::Insert => "insert",
            RowKind::Update => "update",
            RowKind::Delete => "delete",
            RowKind::Ddl => "ddl",
            RowKind::Heartbeat => "heartbeat",
        }
    }
}

/// One captured row change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowRecord {
    pub database: String,
    pub table: String,
    #[serde(rename = "type")]
    pub kind: RowKind,
    /// Seconds since the epoch at which the change was committed upstream
    pub ts: i64,
    #[serde(default)]
    pub xid: Option<u64>,
    #[serde(default)]
    pub commit: bool,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub old: Option<Map<String, Value>>,
    /// Position after this record
    pub position: Position,
}

impl RowRecord {
    fn columns(columns: &Map<String, Value>, include_nulls: bool) -> Value {
        let filtered = columns
            .iter()
            .filter(|(_, value)| include_nulls || !value.is_null())
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect::<Map<String, Value>>();
        Value::Object(filtered)
    }
}

impl ChangeRecord for RowRecord {
    fn should_output(&self, config: &OutputConfig) -> bool {
        match self.kind {
            RowKind::Heartbeat => false,
            RowKind::Ddl => config.output_ddl,
            _ => true,
        }
    }

    fn to_json(&self, config: &OutputConfig) -> SinkResult<String> {
        let mut object = Map::new();
        object.insert("database".to_string(), Value::from(self.database.clone()));
        object.insert("table".to_string(), Value::from(self.table.clone()));
        object.insert("type".to_string(), Value::from(self.kind.as_str()));
        object.insert("ts".to_string(), Value::from(self.ts));

        if config.include_commit_info {
            if let Some(xid) = self.xid {
                object.insert("xid".to_string(), Value::from(xid));
            }
            if self.commit {
                object.insert("commit".to_string(), Value::Bool(true));
            }
        }

        if config.include_binlog_position {
            object.insert("position".to_string(), Value::from(self.position.to_string()));
        }

        object.insert(
            "data".to_string(),
            Self::columns(&self.data, config.include_nulls),
        );

        // Updates carry the previous values of changed columns only
        if let Some(old) = self.old.as_ref().filter(|old| !old.is_empty()) {
            object.insert("old".to_string(), Self::columns(old, config.include_nulls));
        }

        Ok(serde_json::to_string(&Value::Object(object))?)
    }

    fn is_tx_commit(&self) -> bool {
        self.commit
    }

    fn next_position(&self) -> Position {
        self.position.clone()
    }
}
