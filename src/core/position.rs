//! Resume positions and the pipeline-side position cursor

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Binlog coordinates the capture pipeline resumes from.
///
/// Positions are ordered by file name first (binlog files carry a sequence
/// suffix, e.g. `mysql-bin.000042`) and offset second.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub file: String,
    pub offset: u64,
}

impl Position {
    pub fn new<S: Into<String>>(file: S, offset: u64) -> Self {
        Self {
            file: file.into(),
            offset,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.offset)
    }
}

/// The part of the pipeline context a sink talks to
pub trait PipelineContext: Send + Sync {
    /// Record that everything up to `position` may be skipped on restart
    fn set_position(&self, position: Position);
}

/// In-memory position cursor.
///
/// Keeps the last position handed over by the sink and counts how many times
/// it was advanced. A persisting pipeline reads [`PositionCursor::position`]
/// when it checkpoints.
#[derive(Debug, Default)]
pub struct PositionCursor {
    position: Mutex<Option<Position>>,
    advances: AtomicU64,
}

impl PositionCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor resuming from a stored position
    pub fn starting_at(position: Position) -> Self {
        Self {
            position: Mutex::new(Some(position)),
            advances: AtomicU64::new(0),
        }
    }

    pub fn position(&self) -> Option<Position> {
        self.position
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of `set_position` calls seen so far
    pub fn advances(&self) -> u64 {
        self.advances.load(Ordering::Relaxed)
    }
}

impl PipelineContext for PositionCursor {
    fn set_position(&self, position: Position) {
        let mut current = self
            .position
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(previous) = current.as_ref() {
            if position < *previous {
                warn!("Position moved backwards: {} -> {}", previous, position);
            }
        }

        debug!("Position advanced to {}", position);
        *current = Some(position);
        self.advances.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_ordering() {
        let a = Position::new("mysql-bin.000001", 900);
        let b = Position::new("mysql-bin.000001", 1200);
        let c = Position::new("mysql-bin.000002", 4);

        assert!(a < b);
        assert!(b < c);
        assert_eq!(c.to_string(), "mysql-bin.000002:4");
    }

    #[test]
    fn test_cursor_tracks_latest_position() {
        let cursor = PositionCursor::new();
        assert_eq!(cursor.position(), None);
        assert_eq!(cursor.advances(), 0);

        cursor.set_position(Position::new("mysql-bin.000001", 10));
        cursor.set_position(Position::new("mysql-bin.000001", 20));

        assert_eq!(cursor.position(), Some(Position::new("mysql-bin.000001", 20)));
        assert_eq!(cursor.advances(), 2);
    }

    #[test]
    fn test_cursor_starting_at() {
        let cursor = PositionCursor::starting_at(Position::new("mysql-bin.000007", 154));
        assert_eq!(cursor.position(), Some(Position::new("mysql-bin.000007", 154)));
        assert_eq!(cursor.advances(), 0);
    }

    #[test]
    fn test_position_json_shape() {
        let position: Position =
            serde_json::from_str(r#"{"file":"mysql-bin.000003","offset":4567}"#).unwrap();
        assert_eq!(position, Position::new("mysql-bin.000003", 4567));
    }
}
