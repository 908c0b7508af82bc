//! Window definitions for aggregates and joins.

use std::fmt;

use crate::error::{RapidsError, Result};
use crate::function::{WINDOW_END_NAME, WINDOW_START_NAME};
use crate::schema::FunctionName;
use crate::types::{Row, Value};

/// Windowing applied to a grouped aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WindowType {
    /// Fixed-size, non-overlapping windows
    Tumbling { size_ms: u64 },
    /// Fixed-size windows advancing by less than their size
    Hopping { size_ms: u64, advance_ms: u64 },
    /// Variable-length windows merged on activity gaps
    Session { gap_ms: u64 },
}

impl WindowType {
    /// Check the window's own invariants.
    pub fn validate(&self) -> Result<()> {
        match self {
            WindowType::Tumbling { size_ms } | WindowType::Session { gap_ms: size_ms } => {
                if *size_ms == 0 {
                    return Err(RapidsError::invalid_argument(
                        "window size must be positive".to_string(),
                    ));
                }
            }
            WindowType::Hopping {
                size_ms,
                advance_ms,
            } => {
                if *size_ms == 0 || *advance_ms == 0 {
                    return Err(RapidsError::invalid_argument(
                        "window size and advance must be positive".to_string(),
                    ));
                }
                if advance_ms > size_ms {
                    return Err(RapidsError::invalid_argument(format!(
                        "hopping window advance {}ms exceeds size {}ms",
                        advance_ms, size_ms
                    )));
                }
            }
        }
        Ok(())
    }

    /// Whether this is a session window (requires a merger).
    pub fn is_session(&self) -> bool {
        matches!(self, WindowType::Session { .. })
    }
}

impl fmt::Display for WindowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowType::Tumbling { size_ms } => write!(f, "TUMBLING (SIZE {} MS)", size_ms),
            WindowType::Hopping {
                size_ms,
                advance_ms,
            } => write!(f, "HOPPING (SIZE {} MS, ADVANCE BY {} MS)", size_ms, advance_ms),
            WindowType::Session { gap_ms } => write!(f, "SESSION ({} MS)", gap_ms),
        }
    }
}

/// The `WITHIN` bound of a stream-stream join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WithinExpression {
    before_ms: u64,
    after_ms: u64,
}

impl WithinExpression {
    /// A symmetric window: rows join when their timestamps differ by at
    /// most `size_ms`.
    pub fn of(size_ms: u64) -> Self {
        Self {
            before_ms: size_ms,
            after_ms: size_ms,
        }
    }

    /// An asymmetric window.
    pub fn before_after(before_ms: u64, after_ms: u64) -> Self {
        Self {
            before_ms,
            after_ms,
        }
    }

    /// Convert to the engine-level join window.
    pub fn join_window(&self) -> JoinWindow {
        JoinWindow {
            before_ms: self.before_ms,
            after_ms: self.after_ms,
        }
    }
}

/// The time bound carried by a stream-stream join node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JoinWindow {
    pub before_ms: u64,
    pub after_ms: u64,
}

/// Which window boundary a pseudo-aggregate selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WindowBound {
    Start,
    End,
}

/// Rewrites WINDOWSTART / WINDOWEND aggregate slots to the window
/// boundaries once the window is known.
#[derive(Debug, Clone, Default)]
pub struct WindowSelector {
    selects: Vec<(usize, WindowBound)>,
}

impl WindowSelector {
    /// Find the window-bound slots among `aggregations`.
    ///
    /// Aggregate output rows carry the `non_func_column_count` group-key
    /// columns first; the i-th aggregation lands at
    /// `non_func_column_count + i`.
    pub fn from_aggregations<'a>(
        non_func_column_count: usize,
        aggregation_names: impl IntoIterator<Item = &'a FunctionName>,
    ) -> Self {
        let selects = aggregation_names
            .into_iter()
            .enumerate()
            .filter_map(|(i, name)| {
                let bound = match name.canonical().as_str() {
                    WINDOW_START_NAME => WindowBound::Start,
                    WINDOW_END_NAME => WindowBound::End,
                    _ => return None,
                };
                Some((non_func_column_count + i, bound))
            })
            .collect();
        Self { selects }
    }

    /// Whether any slot needs rewriting.
    pub fn has_selects(&self) -> bool {
        !self.selects.is_empty()
    }

    /// Write the window boundaries into their slots.
    pub fn apply(&self, window_start_ms: i64, window_end_ms: i64, row: &mut Row) {
        for (index, bound) in &self.selects {
            let value = match bound {
                WindowBound::Start => window_start_ms,
                WindowBound::End => window_end_ms,
            };
            row.set_column(*index, Value::Bigint(value));
        }
    }
}
