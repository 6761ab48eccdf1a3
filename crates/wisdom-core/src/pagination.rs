//! Pagination state threaded between the engine and its caller
//!
//! The engine never stores pagination state. Callers hand back whatever the
//! previous call returned, and the strategy of a state always matches the
//! strategy of the table's owning database.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a backing source addresses its pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaginationStrategy {
    /// Opaque position token (an integer rendered as a string)
    Cursor,
    /// Plain integer row offset
    Offset,
}

impl fmt::Display for PaginationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaginationStrategy::Cursor => f.write_str("cursor"),
            PaginationStrategy::Offset => f.write_str("offset"),
        }
    }
}

/// Caller-held position in a table's raw record stream
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "lowercase")]
pub enum PaginationState {
    Cursor {
        #[serde(default)]
        cursor: Option<String>,
    },
    Offset {
        #[serde(default)]
        offset: usize,
    },
}

impl PaginationState {
    /// State pointing at the first raw record
    pub fn initial(strategy: PaginationStrategy) -> Self {
        match strategy {
            PaginationStrategy::Cursor => PaginationState::Cursor { cursor: None },
            PaginationStrategy::Offset => PaginationState::Offset { offset: 0 },
        }
    }

    /// State pointing at raw position `position`
    pub fn at(strategy: PaginationStrategy, position: usize) -> Self {
        match strategy {
            PaginationStrategy::Cursor => PaginationState::Cursor {
                cursor: Some(position.to_string()),
            },
            PaginationStrategy::Offset => PaginationState::Offset { offset: position },
        }
    }

    /// The strategy this state belongs to
    pub fn strategy(&self) -> PaginationStrategy {
        match self {
            PaginationState::Cursor { .. } => PaginationStrategy::Cursor,
            PaginationState::Offset { .. } => PaginationStrategy::Offset,
        }
    }

    /// Decode the raw scan position
    pub fn position(&self) -> Result<usize> {
        match self {
            PaginationState::Cursor { cursor: None } => Ok(0),
            PaginationState::Cursor { cursor: Some(c) } => c.trim().parse().map_err(|_| {
                Error::InvalidPaginationState(format!("cursor '{}' is not a position", c))
            }),
            PaginationState::Offset { offset } => Ok(*offset),
        }
    }

    /// Decode the raw scan position of a state expected to use `strategy`
    pub fn position_for(state: Option<&Self>, strategy: PaginationStrategy) -> Result<usize> {
        match state {
            None => Ok(0),
            Some(s) if s.strategy() != strategy => Err(Error::InvalidPaginationState(format!(
                "{} state given for a {} table",
                s.strategy(),
                strategy
            ))),
            Some(s) => s.position(),
        }
    }
}

/// Pagination summary returned alongside a page of rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    /// Whether another call may return more rows
    pub has_more: bool,

    /// State to pass to the next call; present only when `has_more`
    pub next_state: Option<PaginationState>,

    /// Strategy of the table's source
    pub strategy: PaginationStrategy,

    /// Raw records consumed so far, i.e. the raw position reached
    pub loaded_records: usize,

    /// Raw records in the table
    pub total_records: usize,
}

impl PaginationInfo {
    /// An exhausted page for a table that yields nothing
    pub fn empty(strategy: PaginationStrategy) -> Self {
        Self {
            has_more: false,
            next_state: None,
            strategy,
            loaded_records: 0,
            total_records: 0,
        }
    }
}
