//! Wisdom Storage
//!
//! Provides raw record access for the search engine.
//!
//! # Architecture
//!
//! The storage layer is organized into:
//! - `RecordSource`, the async collaborator the search coordinator pulls raw
//!   pages from
//! - An in-memory implementation
//! - A loader reading table metadata and records from a JSON data directory

pub mod loader;
pub mod source;

pub use loader::{parse_metadata, DataLoader, DataSet};
pub use source::{InMemoryRecordSource, RecordSource};
