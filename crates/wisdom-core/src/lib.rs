//! Wisdom Core Library
//!
//! This crate provides the fundamental types, the table metadata store and
//! error handling for the Wisdom search engine.
//!
//! # Modules
//!
//! - `error` - Error types and result aliases
//! - `value` - Record and field value types
//! - `metadata` - Table/database metadata and the read-only metadata store
//! - `pagination` - Pagination strategies, caller-held state and page summaries

pub mod error;
pub mod metadata;
pub mod pagination;
pub mod value;

pub use error::{Error, Result};
pub use metadata::{ColumnMeta, DatabaseInfo, TableMetadata, TableMetadataStore};
pub use pagination::{PaginationInfo, PaginationState, PaginationStrategy};
pub use value::{FieldValue, Record};
