//! Wisdom - structured search over tabular database catalogs
//!
//! This is the main library crate that re-exports all Wisdom components.

pub use wisdom_core as core;
pub use wisdom_protocol as protocol;
pub use wisdom_query as query;
pub use wisdom_search as search;
pub use wisdom_server as server;
pub use wisdom_storage as storage;

// Re-export commonly used types
pub use wisdom_core::{
    ColumnMeta, DatabaseInfo, Error, FieldValue, PaginationInfo, PaginationState,
    PaginationStrategy, Record, Result, TableMetadata, TableMetadataStore,
};

pub use wisdom_query::{parse_query, BoolOp, PermutationRegistry, QueryElement, QueryEvaluator};
pub use wisdom_search::{
    CancellationToken, FacetCounts, FacetFilters, SearchCoordinator, SearchParams,
};
pub use wisdom_storage::{DataLoader, InMemoryRecordSource, RecordSource};
