//! Wisdom Search Engine
//!
//! Provides table selection, facet counting and paginated row retrieval on
//! top of the query engine and a record source.
//!
//! # Overview
//!
//! - Phase 1 (`SearchCoordinator::search_tables`) selects the tables of a
//!   database that answer a query and counts facets over them
//! - Phase 2 (`SearchCoordinator::fetch_rows`) returns pages of matching rows
//!   from one table, resuming from a caller-held raw scan position
//! - Facet filters and drill-down facet counts

pub mod coordinator;
pub mod facets;

pub use coordinator::{
    DatabaseTables, MultiSearchResult, PickedTable, RowPage, RowRequest, SearchCoordinator,
    SearchParams, TableMatchMode, TableSearchResult,
};
pub use facets::{aggregate, aggregate_weighted, FacetCounts, FacetFilters, NormalizedFilters};
pub use tokio_util::sync::CancellationToken;
