//! Wisdom Protocol Types
//!
//! Provides the wire types of the HTTP API.
//!
//! # Protocols
//!
//! - **HTTP**: JSON REST API for the search UI

pub mod http;

pub use http::{
    endpoints, BdtsResponse, CatalogResponse, DatabaseSummary, ErrorResponse, HealthResponse,
    PermutationRegistryResponse, PermutationsRequest, PermutationsResponse, SearchContext,
    SearchRowsOptions, SearchRowsRequest, SearchRowsResponse, SearchTablesRequest,
    SearchTablesResponse, TableSummary, VersionResponse, API_VERSION,
};
