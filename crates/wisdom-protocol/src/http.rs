//! HTTP/REST API types

use serde::{Deserialize, Serialize};
use wisdom_core::{
    DatabaseInfo, Error, PaginationInfo, PaginationState, PaginationStrategy, Result,
    TableMetadata, TableMetadataStore,
};
use wisdom_query::{PermutationMap, PermutationParams, PermutationSpec, QueryElement, QueryInput};
use wisdom_search::{FacetCounts, FacetFilters, PickedTable, SearchParams};

/// HTTP API endpoint paths
pub mod endpoints {
    pub const VERSION: &str = "/api/version";
    pub const HEALTH: &str = "/api/health";
    pub const CATALOG: &str = "/api/catalog";
    pub const BDTS: &str = "/api/bdts";
    pub const PERMUTATIONS: &str = "/api/permutations";
    pub const SEARCH_TABLES: &str = "/api/search/tables";
    pub const SEARCH_ROWS: &str = "/api/search/rows";
}

/// API version reported by `/api/version`
pub const API_VERSION: &str = "v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionResponse {
    pub version: String,
}

impl Default for VersionResponse {
    fn default() -> Self {
        Self {
            version: API_VERSION.to_string(),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Version information
    pub version: String,

    /// Uptime in seconds
    pub uptime_seconds: u64,
}

/// Table entry of the catalog and of search results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSummary {
    pub id: String,
    pub name: String,
    pub year: Option<i32>,
    pub country: Option<String>,
    pub categories: Vec<String>,
    /// Declared record count
    pub count: usize,
    /// Column names in display order
    pub columns: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_name: Option<String>,
}

impl From<&TableMetadata> for TableSummary {
    fn from(table: &TableMetadata) -> Self {
        Self {
            id: table.id.clone(),
            name: table.name.clone(),
            year: table.year,
            country: table.country.clone(),
            categories: table.categories.clone(),
            count: table.record_count,
            columns: table.column_names(),
            db_id: None,
            db_name: None,
        }
    }
}

impl TableSummary {
    /// Tag the entry with the database it was found in
    pub fn in_database(mut self, db: &DatabaseInfo) -> Self {
        self.db_id = Some(db.id.clone());
        self.db_name = Some(db.name.clone());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSummary {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub table_keys: Vec<String>,
    pub pagination: PaginationStrategy,
}

impl From<&DatabaseInfo> for DatabaseSummary {
    fn from(db: &DatabaseInfo) -> Self {
        Self {
            id: db.id.clone(),
            name: db.name.clone(),
            description: db.description.clone(),
            table_keys: db.table_keys.clone(),
            pagination: db.pagination,
        }
    }
}

/// Every table and database known to the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogResponse {
    pub tables: Vec<TableSummary>,
    pub databases: Vec<DatabaseSummary>,
}

impl From<&TableMetadataStore> for CatalogResponse {
    fn from(store: &TableMetadataStore) -> Self {
        Self {
            tables: store.tables().map(TableSummary::from).collect(),
            databases: store.databases().iter().map(DatabaseSummary::from).collect(),
        }
    }
}

/// Column categories usable as clause restrictions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BdtsResponse {
    pub bdts: Vec<String>,
}

/// Term expansion request body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermutationsRequest {
    pub permutation_id: String,

    pub terms: Vec<String>,

    #[serde(default)]
    pub params: Option<PermutationParams>,
}

impl PermutationsRequest {
    pub fn validate(&self) -> Result<()> {
        if self.terms.is_empty() {
            return Err(Error::Validation("terms must be non-empty".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermutationsResponse {
    pub permutations: PermutationMap,
}

/// Registered permutations with their display metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermutationRegistryResponse {
    pub permutations: Vec<PermutationSpec>,
}

/// Query, filters and permutation map shared by both search requests
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchContext {
    /// Free text or a structured query
    #[serde(default)]
    pub query: Option<QueryInput>,

    #[serde(default)]
    pub filters: FacetFilters,

    #[serde(default)]
    pub permutations: PermutationMap,

    #[serde(default, rename = "picked_tables", alias = "pickedTables")]
    pub picked_tables: Vec<PickedTable>,
}

impl SearchContext {
    /// Structured form of the query; empty when absent
    pub fn query_elements(&self) -> Vec<QueryElement> {
        self.query
            .clone()
            .map(QueryInput::into_elements)
            .unwrap_or_default()
    }

    pub fn to_params(&self) -> SearchParams {
        SearchParams::new(self.query_elements())
            .filters(self.filters.clone())
            .permutations(self.permutations.clone())
            .picked_tables(self.picked_tables.clone())
    }
}

/// Phase 1 request body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchTablesRequest {
    #[serde(default)]
    pub db: Option<String>,

    /// Several databases, searched in order; takes precedence over `db`
    #[serde(default)]
    pub dbs: Vec<String>,

    #[serde(flatten)]
    pub context: SearchContext,
}

impl SearchTablesRequest {
    /// Databases to search
    pub fn db_keys(&self) -> Result<Vec<String>> {
        if !self.dbs.is_empty() {
            return Ok(self.dbs.clone());
        }
        match &self.db {
            Some(db) if !db.is_empty() => Ok(vec![db.clone()]),
            _ => Err(Error::Validation("db or dbs is required".to_string())),
        }
    }
}

/// Phase 1 response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchTablesResponse {
    pub tables: Vec<TableSummary>,
    pub facets: FacetCounts,
    pub total: usize,
}

/// Which page of which table to read
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRowsOptions {
    /// Database the table is expected in; checked when present
    #[serde(default)]
    pub db: Option<String>,

    pub table: String,

    /// State returned by the previous page; wins over `startRow`/`pageNumber`
    #[serde(default)]
    pub state: Option<PaginationState>,

    /// 1-based page number, for callers without a state
    #[serde(default)]
    pub page_number: Option<usize>,

    /// Raw start position, for callers without a state
    #[serde(default)]
    pub start_row: Option<usize>,

    #[serde(default)]
    pub size_limit: Option<usize>,
}

impl SearchRowsOptions {
    /// Page size, falling back to `default` and clamped to `max`
    pub fn page_size(&self, default: usize, max: usize) -> usize {
        self.size_limit.unwrap_or(default).clamp(1, max.max(1))
    }

    /// Pagination state to resume from
    pub fn resolve_state(
        &self,
        strategy: PaginationStrategy,
        page_size: usize,
    ) -> Option<PaginationState> {
        if let Some(state) = &self.state {
            return Some(state.clone());
        }
        let start = match (self.start_row, self.page_number) {
            (Some(start), _) => start,
            (None, Some(page)) => page.saturating_sub(1).saturating_mul(page_size),
            (None, None) => return None,
        };
        Some(PaginationState::at(strategy, start))
    }
}

/// Phase 2 request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRowsRequest {
    pub options: SearchRowsOptions,

    #[serde(flatten)]
    pub context: SearchContext,
}

/// Phase 2 response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRowsResponse {
    pub columns: Vec<String>,

    /// Rows projected onto `columns`, rendered as strings
    pub rows: Vec<Vec<String>>,

    pub pagination: PaginationInfo,

    pub page_size: usize,
}

/// Error body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable message
    pub error: String,

    /// Error kind
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl From<&Error> for ErrorResponse {
    fn from(err: &Error) -> Self {
        Self {
            error: err.to_string(),
            details: Some(err.kind().to_string()),
        }
    }
}
