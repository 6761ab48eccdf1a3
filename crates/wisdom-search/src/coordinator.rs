//! Paginated search coordination
//!
//! Phase 1 picks the tables of a database that can answer a query and counts
//! facets over them. Phase 2 pages through one table's raw records, keeping
//! only matches, until a full page of matches is collected.
//!
//! Pagination state always encodes a raw scan position. Resuming a search
//! continues scanning where the previous call stopped and never revisits
//! records that were already rejected.

use crate::facets::{aggregate_weighted, FacetCounts, FacetFilters, NormalizedFilters};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use wisdom_core::{
    Error, PaginationInfo, PaginationState, PaginationStrategy, Record, Result, TableMetadata,
    TableMetadataStore,
};
use wisdom_query::{PermutationMap, QueryElement, QueryEvaluator};
use wisdom_storage::RecordSource;

/// Default number of raw records read per batch when verifying tables
pub const DEFAULT_SCAN_BATCH: usize = 500;

/// How Phase 1 decides that a table answers a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableMatchMode {
    /// Match against table name, region, categories and year only
    Metadata,
    /// Also accept tables with at least one matching row
    #[default]
    Verified,
}

/// A table the caller restricted the search to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PickedTable {
    /// Database of the table; applies to every database when absent
    #[serde(default)]
    pub db: Option<String>,
    pub table: String,
}

impl PickedTable {
    pub fn new<S: Into<String>>(table: S) -> Self {
        Self {
            db: None,
            table: table.into(),
        }
    }

    pub fn in_db<D: Into<String>, S: Into<String>>(db: D, table: S) -> Self {
        Self {
            db: Some(db.into()),
            table: table.into(),
        }
    }
}

fn picked_allows(picked: &[PickedTable], db: &str, table: &str) -> bool {
    picked.is_empty()
        || picked
            .iter()
            .any(|p| p.table == table && p.db.as_deref().is_none_or(|d| d == db))
}

/// Query context shared by both phases
#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    pub query: Vec<QueryElement>,
    pub filters: FacetFilters,
    pub permutations: PermutationMap,
    pub picked_tables: Vec<PickedTable>,
}

impl SearchParams {
    pub fn new(query: Vec<QueryElement>) -> Self {
        Self {
            query,
            ..Default::default()
        }
    }

    pub fn filters(mut self, filters: FacetFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn permutations(mut self, permutations: PermutationMap) -> Self {
        self.permutations = permutations;
        self
    }

    pub fn picked_tables(mut self, picked: Vec<PickedTable>) -> Self {
        self.picked_tables = picked;
        self
    }
}

/// Phase 1 result for one database
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSearchResult {
    pub table_ids: Vec<String>,
    pub facets: FacetCounts,
}

/// Tables found in one database of a multi-database search
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseTables {
    pub db_id: String,
    pub db_name: String,
    pub table_ids: Vec<String>,
}

/// Phase 1 result across several databases
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiSearchResult {
    pub databases: Vec<DatabaseTables>,
    pub facets: FacetCounts,
}

impl MultiSearchResult {
    pub fn total_tables(&self) -> usize {
        self.databases.iter().map(|d| d.table_ids.len()).sum()
    }
}

/// A page of matching rows
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowPage {
    pub rows: Vec<Record>,
    pub pagination: PaginationInfo,
}

impl RowPage {
    fn empty(strategy: PaginationStrategy) -> Self {
        Self {
            rows: Vec::new(),
            pagination: PaginationInfo::empty(strategy),
        }
    }
}

/// One table's Phase 2 request inside `fetch_many`
#[derive(Debug, Clone, PartialEq)]
pub struct RowRequest {
    pub table: String,
    pub state: Option<PaginationState>,
    pub page_size: usize,
}

/// Runs both search phases over a metadata store and a record source.
///
/// Holds no per-search state; every call is a function of its arguments and
/// the backing data.
#[derive(Clone)]
pub struct SearchCoordinator {
    metadata: Arc<TableMetadataStore>,
    source: Arc<dyn RecordSource>,
    match_mode: TableMatchMode,
    scan_batch: usize,
}

impl SearchCoordinator {
    pub fn new(metadata: Arc<TableMetadataStore>, source: Arc<dyn RecordSource>) -> Self {
        Self {
            metadata,
            source,
            match_mode: TableMatchMode::default(),
            scan_batch: DEFAULT_SCAN_BATCH,
        }
    }

    /// Builder: set how Phase 1 matches tables
    pub fn with_match_mode(mut self, mode: TableMatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    /// Builder: set the verification batch size
    pub fn with_scan_batch(mut self, batch: usize) -> Self {
        self.scan_batch = batch.max(1);
        self
    }

    pub fn metadata(&self) -> &TableMetadataStore {
        &self.metadata
    }

    pub fn match_mode(&self) -> TableMatchMode {
        self.match_mode
    }

    /// Phase 1: tables of `db` that answer the query, with facet counts
    pub async fn search_tables(&self, db: &str, params: &SearchParams) -> Result<TableSearchResult> {
        let candidates = self.metadata.tables_in(db)?;
        let filters = params.filters.normalize();

        let meta_evaluator = QueryEvaluator::new(&params.query, &params.permutations);
        let row_evaluator = QueryEvaluator::new(&params.query, &params.permutations)
            .with_metadata(&self.metadata);

        let mut surviving: Vec<&TableMetadata> = Vec::new();
        for table in candidates {
            if !self.admits(db, table, params, &filters) {
                continue;
            }
            if meta_evaluator.is_empty() || meta_evaluator.matches(&metadata_record(table)) {
                surviving.push(table);
                continue;
            }
            if self.match_mode == TableMatchMode::Verified
                && self.table_has_match(&table.id, &row_evaluator).await?
            {
                surviving.push(table);
            }
        }

        let mut weighted = Vec::with_capacity(surviving.len());
        for table in &surviving {
            weighted.push((*table, self.source.table_record_count(&table.id).await?));
        }
        let facets = aggregate_weighted(weighted, &params.filters);

        debug!(
            "Phase 1 on '{}' kept {} tables ({:?} mode)",
            db,
            surviving.len(),
            self.match_mode
        );

        Ok(TableSearchResult {
            table_ids: surviving.iter().map(|t| t.id.clone()).collect(),
            facets,
        })
    }

    /// Phase 1 over several databases in the given order, facets summed
    pub async fn search_databases<S: AsRef<str>>(
        &self,
        dbs: &[S],
        params: &SearchParams,
    ) -> Result<MultiSearchResult> {
        let mut databases = Vec::with_capacity(dbs.len());
        let mut facets = FacetCounts::default();
        for db in dbs {
            let info = self.metadata.require_database(db.as_ref())?;
            let result = self.search_tables(&info.id, params).await?;
            facets.merge(&result.facets);
            databases.push(DatabaseTables {
                db_id: info.id.clone(),
                db_name: info.name.clone(),
                table_ids: result.table_ids,
            });
        }
        Ok(MultiSearchResult { databases, facets })
    }

    /// Phase 2: the next page of rows of `table` matching the query.
    ///
    /// An aborted call returns `Error::Aborted` and no page.
    pub async fn fetch_rows(
        &self,
        table: &str,
        state: Option<&PaginationState>,
        page_size: usize,
        params: &SearchParams,
        cancel: &CancellationToken,
    ) -> Result<RowPage> {
        let meta = self.metadata.require_table(table)?;
        let strategy = self.metadata.strategy_for(table)?;
        if page_size == 0 {
            return Err(Error::Validation("page size must be positive".to_string()));
        }

        let db = self
            .metadata
            .owning_database(table)
            .map(|d| d.id.as_str())
            .unwrap_or_default();
        if !self.admits(db, meta, params, &params.filters.normalize()) {
            debug!("Table '{}' excluded by picked tables or filters", table);
            return Ok(RowPage::empty(strategy));
        }

        let start = PaginationState::position_for(state, strategy)?;
        let total = self.source.table_record_count(table).await?;

        if params.query.is_empty() {
            return self.fetch_slice(table, strategy, start, page_size, total, cancel).await;
        }

        let evaluator = QueryEvaluator::new(&params.query, &params.permutations)
            .with_metadata(&self.metadata);

        let mut position = start;
        let mut rows: Vec<Record> = Vec::with_capacity(page_size.min(total.saturating_sub(start)));
        let mut overflow_at: Option<usize> = None;

        while rows.len() < page_size && position < total {
            let batch = self.fetch_batch(table, position, page_size, cancel).await?;
            if batch.is_empty() {
                break;
            }
            let batch_len = batch.len();
            let before = rows.len();

            for (i, record) in batch.into_iter().enumerate() {
                if !evaluator.matches(&record) {
                    continue;
                }
                if rows.len() == page_size {
                    overflow_at = Some(position + i);
                    break;
                }
                rows.push(record);
            }

            debug!(
                "Scanned '{}' [{}, {}): {} matches",
                table,
                position,
                position + batch_len,
                rows.len() - before
            );

            if overflow_at.is_some() {
                break;
            }
            position += batch_len;
        }

        let (reached, has_more) = match overflow_at {
            Some(resume) => (resume, true),
            None => (position, position < total),
        };

        debug!(
            "Phase 2 on '{}' returned {} rows, raw position {} of {}",
            table,
            rows.len(),
            reached,
            total
        );

        Ok(RowPage {
            rows,
            pagination: PaginationInfo {
                has_more,
                next_state: has_more.then(|| PaginationState::at(strategy, reached)),
                strategy,
                loaded_records: reached,
                total_records: total,
            },
        })
    }

    /// Phase 2 for several tables concurrently; each result is independent
    pub async fn fetch_many(
        &self,
        requests: &[RowRequest],
        params: &SearchParams,
        cancel: &CancellationToken,
    ) -> Vec<Result<RowPage>> {
        join_all(requests.iter().map(|r| {
            self.fetch_rows(&r.table, r.state.as_ref(), r.page_size, params, cancel)
        }))
        .await
    }

    /// Raw slice without a query
    async fn fetch_slice(
        &self,
        table: &str,
        strategy: PaginationStrategy,
        start: usize,
        page_size: usize,
        total: usize,
        cancel: &CancellationToken,
    ) -> Result<RowPage> {
        let rows = self.fetch_batch(table, start, page_size, cancel).await?;
        let end = start.saturating_add(page_size);
        let has_more = end < total;
        Ok(RowPage {
            rows,
            pagination: PaginationInfo {
                has_more,
                next_state: has_more.then(|| PaginationState::at(strategy, end)),
                strategy,
                loaded_records: end.min(total),
                total_records: total,
            },
        })
    }

    /// Fetch one raw batch, giving up as soon as the caller cancels
    async fn fetch_batch(
        &self,
        table: &str,
        start: usize,
        count: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<Record>> {
        if cancel.is_cancelled() {
            info!("Fetch of '{}' aborted at raw position {}", table, start);
            return Err(Error::Aborted);
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Fetch of '{}' aborted at raw position {}", table, start);
                Err(Error::Aborted)
            }
            batch = self.source.fetch_raw_page(table, start, count) => batch,
        }
    }

    /// Whether any raw record of `table` matches
    async fn table_has_match(&self, table: &str, evaluator: &QueryEvaluator<'_>) -> Result<bool> {
        let total = self.source.table_record_count(table).await?;
        let mut position = 0;
        while position < total {
            let batch = self
                .source
                .fetch_raw_page(table, position, self.scan_batch)
                .await?;
            if batch.is_empty() {
                break;
            }
            if batch.iter().any(|r| evaluator.matches(r)) {
                return Ok(true);
            }
            position += batch.len();
        }
        Ok(false)
    }

    fn admits(
        &self,
        db: &str,
        table: &TableMetadata,
        params: &SearchParams,
        filters: &NormalizedFilters,
    ) -> bool {
        picked_allows(&params.picked_tables, db, &table.id) && filters.passes(table)
    }
}

/// Table metadata as a record, for metadata-level matching
fn metadata_record(table: &TableMetadata) -> Record {
    let mut record = Record::new(table.id.clone()).with("name", table.name.clone());
    if let Some(country) = &table.country {
        record.set("country", country.clone());
    }
    if !table.categories.is_empty() {
        record.set("categories", table.categories.join(" "));
    }
    if let Some(year) = table.year {
        record.set("year", year);
    }
    record
}
