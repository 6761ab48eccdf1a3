//! HTTP/REST API server implementation using Axum

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};
use wisdom_core::{Error, TableMetadataStore};
use wisdom_protocol::http::{
    endpoints, BdtsResponse, CatalogResponse, ErrorResponse, HealthResponse,
    PermutationRegistryResponse, PermutationsRequest, PermutationsResponse, SearchRowsRequest,
    SearchRowsResponse, SearchTablesRequest, SearchTablesResponse, TableSummary, VersionResponse,
};
use wisdom_query::{validate, PermutationRegistry};
use wisdom_search::{CancellationToken, SearchCoordinator};
use wisdom_storage::DataSet;

use crate::config::ServerConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub coordinator: SearchCoordinator,
    pub permutations: Arc<PermutationRegistry>,
    pub config: Arc<ServerConfig>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: ServerConfig, data: DataSet) -> Self {
        let coordinator = SearchCoordinator::new(Arc::new(data.metadata), Arc::new(data.records))
            .with_match_mode(config.table_match);
        Self {
            coordinator,
            permutations: Arc::new(PermutationRegistry::builtin()),
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    fn metadata(&self) -> &TableMetadataStore {
        self.coordinator.metadata()
    }
}

/// Engine error rendered as a JSON response
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        if self.0.is_not_found() {
            StatusCode::NOT_FOUND
        } else if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            warn!("Request failed: {}", self.0);
        } else {
            debug!("Request rejected: {}", self.0);
        }
        (status, Json(ErrorResponse::from(&self.0))).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

/// Create HTTP server router
pub fn create_router(state: AppState) -> Router {
    let cors = state.config.cors_layer();

    Router::new()
        .route(endpoints::VERSION, get(version))
        .route(endpoints::HEALTH, get(health_check))
        .route(endpoints::CATALOG, get(catalog))
        .route(endpoints::BDTS, get(bdts))
        .route(endpoints::PERMUTATIONS, get(list_permutations).post(expand_permutations))
        .route(endpoints::SEARCH_TABLES, post(search_tables))
        .route(endpoints::SEARCH_ROWS, post(search_rows))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// ==================== Service Info ====================

async fn version() -> impl IntoResponse {
    Json(VersionResponse::default())
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    };

    Json(response)
}

// ==================== Catalog ====================

async fn catalog(State(state): State<AppState>) -> impl IntoResponse {
    Json(CatalogResponse::from(state.metadata()))
}

async fn bdts(State(state): State<AppState>) -> impl IntoResponse {
    Json(BdtsResponse {
        bdts: state.metadata().column_types(),
    })
}

// ==================== Permutations ====================

async fn list_permutations(State(state): State<AppState>) -> impl IntoResponse {
    Json(PermutationRegistryResponse {
        permutations: state.permutations.specs().to_vec(),
    })
}

async fn expand_permutations(
    State(state): State<AppState>,
    Json(request): Json<PermutationsRequest>,
) -> ApiResult<PermutationsResponse> {
    request.validate()?;
    let params = request.params.unwrap_or_default();
    let permutations = state
        .permutations
        .expand_terms(&request.terms, &request.permutation_id, &params);
    Ok(Json(PermutationsResponse { permutations }))
}

// ==================== Search ====================

async fn search_tables(
    State(state): State<AppState>,
    Json(request): Json<SearchTablesRequest>,
) -> ApiResult<SearchTablesResponse> {
    let dbs = request.db_keys()?;
    let params = request.context.to_params();
    if let Err(e) = validate(&params.query) {
        debug!("Evaluating ill-formed query as given: {}", e);
    }

    let result = state.coordinator.search_databases(&dbs, &params).await?;

    let metadata = state.metadata();
    let mut tables = Vec::with_capacity(result.total_tables());
    for found in &result.databases {
        let db = metadata.require_database(&found.db_id)?;
        tables.extend(
            found
                .table_ids
                .iter()
                .filter_map(|id| metadata.table(id))
                .map(|t| TableSummary::from(t).in_database(db)),
        );
    }

    Ok(Json(SearchTablesResponse {
        total: tables.len(),
        tables,
        facets: result.facets,
    }))
}

async fn search_rows(
    State(state): State<AppState>,
    Json(request): Json<SearchRowsRequest>,
) -> ApiResult<SearchRowsResponse> {
    let SearchRowsRequest { options, context } = request;
    let metadata = state.metadata();

    let table = metadata.require_table(&options.table)?;
    if let Some(db) = options.db.as_deref().filter(|d| !d.is_empty()) {
        let owner = metadata.owning_database(&table.id).map(|d| d.id.as_str());
        if owner != Some(db) {
            return Err(Error::UnknownTable(format!("{} in database {}", table.id, db)).into());
        }
    }

    let strategy = metadata.strategy_for(&table.id)?;
    let page_size = options.page_size(state.config.default_page_size, state.config.max_page_size);
    let resume = options.resolve_state(strategy, page_size);
    let params = context.to_params();
    if let Err(e) = validate(&params.query) {
        debug!("Evaluating ill-formed query as given: {}", e);
    }

    // Cancelled if the client goes away mid-scan
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let page = state
        .coordinator
        .fetch_rows(&table.id, resume.as_ref(), page_size, &params, &cancel)
        .await?;

    let columns = table.column_names();
    let rows = page.rows.iter().map(|r| r.project(&columns)).collect();

    Ok(Json(SearchRowsResponse {
        columns,
        rows,
        pagination: page.pagination,
        page_size,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use wisdom_core::{ColumnMeta, DatabaseInfo, PaginationStrategy, Record, TableMetadata};
    use wisdom_storage::InMemoryRecordSource;

    fn data_set() -> DataSet {
        let metadata = TableMetadataStore::new(
            vec![
                TableMetadata::new("t_companies", "Companies")
                    .year(2021)
                    .country("Japan")
                    .category("Finance")
                    .column(ColumnMeta::typed("company", "org"))
                    .column(ColumnMeta::typed("city", "place")),
                TableMetadata::new("t_rivers", "Rivers")
                    .country("Mexico")
                    .category("Geography")
                    .column(ColumnMeta::typed("river", "place")),
            ],
            vec![
                DatabaseInfo::new("db_a", "Alpha", PaginationStrategy::Offset).tables(["t_companies"]),
                DatabaseInfo::new("db_b", "Beta", PaginationStrategy::Cursor).tables(["t_rivers"]),
            ],
        )
        .unwrap();

        let mut records = Vec::new();
        for i in 0..12i64 {
            let name = if i % 4 == 0 { "Apex Corp" } else { "Nova Inc" };
            records.push(
                Record::new("t_companies")
                    .with("company", name)
                    .with("city", "Tokyo")
                    .with("n", i),
            );
        }
        records.push(Record::new("t_rivers").with("river", "Bravo"));
        records.push(Record::new("t_rivers").with("river", "Lerma"));

        DataSet {
            metadata,
            records: InMemoryRecordSource::from_records(records),
        }
    }

    fn router() -> Router {
        let config = ServerConfig::for_development("/unused").page_sizes(2, 3);
        create_router(AppState::new(config, data_set()))
    }

    async fn call(method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_version_and_health() {
        let (status, body) = call("GET", "/api/version", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"version": "v1"}));

        let (status, body) = call("GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_catalog_and_bdts() {
        let (status, body) = call("GET", "/api/catalog", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tables"].as_array().unwrap().len(), 2);
        assert_eq!(body["databases"][1]["pagination"], "cursor");

        let (_, body) = call("GET", "/api/bdts", None).await;
        assert_eq!(body, json!({"bdts": ["org", "place"]}));
    }

    #[tokio::test]
    async fn test_permutations() {
        let (status, body) = call("GET", "/api/permutations", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["permutations"].as_array().unwrap().len(), 3);

        let (status, body) = call(
            "POST",
            "/api/permutations",
            json!({"permutationId": "reverse", "terms": ["man"]}).into(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["permutations"]["man"], json!(["man", "nam"]));

        let (status, body) = call(
            "POST",
            "/api/permutations",
            json!({"permutationId": "reverse", "terms": []}).into(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"], "validation");
    }

    #[tokio::test]
    async fn test_search_tables() {
        let (status, body) = call(
            "POST",
            "/api/search/tables",
            json!({"dbs": ["db_b", "db_a"], "query": "apex OR bravo"}).into(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total"], 2);
        assert_eq!(body["tables"][0]["id"], "t_rivers");
        assert_eq!(body["tables"][0]["dbName"], "Beta");
        assert_eq!(body["tables"][1]["dbId"], "db_a");
        assert_eq!(body["facets"]["tableNames"]["Companies"], 12);

        let (status, _) = call("POST", "/api/search/tables", json!({"query": "x"}).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) =
            call("POST", "/api/search/tables", json!({"db": "nope"}).into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["details"], "unknown_database");
    }

    #[tokio::test]
    async fn test_search_rows_pages_through_matches() {
        // Apex rows sit at raw positions 0, 4 and 8; page size 2 scans in
        // batches of two, so the first page stops after [4, 6)
        let (status, body) = call(
            "POST",
            "/api/search/rows",
            json!({"options": {"table": "t_companies"}, "query": "apex"}).into(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["columns"], json!(["company", "city"]));
        assert_eq!(body["rows"], json!([["Apex Corp", "Tokyo"], ["Apex Corp", "Tokyo"]]));
        assert_eq!(body["pageSize"], 2);
        assert_eq!(body["pagination"]["hasMore"], true);
        let next = body["pagination"]["nextState"].clone();
        assert_eq!(next, json!({"strategy": "offset", "offset": 6}));

        let (_, body) = call(
            "POST",
            "/api/search/rows",
            json!({"options": {"table": "t_companies", "state": next}, "query": "apex"}).into(),
        )
        .await;
        assert_eq!(body["rows"].as_array().unwrap().len(), 1);
        assert_eq!(body["pagination"]["hasMore"], false);
        assert_eq!(body["pagination"]["loadedRecords"], 12);
    }

    #[tokio::test]
    async fn test_search_rows_cursor_table_without_query() {
        let (status, body) = call(
            "POST",
            "/api/search/rows",
            json!({"options": {"db": "db_b", "table": "t_rivers", "sizeLimit": 1}}).into(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rows"], json!([["Bravo"]]));
        assert_eq!(body["pagination"]["strategy"], "cursor");
        assert_eq!(body["pagination"]["nextState"]["cursor"], "1");
    }

    #[tokio::test]
    async fn test_search_rows_errors() {
        let (status, body) = call(
            "POST",
            "/api/search/rows",
            json!({"options": {"db": "db_a", "table": "t_rivers"}}).into(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["details"], "unknown_table");

        let (status, body) = call(
            "POST",
            "/api/search/rows",
            json!({"options": {"table": "t_rivers", "state": {"strategy": "offset", "offset": 1}}})
                .into(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"], "invalid_pagination_state");
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            ApiError::from(Error::UnknownTable("t".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(Error::MalformedQuery("q".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(Error::BackingStore("down".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::from(Error::Aborted).status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
