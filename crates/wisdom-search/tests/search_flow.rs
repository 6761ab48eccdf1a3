//! End-to-end search over a data directory: load, pick tables, page rows

use std::collections::HashSet;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use wisdom_core::PaginationStrategy;
use wisdom_query::{parse_query, BoolOp, Condition, PermutationRegistry, QueryEvaluator, QueryGroup};
use wisdom_search::{CancellationToken, FacetFilters, PickedTable, SearchCoordinator, SearchParams};
use wisdom_storage::loader::{METADATA_FILE, RECORDS_DIR};
use wisdom_storage::{DataLoader, RecordSource};

fn data_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(METADATA_FILE),
        r#"{
            "metadata": {
                "t_companies": {"name": "Companies", "year": 2021, "country": "Japan",
                    "categories": ["Finance"],
                    "columns": [{"name": "company", "type": "org"}, {"name": "status"}]},
                "t_ledger": {"name": "Ledger", "year": 2019, "country": "Mexico",
                    "categories": ["Finance", "Economy"],
                    "columns": [{"name": "entry"}, {"name": "status"}]}
            },
            "databaseConfig": {"db_a": {"name": "Alpha"}, "db_b": {"name": "Beta"}},
            "databaseAssignments": {"db_a": ["t_companies"], "db_b": ["t_ledger"]}
        }"#,
    )
    .unwrap();

    let records = dir.path().join(RECORDS_DIR);
    fs::create_dir(&records).unwrap();
    fs::write(
        records.join("db_a.json"),
        r#"{"records": [
            {"tableKey": "t_companies", "company": "Apex Corp", "status": "Active"},
            {"tableKey": "t_companies", "company": "Nova Inc", "status": "Pending"},
            {"tableKey": "t_companies", "company": "Zenith", "status": "Active"}
        ]}"#,
    )
    .unwrap();

    let ledger: Vec<serde_json::Value> = (0..45)
        .map(|i| {
            serde_json::json!({
                "tableKey": "t_ledger",
                "entry": format!("E{:02}", i),
                "status": if i % 3 == 0 { "Active" } else { "Closed" },
            })
        })
        .collect();
    fs::write(
        records.join("db_b.json"),
        serde_json::json!({ "records": ledger }).to_string(),
    )
    .unwrap();
    dir
}

async fn coordinator(dir: &TempDir) -> SearchCoordinator {
    let data = DataLoader::new(dir.path()).load().await.unwrap();
    SearchCoordinator::new(Arc::new(data.metadata), Arc::new(data.records)).with_scan_batch(10)
}

#[tokio::test]
async fn test_structured_query_end_to_end() {
    let dir = data_dir();
    let search = coordinator(&dir).await;

    let tree = QueryGroup::new(BoolOp::And)
        .child(
            QueryGroup::new(BoolOp::Or)
                .child(Condition::new("apex"))
                .child(Condition::new("nova")),
        )
        .child(Condition::new("active"));
    let params = SearchParams::new(tree.to_elements());
    assert_eq!(params.query, parse_query(r#"("apex" OR "nova") AND active"#));

    let found = search
        .search_databases(&["db_a", "db_b"], &params)
        .await
        .unwrap();
    assert_eq!(found.total_tables(), 1);
    assert_eq!(found.databases[0].table_ids, vec!["t_companies"]);
    assert!(found.databases[1].table_ids.is_empty());

    let page = search
        .fetch_rows("t_companies", None, 10, &params, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(page.rows.len(), 1);
    assert_eq!(page.rows[0].project(&["company".to_string()]), vec!["Apex Corp"]);
    assert!(!page.pagination.has_more);
}

#[tokio::test]
async fn test_cursor_pages_cover_every_match_once() {
    let dir = data_dir();
    let search = coordinator(&dir).await;
    let params = SearchParams::new(parse_query("active"));
    let cancel = CancellationToken::new();

    let mut state = None;
    let mut seen = Vec::new();
    let mut calls = 0;
    loop {
        let page = search
            .fetch_rows("t_ledger", state.as_ref(), 4, &params, &cancel)
            .await
            .unwrap();
        calls += 1;
        assert_eq!(page.pagination.strategy, PaginationStrategy::Cursor);
        seen.extend(page.rows.into_iter().map(|r| r.project(&["entry".to_string()]).remove(0)));
        if !page.pagination.has_more {
            assert!(page.pagination.next_state.is_none());
            break;
        }
        state = page.pagination.next_state;
        assert!(calls < 45, "pagination did not terminate");
    }

    let expected: Vec<String> = (0..45).step_by(3).map(|i| format!("E{:02}", i)).collect();
    assert_eq!(seen, expected);
    assert_eq!(seen.iter().collect::<HashSet<_>>().len(), 15);

    // Same answer as filtering the whole table at once
    let data = DataLoader::new(dir.path()).load().await.unwrap();
    let all = data.records.fetch_raw_page("t_ledger", 0, 100).await.unwrap();
    let perms = Default::default();
    let evaluator = QueryEvaluator::new(&params.query, &perms);
    assert_eq!(evaluator.filter(&all).len(), seen.len());
}

#[tokio::test]
async fn test_permutations_and_facets() {
    let dir = data_dir();
    let search = coordinator(&dir).await;
    let registry = PermutationRegistry::builtin();

    // "htineZ" only matches once reversed
    let query = parse_query("htineZ");
    let permutations = registry.expand_query(&query, "reverse", &Default::default());
    let params = SearchParams::new(query).permutations(permutations);
    let page = search
        .fetch_rows("t_companies", None, 10, &params, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(page.rows.len(), 1);

    let economy = SearchParams::new(Vec::new()).filters(FacetFilters {
        categories: vec!["economy".to_string()],
        ..Default::default()
    });
    let found = search
        .search_databases(&["db_a", "db_b"], &economy)
        .await
        .unwrap();
    assert_eq!(found.total_tables(), 1);
    assert_eq!(found.facets.categories["Finance"], 45);
    assert!(!found.facets.regions.contains_key("Japan"));

    let picked = SearchParams::new(Vec::new()).picked_tables(vec![PickedTable::in_db("db_b", "t_ledger")]);
    let excluded = search
        .fetch_rows("t_companies", None, 10, &picked, &CancellationToken::new())
        .await
        .unwrap();
    assert!(excluded.rows.is_empty());
    assert_eq!(excluded.pagination.total_records, 0);
}
