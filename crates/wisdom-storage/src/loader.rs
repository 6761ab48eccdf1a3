//! JSON data loader
//!
//! Layout of a data directory:
//!
//! - `metadata.json` with `metadata` (table key to table metadata),
//!   `databaseConfig` (database key to name, description and optional
//!   pagination strategy) and `databaseAssignments` (database key to table keys)
//! - `records/<database key>.json` holding `{"records": [...]}`, each record
//!   carrying its `tableKey`

use crate::source::InMemoryRecordSource;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use wisdom_core::{
    DatabaseInfo, Error, PaginationStrategy, Record, Result, TableMetadata, TableMetadataStore,
};

pub const METADATA_FILE: &str = "metadata.json";
pub const RECORDS_DIR: &str = "records";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetadataFile {
    #[serde(default)]
    metadata: BTreeMap<String, TableMetadata>,

    #[serde(default)]
    database_config: BTreeMap<String, DatabaseConfig>,

    #[serde(default)]
    database_assignments: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabaseConfig {
    #[serde(default)]
    name: Option<String>,

    #[serde(default)]
    description: Option<String>,

    #[serde(default)]
    pagination: Option<PaginationStrategy>,
}

#[derive(Debug, Default, Deserialize)]
struct RecordsFile {
    #[serde(default)]
    records: Vec<Record>,
}

/// Everything loaded from a data directory
#[derive(Debug)]
pub struct DataSet {
    pub metadata: TableMetadataStore,
    pub records: InMemoryRecordSource,
}

/// Loads metadata and records from a data directory
#[derive(Debug, Clone)]
pub struct DataLoader {
    data_dir: PathBuf,
}

impl DataLoader {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.data_dir.join(METADATA_FILE)
    }

    pub fn records_path(&self, db: &str) -> PathBuf {
        self.data_dir.join(RECORDS_DIR).join(format!("{}.json", db))
    }

    /// Load only the metadata store
    pub fn load_metadata(&self) -> Result<TableMetadataStore> {
        let file = self.read_metadata_file()?;
        let (tables, databases) = assemble(file);
        TableMetadataStore::new(tables, databases)
    }

    /// Load metadata and every database's records.
    ///
    /// Tables whose metadata declares no record count get the number of
    /// records actually loaded for them.
    pub async fn load(&self) -> Result<DataSet> {
        let file = self.read_metadata_file()?;
        let (mut tables, databases) = assemble(file);

        let mut per_table: HashMap<String, Vec<Record>> = tables
            .iter()
            .map(|t| (t.id.clone(), Vec::new()))
            .collect();

        for db in &databases {
            let path = self.records_path(&db.id);
            if !path.exists() {
                warn!("No records file for database '{}' at {}", db.id, path.display());
                continue;
            }
            let contents = fs::read_to_string(&path)?;
            let parsed: RecordsFile = serde_json::from_str(&contents).map_err(|e| {
                Error::Deserialization(format!("{}: {}", path.display(), e))
            })?;
            debug!("Read {} records for database '{}'", parsed.records.len(), db.id);

            let mut skipped = 0usize;
            for record in parsed.records {
                match per_table.get_mut(&record.table_key) {
                    Some(bucket) => bucket.push(record),
                    None => skipped += 1,
                }
            }
            if skipped > 0 {
                warn!(
                    "Skipped {} records of database '{}' with unknown table keys",
                    skipped, db.id
                );
            }
        }

        for table in &mut tables {
            if table.record_count == 0 {
                table.record_count = per_table.get(&table.id).map_or(0, Vec::len);
            }
        }

        let metadata = TableMetadataStore::new(tables, databases)?;
        let records = InMemoryRecordSource::new();
        let total: usize = per_table.values().map(Vec::len).sum();
        for (table, rows) in per_table {
            records.insert_table(table, rows).await;
        }

        info!(
            "Loaded {} tables in {} databases ({} records) from {}",
            metadata.len(),
            metadata.databases().len(),
            total,
            self.data_dir.display()
        );

        Ok(DataSet { metadata, records })
    }

    fn read_metadata_file(&self) -> Result<MetadataFile> {
        let path = self.metadata_path();
        let contents = fs::read_to_string(&path).map_err(|e| {
            Error::Configuration(format!("Cannot read {}: {}", path.display(), e))
        })?;
        parse_metadata_file(&contents)
            .map_err(|e| Error::Deserialization(format!("{}: {}", path.display(), e)))
    }
}

fn parse_metadata_file(contents: &str) -> std::result::Result<MetadataFile, serde_json::Error> {
    serde_json::from_str(contents)
}

/// Parse a `metadata.json` document into a metadata store
pub fn parse_metadata(contents: &str) -> Result<TableMetadataStore> {
    let file = parse_metadata_file(contents)?;
    let (tables, databases) = assemble(file);
    TableMetadataStore::new(tables, databases)
}

/// Turn the raw file into tables and databases.
///
/// Databases are ordered by key. A database without an explicit pagination
/// strategy is offset-addressed at even positions and cursor-addressed at odd
/// ones.
fn assemble(file: MetadataFile) -> (Vec<TableMetadata>, Vec<DatabaseInfo>) {
    let MetadataFile {
        metadata,
        mut database_config,
        mut database_assignments,
    } = file;

    let tables: Vec<TableMetadata> = metadata
        .into_iter()
        .map(|(key, mut table)| {
            if table.id.is_empty() {
                table.id = key;
            }
            table
        })
        .collect();

    let keys: BTreeSet<String> = database_config
        .keys()
        .chain(database_assignments.keys())
        .cloned()
        .collect();

    let databases = keys
        .into_iter()
        .enumerate()
        .map(|(idx, key)| {
            let config = database_config.remove(&key).unwrap_or_default();
            let strategy = config.pagination.unwrap_or(if idx % 2 == 0 {
                PaginationStrategy::Offset
            } else {
                PaginationStrategy::Cursor
            });
            let mut db = DatabaseInfo::new(
                key.clone(),
                config.name.unwrap_or_else(|| key.clone()),
                strategy,
            );
            db.description = config.description;
            db.table_keys = database_assignments.remove(&key).unwrap_or_default();
            db
        })
        .collect();

    (tables, databases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::RecordSource;
    use tempfile::TempDir;

    const METADATA: &str = r#"{
        "metadata": {
            "t_companies": {"name": "Companies", "year": 2021, "country": "Japan",
                "categories": ["Finance"], "recordCount": 3,
                "columns": [{"name": "company", "type": "org"}, {"name": "city", "type": "place"}]},
            "t_rivers": {"name": "Rivers", "country": "Mexico", "categories": ["Geography"],
                "columns": [{"name": "river", "type": "place"}]},
            "t_cities": {"name": "Cities", "columns": [{"name": "city"}]}
        },
        "databaseConfig": {
            "db_a": {"name": "Alpha", "description": "First"},
            "db_b": {"name": "Beta"},
            "db_c": {"name": "Gamma", "pagination": "offset"}
        },
        "databaseAssignments": {
            "db_a": ["t_companies", "t_rivers"],
            "db_b": ["t_cities"]
        }
    }"#;

    fn write_data_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(METADATA_FILE), METADATA).unwrap();
        fs::create_dir(dir.path().join(RECORDS_DIR)).unwrap();
        fs::write(
            dir.path().join(RECORDS_DIR).join("db_a.json"),
            r#"{"records": [
                {"tableKey": "t_companies", "company": "Apex Corp", "city": "Tokyo"},
                {"tableKey": "t_rivers", "river": "Bravo"},
                {"tableKey": "t_companies", "company": "Nova Inc", "city": null},
                {"tableKey": "t_rivers", "river": "Lerma"},
                {"tableKey": "t_ghost", "x": 1}
            ]}"#,
        )
        .unwrap();
        dir
    }

    #[test]
    fn test_parse_metadata() {
        let store = parse_metadata(METADATA).unwrap();
        assert_eq!(store.len(), 3);
        assert_eq!(store.table("t_rivers").unwrap().id, "t_rivers");

        let ids: Vec<_> = store.databases().iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["db_a", "db_b", "db_c"]);
        assert_eq!(store.database("db_a").unwrap().pagination, PaginationStrategy::Offset);
        assert_eq!(store.database("db_b").unwrap().pagination, PaginationStrategy::Cursor);
        assert_eq!(store.database("db_c").unwrap().pagination, PaginationStrategy::Offset);
        assert_eq!(
            store.database("db_a").unwrap().description.as_deref(),
            Some("First")
        );
        assert_eq!(store.strategy_for("t_cities").unwrap(), PaginationStrategy::Cursor);
    }

    #[test]
    fn test_parse_metadata_rejects_unknown_assignment() {
        let bad = r#"{"metadata": {}, "databaseAssignments": {"db": ["missing"]}}"#;
        assert!(matches!(parse_metadata(bad), Err(Error::Configuration(_))));
        assert!(matches!(parse_metadata("{not json"), Err(Error::Deserialization(_))));
    }

    #[tokio::test]
    async fn test_load_data_dir() {
        let dir = write_data_dir();
        let data = DataLoader::new(dir.path()).load().await.unwrap();

        assert_eq!(data.records.table_record_count("t_companies").await.unwrap(), 2);
        assert_eq!(data.records.table_record_count("t_cities").await.unwrap(), 0);
        assert!(data.records.table_record_count("t_ghost").await.is_err());

        let rivers = data.records.fetch_raw_page("t_rivers", 0, 10).await.unwrap();
        let names: Vec<_> = rivers
            .iter()
            .filter_map(|r| r.get("river").and_then(|v| v.as_str()))
            .collect();
        assert_eq!(names, vec!["Bravo", "Lerma"]);

        // declared count kept, missing count filled from the records
        assert_eq!(data.metadata.table("t_companies").unwrap().record_count, 3);
        assert_eq!(data.metadata.table("t_rivers").unwrap().record_count, 2);
    }

    #[tokio::test]
    async fn test_missing_metadata_file() {
        let dir = TempDir::new().unwrap();
        let result = DataLoader::new(dir.path()).load().await;
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
