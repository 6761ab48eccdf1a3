//! Table and database metadata
//!
//! `TableMetadataStore` is built once at process start and shared read-only by
//! every component that needs table labels, column categories or the
//! pagination strategy of a table's source.

use crate::error::{Error, Result};
use crate::pagination::PaginationStrategy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::warn;

/// A declared column of a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    /// Column name as it appears in records
    pub name: String,

    /// Column category ("bdt"); clauses may be restricted to one category
    #[serde(rename = "type", default)]
    pub column_type: Option<String>,
}

impl ColumnMeta {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            column_type: None,
        }
    }

    pub fn typed<S: Into<String>, T: Into<String>>(name: S, column_type: T) -> Self {
        Self {
            name: name.into(),
            column_type: Some(column_type.into()),
        }
    }
}

/// Descriptive metadata of one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableMetadata {
    /// Table identifier; filled from the metadata key when absent
    #[serde(default)]
    pub id: String,

    /// Display name
    pub name: String,

    #[serde(default)]
    pub year: Option<i32>,

    /// Region the table describes
    #[serde(default)]
    pub country: Option<String>,

    #[serde(default)]
    pub categories: Vec<String>,

    #[serde(default)]
    pub columns: Vec<ColumnMeta>,

    /// Number of raw records, as declared by the metadata source
    #[serde(default)]
    pub record_count: usize,
}

impl TableMetadata {
    /// Create metadata with only an id and display name
    pub fn new<I: Into<String>, N: Into<String>>(id: I, name: N) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            year: None,
            country: None,
            categories: Vec::new(),
            columns: Vec::new(),
            record_count: 0,
        }
    }

    /// Builder: set the year
    pub fn year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Builder: set the region
    pub fn country<S: Into<String>>(mut self, country: S) -> Self {
        self.country = Some(country.into());
        self
    }

    /// Builder: add a category
    pub fn category<S: Into<String>>(mut self, category: S) -> Self {
        self.categories.push(category.into());
        self
    }

    /// Builder: add a column
    pub fn column(mut self, column: ColumnMeta) -> Self {
        self.columns.push(column);
        self
    }

    /// Builder: set the declared record count
    pub fn record_count(mut self, count: usize) -> Self {
        self.record_count = count;
        self
    }

    /// Column names in declaration order
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Names of the columns declared under `column_type`
    pub fn columns_of_type(&self, column_type: &str) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.column_type.as_deref() == Some(column_type))
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Year as a facet key
    pub fn year_label(&self) -> String {
        self.year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// A database groups tables served by one backing source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseInfo {
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Tables assigned to this database, in display order
    #[serde(default)]
    pub table_keys: Vec<String>,

    /// Pagination strategy of the backing source
    pub pagination: PaginationStrategy,
}

impl DatabaseInfo {
    pub fn new<I: Into<String>, N: Into<String>>(
        id: I,
        name: N,
        pagination: PaginationStrategy,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            table_keys: Vec::new(),
            pagination,
        }
    }

    /// Builder: assign tables
    pub fn tables<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.table_keys.extend(keys.into_iter().map(Into::into));
        self
    }
}

/// Read-only registry of every table and database known to the process
#[derive(Debug, Clone, Default)]
pub struct TableMetadataStore {
    /// Tables by id
    tables: BTreeMap<String, TableMetadata>,

    /// Databases in configuration order
    databases: Vec<DatabaseInfo>,

    /// Table id to index of its owning database
    owners: HashMap<String, usize>,
}

impl TableMetadataStore {
    /// Build a store, checking that every assigned table exists
    pub fn new<I>(tables: I, databases: Vec<DatabaseInfo>) -> Result<Self>
    where
        I: IntoIterator<Item = TableMetadata>,
    {
        let tables: BTreeMap<String, TableMetadata> =
            tables.into_iter().map(|t| (t.id.clone(), t)).collect();

        let mut owners = HashMap::new();
        let mut seen_dbs = BTreeSet::new();
        for (idx, db) in databases.iter().enumerate() {
            if !seen_dbs.insert(db.id.as_str()) {
                return Err(Error::Configuration(format!(
                    "Database '{}' declared twice",
                    db.id
                )));
            }
            for key in &db.table_keys {
                if !tables.contains_key(key) {
                    return Err(Error::Configuration(format!(
                        "Database '{}' assigns unknown table '{}'",
                        db.id, key
                    )));
                }
                if owners.contains_key(key) {
                    warn!("Table '{}' assigned to several databases; keeping the first", key);
                    continue;
                }
                owners.insert(key.clone(), idx);
            }
        }

        Ok(Self {
            tables,
            databases,
            owners,
        })
    }

    /// Get table metadata
    pub fn table(&self, id: &str) -> Option<&TableMetadata> {
        self.tables.get(id)
    }

    /// Get table metadata or fail with `UnknownTable`
    pub fn require_table(&self, id: &str) -> Result<&TableMetadata> {
        self.table(id)
            .ok_or_else(|| Error::UnknownTable(id.to_string()))
    }

    /// All tables ordered by id
    pub fn tables(&self) -> impl Iterator<Item = &TableMetadata> {
        self.tables.values()
    }

    /// Get a database
    pub fn database(&self, id: &str) -> Option<&DatabaseInfo> {
        self.databases.iter().find(|db| db.id == id)
    }

    /// Get a database or fail with `UnknownDatabase`
    pub fn require_database(&self, id: &str) -> Result<&DatabaseInfo> {
        self.database(id)
            .ok_or_else(|| Error::UnknownDatabase(id.to_string()))
    }

    /// All databases in configuration order
    pub fn databases(&self) -> &[DatabaseInfo] {
        &self.databases
    }

    /// Tables assigned to a database, in assignment order
    pub fn tables_in(&self, db: &str) -> Result<Vec<&TableMetadata>> {
        let db = self.require_database(db)?;
        Ok(db
            .table_keys
            .iter()
            .filter_map(|key| self.tables.get(key))
            .collect())
    }

    /// The database that owns a table
    pub fn owning_database(&self, table: &str) -> Option<&DatabaseInfo> {
        self.owners.get(table).map(|idx| &self.databases[*idx])
    }

    /// Pagination strategy of a table's source
    pub fn strategy_for(&self, table: &str) -> Result<PaginationStrategy> {
        self.require_table(table)?;
        self.owning_database(table)
            .map(|db| db.pagination)
            .ok_or_else(|| {
                Error::Configuration(format!("Table '{}' is not assigned to a database", table))
            })
    }

    /// Sorted distinct column categories across all tables
    pub fn column_types(&self) -> Vec<String> {
        let types: BTreeSet<&str> = self
            .tables
            .values()
            .flat_map(|t| t.columns.iter())
            .filter_map(|c| c.column_type.as_deref())
            .collect();
        types.into_iter().map(str::to_string).collect()
    }

    /// Number of tables
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
