//! Raw record sources
//!
//! A record source serves a table's raw records by position, regardless of
//! how the backing system addresses pages underneath.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use wisdom_core::{Error, Record, Result};

/// Trait for raw record backends
///
/// This abstraction allows for different implementations:
/// - In-memory (loaded from JSON files, and for testing)
/// - Future: remote databases
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Raw records `[start, start + count)` of a table; shorter at the end
    async fn fetch_raw_page(&self, table: &str, start: usize, count: usize) -> Result<Vec<Record>>;

    /// Number of raw records in a table
    async fn table_record_count(&self, table: &str) -> Result<usize>;
}

/// In-memory record source keeping each table's records in raw order
#[derive(Debug, Default)]
pub struct InMemoryRecordSource {
    tables: RwLock<HashMap<String, Arc<Vec<Record>>>>,
}

impl InMemoryRecordSource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Group records by their table key, keeping input order within a table
    pub fn from_records<I: IntoIterator<Item = Record>>(records: I) -> Self {
        let mut grouped: HashMap<String, Vec<Record>> = HashMap::new();
        for record in records {
            grouped
                .entry(record.table_key.clone())
                .or_default()
                .push(record);
        }
        Self {
            tables: RwLock::new(
                grouped
                    .into_iter()
                    .map(|(k, v)| (k, Arc::new(v)))
                    .collect(),
            ),
        }
    }

    /// Replace a table's records
    pub async fn insert_table<S: Into<String>>(&self, table: S, records: Vec<Record>) {
        let table = table.into();
        debug!("Loaded {} records into table '{}'", records.len(), table);
        self.tables.write().await.insert(table, Arc::new(records));
    }

    /// Known table keys, sorted
    pub async fn table_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.tables.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    async fn table(&self, table: &str) -> Result<Arc<Vec<Record>>> {
        self.tables
            .read()
            .await
            .get(table)
            .cloned()
            .ok_or_else(|| Error::UnknownTable(table.to_string()))
    }
}

#[async_trait]
impl RecordSource for InMemoryRecordSource {
    async fn fetch_raw_page(&self, table: &str, start: usize, count: usize) -> Result<Vec<Record>> {
        let records = self.table(table).await?;
        let start = start.min(records.len());
        let end = start.saturating_add(count).min(records.len());
        Ok(records[start..end].to_vec())
    }

    async fn table_record_count(&self, table: &str) -> Result<usize> {
        Ok(self.table(table).await?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wisdom_core::FieldValue;

    fn records(table: &str, n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| Record::new(table).with("n", i as i64))
            .collect()
    }

    #[tokio::test]
    async fn test_fetch_raw_page() {
        let source = InMemoryRecordSource::new();
        source.insert_table("t1", records("t1", 10)).await;

        let page = source.fetch_raw_page("t1", 3, 4).await.unwrap();
        assert_eq!(page.len(), 4);
        assert_eq!(page[0].get("n"), Some(&3i64.into()));

        assert_eq!(source.fetch_raw_page("t1", 8, 5).await.unwrap().len(), 2);
        assert!(source.fetch_raw_page("t1", 20, 5).await.unwrap().is_empty());
        assert_eq!(source.table_record_count("t1").await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_unknown_table() {
        let source = InMemoryRecordSource::new();
        assert!(matches!(
            source.fetch_raw_page("nope", 0, 5).await,
            Err(Error::UnknownTable(_))
        ));
        assert!(matches!(
            source.table_record_count("nope").await,
            Err(Error::UnknownTable(_))
        ));
    }

    #[tokio::test]
    async fn test_from_records_groups_in_order() {
        let mut mixed = records("a", 3);
        mixed.insert(1, Record::new("b").with("n", 99i64));
        let source = InMemoryRecordSource::from_records(mixed);

        assert_eq!(source.table_keys().await, vec!["a", "b"]);
        let a = source.fetch_raw_page("a", 0, 10).await.unwrap();
        let ns: Vec<_> = a.iter().filter_map(|r| r.get("n").cloned()).collect();
        assert_eq!(
            ns,
            vec![FieldValue::from(0i64), FieldValue::from(1i64), FieldValue::from(2i64)]
        );

        let shared: Arc<dyn RecordSource> = Arc::new(source);
        assert_eq!(shared.table_record_count("b").await.unwrap(), 1);
    }
}
