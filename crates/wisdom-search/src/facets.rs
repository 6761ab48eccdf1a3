//! Facet filters and facet counts
//!
//! Counts are drill-down counts: they only cover records whose table passes
//! the current filters, so every count reflects what selecting that value
//! would actually leave.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use wisdom_core::{Record, TableMetadata, TableMetadataStore};

/// Facet selections sent by the caller
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetFilters {
    #[serde(default)]
    pub categories: Vec<String>,

    #[serde(default)]
    pub regions: Vec<String>,

    /// Display names or raw table keys
    #[serde(default)]
    pub table_names: Vec<String>,

    /// Years as strings; numbers are accepted on the wire
    #[serde(default, deserialize_with = "strings_or_numbers")]
    pub table_years: Vec<String>,

    /// Allow-list of table keys
    #[serde(default)]
    pub selected_tables: Vec<String>,
}

fn strings_or_numbers<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let values: Option<Vec<Value>> = Option::deserialize(deserializer)?;
    Ok(values
        .unwrap_or_default()
        .into_iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect())
}

impl FacetFilters {
    /// True when nothing is selected
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
            && self.regions.is_empty()
            && self.table_names.is_empty()
            && self.table_years.is_empty()
            && self.selected_tables.is_empty()
    }

    /// Case-normalized form used for matching
    pub fn normalize(&self) -> NormalizedFilters {
        NormalizedFilters {
            categories: self.categories.iter().map(|c| c.trim().to_lowercase()).collect(),
            regions: self.regions.iter().map(|r| r.trim().to_uppercase()).collect(),
            table_names: self.table_names.iter().map(|n| n.trim().to_lowercase()).collect(),
            years: self.table_years.iter().map(|y| y.trim().to_string()).collect(),
            selected: self.selected_tables.iter().cloned().collect(),
        }
    }
}

/// Filter sets with categories and names lower-cased, regions upper-cased and
/// years trimmed
#[derive(Debug, Clone, Default)]
pub struct NormalizedFilters {
    categories: HashSet<String>,
    regions: HashSet<String>,
    table_names: HashSet<String>,
    years: HashSet<String>,
    selected: HashSet<String>,
}

impl NormalizedFilters {
    /// Whether a table satisfies every non-empty filter set
    pub fn passes(&self, table: &TableMetadata) -> bool {
        if !self.selected.is_empty() && !self.selected.contains(&table.id) {
            return false;
        }
        if !self.categories.is_empty()
            && !table
                .categories
                .iter()
                .any(|c| self.categories.contains(&c.trim().to_lowercase()))
        {
            return false;
        }
        if !self.regions.is_empty() {
            let region = table.country.as_deref().map(|c| c.trim().to_uppercase());
            if !region.is_some_and(|r| self.regions.contains(&r)) {
                return false;
            }
        }
        if !self.table_names.is_empty()
            && !self.table_names.contains(&table.name.trim().to_lowercase())
            && !self.table_names.contains(&table.id.to_lowercase())
        {
            return false;
        }
        if !self.years.is_empty() && !self.years.contains(&table.year_label()) {
            return false;
        }
        true
    }
}

/// Value to count histograms per facet dimension
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetCounts {
    pub categories: BTreeMap<String, usize>,
    pub regions: BTreeMap<String, usize>,
    pub table_names: BTreeMap<String, usize>,
    pub table_years: BTreeMap<String, usize>,
}

impl FacetCounts {
    /// Count `weight` records of `table`
    pub fn add_table(&mut self, table: &TableMetadata, weight: usize) {
        if weight == 0 {
            return;
        }
        let distinct: BTreeSet<&str> = table.categories.iter().map(String::as_str).collect();
        for category in distinct {
            *self.categories.entry(category.to_string()).or_default() += weight;
        }
        if let Some(region) = &table.country {
            *self.regions.entry(region.clone()).or_default() += weight;
        }
        *self.table_names.entry(table.name.clone()).or_default() += weight;
        *self.table_years.entry(table.year_label()).or_default() += weight;
    }

    /// Add another histogram into this one
    pub fn merge(&mut self, other: &FacetCounts) {
        fn add(into: &mut BTreeMap<String, usize>, from: &BTreeMap<String, usize>) {
            for (k, v) in from {
                *into.entry(k.clone()).or_default() += v;
            }
        }
        add(&mut self.categories, &other.categories);
        add(&mut self.regions, &other.regions);
        add(&mut self.table_names, &other.table_names);
        add(&mut self.table_years, &other.table_years);
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
            && self.regions.is_empty()
            && self.table_names.is_empty()
            && self.table_years.is_empty()
    }
}

/// Count records whose table passes `filters`.
///
/// Records of tables missing from the store are ignored.
pub fn aggregate(
    records: &[Record],
    store: &TableMetadataStore,
    filters: &FacetFilters,
) -> FacetCounts {
    let normalized = filters.normalize();
    let mut counts = FacetCounts::default();
    for record in records {
        if let Some(table) = store.table(&record.table_key) {
            if normalized.passes(table) {
                counts.add_table(table, 1);
            }
        }
    }
    counts
}

/// Same histogram as `aggregate`, from per-table record counts instead of the
/// records themselves
pub fn aggregate_weighted<'a, I>(tables: I, filters: &FacetFilters) -> FacetCounts
where
    I: IntoIterator<Item = (&'a TableMetadata, usize)>,
{
    let normalized = filters.normalize();
    let mut counts = FacetCounts::default();
    for (table, weight) in tables {
        if normalized.passes(table) {
            counts.add_table(table, weight);
        }
    }
    counts
}
