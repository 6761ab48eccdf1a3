//! Query evaluation against records
//!
//! Queries fold strictly left to right with no operator precedence:
//! `a AND b OR c` is `(a AND b) OR c` and `a OR b AND c` is `(a OR b) AND c`.

use crate::parser::{BoolOp, QueryElement};
use crate::permutation::PermutationMap;
use wisdom_core::{FieldValue, Record, TableMetadataStore};

/// Clause with its variants lower-cased once up front
#[derive(Debug, Clone)]
struct CompiledClause {
    needles: Vec<String>,
    column_type: Option<String>,
}

impl CompiledClause {
    fn hits(&self, value: &FieldValue) -> bool {
        let Some(text) = value.search_text() else {
            return false;
        };
        let text = text.to_lowercase();
        self.needles.iter().any(|n| text.contains(n.as_str()))
    }
}

#[derive(Debug, Clone)]
enum Compiled {
    Clause(CompiledClause),
    Operator(BoolOp),
    SubQuery(Vec<Compiled>),
}

fn compile(elements: &[QueryElement], permutations: &PermutationMap) -> Vec<Compiled> {
    elements
        .iter()
        .map(|element| match element {
            QueryElement::Clause(clause) => {
                let needles = match permutations.get(&clause.value) {
                    Some(variants) if !variants.is_empty() => {
                        variants.iter().map(|v| v.to_lowercase()).collect()
                    }
                    _ => vec![clause.value.to_lowercase()],
                };
                Compiled::Clause(CompiledClause {
                    needles,
                    column_type: clause.column_type.clone(),
                })
            }
            QueryElement::Operator(op) => Compiled::Operator(op.operator),
            QueryElement::SubQuery(sub) => Compiled::SubQuery(compile(&sub.elements, permutations)),
        })
        .collect()
}

/// A query prepared for repeated evaluation.
///
/// Without table metadata, column-type restrictions are ignored and clauses
/// search every field. With metadata, a typed clause only searches the
/// record's columns of that type and never matches records of unknown tables.
#[derive(Debug, Clone)]
pub struct QueryEvaluator<'a> {
    query: Vec<Compiled>,
    metadata: Option<&'a TableMetadataStore>,
}

impl<'a> QueryEvaluator<'a> {
    pub fn new(elements: &[QueryElement], permutations: &PermutationMap) -> Self {
        Self {
            query: compile(elements, permutations),
            metadata: None,
        }
    }

    /// Enable column-type restrictions
    pub fn with_metadata(mut self, store: &'a TableMetadataStore) -> Self {
        self.metadata = Some(store);
        self
    }

    /// True when the query has no elements and matches everything
    pub fn is_empty(&self) -> bool {
        self.query.is_empty()
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.fold(&self.query, record)
    }

    /// Records that match, in input order
    pub fn filter<'r>(&self, records: &'r [Record]) -> Vec<&'r Record> {
        records.iter().filter(|r| self.matches(r)).collect()
    }

    fn fold(&self, elements: &[Compiled], record: &Record) -> bool {
        let mut result: Option<bool> = None;
        let mut pending: Option<BoolOp> = None;

        for element in elements {
            let value = match element {
                Compiled::Operator(op) => {
                    pending = Some(*op);
                    continue;
                }
                Compiled::Clause(clause) => self.clause_matches(clause, record),
                Compiled::SubQuery(inner) => self.fold(inner, record),
            };

            result = match result {
                None => Some(value),
                // Evaluable right after an evaluable: the new value is dropped
                Some(acc) => Some(pending.take().map_or(acc, |op| op.apply(acc, value))),
            };
        }

        result.unwrap_or(true)
    }

    fn clause_matches(&self, clause: &CompiledClause, record: &Record) -> bool {
        match (clause.column_type.as_deref(), self.metadata) {
            (Some(column_type), Some(store)) => {
                let Some(table) = store.table(&record.table_key) else {
                    return false;
                };
                table
                    .columns_of_type(column_type)
                    .into_iter()
                    .filter_map(|column| record.get(column))
                    .any(|value| clause.hits(value))
            }
            _ => record.values().any(|value| clause.hits(value)),
        }
    }
}

/// Evaluate a query against one record
pub fn matches(elements: &[QueryElement], record: &Record, permutations: &PermutationMap) -> bool {
    QueryEvaluator::new(elements, permutations).matches(record)
}
