//! Structured query representation and the token-stream builder
//!
//! A query is a flat sequence of `QueryElement`s that alternates evaluables
//! (clauses and sub-queries) with operators. The serde layout of these types
//! is the persisted/URL wire format:
//!
//! ```json
//! [{"type": "clause", "content": {"value": "apex", "bdt": null}},
//!  {"type": "operator", "content": {"operator": "AND"}},
//!  {"type": "subQuery", "content": {"elements": [...]}}]
//! ```

use crate::lexer::{tokenize, Token};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::debug;
use wisdom_core::{Error, Result};

/// Boolean connective between two evaluables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoolOp {
    #[serde(rename = "AND", alias = "and")]
    And,
    #[serde(rename = "OR", alias = "or")]
    Or,
}

impl BoolOp {
    /// Lowercase keyword form used by tokens
    pub fn keyword(self) -> &'static str {
        match self {
            BoolOp::And => "and",
            BoolOp::Or => "or",
        }
    }

    /// Apply the connective
    pub fn apply(self, left: bool, right: bool) -> bool {
        match self {
            BoolOp::And => left && right,
            BoolOp::Or => left || right,
        }
    }
}

impl fmt::Display for BoolOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoolOp::And => f.write_str("AND"),
            BoolOp::Or => f.write_str("OR"),
        }
    }
}

/// A single search term with an optional column-category restriction
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Clause {
    pub value: String,

    /// Column category to search; `None` searches every field
    #[serde(rename = "bdt", alias = "columnType", default)]
    pub column_type: Option<String>,
}

impl Clause {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self {
            value: value.into(),
            column_type: None,
        }
    }

    pub fn typed<S: Into<String>, T: Into<String>>(value: S, column_type: T) -> Self {
        Self {
            value: value.into(),
            column_type: Some(column_type.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Operator {
    pub operator: BoolOp,
}

/// A parenthesized nested query, folded independently
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubQuery {
    #[serde(default)]
    pub elements: Vec<QueryElement>,
}

/// One element of a structured query
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "camelCase")]
pub enum QueryElement {
    Clause(Clause),
    Operator(Operator),
    SubQuery(SubQuery),
}

impl QueryElement {
    /// Clause searching every field
    pub fn clause<S: Into<String>>(value: S) -> Self {
        QueryElement::Clause(Clause::new(value))
    }

    /// Clause restricted to a column category
    pub fn typed_clause<S: Into<String>, T: Into<String>>(value: S, column_type: T) -> Self {
        QueryElement::Clause(Clause::typed(value, column_type))
    }

    pub fn op(operator: BoolOp) -> Self {
        QueryElement::Operator(Operator { operator })
    }

    pub fn and() -> Self {
        Self::op(BoolOp::And)
    }

    pub fn or() -> Self {
        Self::op(BoolOp::Or)
    }

    pub fn sub_query(elements: Vec<QueryElement>) -> Self {
        QueryElement::SubQuery(SubQuery { elements })
    }

    /// True for clauses and sub-queries
    pub fn is_evaluable(&self) -> bool {
        !matches!(self, QueryElement::Operator(_))
    }
}

/// Query as submitted by a caller: free text or an already-structured query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryInput {
    Text(String),
    Elements(Vec<QueryElement>),
}

impl QueryInput {
    /// Normalize to the structured form evaluated by the engine
    pub fn into_elements(self) -> Vec<QueryElement> {
        match self {
            QueryInput::Text(text) => parse_query(&text),
            QueryInput::Elements(elements) => elements,
        }
    }
}

impl From<&str> for QueryInput {
    fn from(text: &str) -> Self {
        QueryInput::Text(text.to_string())
    }
}

impl From<Vec<QueryElement>> for QueryInput {
    fn from(elements: Vec<QueryElement>) -> Self {
        QueryInput::Elements(elements)
    }
}

/// An open parenthesis group while building
#[derive(Debug, Default)]
struct Group {
    elements: Vec<QueryElement>,
    staged: Option<BoolOp>,
}

impl Group {
    /// Append an evaluable, joining it with the staged operator.
    ///
    /// Adjacent evaluables with no keyword between them are joined with AND so
    /// the output always alternates evaluables and operators.
    fn push_evaluable(&mut self, element: QueryElement) {
        let staged = self.staged.take();
        if !self.elements.is_empty() {
            self.elements
                .push(QueryElement::op(staged.unwrap_or(BoolOp::And)));
        }
        self.elements.push(element);
    }

    fn close_into(self, parent: &mut Group) {
        if self.elements.is_empty() {
            return;
        }
        parent.push_evaluable(QueryElement::sub_query(self.elements));
    }
}

/// Build a structured query from a token stream.
///
/// Recovery rules: a keyword with nothing before it in its group, or nothing
/// after it, is dropped; consecutive keywords keep the last one; a `)` with no
/// open group is ignored; groups still open at the end are closed; empty
/// groups vanish.
pub fn build(tokens: &[Token]) -> Vec<QueryElement> {
    let mut stack = vec![Group::default()];

    for token in tokens {
        if let Some(op) = token.as_operator() {
            if let Some(top) = stack.last_mut() {
                top.staged = Some(op);
            }
        } else if token.is_open_paren() {
            stack.push(Group::default());
        } else if token.is_close_paren() {
            if stack.len() == 1 {
                debug!("Ignoring unmatched ')' in query");
                continue;
            }
            close_top(&mut stack);
        } else if let Some(top) = stack.last_mut() {
            top.push_evaluable(QueryElement::clause(token.value.clone()));
        }
    }

    if stack.len() > 1 {
        debug!("Closing {} unbalanced '(' at end of query", stack.len() - 1);
    }
    while stack.len() > 1 {
        close_top(&mut stack);
    }

    stack.pop().map(|g| g.elements).unwrap_or_default()
}

/// Pop the innermost group and attach it to its parent
fn close_top(stack: &mut Vec<Group>) {
    if let Some(group) = stack.pop() {
        if let Some(parent) = stack.last_mut() {
            group.close_into(parent);
        }
    }
}

/// Tokenize and build a free-text query
pub fn parse_query(input: &str) -> Vec<QueryElement> {
    build(&tokenize(input))
}

/// Check that a query alternates evaluables and operators, starting and
/// ending on an evaluable, at every nesting level.
pub fn validate(elements: &[QueryElement]) -> Result<()> {
    validate_level(elements, 0)
}

fn validate_level(elements: &[QueryElement], depth: usize) -> Result<()> {
    for (i, element) in elements.iter().enumerate() {
        let expect_evaluable = i % 2 == 0;
        match element {
            QueryElement::Operator(op) if expect_evaluable => {
                let what = if i == 0 { "leading" } else { "consecutive" };
                return Err(Error::MalformedQuery(format!(
                    "{} operator {} at position {} (depth {})",
                    what, op.operator, i, depth
                )));
            }
            QueryElement::Operator(_) => {}
            _ if !expect_evaluable => {
                return Err(Error::MalformedQuery(format!(
                    "missing operator before position {} (depth {})",
                    i, depth
                )));
            }
            QueryElement::SubQuery(sub) => validate_level(&sub.elements, depth + 1)?,
            QueryElement::Clause(_) => {}
        }
    }
    if matches!(elements.last(), Some(QueryElement::Operator(_))) {
        return Err(Error::MalformedQuery(format!(
            "trailing operator (depth {})",
            depth
        )));
    }
    Ok(())
}

/// Distinct clause values in order of first appearance
pub fn collect_terms(elements: &[QueryElement]) -> Vec<String> {
    fn walk(elements: &[QueryElement], seen: &mut HashSet<String>, out: &mut Vec<String>) {
        for element in elements {
            match element {
                QueryElement::Clause(c) => {
                    if seen.insert(c.value.clone()) {
                        out.push(c.value.clone());
                    }
                }
                QueryElement::SubQuery(sub) => walk(&sub.elements, seen, out),
                QueryElement::Operator(_) => {}
            }
        }
    }

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    walk(elements, &mut seen, &mut out);
    out
}
