//! Explicit condition trees, as built by a visual query editor
//!
//! Each child of a group may override the connector that joins it to its
//! previous sibling. Flattening a group wraps everything accumulated so far
//! into a sub-query whenever that connector changes, so the left-to-right
//! fold of the result reads the way the tree was drawn.

use crate::parser::{BoolOp, Clause, QueryElement};
use serde::{Deserialize, Serialize};

/// A leaf condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub value: String,

    #[serde(default)]
    pub column_type: Option<String>,

    /// Connector to the previous sibling; defaults to the group's operator
    #[serde(default)]
    pub join: Option<BoolOp>,
}

impl Condition {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self {
            value: value.into(),
            column_type: None,
            join: None,
        }
    }

    pub fn column_type<S: Into<String>>(mut self, column_type: S) -> Self {
        self.column_type = Some(column_type.into());
        self
    }

    pub fn join(mut self, op: BoolOp) -> Self {
        self.join = Some(op);
        self
    }
}

/// A group of conditions and nested groups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryGroup {
    /// Default connector between children
    pub operator: BoolOp,

    #[serde(default)]
    pub children: Vec<QueryNode>,

    /// Connector to the previous sibling when nested
    #[serde(default)]
    pub join: Option<BoolOp>,
}

/// Node of a condition tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum QueryNode {
    Condition(Condition),
    Group(QueryGroup),
}

impl QueryNode {
    fn join(&self) -> Option<BoolOp> {
        match self {
            QueryNode::Condition(c) => c.join,
            QueryNode::Group(g) => g.join,
        }
    }
}

impl From<Condition> for QueryNode {
    fn from(condition: Condition) -> Self {
        QueryNode::Condition(condition)
    }
}

impl From<QueryGroup> for QueryNode {
    fn from(group: QueryGroup) -> Self {
        QueryNode::Group(group)
    }
}

impl QueryGroup {
    pub fn new(operator: BoolOp) -> Self {
        Self {
            operator,
            children: Vec::new(),
            join: None,
        }
    }

    /// Builder: append a child
    pub fn child<N: Into<QueryNode>>(mut self, node: N) -> Self {
        self.children.push(node.into());
        self
    }

    /// Builder: set the connector to the previous sibling
    pub fn join(mut self, op: BoolOp) -> Self {
        self.join = Some(op);
        self
    }

    /// Flatten the tree into a structured query.
    ///
    /// Empty nested groups are skipped, and the first child's connector is
    /// ignored.
    pub fn to_elements(&self) -> Vec<QueryElement> {
        let mut acc: Vec<QueryElement> = Vec::new();
        let mut acc_op: Option<BoolOp> = None;

        for child in &self.children {
            let element = match child {
                QueryNode::Condition(c) => QueryElement::Clause(Clause {
                    value: c.value.clone(),
                    column_type: c.column_type.clone(),
                }),
                QueryNode::Group(g) => {
                    let inner = g.to_elements();
                    if inner.is_empty() {
                        continue;
                    }
                    QueryElement::sub_query(inner)
                }
            };

            if acc.is_empty() {
                acc.push(element);
                continue;
            }

            let op = child.join().unwrap_or(self.operator);
            if acc_op.is_some_and(|prev| prev != op) {
                acc = vec![QueryElement::sub_query(acc)];
            }
            acc.push(QueryElement::op(op));
            acc.push(element);
            acc_op = Some(op);
        }

        acc
    }

    /// Rebuild a tree from a structured query, e.g. to reopen it in an editor
    pub fn from_elements(elements: &[QueryElement]) -> Self {
        let operator = elements
            .iter()
            .find_map(|e| match e {
                QueryElement::Operator(op) => Some(op.operator),
                _ => None,
            })
            .unwrap_or(BoolOp::And);

        let mut group = QueryGroup::new(operator);
        let mut pending: Option<BoolOp> = None;
        for element in elements {
            let mut node: QueryNode = match element {
                QueryElement::Operator(op) => {
                    pending = Some(op.operator);
                    continue;
                }
                QueryElement::Clause(c) => QueryNode::Condition(Condition {
                    value: c.value.clone(),
                    column_type: c.column_type.clone(),
                    join: None,
                }),
                QueryElement::SubQuery(sub) => {
                    QueryNode::Group(QueryGroup::from_elements(&sub.elements))
                }
            };
            let join = pending.take().filter(|op| *op != operator);
            match &mut node {
                QueryNode::Condition(c) => c.join = join,
                QueryNode::Group(g) => g.join = join,
            }
            group.children.push(node);
        }
        group
    }
}
