//! Wisdom Query Engine
//!
//! Provides the search query language and its evaluation.
//!
//! # Overview
//!
//! The query engine implements:
//! - A tokenizer for free-text queries with quoting and `AND`/`OR`/parentheses
//! - A permissive builder producing structured queries
//! - Explicit condition trees for visual editors
//! - Rendering structured queries back to text
//! - Term permutations
//! - Left-to-right query evaluation against records

pub mod display;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod permutation;
pub mod tree;

pub use display::{quote_term, to_query_string};
pub use evaluator::{matches, QueryEvaluator};
pub use lexer::{has_unclosed_quote, tokenize, Token, TokenKind};
pub use parser::{
    build, collect_terms, parse_query, validate, BoolOp, Clause, Operator, QueryElement,
    QueryInput, SubQuery,
};
pub use permutation::{
    expand, ParamSchema, PermutationId, PermutationMap, PermutationParams, PermutationRegistry,
    PermutationSpec,
};
pub use tree::{Condition, QueryGroup, QueryNode};
