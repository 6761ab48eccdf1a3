//! Render structured queries back to the search-box text form

use crate::parser::QueryElement;
use std::borrow::Cow;

/// Render a query as text that `parse_query` turns back into the same query.
///
/// Column-type restrictions have no text form and are dropped. Terms are
/// quoted when they contain whitespace, parentheses or commas, or when they
/// spell a reserved word. A comma inside a term comes back as a space, and
/// double quotes inside a term are removed.
pub fn to_query_string(elements: &[QueryElement]) -> String {
    let mut parts = Vec::with_capacity(elements.len());
    for element in elements {
        match element {
            QueryElement::Clause(clause) => parts.push(quote_term(&clause.value).into_owned()),
            QueryElement::Operator(op) => parts.push(op.operator.to_string()),
            QueryElement::SubQuery(sub) => {
                parts.push(format!("({})", to_query_string(&sub.elements)))
            }
        }
    }
    parts.join(" ")
}

/// Quote a term if the tokenizer would otherwise split or reinterpret it
pub fn quote_term(term: &str) -> Cow<'_, str> {
    if needs_quotes(term) {
        Cow::Owned(format!("\"{}\"", term.replace('"', "")))
    } else {
        Cow::Borrowed(term)
    }
}

fn needs_quotes(term: &str) -> bool {
    term.contains('"')
        || term
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '(' | ')' | ','))
        || term.eq_ignore_ascii_case("and")
        || term.eq_ignore_ascii_case("or")
}
