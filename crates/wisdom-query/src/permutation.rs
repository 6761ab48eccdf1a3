//! Term permutations
//!
//! A permutation turns one search term into the list of variants a clause
//! should match. Unknown permutation ids behave like `none`.

use crate::parser::{QueryElement, collect_terms};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;
use wisdom_core::{Error, Result};

/// Variant lists keyed by the original term
pub type PermutationMap = HashMap<String, Vec<String>>;

/// Free-form permutation parameters, e.g. `{"level": "high"}`
pub type PermutationParams = serde_json::Map<String, Value>;

/// Built-in permutation kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermutationId {
    None,
    Reverse,
    Double,
}

impl PermutationId {
    pub fn as_str(self) -> &'static str {
        match self {
            PermutationId::None => "none",
            PermutationId::Reverse => "reverse",
            PermutationId::Double => "double",
        }
    }

    pub fn parse(id: &str) -> Option<Self> {
        match id.trim().to_ascii_lowercase().as_str() {
            "none" => Some(PermutationId::None),
            "reverse" => Some(PermutationId::Reverse),
            "double" => Some(PermutationId::Double),
            _ => None,
        }
    }

    /// Variants of `term`, always starting with the term itself
    pub fn apply(self, term: &str, params: &PermutationParams) -> Vec<String> {
        match self {
            PermutationId::None => vec![term.to_string()],
            PermutationId::Reverse => {
                let reversed: String = term.chars().rev().collect();
                vec![term.to_string(), reversed]
            }
            PermutationId::Double => {
                let max = match params.get("level").and_then(Value::as_str) {
                    Some("medium") => 3,
                    Some("high") => 4,
                    _ => 2,
                };
                (1..=max).map(|n| term.repeat(n)).collect()
            }
        }
    }
}

impl fmt::Display for PermutationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tunable parameter of a permutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSchema {
    pub name: String,
    pub label: String,
    pub options: Vec<String>,
    pub default: String,
}

/// Descriptor of a registered permutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermutationSpec {
    pub id: PermutationId,
    pub label: String,
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<ParamSchema>,
}

/// Permutations offered to callers
#[derive(Debug, Clone)]
pub struct PermutationRegistry {
    specs: Vec<PermutationSpec>,
}

impl PermutationRegistry {
    /// Registry with nothing registered
    pub fn empty() -> Self {
        Self { specs: Vec::new() }
    }

    /// Registry with the built-in permutations
    pub fn builtin() -> Self {
        let specs = vec![
            PermutationSpec {
                id: PermutationId::None,
                label: "None".to_string(),
                description: "Match the term as typed".to_string(),
                parameters: Vec::new(),
            },
            PermutationSpec {
                id: PermutationId::Reverse,
                label: "Reverse".to_string(),
                description: "Also match the term spelled backwards".to_string(),
                parameters: Vec::new(),
            },
            PermutationSpec {
                id: PermutationId::Double,
                label: "Repeat".to_string(),
                description: "Also match the term repeated several times".to_string(),
                parameters: vec![ParamSchema {
                    name: "level".to_string(),
                    label: "Repetitions".to_string(),
                    options: vec!["low".to_string(), "medium".to_string(), "high".to_string()],
                    default: "low".to_string(),
                }],
            },
        ];
        Self { specs }
    }

    /// Register a permutation descriptor
    pub fn register(&mut self, spec: PermutationSpec) -> Result<()> {
        if self.specs.iter().any(|s| s.id == spec.id) {
            return Err(Error::Validation(format!(
                "Permutation '{}' already registered",
                spec.id
            )));
        }
        for param in &spec.parameters {
            if !param.options.contains(&param.default) {
                return Err(Error::Validation(format!(
                    "Parameter '{}' of '{}' defaults to '{}', which is not an option",
                    param.name, spec.id, param.default
                )));
            }
        }
        self.specs.push(spec);
        Ok(())
    }

    pub fn specs(&self) -> &[PermutationSpec] {
        &self.specs
    }

    pub fn get(&self, id: &str) -> Option<&PermutationSpec> {
        let id = PermutationId::parse(id)?;
        self.specs.iter().find(|s| s.id == id)
    }

    /// Variants of one term; unknown or unregistered ids yield `[term]`
    pub fn expand(&self, term: &str, id: &str, params: &PermutationParams) -> Vec<String> {
        match self.get(id) {
            Some(spec) => spec.id.apply(term, params),
            None => {
                debug!("Unknown permutation '{}', matching terms literally", id);
                vec![term.to_string()]
            }
        }
    }

    /// Variant map for a list of terms
    pub fn expand_terms<S: AsRef<str>>(
        &self,
        terms: &[S],
        id: &str,
        params: &PermutationParams,
    ) -> PermutationMap {
        terms
            .iter()
            .map(|t| {
                let t = t.as_ref();
                (t.to_string(), self.expand(t, id, params))
            })
            .collect()
    }

    /// Variant map covering every clause of a query
    pub fn expand_query(
        &self,
        elements: &[QueryElement],
        id: &str,
        params: &PermutationParams,
    ) -> PermutationMap {
        self.expand_terms(&collect_terms(elements), id, params)
    }
}

impl Default for PermutationRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Variants of `term` under the built-in permutation `id`
pub fn expand(term: &str, id: &str, params: &PermutationParams) -> Vec<String> {
    match PermutationId::parse(id) {
        Some(p) => p.apply(term, params),
        None => {
            debug!("Unknown permutation '{}', matching terms literally", id);
            vec![term.to_string()]
        }
    }
}
