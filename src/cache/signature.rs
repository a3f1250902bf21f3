use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::constants::SIGNATURE_MAX_VARIABLES;

static FUNCTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)function\s+(\w+)\s*\(").expect("function pattern is valid"));
static CLASS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)class\s+(\w+)").expect("class pattern is valid"));
static VARIABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$(\w+)").expect("variable pattern is valid"));

const FUNCTION_WEIGHT: f64 = 0.4;
const CLASS_WEIGHT: f64 = 0.3;
const VARIABLE_WEIGHT: f64 = 0.2;
const METRICS_WEIGHT: f64 = 0.1;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureMetrics {
    pub lines: usize,
    pub chars: usize,
    /// Occurrences of `if`, `for` and `while` anywhere in the text
    pub complexity_estimate: usize,
}

/// Identifiers and size metrics used to spot near-duplicate code
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSignature {
    pub functions: Vec<String>,
    pub classes: Vec<String>,
    /// First occurrences only, deduplicated
    pub variables: Vec<String>,
    pub metrics: SignatureMetrics,
}

impl CodeSignature {
    pub fn extract(code: &str) -> Self {
        let functions = unique(FUNCTION_RE.captures_iter(code).map(|c| c[1].to_string()));
        let classes = unique(CLASS_RE.captures_iter(code).map(|c| c[1].to_string()));
        // cap before dedup: the first N occurrences, not the first N names
        let variables = unique(
            VARIABLE_RE
                .captures_iter(code)
                .take(SIGNATURE_MAX_VARIABLES)
                .map(|c| c[1].to_string()),
        );

        let metrics = SignatureMetrics {
            lines: code.matches('\n').count() + 1,
            chars: code.len(),
            complexity_estimate: code.matches("if").count()
                + code.matches("for").count()
                + code.matches("while").count(),
        };

        Self {
            functions,
            classes,
            variables,
            metrics,
        }
    }

    /// Weighted similarity in `0.0..=1.0`
    pub fn similarity(&self, other: &CodeSignature) -> f64 {
        FUNCTION_WEIGHT * jaccard(&self.functions, &other.functions)
            + CLASS_WEIGHT * jaccard(&self.classes, &other.classes)
            + VARIABLE_WEIGHT * jaccard(&self.variables, &other.variables)
            + METRICS_WEIGHT * metrics_closeness(&self.metrics, &other.metrics)
    }
}

fn unique(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items.filter(|item| seen.insert(item.clone())).collect()
}

/// Jaccard index; two empty sets are identical, one empty set shares nothing
fn jaccard(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let a: HashSet<&String> = a.iter().collect();
    let b: HashSet<&String> = b.iter().collect();
    let union = a.union(&b).count();
    if union == 0 {
        0.0
    } else {
        a.intersection(&b).count() as f64 / union as f64
    }
}

fn closeness(a: usize, b: usize) -> f64 {
    match (a, b) {
        (0, 0) => 1.0,
        (0, _) | (_, 0) => 0.0,
        (a, b) => 1.0 - a.abs_diff(b) as f64 / a.max(b) as f64,
    }
}

fn metrics_closeness(a: &SignatureMetrics, b: &SignatureMetrics) -> f64 {
    (closeness(a.lines, b.lines)
        + closeness(a.chars, b.chars)
        + closeness(a.complexity_estimate, b.complexity_estimate))
        / 3.0
}
