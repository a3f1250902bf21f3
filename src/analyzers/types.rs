use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Normalized issue severity, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
    ];

    /// Map the vocabularies providers actually use onto the five levels
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "info" | "information" | "informational" | "note" | "notice" => Some(Self::Info),
            "low" | "minor" => Some(Self::Low),
            "medium" | "moderate" | "warning" | "warn" => Some(Self::Medium),
            "high" | "major" | "severe" => Some(Self::High),
            "critical" | "error" | "blocker" => Some(Self::Critical),
            _ => None,
        }
    }

    /// Like [`Severity::from_label`], but unknown labels become `Info`
    pub fn parse(label: &str) -> Self {
        Self::from_label(label).unwrap_or(Self::Info)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Contribution to the aggregate risk score
    pub fn risk_weight(&self) -> u32 {
        match self {
            Self::Critical => 10,
            Self::High => 7,
            Self::Medium => 4,
            Self::Low => 1,
            Self::Info => 0,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single finding reported by an analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(rename = "type", default)]
    pub issue_type: String,
    pub severity: Severity,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub suggestion: String,
    /// Set by the coordinator when issues are merged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<String>,
}

/// Parsed output of one analyzer for one piece of code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerResult {
    pub analyzer: String,
    #[serde(default)]
    pub issues: Vec<Issue>,
    /// The analyzer's own 1-10 score (performance_score, documentation_score, ...)
    #[serde(default)]
    pub score: Option<u8>,
    #[serde(default)]
    pub quality_score: Option<u8>,
    #[serde(default)]
    pub security_score: Option<u8>,
    /// Overall severity, when the analyzer reports one
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub metrics: BTreeMap<String, Value>,
    /// Analyzer-specific extras (optimizations, coverage, suggestions)
    #[serde(default)]
    pub details: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalyzerResult {
    pub fn new(analyzer: impl Into<String>) -> Self {
        Self {
            analyzer: analyzer.into(),
            issues: Vec::new(),
            score: None,
            quality_score: None,
            security_score: None,
            severity: None,
            summary: String::new(),
            metrics: BTreeMap::new(),
            details: BTreeMap::new(),
            error: None,
        }
    }

    /// A result that carries only an error and no issues
    pub fn failed(analyzer: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(analyzer)
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_vocabulary() {
        assert_eq!(Severity::parse("warning"), Severity::Medium);
        assert_eq!(Severity::parse("ERROR"), Severity::Critical);
        assert_eq!(Severity::parse(" High "), Severity::High);
        assert_eq!(Severity::parse("unknown"), Severity::Info);
        assert_eq!(Severity::from_label("unknown"), None);
        assert!(Severity::Critical > Severity::Low);
    }

    #[test]
    fn test_issue_serializes_type_field() {
        let issue = Issue {
            line: Some(3),
            issue_type: "sql_injection".to_string(),
            severity: Severity::High,
            message: "m".to_string(),
            suggestion: "s".to_string(),
            analyzer: None,
        };
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["type"], "sql_injection");
        assert_eq!(json["severity"], "high");
        assert!(json.get("analyzer").is_none());
    }

    #[test]
    fn test_failed_result() {
        let result = AnalyzerResult::failed("security", "boom");
        assert!(result.is_error());
        assert!(result.issues.is_empty());
        assert_eq!(result.score, None);
    }
}
