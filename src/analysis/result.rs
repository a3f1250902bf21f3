use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::analyzers::{AnalyzerResult, Issue, Severity};
use crate::constants::{DEFAULT_EXCLUDE_PATTERNS, DEFAULT_MAX_FILES};

/// Issue counts per severity bucket plus the best reported scores
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IssueSummary {
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
    pub quality_score: Option<u8>,
    pub security_score: Option<u8>,
}

impl IssueSummary {
    pub fn record(&mut self, severity: Severity) {
        self.total += 1;
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
            Severity::Info => self.info += 1,
        }
    }

    /// Keep the highest score any analyzer reported
    pub fn merge_scores(&mut self, result: &AnalyzerResult) {
        self.quality_score = max_score(self.quality_score, result.quality_score);
        self.security_score = max_score(self.security_score, result.security_score);
    }

    pub fn count(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
            Severity::Info => self.info,
        }
    }

    /// critical×10 + high×7 + medium×4 + low×1
    pub fn risk_score(&self) -> u32 {
        Severity::ALL
            .iter()
            .map(|severity| severity.risk_weight() * self.count(*severity) as u32)
            .sum()
    }
}

fn max_score(current: Option<u8>, candidate: Option<u8>) -> Option<u8> {
    match (current, candidate) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    VeryLow,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: u32) -> Self {
        match score {
            0 => RiskLevel::VeryLow,
            1..=5 => RiskLevel::Low,
            6..=15 => RiskLevel::Medium,
            16..=30 => RiskLevel::High,
            _ => RiskLevel::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::VeryLow => "very_low",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetrics {
    pub lines_analyzed: usize,
}

/// An analyzer that produced no usable result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerError {
    pub analyzer: String,
    pub message: String,
}

/// Merged output of every analyzer that ran for one snippet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub filename: String,
    pub analyzers: BTreeMap<String, AnalyzerResult>,
    pub issues: Vec<Issue>,
    pub summary: IssueSummary,
    pub risk_score: u32,
    pub risk_level: RiskLevel,
    pub metrics: AnalysisMetrics,
    pub execution_time_ms: u64,
    pub cached: bool,
    pub errors: Vec<AnalyzerError>,
    pub analyzed_at: DateTime<Utc>,
}

impl AnalysisResult {
    pub fn new(filename: impl Into<String>, code: &str) -> Self {
        Self {
            filename: filename.into(),
            analyzers: BTreeMap::new(),
            issues: Vec::new(),
            summary: IssueSummary::default(),
            risk_score: 0,
            risk_level: RiskLevel::VeryLow,
            metrics: AnalysisMetrics {
                lines_analyzed: code.matches('\n').count() + 1,
            },
            execution_time_ms: 0,
            cached: false,
            errors: Vec::new(),
            analyzed_at: Utc::now(),
        }
    }

    /// Fold one analyzer's output in. Issues keep execution order and are
    /// tagged with the analyzer name.
    pub fn merge(&mut self, result: AnalyzerResult) {
        if let Some(error) = &result.error {
            self.errors.push(AnalyzerError {
                analyzer: result.analyzer.clone(),
                message: error.clone(),
            });
        }

        for issue in &result.issues {
            let mut issue = issue.clone();
            issue.analyzer = Some(result.analyzer.clone());
            self.summary.record(issue.severity);
            self.issues.push(issue);
        }
        self.summary.merge_scores(&result);
        self.risk_score = self.summary.risk_score();
        self.risk_level = RiskLevel::from_score(self.risk_score);
        self.analyzers.insert(result.analyzer.clone(), result);
    }

    pub fn record_error(&mut self, analyzer: &str, message: impl Into<String>) {
        self.errors.push(AnalyzerError {
            analyzer: analyzer.to_string(),
            message: message.into(),
        });
    }

    pub fn is_successful(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_critical_issues(&self) -> bool {
        self.summary.critical > 0
    }

    pub fn issues_by_severity(&self, severity: Severity) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |issue| issue.severity == severity)
    }

    pub fn analyzer_names(&self) -> impl Iterator<Item = &str> {
        self.analyzers.keys().map(String::as_str)
    }
}

/// Knobs for [`CodeAnalyzer::analyze_directory`](super::CodeAnalyzer::analyze_directory)
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryOptions {
    pub recursive: bool,
    pub max_files: usize,
    /// Paths containing any of these substrings are skipped
    pub exclude_patterns: Vec<String>,
    /// Empty means the configured default set
    pub analyzers: Vec<String>,
    pub use_cache: bool,
}

impl Default for DirectoryOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            max_files: DEFAULT_MAX_FILES,
            exclude_patterns: DEFAULT_EXCLUDE_PATTERNS.iter().map(|s| s.to_string()).collect(),
            analyzers: Vec::new(),
            use_cache: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Analyzed { result: Box<AnalysisResult> },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryReport {
    pub directory: PathBuf,
    pub files_analyzed: usize,
    pub files_with_issues: usize,
    pub total_issues: usize,
    /// Keyed by path relative to `directory`
    pub files: BTreeMap<String, FileOutcome>,
    pub analyzed_at: DateTime<Utc>,
}

impl DirectoryReport {
    pub fn new(directory: PathBuf) -> Self {
        Self {
            directory,
            files_analyzed: 0,
            files_with_issues: 0,
            total_issues: 0,
            files: BTreeMap::new(),
            analyzed_at: Utc::now(),
        }
    }

    pub fn record(&mut self, relative: String, outcome: Result<AnalysisResult, String>) {
        let outcome = match outcome {
            Ok(result) => {
                self.files_analyzed += 1;
                if result.summary.total > 0 {
                    self.files_with_issues += 1;
                    self.total_issues += result.summary.total;
                }
                FileOutcome::Analyzed { result: Box::new(result) }
            }
            Err(error) => FileOutcome::Failed { error },
        };
        self.files.insert(relative, outcome);
    }

    pub fn failed_files(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().filter_map(|(path, outcome)| match outcome {
            FileOutcome::Failed { error } => Some((path.as_str(), error.as_str())),
            FileOutcome::Analyzed { .. } => None,
        })
    }

    pub fn has_critical_issues(&self) -> bool {
        self.files.values().any(|outcome| match outcome {
            FileOutcome::Analyzed { result } => result.has_critical_issues(),
            FileOutcome::Failed { .. } => false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(severity: Severity) -> Issue {
        Issue {
            line: None,
            issue_type: "t".to_string(),
            severity,
            message: "m".to_string(),
            suggestion: String::new(),
            analyzer: None,
        }
    }

    fn analyzer_result(name: &str, severities: &[Severity]) -> AnalyzerResult {
        let mut result = AnalyzerResult::new(name);
        result.issues = severities.iter().copied().map(issue).collect();
        result
    }

    #[test]
    fn test_risk_levels() {
        let mut result = AnalysisResult::new("a.php", "x");
        assert_eq!(result.risk_level, RiskLevel::VeryLow);

        result.merge(analyzer_result(
            "security",
            &[Severity::Critical, Severity::Medium, Severity::Medium],
        ));
        assert_eq!(result.risk_score, 18);
        assert_eq!(result.risk_level, RiskLevel::High);

        assert_eq!(RiskLevel::from_score(5), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(6), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(31), RiskLevel::Critical);
    }

    #[test]
    fn test_merge_tags_and_counts() {
        let mut result = AnalysisResult::new("a.php", "line1\nline2\n");
        result.merge(analyzer_result("security", &[Severity::High, Severity::Info]));
        result.merge(analyzer_result("quality", &[Severity::Low]));

        assert_eq!(result.metrics.lines_analyzed, 3);
        assert_eq!(result.issues.len(), 3);
        assert_eq!(result.issues[0].analyzer.as_deref(), Some("security"));
        assert_eq!(result.issues[2].analyzer.as_deref(), Some("quality"));

        let summary = &result.summary;
        assert_eq!(
            summary.critical + summary.high + summary.medium + summary.low + summary.info,
            summary.total
        );
        assert_eq!(result.issues_by_severity(Severity::High).count(), 1);
        assert_eq!(result.analyzer_names().collect::<Vec<_>>(), vec!["quality", "security"]);
    }

    #[test]
    fn test_scores_take_maximum() {
        let mut result = AnalysisResult::new("a.php", "x");
        let mut first = AnalyzerResult::new("security");
        first.security_score = Some(4);
        first.quality_score = Some(8);
        let mut second = AnalyzerResult::new("quality");
        second.quality_score = Some(6);

        result.merge(first);
        result.merge(second);
        assert_eq!(result.summary.quality_score, Some(8));
        assert_eq!(result.summary.security_score, Some(4));
    }

    #[test]
    fn test_failed_analyzer_is_recorded() {
        let mut result = AnalysisResult::new("a.php", "x");
        result.merge(AnalyzerResult::failed("performance", "timeout"));
        assert!(!result.is_successful());
        assert_eq!(result.errors[0].analyzer, "performance");
        assert!(result.analyzers.contains_key("performance"));
    }

    #[test]
    fn test_directory_report_counts() {
        let mut report = DirectoryReport::new(PathBuf::from("src"));
        let mut with_issue = AnalysisResult::new("a.php", "x");
        with_issue.merge(analyzer_result("security", &[Severity::Critical]));

        report.record("a.php".to_string(), Ok(with_issue));
        report.record("b.php".to_string(), Ok(AnalysisResult::new("b.php", "y")));
        report.record("c.php".to_string(), Err("unreadable".to_string()));

        assert_eq!(report.files_analyzed, 2);
        assert_eq!(report.files_with_issues, 1);
        assert_eq!(report.total_issues, 1);
        assert!(report.has_critical_issues());
        assert_eq!(report.failed_files().collect::<Vec<_>>(), vec![("c.php", "unreadable")]);
    }

    #[test]
    fn test_risk_level_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&RiskLevel::VeryLow).unwrap(), "\"very_low\"");
    }
}
