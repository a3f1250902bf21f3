use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::types::{AnalyzerResult, Issue, Severity};

/// Keys consumed into typed fields; everything else lands in `details`
const KNOWN_KEYS: &[&str] = &["issues", "summary", "metrics", "severity"];

/// Turn a free-text provider response into an [`AnalyzerResult`]
///
/// `score_field` names the analyzer's own score key (e.g. `performance_score`).
/// Responses with no decodable JSON object keep the raw text as the summary.
pub fn parse_response(analyzer: &str, score_field: &str, response: &str) -> AnalyzerResult {
    let Some(object) = extract_json_object(response) else {
        warn!(analyzer, "Response contained no JSON object, keeping raw text");
        return AnalyzerResult {
            summary: response.trim().to_string(),
            ..AnalyzerResult::new(analyzer)
        };
    };

    let mut result = AnalyzerResult::new(analyzer);

    if let Some(Value::Array(items)) = object.get("issues") {
        result.issues = items.iter().filter_map(parse_issue).collect();
    }

    result.score = object.get(score_field).and_then(parse_score);
    result.quality_score = object.get("quality_score").and_then(parse_score);
    result.security_score = object.get("security_score").and_then(parse_score);
    result.severity = object
        .get("severity")
        .and_then(Value::as_str)
        .and_then(Severity::from_label);
    result.summary = object
        .get("summary")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if let Some(Value::Object(metrics)) = object.get("metrics") {
        result.metrics = metrics.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    }

    for (key, value) in &object {
        let consumed = KNOWN_KEYS.contains(&key.as_str())
            || key == score_field
            || key == "quality_score"
            || key == "security_score";
        if !consumed {
            result.details.insert(key.clone(), value.clone());
        }
    }

    debug!(analyzer, issues = result.issues.len(), "Parsed analyzer response");
    result
}

/// First `{` to last `}`; failing that, the first balanced object
fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end > start {
        if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&text[start..=end]) {
            return Some(map);
        }
    }

    let candidate = balanced_object(&text[start..])?;
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// The prefix of `text` (which starts with `{`) up to its matching `}`
fn balanced_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, byte) in text.bytes().enumerate() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match byte {
            b'\\' if in_string => escape_next = true,
            b'"' => in_string = !in_string,
            b'{' if !in_string => depth += 1,
            b'}' if !in_string => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_issue(value: &Value) -> Option<Issue> {
    let obj = value.as_object()?;
    let text = |key: &str| {
        obj.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    // performance reports "impact" instead of "severity"
    let severity = obj
        .get("severity")
        .or_else(|| obj.get("impact"))
        .and_then(Value::as_str)
        .map(Severity::parse)
        .unwrap_or(Severity::Info);

    Some(Issue {
        line: obj.get("line").and_then(parse_line),
        issue_type: text("type"),
        severity,
        message: text("message"),
        suggestion: text("suggestion"),
        analyzer: None,
    })
}

fn parse_line(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Accepts `7`, `7.5`, `"7"`, `"7/10"`; anything outside 1-10 is unknown
fn parse_score(value: &Value) -> Option<u8> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let head = s.trim().split('/').next()?.trim();
            head.parse::<f64>().ok()?
        }
        _ => return None,
    };
    let rounded = raw.round();
    (1.0..=10.0).contains(&rounded).then_some(rounded as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parses_wrapped_json() {
        let response = r#"Here is my analysis:
```json
{
  "severity": "high",
  "security_score": "4",
  "issues": [
    {"line": 12, "type": "sql_injection", "severity": "critical", "message": "Raw query", "suggestion": "Bind parameters"},
    {"line": "30", "type": "xss", "severity": "warning", "message": "Echo", "suggestion": "Escape"}
  ],
  "summary": "Two problems"
}
```
Let me know if you need more."#;

        let result = parse_response("security", "security_score", response);
        assert_eq!(result.issues.len(), 2);
        assert_eq!(result.issues[0].line, Some(12));
        assert_eq!(result.issues[0].severity, Severity::Critical);
        assert_eq!(result.issues[1].line, Some(30));
        assert_eq!(result.issues[1].severity, Severity::Medium);
        assert_eq!(result.security_score, Some(4));
        assert_eq!(result.severity, Some(Severity::High));
        assert_eq!(result.summary, "Two problems");
        assert!(result.error.is_none());
    }

    #[test]
    fn test_performance_impact_and_details() {
        let response = r#"{
            "performance_score": 6,
            "issues": [{"line": 3, "type": "n_plus_one", "impact": "high", "message": "Loop query", "suggestion": "Join"}],
            "optimizations": [{"description": "Cache", "impact": "20%"}],
            "summary": "ok"
        }"#;
        let result = parse_response("performance", "performance_score", response);
        assert_eq!(result.score, Some(6));
        assert_eq!(result.issues[0].severity, Severity::High);
        assert!(result.details.contains_key("optimizations"));
        assert!(!result.details.contains_key("performance_score"));
    }

    #[test]
    fn test_falls_back_to_balanced_object() {
        // the last brace belongs to trailing prose, so the greedy slice is invalid
        let response = r#"{"quality_score": 8, "issues": []} and see {this}"#;
        let result = parse_response("quality", "quality_score", response);
        assert_eq!(result.quality_score, Some(8));
        assert_eq!(result.score, Some(8));
    }

    #[test]
    fn test_unparseable_response_keeps_raw_text() {
        let result = parse_response("documentation", "documentation_score", "No JSON at all");
        assert!(result.issues.is_empty());
        assert_eq!(result.score, None);
        assert_eq!(result.summary, "No JSON at all");
    }

    #[test]
    fn test_score_parsing() {
        assert_eq!(parse_score(&Value::from(7)), Some(7));
        assert_eq!(parse_score(&Value::from("8/10")), Some(8));
        assert_eq!(parse_score(&Value::from("1-10 scale")), None);
        assert_eq!(parse_score(&Value::from("unknown")), None);
        assert_eq!(parse_score(&Value::from(42)), None);
    }

    #[test]
    fn test_balanced_object_respects_strings() {
        let text = r#"{"a": "}{", "b": {"c": 1}} trailing"#;
        assert_eq!(balanced_object(text), Some(r#"{"a": "}{", "b": {"c": 1}}"#));
    }
}
