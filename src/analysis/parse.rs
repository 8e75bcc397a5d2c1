use serde_json::{Map, Value};

use super::types::{AnalysisResult, Category, Priority, Rating, Risk, Severity, Suggestion};
use super::AnalysisError;

pub const NO_SUMMARY: &str = "No summary provided.";

/// Remove one optional markdown fence around the model output.
pub fn strip_code_fences(s: &str) -> &str {
    let trimmed = s.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let body = body.strip_suffix("```").unwrap_or(body);
    body.trim()
}

/// Decode model output into an [`AnalysisResult`].
///
/// The text must be a JSON object (optionally fenced). Individual fields are
/// not trusted: wrong types and unknown enum values fall back to defaults
/// instead of failing the whole analysis.
pub fn parse_analysis(text: &str) -> Result<AnalysisResult, AnalysisError> {
    let value: Value = serde_json::from_str(strip_code_fences(text))?;
    let Value::Object(object) = value else {
        return Err(AnalysisError::NotAnObject);
    };

    Ok(AnalysisResult {
        summary: non_empty_str(object.get("summary"))
            .unwrap_or(NO_SUMMARY)
            .to_string(),
        risks: entries(&object, "risks").filter_map(parse_risk).collect(),
        suggestions: entries(&object, "suggestions")
            .filter_map(parse_suggestion)
            .collect(),
        positive_points: object
            .get("positive_points")
            .and_then(Value::as_array)
            .map(|points| {
                points
                    .iter()
                    .filter_map(|p| non_empty_str(Some(p)))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default(),
        overall_rating: parse_rating(object.get("overall_rating")),
        fallback: false,
    })
}

fn entries<'a>(
    object: &'a Map<String, Value>,
    key: &str,
) -> impl Iterator<Item = &'a Map<String, Value>> {
    object
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn parse_risk(entry: &Map<String, Value>) -> Option<Risk> {
    let description = non_empty_str(entry.get("description"))?;
    Some(Risk {
        severity: parse_severity(non_empty_str(entry.get("severity"))),
        category: parse_category(non_empty_str(entry.get("category"))),
        description: description.to_string(),
        location: non_empty_str(entry.get("location")).map(str::to_string),
    })
}

fn parse_suggestion(entry: &Map<String, Value>) -> Option<Suggestion> {
    let description = non_empty_str(entry.get("description"))?;
    Some(Suggestion {
        priority: parse_priority(non_empty_str(entry.get("priority"))),
        description: description.to_string(),
        example: non_empty_str(entry.get("example")).map(str::to_string),
    })
}

fn parse_severity(raw: Option<&str>) -> Severity {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        Some("high" | "critical") => Severity::High,
        Some("medium" | "moderate") => Severity::Medium,
        _ => Severity::Low,
    }
}

fn parse_category(raw: Option<&str>) -> Category {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        Some("security") => Category::Security,
        Some("bug" | "bugs") => Category::Bug,
        Some("test" | "tests" | "testing") => Category::Test,
        Some("performance") => Category::Performance,
        Some("system") => Category::System,
        _ => Category::Quality,
    }
}

fn parse_priority(raw: Option<&str>) -> Priority {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        Some("required" | "must") => Priority::Required,
        Some("recommended") => Priority::Recommended,
        _ => Priority::Optional,
    }
}

/// Accepts `7`, `7.0`, `"7"`, `"7/10"` or `"7 points"`.
fn parse_rating(raw: Option<&Value>) -> Rating {
    match raw {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .map_or(Rating::NotAvailable, Rating::from_score),
        Some(Value::String(s)) => {
            let digits: String = s
                .trim()
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            digits
                .parse::<i64>()
                .map_or(Rating::NotAvailable, Rating::from_score)
        }
        _ => Rating::NotAvailable,
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
