use serde::{Serialize, Serializer};
use std::borrow::Cow;
use std::fmt;

pub const FALLBACK_SUMMARY: &str =
    "Automated analysis failed. A manual review is recommended.";
pub const FALLBACK_SUGGESTION: &str = "Please review the code changes manually.";
pub const UNKNOWN_ERROR: &str = "unknown error";

/// Longest error text carried into the fallback risk, in characters.
pub const MAX_ERROR_CHARS: usize = 500;

/// Cut `text` to at most `max_chars` characters, ending in `…` when cut.
pub fn clip(text: &str, max_chars: usize) -> Cow<'_, str> {
    if text.chars().count() <= max_chars {
        return Cow::Borrowed(text);
    }
    let mut clipped: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    clipped.push('…');
    Cow::Owned(clipped)
}

/// Severity of a risk raised by the review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

/// Area a risk belongs to. `System` is reserved for pipeline failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Security,
    Quality,
    Bug,
    Test,
    Performance,
    System,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Security => "security",
            Category::Quality => "quality",
            Category::Bug => "bug",
            Category::Test => "test",
            Category::Performance => "performance",
            Category::System => "system",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Required,
    Recommended,
    Optional,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Required => write!(f, "required"),
            Priority::Recommended => write!(f, "recommended"),
            Priority::Optional => write!(f, "optional"),
        }
    }
}

/// Overall score out of 10, or `N/A` when none could be given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rating {
    Score(u8),
    NotAvailable,
}

impl Rating {
    /// Accepts 1..=10; everything else is `NotAvailable`.
    pub fn from_score(score: i64) -> Self {
        match u8::try_from(score) {
            Ok(s @ 1..=10) => Rating::Score(s),
            _ => Rating::NotAvailable,
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rating::Score(score) => write!(f, "{score}"),
            Rating::NotAvailable => write!(f, "N/A"),
        }
    }
}

impl Serialize for Rating {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Risk {
    pub severity: Severity,
    pub category: Category,
    pub description: String,
    /// `file:line` when the model could point at one
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub priority: Priority,
    pub description: String,
    pub example: Option<String>,
}

/// Structured outcome of one review. Lists are empty rather than absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisResult {
    pub summary: String,
    pub risks: Vec<Risk>,
    pub suggestions: Vec<Suggestion>,
    pub positive_points: Vec<String>,
    pub overall_rating: Rating,
    /// Set only by [`AnalysisResult::fallback`].
    #[serde(skip)]
    pub fallback: bool,
}

impl AnalysisResult {
    /// Canonical result used whenever a live analysis could not be produced.
    pub fn fallback(error: Option<&str>) -> Self {
        let error = error
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .unwrap_or(UNKNOWN_ERROR);
        let error = clip(error, MAX_ERROR_CHARS);

        AnalysisResult {
            summary: FALLBACK_SUMMARY.to_string(),
            risks: vec![Risk {
                severity: Severity::Medium,
                category: Category::System,
                description: format!("Analysis error: {error}"),
                location: None,
            }],
            suggestions: vec![Suggestion {
                priority: Priority::Recommended,
                description: FALLBACK_SUGGESTION.to_string(),
                example: None,
            }],
            positive_points: Vec::new(),
            overall_rating: Rating::NotAvailable,
            fallback: true,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.fallback
    }
}
