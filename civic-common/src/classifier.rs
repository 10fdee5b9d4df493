//! Keyword-based issue triage
//!
//! Routes a free-text civic issue to a municipal department by counting how
//! many of each department's configured keywords appear as whole words in the
//! text. The result carries a confidence score and a manual-review flag.
//!
//! # Scoring
//!
//! - Text is lowercased and split into maximal runs of letters, digits and
//!   underscore; duplicates collapse into a set. Combining marks and
//!   connector punctuation other than `_` end a token.
//! - A keyword matches only when it equals one of those tokens, so a
//!   multi-word keyword such as `"power outage"` never matches.
//! - Raw confidence is `matches / keyword_count` for every department with at
//!   least one match.
//! - The highest raw confidence wins. Ties go to the lowest department id.
//! - `needs_review` is decided on the raw score (`< 0.3`), then scores of
//!   `0.5` or more are boosted by `0.2` (capped at `1.0`).
//!
//! A classifier is a snapshot: department changes require a new instance.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[cfg(feature = "sqlx")]
use sqlx::SqlitePool;

/// Raw confidence below which a human must confirm the department
pub const REVIEW_THRESHOLD: f64 = 0.3;

/// Raw confidence at or above which the winning score is boosted
pub const BOOST_THRESHOLD: f64 = 0.5;

/// Amount added to a boosted score
pub const BOOST_AMOUNT: f64 = 0.2;

/// Default number of suggestions returned by the suggestions endpoint
pub const DEFAULT_SUGGESTION_LIMIT: usize = 3;

static WORD_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\p{L}\p{N}_]+").expect("valid word regex"));

/// Department row as read from the department store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentRecord {
    pub id: i64,
    pub name: String,
    /// Comma-separated keyword list
    pub keywords: Option<String>,
    pub is_active: bool,
}

/// Normalized keyword set for one department
#[derive(Debug, Clone, PartialEq)]
pub struct DepartmentProfile {
    pub id: i64,
    pub name: String,
    /// Trimmed, lowercased keywords in configured order
    pub keywords: Vec<String>,
}

impl DepartmentProfile {
    /// Build a profile from a record, or `None` when the record has no keyword string
    pub fn from_record(record: &DepartmentRecord) -> Option<Self> {
        let raw = record.keywords.as_deref().filter(|k| !k.is_empty())?;

        Some(Self {
            id: record.id,
            name: record.name.clone(),
            keywords: raw.split(',').map(|kw| kw.trim().to_lowercase()).collect(),
        })
    }

    /// Keywords present in the token set, in configured order
    fn matched<'a>(&'a self, tokens: &HashSet<&str>) -> Vec<&'a str> {
        self.keywords
            .iter()
            .map(String::as_str)
            .filter(|kw| tokens.contains(kw))
            .collect()
    }
}

/// Routing decision for one issue
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub department_id: Option<i64>,
    /// Always within `[0.0, 1.0]`
    pub confidence: f64,
    pub needs_review: bool,
}

impl ClassificationResult {
    /// Result used when no department matched
    pub fn unmatched() -> Self {
        Self {
            department_id: None,
            confidence: 0.0,
            needs_review: true,
        }
    }
}

/// One ranked entry of [`IssueClassifier::suggest`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySuggestion {
    pub department_id: i64,
    pub department_name: String,
    pub confidence: f64,
    pub matched_keywords: Vec<String>,
}

/// Keyword classifier over a fixed snapshot of active departments
#[derive(Debug, Clone, Default)]
pub struct IssueClassifier {
    // BTreeMap gives ascending-id evaluation order, which fixes the tie-break
    profiles: BTreeMap<i64, DepartmentProfile>,
}

impl IssueClassifier {
    /// Build a classifier from department records
    ///
    /// Inactive departments and departments without keywords are skipped.
    pub fn new<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a DepartmentRecord>,
    {
        let profiles = records
            .into_iter()
            .filter(|r| r.is_active)
            .filter_map(DepartmentProfile::from_record)
            .map(|p| (p.id, p))
            .collect();

        Self { profiles }
    }

    /// Load active departments from the database and build a classifier
    #[cfg(feature = "sqlx")]
    pub async fn load(pool: &SqlitePool) -> crate::Result<Self> {
        let records = crate::db::departments::list_active_department_records(pool).await?;
        let classifier = Self::new(&records);
        tracing::debug!(
            "Loaded keyword profiles for {} of {} active departments",
            classifier.profiles.len(),
            records.len()
        );
        Ok(classifier)
    }

    /// Number of departments that can be matched
    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }

    /// Profiles in evaluation order
    pub fn profiles(&self) -> impl Iterator<Item = &DepartmentProfile> {
        self.profiles.values()
    }

    /// Classify an issue from its title and description
    pub fn classify(&self, title: &str, description: &str) -> ClassificationResult {
        let text = format!("{} {}", title, description).to_lowercase();
        let tokens = tokenize(&text);

        let mut best: Option<(i64, f64)> = None;
        for profile in self.profiles.values() {
            let matches = profile.matched(&tokens).len();
            if matches == 0 {
                continue;
            }

            let raw = (matches as f64 / profile.keywords.len() as f64).min(1.0);
            // Strictly greater: the first department seen keeps a tie
            if best.map_or(true, |(_, score)| raw > score) {
                best = Some((profile.id, raw));
            }
        }

        let Some((department_id, raw)) = best else {
            return ClassificationResult::unmatched();
        };

        let confidence = if raw >= BOOST_THRESHOLD {
            (raw + BOOST_AMOUNT).min(1.0)
        } else {
            raw
        };

        ClassificationResult {
            department_id: Some(department_id),
            confidence,
            needs_review: raw < REVIEW_THRESHOLD,
        }
    }

    /// Rank departments for free text, highest raw confidence first
    ///
    /// Scores are not boosted. At most `limit` entries are returned.
    pub fn suggest(&self, text: &str, limit: usize) -> Vec<CategorySuggestion> {
        let text = text.to_lowercase();
        let tokens = tokenize(&text);

        let mut suggestions: Vec<CategorySuggestion> = self
            .profiles
            .values()
            .filter_map(|profile| {
                let matched = profile.matched(&tokens);
                if matched.is_empty() {
                    return None;
                }
                Some(CategorySuggestion {
                    department_id: profile.id,
                    department_name: profile.name.clone(),
                    confidence: matched.len() as f64 / profile.keywords.len() as f64,
                    matched_keywords: matched.into_iter().map(str::to_string).collect(),
                })
            })
            .collect();

        // sort_by is stable, so equal scores stay in ascending-id order
        suggestions.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        suggestions.truncate(limit);
        suggestions
    }
}

/// Distinct word tokens of already-lowercased text
fn tokenize(text: &str) -> HashSet<&str> {
    WORD_PATTERN.find_iter(text).map(|m| m.as_str()).collect()
}
