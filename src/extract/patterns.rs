use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;

static A_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"A[\s-]?\d{8,9}").unwrap());
static DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:\d{1,2}[-/]\d{1,2}[-/]\d{2,4}|\d{4}[-/]\d{1,2}[-/]\d{1,2})\b").unwrap()
});
static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap());
static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+?1[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}").unwrap()
});
static NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z][a-z]+ [A-Z][a-z]+(?:\s[A-Z][a-z]+)?\b").unwrap());

/// Candidate matches by category. Empty categories are omitted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternMatches {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub a_numbers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dates: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub emails: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub phone_numbers: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub potential_names: Vec<String>,
}

impl PatternMatches {
    pub fn is_empty(&self) -> bool {
        self.a_numbers.is_empty()
            && self.dates.is_empty()
            && self.emails.is_empty()
            && self.phone_numbers.is_empty()
            && self.potential_names.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternExtraction {
    pub document_type: String,
    pub extraction_method: String,
    pub text_length: usize,
    pub extracted_data: PatternMatches,
}

/// Local best-effort extraction. `max_names` caps how many name-like
/// matches are considered before de-duplication.
pub fn extract_patterns(text: &str, document_type: Option<&str>, max_names: usize) -> PatternExtraction {
    PatternExtraction {
        document_type: document_type.unwrap_or("unknown").to_string(),
        extraction_method: "basic".to_string(),
        text_length: text.chars().count(),
        extracted_data: PatternMatches {
            a_numbers: unique(&A_NUMBER, text, usize::MAX),
            dates: unique(&DATE, text, usize::MAX),
            emails: unique(&EMAIL, text, usize::MAX),
            phone_numbers: unique(&PHONE, text, usize::MAX),
            potential_names: unique(&NAME, text, max_names),
        },
    }
}

fn unique(re: &Regex, text: &str, limit: usize) -> Vec<String> {
    re.find_iter(text)
        .take(limit)
        .map(|m| m.as_str().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
