//! Heuristics deciding whether a search result is the cited case.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::sanitize::sanitize_output;

static FEDERAL_CITATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\s+(u\.?s\.?|f\.?\s*(?:2d|3d|4th)?|s\.?\s*ct\.?)\s+(\d+)")
        .expect("federal citation pattern should compile")
});

static PARTIES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([a-z]+)\s+v\.?\s+([a-z]+)").expect("parties pattern should compile")
});

static NAMED_PARTIES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([a-z]{3,})\s+v\.?\s+([a-z]{3,})").expect("named parties pattern should compile")
});

/// Case details pulled out of a CourtListener result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaseRecord {
    pub case_name: Option<String>,
    pub court: Option<String>,
    pub date_filed: Option<String>,
    pub docket_number: Option<String>,
    pub citations: Vec<String>,
}

/// First non-empty string under any of `keys`, sanitized.
fn field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| value.get(*k))
        .filter_map(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .map(|s| sanitize_output(s.trim()))
        .find(|s| !s.is_empty())
}

impl CaseRecord {
    /// Read a search result, lookup cluster or opinion. Both the camelCase
    /// (search API) and snake_case (REST objects) spellings are accepted.
    pub fn from_json(value: &Value) -> Self {
        let citations = match value.get("citation").or_else(|| value.get("citations")) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(sanitize_output(s)),
                    Value::Object(_) => citation_from_object(item),
                    _ => None,
                })
                .collect(),
            Some(Value::String(s)) => vec![sanitize_output(s)],
            _ => Vec::new(),
        };

        Self {
            case_name: field(value, &["caseName", "case_name", "case_name_full"]),
            court: field(value, &["court", "court_citation_string", "court_id"]),
            date_filed: field(value, &["dateFiled", "date_filed"]),
            docket_number: field(value, &["docketNumber", "docket_number"]),
            citations,
        }
    }
}

/// `{"volume": 347, "reporter": "U.S.", "page": "483"}` → `347 U.S. 483`.
fn citation_from_object(value: &Value) -> Option<String> {
    let volume = field(value, &["volume"])?;
    let reporter = field(value, &["reporter"])?;
    let page = field(value, &["page"])?;
    Some(format!("{} {} {}", volume, reporter, page))
}

fn tokens(s: &str) -> HashSet<&str> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Whether a search result matches the given citation.
///
/// A reporter citation matches when both its volume and page appear as
/// tokens in the result; a party-name citation when both party names do.
pub fn citation_matches(citation: &str, result: &Value) -> bool {
    let citation_lower = citation.to_lowercase();
    let result_str = result.to_string().to_lowercase();
    let result_tokens = tokens(&result_str);

    if let Some(caps) = FEDERAL_CITATION.captures(&citation_lower) {
        let volume = &caps[1];
        let page = &caps[3];
        if result_tokens.contains(volume) && result_tokens.contains(page) {
            return true;
        }
    }

    if let Some(caps) = PARTIES.captures(&citation_lower) {
        let party1 = &caps[1];
        let party2 = &caps[2];
        if party1.len() > 2
            && party2.len() > 2
            && result_str.contains(party1)
            && result_str.contains(party2)
        {
            return true;
        }
    }

    false
}

/// Whether a result's case name matches a queried case name.
pub fn names_match(query: &str, result_name: &str) -> bool {
    let query = query.to_lowercase();
    let result_name = result_name.to_lowercase();
    if result_name.is_empty() {
        return false;
    }

    if let Some(caps) = NAMED_PARTIES.captures(&query) {
        return result_name.contains(&caps[1]) && result_name.contains(&caps[2]);
    }
    result_name.contains(query.trim())
}
