//! Legal citation types and extraction.

mod extract;

use serde::{Deserialize, Serialize};

pub use extract::{extract_citations, parse_citation_query};

/// What a citation identifies a case by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationKind {
    /// Reporter citation, e.g. `347 U.S. 483`.
    Case,
    /// Party names only, e.g. `Roe v. Wade`.
    CaseName,
}

impl CitationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CitationKind::Case => "case",
            CitationKind::CaseName => "case_name",
        }
    }
}

impl std::fmt::Display for CitationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A citation found in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub kind: CitationKind,
    /// Normalized form used for lookups: `"<vol> <reporter> <page>"` or
    /// `"<Plaintiff> v. <Defendant>"`.
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plaintiff: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defendant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub court_year: Option<String>,
    /// The exact text matched in the document.
    pub original_text: String,
}

impl Citation {
    /// Reporter citation with no case name.
    pub fn reporter(volume: &str, reporter: &str, page: &str, original_text: &str) -> Self {
        Self {
            kind: CitationKind::Case,
            content: format!("{} {} {}", volume, reporter, page),
            case_name: None,
            plaintiff: None,
            defendant: None,
            volume: Some(volume.to_string()),
            reporter: Some(reporter.to_string()),
            page: Some(page.to_string()),
            court_year: None,
            original_text: original_text.to_string(),
        }
    }

    /// Case name with no reporter citation.
    pub fn case_name(plaintiff: &str, defendant: &str, original_text: &str) -> Self {
        let name = format!("{} v. {}", plaintiff, defendant);
        Self {
            kind: CitationKind::CaseName,
            content: name.clone(),
            case_name: Some(name),
            plaintiff: Some(plaintiff.to_string()),
            defendant: Some(defendant.to_string()),
            volume: None,
            reporter: None,
            page: None,
            court_year: None,
            original_text: original_text.to_string(),
        }
    }

    /// Short human-readable label.
    pub fn label(&self) -> String {
        match (&self.kind, &self.case_name) {
            (CitationKind::Case, Some(name)) => format!("{}, {}", name, self.content),
            _ => self.content.clone(),
        }
    }
}
