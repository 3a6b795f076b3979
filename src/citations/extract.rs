//! Regex-based citation extraction.
//!
//! Three passes, each in text order: full citations with case names,
//! standalone reporter citations, then bare case names.

use std::ops::Range;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::{Citation, CitationKind};

/// Federal reporters: F., F.2d, F.3d, F.4th, U.S., S. Ct.
const REPORTER: &str = r"F\.?\s*(?:2d|3d|4th)?|U\.?S\.?|S\.?\s*Ct\.?";

/// Party name: capitalized words.
const PARTY: &str = r"[A-Z][a-zA-Z'-]+(?:\s+[A-Z][a-zA-Z'-]+)*";

/// Citation signals that the name pattern picks up as part of a plaintiff.
const SIGNALS: &[&str] = &["In", "See", "Cf", "Accord", "But", "Compare", "Under"];

/// `Name v. Name, 123 F.2d 456 (Court Year)`
static FULL_CASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"({party})\s+vs?\.?\s+([A-Z][a-zA-Z'\s-]+?),?\s+(\d{{1,3}})\s+({reporter})\s+(\d{{1,4}})(?:\s*\(([^)]+)\))?",
        party = PARTY,
        reporter = REPORTER
    ))
    .expect("full case pattern should compile")
});

/// `123 F.2d 456`
static STANDALONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"\b(\d{{1,3}})\s+({reporter})\s+(\d{{1,4}})",
        reporter = REPORTER
    ))
    .expect("standalone citation pattern should compile")
});

/// `Name v. Name`
static CASE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"({party})\s+vs?\.?\s+({party})", party = PARTY))
        .expect("case name pattern should compile")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern should compile"));

fn normalize_reporter(reporter: &str) -> String {
    WHITESPACE.replace_all(reporter, "").into_owned()
}

fn normalize_party(party: &str) -> String {
    WHITESPACE
        .replace_all(party.trim().trim_end_matches(','), " ")
        .into_owned()
}

/// Drop leading citation signals ("See", "In") captured with the plaintiff.
fn strip_signals(plaintiff: &str) -> String {
    let mut words: Vec<&str> = plaintiff.split_whitespace().collect();
    while words.len() > 1 && SIGNALS.contains(&words[0]) {
        words.remove(0);
    }
    words.join(" ")
}

fn group<'t>(caps: &Captures<'t>, i: usize) -> &'t str {
    caps.get(i).map(|m| m.as_str()).unwrap_or("")
}

/// The match must not be followed directly by another digit.
fn followed_by_digit(text: &str, end: usize) -> bool {
    text[end..].chars().next().is_some_and(|c| c.is_ascii_digit())
}

fn overlaps(spans: &[Range<usize>], span: &Range<usize>) -> bool {
    spans
        .iter()
        .any(|s| s.start < span.end && span.start < s.end)
}

fn full_case(caps: &Captures<'_>) -> Citation {
    let plaintiff = strip_signals(&normalize_party(group(caps, 1)));
    let defendant = normalize_party(group(caps, 2));
    let volume = group(caps, 3);
    let reporter = normalize_reporter(group(caps, 4));
    let page = group(caps, 5);
    let court_year = caps.get(6).map(|m| m.as_str().trim().to_string());

    let mut citation = Citation::reporter(volume, &reporter, page, group(caps, 0));
    citation.case_name = Some(format!("{} v. {}", plaintiff, defendant));
    citation.plaintiff = Some(plaintiff);
    citation.defendant = Some(defendant);
    citation.court_year = court_year;
    citation
}

/// Extract legal citations from text.
///
/// Duplicates are dropped: a reporter citation already seen, or a case
/// name already seen or inside a full citation, is not reported again.
pub fn extract_citations(text: &str) -> Vec<Citation> {
    let mut citations: Vec<Citation> = Vec::new();
    let mut full_spans: Vec<Range<usize>> = Vec::new();

    for caps in FULL_CASE.captures_iter(text) {
        let citation = full_case(&caps);
        if let Some(m) = caps.get(0) {
            full_spans.push(m.range());
        }
        if !citations.iter().any(|c| c.content == citation.content) {
            citations.push(citation);
        }
    }

    for caps in STANDALONE.captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        if followed_by_digit(text, m.end()) {
            continue;
        }
        let citation = Citation::reporter(
            group(&caps, 1),
            &normalize_reporter(group(&caps, 2)),
            group(&caps, 3),
            m.as_str(),
        );
        if !citations.iter().any(|c| c.content == citation.content) {
            citations.push(citation);
        }
    }

    for caps in CASE_NAME.captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        if overlaps(&full_spans, &m.range()) {
            continue;
        }
        let plaintiff = strip_signals(&normalize_party(group(&caps, 1)));
        let defendant = normalize_party(group(&caps, 2));
        let citation = Citation::case_name(&plaintiff, &defendant, m.as_str());
        if !citations
            .iter()
            .any(|c| c.case_name.as_deref() == citation.case_name.as_deref())
        {
            citations.push(citation);
        }
    }

    citations
}

/// `<volume> <any reporter> <page>`, for reporters the extractor does not know.
static REPORTER_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{1,4}\s+\S.*?\s+\d{1,5}$").expect("reporter shape pattern should compile")
});

static VERSUS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+vs?\.?\s+").expect("versus pattern should compile"));

/// Interpret a single user-supplied citation or case name.
///
/// Reporter citations are normalized. Anything else is a case name taken
/// verbatim (`In re Gault`, `Brown v. Board of Education`), so the whole
/// query is searched.
pub fn parse_citation_query(query: &str) -> Citation {
    let query = WHITESPACE.replace_all(query.trim(), " ").into_owned();

    if let Some(citation) = extract_citations(&query)
        .into_iter()
        .find(|c| c.kind == CitationKind::Case)
    {
        return citation;
    }

    if REPORTER_SHAPE.is_match(&query) {
        return Citation {
            kind: CitationKind::Case,
            content: query.clone(),
            case_name: None,
            plaintiff: None,
            defendant: None,
            volume: None,
            reporter: None,
            page: None,
            court_year: None,
            original_text: query,
        };
    }

    let (plaintiff, defendant) = match VERSUS.splitn(&query, 2).collect::<Vec<_>>()[..] {
        [p, d] => (Some(p.to_string()), Some(d.to_string())),
        _ => (None, None),
    };

    Citation {
        kind: CitationKind::CaseName,
        content: query.clone(),
        case_name: Some(query.clone()),
        plaintiff,
        defendant,
        volume: None,
        reporter: None,
        page: None,
        court_year: None,
        original_text: query,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_case_citation() {
        let text = "In Brown v. Board of Education, 347 U.S. 483 (1954), the Court held that segregation was unconstitutional.";
        let citations = extract_citations(text);

        assert_eq!(citations.len(), 1);
        let c = &citations[0];
        assert_eq!(c.kind, CitationKind::Case);
        assert_eq!(c.content, "347 U.S. 483");
        assert_eq!(c.case_name.as_deref(), Some("Brown v. Board of Education"));
        assert_eq!(c.plaintiff.as_deref(), Some("Brown"));
        assert_eq!(c.defendant.as_deref(), Some("Board of Education"));
        assert_eq!(c.volume.as_deref(), Some("347"));
        assert_eq!(c.reporter.as_deref(), Some("U.S."));
        assert_eq!(c.page.as_deref(), Some("483"));
        assert_eq!(c.court_year.as_deref(), Some("1954"));
        assert!(c.original_text.ends_with("(1954)"));
    }

    #[test]
    fn test_reporter_spaces_removed() {
        let citations = extract_citations("Obergefell v. Hodges, 135 S. Ct. 2584 (2015).");
        assert_eq!(citations[0].content, "135 S.Ct. 2584");
        assert_eq!(citations[0].reporter.as_deref(), Some("S.Ct."));
    }

    #[test]
    fn test_standalone_citations_in_order() {
        let text = "Compare 347 U.S. 483 with 163 U.S. 537, and see 999 F.3d 1234.";
        let contents: Vec<String> = extract_citations(text)
            .into_iter()
            .map(|c| c.content)
            .collect();
        assert_eq!(contents, vec!["347 U.S. 483", "163 U.S. 537", "999 F.3d 1234"]);
    }

    #[test]
    fn test_standalone_rejects_embedded_numbers() {
        assert!(extract_citations("docket A12 F.3d 456").is_empty());
        assert!(extract_citations("see 12 F.3d 45678").is_empty());
    }

    #[test]
    fn test_case_name_only() {
        let citations = extract_citations("Under Roe v. Wade the question was settled.");
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].kind, CitationKind::CaseName);
        assert_eq!(citations[0].content, "Roe v. Wade");
    }

    #[test]
    fn test_cited_case_name_not_repeated() {
        let text = "Miranda v. Arizona, 384 U.S. 436 (1966). Later, Miranda v. Arizona was narrowed.";
        let citations = extract_citations(text);
        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].content, "384 U.S. 436");
    }

    #[test]
    fn test_distinct_case_names_kept() {
        let text = "Marbury v. Madison, 5 U.S. 137 (1803), predates Plessy v. Ferguson.";
        let citations = extract_citations(text);
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0].case_name.as_deref(), Some("Marbury v. Madison"));
        assert_eq!(citations[1].kind, CitationKind::CaseName);
        assert_eq!(citations[1].content, "Plessy v. Ferguson");
    }

    #[test]
    fn test_repeated_citation_reported_once() {
        let text = "See 410 U.S. 113. As stated in 410 U.S. 113, the right is qualified.";
        assert_eq!(extract_citations(text).len(), 1);
    }

    #[test]
    fn test_no_citations() {
        assert!(extract_citations("The contract was signed on May 5, 2020.").is_empty());
    }

    #[test]
    fn test_parse_citation_query() {
        let c = parse_citation_query("347 U.S. 483");
        assert_eq!(c.kind, CitationKind::Case);
        assert_eq!(c.content, "347 U.S. 483");

        let c = parse_citation_query("Brown v. Board of Education");
        assert_eq!(c.kind, CitationKind::CaseName);
        assert_eq!(c.content, "Brown v. Board of Education");
        assert_eq!(c.plaintiff.as_deref(), Some("Brown"));
        assert_eq!(c.defendant.as_deref(), Some("Board of Education"));

        let c = parse_citation_query("  1 Cranch 137 ");
        assert_eq!(c.kind, CitationKind::Case);
        assert_eq!(c.content, "1 Cranch 137");
    }

    #[test]
    fn test_query_without_versus_is_a_case_name() {
        let c = parse_citation_query("  In re   Gault ");
        assert_eq!(c.kind, CitationKind::CaseName);
        assert_eq!(c.content, "In re Gault");
        assert_eq!(c.case_name.as_deref(), Some("In re Gault"));
        assert!(c.plaintiff.is_none());
    }
}
