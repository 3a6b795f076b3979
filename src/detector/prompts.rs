//! Prompts for the three analysis stages.
//!
//! Placeholders in `{braces}` are filled with `str::replace`.

/// Stage 1: initial assessment informed by citation verification.
pub const INITIAL_ASSESSMENT_PROMPT: &str = r#"You are a legal scholar analyzing a document for potential hallucinations.

COURTLISTENER DATABASE VERIFICATION RESULTS:{citation_status}

VERIFICATION DETAILS:
{verification_context}

DOCUMENT TEXT:
---
{document}
---

Based on the citation verification results above, provide your scholarly assessment:

1. If citations COULD NOT BE VERIFIED, this strongly suggests hallucination - fabricated cases
2. Analyze other claims for accuracy: legal standards, procedures, dates
3. Assess overall reliability

Write 2-3 paragraphs. Be direct about hallucination risks."#;

/// Stage 2 when some citations failed verification.
pub const UNVERIFIED_ANALYSIS_PROMPT: &str = r#"You are a legal scholar investigating CONFIRMED citation problems.

THE FOLLOWING CITATIONS FAILED VERIFICATION IN COURTLISTENER:
{unverified}

These citations were searched in CourtListener (a comprehensive legal database with millions of cases) and NOT FOUND. This is strong evidence the cases are fabricated/hallucinated.

VERIFIED CITATIONS (for comparison):
{verified_count} citations were successfully verified.

ORIGINAL DOCUMENT:
---
{document}
---

Analyze:
1. What specific claims depend on these unverified citations?
2. If the cases don't exist, what does that mean for the document's reliability?
3. Are there any other red flags (wrong dates, impossible procedures, etc.)?

Write 2-3 paragraphs. Treat unverified citations as PROBABLE HALLUCINATIONS."#;

/// Stage 2 when no database check was made.
pub const PLAUSIBILITY_REVIEW_PROMPT: &str = r#"You are a legal scholar reviewing citations that could NOT be checked against a case-law database.

CITATIONS FOUND IN THE DOCUMENT:
{citations}

ORIGINAL DOCUMENT:
---
{document}
---

For each citation, assess whether it is plausible:
1. Does the reporter, volume and page format look valid for the court and year?
2. Does the case name match what the document claims the case held?
3. Are there red flags typical of fabricated citations (unknown parties, impossible dates, mismatched courts)?

Write 2-3 paragraphs. Name every citation you consider suspicious."#;

/// Stage 3: final synthesis with a machine-readable verdict.
pub const SYNTHESIS_PROMPT: &str = r#"You are a legal scholar writing a final assessment.

VERIFICATION SUMMARY:
- Verified citations: {verified_count}
- Unverified citations: {unverified_count}
- Verification rate: {verification_rate}%
- Risk assessment: {risk_reason}

STAGE 1 FINDINGS:
{stage1}

STAGE 2 FINDINGS:
{stage2}

Write a final 2-3 paragraph professional assessment summarizing:
1. What was analyzed
2. Whether hallucinations were detected (be specific about which citations)
3. Reliability conclusion

End with exactly these three lines:
CONFIDENCE: [number 0-100]
RISK: [low/medium/high/critical]
RECOMMENDATION: [one clear sentence]"#;
