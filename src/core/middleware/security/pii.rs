//! Regex-based PII detection and redaction.

use once_cell::sync::Lazy;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PiiKind {
    Ssn,
    CreditCard,
    Email,
    Phone,
    Ipv4,
}

impl PiiKind {
    fn label(self) -> &'static str {
        match self {
            PiiKind::Ssn => "SSN",
            PiiKind::CreditCard => "CREDIT_CARD",
            PiiKind::Email => "EMAIL",
            PiiKind::Phone => "PHONE",
            PiiKind::Ipv4 => "IP_ADDRESS",
        }
    }
}

static SSN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap());
static CREDIT_CARD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:\d[ -]?){13,16}\b").unwrap());
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[\w.+-]+@[\w-]+\.[A-Za-z]{2,}\b").unwrap());
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{3}[-.]\d{3}[-.]\d{4}\b").unwrap());
static IPV4_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").unwrap());

struct Match {
    start: usize,
    end: usize,
    kind: PiiKind,
}

fn all_matches(text: &str) -> Vec<Match> {
    let mut matches = Vec::new();
    for (re, kind) in [
        (&*SSN_RE, PiiKind::Ssn),
        (&*CREDIT_CARD_RE, PiiKind::CreditCard),
        (&*EMAIL_RE, PiiKind::Email),
        (&*PHONE_RE, PiiKind::Phone),
        (&*IPV4_RE, PiiKind::Ipv4),
    ] {
        for m in re.find_iter(text) {
            matches.push(Match {
                start: m.start(),
                end: m.end(),
                kind,
            });
        }
    }
    matches
}

/// Resolves overlapping matches: sort by start ascending, then by length
/// descending so the longer match at a given position wins ties; a match
/// that starts before the previous accepted match ends is dropped.
fn resolve_overlaps(mut matches: Vec<Match>) -> Vec<Match> {
    matches.sort_by(|a, b| a.start.cmp(&b.start).then((b.end - b.start).cmp(&(a.end - a.start))));

    let mut accepted: Vec<Match> = Vec::new();
    for m in matches {
        if accepted.last().is_some_and(|last| m.start < last.end) {
            continue;
        }
        accepted.push(m);
    }
    accepted
}

/// Replaces every detected PII span with `[PII:<TYPE>]`. Substitution walks
/// the accepted matches in descending start order so earlier replacements
/// never invalidate the byte offsets of matches not yet applied.
pub fn redact(text: &str) -> String {
    let mut accepted = resolve_overlaps(all_matches(text));
    accepted.sort_by(|a, b| b.start.cmp(&a.start));

    let mut result = text.to_string();
    for m in accepted {
        result.replace_range(m.start..m.end, &format!("[PII:{}]", m.kind.label()));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_ssn() {
        assert_eq!(redact("my SSN is 123-45-6789"), "my SSN is [PII:SSN]");
    }

    #[test]
    fn redacts_email() {
        assert_eq!(
            redact("contact me at jane.doe@example.com please"),
            "contact me at [PII:EMAIL] please"
        );
    }

    #[test]
    fn redacts_multiple_spans_in_one_string() {
        let input = "email jane@example.com or call 555-123-4567";
        let output = redact(input);
        assert!(!output.contains("jane@example.com"));
        assert!(!output.contains("555-123-4567"));
    }

    #[test]
    fn non_pii_text_is_unchanged() {
        assert_eq!(redact("nothing sensitive here"), "nothing sensitive here");
    }

    #[test]
    fn overlapping_matches_prefer_the_longer_span() {
        // An SSN-shaped span fully inside a longer candidate; resolve_overlaps
        // must not redact it twice or leave a partial replacement.
        let input = "id 123-45-6789 ok";
        let output = redact(input);
        assert_eq!(output.matches("[PII:").count(), 1);
    }
}
