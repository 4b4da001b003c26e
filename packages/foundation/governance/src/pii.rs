use once_cell::sync::Lazy;
use regex::Regex;

/// One PII pattern: a type tag, its detection regex, and the token that
/// replaces every match during redaction. Order matters — patterns are
/// applied in this declared order and it must stay stable across releases
/// since it doubles as `pii_types` enumeration order (spec.md GLOSSARY).
pub struct PiiPattern {
    pub pii_type: &'static str,
    pub regex: &'static Lazy<Regex>,
    pub replacement: &'static str,
}

static SSN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap());
static CREDIT_CARD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:\d[ -]?){13,16}\b").unwrap());
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:\+?1[-. ]?)?\(?\d{3}\)?[-. ]?\d{3}[-. ]?\d{4}\b").unwrap());
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[\w.+-]+@[\w-]+\.[A-Za-z]{2,}\b").unwrap());
static ADDRESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b\d+\s+[A-Za-z0-9.'\- ]+\s(?:street|st|avenue|ave|road|rd|boulevard|blvd|lane|ln|drive|dr|court|ct|way|place|pl)\b").unwrap()
});
static ACCOUNT_NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{9,17}\b").unwrap());
static DOB_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:date of birth|dob|born)\b\s*:?\s*\d{1,2}[/-]\d{1,2}[/-]\d{2,4}").unwrap()
});

/// Fixed ordered list of PII patterns, in spec.md's literal GLOSSARY order
/// (ssn, credit_card, phone, email, address, account_number,
/// date_of_birth). Applied in this order so that a substring matching an
/// earlier pattern (e.g. SSN) is consumed before a later, broader one
/// (e.g. the bare-digit-run "account number" bucket) can also claim it.
pub static PII_PATTERNS: Lazy<Vec<PiiPattern>> = Lazy::new(|| {
    vec![
        PiiPattern {
            pii_type: "ssn",
            regex: &SSN_RE,
            replacement: "[SSN_REDACTED]",
        },
        PiiPattern {
            pii_type: "credit_card",
            regex: &CREDIT_CARD_RE,
            replacement: "[CREDIT_CARD_REDACTED]",
        },
        PiiPattern {
            pii_type: "phone",
            regex: &PHONE_RE,
            replacement: "[PHONE_REDACTED]",
        },
        PiiPattern {
            pii_type: "email",
            regex: &EMAIL_RE,
            replacement: "[EMAIL_REDACTED]",
        },
        PiiPattern {
            pii_type: "address",
            regex: &ADDRESS_RE,
            replacement: "[ADDRESS_REDACTED]",
        },
        PiiPattern {
            pii_type: "account_number",
            regex: &ACCOUNT_NUMBER_RE,
            replacement: "[ACCOUNT_NUMBER_REDACTED]",
        },
        PiiPattern {
            pii_type: "date_of_birth",
            regex: &DOB_RE,
            replacement: "[DOB_REDACTED]",
        },
    ]
});

/// Applies every PII pattern to `text` in declared order, returning the
/// redacted string and the set of PII types that matched at least once.
/// Idempotent: running this twice on already-redacted text matches nothing
/// new, since the replacement tokens contain no digits/`@`/word-boundary
/// shapes the patterns recognize.
pub fn redact_text(text: &str) -> (String, Vec<&'static str>) {
    let mut out = text.to_string();
    let mut found = Vec::new();
    for pattern in PII_PATTERNS.iter() {
        if pattern.regex.is_match(&out) {
            found.push(pattern.pii_type);
            out = pattern.regex.replace_all(&out, pattern.replacement).into_owned();
        }
    }
    (out, found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_and_redacts_ssn() {
        let (redacted, types) = redact_text("SSN is 123-45-6789 for this case");
        assert!(types.contains(&"ssn"));
        assert!(redacted.contains("[SSN_REDACTED]"));
        assert!(!redacted.contains("123-45-6789"));
    }

    #[test]
    fn detects_and_redacts_email() {
        let (redacted, types) = redact_text("contact lee@example.org for follow-up");
        assert!(types.contains(&"email"));
        assert!(!redacted.contains("lee@example.org"));
    }

    #[test]
    fn redaction_is_idempotent() {
        let (once, _) = redact_text("SSN 123-45-6789, email a@b.com");
        let (twice, types_twice) = redact_text(&once);
        assert_eq!(once, twice);
        assert!(types_twice.is_empty());
    }

    #[test]
    fn clean_text_detects_nothing() {
        let (redacted, types) = redact_text("routine low-speed collision, small dent");
        assert!(types.is_empty());
        assert_eq!(redacted, "routine low-speed collision, small dent");
    }
}
