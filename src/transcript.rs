//! Transcript signal detection.
//!
//! The raw transcript file is scanned as text, without parsing the JSONL
//! structure, for three signals: the agent's completion promise, the
//! verifier's approval tag, and verifier rejection phrases with any labeled
//! feedback lines.

use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

/// Maximum number of labeled feedback fragments kept from one rejection
const MAX_FEEDBACK_FRAGMENTS: usize = 5;

static COMPLETION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<promise>\s*DONE\s*</promise>").expect("valid completion regex")
});

static APPROVAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<oracle-approved>([^<]*)</oracle-approved>").expect("valid approval regex")
});

static REJECTION_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)oracle\s+rejected|<oracle-rejected>|verdict:\s*rejected",
        r"(?i)verification\s+failed",
        r"(?i)issues?\s+found",
        r"(?i)not\s+complete",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid rejection regex"))
    .collect()
});

// Fragment text stops at a newline, a JSON escape, or a closing quote so that
// it works on both raw text and JSON-encoded transcript lines. No leading word
// boundary: in JSON the label follows a literal `\n`.
static FEEDBACK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:issue|problem|reason|feedback)s?:\s*([^\n\\"]+)"#)
        .expect("valid feedback regex")
});

/// Facts extracted from one transcript read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptSignals {
    /// `<promise>DONE</promise>` present
    pub completion_claimed: bool,
    /// Verifier approval tag containing VERIFIED_COMPLETE present
    pub approved: bool,
    /// `None` when no rejection was seen; `Some("")` when rejected without detail
    pub rejection: Option<String>,
}

impl TranscriptSignals {
    pub fn rejected(&self) -> bool {
        self.rejection.is_some()
    }
}

/// Read and analyze a transcript. A missing path or unreadable file yields
/// the empty bundle.
pub fn analyze_transcript(path: Option<&Path>) -> TranscriptSignals {
    path.and_then(|p| fs::read_to_string(p).ok())
        .map(|text| analyze_text(&text))
        .unwrap_or_default()
}

pub fn analyze_text(text: &str) -> TranscriptSignals {
    TranscriptSignals {
        completion_claimed: has_completion_marker(text),
        approved: has_approval_marker(text),
        rejection: detect_rejection(text),
    }
}

pub fn has_completion_marker(text: &str) -> bool {
    COMPLETION_RE.is_match(text)
}

pub fn has_approval_marker(text: &str) -> bool {
    APPROVAL_RE.captures_iter(text).any(|caps| {
        caps.get(1)
            .map(|body| body.as_str().to_uppercase().contains("VERIFIED_COMPLETE"))
            .unwrap_or(false)
    })
}

/// Rejection feedback, joined with single spaces.
pub fn detect_rejection(text: &str) -> Option<String> {
    if !REJECTION_RES.iter().any(|re| re.is_match(text)) {
        return None;
    }

    let fragments: Vec<&str> = FEEDBACK_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .take(MAX_FEEDBACK_FRAGMENTS)
        .collect();

    Some(fragments.join(" "))
}
