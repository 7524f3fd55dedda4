//! Lexical booking-intent detection.
//!
//! Classifies whether a free-form message expresses a desire to schedule an
//! appointment. Best-effort keyword heuristic: deterministic and infallible,
//! with false positives and negatives accepted by contract.

use std::sync::LazyLock;

use regex::Regex;

// Patterns are matched anywhere in the message, case-insensitively. No word
// boundaries: "when can I bring Rex in?" and "any slots available?" both hit.
static BOOKING_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)book",
        r"(?i)appointment",
        r"(?i)schedule",
        r"(?i)reserve",
        r"(?i)visit",
        r"(?i)bring.*in",
        r"(?i)come in",
        r"(?i)make.*appointment",
        r"(?i)set up.*appointment",
        r"(?i)when can",
        r"(?i)available",
        r"(?i)slot",
        r"(?i)consultation",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid booking intent regex"))
    .collect()
});

/// Rule-based booking-intent detector.
#[derive(Debug, Default, Clone, Copy)]
pub struct IntentDetector;

impl IntentDetector {
    /// True if the message matches any booking pattern.
    ///
    /// Stateless and deterministic; never fails.
    pub fn detect(&self, message: &str) -> bool {
        BOOKING_PATTERNS.iter().any(|re| re.is_match(message))
    }
}
