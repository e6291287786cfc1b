// 🧹 Text Sanitizer & Identifier Normalizer
// The normalizer is the single source of truth for cross-source identifier
// matching: every reconciliation join goes through `normalize_id`, never raw
// text equality.

use crate::table::Table;
use once_cell::sync::Lazy;
use regex::Regex;

static FLOAT_ARTIFACT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.0+$").unwrap());
static SCIENTIFIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d+(\.\d+)?[eE][+-]?\d+$").unwrap());
static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").unwrap());

/// Strip encoding noise from a single cell: non-breaking spaces and the
/// mis-decoded `Â` artifact left by Latin-1/UTF-8 round trips, then trim.
pub fn sanitize_cell(value: &str) -> String {
    value
        .replace('\u{a0}', "")
        .replace('Â', "")
        .trim()
        .to_string()
}

/// Sanitize every cell of a table. Non-text content passes through intact;
/// digits and punctuation are unaffected by the replacements.
pub fn sanitize_table(table: &mut Table) {
    for row in table.rows_mut() {
        for cell in row.iter_mut() {
            let cleaned = sanitize_cell(cell);
            if cleaned != *cell {
                *cell = cleaned;
            }
        }
    }
}

/// Remove a trailing ".0..." run left by numeric round-tripping through
/// spreadsheet formats. "1000.00" -> "1000"; "10.05" is untouched.
pub fn strip_float_artifact(value: &str) -> String {
    FLOAT_ARTIFACT.replace(value, "").to_string()
}

/// Canonicalize a merchant identifier to its digits-only form.
///
/// Handles the encodings seen across the extracts: plain strings, padded
/// strings, float-serialized values ("123.0"), and scientific-notation
/// floats ("1.23E+10"). Returns `None` when nothing remains.
///
/// Idempotent: `normalize_id(x)` is a fixed point of itself.
pub fn normalize_id(value: &str) -> Option<String> {
    let trimmed = value.trim();

    let stripped = if FLOAT_ARTIFACT.is_match(trimmed) {
        strip_float_artifact(trimmed)
    } else if SCIENTIFIC.is_match(trimmed) {
        // Spreadsheet exports large IDs as "1.23E+10"; recover the integer
        // through a numeric parse before reducing to digits.
        match trimmed.parse::<f64>() {
            Ok(v) => format!("{:.0}", v),
            Err(_) => trimmed.to_string(),
        }
    } else {
        trimmed.to_string()
    };

    let digits: String = stripped.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

/// First run of consecutive digits in a string, if any.
/// Used where a merchant key is embedded in composite text.
pub fn digit_run(value: &str) -> Option<String> {
    DIGIT_RUN.find(value).map(|m| m.as_str().to_string())
}

/// Lenient numeric coercion: malformed values become 0, never an error.
pub fn parse_number(value: &str) -> f64 {
    value.trim().parse::<f64>().unwrap_or(0.0)
}

/// True if the code contains at least one ASCII letter (external agents
/// carry alphanumeric codes; internal ones are purely numeric).
pub fn has_alpha(value: &str) -> bool {
    value.chars().any(|c| c.is_ascii_alphabetic())
}

/// True if the code is non-empty and made of digits only.
pub fn is_numeric_code(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}
