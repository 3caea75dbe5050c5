//! Company name normalization for reference matching.
//!
//! The normalized form is a comparison key only and is never displayed.
//! Reference names and query names MUST go through the same function,
//! otherwise the exact stage silently stops matching.

use any_ascii::any_ascii;
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;
use unicode_normalization::UnicodeNormalization;

// ============================================================================
// PATTERNS
// ============================================================================

/// Anything that is not a lowercase ASCII letter, digit or space.
static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9 ]+").unwrap());

/// Trailing parenthetical annotations: "Acme (Matriz)", "Foo Ltda (antiga Bar)".
static PARENTHETICAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\(.*\)").unwrap());

/// Corporate suffixes and generic words dropped from normalized names.
/// "s" and "a" catch the halves of "S.A." once punctuation is gone.
pub static STOPWORDS: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        "sa",
        "ltda",
        "inc",
        "corp",
        "supply",
        "international",
        "group",
        "empresa",
        "company",
        "s",
        "a",
    ]
    .into_iter()
    .collect()
});

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Check if a character is a Unicode combining mark (diacritical mark).
pub fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0xFE20..=0xFE2F)
}

/// Fold Unicode text to lowercase ASCII.
/// e.g., "Açúcar Guarani" → "acucar guarani", "Nestlé" → "nestle"
pub fn fold_to_ascii(s: &str) -> String {
    let stripped: String = s.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    // Transliterate whatever survives NFKD (ß, Ø, Cyrillic, CJK...)
    any_ascii(&stripped).to_lowercase()
}

/// Remove parenthetical annotations from a raw name.
/// e.g., "Vale (Mineração)" → "Vale"
pub fn strip_parentheticals(raw: &str) -> String {
    PARENTHETICAL.replace_all(raw, "").trim().to_string()
}

pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Normalize a company name into its comparison key.
///
/// Steps, in order: ASCII/lowercase folding, non-`[a-z0-9 ]` characters to
/// spaces, whitespace tokenization, stopword removal, single-space join.
/// Blank input yields an empty string.
pub fn normalize_name(raw: &str) -> String {
    let folded = fold_to_ascii(raw);
    let cleaned = NON_ALNUM.replace_all(&folded, " ");
    cleaned
        .split_whitespace()
        .filter(|token| !is_stopword(token))
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// TESTS
// ============================================================================
