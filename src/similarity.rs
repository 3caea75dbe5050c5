//! String similarity scorers on a 0-100 integer scale.
//!
//! - `ratio`: normalized indel similarity (LCS based)
//! - `token_set_ratio`: order-independent, tolerant of subset/superset token sets
//! - `partial_ratio`: best-aligned substring similarity, with a cutoff variant
//!   for the matcher's threshold
//!
//! Scores are computed as floats and rounded once, at the public boundary, so
//! threshold comparison and tie detection both work on the same integers.

use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

/// Integer similarity score, 0..=100.
pub type Score = u8;

fn to_score(value: f64) -> Score {
    value.round().clamp(0.0, 100.0) as Score
}

// ============================================================================
// Indel Ratio
// ============================================================================

/// Pattern length handled by the bit-parallel LCS.
const WORD_BITS: usize = 64;

/// Length of the longest common subsequence, classic two-row table.
fn lcs_dp(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

fn indel_from_lcs(a_len: usize, b_len: usize, lcs: usize) -> f64 {
    let total = a_len + b_len;
    if total == 0 {
        return 100.0;
    }
    let distance = total - 2 * lcs;
    100.0 * (1.0 - distance as f64 / total as f64)
}

/// Per-character occurrence masks of one string, built once and compared
/// against many texts.
struct Pattern<'a> {
    chars: &'a [char],
    masks: FxHashMap<char, u64>, // bit i set when chars[i] is the key, i < 64
}

impl<'a> Pattern<'a> {
    fn new(chars: &'a [char]) -> Self {
        let mut masks: FxHashMap<char, u64> = FxHashMap::default();
        for (i, &c) in chars.iter().enumerate() {
            let mask = masks.entry(c).or_insert(0);
            if i < WORD_BITS {
                *mask |= 1 << i;
            }
        }
        Pattern { chars, masks }
    }

    fn contains(&self, c: char) -> bool {
        self.masks.contains_key(&c)
    }

    /// LCS length against `text`; bit-parallel (Hyyrö) up to 64 chars.
    fn lcs(&self, text: &[char]) -> usize {
        let len = self.chars.len();
        if len == 0 || text.is_empty() {
            return 0;
        }
        if len > WORD_BITS {
            return lcs_dp(self.chars, text);
        }
        let mut row = !0u64;
        for c in text {
            let matches = self.masks.get(c).copied().unwrap_or(0);
            let u = row & matches;
            row = row.wrapping_add(u) | (row - u);
        }
        let used = if len == WORD_BITS { !0 } else { (1u64 << len) - 1 };
        (!row & used).count_ones() as usize
    }

    fn ratio(&self, text: &[char]) -> f64 {
        indel_from_lcs(self.chars.len(), text.len(), self.lcs(text))
    }
}

fn ratio_raw(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (shorter, longer) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    Pattern::new(shorter).ratio(longer)
}

/// Normalized indel similarity between two strings.
pub fn ratio(a: &str, b: &str) -> Score {
    to_score(ratio_raw(a, b))
}

// ============================================================================
// Token Set Ratio
// ============================================================================

fn token_set_ratio_raw(a: &str, b: &str) -> f64 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();

    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let intersection: Vec<&str> = tokens_a.intersection(&tokens_b).copied().collect();
    let diff_ab: Vec<&str> = tokens_a.difference(&tokens_b).copied().collect();
    let diff_ba: Vec<&str> = tokens_b.difference(&tokens_a).copied().collect();

    // One side's tokens are entirely contained in the other's
    if !intersection.is_empty() && (diff_ab.is_empty() || diff_ba.is_empty()) {
        return 100.0;
    }

    let diff_ab_joined = diff_ab.join(" ");
    let diff_ba_joined = diff_ba.join(" ");
    let ab_len = diff_ab_joined.chars().count();
    let ba_len = diff_ba_joined.chars().count();
    let sect_len = intersection.join(" ").chars().count();

    let diff_score = ratio_raw(&diff_ab_joined, &diff_ba_joined);
    if sect_len == 0 {
        return diff_score;
    }

    // "sect" vs "sect diff" only differs by the diff plus one separator
    let sect_ab_len = sect_len + 1 + ab_len;
    let sect_ba_len = sect_len + 1 + ba_len;
    let sect_ab_score = 100.0 * (1.0 - (1 + ab_len) as f64 / (sect_len + sect_ab_len) as f64);
    let sect_ba_score = 100.0 * (1.0 - (1 + ba_len) as f64 / (sect_len + sect_ba_len) as f64);

    diff_score.max(sect_ab_score).max(sect_ba_score)
}

/// Token-set similarity: compares the shared tokens against each side's
/// remainder, so reordering and extra tokens on one side cost little.
pub fn token_set_ratio(a: &str, b: &str) -> Score {
    to_score(token_set_ratio_raw(a, b))
}


// ============================================================================
// Partial Ratio
// ============================================================================

/// Ceiling on every alignment of `needle` in `haystack`: no window shares more
/// characters with the needle than the whole haystack does.
fn alignment_bound(needle: &[char], haystack: &[char]) -> f64 {
    let mut counts: FxHashMap<char, usize> = FxHashMap::default();
    for &c in needle {
        *counts.entry(c).or_insert(0) += 1;
    }
    let mut common = 0usize;
    for c in haystack {
        if let Some(left) = counts.get_mut(c) {
            if *left > 0 {
                *left -= 1;
                common += 1;
            }
        }
    }
    200.0 * common as f64 / (needle.len() + common) as f64
}

/// Best indel ratio of the pattern against every alignment inside
/// `haystack`, including windows clipped at either end. The pattern must not
/// be longer than `haystack`.
///
/// A window whose outer character is absent from the pattern never beats its
/// neighbour without that character, so it is not scored. Windows that cannot
/// reach `cutoff` or the best score so far are skipped too.
fn best_alignment(pattern: &Pattern<'_>, haystack: &[char], cutoff: f64) -> f64 {
    let n = pattern.chars.len();
    let h = haystack.len();
    let clipped_bound = |len: usize| 200.0 * len as f64 / (n + len) as f64;
    let mut best: f64 = 0.0;

    // Windows clipped at the start
    for end in 1..n.min(h + 1) {
        let bound = clipped_bound(end);
        if !pattern.contains(haystack[end - 1]) || bound <= best || bound < cutoff {
            continue;
        }
        best = best.max(pattern.ratio(&haystack[..end]));
    }
    // Full-length windows
    for start in 0..=(h - n) {
        if !pattern.contains(haystack[start + n - 1]) {
            continue;
        }
        best = best.max(pattern.ratio(&haystack[start..start + n]));
        if best >= 100.0 {
            return best;
        }
    }
    // Windows clipped at the end, shrinking
    for start in (h - n + 1)..h {
        let bound = clipped_bound(h - start);
        if bound <= best || bound < cutoff {
            break;
        }
        if pattern.contains(haystack[start]) {
            best = best.max(pattern.ratio(&haystack[start..]));
        }
    }
    best
}

fn partial_ratio_raw(a: &str, b: &str, cutoff: f64) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() && b.is_empty() {
        return 100.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let (shorter, longer) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    if alignment_bound(shorter, longer) < cutoff {
        return 0.0;
    }
    let score = best_alignment(&Pattern::new(shorter), longer, cutoff);
    if shorter.len() == longer.len() && score < 100.0 {
        // Equal lengths: alignment is not symmetric, try both directions
        return score.max(best_alignment(&Pattern::new(longer), shorter, cutoff));
    }
    score
}

/// Partial similarity: the shorter string scored against its best-aligned
/// substring of the longer one.
pub fn partial_ratio(a: &str, b: &str) -> Score {
    partial_ratio_cutoff(a, b, 0)
}

/// [`partial_ratio`] that gives up with 0 once the score cannot reach
/// `score_cutoff`. Scores at or above the cutoff are exact.
pub fn partial_ratio_cutoff(a: &str, b: &str, score_cutoff: Score) -> Score {
    // Anything at or above cutoff - 0.5 may still round up to the cutoff
    let cutoff = if score_cutoff == 0 {
        0.0
    } else {
        f64::from(score_cutoff) - 0.5
    };
    let score = to_score(partial_ratio_raw(a, b, cutoff));
    if score < score_cutoff {
        0
    } else {
        score
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio() {
        assert_eq!(ratio("acme", "acme"), 100);
        assert_eq!(ratio("abc", "abd"), 67);
        assert_eq!(ratio("abc", "xyz"), 0);
        assert_eq!(ratio("", ""), 100);
        assert_eq!(ratio("abc", ""), 0);
    }

    #[test]
    fn test_token_set_ratio_subset() {
        assert_eq!(token_set_ratio("acme", "acme foods"), 100);
        assert_eq!(token_set_ratio("acme foods", "acme"), 100);
        assert_eq!(token_set_ratio("fuzzy was a bear", "fuzzy fuzzy was a bear"), 100);
    }

    #[test]
    fn test_token_set_ratio_reordering() {
        assert_eq!(token_set_ratio("brasil acme", "acme brasil"), 100);
    }

    #[test]
    fn test_token_set_ratio_partial_overlap() {
        // sect "acme" vs "acme brasil" / "acme mexico": 1 - 7/15
        assert_eq!(token_set_ratio("acme brasil", "acme mexico"), 53);
    }

    #[test]
    fn test_token_set_ratio_empty() {
        assert_eq!(token_set_ratio("", "acme"), 0);
        assert_eq!(token_set_ratio("acme", ""), 0);
    }

    #[test]
    fn test_token_set_ratio_disjoint() {
        // No shared tokens: plain ratio of the sorted token strings
        assert_eq!(token_set_ratio("abc", "abd"), 67);
    }

    #[test]
    fn test_partial_ratio_substring() {
        assert_eq!(partial_ratio("acme", "acmeco brasil"), 100);
        assert_eq!(partial_ratio("this is a test", "this is a test!"), 100);
        assert_eq!(partial_ratio("petrobras", "petrobras distribuidora"), 100);
    }

    #[test]
    fn test_partial_ratio_clipped_window() {
        // "xacme" is best aligned with the clipped prefix "acme"
        assert_eq!(partial_ratio("xacme", "acmecorp"), 89);
    }

    #[test]
    fn test_partial_ratio_symmetric_inputs() {
        assert_eq!(partial_ratio("abcd", "bcde"), partial_ratio("bcde", "abcd"));
        assert_eq!(partial_ratio("", ""), 100);
        assert_eq!(partial_ratio("", "acme"), 0);
    }

    #[test]
    fn test_scores_in_range() {
        let pairs = [("a", "b"), ("acme", "zzz"), ("x y z", "z y x"), ("aaaa", "a")];
        for (a, b) in pairs {
            assert!(ratio(a, b) <= 100);
            assert!(token_set_ratio(a, b) <= 100);
            assert!(partial_ratio(a, b) <= 100);
        }
    }

    /// Every window scored with the plain table, no skipping.
    fn exhaustive_partial(a: &str, b: &str) -> Score {
        fn scan(needle: &[char], haystack: &[char]) -> f64 {
            let (n, h) = (needle.len(), haystack.len());
            let score = |w: &[char]| indel_from_lcs(n, w.len(), lcs_dp(needle, w));
            let mut best: f64 = 0.0;
            for end in 1..n.min(h + 1) {
                best = best.max(score(&haystack[..end]));
            }
            for start in 0..=(h - n) {
                best = best.max(score(&haystack[start..start + n]));
            }
            for start in (h - n + 1)..h {
                best = best.max(score(&haystack[start..]));
            }
            best
        }
        let a: Vec<char> = a.chars().collect();
        let b: Vec<char> = b.chars().collect();
        let (shorter, longer) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
        let mut best = scan(shorter, longer);
        if shorter.len() == longer.len() {
            best = best.max(scan(longer, shorter));
        }
        to_score(best)
    }

    const PAIRS: &[(&str, &str)] = &[
        ("xacme", "acmecorp"),
        ("acme brasil", "brasil acme ltda"),
        ("petrobras", "petrobrasdistrib"),
        ("abcd", "bcde"),
        ("banco itau", "itau unibanco holding"),
        ("mineracao vale", "vale do rio doce mineracao"),
        ("aaa", "aabaa"),
        ("zz", "abc"),
        ("cba", "abc"),
        ("votorantim cimentos", "cimentos votorantim norte nordeste"),
        (
            "the quick brown fox jumps over the lazy dog and keeps running far away",
            "quick brown foxes jump over lazy dogs while running far far away from home today",
        ),
    ];

    #[test]
    fn test_pattern_lcs_matches_table() {
        for (a, b) in PAIRS {
            let a: Vec<char> = a.chars().collect();
            let b: Vec<char> = b.chars().collect();
            assert_eq!(Pattern::new(&a).lcs(&b), lcs_dp(&a, &b));
            assert_eq!(Pattern::new(&b).lcs(&a), lcs_dp(&a, &b));
        }
    }

    #[test]
    fn test_partial_ratio_matches_exhaustive_scan() {
        for (a, b) in PAIRS {
            assert_eq!(partial_ratio(a, b), exhaustive_partial(a, b), "{} / {}", a, b);
            assert_eq!(partial_ratio(b, a), exhaustive_partial(a, b), "{} / {}", b, a);
        }
    }

    #[test]
    fn test_partial_ratio_cutoff() {
        for (a, b) in PAIRS {
            let full = partial_ratio(a, b);
            for cutoff in [1, 50, 85, 100] {
                let expected = if full >= cutoff { full } else { 0 };
                assert_eq!(partial_ratio_cutoff(a, b, cutoff), expected, "{} / {}", a, b);
            }
        }
        // No character in common: pruned before any window is scored
        assert_eq!(partial_ratio_cutoff("xyz", "banco itau", 85), 0);
    }

    #[test]
    fn test_alignment_bound_caps_score() {
        let needle: Vec<char> = "acme".chars().collect();
        let haystack: Vec<char> = "amce holding".chars().collect();
        assert_eq!(alignment_bound(&needle, &haystack), 100.0);
        let haystack: Vec<char> = "zzzzzzzz".chars().collect();
        assert_eq!(alignment_bound(&needle, &haystack), 0.0);
    }
}
