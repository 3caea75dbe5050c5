//! Match cascade: exact → token-set → partial.
//!
//! Fuzzy stages collect every entry scoring at least the threshold, take the
//! maximum score, and among entries tied at that score prefer the highest
//! status-priority rank. Remaining ties go to the earliest entry in source
//! order, so results never depend on iteration luck.

use crate::error::Threshold;
use crate::index::ReferenceIndex;
use crate::models::{MatchOutcome, MatchStage, PriorityRank, Resolution, Suggestion};
use crate::similarity::{partial_ratio_cutoff, token_set_ratio, Score};

/// Number of review suggestions returned per resolved query.
pub const SUGGESTION_COUNT: usize = 3;

/// Score given to exact-stage matches.
pub const EXACT_SCORE: Score = 100;

/// Pick the best candidate at or above `threshold`.
/// Ordering: score, then rank, then earliest position.
fn select_best(
    scores: &[Score],
    ranks: &[PriorityRank],
    threshold: Score,
) -> Option<(usize, Score)> {
    let mut best: Option<(usize, Score)> = None;
    for (position, (&score, &rank)) in scores.iter().zip(ranks).enumerate() {
        if score < threshold {
            continue;
        }
        match best {
            // Only a strictly better (score, rank) displaces an earlier entry
            Some((b, best_score)) if (score, rank) <= (best_score, ranks[b]) => {}
            _ => best = Some((position, score)),
        }
    }
    best
}

fn score_all(
    query: &str,
    index: &ReferenceIndex,
    scorer: impl Fn(&str, &str) -> Score,
) -> Vec<Score> {
    index.names().iter().map(|name| scorer(query, name)).collect()
}

/// Top suggestions by token-set score, descending, ties in source order.
fn top_suggestions(token_scores: &[Score], index: &ReferenceIndex) -> Vec<Suggestion> {
    let mut ranked: Vec<(usize, Score)> = token_scores.iter().copied().enumerate().collect();
    // Stable sort keeps source order among equal scores
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked
        .into_iter()
        .take(SUGGESTION_COUNT)
        .map(|(position, score)| Suggestion {
            name: index.display_name(position).to_string(),
            score,
        })
        .collect()
}

/// Resolve a normalized query against one country's reference index.
///
/// Empty queries resolve to not found without running any stage: names made
/// only of stopwords would otherwise exact-match each other.
pub fn resolve(
    query: &str,
    index: &ReferenceIndex,
    threshold: Threshold,
    with_suggestions: bool,
) -> MatchOutcome {
    if query.is_empty() || index.is_empty() {
        return MatchOutcome::not_found();
    }

    let mut token_scores: Option<Vec<Score>> = None;

    let resolution = if let Some(position) = index.names().iter().position(|n| n == query) {
        Some(Resolution {
            site: index.sites()[position].clone(),
            stage: MatchStage::Exact,
            score: EXACT_SCORE,
            position,
        })
    } else {
        let scores: &[Score] = token_scores.insert(score_all(query, index, token_set_ratio));
        select_best(scores, index.ranks(), threshold.get())
            .map(|best| (best, MatchStage::TokenSet))
            .or_else(|| {
                log::debug!("token-set stage found nothing for '{}', trying partial", query);
                // Entries that cannot reach the threshold score 0 without a full scan
                let partial_scores = score_all(query, index, |q, name| {
                    partial_ratio_cutoff(q, name, threshold.get())
                });
                select_best(&partial_scores, index.ranks(), threshold.get())
                    .map(|best| (best, MatchStage::Partial))
            })
            .map(|((position, score), stage)| Resolution {
                site: index.sites()[position].clone(),
                stage,
                score,
                position,
            })
    };

    let Some(resolution) = resolution else {
        return MatchOutcome::not_found();
    };

    let suggestions = if with_suggestions {
        let scores = token_scores.get_or_insert_with(|| score_all(query, index, token_set_ratio));
        top_suggestions(scores, index)
    } else {
        Vec::new()
    };

    MatchOutcome {
        resolution: Some(resolution),
        suggestions,
    }
}

// ============================================================================
// TESTS
// ============================================================================
