use crate::scoring::RelevanceScorer;
use crate::subcats::SubcatMatch;
use chrono::{DateTime, Utc};
use radar_core::{Candidate, StateError};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub score: f64,
}

/// Score every candidate, drop non-positive scores and sort by score
/// descending, then votes descending, then input order.
pub fn rank(
    scorer: &RelevanceScorer,
    candidates: Vec<Candidate>,
    now: DateTime<Utc>,
) -> Vec<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = candidates
        .into_iter()
        .map(|candidate| {
            let score = scorer.score_at(&candidate, now);
            ScoredCandidate { candidate, score }
        })
        .filter(|s| s.score > 0.0)
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.candidate.votes_count.cmp(&a.candidate.votes_count))
    });
    scored
}

/// The best `k` candidates by [`rank`] order.
pub fn top_k(
    scorer: &RelevanceScorer,
    candidates: Vec<Candidate>,
    k: usize,
    now: DateTime<Utc>,
) -> Vec<ScoredCandidate> {
    let mut ranked = rank(scorer, candidates, now);
    ranked.truncate(k);
    debug!("Selected {} of the top-ranked candidates", ranked.len());
    ranked
}

/// Persisted "last subcategory served" marker for round-robin rotation.
pub trait RotationCursor {
    fn load(&self) -> Option<String>;
    fn save(&mut self, subcategory: &str) -> Result<(), StateError>;
}

/// Pick the first candidate for the subcategory after the stored cursor,
/// wrapping through `order`, and move the cursor onto that subcategory.
///
/// A stored value that is not in `order` counts as no cursor. When nothing
/// matches any subcategory the cursor is left alone.
pub fn pick_round_robin<'a, C: RotationCursor + ?Sized>(
    matches: &'a [SubcatMatch],
    order: &[String],
    cursor: &mut C,
) -> Result<Option<&'a SubcatMatch>, StateError> {
    if matches.is_empty() || order.is_empty() {
        return Ok(None);
    }

    let last = cursor.load();
    let start = last
        .as_deref()
        .and_then(|last| order.iter().position(|s| s.eq_ignore_ascii_case(last.trim())))
        .map_or(0, |index| (index + 1) % order.len());

    for step in 0..order.len() {
        let subcat = &order[(start + step) % order.len()];
        let hit = matches
            .iter()
            .find(|m| m.matched_subcats.iter().any(|s| s.eq_ignore_ascii_case(subcat)));

        if let Some(hit) = hit {
            cursor.save(subcat)?;
            info!(
                "Round-robin picked subcategory '{}' (previous: {})",
                subcat,
                last.as_deref().unwrap_or("none")
            );
            return Ok(Some(hit));
        }
    }

    debug!("No candidate matched any configured subcategory");
    Ok(None)
}

/// Uniform pick using the thread-local generator.
pub fn pick_random<T>(items: &[T]) -> Option<&T> {
    if items.is_empty() {
        return None;
    }
    items.get(fastrand::usize(..items.len()))
}

/// Uniform pick with a caller-provided generator.
pub fn pick_random_with<'a, T>(rng: &mut fastrand::Rng, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    items.get(rng.usize(..items.len()))
}

