//! Weighted confidence scoring of a lyrics-store candidate against a query.
//!
//! Title, artist and duration each contribute a fixed share of the score and
//! one human-readable reason, so a result can always be explained.

use crate::models::{MatchResult, TrackCandidate, TrackQuery};

use super::similarity::similarity;

pub const TITLE_WEIGHT: f64 = 0.5;
pub const ARTIST_WEIGHT: f64 = 0.3;
pub const DURATION_WEIGHT: f64 = 0.2;

/// Seconds of difference at which the duration term reaches zero.
const DURATION_FALLOFF_SECS: f64 = 10.0;

// =============================================================================
// Reasons
// =============================================================================

fn title_reason(title_sim: f64) -> String {
    if title_sim > 0.9 {
        "Title is a near-exact match.".to_string()
    } else if title_sim > 0.7 {
        "Title is a close match.".to_string()
    } else {
        format!(
            "Title mismatch detected ({}% match).",
            (title_sim * 100.0).round() as i64
        )
    }
}

fn artist_reason(artist_sim: f64) -> String {
    if artist_sim > 0.9 {
        "Artist is a confirmed match.".to_string()
    } else if artist_sim > 0.5 {
        "Artist name is similar.".to_string()
    } else {
        "Artist name differs significantly.".to_string()
    }
}

fn duration_reason(delta: f64) -> String {
    if delta <= 2.0 {
        format!("Duration matches perfectly (±{}s).", delta)
    } else if delta <= 5.0 {
        format!("Duration is close (±{}s).", delta)
    } else {
        format!("Significant duration difference ({}s).", delta)
    }
}

/// A duration only counts when it is known and non-zero.
fn usable_duration(duration: Option<f64>) -> Option<f64> {
    duration.filter(|d| *d != 0.0 && !d.is_nan())
}

// =============================================================================
// Scoring
// =============================================================================

/// Score a single candidate against the query.
pub fn score(query: &TrackQuery, candidate: &TrackCandidate) -> MatchResult {
    let mut reasons = Vec::with_capacity(3);

    let title_sim = similarity(&query.track_name, &candidate.track_name);
    let mut score = title_sim * TITLE_WEIGHT;
    reasons.push(title_reason(title_sim));

    let artist_sim = similarity(&query.artist_name, &candidate.artist_name);
    score += artist_sim * ARTIST_WEIGHT;
    reasons.push(artist_reason(artist_sim));

    match (
        usable_duration(query.duration),
        usable_duration(Some(candidate.duration)),
    ) {
        (Some(wanted), Some(found)) => {
            let delta = (wanted - found).abs();
            let duration_score = (1.0 - delta / DURATION_FALLOFF_SECS).max(0.0);
            score += duration_score * DURATION_WEIGHT;
            reasons.push(duration_reason(delta));
        }
        _ => {
            // Renormalize over the two signals we actually have.
            score = (title_sim * TITLE_WEIGHT + artist_sim * ARTIST_WEIGHT)
                / (TITLE_WEIGHT + ARTIST_WEIGHT);
            reasons.push("Duration comparison skipped (missing data).".to_string());
        }
    }

    MatchResult {
        track: candidate.clone(),
        confidence_score: score.clamp(0.0, 1.0),
        confidence_reasons: reasons,
    }
}

/// Score every candidate and sort by descending confidence.
///
/// Ties keep the order the store returned them in.
pub fn rank(query: &TrackQuery, candidates: &[TrackCandidate]) -> Vec<MatchResult> {
    let mut results: Vec<MatchResult> = candidates.iter().map(|c| score(query, c)).collect();
    results.sort_by(|a, b| {
        b.confidence_score
            .partial_cmp(&a.confidence_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results
}
