use tracing::instrument;

use crate::models::{MatchResult, SearchMode, SearchStrategy, TrackCandidate, TrackQuery};
use crate::ports::lyrics_store::{LookupEndpoint, LyricsError, LyricsStore, SearchParams};

use super::cleaning::retry_name;
use super::confidence;

/// Endpoint used for the direct lookup, or `None` when the mode skips it.
fn direct_lookup_endpoint(strategy: &SearchStrategy) -> Option<LookupEndpoint> {
    match strategy.mode {
        SearchMode::Cached => Some(LookupEndpoint::Cached),
        SearchMode::Exact if strategy.try_external => Some(LookupEndpoint::Full),
        SearchMode::Exact => Some(LookupEndpoint::Cached),
        SearchMode::Fuzzy => None,
    }
}

/// Whether the free-text search runs after the direct lookup came up empty.
fn falls_back_to_search(strategy: &SearchStrategy) -> bool {
    match strategy.mode {
        SearchMode::Fuzzy => true,
        SearchMode::Exact => !strategy.try_external,
        SearchMode::Cached => false,
    }
}

/// Resolve the single best candidate for a query.
///
/// Search responses with several results are ranked by confidence and the
/// top one wins. Store errors (including 429) are returned to the caller;
/// only "nothing found" is `Ok(None)`.
#[instrument(skip(store), fields(track = %query.track_name, artist = %query.artist_name))]
pub async fn find_best_match<S: LyricsStore + ?Sized>(
    store: &S,
    query: &TrackQuery,
    strategy: &SearchStrategy,
) -> Result<Option<TrackCandidate>, LyricsError> {
    if let Some(endpoint) = direct_lookup_endpoint(strategy) {
        if let Some(found) = store.get(query, endpoint).await? {
            tracing::debug!(id = found.id, ?endpoint, "Direct lookup hit");
            return Ok(Some(found));
        }
        tracing::debug!(?endpoint, "Direct lookup found nothing");
    }

    if falls_back_to_search(strategy) {
        let results = store.search(&SearchParams::from_query(query)).await?;
        tracing::debug!(results = results.len(), "Search returned candidates");

        let best = confidence::rank(query, &results)
            .into_iter()
            .next()
            .map(|r| r.track);
        return Ok(best);
    }

    Ok(None)
}

/// `find_best_match`, retried once with a cleaned track name when the first
/// attempt finds nothing.
pub async fn find_best_match_with_retry<S: LyricsStore + ?Sized>(
    store: &S,
    query: &TrackQuery,
    strategy: &SearchStrategy,
) -> Result<Option<TrackCandidate>, LyricsError> {
    if let Some(found) = find_best_match(store, query, strategy).await? {
        return Ok(Some(found));
    }

    match retry_name(&query.track_name) {
        Some(cleaned) => {
            tracing::debug!(original = %query.track_name, %cleaned, "Retrying with cleaned track name");
            find_best_match(store, &query.with_track_name(cleaned), strategy).await
        }
        None => Ok(None),
    }
}

/// Single-song search: best match (with cleaned retry) scored against the
/// original query.
#[instrument(skip(store))]
pub async fn search_single<S: LyricsStore + ?Sized>(
    store: &S,
    query: &TrackQuery,
    strategy: &SearchStrategy,
) -> Result<Option<MatchResult>, LyricsError> {
    let found = find_best_match_with_retry(store, query, strategy).await?;
    Ok(found.map(|candidate| confidence::score(query, &candidate)))
}

/// Free-text search with every result ranked against `query`.
#[instrument(skip(store))]
pub async fn search_ranked<S: LyricsStore + ?Sized>(
    store: &S,
    free_text: &str,
    query: &TrackQuery,
) -> Result<Vec<MatchResult>, LyricsError> {
    let results = store.search(&SearchParams::free_text(free_text)).await?;
    Ok(confidence::rank(query, &results))
}
