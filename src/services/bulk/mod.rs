//! Concurrent matching of a whole playlist.
//!
//! One coordinator owns the entry slice and is the only writer. It admits
//! entries in input order into a bounded `JoinSet` of resolution tasks and
//! applies each outcome as the task finishes, so completion order is free.
//! A 429 from the store pauses admissions batch-wide for a fixed backoff.

pub mod cancellation;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{Instrument, instrument};

pub use cancellation::CancellationSignal;

use crate::models::{
    BatchSummary, EntryStatus, EntryUpdate, MatchResult, PlaylistEntry, SearchStrategy,
    TrackCandidate, TrackQuery,
};
use crate::ports::lyrics_store::{LyricsError, LyricsStore};
use crate::services::matching::cleaning::retry_name;
use crate::services::matching::{confidence, find_best_match};

pub const DEFAULT_CONCURRENCY: usize = 3;
pub const DEFAULT_RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Maximum number of entries resolving at the same time
    pub concurrency: usize,
    /// Pause applied to the whole queue after a 429
    pub rate_limit_backoff: Duration,
    pub strategy: SearchStrategy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            rate_limit_backoff: DEFAULT_RATE_LIMIT_BACKOFF,
            strategy: SearchStrategy::default(),
        }
    }
}

/// What a single resolution task came back with.
#[derive(Debug)]
enum EntryOutcome {
    Found(TrackCandidate),
    NotFound,
    RateLimited,
    Failed(LyricsError),
    Cancelled,
}

impl From<LyricsError> for EntryOutcome {
    fn from(error: LyricsError) -> Self {
        if error.is_rate_limited() {
            EntryOutcome::RateLimited
        } else {
            EntryOutcome::Failed(error)
        }
    }
}

/// Best match for one entry, with a single cleaned-name retry.
async fn resolve_entry<S: LyricsStore + ?Sized>(
    store: &S,
    query: &TrackQuery,
    strategy: &SearchStrategy,
    cancel: &CancellationSignal,
) -> EntryOutcome {
    match find_best_match(store, query, strategy).await {
        Ok(Some(found)) => return EntryOutcome::Found(found),
        Ok(None) => {}
        Err(e) => return e.into(),
    }

    if cancel.is_cancelled() {
        return EntryOutcome::Cancelled;
    }

    let Some(cleaned) = retry_name(&query.track_name) else {
        return EntryOutcome::NotFound;
    };
    tracing::debug!(original = %query.track_name, %cleaned, "Retrying with cleaned track name");

    match find_best_match(store, &query.with_track_name(cleaned), strategy).await {
        Ok(Some(found)) => EntryOutcome::Found(found),
        Ok(None) => EntryOutcome::NotFound,
        Err(e) => e.into(),
    }
}

type Joined = Result<(usize, EntryOutcome), JoinError>;

pub struct BulkMatchScheduler<S: LyricsStore + 'static> {
    store: Arc<S>,
    config: SchedulerConfig,
    updates: Option<mpsc::UnboundedSender<EntryUpdate>>,
}

impl<S: LyricsStore + 'static> BulkMatchScheduler<S> {
    pub fn new(store: Arc<S>, config: SchedulerConfig) -> Self {
        Self {
            store,
            config,
            updates: None,
        }
    }

    /// Publish every entry status change on `tx`.
    pub fn with_updates(mut self, tx: mpsc::UnboundedSender<EntryUpdate>) -> Self {
        self.updates = Some(tx);
        self
    }

    /// Resolve every eligible entry in place.
    ///
    /// Entries already `Found` are skipped. A non-empty `selection` restricts
    /// the pass to those entry ids; the rest are left untouched. Returns once
    /// all admitted work has drained, including after cancellation.
    #[instrument(skip_all, fields(entries = entries.len(), selected = selection.len()))]
    pub async fn process(
        &self,
        entries: &mut [PlaylistEntry],
        selection: &HashSet<String>,
        cancel: &CancellationSignal,
    ) -> BatchSummary {
        let concurrency = self.config.concurrency.max(1);
        let mut in_flight: JoinSet<(usize, EntryOutcome)> = JoinSet::new();
        let mut paused = false;

        for index in 0..entries.len() {
            if cancel.is_cancelled() {
                break;
            }

            let entry = &entries[index];
            if !selection.is_empty() && !selection.contains(&entry.id) {
                continue;
            }
            if entry.status == EntryStatus::Found {
                continue;
            }

            while in_flight.len() >= concurrency {
                tokio::select! {
                    Some(joined) = in_flight.join_next() => {
                        paused |= self.apply(entries, joined, cancel);
                    }
                    _ = cancel.cancelled() => break,
                }
            }
            // A 429 may already sit finished behind the completion we just joined
            while let Some(joined) = in_flight.try_join_next() {
                paused |= self.apply(entries, joined, cancel);
            }
            if cancel.is_cancelled() {
                break;
            }

            if paused {
                tracing::warn!(
                    backoff = ?self.config.rate_limit_backoff,
                    "Rate limited by lyrics store, pausing queue"
                );
                self.back_off(entries, &mut in_flight, cancel).await;
                paused = false;
                if cancel.is_cancelled() {
                    break;
                }
            }

            self.set_status(entries, index, EntryStatus::Searching);

            let store = self.store.clone();
            let query = entries[index].query();
            let strategy = self.config.strategy;
            let task_cancel = cancel.clone();
            in_flight.spawn(
                async move {
                    let outcome = resolve_entry(store.as_ref(), &query, &strategy, &task_cancel).await;
                    (index, outcome)
                }
                .in_current_span(),
            );
        }

        while let Some(joined) = in_flight.join_next().await {
            self.apply(entries, joined, cancel);
        }

        // Anything still searching lost its task (panic) or was discarded.
        for index in 0..entries.len() {
            if entries[index].status == EntryStatus::Searching {
                self.set_status(entries, index, EntryStatus::Pending);
            }
        }

        let summary = BatchSummary::from_entries(entries, cancel.is_cancelled());
        tracing::info!(
            found = summary.found,
            not_found = summary.not_found,
            pending = summary.pending,
            cancelled = summary.cancelled,
            "Batch processing finished"
        );
        summary
    }

    /// Sleep out the rate-limit backoff while still collecting finished tasks.
    async fn back_off(
        &self,
        entries: &mut [PlaylistEntry],
        in_flight: &mut JoinSet<(usize, EntryOutcome)>,
        cancel: &CancellationSignal,
    ) {
        let sleep = tokio::time::sleep(self.config.rate_limit_backoff);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => break,
                _ = cancel.cancelled() => break,
                Some(joined) = in_flight.join_next() => {
                    self.apply(entries, joined, cancel);
                }
            }
        }
    }

    /// Write a task outcome into its entry. Returns true on a rate limit.
    fn apply(
        &self,
        entries: &mut [PlaylistEntry],
        joined: Joined,
        cancel: &CancellationSignal,
    ) -> bool {
        let (index, outcome) = match joined {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = ?e, "Entry resolution task failed");
                return false;
            }
        };

        if cancel.is_cancelled() {
            tracing::debug!(id = %entries[index].id, "Discarding result after cancellation");
            self.set_status(entries, index, EntryStatus::Pending);
            return false;
        }

        match outcome {
            EntryOutcome::Found(candidate) => {
                let result = confidence::score(&entries[index].query(), &candidate);
                tracing::info!(
                    id = %entries[index].id,
                    lyrics_id = candidate.id,
                    confidence = result.confidence_score,
                    "Lyrics found"
                );
                self.set_found(entries, index, result);
                false
            }
            EntryOutcome::NotFound => {
                tracing::info!(id = %entries[index].id, "No lyrics found");
                self.set_status(entries, index, EntryStatus::NotFound);
                false
            }
            EntryOutcome::RateLimited => {
                tracing::warn!(id = %entries[index].id, "Rate limited, entry requeued");
                self.set_status(entries, index, EntryStatus::Pending);
                true
            }
            EntryOutcome::Failed(e) => {
                tracing::warn!(id = %entries[index].id, error = %e, "Lookup failed");
                self.set_status(entries, index, EntryStatus::NotFound);
                false
            }
            EntryOutcome::Cancelled => {
                self.set_status(entries, index, EntryStatus::Pending);
                false
            }
        }
    }

    fn set_status(&self, entries: &mut [PlaylistEntry], index: usize, status: EntryStatus) {
        entries[index].status = status;
        self.emit(index, &entries[index]);
    }

    fn set_found(&self, entries: &mut [PlaylistEntry], index: usize, result: MatchResult) {
        entries[index].status = EntryStatus::Found;
        entries[index].match_data = Some(result);
        self.emit(index, &entries[index]);
    }

    fn emit(&self, index: usize, entry: &PlaylistEntry) {
        if let Some(tx) = &self.updates {
            // Nobody listening is fine.
            let _ = tx.send(EntryUpdate {
                index,
                id: entry.id.clone(),
                status: entry.status,
                match_data: entry.match_data.clone(),
            });
        }
    }
}
