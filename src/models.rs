use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What the user is looking for. Every field except the names is optional
/// because playlists rarely carry complete metadata.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackQuery {
    pub track_name: String,
    pub artist_name: String,
    pub album_name: Option<String>,
    /// Duration in seconds
    pub duration: Option<f64>,
}

impl TrackQuery {
    pub fn new(track_name: impl Into<String>, artist_name: impl Into<String>) -> Self {
        Self {
            track_name: track_name.into(),
            artist_name: artist_name.into(),
            album_name: None,
            duration: None,
        }
    }

    pub fn with_album(mut self, album_name: impl Into<String>) -> Self {
        self.album_name = Some(album_name.into());
        self
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Same query with a different track name (used by the cleaned-name retry).
    pub fn with_track_name(&self, track_name: impl Into<String>) -> Self {
        Self {
            track_name: track_name.into(),
            ..self.clone()
        }
    }

    /// Album name, treating an empty string the same as no album.
    pub fn album(&self) -> Option<&str> {
        self.album_name.as_deref().filter(|a| !a.trim().is_empty())
    }
}

/// A record from the lyrics store (LRCLIB wire shape).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackCandidate {
    pub id: i64,
    pub track_name: String,
    pub artist_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub album_name: String,
    /// Duration in seconds, 0 when the store does not know it
    #[serde(default, deserialize_with = "null_as_default")]
    pub duration: f64,
    #[serde(default)]
    pub instrumental: bool,
    #[serde(default)]
    pub plain_lyrics: Option<String>,
    #[serde(default)]
    pub synced_lyrics: Option<String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl TrackCandidate {
    pub fn has_synced_lyrics(&self) -> bool {
        self.synced_lyrics.as_deref().is_some_and(|s| !s.is_empty())
    }

    pub fn has_plain_lyrics(&self) -> bool {
        self.plain_lyrics.as_deref().is_some_and(|s| !s.is_empty())
    }
}

/// Scored candidate. Reasons are in evaluation order: title, artist, duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub track: TrackCandidate,
    pub confidence_score: f64,
    pub confidence_reasons: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchMode {
    /// Direct lookup, falling back to search when external lookups are disabled
    Exact,
    /// Free-text search only
    #[default]
    Fuzzy,
    /// Direct lookup against the cache-only endpoint
    Cached,
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SearchMode::Exact => "exact",
            SearchMode::Fuzzy => "fuzzy",
            SearchMode::Cached => "cached",
        };
        f.write_str(s)
    }
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "exact" => Ok(SearchMode::Exact),
            "fuzzy" => Ok(SearchMode::Fuzzy),
            "cached" => Ok(SearchMode::Cached),
            other => Err(format!(
                "unknown search mode `{}` (expected exact, fuzzy or cached)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchStrategy {
    pub mode: SearchMode,
    /// Use the full `/get` endpoint (which may query external sources)
    /// instead of `/get-cached`.
    pub try_external: bool,
}

impl Default for SearchStrategy {
    fn default() -> Self {
        Self {
            mode: SearchMode::Fuzzy,
            try_external: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    #[default]
    Pending,
    Searching,
    Found,
    NotFound,
    Error,
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryStatus::Pending => "pending",
            EntryStatus::Searching => "searching",
            EntryStatus::Found => "found",
            EntryStatus::NotFound => "not_found",
            EntryStatus::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistEntry {
    pub id: String,
    pub track_name: String,
    pub artist_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default)]
    pub status: EntryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_data: Option<MatchResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl PlaylistEntry {
    pub fn new(
        id: impl Into<String>,
        track_name: impl Into<String>,
        artist_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            track_name: track_name.into(),
            artist_name: artist_name.into(),
            album_name: None,
            duration: None,
            status: EntryStatus::Pending,
            match_data: None,
            file_name: None,
        }
    }

    pub fn query(&self) -> TrackQuery {
        TrackQuery {
            track_name: self.track_name.clone(),
            artist_name: self.artist_name.clone(),
            album_name: self.album_name.clone(),
            duration: self.duration,
        }
    }
}

/// Progress event emitted by the bulk scheduler whenever an entry changes.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryUpdate {
    pub index: usize,
    pub id: String,
    pub status: EntryStatus,
    pub match_data: Option<MatchResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchSummary {
    pub total: usize,
    pub found: usize,
    pub not_found: usize,
    pub pending: usize,
    pub cancelled: bool,
}

impl BatchSummary {
    pub fn from_entries(entries: &[PlaylistEntry], cancelled: bool) -> Self {
        let count = |status: EntryStatus| entries.iter().filter(|e| e.status == status).count();
        Self {
            total: entries.len(),
            found: count(EntryStatus::Found),
            not_found: count(EntryStatus::NotFound),
            pending: count(EntryStatus::Pending),
            cancelled,
        }
    }

    /// Share of entries that reached a terminal verdict, in percent.
    pub fn progress(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.found + self.not_found) as f64 / self.total as f64 * 100.0
    }
}
