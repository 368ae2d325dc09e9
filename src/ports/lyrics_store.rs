use crate::models::{TrackCandidate, TrackQuery};

/// Which direct-lookup endpoint to hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupEndpoint {
    /// `/get`: may reach out to external sources, slower
    Full,
    /// `/get-cached`: only what the store already has
    Cached,
}

impl LookupEndpoint {
    pub fn path(&self) -> &'static str {
        match self {
            LookupEndpoint::Full => "get",
            LookupEndpoint::Cached => "get-cached",
        }
    }
}

/// Free-text search parameters. Every field is optional.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchParams {
    pub q: Option<String>,
    pub track_name: Option<String>,
    pub artist_name: Option<String>,
    pub album_name: Option<String>,
}

impl SearchParams {
    pub fn free_text(q: impl Into<String>) -> Self {
        Self {
            q: Some(q.into()),
            ..Default::default()
        }
    }

    /// Field hints taken from a query.
    pub fn from_query(query: &TrackQuery) -> Self {
        let non_empty = |s: &str| (!s.trim().is_empty()).then(|| s.to_string());
        Self {
            q: None,
            track_name: non_empty(&query.track_name),
            artist_name: non_empty(&query.artist_name),
            album_name: query.album().map(str::to_string),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LyricsError {
    #[error("lyrics store rate limit hit (HTTP 429)")]
    RateLimited,
    #[error("lyrics store returned HTTP {status} for /{endpoint}")]
    Status { status: u16, endpoint: String },
    #[error("lyrics store request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid lyrics store URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("unexpected lyrics store response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl LyricsError {
    pub fn is_rate_limited(&self) -> bool {
        match self {
            LyricsError::RateLimited => true,
            LyricsError::Status { status, .. } => *status == 429,
            LyricsError::Transport(e) => e.status().is_some_and(|s| s.as_u16() == 429),
            LyricsError::Url(_) | LyricsError::Decode(_) => false,
        }
    }
}

/// Port over the lyrics database used by the matching services.
///
/// Implementations live in `lrclib::client` (production) or test mocks.
/// A direct lookup that finds nothing is `Ok(None)`, not an error.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LyricsStore: Send + Sync {
    async fn get(
        &self,
        query: &TrackQuery,
        endpoint: LookupEndpoint,
    ) -> Result<Option<TrackCandidate>, LyricsError>;

    async fn search(&self, params: &SearchParams) -> Result<Vec<TrackCandidate>, LyricsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_params_from_query_skips_blank_fields() {
        let query = TrackQuery::new("Song", "").with_album("");
        let params = SearchParams::from_query(&query);

        assert_eq!(params.track_name.as_deref(), Some("Song"));
        assert_eq!(params.artist_name, None);
        assert_eq!(params.album_name, None);
        assert_eq!(params.q, None);
    }

    #[test]
    fn test_rate_limit_detection() {
        assert!(LyricsError::RateLimited.is_rate_limited());
        assert!(
            LyricsError::Status {
                status: 429,
                endpoint: "search".into()
            }
            .is_rate_limited()
        );
        assert!(
            !LyricsError::Status {
                status: 500,
                endpoint: "get".into()
            }
            .is_rate_limited()
        );
    }
}
