//! LRCLIB API adapter for the `LyricsStore` port.
//!
//! API documentation: https://lrclib.net/docs

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use color_eyre::Result;
use color_eyre::eyre::Context;
use governor::{
    Quota, RateLimiter, clock::DefaultClock, state::InMemoryState, state::direct::NotKeyed,
};
use reqwest::{Response, StatusCode};
use url::Url;

use crate::config::LrclibConfig;
use crate::models::{TrackCandidate, TrackQuery};
use crate::ports::lyrics_store::{LookupEndpoint, LyricsError, LyricsStore, SearchParams};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

#[derive(Debug, Clone)]
pub struct LrclibClient {
    http: reqwest::Client,
    base_url: Url,
    rate_limiter: Option<Arc<DirectRateLimiter>>,
}

impl LrclibClient {
    pub fn new(config: &LrclibConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .wrap_err("Failed to build LRCLIB HTTP client")?;

        let mut base_url = Url::parse(&config.base_url)
            .wrap_err_with(|| format!("Invalid LRCLIB base URL: {}", config.base_url))?;
        // `Url::join` replaces the last segment unless the path ends with '/'
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let rate_limiter = config
            .requests_per_second
            .and_then(NonZeroU32::new)
            .map(|rps| Arc::new(RateLimiter::direct(Quota::per_second(rps))));

        tracing::debug!(
            base_url = %base_url,
            requests_per_second = ?config.requests_per_second,
            "LRCLIB client configured"
        );

        Ok(Self {
            http,
            base_url,
            rate_limiter,
        })
    }

    pub fn lookup_url(
        &self,
        query: &TrackQuery,
        endpoint: LookupEndpoint,
    ) -> Result<Url, LyricsError> {
        let mut url = self.base_url.join(endpoint.path())?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("track_name", &query.track_name);
            pairs.append_pair("artist_name", &query.artist_name);
            // the endpoint requires a duration; 0 when unknown
            let duration = query.duration.map(|d| d.round() as i64).unwrap_or(0);
            pairs.append_pair("duration", &duration.to_string());
            if let Some(album) = query.album() {
                pairs.append_pair("album_name", album);
            }
        }
        Ok(url)
    }

    pub fn search_url(&self, params: &SearchParams) -> Result<Url, LyricsError> {
        let mut url = self.base_url.join("search")?;
        {
            let mut pairs = url.query_pairs_mut();
            let fields = [
                ("q", &params.q),
                ("track_name", &params.track_name),
                ("artist_name", &params.artist_name),
                ("album_name", &params.album_name),
            ];
            for (key, value) in fields {
                if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                    pairs.append_pair(key, value);
                }
            }
        }
        Ok(url)
    }

    async fn send(&self, url: Url) -> Result<Response, LyricsError> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }
        tracing::debug!(%url, "LRCLIB request");
        Ok(self.http.get(url).send().await?)
    }
}

fn status_error(status: StatusCode, endpoint: &str) -> LyricsError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        LyricsError::RateLimited
    } else {
        LyricsError::Status {
            status: status.as_u16(),
            endpoint: endpoint.to_string(),
        }
    }
}

/// Direct lookup response: a record on 2xx, nothing on 404, an error otherwise.
fn lookup_result(
    status: StatusCode,
    endpoint: LookupEndpoint,
    body: &str,
) -> Result<Option<TrackCandidate>, LyricsError> {
    match status {
        status if status.is_success() => Ok(Some(serde_json::from_str(body)?)),
        StatusCode::NOT_FOUND => Ok(None),
        status => Err(status_error(status, endpoint.path())),
    }
}

fn search_result(status: StatusCode, body: &str) -> Result<Vec<TrackCandidate>, LyricsError> {
    if !status.is_success() {
        return Err(status_error(status, "search"));
    }
    Ok(serde_json::from_str(body)?)
}

#[async_trait::async_trait]
impl LyricsStore for LrclibClient {
    async fn get(
        &self,
        query: &TrackQuery,
        endpoint: LookupEndpoint,
    ) -> Result<Option<TrackCandidate>, LyricsError> {
        let url = self.lookup_url(query, endpoint)?;
        let response = self.send(url).await?;
        let status = response.status();
        let body = response.text().await?;
        lookup_result(status, endpoint, &body)
    }

    async fn search(&self, params: &SearchParams) -> Result<Vec<TrackCandidate>, LyricsError> {
        let url = self.search_url(params)?;
        let response = self.send(url).await?;
        let status = response.status();
        let body = response.text().await?;
        search_result(status, &body)
    }
}
