use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;

use crate::error::BenchResult;

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("invalid probe url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("probe timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for ProbeError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(error.to_string())
        }
    }
}

/// Transport for one probe request. Only completion matters, not the response.
pub trait Probe: Send + Sync {
    fn probe(&self, url: &Url) -> impl Future<Output = Result<(), ProbeError>> + Send;
}

/// HEAD requests with caching disabled and no cookie store.
#[derive(Clone, Debug)]
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> BenchResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl Probe for HttpProbe {
    async fn probe(&self, url: &Url) -> Result<(), ProbeError> {
        // Any status counts; a 404 or 5xx still completes a round trip.
        self.client
            .head(url.clone())
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .send()
            .await?;
        Ok(())
    }
}

/// Appends `_t=<epoch-ms>&_r=<round>` so no cache along the path can answer.
pub fn cache_busting_url(url: &str, epoch_ms: i64, round: u32) -> Result<Url, ProbeError> {
    let mut parsed = Url::parse(url).map_err(|e| ProbeError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    parsed
        .query_pairs_mut()
        .append_pair("_t", &epoch_ms.to_string())
        .append_pair("_r", &round.to_string());
    Ok(parsed)
}

/// Runs one probe round and returns its elapsed milliseconds.
///
/// A failed round is never dropped: it yields `penalty_ms` on top of the
/// (near-zero) time measured from the failure, so it ranks as slow.
pub async fn sample_round<P: Probe>(probe: &P, url: &str, round: u32, penalty_ms: f64) -> f64 {
    let target = match cache_busting_url(url, Utc::now().timestamp_millis(), round) {
        Ok(target) => target,
        Err(error) => return penalty_sample(url, round, &error, penalty_ms),
    };

    let start = Instant::now();
    match probe.probe(&target).await {
        Ok(()) => {
            let elapsed = elapsed_ms(start);
            debug!(url, round, elapsed_ms = elapsed, "probe round");
            elapsed
        }
        Err(error) => penalty_sample(url, round, &error, penalty_ms),
    }
}

fn penalty_sample(url: &str, round: u32, error: &ProbeError, penalty_ms: f64) -> f64 {
    let resolved = Instant::now();
    let sample = elapsed_ms(resolved) + penalty_ms;
    warn!(url, round, %error, sample_ms = sample, "probe failed, penalty applied");
    sample
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_nanos() as f64 / 1_000_000.0
}
