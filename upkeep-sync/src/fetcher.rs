//! Content fetcher: one blocking GET per address, no retry.
//!
//! Every failure mode (transport error, timeout, non-2xx status, unreadable
//! body) collapses to [`FetchResult::Absent`]. The cause is only logged.

use std::time::Duration;

/// What a fetch produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    Content(String),
    Absent,
}

impl FetchResult {
    pub fn is_absent(&self) -> bool {
        matches!(self, FetchResult::Absent)
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            FetchResult::Content(text) => Some(text),
            FetchResult::Absent => None,
        }
    }
}

impl From<Option<String>> for FetchResult {
    fn from(value: Option<String>) -> Self {
        value.map_or(FetchResult::Absent, FetchResult::Content)
    }
}

/// Retrieves raw content from a resolved address.
pub trait Fetcher {
    fn fetch(&self, address: &str) -> FetchResult;
}

impl<F: Fetcher + ?Sized> Fetcher for &F {
    fn fetch(&self, address: &str) -> FetchResult {
        (**self).fetch(address)
    }
}

/// [`Fetcher`] over plain HTTPS using a blocking `ureq` agent.
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("upkeep/", env!("CARGO_PKG_VERSION")))
            .build();
        Self { agent }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, address: &str) -> FetchResult {
        tracing::debug!("GET {address}");
        match self.agent.get(address).call() {
            Ok(response) => match response.into_string() {
                Ok(body) => FetchResult::Content(body),
                Err(e) => {
                    tracing::warn!("could not read body of {address}: {e}");
                    FetchResult::Absent
                }
            },
            Err(ureq::Error::Status(code, _)) => {
                tracing::warn!("GET {address} returned HTTP {code}");
                FetchResult::Absent
            }
            Err(ureq::Error::Transport(e)) => {
                tracing::warn!("GET {address} failed: {e}");
                FetchResult::Absent
            }
        }
    }
}
