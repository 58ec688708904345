//! Rate source trait and implementations.

use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, warn};

use crate::error::{FxError, FxResult};

/// Trait for feed sources.
///
/// A source makes exactly one attempt per call. Retrying is the caller's
/// decision, and the engine never does.
pub trait RateSource: Send + Sync {
    /// Get the source name.
    fn name(&self) -> &str;

    /// Fetch the raw feed document.
    fn fetch(&self) -> FxResult<Vec<u8>>;
}

/// Fetches the feed with a single bounded HTTP GET.
pub struct HttpRateSource {
    url: String,
    client: Client,
}

impl HttpRateSource {
    /// Create a source for `url` whose requests give up after `timeout`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> FxResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("fxrates/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FxError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl RateSource for HttpRateSource {
    fn name(&self) -> &str {
        "HTTP"
    }

    fn fetch(&self) -> FxResult<Vec<u8>> {
        debug!(url = %self.url, "Fetching feed");

        let response = self
            .client
            .get(&self.url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                warn!(url = %self.url, error = %e, "Feed request failed");
                FxError::Transport(e.to_string())
            })?;

        let body = response
            .bytes()
            .map_err(|e| FxError::Transport(format!("Failed to read feed body: {}", e)))?;

        debug!(bytes = body.len(), "Feed received");
        Ok(body.to_vec())
    }
}

/// Scripted source for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockRateSource {
    payload: parking_lot::Mutex<Option<Vec<u8>>>,
    calls: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockRateSource {
    /// A source that always fails with a transport error.
    pub fn offline() -> Self {
        Self {
            payload: parking_lot::Mutex::new(None),
            calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// A source that serves `payload` on every call.
    pub fn serving(payload: impl Into<Vec<u8>>) -> Self {
        let source = Self::offline();
        source.set_payload(payload);
        source
    }

    /// Serve `payload` from now on.
    pub fn set_payload(&self, payload: impl Into<Vec<u8>>) {
        *self.payload.lock() = Some(payload.into());
    }

    /// Fail every call from now on.
    pub fn go_offline(&self) {
        *self.payload.lock() = None;
    }

    /// Number of fetch attempts so far.
    pub fn calls(&self) -> usize {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl RateSource for MockRateSource {
    fn name(&self) -> &str {
        "MOCK"
    }

    fn fetch(&self) -> FxResult<Vec<u8>> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.payload
            .lock()
            .clone()
            .ok_or_else(|| FxError::Transport("mock source is offline".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_source_counts_calls() {
        let source = MockRateSource::serving("<DataSet/>");
        assert_eq!(source.fetch().unwrap(), b"<DataSet/>".to_vec());

        source.go_offline();
        assert!(matches!(source.fetch(), Err(FxError::Transport(_))));
        assert_eq!(source.calls(), 2);
    }

    #[test]
    fn test_http_source_unreachable_is_transport_error() {
        let source = HttpRateSource::new("http://127.0.0.1:1/nbrfxrates.xml", Duration::from_secs(2))
            .unwrap();

        assert!(matches!(source.fetch(), Err(FxError::Transport(_))));
    }

    #[test]
    fn test_http_error_status_is_transport_error() {
        let url = test_server::respond_once("HTTP/1.1 503 Service Unavailable");
        let source = HttpRateSource::new(url.clone(), Duration::from_secs(5)).unwrap();
        assert_eq!(source.url(), url);

        match source.fetch() {
            Err(FxError::Transport(message)) => assert!(message.contains("503")),
            other => panic!("expected transport error, got {:?}", other),
        }
    }

    #[test]
    fn test_http_source_invalid_url_is_transport_error() {
        let source = HttpRateSource::new("not a url", Duration::from_secs(2)).unwrap();

        assert!(matches!(source.fetch(), Err(FxError::Transport(_))));
    }
}
