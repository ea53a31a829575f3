//! Read-only endpoint selection
//!
//! Candidates are probed in list order and the first live one is cached for the
//! lifetime of the selector. A failing candidate is logged and skipped; the scan
//! runs once per call and is never retried automatically.

use crate::error::ClientError;
use crate::types::CallRequest;
use alloy::network::Ethereum;
use alloy::primitives::Bytes;
use alloy::providers::{Provider, ProviderBuilder, RootProvider};
use alloy::transports::http::reqwest::Url;
use async_trait::async_trait;
use eyre::{Context, Result};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

/// A read-only JSON-RPC connection
#[async_trait]
pub trait ReadEndpoint: Send + Sync {
    /// URL this endpoint was opened for
    fn url(&self) -> &str;

    /// Current chain head; used as the liveness probe
    async fn block_number(&self) -> Result<u64>;

    /// `eth_call` against the latest block
    async fn call(&self, request: &CallRequest) -> Result<Bytes>;
}

/// Opens read endpoints by URL
pub trait EndpointConnector: Send + Sync {
    fn open(&self, url: &str) -> Result<Arc<dyn ReadEndpoint>>;
}

/// HTTP JSON-RPC endpoint backed by an alloy provider
pub struct HttpEndpoint {
    url: String,
    provider: RootProvider<Ethereum>,
}

impl HttpEndpoint {
    pub fn new(url: &str) -> Result<Self> {
        let parsed: Url = url.parse().context("Invalid RPC URL")?;
        // Read-only provider without fillers (we only do eth_call operations)
        let provider = ProviderBuilder::new()
            .disable_recommended_fillers()
            .network::<Ethereum>()
            .connect_http(parsed);

        Ok(Self {
            url: url.to_string(),
            provider,
        })
    }
}

#[async_trait]
impl ReadEndpoint for HttpEndpoint {
    fn url(&self) -> &str {
        &self.url
    }

    async fn block_number(&self) -> Result<u64> {
        self.provider
            .get_block_number()
            .await
            .context("Failed to get block number")
    }

    async fn call(&self, request: &CallRequest) -> Result<Bytes> {
        self.provider
            .call(request.to_rpc())
            .await
            .context("eth_call failed")
    }
}

/// Connector producing [`HttpEndpoint`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpConnector;

impl EndpointConnector for HttpConnector {
    fn open(&self, url: &str) -> Result<Arc<dyn ReadEndpoint>> {
        Ok(Arc::new(HttpEndpoint::new(url)?))
    }
}

/// A configured read endpoint; lower priority is tried first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointCandidate {
    pub url: String,
    pub priority: usize,
}

/// Picks and caches one live read endpoint from an ordered candidate list
pub struct EndpointSelector {
    candidates: Vec<EndpointCandidate>,
    connector: Arc<dyn EndpointConnector>,
    probe_timeout: Duration,
    cached: Mutex<Option<Arc<dyn ReadEndpoint>>>,
}

impl EndpointSelector {
    pub fn new<'a>(
        urls: impl IntoIterator<Item = &'a str>,
        connector: Arc<dyn EndpointConnector>,
        probe_timeout: Duration,
    ) -> Self {
        let candidates = urls
            .into_iter()
            .enumerate()
            .map(|(priority, url)| EndpointCandidate {
                url: url.to_string(),
                priority,
            })
            .collect();

        Self {
            candidates,
            connector,
            probe_timeout,
            cached: Mutex::new(None),
        }
    }

    pub fn candidates(&self) -> &[EndpointCandidate] {
        &self.candidates
    }

    /// The cached endpoint, if a scan has succeeded
    pub fn cached(&self) -> Option<Arc<dyn ReadEndpoint>> {
        self.cached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Return the cached endpoint or scan the candidates for a live one
    pub async fn connection(&self) -> Result<Arc<dyn ReadEndpoint>, ClientError> {
        if let Some(endpoint) = self.cached() {
            return Ok(endpoint);
        }

        for candidate in &self.candidates {
            match self.probe(candidate).await {
                Ok(endpoint) => return Ok(self.store(endpoint)),
                Err(e) => warn!(
                    url = %candidate.url,
                    error = %format!("{e:#}"),
                    "Read endpoint failed liveness probe"
                ),
            }
        }

        Err(ClientError::NoReachableEndpoint)
    }

    /// Drop the cached endpoint so the next read rescans
    pub fn invalidate(&self) {
        self.cached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    async fn probe(&self, candidate: &EndpointCandidate) -> Result<Arc<dyn ReadEndpoint>> {
        let endpoint = self.connector.open(&candidate.url)?;
        let head = tokio::time::timeout(self.probe_timeout, endpoint.block_number())
            .await
            .with_context(|| format!("Probe timed out after {:?}", self.probe_timeout))??;

        debug!(url = %candidate.url, head, "Read endpoint is live");
        Ok(endpoint)
    }

    /// First writer wins; a concurrent scan that finishes later reuses the winner
    fn store(&self, endpoint: Arc<dyn ReadEndpoint>) -> Arc<dyn ReadEndpoint> {
        self.cached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_or_insert(endpoint)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{SpyConnector, SpyEndpoint};

    fn selector(connector: &Arc<SpyConnector>, urls: &[&str]) -> EndpointSelector {
        EndpointSelector::new(
            urls.iter().copied(),
            connector.clone(),
            Duration::from_millis(200),
        )
    }

    #[tokio::test]
    async fn test_first_live_candidate_wins() {
        let connector = Arc::new(
            SpyConnector::new()
                .with(SpyEndpoint::dead("https://a.example"))
                .with(SpyEndpoint::live("https://b.example"))
                .with(SpyEndpoint::live("https://c.example")),
        );
        let selector = selector(
            &connector,
            &["https://a.example", "https://b.example", "https://c.example"],
        );

        let endpoint = selector.connection().await.unwrap();
        assert_eq!(endpoint.url(), "https://b.example");
        assert_eq!(connector.opened(), ["https://a.example", "https://b.example"]);
        assert_eq!(connector.endpoint("https://c.example").probes(), 0);
    }

    #[tokio::test]
    async fn test_connection_is_cached() {
        let connector = Arc::new(SpyConnector::new().with(SpyEndpoint::live("https://a.example")));
        let selector = selector(&connector, &["https://a.example"]);

        selector.connection().await.unwrap();
        selector.connection().await.unwrap();

        assert_eq!(connector.opened().len(), 1);
        assert_eq!(connector.endpoint("https://a.example").probes(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_rescan() {
        let connector = Arc::new(SpyConnector::new().with(SpyEndpoint::live("https://a.example")));
        let selector = selector(&connector, &["https://a.example"]);

        selector.connection().await.unwrap();
        selector.invalidate();
        assert!(selector.cached().is_none());
        selector.connection().await.unwrap();

        assert_eq!(connector.opened().len(), 2);
    }

    #[tokio::test]
    async fn test_unopenable_and_slow_candidates_are_skipped() {
        let connector = Arc::new(
            SpyConnector::new()
                .with(SpyEndpoint::stalled("https://slow.example"))
                .with(SpyEndpoint::live("https://ok.example")),
        );
        let selector = selector(
            &connector,
            &["https://unknown.example", "https://slow.example", "https://ok.example"],
        );

        let endpoint = selector.connection().await.unwrap();
        assert_eq!(endpoint.url(), "https://ok.example");
    }

    #[tokio::test]
    async fn test_no_reachable_endpoint() {
        let connector = Arc::new(
            SpyConnector::new()
                .with(SpyEndpoint::dead("https://a.example"))
                .with(SpyEndpoint::dead("https://b.example")),
        );
        let selector = selector(&connector, &["https://a.example", "https://b.example"]);

        let Err(err) = selector.connection().await else {
            panic!("expected NoReachableEndpoint");
        };
        assert!(matches!(err, ClientError::NoReachableEndpoint));
        assert!(selector.cached().is_none());
    }

    #[tokio::test]
    async fn test_concurrent_scans_share_first_stored_endpoint() {
        let connector = Arc::new(
            SpyConnector::new()
                .opening_fresh()
                .with(SpyEndpoint::slow("https://a.example", Duration::from_millis(20))),
        );
        let selector = selector(&connector, &["https://a.example"]);

        let (first, second) = tokio::join!(selector.connection(), selector.connection());
        let (Ok(first), Ok(second)) = (first, second) else {
            panic!("both scans should find the live endpoint");
        };

        assert_eq!(connector.opened().len(), 2);
        assert!(Arc::ptr_eq(&first, &second));
        let Some(cached) = selector.cached() else {
            panic!("expected a cached endpoint");
        };
        assert!(Arc::ptr_eq(&cached, &first));
    }

    #[test]
    fn test_candidates_keep_list_order() {
        let connector = Arc::new(SpyConnector::new());
        let selector = selector(&connector, &["https://a.example", "https://b.example"]);
        let priorities: Vec<_> = selector
            .candidates()
            .iter()
            .map(|c| (c.url.as_str(), c.priority))
            .collect();
        assert_eq!(priorities, [("https://a.example", 0), ("https://b.example", 1)]);
    }

    #[test]
    fn test_http_endpoint_rejects_bad_url() {
        assert!(HttpConnector.open("not a url").is_err());
    }
}
