//! Remote service health probe.
//!
//! One `GET` against the health endpoint, no retry. Anything other than a
//! `200` (with the expected `status` field, when configured) means the
//! remote is unreachable and the cycle must not start.

use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Unreachable { reason: String },
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }
}

#[derive(Debug, Deserialize)]
struct HealthBody {
    #[serde(default)]
    status: Option<String>,
}

pub struct HealthProber {
    http: Arc<dyn HttpClient>,
    url: String,
    expected_status: Option<String>,
    timeout: Duration,
}

impl HealthProber {
    pub fn new(http: Arc<dyn HttpClient>, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            url: url.into(),
            expected_status: None,
            timeout,
        }
    }

    /// Require the JSON body's `status` field to equal `status`.
    pub fn with_expected_status(mut self, status: Option<String>) -> Self {
        self.expected_status = status;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn probe(&self) -> HealthStatus {
        let request = HttpRequest::new(HttpMethod::Get, &self.url).timeout(self.timeout);

        let response = match self.http.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %self.url, error = %e, "Health check failed");
                return HealthStatus::Unreachable {
                    reason: e.to_string(),
                };
            }
        };

        if response.status != 200 {
            warn!(url = %self.url, status = response.status, "Health check returned non-200");
            return HealthStatus::Unreachable {
                reason: format!("HTTP {}", response.status),
            };
        }

        if let Some(expected) = &self.expected_status {
            let actual = response
                .json::<HealthBody>()
                .ok()
                .and_then(|body| body.status);
            if actual.as_deref() != Some(expected.as_str()) {
                warn!(url = %self.url, ?actual, %expected, "Unexpected health status");
                return HealthStatus::Unreachable {
                    reason: format!(
                        "expected status '{}', got {}",
                        expected,
                        actual.map(|s| format!("'{}'", s)).unwrap_or_else(|| "none".to_string())
                    ),
                };
            }
        }

        debug!(url = %self.url, "Remote service healthy");
        HealthStatus::Healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result};
    use bridge_traits::http::HttpResponse;
    use mockall::mock;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
        }
    }

    const URL: &str = "http://localhost:5005/health/";

    fn prober(http: MockHttpClient) -> HealthProber {
        HealthProber::new(Arc::new(http), URL, Duration::from_secs(2))
    }

    #[tokio::test]
    async fn test_200_is_healthy() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| {
                req.method == HttpMethod::Get
                    && req.url == URL
                    && req.timeout == Some(Duration::from_secs(2))
            })
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, "{}")));

        assert_eq!(prober(http).probe().await, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn test_non_200_is_unreachable_without_retry() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Ok(HttpResponse::new(503, "")));

        let status = prober(http).probe().await;
        assert_eq!(
            status,
            HealthStatus::Unreachable {
                reason: "HTTP 503".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_timeout_is_unreachable() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Err(BridgeError::Timeout(Duration::from_secs(2))));

        assert!(!prober(http).probe().await.is_healthy());
    }

    #[tokio::test]
    async fn test_expected_status_field() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .times(2)
            .returning(|_| Ok(HttpResponse::new(200, r#"{"status": "Server is running"}"#)));
        let prober = prober(http);

        let strict = HealthProber {
            expected_status: Some("Server is running".to_string()),
            ..prober
        };
        assert!(strict.probe().await.is_healthy());

        let wrong = HealthProber {
            expected_status: Some("ready".to_string()),
            ..strict
        };
        assert!(!wrong.probe().await.is_healthy());
    }

    #[tokio::test]
    async fn test_expected_status_with_non_json_body() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .returning(|_| Ok(HttpResponse::new(200, "OK")));

        let prober = prober(http).with_expected_status(Some("Server is running".to_string()));
        match prober.probe().await {
            HealthStatus::Unreachable { reason } => assert!(reason.contains("none")),
            other => panic!("unexpected status: {other:?}"),
        }
    }
}
