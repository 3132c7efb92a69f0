//! Tag search against the remote catalog.

use crate::error::{Result, SyncError};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_SEARCH_LIMIT: u32 = 5;

pub struct SearchClient {
    http: Arc<dyn HttpClient>,
    url: String,
    timeout: Duration,
}

impl SearchClient {
    pub fn new(http: Arc<dyn HttpClient>, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http,
            url: url.into(),
            timeout,
        }
    }

    fn query_url(&self, tags: &str, limit: u32) -> String {
        format!(
            "{}?tags={}&limit={}",
            self.url,
            urlencoding::encode(tags),
            limit
        )
    }

    /// Paths of up to `limit` tracks whose tags match `tags`.
    pub async fn search_by_tags(&self, tags: &str, limit: u32) -> Result<Vec<String>> {
        let url = self.query_url(tags, limit);
        debug!(%url, "Searching tracks by tags");

        let response = self
            .http
            .execute(HttpRequest::new(HttpMethod::Get, &url).timeout(self.timeout))
            .await?;

        if !response.is_success() {
            return Err(SyncError::UnexpectedStatus {
                url,
                status: response.status,
            });
        }

        Ok(response.json::<Vec<String>>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::HttpResponse;
    use mockall::mock;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    fn search(http: MockHttpClient) -> SearchClient {
        SearchClient::new(
            Arc::new(http),
            "http://remote/search_tracks/",
            Duration::from_secs(5),
        )
    }

    #[tokio::test]
    async fn test_query_is_url_encoded() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .withf(|req| {
                req.method == HttpMethod::Get
                    && req.url == "http://remote/search_tracks/?tags=indie%20rock%2C%20live&limit=3"
            })
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, r#"["a/b.mp3", "c.flac"]"#)));

        let paths = search(http).search_by_tags("indie rock, live", 3).await.unwrap();
        assert_eq!(paths, vec!["a/b.mp3".to_string(), "c.flac".to_string()]);
    }

    #[tokio::test]
    async fn test_error_status() {
        let mut http = MockHttpClient::new();
        http.expect_execute()
            .returning(|_| Ok(HttpResponse::new(404, "")));

        let err = search(http).search_by_tags("jazz", 5).await.unwrap_err();
        assert!(matches!(err, SyncError::UnexpectedStatus { status: 404, .. }));
    }
}
