use crate::utils::error::{ExportError, Result};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

/// Single GET + JSON decode. No retries at this layer.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    host: String,
}

impl HttpFetcher {
    pub fn new(host: impl Into<String>) -> Self {
        Self::with_client(Client::new(), host)
    }

    pub fn with_client(client: Client, host: impl Into<String>) -> Self {
        let host = host.into().trim_end_matches('/').to_string();
        Self { client, host }
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.host, path)
    }

    pub async fn fetch<T: DeserializeOwned>(
        &self,
        cancel: &CancellationToken,
        path: &str,
    ) -> Result<T> {
        if cancel.is_cancelled() {
            return Err(ExportError::Cancelled);
        }

        tokio::select! {
            result = self.fetch_once(path) => result,
            _ = cancel.cancelled() => Err(ExportError::Cancelled),
        }
    }

    async fn fetch_once<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url_for(path);
        tracing::debug!("📡 GET {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        tracing::debug!("📡 {} -> {}", path, status);

        if is_rate_limited(status) {
            return Err(ExportError::RateLimited);
        }
        if status.as_u16() >= 400 {
            return Err(ExportError::HttpStatus {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|source| ExportError::Decode {
            path: path.to_string(),
            source,
        })
    }
}

fn is_rate_limited(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::BAD_GATEWAY
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Record;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_fetch_decodes_json_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/communities");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!([{"communityId": "vectorDAO"}]));
        });

        let fetcher = HttpFetcher::new(server.base_url());
        let records: Vec<Record> = fetcher
            .fetch(&CancellationToken::new(), "/communities")
            .await
            .unwrap();

        mock.assert();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].data["communityId"], "vectorDAO");
    }

    #[tokio::test]
    async fn test_429_and_502_are_rate_limited() {
        let server = MockServer::start();
        let throttled = server.mock(|when, then| {
            when.method(GET).path("/throttled");
            then.status(429);
        });
        let gateway = server.mock(|when, then| {
            when.method(GET).path("/gateway");
            then.status(502);
        });

        let fetcher = HttpFetcher::new(server.base_url());
        let cancel = CancellationToken::new();

        let err = fetcher.fetch::<Vec<Record>>(&cancel, "/throttled").await.unwrap_err();
        assert!(matches!(err, ExportError::RateLimited));
        let err = fetcher.fetch::<Vec<Record>>(&cancel, "/gateway").await.unwrap_err();
        assert!(matches!(err, ExportError::RateLimited));

        throttled.assert();
        gateway.assert();
    }

    #[tokio::test]
    async fn test_other_errors_carry_status_and_path() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/token/9/owners");
            then.status(404);
        });

        let fetcher = HttpFetcher::new(server.base_url());
        let err = fetcher
            .fetch::<Vec<Record>>(&CancellationToken::new(), "/token/9/owners")
            .await
            .unwrap_err();

        match err {
            ExportError::HttpStatus { status, path } => {
                assert_eq!(status, 404);
                assert_eq!(path, "/token/9/owners");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/communities");
            then.status(200).body("<html>oops</html>");
        });

        let fetcher = HttpFetcher::new(server.base_url());
        let err = fetcher
            .fetch::<Vec<Record>>(&CancellationToken::new(), "/communities")
            .await
            .unwrap_err();

        assert!(matches!(err, ExportError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_cancelled_token_skips_request() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/communities");
            then.status(200).json_body(serde_json::json!([]));
        });

        let cancel = CancellationToken::new();
        cancel.cancel();
        let fetcher = HttpFetcher::new(server.base_url());
        let err = fetcher.fetch::<Vec<Record>>(&cancel, "/communities").await.unwrap_err();

        assert!(matches!(err, ExportError::Cancelled));
        assert_eq!(mock.hits(), 0);
    }

    #[test]
    fn test_url_for_trims_trailing_slash() {
        let fetcher = HttpFetcher::new("https://api.mintkudos.xyz/");
        assert_eq!(
            fetcher.url_for("/v1/tokens?offset=0&limit=1000"),
            "https://api.mintkudos.xyz/v1/tokens?offset=0&limit=1000"
        );
    }
}
