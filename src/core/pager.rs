use crate::core::fetcher::HttpFetcher;
use crate::core::retry::{with_retry, BackoffPolicy};
use crate::domain::model::{ListBody, Page};
use crate::utils::error::Result;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_PAGE_LIMIT: usize = 1000;

/// Offset/limit pagination over a fetcher, every request wrapped in the backoff retrier.
#[derive(Debug, Clone)]
pub struct Pager {
    fetcher: HttpFetcher,
    backoff: BackoffPolicy,
    page_limit: usize,
}

impl Pager {
    pub fn new(fetcher: HttpFetcher, backoff: BackoffPolicy, page_limit: usize) -> Self {
        Self {
            fetcher,
            backoff,
            page_limit: page_limit.max(1),
        }
    }

    /// Fetches `path` until a page comes back empty.
    ///
    /// Order is preserved across and within pages. An error discards whatever
    /// was accumulated so far.
    pub async fn fetch_all_pages<T: DeserializeOwned>(
        &self,
        cancel: &CancellationToken,
        path: &str,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut offset = 0usize;

        loop {
            let page_path = page_path(path, offset, self.page_limit);
            let page: Page<T> = with_retry(cancel, &self.backoff, || {
                self.fetcher.fetch(cancel, &page_path)
            })
            .await?;

            if page.data.is_empty() {
                break;
            }

            offset += page.data.len();
            items.extend(page.data);
        }

        tracing::debug!("📄 {}: fetched {} items", path, items.len());
        Ok(items)
    }

    /// Single request for an unpaginated list endpoint.
    pub async fn fetch_list<T: DeserializeOwned>(
        &self,
        cancel: &CancellationToken,
        path: &str,
    ) -> Result<Vec<T>> {
        let body: ListBody<T> =
            with_retry(cancel, &self.backoff, || self.fetcher.fetch(cancel, path)).await?;
        Ok(body.into_items())
    }
}

fn page_path(path: &str, offset: usize, limit: usize) -> String {
    let sep = if path.contains('?') { '&' } else { '?' };
    format!("{}{}offset={}&limit={}", path, sep, offset, limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::Record;
    use crate::utils::error::ExportError;
    use httpmock::prelude::*;
    use serde_json::json;

    fn items(start: usize, count: usize) -> serde_json::Value {
        let data: Vec<_> = (start..start + count).map(|i| json!({"seq": i})).collect();
        json!({"limit": 1000, "offset": start, "data": data})
    }

    fn pager(server: &MockServer) -> Pager {
        Pager::new(
            HttpFetcher::new(server.base_url()),
            BackoffPolicy::default(),
            DEFAULT_PAGE_LIMIT,
        )
    }

    #[test]
    fn test_page_path_separator() {
        assert_eq!(page_path("/v1/tokens", 0, 1000), "/v1/tokens?offset=0&limit=1000");
        assert_eq!(
            page_path("/communities/x/tokens?isHidden=true", 2000, 1000),
            "/communities/x/tokens?isHidden=true&offset=2000&limit=1000"
        );
    }

    #[tokio::test]
    async fn test_fetches_until_empty_page_in_order() {
        let server = MockServer::start();
        let mocks: Vec<_> = [(0, 1000), (1000, 1000), (2000, 37), (2037, 0)]
            .into_iter()
            .map(|(offset, count)| {
                server.mock(|when, then| {
                    when.method(GET)
                        .path("/v1/tokens")
                        .query_param("offset", offset.to_string())
                        .query_param("limit", "1000");
                    then.status(200).json_body(items(offset, count));
                })
            })
            .collect();

        let result: Vec<Record> = pager(&server)
            .fetch_all_pages(&CancellationToken::new(), "/v1/tokens")
            .await
            .unwrap();

        assert_eq!(result.len(), 2037);
        for (i, record) in result.iter().enumerate() {
            assert_eq!(record.data["seq"], json!(i));
        }
        for mock in &mocks {
            mock.assert();
        }
    }

    #[tokio::test]
    async fn test_empty_first_page_returns_empty_vec() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/token/1/owners");
            then.status(200)
                .json_body(json!({"limit": 1000, "offset": 0, "data": []}));
        });

        let result: Vec<Record> = pager(&server)
            .fetch_all_pages(&CancellationToken::new(), "/token/1/owners")
            .await
            .unwrap();

        assert!(result.is_empty());
        mock.assert_hits(1);
    }

    #[tokio::test]
    async fn test_error_discards_partial_pages() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1/tokens").query_param("offset", "0");
            then.status(200).json_body(items(0, 1000));
        });
        server.mock(|when, then| {
            when.method(GET).path("/v1/tokens").query_param("offset", "1000");
            then.status(500);
        });

        let result = pager(&server)
            .fetch_all_pages::<Record>(&CancellationToken::new(), "/v1/tokens")
            .await;

        assert!(matches!(result, Err(ExportError::HttpStatus { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_fetch_list_accepts_bare_array() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/token/3/endorsers");
            then.status(200).json_body(json!([{"a": 1}, {"a": 2}]));
        });

        let result: Vec<Record> = pager(&server)
            .fetch_list(&CancellationToken::new(), "/token/3/endorsers")
            .await
            .unwrap();

        mock.assert();
        assert_eq!(result.len(), 2);
    }
}
