use crate::core::fetcher::HttpFetcher;
use crate::core::pager::Pager;
use crate::core::retry::BackoffPolicy;
use crate::domain::model::{
    Account, Community, CommunityToken, CommunityTokens, Endorser, Member, Token, TokenId,
};
use crate::domain::ports::{ConfigProvider, KudosApi};
use crate::utils::error::{ExportError, Result};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use url::Url;

pub const DEFAULT_API_HOST: &str = "https://api.mintkudos.xyz";

// public endpoints
const API_TOKENS: &str = "/v1/tokens";

// internal endpoints
const API_COMMUNITIES: &str = "/communities";

// 只用來組 path，不會真的送出
const PATH_BASE: &str = "http://localhost/";

/// `/communities/{id}/{resource}`, with the id encoded as a single path segment.
fn community_path(community_id: &str, resource: &str) -> Result<String> {
    let mut url = Url::parse(PATH_BASE).map_err(|e| ExportError::ConfigError {
        message: format!("invalid path base: {}", e),
    })?;
    url.path_segments_mut()
        .map_err(|_| ExportError::ConfigError {
            message: format!("cannot build path for community {}", community_id),
        })?
        .clear()
        .extend(["communities", community_id, resource]);
    Ok(url.path().to_string())
}

fn community_tokens_path(community_id: &str, hidden: bool) -> Result<String> {
    Ok(format!("{}?isHidden={}", community_path(community_id, "tokens")?, hidden))
}

fn members_path(community_id: &str) -> Result<String> {
    community_path(community_id, "members")
}

fn endorsers_path(token_id: TokenId) -> String {
    format!("/token/{}/endorsers", token_id)
}

fn contributors_path(token_id: TokenId) -> String {
    format!("/token/{}/contributors", token_id)
}

fn owners_path(token_id: TokenId) -> String {
    format!("/token/{}/owners", token_id)
}

/// HTTP implementation of [`KudosApi`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    pager: Pager,
}

impl ApiClient {
    pub fn new(host: impl Into<String>, backoff: BackoffPolicy, page_limit: usize) -> Self {
        Self {
            pager: Pager::new(HttpFetcher::new(host), backoff, page_limit),
        }
    }

    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Self {
        Self::new(config.api_host(), config.backoff(), config.page_limit())
    }

    async fn get_community_tokens_by_visibility(
        &self,
        cancel: &CancellationToken,
        community_id: &str,
        hidden: bool,
    ) -> Result<Vec<CommunityToken>> {
        self.pager
            .fetch_all_pages(cancel, &community_tokens_path(community_id, hidden)?)
            .await
    }
}

#[async_trait]
impl KudosApi for ApiClient {
    async fn get_tokens(&self, cancel: &CancellationToken) -> Result<Vec<Token>> {
        self.pager.fetch_all_pages(cancel, API_TOKENS).await
    }

    async fn get_communities(&self, cancel: &CancellationToken) -> Result<Vec<Community>> {
        self.pager.fetch_list(cancel, API_COMMUNITIES).await
    }

    async fn get_owners(&self, cancel: &CancellationToken, token_id: TokenId) -> Result<Vec<Account>> {
        self.pager.fetch_all_pages(cancel, &owners_path(token_id)).await
    }

    async fn get_contributors(
        &self,
        cancel: &CancellationToken,
        token_id: TokenId,
    ) -> Result<Vec<Account>> {
        self.pager
            .fetch_all_pages(cancel, &contributors_path(token_id))
            .await
    }

    async fn get_endorsers(
        &self,
        cancel: &CancellationToken,
        token_id: TokenId,
    ) -> Result<Vec<Endorser>> {
        self.pager.fetch_list(cancel, &endorsers_path(token_id)).await
    }

    async fn get_members(&self, cancel: &CancellationToken, community_id: &str) -> Result<Vec<Member>> {
        self.pager
            .fetch_all_pages(cancel, &members_path(community_id)?)
            .await
    }

    async fn get_community_tokens(
        &self,
        cancel: &CancellationToken,
        community_id: &str,
    ) -> Result<CommunityTokens> {
        let hidden_tokens = self
            .get_community_tokens_by_visibility(cancel, community_id, true)
            .await?;
        let visible_tokens = self
            .get_community_tokens_by_visibility(cancel, community_id, false)
            .await?;

        Ok(CommunityTokens {
            community_id: community_id.to_string(),
            hidden_tokens,
            visible_tokens,
        })
    }
}
