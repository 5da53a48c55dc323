use crate::core::retry::BackoffPolicy;
use crate::domain::model::{
    Account, Community, CommunityTokens, Endorser, ExportResult, ExtractResult, Member, Token,
    TokenId,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn api_host(&self) -> &str;
    fn output_path(&self) -> &str;
    fn workers(&self) -> usize;
    fn page_limit(&self) -> usize;
    fn backoff(&self) -> BackoffPolicy;
    fn monitoring_enabled(&self) -> bool {
        false
    }
}

/// One operation per MintKudos resource. List operations never return `None`-like
/// values: "no results" is an empty `Vec`.
#[async_trait]
pub trait KudosApi: Send + Sync {
    async fn get_tokens(&self, cancel: &CancellationToken) -> Result<Vec<Token>>;
    async fn get_communities(&self, cancel: &CancellationToken) -> Result<Vec<Community>>;
    async fn get_owners(&self, cancel: &CancellationToken, token_id: TokenId) -> Result<Vec<Account>>;
    async fn get_contributors(
        &self,
        cancel: &CancellationToken,
        token_id: TokenId,
    ) -> Result<Vec<Account>>;
    async fn get_endorsers(
        &self,
        cancel: &CancellationToken,
        token_id: TokenId,
    ) -> Result<Vec<Endorser>>;
    async fn get_members(&self, cancel: &CancellationToken, community_id: &str) -> Result<Vec<Member>>;
    async fn get_community_tokens(
        &self,
        cancel: &CancellationToken,
        community_id: &str,
    ) -> Result<CommunityTokens>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<ExtractResult>;
    async fn transform(&self, data: ExtractResult) -> Result<ExportResult>;
    async fn load(&self, result: ExportResult) -> Result<String>;
}
