use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

pub type TokenId = u64;
pub type CommunityId = String;

/// Opaque API record (owners, contributors, members, endorsers), passed through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    pub data: HashMap<String, serde_json::Value>,
}

pub type Account = Record;
pub type Member = Record;
pub type Endorser = Record;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimabilityAttributes {
    #[serde(default)]
    pub total_claim_count: Option<u64>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub token_id: TokenId,
    #[serde(default)]
    pub community_id: Option<CommunityId>,
    #[serde(default)]
    pub claimability_attributes: ClaimabilityAttributes,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Community {
    pub community_id: CommunityId,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Token summary as listed under a community.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityToken {
    pub token_id: TokenId,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityTokens {
    pub community_id: CommunityId,
    pub hidden_tokens: Vec<CommunityToken>,
    pub visible_tokens: Vec<CommunityToken>,
}

/// `{limit, offset, data}` envelope of paginated endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Page<T> {
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "Vec::new", deserialize_with = "null_as_empty")]
    pub data: Vec<T>,
}

/// Unpaginated endpoints answer with a bare array; older deployments wrap it in `data`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged, bound(deserialize = "T: Deserialize<'de>"))]
pub enum ListBody<T> {
    Bare(Vec<T>),
    Wrapped {
        #[serde(default = "Vec::new", deserialize_with = "null_as_empty")]
        data: Vec<T>,
    },
    Null(()),
}

impl<T> ListBody<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            ListBody::Bare(items) | ListBody::Wrapped { data: items } => items,
            ListBody::Null(()) => Vec::new(),
        }
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Non-fatal inconsistency found while building a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DataIntegrityWarning {
    #[serde(rename_all = "camelCase")]
    ClaimCountMismatch {
        token_id: TokenId,
        declared: u64,
        fetched: u64,
    },
    #[serde(rename_all = "camelCase")]
    UnknownCommunityToken {
        community_id: CommunityId,
        token_id: TokenId,
    },
}

impl std::fmt::Display for DataIntegrityWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataIntegrityWarning::ClaimCountMismatch {
                token_id,
                declared,
                fetched,
            } => write!(
                f,
                "token {} declares {} claims but {} claimers/issuers were fetched",
                token_id, declared, fetched
            ),
            DataIntegrityWarning::UnknownCommunityToken {
                community_id,
                token_id,
            } => write!(
                f,
                "community {} lists token {} which is not in the token listing",
                community_id, token_id
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenReport {
    pub token: Token,
    /// Claimers.
    pub owners: Vec<Account>,
    /// Issuers.
    pub contributors: Vec<Account>,
    pub endorsers: Vec<Endorser>,
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<DataIntegrityWarning>,
}

impl TokenReport {
    pub fn token_id(&self) -> TokenId {
        self.token.token_id
    }
}

/// Built by a community-phase worker, grouped with token reports in `transform`.
#[derive(Debug, Clone, PartialEq)]
pub struct CommunityDetails {
    pub community: Community,
    pub members: Vec<Member>,
    pub tokens: CommunityTokens,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityReport {
    pub community: Community,
    pub members: Vec<Member>,
    pub hidden_tokens: Vec<TokenReport>,
    pub visible_tokens: Vec<TokenReport>,
}

/// Output of the fetch phases.
#[derive(Debug, Clone, Default)]
pub struct ExtractResult {
    pub tokens: Vec<Token>,
    pub communities: Vec<Community>,
    pub token_reports: Vec<TokenReport>,
    pub community_details: Vec<CommunityDetails>,
}

/// Cross-referenced reports in deterministic order, ready to persist.
#[derive(Debug, Clone, Default)]
pub struct ExportResult {
    pub tokens: Vec<Token>,
    pub communities: Vec<Community>,
    pub token_reports: Vec<TokenReport>,
    pub community_reports: Vec<CommunityReport>,
    pub warnings: Vec<DataIntegrityWarning>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub exported_at: chrono::DateTime<chrono::Utc>,
    pub token_count: usize,
    pub community_count: usize,
    pub hidden_token_count: usize,
    pub warnings: Vec<DataIntegrityWarning>,
}
