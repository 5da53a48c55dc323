use crate::domain::model::{
    Account, Community, CommunityDetails, CommunityReport, DataIntegrityWarning, Endorser, Token, TokenId,
    TokenReport,
};
use crate::domain::ports::KudosApi;
use crate::utils::error::Result;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

/// Compares the declared claim total with the fetched claimers and issuers.
pub fn check_claim_count(
    token: &Token,
    owners: &[Account],
    contributors: &[Account],
) -> Option<DataIntegrityWarning> {
    let declared = token.claimability_attributes.total_claim_count?;
    let fetched = (owners.len() + contributors.len()) as u64;
    (declared != fetched).then_some(DataIntegrityWarning::ClaimCountMismatch {
        token_id: token.token_id,
        declared,
        fetched,
    })
}

pub fn build_token_report(
    token: Token,
    owners: Vec<Account>,
    contributors: Vec<Account>,
    endorsers: Vec<Endorser>,
) -> TokenReport {
    let warnings: Vec<_> = check_claim_count(&token, &owners, &contributors)
        .into_iter()
        .inspect(|w| tracing::warn!("⚠️ {}", w))
        .collect();

    TokenReport {
        token,
        owners,
        contributors,
        endorsers,
        hidden: false,
        warnings,
    }
}

/// Token-phase unit of work: the detail sets of one token, fetched one after another.
pub async fn fetch_token_report<A: KudosApi + ?Sized>(
    api: &A,
    cancel: &CancellationToken,
    token: Token,
) -> Result<TokenReport> {
    let owners = api.get_owners(cancel, token.token_id).await?;
    let contributors = api.get_contributors(cancel, token.token_id).await?;
    let endorsers = api.get_endorsers(cancel, token.token_id).await?;
    tracing::debug!(
        "🪙 token {}: {} owners, {} contributors, {} endorsers",
        token.token_id,
        owners.len(),
        contributors.len(),
        endorsers.len()
    );
    Ok(build_token_report(token, owners, contributors, endorsers))
}

/// Community-phase unit of work.
pub async fn fetch_community_details<A: KudosApi + ?Sized>(
    api: &A,
    cancel: &CancellationToken,
    community: Community,
) -> Result<CommunityDetails> {
    let members = api.get_members(cancel, &community.community_id).await?;
    let tokens = api
        .get_community_tokens(cancel, &community.community_id)
        .await?;
    tracing::debug!(
        "🏘️ community {}: {} members, {} hidden / {} visible tokens",
        community.community_id,
        members.len(),
        tokens.hidden_tokens.len(),
        tokens.visible_tokens.len()
    );
    Ok(CommunityDetails {
        community,
        members,
        tokens,
    })
}

/// Flags hidden tokens and groups token reports per community.
///
/// Runs after both phases, so the outcome does not depend on worker
/// interleaving. Token reports come back sorted by token id, community
/// reports by community id.
pub fn cross_reference(
    token_reports: Vec<TokenReport>,
    community_details: Vec<CommunityDetails>,
) -> (Vec<TokenReport>, Vec<CommunityReport>, Vec<DataIntegrityWarning>) {
    let mut by_id: HashMap<TokenId, TokenReport> = token_reports
        .into_iter()
        .map(|report| (report.token_id(), report))
        .collect();
    let mut warnings = Vec::new();

    for details in &community_details {
        for summary in &details.tokens.hidden_tokens {
            match by_id.get_mut(&summary.token_id) {
                Some(report) => report.hidden = true,
                None => warnings.push(DataIntegrityWarning::UnknownCommunityToken {
                    community_id: details.community.community_id.clone(),
                    token_id: summary.token_id,
                }),
            }
        }
        for summary in &details.tokens.visible_tokens {
            if !by_id.contains_key(&summary.token_id) {
                warnings.push(DataIntegrityWarning::UnknownCommunityToken {
                    community_id: details.community.community_id.clone(),
                    token_id: summary.token_id,
                });
            }
        }
    }

    for warning in &warnings {
        tracing::warn!("⚠️ {}", warning);
    }

    let pick = |ids: &mut dyn Iterator<Item = TokenId>| -> Vec<TokenReport> {
        let mut reports: Vec<TokenReport> =
            ids.filter_map(|id| by_id.get(&id).cloned()).collect();
        reports.sort_by_key(TokenReport::token_id);
        reports.dedup_by_key(|r| r.token_id());
        reports
    };

    let mut community_reports: Vec<CommunityReport> = community_details
        .into_iter()
        .map(|details| CommunityReport {
            hidden_tokens: pick(&mut details.tokens.hidden_tokens.iter().map(|t| t.token_id)),
            visible_tokens: pick(&mut details.tokens.visible_tokens.iter().map(|t| t.token_id)),
            community: details.community,
            members: details.members,
        })
        .collect();
    community_reports.sort_by(|a, b| a.community.community_id.cmp(&b.community.community_id));

    let mut token_reports: Vec<TokenReport> = by_id.into_values().collect();
    token_reports.sort_by_key(TokenReport::token_id);

    (token_reports, community_reports, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ClaimabilityAttributes, CommunityToken, CommunityTokens, Record};
    use std::collections::HashMap;

    fn token(id: TokenId, total: Option<u64>) -> Token {
        Token {
            token_id: id,
            community_id: None,
            claimability_attributes: ClaimabilityAttributes {
                total_claim_count: total,
                extra: HashMap::new(),
            },
            extra: HashMap::new(),
        }
    }

    fn accounts(n: usize) -> Vec<Account> {
        (0..n)
            .map(|i| {
                let mut data = HashMap::new();
                data.insert(
                    "walletAddress".to_string(),
                    serde_json::Value::String(format!("0x{:040x}", i)),
                );
                Record { data }
            })
            .collect()
    }

    fn summary(id: TokenId) -> CommunityToken {
        CommunityToken {
            token_id: id,
            extra: HashMap::new(),
        }
    }

    fn details(id: &str, hidden: &[TokenId], visible: &[TokenId]) -> CommunityDetails {
        CommunityDetails {
            community: Community {
                community_id: id.to_string(),
                extra: HashMap::new(),
            },
            members: accounts(2),
            tokens: CommunityTokens {
                community_id: id.to_string(),
                hidden_tokens: hidden.iter().copied().map(summary).collect(),
                visible_tokens: visible.iter().copied().map(summary).collect(),
            },
        }
    }

    #[test]
    fn test_claim_count_matches() {
        let t = token(1, Some(5));
        assert_eq!(check_claim_count(&t, &accounts(3), &accounts(2)), None);
        let report = build_token_report(t, accounts(3), accounts(2), vec![]);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn test_claim_count_mismatch_warns_once() {
        let t = token(1, Some(5));
        let report = build_token_report(t, accounts(3), accounts(1), vec![]);
        assert_eq!(
            report.warnings,
            vec![DataIntegrityWarning::ClaimCountMismatch {
                token_id: 1,
                declared: 5,
                fetched: 4,
            }]
        );
    }

    #[test]
    fn test_no_declared_total_skips_check() {
        let t = token(1, None);
        assert_eq!(check_claim_count(&t, &accounts(9), &[]), None);
    }

    #[test]
    fn test_hidden_tokens_are_flagged_and_grouped() {
        let reports = vec![3, 1, 2, 4]
            .into_iter()
            .map(|id| build_token_report(token(id, None), vec![], vec![], vec![]))
            .collect();
        let communities = vec![details("zeta", &[], &[4]), details("alpha", &[2], &[3, 1])];

        let (tokens, communities, warnings) = cross_reference(reports, communities);

        assert!(warnings.is_empty());
        assert_eq!(tokens.iter().map(|r| r.token_id()).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert!(tokens.iter().find(|r| r.token_id() == 2).unwrap().hidden);
        assert!(tokens.iter().filter(|r| r.token_id() != 2).all(|r| !r.hidden));

        assert_eq!(communities[0].community.community_id, "alpha");
        assert_eq!(communities[0].hidden_tokens.len(), 1);
        assert!(communities[0].hidden_tokens[0].hidden);
        assert_eq!(
            communities[0].visible_tokens.iter().map(|r| r.token_id()).collect::<Vec<_>>(),
            vec![1, 3]
        );
        assert_eq!(communities[1].community.community_id, "zeta");
        assert_eq!(communities[1].visible_tokens[0].token_id(), 4);
    }

    #[test]
    fn test_unknown_community_token_is_a_warning() {
        let reports = vec![build_token_report(token(1, None), vec![], vec![], vec![])];
        let (_, communities, warnings) =
            cross_reference(reports, vec![details("vectorDAO", &[99], &[1])]);

        assert_eq!(
            warnings,
            vec![DataIntegrityWarning::UnknownCommunityToken {
                community_id: "vectorDAO".to_string(),
                token_id: 99,
            }]
        );
        assert!(communities[0].hidden_tokens.is_empty());
        assert_eq!(communities[0].visible_tokens.len(), 1);
    }
}
