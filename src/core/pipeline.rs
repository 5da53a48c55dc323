use crate::core::client::ApiClient;
use crate::core::dispatcher::Dispatcher;
use crate::core::report::{cross_reference, fetch_community_details, fetch_token_report};
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::domain::model::{ExportResult, ExportSummary, ExtractResult};
use crate::domain::ports::KudosApi;
use crate::utils::error::Result;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Exports every token and community, with their detail sets, as JSON files.
pub struct ExportPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    api: Arc<dyn KudosApi>,
    cancel: CancellationToken,
}

impl<S: Storage, C: ConfigProvider> ExportPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        let api = Arc::new(ApiClient::from_config(&config));
        Self::with_api(storage, config, api)
    }

    pub fn with_api(storage: S, config: C, api: Arc<dyn KudosApi>) -> Self {
        Self {
            storage,
            config,
            api,
            cancel: CancellationToken::new(),
        }
    }

    /// Replaces the run token, e.g. with one wired to Ctrl+C.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    async fn write_json<T: Serialize + ?Sized>(&self, path: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.storage.write_file(path, &bytes).await
    }
}

/// Keeps ids usable as file names.
fn file_key(id: &str) -> String {
    id.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect()
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for ExportPipeline<S, C> {
    async fn extract(&self) -> Result<ExtractResult> {
        let dispatcher = Dispatcher::new(self.config.workers(), self.cancel.clone());

        let tokens = self.api.get_tokens(&self.cancel).await?;
        tracing::info!("🪙 Fetched {} tokens", tokens.len());

        let api = self.api.clone();
        let token_reports = dispatcher
            .run("tokens", tokens.clone(), move |token, cancel| {
                let api = api.clone();
                async move { fetch_token_report(&*api, &cancel, token).await }
            })
            .await?;

        // community 報告需要完整的 token 報告，所以在 token 階段結束後才開始
        let communities = self.api.get_communities(&self.cancel).await?;
        tracing::info!("🏘️ Fetched {} communities", communities.len());

        let api = self.api.clone();
        let community_details = dispatcher
            .run("communities", communities.clone(), move |community, cancel| {
                let api = api.clone();
                async move { fetch_community_details(&*api, &cancel, community).await }
            })
            .await?;

        Ok(ExtractResult {
            tokens,
            communities,
            token_reports,
            community_details,
        })
    }

    async fn transform(&self, data: ExtractResult) -> Result<ExportResult> {
        let mut warnings: Vec<_> = data
            .token_reports
            .iter()
            .flat_map(|report| report.warnings.iter().cloned())
            .collect();

        let (token_reports, community_reports, cross_warnings) =
            cross_reference(data.token_reports, data.community_details);
        warnings.extend(cross_warnings);

        let mut tokens = data.tokens;
        tokens.sort_by_key(|t| t.token_id);
        let mut communities = data.communities;
        communities.sort_by(|a, b| a.community_id.cmp(&b.community_id));

        if !warnings.is_empty() {
            tracing::warn!("⚠️ {} data integrity warnings", warnings.len());
        }

        Ok(ExportResult {
            tokens,
            communities,
            token_reports,
            community_reports,
            warnings,
        })
    }

    async fn load(&self, result: ExportResult) -> Result<String> {
        let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let dir = format!("output-{}", nanos);
        let output_path = format!("{}/{}", self.config.output_path(), dir);
        tracing::info!("💾 Writing to {}", output_path);

        self.write_json(&format!("{}/tokens.json", dir), &result.tokens)
            .await?;
        self.write_json(&format!("{}/communities.json", dir), &result.communities)
            .await?;

        for report in &result.token_reports {
            let path = format!("{}/tokens/token-{}.json", dir, report.token_id());
            self.write_json(&path, report).await?;
        }
        for report in &result.community_reports {
            let path = format!(
                "{}/communities/community-{}.json",
                dir,
                file_key(&report.community.community_id)
            );
            self.write_json(&path, report).await?;
        }

        let summary = ExportSummary {
            exported_at: chrono::Utc::now(),
            token_count: result.token_reports.len(),
            community_count: result.community_reports.len(),
            hidden_token_count: result.token_reports.iter().filter(|r| r.hidden).count(),
            warnings: result.warnings,
        };
        self.write_json(&format!("{}/summary.json", dir), &summary)
            .await?;

        tracing::debug!(
            "Wrote {} token reports and {} community reports",
            summary.token_count,
            summary.community_count
        );
        Ok(output_path)
    }
}
