use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("🚀 Starting export");
        self.monitor.log_stats("Start");

        // Extract：token 與 community 兩個階段
        let extracted = self.pipeline.extract().await?;
        tracing::info!(
            "📥 Extracted {} token reports, {} communities",
            extracted.token_reports.len(),
            extracted.community_details.len()
        );
        self.monitor.log_stats("Extract");

        // Transform
        let result = self.pipeline.transform(extracted).await?;
        tracing::info!(
            "🔗 Cross-referenced {} token reports into {} community reports",
            result.token_reports.len(),
            result.community_reports.len()
        );
        self.monitor.log_stats("Transform");

        // Load
        let output_path = self.pipeline.load(result).await?;
        tracing::info!("📁 Output saved to: {}", output_path);
        self.monitor.log_stats("Load");
        self.monitor.log_final_stats();

        Ok(output_path)
    }
}
