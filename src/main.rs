use clap::Parser;
use mintkudos_export::core::ConfigProvider;
use mintkudos_export::utils::error::ErrorSeverity;
use mintkudos_export::utils::{logger, validation::Validate};
use mintkudos_export::{CliConfig, EtlEngine, ExportPipeline, LocalStorage, TomlConfig};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting mintkudos-export");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    match cli.config.clone() {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            let config = match TomlConfig::from_file(&path) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("❌ Failed to load config file '{}': {}", path, e);
                    std::process::exit(1);
                }
            };
            let monitor = cli.monitor || config.monitoring_enabled();
            run(config, monitor, cli.dry_run).await
        }
        None => {
            let monitor = cli.monitor;
            let dry_run = cli.dry_run;
            run(cli, monitor, dry_run).await
        }
    }
}

async fn run<C>(config: C, monitor_enabled: bool, dry_run: bool) -> anyhow::Result<()>
where
    C: ConfigProvider + Validate + 'static,
{
    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!(
        "🔧 host={} output={} workers={} page_limit={} backoff={:?}",
        config.api_host(),
        config.output_path(),
        config.workers(),
        config.page_limit(),
        config.backoff()
    );

    if dry_run {
        tracing::info!("🔍 DRY RUN MODE - configuration is valid, no requests sent");
        return Ok(());
    }
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("🛑 Ctrl+C received, cancelling export");
                cancel.cancel();
            }
        });
    }

    let storage = LocalStorage::new(config.output_path());
    let pipeline = ExportPipeline::new(storage, config).with_cancellation(cancel);
    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Export completed successfully!");
            println!("✅ Export completed successfully!");
            println!("📁 Output saved to: {}", output_path);
            Ok(())
        }
        Err(e) => {
            tracing::error!(
                "❌ Export failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 130, // 使用者中斷
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            std::process::exit(exit_code);
        }
    }
}
