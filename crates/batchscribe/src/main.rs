//! Command-line entry point: loads a config file and runs the pipeline once.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use batchscribe::config::Config;
use batchscribe::logging::{init_logging, LoggingConfig};
use batchscribe::pipeline::LogProgress;
use batchscribe::{
    load_config, DocxRenderer, LocalObjectStore, Pipeline, PipelineConfig,
    SimulatedTranscriptionService,
};

#[derive(Parser)]
#[command(
    name = "batchscribe",
    version,
    about = "Batch speech-to-text: upload, transcribe, report, export and archive"
)]
struct Cli {
    /// Path to the JSON configuration file
    #[arg(short, long, default_value = "batchscribe.json")]
    config: PathBuf,

    /// Run against a local directory store and a simulated transcription service
    #[arg(long)]
    simulate: bool,

    /// Root directory of the local store used with --simulate
    #[arg(long, default_value = ".batchscribe-store")]
    store_root: PathBuf,

    /// Emit JSON log lines (same as LOG_FORMAT=json)
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::from_env();
    logging.json_format |= cli.json_logs;
    init_logging(logging);

    info!("Starting batchscribe v{}", env!("CARGO_PKG_VERSION"));

    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!(path = %cli.config.display(), error = %e, "Failed to load config");
            return ExitCode::from(2);
        }
    };
    let pipeline_config = Arc::new(PipelineConfig::from_config(&config));

    let pipeline = if cli.simulate {
        info!(store_root = %cli.store_root.display(), "Running in simulation mode");
        let store = Arc::new(LocalObjectStore::new(&cli.store_root));
        let service = SimulatedTranscriptionService::new().with_result_store(store.clone());
        Pipeline::new(
            pipeline_config,
            Arc::new(service),
            store,
            Arc::new(DocxRenderer::new()),
        )
    } else {
        match aws_pipeline(&config, pipeline_config).await {
            Ok(pipeline) => pipeline,
            Err(message) => {
                error!("{}", message);
                return ExitCode::from(2);
            }
        }
    };

    let report = pipeline.run(&LogProgress).await;
    for warning in &report.warnings {
        info!(warning = %warning, "Isolated failure");
    }

    if report.is_aborted() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

#[cfg(feature = "aws")]
async fn aws_pipeline(
    config: &Config,
    pipeline_config: Arc<PipelineConfig>,
) -> Result<Pipeline, String> {
    use batchscribe::service::AwsTranscribeService;
    use batchscribe::storage::S3ObjectStore;

    let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(config.storage.region.clone()))
        .load()
        .await;

    let store = S3ObjectStore::from_sdk_config(&sdk_config, config.storage.endpoint.as_deref());
    let service = AwsTranscribeService::from_sdk_config(&sdk_config);

    Ok(Pipeline::new(
        pipeline_config,
        Arc::new(service),
        Arc::new(store),
        Arc::new(DocxRenderer::new()),
    ))
}

#[cfg(not(feature = "aws"))]
async fn aws_pipeline(
    _config: &Config,
    _pipeline_config: Arc<PipelineConfig>,
) -> Result<Pipeline, String> {
    Err("built without the `aws` feature; rebuild with --features aws or pass --simulate".to_string())
}
