//! Process entry point: loads configuration from the environment and runs
//! one pipeline invocation to completion.

use keyword_harvest_pipeline::config::PipelineConfig;
use keyword_harvest_pipeline::Orchestrator;

#[tokio::main]
async fn main() {
    env_logger::init();

    let config = match PipelineConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            log::error!("configuration error: {err}");
            std::process::exit(1);
        }
    };

    let orchestrator = match Orchestrator::new(config) {
        Ok(orchestrator) => orchestrator,
        Err(err) => {
            log::error!("failed to initialize orchestrator: {err}");
            std::process::exit(1);
        }
    };

    let summary = orchestrator.run().await;
    log::info!("pipeline run complete: {:?}", summary);

    std::process::exit(0);
}
