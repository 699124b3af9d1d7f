use coursework_core::orchestrator::{Orchestrator, UnixTriggerSource};
use coursework_server::bootstrap;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (ctx, loaded) = bootstrap::bootstrap("orchestrator").await?;
    let config = loaded.config;

    info!("orchestrator starting");
    let source = UnixTriggerSource::install(
        config.orchestrator.reload_signal,
        config.orchestrator.trigger_signal,
        std::env::temp_dir().join("coursework-trigger-payload"),
    )?;

    let mut orchestrator = Orchestrator::new(ctx, "deadline-runner");
    orchestrator.run(source).await?;
    Ok(())
}
