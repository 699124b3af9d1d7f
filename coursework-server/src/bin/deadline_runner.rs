use clap::{Parser, ValueEnum};
use tracing::{info, instrument};

use coursework_core::deadline;
use coursework_server::bootstrap;

/// Run one DeadlineRunner stage for an assignment: `deadline-runner <assignment> <stage>`.
#[derive(Parser, Debug)]
struct Args {
    assignment: String,
    stage: StageArg,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StageArg {
    Initial,
    Peer,
    Final,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let (ctx, _loaded) = bootstrap::bootstrap("deadline-runner").await?;

    run(&ctx, &args.assignment, args.stage).await
}

#[instrument(skip(ctx))]
async fn run(ctx: &coursework_core::CoreContext, assignment: &str, stage: StageArg) -> anyhow::Result<()> {
    let summary = match stage {
        StageArg::Initial => deadline::initial(ctx, assignment).await?,
        StageArg::Peer => deadline::peer_review(ctx, assignment).await?,
        StageArg::Final => deadline::final_stage(ctx, assignment).await?,
    };
    info!(assignment, ?summary, "deadline stage complete");
    Ok(())
}
