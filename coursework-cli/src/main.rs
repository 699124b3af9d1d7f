use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use coursework_config::ConfigLoader;
use coursework_contracts::store::AssignmentsRepo;
use coursework_core::postgres::{self, PostgresAssignmentsRepo};
use coursework_model::stage::Stage;
use coursework_model::{Assignment, FAR_FUTURE};

const DIRTY_MARKER: &str = "coursework-schedule-dirty";
const TRIGGER_PAYLOAD: &str = "coursework-trigger-payload";

/// Operator CLI for the grading pipeline's schedule: create, alter, and
/// remove assignments, inspect the schedule, and reload or trigger the
/// running Orchestrator.
#[derive(Parser, Debug)]
#[command(name = "coursework-ctl")]
struct Cli {
    /// PID of the Orchestrator to signal. Defaults to PID 1 (the
    /// container's own supervisor); override for local testing.
    #[arg(long, default_value_t = 1)]
    orchestrator_pid: i32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Create {
        #[arg(short = 'a', long)]
        assignment: String,
        #[arg(short = 'i', long)]
        initial: i64,
        #[arg(short = 'p', long)]
        peer_review: i64,
        #[arg(short = 'f', long)]
        r#final: i64,
    },
    Alter {
        #[arg(short = 'a', long)]
        assignment: String,
        #[arg(short = 'i', long)]
        initial: Option<i64>,
        #[arg(short = 'p', long)]
        peer_review: Option<i64>,
        #[arg(short = 'f', long)]
        r#final: Option<i64>,
    },
    Remove {
        #[arg(short = 'a', long)]
        assignment: String,
    },
    Dump {
        #[arg(long)]
        iso: bool,
    },
    Reload,
    Trigger {
        #[arg(short = 'a', long)]
        assignment: String,
        #[arg(short = 'c', long)]
        component: StageArg,
    },
    Dummy {
        #[arg(short = 'a', long)]
        assignment: String,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StageArg {
    Initial,
    Peer,
    Final,
}

impl From<StageArg> for Stage {
    fn from(value: StageArg) -> Self {
        match value {
            StageArg::Initial => Stage::Initial,
            StageArg::Peer => Stage::Peer,
            StageArg::Final => Stage::Final,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .compact()
        .init();

    let cli = Cli::parse();
    let loaded = ConfigLoader::new().load()?;
    let pool = postgres::connect(&loaded.config.database.url).await?;
    let assignments = PostgresAssignmentsRepo::new(pool);

    match cli.command {
        Command::Create { assignment, initial, peer_review, r#final } => {
            let asn = Assignment::new(0, &assignment, initial, peer_review, r#final)?;
            assignments.create(&asn).await?;
            mark_dirty()?;
            println!("created {assignment}");
        }
        Command::Alter { assignment, initial, peer_review, r#final } => {
            assignments.alter(&assignment, initial, peer_review, r#final).await?;
            mark_dirty()?;
            println!("altered {assignment}");
        }
        Command::Remove { assignment } => {
            assignments.remove(&assignment).await?;
            mark_dirty()?;
            println!("removed {assignment}");
        }
        Command::Dump { iso } => {
            let all = assignments.list().await?;
            if dirty_marker_path().exists() {
                eprintln!("warning: schedule has pending changes the running Orchestrator has not seen; run `reload`");
            }
            for asn in all {
                println!("{}", format_assignment(&asn, iso));
            }
        }
        Command::Reload => {
            clear_dirty()?;
            signal_orchestrator(cli.orchestrator_pid, loaded.config.orchestrator.reload_signal)?;
            println!("sent RELOAD to pid {}", cli.orchestrator_pid);
        }
        Command::Trigger { assignment, component } => {
            let asn = assignments
                .get(&assignment)
                .await?
                .ok_or_else(|| anyhow::anyhow!("no such assignment {assignment}"))?;
            let payload = coursework_model::stage::encode_trigger_payload(asn.id, component.into());
            clear_dirty()?;
            write_trigger_payload(payload)?;
            signal_orchestrator(cli.orchestrator_pid, loaded.config.orchestrator.trigger_signal)?;
            println!("sent TRIGGER({payload}) to pid {}", cli.orchestrator_pid);
        }
        Command::Dummy { assignment } => {
            let asn = Assignment::new(0, &assignment, FAR_FUTURE, FAR_FUTURE, FAR_FUTURE)?;
            assignments.create(&asn).await?;
            mark_dirty()?;
            println!("created dummy assignment {assignment}");
        }
    }

    Ok(())
}

fn format_assignment(asn: &Assignment, iso: bool) -> String {
    if iso {
        format!(
            "{}: initial={} peer_review={} final={}",
            asn.name,
            format_ts(asn.initial_due, iso),
            format_ts(asn.peer_review_due, iso),
            format_ts(asn.final_due, iso)
        )
    } else {
        format!("{}: initial={} peer_review={} final={}", asn.name, asn.initial_due, asn.peer_review_due, asn.final_due)
    }
}

fn format_ts(ts: i64, iso: bool) -> String {
    if !iso {
        return ts.to_string();
    }
    if ts == FAR_FUTURE {
        return "never".to_string();
    }
    chrono::DateTime::from_timestamp(ts, 0).map(|dt| dt.to_rfc3339()).unwrap_or_else(|| ts.to_string())
}

fn dirty_marker_path() -> PathBuf {
    std::env::temp_dir().join(DIRTY_MARKER)
}

fn mark_dirty() -> anyhow::Result<()> {
    std::fs::write(dirty_marker_path(), b"dirty")?;
    Ok(())
}

fn clear_dirty() -> anyhow::Result<()> {
    let path = dirty_marker_path();
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}

fn write_trigger_payload(payload: i64) -> anyhow::Result<()> {
    std::fs::write(std::env::temp_dir().join(TRIGGER_PAYLOAD), payload.to_string())?;
    Ok(())
}

fn signal_orchestrator(pid: i32, signal: libc::c_int) -> anyhow::Result<()> {
    let result = unsafe { libc::kill(pid, signal) };
    if result != 0 {
        return Err(anyhow::anyhow!("kill({pid}, {signal}) failed: {}", std::io::Error::last_os_error()));
    }
    Ok(())
}
