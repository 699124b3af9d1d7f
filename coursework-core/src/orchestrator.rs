use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::process::Command;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

use coursework_contracts::error::{StoreError, StoreResult};
use coursework_contracts::trigger::{ControlSignal, TriggerSource};
use coursework_model::stage::{decode_trigger_payload, Stage};
use coursework_model::FAR_FUTURE;

use crate::context::CoreContext;
use crate::deadline;

/// `TriggerSource` backed by real Unix signals: `SIGTERM` for terminate, a
/// configurable reload signal (default `SIGUSR1`), and a configurable
/// real-time signal for trigger. The trigger signal carries no payload of
/// its own on Unix, so the payload is queued out of band by whoever raises
/// it (the Configurator, via a small handoff file) and read here.
pub struct UnixTriggerSource {
    terminate: tokio::signal::unix::Signal,
    reload: tokio::signal::unix::Signal,
    trigger: tokio::signal::unix::Signal,
    payload_path: std::path::PathBuf,
}

impl UnixTriggerSource {
    pub fn install(reload_signal: i32, trigger_signal: i32, payload_path: std::path::PathBuf) -> StoreResult<Self> {
        let terminate = signal(SignalKind::terminate()).map_err(|e| StoreError::TransientIo(e.to_string()))?;
        let reload = signal(SignalKind::from_raw(reload_signal)).map_err(|e| StoreError::TransientIo(e.to_string()))?;
        let trigger = signal(SignalKind::from_raw(trigger_signal)).map_err(|e| StoreError::TransientIo(e.to_string()))?;
        Ok(Self { terminate, reload, trigger, payload_path })
    }
}

#[async_trait]
impl TriggerSource for UnixTriggerSource {
    async fn recv(&mut self) -> Option<ControlSignal> {
        tokio::select! {
            _ = self.terminate.recv() => Some(ControlSignal::Terminate),
            _ = self.reload.recv() => Some(ControlSignal::Reload),
            _ = self.trigger.recv() => {
                match tokio::fs::read_to_string(&self.payload_path).await {
                    Ok(text) => text.trim().parse::<i64>().ok().map(|payload| ControlSignal::Trigger { payload }),
                    Err(err) => {
                        warn!(%err, "trigger signal received but payload file unreadable");
                        None
                    }
                }
            }
        }
    }
}

/// `TriggerSource` backed by an in-process channel, for tests and non-Unix
/// harnesses.
pub struct ChannelTriggerSource {
    receiver: mpsc::Receiver<ControlSignal>,
}

impl ChannelTriggerSource {
    pub fn new() -> (mpsc::Sender<ControlSignal>, Self) {
        let (tx, rx) = mpsc::channel(16);
        (tx, Self { receiver: rx })
    }
}

#[async_trait]
impl TriggerSource for ChannelTriggerSource {
    async fn recv(&mut self) -> Option<ControlSignal> {
        self.receiver.recv().await
    }
}

#[allow(dead_code)]
struct Waiter {
    assignment: String,
    stage: Stage,
    handle: tokio::task::JoinHandle<()>,
}

/// PID-1 supervisor loop: spawns one waiter per not-yet-passed deadline,
/// blocks on the control-signal set, and reacts to RELOAD/TERMINATE/TRIGGER.
pub struct Orchestrator {
    ctx: CoreContext,
    deadline_runner_binary: String,
    in_flight: HashSet<(String, Stage)>,
}

impl Orchestrator {
    pub fn new(ctx: CoreContext, deadline_runner_binary: impl Into<String>) -> Self {
        Self { ctx, deadline_runner_binary: deadline_runner_binary.into(), in_flight: HashSet::new() }
    }

    #[instrument(skip(self, source))]
    pub async fn run(&mut self, mut source: impl TriggerSource) -> StoreResult<()> {
        loop {
            let mut waiters = self.spawn_waiters().await?;

            match source.recv().await {
                None | Some(ControlSignal::Terminate) => {
                    self.kill_all(&mut waiters).await;
                    info!("orchestrator terminating");
                    return Ok(());
                }
                Some(ControlSignal::Reload) => {
                    self.kill_all(&mut waiters).await;
                    info!("orchestrator reloading");
                    continue;
                }
                Some(ControlSignal::Trigger { payload }) => {
                    self.kill_all(&mut waiters).await;
                    self.handle_trigger(payload).await;
                }
            }
        }
    }

    async fn spawn_waiters(&self) -> StoreResult<Vec<Waiter>> {
        let assignments = self.ctx.assignments.list().await?;
        let mut waiters = Vec::new();
        let now = Utc::now().timestamp();

        for assignment in assignments {
            for stage in Stage::ALL {
                let due = assignment.due_for(stage);
                if due == FAR_FUTURE {
                    info!(asn = %assignment.name, %stage, "skipping deadline, disabled");
                    continue;
                }
                if due <= now {
                    info!(asn = %assignment.name, %stage, "skipping deadline, already past");
                    continue;
                }
                waiters.push(self.spawn_waiter(assignment.name.clone(), stage, due, now));
            }
        }
        Ok(waiters)
    }

    fn spawn_waiter(&self, assignment: String, stage: Stage, due: i64, now: i64) -> Waiter {
        let sleep_secs = (due - now).max(0) as u64;
        let binary = self.deadline_runner_binary.clone();
        let stage_arg = stage.as_str().to_string();
        let asn = assignment.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(sleep_secs)).await;
            let mut child = match Command::new(&binary).arg(&asn).arg(&stage_arg).spawn() {
                Ok(child) => child,
                Err(err) => {
                    warn!(asn, stage = %stage_arg, %err, "deadline-runner waiter failed to spawn");
                    return;
                }
            };
            if let Err(err) = child.wait().await {
                warn!(asn, stage = %stage_arg, %err, "deadline-runner waiter failed");
            }
        });
        Waiter { assignment, stage, handle }
    }

    /// `TERM` is treated as "exit without running the runner": aborting the
    /// sleeping task is equivalent since the subprocess hasn't been spawned
    /// yet for any waiter still inside its sleep.
    async fn kill_all(&self, waiters: &mut [Waiter]) {
        for waiter in waiters.iter_mut() {
            waiter.handle.abort();
        }
    }

    #[instrument(skip(self))]
    async fn handle_trigger(&mut self, payload: i64) {
        let (assignment_id, stage) = decode_trigger_payload(payload);
        let Some(stage) = stage else {
            warn!(payload, "trigger payload decoded to an invalid stage, rejecting");
            return;
        };

        let assignment = match self.ctx.assignments.get_by_id(assignment_id).await {
            Ok(Some(a)) => a,
            Ok(None) => {
                warn!(assignment_id, "trigger references unknown assignment, rejecting");
                return;
            }
            Err(err) => {
                warn!(%err, "failed to look up assignment for trigger");
                return;
            }
        };

        let key = (assignment.name.clone(), stage);
        if self.in_flight.contains(&key) {
            warn!(asn = %assignment.name, %stage, "deadline runner already in flight, rejecting trigger");
            return;
        }

        let now = Utc::now().timestamp();
        if assignment.due_for(stage) <= now {
            warn!(asn = %assignment.name, %stage, "trigger references a deadline already in the past, rejecting");
            return;
        }

        if let Err(err) = self.ctx.assignments.set_deadline_now(assignment.id, stage, now).await {
            warn!(%err, "failed to advance deadline for trigger");
            return;
        }

        self.in_flight.insert(key.clone());
        let result = self.run_stage(&assignment.name, stage).await;
        self.in_flight.remove(&key);

        if let Err(err) = result {
            warn!(asn = %assignment.name, %stage, %err, "deadline runner failed");
        }
    }

    async fn run_stage(&self, asn: &str, stage: Stage) -> StoreResult<()> {
        match stage {
            Stage::Initial => deadline::initial(&self.ctx, asn).await.map(|_| ()),
            Stage::Peer => deadline::peer_review(&self.ctx, asn).await.map(|_| ()),
            Stage::Final => deadline::final_stage(&self.ctx, asn).await.map(|_| ()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_trigger_source_round_trips_signals() {
        let (tx, mut source) = ChannelTriggerSource::new();
        tx.send(ControlSignal::Reload).await.unwrap();
        assert_eq!(source.recv().await, Some(ControlSignal::Reload));
    }
}
