use async_trait::async_trait;

/// The three signals the Orchestrator reacts to, decoded from whatever
/// transport delivers them (realtime Unix signals in production, an mpsc
/// channel in tests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    Reload,
    Terminate,
    /// `payload` is `assignment_id * 3 + component_id`.
    Trigger { payload: i64 },
}

/// Abstracts how control signals reach the Orchestrator so the reload/
/// terminate/trigger state machine can be driven by real Unix signals in
/// production and by a plain channel in tests, without changing semantics.
#[async_trait]
pub trait TriggerSource: Send + Sync {
    async fn recv(&mut self) -> Option<ControlSignal>;
}
