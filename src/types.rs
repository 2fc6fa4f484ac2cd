use crate::config::AppConfig;
use crate::db::ScheduleStore;
use crate::proposer::ScheduleProposer;

/// Shared state handed to every request handler.
pub struct ServerState {
    /// The one shared mutable resource; no component caches store data
    /// across requests.
    pub store: ScheduleStore,
    /// Port to the external schedule proposer. Injected so tests can swap in
    /// a deterministic stub.
    pub proposer: Box<dyn ScheduleProposer>,
    pub config: AppConfig,
}
