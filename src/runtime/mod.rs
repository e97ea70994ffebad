//! Per-site runtime — the dependency-injected object owning the queue
//! client, stores, and Gate, handed to tickers and the worker pool as
//! `Arc<SiteRuntime>` rather than accessed through ad hoc globals;
//! the sole exception remains the global `SiteConfig` behind `OnceLock`.

mod stall_sweep;
mod state_store;
mod ticker;

pub use stall_sweep::run_stall_sweep;
pub use state_store::{StateStore, StateStoreError};
pub use ticker::run_ticker;

use crate::gate::Gate;
use crate::logic::ControlAlgorithmRegistry;
use crate::queue::JobQueue;
use crate::registry::EquipmentRegistry;
use crate::stores::MetricsStore;
use crate::writer::CommandWriter;
use std::sync::Arc;

pub struct SiteRuntime {
    pub site_id: u32,
    pub registry: Arc<EquipmentRegistry>,
    pub gate: Arc<Gate>,
    pub queue: Arc<dyn JobQueue>,
    pub metrics_store: Arc<dyn MetricsStore>,
    pub command_writer: Arc<dyn CommandWriter>,
    pub state_store: Arc<StateStore>,
    pub algorithms: Arc<ControlAlgorithmRegistry>,
}

impl SiteRuntime {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        site_id: u32,
        registry: Arc<EquipmentRegistry>,
        gate: Arc<Gate>,
        queue: Arc<dyn JobQueue>,
        metrics_store: Arc<dyn MetricsStore>,
        command_writer: Arc<dyn CommandWriter>,
        state_store: Arc<StateStore>,
        algorithms: Arc<ControlAlgorithmRegistry>,
    ) -> Self {
        Self {
            site_id,
            registry,
            gate,
            queue,
            metrics_store,
            command_writer,
            state_store,
            algorithms,
        }
    }
}
