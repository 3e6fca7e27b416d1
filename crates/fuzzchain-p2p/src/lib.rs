pub mod actor;
pub mod config;
pub mod error;
pub mod report;
pub mod sim;

pub use actor::{run_actors, ActorNetwork, ChannelTransport, Envelope};
pub use config::{RuntimeKind, SimulationConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use report::{DeliveryStats, SimulationReport};
pub use sim::{build_nodes, sync_chains, EventQueue, Simulation};

/// Run `config` on whichever runtime it selects.
///
/// The event loop never yields, so it runs on the blocking pool.
pub async fn run(config: SimulationConfig) -> RuntimeResult<SimulationReport> {
    match config.runtime {
        RuntimeKind::EventLoop => {
            let simulation = Simulation::new(config)?;
            tokio::task::spawn_blocking(move || simulation.run())
                .await
                .map_err(|e| RuntimeError::EventLoopFailed(e.to_string()))
        }
        RuntimeKind::Actors => run_actors(config).await,
    }
}
