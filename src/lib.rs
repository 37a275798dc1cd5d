//! Evolutionary training loop for neural-network-controlled walkers.
//!
//! A [`Population`](population::Population) of agents is simulated a batch at a time by the
//! [`Scheduler`](scheduler::Scheduler). Once every batch has run, the agents are ranked by distance
//! travelled and the [`GeneticOperator`](evolve::GeneticOperator) breeds the next generation.

pub mod agent;
pub mod context;
pub mod error;
pub mod evolve;
pub mod genetic;
pub mod network;
pub mod params;
pub mod physics;
pub mod population;
pub mod results;
pub mod scheduler;
pub mod selection;
pub mod snapshot;

pub use crate::error::{Error, Result};

pub mod prelude {
	pub use crate::agent::{Agent, AgentView, Color};
	pub use crate::context::Context;
	pub use crate::error::{Error, Result};
	pub use crate::evolve::GeneticOperator;
	pub use crate::genetic::{AsContext, Genome, Results};
	pub use crate::network::{NetworkController, Topology};
	pub use crate::params::Params;
	pub use crate::physics::{Body, World};
	pub use crate::population::Population;
	pub use crate::results::DefaultResults;
	pub use crate::scheduler::{Scheduler, Status, Tick};
	pub use crate::snapshot::{AgentRecord, SnapshotCodec};
}
