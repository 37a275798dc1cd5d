//! Genetic Algorithm Types

use rand::Rng;

use crate::{context::Context, error::Result, snapshot::AgentRecord};

/// Genetic Algorithm Context
pub trait AsContext {
	/// Get the RNG
	fn rng(&mut self) -> &mut impl Rng;

	/// Current generation number
	fn generation(&self) -> usize;
}

/// Anything with an evaluated fitness.
pub trait Genome {
	/// The fitness of this Genome after evaluated.
	fn fitness(&self) -> f64;
}

impl<G: Genome> Genome for &G {
	fn fitness(&self) -> f64 {
		(**self).fitness()
	}
}

/// The selection operator in a Genetic Algorithm. Called once per generation on the evaluated
/// population; returns the breeding pool.
pub trait Selector<G, C>
where
	G: Genome,
	C: AsContext,
{
	fn select(&self, ctx: &mut C, pop: Vec<G>) -> Vec<G>;
}

/// The crossover operator in a Genetic Algorithm. Called per-pair.
pub trait Recombiner<T> {
	fn crossover<R: Rng>(&self, rng: &mut R, par_a: &T, par_b: &T) -> Result<T>;
}

/// Aggregates any results from the run. Define hooks to record data.
pub trait Results {
	/// Called once before the first tick.
	fn initialize(&mut self, _ctx: &mut Context) -> Result<()> {
		Ok(())
	}

	/// Called once every generation, after evaluation and before the next generation is bred.
	/// `ranked` is sorted by ascending fitness.
	fn record_generation(&mut self, _ctx: &mut Context, _ranked: &[AgentRecord]) -> Result<()> {
		Ok(())
	}

	/// Finalize results. Any files should be written here.
	fn finalize(&mut self, _ctx: &mut Context) -> Result<()> {
		Ok(())
	}
}
