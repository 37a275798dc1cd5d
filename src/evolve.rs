//! Generation replacement: elitism, crossover and mutation

use rand::{seq::index, Rng};

use crate::{
	agent::Agent,
	error::{Error, Result},
	genetic::{AsContext, Recombiner, Selector},
	network::{gaussian, Matrix, NetworkController},
	params::Params,
	physics::{Body, World},
	population::Population,
	selection::TruncationSelection,
};

/// Per-entry uniform crossover with a thin mutation slice.
///
/// Each weight entry draws `r` uniformly from `[0, 1)`: below 0.5 it comes from parent A, below
/// `1 - mutation_probability` from parent B, and otherwise it is replaced by a fresh sample from
/// `N(0, mutation_sigma)`. Biases are inherited whole from a coin-flipped parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformCrossover {
	pub mutation_probability: f64,
	pub mutation_sigma: f64,
}

impl UniformCrossover {
	fn mix<R: Rng>(&self, rng: &mut R, a: &Matrix, b: &Matrix) -> Result<Matrix> {
		let take_b = 1.0 - self.mutation_probability;
		a.zip_with(b, |x, y| {
			let r: f64 = rng.random();
			if r < 0.5 {
				x
			} else if r < take_b {
				y
			} else {
				gaussian(rng, 0.0, self.mutation_sigma)
			}
		})
	}
}

impl Recombiner<NetworkController> for UniformCrossover {
	fn crossover<R: Rng>(
		&self,
		rng: &mut R,
		par_a: &NetworkController,
		par_b: &NetworkController,
	) -> Result<NetworkController> {
		let weights_ih = self.mix(rng, par_a.weights_ih(), par_b.weights_ih())?;
		let weights_ho = self.mix(rng, par_a.weights_ho(), par_b.weights_ho())?;
		let bias_ih = if rng.random::<f64>() < 0.5 {
			par_a.bias_ih()
		} else {
			par_b.bias_ih()
		};
		let bias_ho = if rng.random::<f64>() < 0.5 {
			par_a.bias_ho()
		} else {
			par_b.bias_ho()
		};
		NetworkController::from_parts(weights_ih, weights_ho, bias_ih, bias_ho)
	}
}

/// Turns an evaluated population into the next one: the fittest `elite_count` agents are carried
/// over unchanged, and the rest of the slots are filled with children of two distinct parents
/// from the fitter half.
#[derive(Debug, Clone)]
pub struct GeneticOperator {
	pub elite_count: usize,
	pub selection: TruncationSelection,
	pub crossover: UniformCrossover,
}

impl GeneticOperator {
	pub fn from_params(params: &Params) -> Self {
		GeneticOperator {
			elite_count: params.elite_count,
			selection: TruncationSelection::top_half(),
			crossover: UniformCrossover {
				mutation_probability: params.mutation_probability,
				mutation_sigma: params.mutation_sigma,
			},
		}
	}

	/// Breed the next population. The current one is left untouched, so a failure here leaves the
	/// caller with the population it had.
	pub fn advance<C, W>(
		&self,
		ctx: &mut C,
		world: &mut W,
		ranked: &Population<W::Body>,
	) -> Result<Population<W::Body>>
	where
		C: AsContext,
		W: World,
	{
		let size = ranked.len();
		let pool = self
			.selection
			.select(ctx, ranked.iter().collect::<Vec<&Agent<W::Body>>>());
		if pool.len() < 2 {
			return Err(Error::InsufficientPopulation { pool: pool.len() });
		}
		log::debug!(
			"Selected {} of {} agents for breeding (fitness {:.3} to {:.3}).",
			pool.len(),
			size,
			pool[0].fitness,
			pool[pool.len() - 1].fitness
		);

		let mut next: Vec<Agent<W::Body>> = Vec::with_capacity(size);

		let elitism_cnt = self.elite_count.min(pool.len()).min(size);
		if elitism_cnt > 0 {
			log::info!("Passing {elitism_cnt} elites to next generation.");
			next.extend(
				pool.iter()
					.rev()
					.take(elitism_cnt)
					.map(|elite| elite.carry_over(world.spawn())),
			);
		}

		let needed = size - elitism_cnt;
		log::info!("Breeding {needed} children from {} parents.", pool.len());
		while next.len() < size {
			let parents = index::sample(ctx.rng(), pool.len(), 2);
			let (par_a, par_b) = (pool[parents.index(0)], pool[parents.index(1)]);
			let controller = self
				.crossover
				.crossover(ctx.rng(), &par_a.controller, &par_b.controller)?;
			let color = par_a.color.blend(&par_b.color);
			log::debug!(
				"Child {} from parents with fitness {:.3} and {:.3}.",
				next.len(),
				par_a.fitness,
				par_b.fitness
			);
			next.push(Agent::new(controller, color, world.spawn()));
		}

		debug_assert_eq!(next.len(), size, "should be fully populated");
		Population::new(next)
	}
}

/// Current fitness leader of a set of agents.
pub fn leader<'a, B: Body>(agents: impl IntoIterator<Item = &'a Agent<B>>) -> Option<&'a Agent<B>>
where
	B: 'a,
{
	agents
		.into_iter()
		.max_by(|a, b| a.fitness.total_cmp(&b.fitness))
}

#[cfg(test)]
mod tests {
	use rand::SeedableRng;
	use rand_pcg::Pcg64Mcg;

	use super::*;
	use crate::network::Topology;

	#[test]
	fn parents_of_different_shape_are_rejected() {
		let mut rng = Pcg64Mcg::seed_from_u64(9);
		let a = NetworkController::random(Topology::new(4, 3, 4), 1.0, &mut rng);
		let b = NetworkController::random(Topology::new(5, 3, 4), 1.0, &mut rng);
		let x = UniformCrossover {
			mutation_probability: 0.05,
			mutation_sigma: 0.01,
		};
		assert!(matches!(
			x.crossover(&mut rng, &a, &b),
			Err(Error::DimensionMismatch { .. })
		));
	}

	#[test]
	fn full_mutation_slice_replaces_b_entries() {
		// with p = 0.5 nothing is ever taken from parent B
		let mut rng = Pcg64Mcg::seed_from_u64(17);
		let topo = Topology::new(6, 5, 4);
		let a = NetworkController::random(topo, 1.0, &mut rng);
		let b = NetworkController::random(topo, 1.0, &mut rng);
		let x = UniformCrossover {
			mutation_probability: 0.5,
			mutation_sigma: 0.01,
		};
		let child = x.crossover(&mut rng, &a, &b).unwrap();
		let from_b = child
			.weights_ih()
			.values()
			.iter()
			.zip(b.weights_ih().values())
			.zip(a.weights_ih().values())
			.filter(|((c, b), a)| c == b && c != a)
			.count();
		assert_eq!(from_b, 0);
	}
}
