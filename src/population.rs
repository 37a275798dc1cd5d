use std::ops::Range;

use rand::Rng;

use crate::{
	agent::{Agent, Color},
	error::{Error, Result},
	network::NetworkController,
	params::Params,
	physics::World,
};

/// Ordered, non-empty collection of agents. Its size only changes by wholesale replacement.
#[derive(Debug)]
pub struct Population<B> {
	agents: Vec<Agent<B>>,
}

impl<B> Population<B> {
	pub fn new(agents: Vec<Agent<B>>) -> Result<Self> {
		if agents.is_empty() {
			return Err(Error::InsufficientPopulation { pool: 0 });
		}
		Ok(Population { agents })
	}

	pub fn len(&self) -> usize {
		self.agents.len()
	}

	pub fn is_empty(&self) -> bool {
		self.agents.is_empty()
	}

	pub fn iter(&self) -> std::slice::Iter<'_, Agent<B>> {
		self.agents.iter()
	}

	pub fn get(&self, index: usize) -> Option<&Agent<B>> {
		self.agents.get(index)
	}

	/// Agents covered by a batch window.
	pub fn window(&self, window: &BatchWindow) -> &[Agent<B>] {
		&self.agents[window.range()]
	}

	pub fn window_mut(&mut self, window: &BatchWindow) -> &mut [Agent<B>] {
		let range = window.range();
		&mut self.agents[range]
	}

	pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, Agent<B>> {
		self.agents.iter_mut()
	}

	/// References sorted by ascending fitness. Ties keep population order.
	pub fn ranked(&self) -> Vec<&Agent<B>> {
		let mut out: Vec<_> = self.agents.iter().collect();
		out.sort_by(|a, b| a.fitness.total_cmp(&b.fitness));
		out
	}

	pub fn max_fitness(&self) -> f64 {
		self.agents
			.iter()
			.map(|a| a.fitness)
			.fold(f64::NEG_INFINITY, f64::max)
	}

	pub fn avg_fitness(&self) -> f64 {
		self.agents.iter().map(|a| a.fitness).sum::<f64>() / self.agents.len() as f64
	}
}

impl<B: crate::physics::Body> Population<B> {
	/// Fresh random controllers and colors, each on a newly spawned body.
	pub fn random<W, R>(params: &Params, world: &mut W, rng: &mut R) -> Self
	where
		W: World<Body = B>,
		R: Rng,
	{
		let agents = (0..params.population_size.max(1))
			.map(|_| {
				let controller = NetworkController::random(params.topology, params.init_sigma, rng);
				Agent::new(controller, Color::random(rng), world.spawn())
			})
			.collect();
		Population { agents }
	}
}

impl<'a, B> IntoIterator for &'a Population<B> {
	type Item = &'a Agent<B>;
	type IntoIter = std::slice::Iter<'a, Agent<B>>;

	fn into_iter(self) -> Self::IntoIter {
		self.agents.iter()
	}
}

/// Cursor over the consecutive batches of a population: `[0, B)`, `[B, 2B)`, ... with the last
/// batch clipped to the population size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchWindow {
	batch_size: usize,
	len: usize,
	index: usize,
}

impl BatchWindow {
	pub fn new(batch_size: usize, len: usize) -> Self {
		BatchWindow {
			batch_size: batch_size.max(1),
			len,
			index: 0,
		}
	}

	pub fn range(&self) -> Range<usize> {
		let start = (self.index * self.batch_size).min(self.len);
		let end = (start + self.batch_size).min(self.len);
		start..end
	}

	/// Number of batches in one pass.
	pub fn batches(&self) -> usize {
		self.len.div_ceil(self.batch_size).max(1)
	}

	/// 1-based number of the current batch (the subgeneration count).
	pub fn number(&self) -> usize {
		self.index + 1
	}

	pub fn is_last(&self) -> bool {
		self.number() >= self.batches()
	}

	/// Slide to the next batch. Returns false, without moving, if this is the last one.
	pub fn advance(&mut self) -> bool {
		if self.is_last() {
			return false;
		}
		self.index += 1;
		true
	}

	pub fn reset(&mut self, len: usize) {
		self.len = len;
		self.index = 0;
	}
}
