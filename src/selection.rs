//! Selection Operator Implementations
//! See [genetic::Selector] for more info.

use serde::{Deserialize, Serialize};

use crate::genetic::{AsContext, Genome, Selector};

/// Truncation Selection: keep the fittest fraction of the population, discard the rest.
/// https://en.wikipedia.org/wiki/Truncation_selection
///
/// The returned pool is sorted by ascending fitness, so the fittest individual is last.
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct TruncationSelection {
	pub rate: f64, // fraction kept, rounded up (in 0..=1)
}

impl TruncationSelection {
	pub fn new(rate: f64) -> Self {
		assert!(
			(0.0..=1.0).contains(&rate),
			"selection rate must be in [0,1]"
		);
		Self { rate }
	}

	/// Keep the top half, rounded up.
	pub fn top_half() -> Self {
		Self::new(0.5)
	}

	pub fn keep_count(&self, len: usize) -> usize {
		((self.rate * len as f64).ceil() as usize).min(len)
	}
}

impl<G, C> Selector<G, C> for TruncationSelection
where
	G: Genome,
	C: AsContext,
{
	fn select(&self, _ctx: &mut C, mut pop: Vec<G>) -> Vec<G> {
		// stable, so equal fitnesses keep their population order
		pop.sort_by(|a, b| f64::total_cmp(&a.fitness(), &b.fitness()));
		let keep = self.keep_count(pop.len());
		pop.split_off(pop.len() - keep)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::context::Context;

	struct F(f64);
	impl Genome for F {
		fn fitness(&self) -> f64 {
			self.0
		}
	}

	fn fits(v: &[F]) -> Vec<f64> {
		v.iter().map(|f| f.0).collect()
	}

	#[test]
	fn keeps_top_half_ascending() {
		let mut ctx = Context::new(0, "out");
		let pop = vec![F(0.5), F(3.0), F(0.0), F(1.0)];
		let pool = TruncationSelection::top_half().select(&mut ctx, pop);
		assert_eq!(fits(&pool), vec![1.0, 3.0]);
	}

	#[test]
	fn odd_sizes_round_up() {
		let mut ctx = Context::new(0, "out");
		let pop = vec![F(5.0), F(1.0), F(4.0), F(2.0), F(3.0)];
		let pool = TruncationSelection::top_half().select(&mut ctx, pop);
		assert_eq!(fits(&pool), vec![3.0, 4.0, 5.0]);
	}

	#[test]
	fn handles_tiny_populations() {
		let mut ctx = Context::new(0, "out");
		let pool = TruncationSelection::top_half().select(&mut ctx, vec![F(1.0)]);
		assert_eq!(pool.len(), 1);
		let pool = TruncationSelection::top_half().select(&mut ctx, Vec::<F>::new());
		assert!(pool.is_empty());
	}
}
