mod common;

use common::ScriptedRng;
use eyre::{eyre, Result};
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use strider::{
	evolve::UniformCrossover,
	genetic::Recombiner,
	network::Matrix,
	params::Params,
	physics::{Inert, InertWorld},
	prelude::*,
};

fn controller(ih: f64, ho: f64, bias_ih: f64, bias_ho: f64) -> Result<NetworkController> {
	let weights_ih = Matrix::from_rows(&[vec![ih, ih], vec![ih, ih]])?;
	let weights_ho = Matrix::from_rows(&[vec![ho, ho, ho]])?;
	Ok(NetworkController::from_parts(weights_ih, weights_ho, bias_ih, bias_ho)?)
}

fn population(params: &Params, fitnesses: &[f64], rng: &mut Pcg64Mcg) -> Result<Population<Inert>> {
	let agents = fitnesses
		.iter()
		.map(|&f| {
			let net = NetworkController::random(params.topology, 1.0, rng);
			let mut agent = Agent::new(net, Color::random(rng), Inert);
			agent.fitness = f;
			agent
		})
		.collect();
	Ok(Population::new(agents)?)
}

#[test]
fn scripted_draws_pick_parents_per_entry() -> Result<()> {
	let a = controller(1.0, 10.0, 0.1, 0.2)?;
	let b = controller(2.0, 20.0, 0.3, 0.4)?;
	// four weights_ih draws, three weights_ho draws, then the two bias coins
	let mut rng = ScriptedRng::new(&[0.3, 0.7, 0.2, 0.9, 0.1, 0.6, 0.1, 0.1, 0.9]);
	let x = UniformCrossover {
		mutation_probability: 0.0,
		mutation_sigma: 0.01,
	};
	let child = x.crossover(&mut rng, &a, &b)?;

	assert_eq!(child.weights_ih().to_rows(), vec![vec![1.0, 2.0], vec![1.0, 2.0]]);
	assert_eq!(child.weights_ho().to_rows(), vec![vec![10.0, 20.0, 10.0]]);
	assert_eq!(child.bias_ih(), 0.1);
	assert_eq!(child.bias_ho(), 0.4);
	assert_eq!(rng.used(), 9);
	Ok(())
}

#[test]
fn children_only_hold_parent_values_without_mutation() -> Result<()> {
	let mut rng = Pcg64Mcg::seed_from_u64(3);
	let topo = Topology::new(6, 4, 4);
	let a = NetworkController::random(topo, 1.0, &mut rng);
	let b = NetworkController::random(topo, 1.0, &mut rng);
	let x = UniformCrossover {
		mutation_probability: 0.0,
		mutation_sigma: 0.01,
	};
	for _ in 0..20 {
		let child = x.crossover(&mut rng, &a, &b)?;
		assert_eq!(child.topology(), topo);
		for (m, (pa, pb)) in [
			(child.weights_ih(), (a.weights_ih(), b.weights_ih())),
			(child.weights_ho(), (a.weights_ho(), b.weights_ho())),
		] {
			for ((c, x), y) in m.values().iter().zip(pa.values()).zip(pb.values()) {
				assert!(c == x || c == y, "{c} is neither {x} nor {y}");
			}
		}
	}
	Ok(())
}

#[test]
fn four_agents_one_elite() -> Result<()> {
	let params = Params::builder()
		.population_size(4)
		.elite_count(1)
		.mutation_probability(0.0)
		.build();
	let mut rng = Pcg64Mcg::seed_from_u64(11);
	let pop = population(&params, &[0.5, 3.0, 0.0, 1.0], &mut rng)?;
	let best = pop.get(1).ok_or_else(|| eyre!("missing agent"))?;
	let parents = [pop.get(1), pop.get(3)].map(|a| a.map(|a| a.controller.clone()));

	let mut ctx = Context::new(5, "out");
	let next = GeneticOperator::from_params(&params).advance(&mut ctx, &mut InertWorld, &pop)?;
	assert_eq!(next.len(), 4);

	let elite = next.get(0).ok_or_else(|| eyre!("missing elite"))?;
	assert_eq!(elite.controller, best.controller);
	assert_eq!(elite.color, best.color);
	assert_eq!(elite.fitness, 3.0);

	// children draw only from the two fittest agents
	let [Some(pa), Some(pb)] = parents else {
		return Err(eyre!("missing parent"));
	};
	for child in next.iter().skip(1) {
		assert_eq!(child.fitness, 0.0);
		for ((c, x), y) in child
			.controller
			.weights_ih()
			.values()
			.iter()
			.zip(pa.weights_ih().values())
			.zip(pb.weights_ih().values())
		{
			assert!(c == x || c == y);
		}
	}
	Ok(())
}

#[test]
fn elites_are_best_first() -> Result<()> {
	let params = Params::builder().population_size(6).elite_count(3).build();
	let mut rng = Pcg64Mcg::seed_from_u64(12);
	let pop = population(&params, &[1.0, 6.0, 2.0, 5.0, 3.0, 4.0], &mut rng)?;
	let mut ctx = Context::new(1, "out");
	let next = GeneticOperator::from_params(&params).advance(&mut ctx, &mut InertWorld, &pop)?;
	let fits: Vec<f64> = next.iter().take(3).map(|a| a.fitness).collect();
	assert_eq!(fits, vec![6.0, 5.0, 4.0]);
	Ok(())
}

#[test]
fn population_size_is_preserved() -> Result<()> {
	let mut rng = Pcg64Mcg::seed_from_u64(13);
	for n in [3, 4, 7, 10] {
		for elite in [0, 1, n] {
			let params = Params::builder().population_size(n).elite_count(elite).build();
			let fits: Vec<f64> = (0..n).map(|i| i as f64).collect();
			let pop = population(&params, &fits, &mut rng)?;
			let mut ctx = Context::new(n as u64, "out");
			let next = GeneticOperator::from_params(&params).advance(&mut ctx, &mut InertWorld, &pop)?;
			assert_eq!(next.len(), n, "n = {n}, elite = {elite}");
		}
	}
	Ok(())
}

#[test]
fn tiny_pool_is_an_error() -> Result<()> {
	let params = Params::builder().population_size(2).elite_count(0).build();
	let mut rng = Pcg64Mcg::seed_from_u64(14);
	let pop = population(&params, &[1.0, 2.0], &mut rng)?;
	let mut ctx = Context::new(0, "out");
	let res = GeneticOperator::from_params(&params).advance(&mut ctx, &mut InertWorld, &pop);
	assert!(matches!(res, Err(Error::InsufficientPopulation { pool: 1 })));
	Ok(())
}

#[test]
fn same_seed_same_children() -> Result<()> {
	let params = Params::builder().population_size(8).build();
	let pop = population(&params, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0], &mut Pcg64Mcg::seed_from_u64(1))?;
	let op = GeneticOperator::from_params(&params);
	let a = op.advance(&mut Context::new(99, "out"), &mut InertWorld, &pop)?;
	let b = op.advance(&mut Context::new(99, "out"), &mut InertWorld, &pop)?;
	for (x, y) in a.iter().zip(b.iter()) {
		assert_eq!(x.controller, y.controller);
		assert_eq!(x.color, y.color);
	}
	Ok(())
}
