use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use eyre::eyre;
use rand::Rng;
use strider::{
	evolve::GeneticOperator,
	network::Topology,
	physics::{Inert, InertWorld},
	population::Population,
	prelude::*,
	snapshot::NetworkRecord,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
	#[command(subcommand)]
	pub command: Command,

	/// Config filename (TOML parameters, e.g. a run's config.toml for replay)
	#[arg(short = 'F', long = "config", global = true)]
	pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Write a fresh random population snapshot
	Init {
		/// Snapshot file to write
		#[arg(short, long)]
		output: PathBuf,

		/// Seed for the random population
		#[arg(short = 's', long = "seed")]
		seed: Option<u64>,
	},
	/// Print a summary of a population snapshot
	Inspect {
		/// Snapshot file to read
		file: PathBuf,
	},
	/// Breed the next generation from a snapshot, using the fitness it recorded
	Breed {
		/// Snapshot file to read
		file: PathBuf,

		/// Snapshot file to write
		#[arg(short, long)]
		output: PathBuf,

		/// Seed for parent sampling and mutation
		#[arg(short = 's', long = "seed")]
		seed: Option<u64>,
	},
}

fn load_params(config: Option<&str>) -> eyre::Result<Params> {
	Ok(match config {
		Some(filename) => Params::from_toml_file(filename)?,
		None => Params::default(),
	})
}

/// Seeds stay within i64 so they can be written back to `config.toml`.
fn pick_seed(cli_seed: Option<u64>, params: &Params) -> u64 {
	cli_seed
		.or(params.seed)
		.unwrap_or_else(|| rand::rng().random_range(0..i64::MAX as u64))
}

/// Layer sizes implied by a stored network.
fn topology_of(rec: &NetworkRecord) -> Topology {
	let input_cols = rec.weights_ih.first().map_or(0, Vec::len);
	Topology::new(
		input_cols.saturating_sub(1),
		rec.weights_ih.len(),
		rec.weights_ho.len(),
	)
}

/// Read a snapshot of any size, checked against the topology of its first record.
fn read_snapshot(file: &Path) -> eyre::Result<(Topology, Population<Inert>)> {
	let records = SnapshotCodec::read_records(file)?;
	let first = records
		.first()
		.ok_or_else(|| eyre!("snapshot {} has no agents", file.display()))?;
	let topology = topology_of(&first.network);
	let population = SnapshotCodec::new(topology, records.len()).decode(&records, &mut InertWorld)?;
	Ok((topology, population))
}

fn main() -> eyre::Result<()> {
	pretty_env_logger::init();

	let cli = Cli::parse();
	let mut params = load_params(cli.config.as_deref())?;

	match &cli.command {
		Command::Init { output, seed } => {
			params.validate()?;
			let seed = pick_seed(*seed, &params);
			log::info!("Creating {} agents with seed {seed}.", params.population_size);
			let mut ctx = Context::new(seed, &params.results.output_dir);
			let population = Population::random(&params, &mut InertWorld, ctx.rng());
			SnapshotCodec::from_params(&params).write_file(output, &population)?;
			println!("Wrote {} agents to {}", population.len(), output.display());
		}
		Command::Inspect { file } => {
			let (topology, population) = read_snapshot(file)?;
			println!("{}: {} agents", file.display(), population.len());
			println!(
				"topology: {} inputs, {} hidden, {} outputs",
				topology.input_nodes, topology.hidden_nodes, topology.output_nodes
			);
			println!(
				"fitness: max {:.3}, mean {:.3}",
				population.max_fitness(),
				population.avg_fitness()
			);
			println!("Top 10:");
			for (rank, agent) in population.ranked().iter().rev().take(10).enumerate() {
				println!(
					"\t#{}: {:.3} <-- color {:?}",
					rank + 1,
					agent.fitness,
					<[u8; 4]>::from(agent.color)
				);
			}
		}
		Command::Breed { file, output, seed } => {
			let (topology, population) = read_snapshot(file)?;
			params.topology = topology;
			params.population_size = population.len();
			params.elite_count = params.elite_count.min(population.len());
			params.validate()?;

			let seed = pick_seed(*seed, &params);
			log::info!("Breeding {} agents with seed {seed}.", population.len());
			let mut ctx = Context::new(seed, &params.results.output_dir);
			let next = GeneticOperator::from_params(&params).advance(&mut ctx, &mut InertWorld, &population)?;
			SnapshotCodec::from_params(&params).write_file(output, &next)?;
			println!(
				"Bred {} agents (best parent {:.3}) into {}",
				next.len(),
				population.max_fitness(),
				output.display()
			);
		}
	}

	Ok(())
}
