//! Subgeneration scheduler
//!
//! A generation steps the population one batch ("subgeneration") at a time. A batch runs for at
//! least `subgen_duration` of simulated time, and keeps running while its best distance is still
//! improving: it only ends once `subgen_bonus` has passed since the last improvement. After the
//! last batch the whole population is ranked and handed to the [`GeneticOperator`].

use std::{fs, path::Path};

use crate::{
	agent::AgentView,
	context::Context,
	error::{Error, Result},
	evolve::{leader, GeneticOperator},
	genetic::{AsContext, Results},
	params::Params,
	physics::{Body, World},
	population::{BatchWindow, Population},
	snapshot::{AgentRecord, SnapshotCodec},
};

/// Slack for comparing simulated times built from whole ticks.
const TIME_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
	RunningBatch,
	BatchComplete,
	GenerationComplete,
}

/// What a single tick accomplished.
#[derive(Debug, Clone, PartialEq)]
pub enum Tick {
	/// The active batch was stepped and keeps running.
	Running,
	/// Batch `subgen` ended after `elapsed` seconds; the next batch starts on the next tick.
	BatchAdvanced { subgen: usize, elapsed: f64 },
	/// The last batch ended and the population was replaced.
	GenerationAdvanced(GenerationSummary),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSummary {
	pub generation: usize,
	pub max_fitness: f64,
	pub avg_fitness: f64,
	pub best: AgentRecord,
}

/// Snapshot of the scheduler for display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Status {
	pub generation: usize,
	pub subgen: usize,
	pub subgens: usize,
	pub phase: Phase,
	/// Simulated time since the generation started.
	pub sim_time: f64,
	/// Simulated time since the active batch started.
	pub subgen_time: f64,
	/// Best distance currently held in the active batch.
	pub max_distance: f64,
	/// Where the active batch's leader is, for a camera to follow.
	pub leader_position: Option<[f64; 2]>,
}

/// Improvement tracking for the active batch, in ticks since the generation started.
#[derive(Debug, Clone, Copy)]
struct SubgenClock {
	start: u64,
	best: f64,
	improved: u64,
}

impl SubgenClock {
	fn starting_at(tick: u64) -> Self {
		SubgenClock {
			start: tick,
			best: 0.0,
			improved: tick,
		}
	}
}

/// Drives one training run: owns the run context, the population and the world its bodies come from.
pub struct Scheduler<W: World> {
	params: Params,
	ctx: Context,
	world: W,
	operator: GeneticOperator,
	codec: SnapshotCodec,
	results: Vec<Box<dyn Results>>,

	population: Population<W::Body>,
	/// Next generation, bred but not yet committed because a results hook failed.
	bred: Option<Population<W::Body>>,
	window: BatchWindow,
	phase: Phase,
	ticks: u64,
	clock: SubgenClock,
}

impl<W: World> Scheduler<W> {
	/// Start a run from a fresh random population.
	pub fn new(params: Params, mut ctx: Context, mut world: W) -> Result<Self> {
		params.validate()?;
		let population = Population::random(&params, &mut world, ctx.rng());
		Self::with_population(params, ctx, world, population)
	}

	/// Start a run from an existing population, which must have the configured size.
	pub fn with_population(
		params: Params,
		ctx: Context,
		world: W,
		population: Population<W::Body>,
	) -> Result<Self> {
		params.validate()?;
		if population.len() != params.population_size {
			return Err(Error::invalid(format!(
				"population has {} agents, expected {}",
				population.len(),
				params.population_size
			)));
		}
		let window = BatchWindow::new(params.batch_size, population.len());
		Ok(Scheduler {
			operator: GeneticOperator::from_params(&params),
			codec: SnapshotCodec::from_params(&params),
			params,
			ctx,
			world,
			results: Vec::new(),
			population,
			bred: None,
			window,
			phase: Phase::RunningBatch,
			ticks: 0,
			clock: SubgenClock::starting_at(0),
		})
	}

	/// Add another results object before running.
	pub fn register_results(&mut self, results: Box<dyn Results>) {
		self.results.push(results);
	}

	/// Create the run directory, write `config.toml` for replay, and initialize results.
	pub fn start(&mut self) -> Result<()> {
		log::info!(
			"Beginning run in {} with {} agents in {} batches of {}.",
			self.ctx.outdir().display(),
			self.params.population_size,
			self.params.subgens_per_generation(),
			self.params.batch_size
		);
		self.ctx.create_outdir()?;
		fs::write(
			self.ctx.outdir().join("config.toml"),
			self.params.to_toml_string()?,
		)?;
		for r in &mut self.results {
			r.initialize(&mut self.ctx)?;
		}
		Ok(())
	}

	/// Finalize all results.
	pub fn finish(&mut self) -> Result<()> {
		for r in &mut self.results {
			r.finalize(&mut self.ctx)?;
		}
		log::info!(
			"Completed {} generations. Results are in {}",
			self.ctx.generation,
			self.ctx.outdir().display()
		);
		Ok(())
	}

	pub fn params(&self) -> &Params {
		&self.params
	}

	pub fn context(&self) -> &Context {
		&self.ctx
	}

	pub fn population(&self) -> &Population<W::Body> {
		&self.population
	}

	pub fn phase(&self) -> Phase {
		self.phase
	}

	/// Simulated seconds spanned by a number of ticks.
	fn secs(&self, ticks: u64) -> f64 {
		ticks as f64 * self.params.time_step
	}

	pub fn status(&self) -> Status {
		let active = self.population.window(&self.window);
		let best = leader(active);
		Status {
			generation: self.ctx.generation,
			subgen: self.window.number(),
			subgens: self.window.batches(),
			phase: self.phase,
			sim_time: self.secs(self.ticks),
			subgen_time: self.secs(self.ticks - self.clock.start),
			max_distance: best.map_or(0.0, |a| a.fitness),
			leader_position: best.map(|a| a.body().position()),
		}
	}

	/// Read-only views of the agents being simulated right now.
	pub fn active_agents(&self) -> impl Iterator<Item = AgentView> + '_ {
		self.population.window(&self.window).iter().map(|a| a.view())
	}

	/// Advance the run by one fixed time step. Batch and generation transitions happen at the end
	/// of the tick that triggers them.
	pub fn tick(&mut self) -> Result<Tick> {
		if self.phase == Phase::RunningBatch {
			self.step_window()?;
			if !self.batch_expired() {
				return Ok(Tick::Running);
			}
			self.phase = Phase::BatchComplete;
		}

		if self.phase == Phase::BatchComplete {
			let subgen = self.window.number();
			let elapsed = self.secs(self.ticks - self.clock.start);
			if !self.window.is_last() {
				self.window.advance();
				self.clock = SubgenClock::starting_at(self.ticks);
				self.phase = Phase::RunningBatch;
				log::debug!(
					"Subgeneration {subgen} ended after {elapsed:.3}s; now running agents {:?}.",
					self.window.range()
				);
				return Ok(Tick::BatchAdvanced { subgen, elapsed });
			}
			log::debug!("Subgeneration {subgen} (last) ended after {elapsed:.3}s.");
			self.phase = Phase::GenerationComplete;
		}

		self.complete_generation().map(Tick::GenerationAdvanced)
	}

	/// Tick until `n` more generations have been bred.
	pub fn run_generations(&mut self, n: usize) -> Result<Vec<GenerationSummary>> {
		let mut out = Vec::with_capacity(n);
		while out.len() < n {
			if let Tick::GenerationAdvanced(summary) = self.tick()? {
				out.push(summary);
			}
		}
		Ok(out)
	}

	fn step_window(&mut self) -> Result<()> {
		// a bad sensor vector has to fail the tick before any body has moved
		if !self.params.degraded_mode {
			for agent in self.population.window(&self.window) {
				agent.check_sensors()?;
			}
		}

		let dt = self.params.time_step;
		let strength = self.params.strength;
		let start = self.window.range().start;
		for (offset, agent) in self.population.window_mut(&self.window).iter_mut().enumerate() {
			match agent.step(dt, &strength) {
				Ok(()) => {}
				Err(e) if self.params.degraded_mode && !e.is_fatal() => {
					log::warn!("Skipping agent {} for this tick: {e}", start + offset);
				}
				Err(e) => return Err(e),
			}
		}
		self.ticks += 1;

		let window_max = self
			.population
			.window(&self.window)
			.iter()
			.map(|a| a.fitness)
			.fold(f64::NEG_INFINITY, f64::max);
		if window_max > self.clock.best {
			self.clock.best = window_max;
			self.clock.improved = self.ticks;
		}
		Ok(())
	}

	fn batch_expired(&self) -> bool {
		let elapsed = self.secs(self.ticks - self.clock.start);
		let since_improvement = self.secs(self.ticks - self.clock.improved);
		elapsed + TIME_EPSILON >= self.params.subgen_duration
			&& since_improvement + TIME_EPSILON >= self.params.subgen_bonus
	}

	fn complete_generation(&mut self) -> Result<GenerationSummary> {
		for agent in self.population.iter_mut() {
			agent.update_fitness();
		}
		let generation = self.ctx.generation;
		self.ctx.max_fitness = self.population.max_fitness();
		self.ctx.avg_fitness = self.population.avg_fitness();
		let ranked = self.codec.encode(self.population.ranked());

		let next = match self.bred.take() {
			Some(next) => next,
			None => {
				log::info!("Breeding generation {}.", generation + 1);
				self.operator
					.advance(&mut self.ctx, &mut self.world, &self.population)?
			}
		};

		let summary = GenerationSummary {
			generation,
			max_fitness: self.ctx.max_fitness,
			avg_fitness: self.ctx.avg_fitness,
			best: ranked
				.last()
				.cloned()
				.ok_or(Error::InsufficientPopulation { pool: 0 })?,
		};
		// nothing is committed until every hook has seen this generation; a retry reuses `next`
		for r in &mut self.results {
			if let Err(e) = r.record_generation(&mut self.ctx, &ranked) {
				self.bred = Some(next);
				return Err(e);
			}
		}

		self.population = next;
		self.restart_generation();
		self.ctx.generation += 1;
		Ok(summary)
	}

	fn restart_generation(&mut self) {
		self.bred = None;
		self.window.reset(self.population.len());
		self.ticks = 0;
		self.clock = SubgenClock::starting_at(0);
		self.phase = Phase::RunningBatch;
	}

	/// Write the current population to a snapshot file.
	pub fn save_snapshot(&self, path: impl AsRef<Path>) -> Result<()> {
		self.codec.write_file(path, &self.population)
	}

	/// Replace the population with one loaded from a snapshot file and restart the generation from
	/// its first batch. On any error the current population is kept.
	pub fn load_snapshot(&mut self, path: impl AsRef<Path>) -> Result<()> {
		let population = self.codec.read_file(path, &mut self.world)?;
		log::info!("Loaded {} agents from snapshot.", population.len());
		self.population = population;
		self.restart_generation();
		Ok(())
	}

	/// Replace the population with fresh random agents and restart the generation.
	pub fn reset(&mut self) {
		self.population = Population::random(&self.params, &mut self.world, self.ctx.rng());
		self.restart_generation();
		log::info!("Reset population to {} random agents.", self.population.len());
	}
}
