use std::{fs, time::Instant};

use csv::Writer;
use serde::Serialize;

use crate::{
	context::Context,
	error::Result,
	genetic::Results,
	params::ResultsParams,
	snapshot::{AgentRecord, SnapshotCodec},
};

/// Per-generation summary row, saved to the datafile.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct GenerationRecord {
	pub generation: usize,
	pub max_fitness: f64,
	pub avg_fitness: f64,
	pub min_fitness: f64,
	pub seconds: f64, // wall-clock time spent on this generation
}

#[derive(Debug, Serialize, Clone)]
pub struct DefaultResults {
	#[serde(skip)]
	pub resultsfile: Option<String>, // this results.json file
	pub datafile: Option<String>, // per-generation stats csv
	#[serde(skip)]
	pub archive_generations: bool, // write every ranked generation to <generation>.json
	pub num_generations: usize,  // how many generations it ran for
	pub total_time: f64,         // total time of run, in seconds
	pub max_fitnesses: Vec<f64>, // top fitness for each generation
	pub avg_fitnesses: Vec<f64>, // mean fitness for each generation
	pub times: Vec<f64>,         // wall-clock time per generation, in seconds

	#[serde(skip)]
	records: Vec<GenerationRecord>,
	#[serde(skip)]
	start_time: Option<Instant>,
	#[serde(skip)]
	latest_time: Option<Instant>,
}

impl DefaultResults {
	pub fn new(params: &ResultsParams) -> Self {
		DefaultResults {
			resultsfile: params.resultsfile.clone(),
			datafile: params.datafile.clone(),
			archive_generations: params.archive_generations,
			num_generations: 0,
			total_time: 0.0,
			max_fitnesses: Vec::new(),
			avg_fitnesses: Vec::new(),
			times: Vec::new(),
			records: Vec::new(),
			start_time: None,
			latest_time: None,
		}
	}

	pub fn records(&self) -> &[GenerationRecord] {
		&self.records
	}
}

impl Default for DefaultResults {
	fn default() -> Self {
		Self::new(&ResultsParams::default())
	}
}

impl Results for DefaultResults {
	fn initialize(&mut self, _ctx: &mut Context) -> Result<()> {
		self.start_time = Some(Instant::now());
		self.latest_time = Some(Instant::now());
		Ok(())
	}

	fn record_generation(&mut self, ctx: &mut Context, ranked: &[AgentRecord]) -> Result<()> {
		let now = Instant::now();
		let seconds = self
			.latest_time
			.map_or(0.0, |t| now.duration_since(t).as_secs_f64());
		self.latest_time = Some(now);

		let min_fitness = ranked.first().map_or(0.0, |r| r.fitness);
		self.times.push(seconds);
		self.max_fitnesses.push(ctx.max_fitness);
		self.avg_fitnesses.push(ctx.avg_fitness);
		self.records.push(GenerationRecord {
			generation: ctx.generation,
			max_fitness: ctx.max_fitness,
			avg_fitness: ctx.avg_fitness,
			min_fitness,
			seconds,
		});

		log::info!(
			"Generation {}: max {:.3}, mean {:.3}, min {:.3}.",
			ctx.generation,
			ctx.max_fitness,
			ctx.avg_fitness,
			min_fitness
		);
		log::info!("Top 10:");
		for (rank, rec) in ranked.iter().rev().take(10).enumerate() {
			log::info!("\t#{}: {:.3} <-- color {:?}", rank + 1, rec.fitness, <[u8; 4]>::from(rec.color));
		}

		if self.archive_generations {
			ctx.create_outdir()?;
			let file = ctx.outdir().join(format!("{}.json", ctx.generation));
			SnapshotCodec::write_records(file, ranked)?;
		}
		Ok(())
	}

	fn finalize(&mut self, ctx: &mut Context) -> Result<()> {
		self.total_time = self.start_time.map_or(0.0, |t| t.elapsed().as_secs_f64());
		self.num_generations = self.records.len();
		ctx.create_outdir()?;

		// data.csv
		if let Some(datafile) = &self.datafile {
			let mut wtr = Writer::from_path(ctx.outdir().join(datafile))?;
			for rec in &self.records {
				wtr.serialize(rec)?;
			}
			wtr.flush()?;
		}

		// results.json
		if let Some(resultsfile) = &self.resultsfile {
			let results = serde_json::to_string_pretty(&self)?;
			fs::write(ctx.outdir().join(resultsfile), results)?;
		}
		Ok(())
	}
}
