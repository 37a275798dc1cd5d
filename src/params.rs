use std::{fs, path::Path};

use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::{
	agent::{MuscleStrength, ACTION_OUTPUTS},
	error::{Error, Result},
	network::Topology,
};

pub const DEFAULT_POPULATION_SIZE: usize = 100;
pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_SUBGEN_DURATION: f64 = 3.0;
pub const DEFAULT_SUBGEN_BONUS: f64 = 3.0;
pub const DEFAULT_TIME_STEP: f64 = 1.0 / 60.0;
pub const DEFAULT_MUTATION_PROBABILITY: f64 = 0.05;
pub const DEFAULT_MUTATION_SIGMA: f64 = 0.01;
pub const DEFAULT_INIT_SIGMA: f64 = 1.0;
pub const DEFAULT_ELITE_COUNT: usize = 5;
pub const DEFAULT_LEG_STRENGTH: f64 = 1_000_000.0;
pub const DEFAULT_ARM_STRENGTH: f64 = 50_000.0;

pub fn default_output_dir() -> String {
	String::from("out")
}

pub fn default_datafile() -> String {
	String::from("data.csv")
}

pub fn default_resultsfile() -> String {
	String::from("results.json")
}

/// Parameters for a training run. Fixed once the scheduler is built; can be written out to
/// `config.toml` and read back in to replay a run.
#[derive(Serialize, Deserialize, Builder, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Params {
	/// Seed for the run's random stream. Resolved by the caller before the run starts.
	pub seed: Option<u64>,

	#[builder(default = DEFAULT_POPULATION_SIZE)]
	pub population_size: usize,
	#[builder(default = DEFAULT_BATCH_SIZE)]
	pub batch_size: usize,

	/// Minimum simulated time of a subgeneration, in seconds.
	#[builder(default = DEFAULT_SUBGEN_DURATION)]
	pub subgen_duration: f64,
	/// Simulated time a subgeneration is extended by after its best distance last improved.
	#[builder(default = DEFAULT_SUBGEN_BONUS)]
	pub subgen_bonus: f64,
	#[builder(default = DEFAULT_TIME_STEP)]
	pub time_step: f64,

	#[builder(default = DEFAULT_MUTATION_PROBABILITY)]
	pub mutation_probability: f64,
	#[builder(default = DEFAULT_MUTATION_SIGMA)]
	pub mutation_sigma: f64,
	/// Standard deviation of freshly initialized weights and biases.
	#[builder(default = DEFAULT_INIT_SIGMA)]
	pub init_sigma: f64,
	#[builder(default = DEFAULT_ELITE_COUNT)]
	pub elite_count: usize,

	#[builder(default)]
	pub topology: Topology,
	#[builder(default)]
	pub strength: MuscleStrength,

	/// Skip an agent's tick on a bad sensor vector instead of failing the run.
	#[builder(default)]
	pub degraded_mode: bool,

	#[builder(default)]
	pub results: ResultsParams,
}

impl Default for Params {
	fn default() -> Self {
		Params::builder().build()
	}
}

impl Params {
	pub fn from_toml_str(s: &str) -> Result<Self> {
		Ok(toml::from_str(s)?)
	}

	pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
		let contents = fs::read_to_string(path)?;
		Self::from_toml_str(&contents)
	}

	pub fn to_toml_string(&self) -> Result<String> {
		toml::to_string(self).map_err(|e| Error::invalid(format!("cannot serialize params: {e}")))
	}

	/// Number of subgenerations (batches) that make up one generation.
	pub fn subgens_per_generation(&self) -> usize {
		self.population_size.div_ceil(self.batch_size.max(1))
	}

	pub fn validate(&self) -> Result<()> {
		if self.population_size == 0 {
			return Err(Error::invalid("population_size must be positive"));
		}
		if self.batch_size == 0 {
			return Err(Error::invalid("batch_size must be positive"));
		}
		if !(self.time_step > 0.0) {
			return Err(Error::invalid("time_step must be positive"));
		}
		if !(self.subgen_duration >= 0.0) || !(self.subgen_bonus >= 0.0) {
			return Err(Error::invalid("subgen durations must be non-negative"));
		}
		if !(0.0..=0.5).contains(&self.mutation_probability) {
			return Err(Error::invalid("mutation_probability must be in [0, 0.5]"));
		}
		if !(self.mutation_sigma >= 0.0) || !(self.init_sigma >= 0.0) {
			return Err(Error::invalid("standard deviations must be non-negative"));
		}
		if self.elite_count > self.population_size {
			return Err(Error::invalid(format!(
				"elite_count ({}) exceeds population_size ({})",
				self.elite_count, self.population_size
			)));
		}
		let Topology {
			input_nodes,
			hidden_nodes,
			output_nodes,
		} = self.topology;
		if input_nodes == 0 || hidden_nodes == 0 {
			return Err(Error::invalid("topology layers must be non-empty"));
		}
		if output_nodes != ACTION_OUTPUTS {
			return Err(Error::invalid(format!(
				"output_nodes must be {ACTION_OUTPUTS} to drive the actuators"
			)));
		}
		Ok(())
	}
}

/// Where and what to record during a run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ResultsParams {
	/// Base directory; each run gets its own numbered subdirectory.
	pub output_dir: String,
	/// Write the ranked population of every generation as `<generation>.json`.
	pub archive_generations: bool,
	pub datafile: Option<String>,
	pub resultsfile: Option<String>,
}

impl Default for ResultsParams {
	fn default() -> Self {
		Self {
			output_dir: default_output_dir(),
			archive_generations: true,
			datafile: Some(default_datafile()),
			resultsfile: Some(default_resultsfile()),
		}
	}
}
