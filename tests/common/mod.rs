#![allow(dead_code)]

use rand::RngCore;
use strider::{
	params::{Params, ResultsParams},
	physics::{Actuator, Body, Contact, SENSOR_LEN},
};

/// Walks at one metre per simulated second until `plateau` seconds, then stands still.
#[derive(Debug, Clone)]
pub struct Walker {
	pub time: f64,
	pub plateau: f64,
	pub sensors: usize,
}

impl Walker {
	pub fn new(plateau: f64) -> Self {
		Walker {
			time: 0.0,
			plateau,
			sensors: SENSOR_LEN,
		}
	}

	/// Reports a sensor vector of the wrong length.
	pub fn miswired(plateau: f64) -> Self {
		Walker {
			sensors: 3,
			..Walker::new(plateau)
		}
	}
}

impl Body for Walker {
	fn step(&mut self, dt: f64, _on_contact: &mut dyn FnMut(Contact)) {
		self.time += dt;
	}

	fn read_positions(&self) -> Vec<f64> {
		vec![self.reference_x(); self.sensors]
	}

	fn apply_actuator(&mut self, _actuator: Actuator, _target_angle: f64, _strength: f64) {}

	fn reference_x(&self) -> f64 {
		1000.0 * self.time.min(self.plateau)
	}

	fn position(&self) -> [f64; 2] {
		[self.reference_x(), 0.0]
	}
}

/// Replays a fixed cycle of uniform `[0, 1)` draws.
pub struct ScriptedRng {
	draws: Vec<f64>,
	next: usize,
}

impl ScriptedRng {
	pub fn new(draws: &[f64]) -> Self {
		ScriptedRng {
			draws: draws.to_vec(),
			next: 0,
		}
	}

	pub fn used(&self) -> usize {
		self.next
	}
}

impl RngCore for ScriptedRng {
	fn next_u32(&mut self) -> u32 {
		(self.next_u64() >> 32) as u32
	}

	// f64 sampling keeps the top 53 bits, so place the draw there
	fn next_u64(&mut self) -> u64 {
		let v = self.draws[self.next % self.draws.len()];
		self.next += 1;
		((v * (1u64 << 53) as f64) as u64) << 11
	}

	fn fill_bytes(&mut self, dst: &mut [u8]) {
		for chunk in dst.chunks_mut(8) {
			let bytes = self.next_u64().to_le_bytes();
			chunk.copy_from_slice(&bytes[..chunk.len()]);
		}
	}
}

/// Small, fast parameters with quarter-second ticks and nothing written to disk.
pub fn quick_params(population_size: usize, batch_size: usize) -> Params {
	Params::builder()
		.seed(7)
		.population_size(population_size)
		.batch_size(batch_size)
		.time_step(0.25)
		.subgen_duration(3.0)
		.subgen_bonus(3.0)
		.elite_count(1)
		.results(ResultsParams {
			archive_generations: false,
			datafile: None,
			resultsfile: None,
			..ResultsParams::default()
		})
		.build()
}
