//! Population snapshots
//!
//! A snapshot is a JSON array with one record per agent, in population order:
//!
//! ```json
//! [ { "color": [r, g, b, a],
//!     "network": { "weights_ih": [[...], ...], "weights_ho": [[...], ...],
//!                  "bias_ih": 0.1, "bias_ho": -0.3 },
//!     "fitness": 1.25 } ]
//! ```
//!
//! Reading also accepts the versioned form `{ "version": 1, "agents": [...] }`.

use std::{
	fs::{self, File},
	io::{BufWriter, Write},
	path::Path,
};

use serde::{Deserialize, Serialize};

use crate::{
	agent::{Agent, Color},
	error::{Error, Result},
	network::{Matrix, NetworkController, Topology},
	params::Params,
	physics::World,
	population::Population,
};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct NetworkRecord {
	pub weights_ih: Vec<Vec<f64>>,
	pub weights_ho: Vec<Vec<f64>>,
	pub bias_ih: f64,
	pub bias_ho: f64,
}

impl From<&NetworkController> for NetworkRecord {
	fn from(net: &NetworkController) -> Self {
		NetworkRecord {
			weights_ih: net.weights_ih().to_rows(),
			weights_ho: net.weights_ho().to_rows(),
			bias_ih: net.bias_ih(),
			bias_ho: net.bias_ho(),
		}
	}
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AgentRecord {
	pub color: Color,
	pub network: NetworkRecord,
	pub fitness: f64,
}

impl<B> From<&Agent<B>> for AgentRecord {
	fn from(agent: &Agent<B>) -> Self {
		AgentRecord {
			color: agent.color,
			network: (&agent.controller).into(),
			fitness: agent.fitness,
		}
	}
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotFile {
	Versioned { version: u32, agents: Vec<AgentRecord> },
	Bare(Vec<AgentRecord>),
}

/// Encodes populations to records and back, checking records against the configured topology.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotCodec {
	topology: Topology,
	population_size: usize,
}

impl SnapshotCodec {
	pub fn new(topology: Topology, population_size: usize) -> Self {
		SnapshotCodec {
			topology,
			population_size,
		}
	}

	pub fn from_params(params: &Params) -> Self {
		Self::new(params.topology, params.population_size)
	}

	pub fn encode<'a, B: 'a>(&self, agents: impl IntoIterator<Item = &'a Agent<B>>) -> Vec<AgentRecord> {
		agents.into_iter().map(AgentRecord::from).collect()
	}

	/// Rebuild a population on fresh bodies, preserving order, colors and fitness. Every record is
	/// validated before any body is spawned.
	pub fn decode<W: World>(&self, records: &[AgentRecord], world: &mut W) -> Result<Population<W::Body>> {
		if records.is_empty() {
			return Err(Error::corrupt("snapshot has no agents"));
		}
		if records.len() != self.population_size {
			return Err(Error::corrupt(format!(
				"snapshot has {} agents, expected {}",
				records.len(),
				self.population_size
			)));
		}
		let controllers = records
			.iter()
			.enumerate()
			.map(|(i, rec)| {
				self.controller(&rec.network)
					.map_err(|e| Error::corrupt(format!("agent {i}: {e}")))
			})
			.collect::<Result<Vec<_>>>()?;
		if let Some(i) = records.iter().position(|r| !r.fitness.is_finite()) {
			return Err(Error::corrupt(format!("agent {i}: fitness is not finite")));
		}

		let agents = records
			.iter()
			.zip(controllers)
			.map(|(rec, controller)| {
				let mut agent = Agent::new(controller, rec.color, world.spawn());
				agent.fitness = rec.fitness;
				agent
			})
			.collect();
		Population::new(agents)
	}

	fn controller(&self, rec: &NetworkRecord) -> Result<NetworkController> {
		let weights_ih = Matrix::from_rows(&rec.weights_ih)?;
		let weights_ho = Matrix::from_rows(&rec.weights_ho)?;
		for (name, m, expected) in [
			("weights_ih", &weights_ih, self.topology.ih_shape()),
			("weights_ho", &weights_ho, self.topology.ho_shape()),
		] {
			if m.shape() != expected {
				return Err(Error::corrupt(format!(
					"{name} is {:?}, expected {:?}",
					m.shape(),
					expected
				)));
			}
			if m.values().iter().any(|w| !w.is_finite()) {
				return Err(Error::corrupt(format!("{name} has a non-finite weight")));
			}
		}
		if !rec.bias_ih.is_finite() || !rec.bias_ho.is_finite() {
			return Err(Error::corrupt("bias is not finite"));
		}
		NetworkController::from_parts(weights_ih, weights_ho, rec.bias_ih, rec.bias_ho)
	}

	/// Parse records from JSON. Malformed input is a [`Error::CorruptSnapshot`].
	pub fn parse_records(json: &str) -> Result<Vec<AgentRecord>> {
		let file: SnapshotFile =
			serde_json::from_str(json).map_err(|e| Error::corrupt(format!("malformed json: {e}")))?;
		match file {
			SnapshotFile::Bare(agents) => Ok(agents),
			SnapshotFile::Versioned {
				version: SNAPSHOT_VERSION,
				agents,
			} => Ok(agents),
			SnapshotFile::Versioned { version, .. } => Err(Error::corrupt(format!(
				"unsupported snapshot version {version}"
			))),
		}
	}

	pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<AgentRecord>> {
		let contents = fs::read_to_string(path)?;
		Self::parse_records(&contents)
	}

	pub fn read_file<W: World>(&self, path: impl AsRef<Path>, world: &mut W) -> Result<Population<W::Body>> {
		self.decode(&Self::read_records(path)?, world)
	}

	pub fn write_records(path: impl AsRef<Path>, records: &[AgentRecord]) -> Result<()> {
		let mut out = BufWriter::new(File::create(path)?);
		serde_json::to_writer(&mut out, records)?;
		out.flush()?;
		Ok(())
	}

	pub fn write_file<'a, B: 'a>(
		&self,
		path: impl AsRef<Path>,
		agents: impl IntoIterator<Item = &'a Agent<B>>,
	) -> Result<()> {
		Self::write_records(path, &self.encode(agents))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::physics::InertWorld;

	fn record(rows_ih: usize, cols_ih: usize) -> AgentRecord {
		AgentRecord {
			color: Color::from([10, 20, 30, 255]),
			network: NetworkRecord {
				weights_ih: vec![vec![0.25; cols_ih]; rows_ih],
				weights_ho: vec![vec![-0.5; 3]; 4],
				bias_ih: 0.1,
				bias_ho: 0.2,
			},
			fitness: 1.5,
		}
	}

	#[test]
	fn accepts_bare_and_versioned() {
		let bare = serde_json::to_string(&vec![record(2, 4)]).unwrap();
		assert_eq!(SnapshotCodec::parse_records(&bare).unwrap().len(), 1);

		let versioned = format!(r#"{{ "version": 1, "agents": {bare} }}"#);
		assert_eq!(SnapshotCodec::parse_records(&versioned).unwrap().len(), 1);

		let future = format!(r#"{{ "version": 2, "agents": {bare} }}"#);
		assert!(matches!(
			SnapshotCodec::parse_records(&future),
			Err(Error::CorruptSnapshot { .. })
		));
	}

	#[test]
	fn malformed_json_is_corrupt() {
		for bad in ["", "{", r#"[{"color": [1,2,3]}]"#, r#"[{"color": [1,2,3,4]}]"#] {
			assert!(
				matches!(SnapshotCodec::parse_records(bad), Err(Error::CorruptSnapshot { .. })),
				"{bad:?} should be corrupt"
			);
		}
	}

	#[test]
	fn wire_shape_matches_format() {
		let json = serde_json::to_value(record(2, 4)).unwrap();
		assert_eq!(json["color"], serde_json::json!([10, 20, 30, 255]));
		assert_eq!(json["network"]["weights_ih"][1][3], 0.25);
		assert_eq!(json["network"]["bias_ho"], 0.2);
		assert_eq!(json["fitness"], 1.5);
	}

	#[test]
	fn decode_checks_topology() {
		let codec = SnapshotCodec::new(Topology::new(3, 2, 4), 2);
		let good = vec![record(2, 4), record(2, 4)];
		let pop = codec.decode(&good, &mut InertWorld).unwrap();
		assert_eq!(pop.len(), 2);
		assert_eq!(pop.get(1).unwrap().fitness, 1.5);

		let wrong_shape = vec![record(2, 4), record(3, 4)];
		assert!(matches!(
			codec.decode(&wrong_shape, &mut InertWorld),
			Err(Error::CorruptSnapshot { .. })
		));

		let mut ragged = vec![record(2, 4), record(2, 4)];
		ragged[0].network.weights_ih[1].pop();
		assert!(matches!(
			codec.decode(&ragged, &mut InertWorld),
			Err(Error::CorruptSnapshot { .. })
		));

		assert!(matches!(
			codec.decode(&good[..1], &mut InertWorld),
			Err(Error::CorruptSnapshot { .. })
		));
		assert!(matches!(
			codec.decode(&[], &mut InertWorld),
			Err(Error::CorruptSnapshot { .. })
		));
	}

	#[test]
	fn nothing_is_spawned_for_a_bad_snapshot() {
		let codec = SnapshotCodec::new(Topology::new(3, 2, 4), 2);
		let mut spawned = 0;
		let mut world = || {
			spawned += 1;
			crate::physics::Inert
		};
		let bad = vec![record(2, 4), record(2, 5)];
		assert!(codec.decode(&bad, &mut world).is_err());
		assert_eq!(spawned, 0);
	}
}
