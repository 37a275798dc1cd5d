//! Error taxonomy for the training loop.

use derive_more::{Display, Error, From};

/// Errors surfaced by the evolutionary loop and its collaborators.
#[derive(Debug, Display, Error, From)]
pub enum Error {
	/// Feedforward input had the wrong length. Local to a single agent's tick.
	#[display("feedforward expected {expected} inputs, got {actual}")]
	ShapeMismatch { expected: usize, actual: usize },

	/// Too few agents survived selection to pick two distinct parents.
	#[display("breeding pool of {pool} agents is too small (need at least 2)")]
	InsufficientPopulation { pool: usize },

	/// Two controllers (or a controller and its own layers) disagree on weight shapes.
	#[display("weight shape mismatch: {left:?} vs {right:?}")]
	DimensionMismatch {
		left: (usize, usize),
		right: (usize, usize),
	},

	/// Persisted population data could not be loaded.
	#[display("corrupt snapshot: {reason}")]
	CorruptSnapshot { reason: String },

	#[display("invalid parameters: {reason}")]
	InvalidParams { reason: String },

	#[display("io error: {_0}")]
	#[from]
	Io(std::io::Error),

	#[display("json error: {_0}")]
	#[from]
	Json(serde_json::Error),

	#[display("toml error: {_0}")]
	#[from]
	Toml(toml::de::Error),

	#[display("csv error: {_0}")]
	#[from]
	Csv(csv::Error),
}

impl Error {
	pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
		Error::CorruptSnapshot {
			reason: reason.into(),
		}
	}

	pub(crate) fn invalid(reason: impl Into<String>) -> Self {
		Error::InvalidParams {
			reason: reason.into(),
		}
	}

	/// Whether the run has to halt on this error. Only a bad feedforward shape is recoverable,
	/// and only when degraded mode is enabled.
	pub fn is_fatal(&self) -> bool {
		!matches!(self, Error::ShapeMismatch { .. })
	}
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
