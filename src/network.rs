//! Fixed-topology feedforward controller
//!
//! One hidden layer, sigmoid activations, and a scalar bias appended to each layer's input. The
//! weights are the genome that the genetic operator recombines.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Inputs to the sigmoid are clamped to this magnitude before exponentiation.
pub const SIGMOID_CLAMP: f64 = 500.0;

#[inline]
pub fn sigmoid(x: f64) -> f64 {
	let x = x.clamp(-SIGMOID_CLAMP, SIGMOID_CLAMP);
	1.0 / (1.0 + (-x).exp())
}

/// Sample from a normal distribution (Box-Muller).
pub fn gaussian<R: Rng>(rng: &mut R, mean: f64, sigma: f64) -> f64 {
	let u1 = rng.random::<f64>().clamp(f64::MIN_POSITIVE, 1.0);
	let u2 = rng.random::<f64>();
	mean + sigma * (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// Layer sizes of a controller.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct Topology {
	pub input_nodes: usize,
	pub hidden_nodes: usize,
	pub output_nodes: usize,
}

impl Topology {
	pub const fn new(input_nodes: usize, hidden_nodes: usize, output_nodes: usize) -> Self {
		Self {
			input_nodes,
			hidden_nodes,
			output_nodes,
		}
	}

	/// Shape of the input-to-hidden matrix; the extra column weights the bias.
	pub const fn ih_shape(&self) -> (usize, usize) {
		(self.hidden_nodes, self.input_nodes + 1)
	}

	/// Shape of the hidden-to-output matrix; the extra column weights the bias.
	pub const fn ho_shape(&self) -> (usize, usize) {
		(self.output_nodes, self.hidden_nodes + 1)
	}
}

impl Default for Topology {
	fn default() -> Self {
		// 12 tracked body parts, x and y each
		Topology::new(24, 12, 4)
	}
}

/// Dense row-major matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
	rows: usize,
	cols: usize,
	data: Vec<f64>,
}

impl Matrix {
	pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> f64) -> Self {
		let mut data = Vec::with_capacity(rows * cols);
		for i in 0..rows {
			for j in 0..cols {
				data.push(f(i, j));
			}
		}
		Matrix { rows, cols, data }
	}

	pub fn zeros(rows: usize, cols: usize) -> Self {
		Matrix {
			rows,
			cols,
			data: vec![0.0; rows * cols],
		}
	}

	/// Build from nested rows. Every row must have the same length.
	pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
		let cols = rows.first().map_or(0, Vec::len);
		let mut data = Vec::with_capacity(rows.len() * cols);
		for row in rows {
			if row.len() != cols {
				return Err(Error::DimensionMismatch {
					left: (rows.len(), cols),
					right: (rows.len(), row.len()),
				});
			}
			data.extend_from_slice(row);
		}
		Ok(Matrix {
			rows: rows.len(),
			cols,
			data,
		})
	}

	pub fn to_rows(&self) -> Vec<Vec<f64>> {
		self.iter_rows().map(<[f64]>::to_vec).collect()
	}

	pub fn shape(&self) -> (usize, usize) {
		(self.rows, self.cols)
	}

	pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
		// chunks_exact panics on 0
		self.data.chunks_exact(self.cols.max(1)).take(self.rows)
	}

	/// Entries in row-major order.
	pub fn values(&self) -> &[f64] {
		&self.data
	}

	/// Combine two equally-shaped matrices entry by entry, in row-major order.
	pub fn zip_with(
		&self,
		other: &Matrix,
		mut f: impl FnMut(f64, f64) -> f64,
	) -> Result<Matrix> {
		if self.shape() != other.shape() {
			return Err(Error::DimensionMismatch {
				left: self.shape(),
				right: other.shape(),
			});
		}
		let data = self
			.data
			.iter()
			.zip(&other.data)
			.map(|(&a, &b)| f(a, b))
			.collect();
		Ok(Matrix {
			rows: self.rows,
			cols: self.cols,
			data,
		})
	}
}

fn dot(weights: &[f64], values: &[f64]) -> f64 {
	weights.iter().zip(values).map(|(w, v)| w * v).sum()
}

/// Feedforward network with a single hidden layer. Stateless between calls.
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkController {
	weights_ih: Matrix,
	weights_ho: Matrix,
	bias_ih: f64,
	bias_ho: f64,
}

impl NetworkController {
	/// Fresh controller with all weights and biases drawn from N(0, sigma).
	pub fn random<R: Rng>(topology: Topology, sigma: f64, rng: &mut R) -> Self {
		let (r, c) = topology.ih_shape();
		let weights_ih = Matrix::from_fn(r, c, |_, _| gaussian(rng, 0.0, sigma));
		let (r, c) = topology.ho_shape();
		let weights_ho = Matrix::from_fn(r, c, |_, _| gaussian(rng, 0.0, sigma));
		NetworkController {
			weights_ih,
			weights_ho,
			bias_ih: gaussian(rng, 0.0, sigma),
			bias_ho: gaussian(rng, 0.0, sigma),
		}
	}

	/// Assemble a controller from its parts. The hidden-to-output matrix must take one column per
	/// hidden node plus the bias column.
	pub fn from_parts(weights_ih: Matrix, weights_ho: Matrix, bias_ih: f64, bias_ho: f64) -> Result<Self> {
		let (hidden, ih_cols) = weights_ih.shape();
		let (_, ho_cols) = weights_ho.shape();
		if ih_cols == 0 || ho_cols != hidden + 1 {
			return Err(Error::DimensionMismatch {
				left: weights_ih.shape(),
				right: weights_ho.shape(),
			});
		}
		Ok(NetworkController {
			weights_ih,
			weights_ho,
			bias_ih,
			bias_ho,
		})
	}

	pub fn topology(&self) -> Topology {
		let (hidden, ih_cols) = self.weights_ih.shape();
		let (output, _) = self.weights_ho.shape();
		Topology::new(ih_cols - 1, hidden, output)
	}

	pub fn weights_ih(&self) -> &Matrix {
		&self.weights_ih
	}

	pub fn weights_ho(&self) -> &Matrix {
		&self.weights_ho
	}

	pub fn bias_ih(&self) -> f64 {
		self.bias_ih
	}

	pub fn bias_ho(&self) -> f64 {
		self.bias_ho
	}

	/// Run the network on one sensor vector.
	pub fn feedforward(&self, inputs: &[f64]) -> Result<Vec<f64>> {
		let expected = self.weights_ih.shape().1 - 1;
		if inputs.len() != expected {
			return Err(Error::ShapeMismatch {
				expected,
				actual: inputs.len(),
			});
		}

		let mut with_bias = Vec::with_capacity(inputs.len() + 1);
		with_bias.extend_from_slice(inputs);
		with_bias.push(self.bias_ih);
		let mut hidden: Vec<f64> = self
			.weights_ih
			.iter_rows()
			.map(|w| sigmoid(dot(w, &with_bias)))
			.collect();

		hidden.push(self.bias_ho);
		Ok(self
			.weights_ho
			.iter_rows()
			.map(|w| sigmoid(dot(w, &hidden)))
			.collect())
	}
}
