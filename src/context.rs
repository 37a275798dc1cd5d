use std::{
	fs, io,
	path::{Path, PathBuf},
};

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

use crate::genetic::AsContext;

/// Run context: the single random stream and the output location of one training run.
#[derive(Debug)]
pub struct Context {
	pub generation: usize, // current generation (0-indexed)
	pub max_fitness: f64,  // top fitness of the last evaluated generation
	pub avg_fitness: f64,  // mean fitness of the last evaluated generation

	pub(crate) rng: Pcg64Mcg, // reproducible rng
	outdir: PathBuf,
}

impl Context {
	pub fn new(seed: u64, outdir: impl Into<PathBuf>) -> Self {
		Self {
			generation: 0,
			max_fitness: 0.0,
			avg_fitness: 0.0,
			rng: Pcg64Mcg::seed_from_u64(seed),
			outdir: outdir.into(),
		}
	}

	pub fn outdir(&self) -> &Path {
		&self.outdir
	}

	/// First numbered run directory under `base` that does not exist yet (`base/0`, `base/1`, ...).
	/// The directory is not created.
	pub fn allocate_run_dir(base: impl AsRef<Path>) -> PathBuf {
		let base = base.as_ref();
		(0..)
			.map(|n: usize| base.join(n.to_string()))
			.find(|p| !p.exists())
			.unwrap_or_else(|| base.join("overflow"))
	}

	pub fn create_outdir(&self) -> io::Result<()> {
		fs::create_dir_all(&self.outdir)
	}
}

impl AsContext for Context {
	#[inline]
	fn rng(&mut self) -> &mut impl Rng {
		&mut self.rng
	}

	#[inline]
	fn generation(&self) -> usize {
		self.generation
	}
}
