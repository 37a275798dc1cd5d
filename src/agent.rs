//! Agents: a controller driving one simulated body

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
	error::{Error, Result},
	genetic::Genome,
	network::NetworkController,
	physics::{Actuator, Body, Contact},
};

/// Number of controller outputs read per tick: two antagonist pairs.
pub const ACTION_OUTPUTS: usize = 4;

/// An output at or above this value fires its action.
pub const ACTION_THRESHOLD: f64 = 0.5;

/// World units per metre of travelled distance.
pub const UNITS_PER_METRE: f64 = 1000.0;

/// Distance travelled for a reference x coordinate, rounded to whole world units.
pub fn distance(reference_x: f64) -> f64 {
	reference_x.round() / UNITS_PER_METRE
}

/// RGBA display tag.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(from = "[u8; 4]", into = "[u8; 4]")]
pub struct Color {
	pub r: u8,
	pub g: u8,
	pub b: u8,
	pub a: u8,
}

impl From<[u8; 4]> for Color {
	fn from([r, g, b, a]: [u8; 4]) -> Self {
		Color { r, g, b, a }
	}
}

impl From<Color> for [u8; 4] {
	fn from(c: Color) -> Self {
		[c.r, c.g, c.b, c.a]
	}
}

impl Color {
	/// Opaque color from hue in degrees, saturation and value in `[0, 1]`.
	pub fn from_hsv(hue: f64, saturation: f64, value: f64) -> Self {
		let h = hue.rem_euclid(360.0) / 60.0;
		let c = value * saturation;
		let x = c * (1.0 - (h % 2.0 - 1.0).abs());
		let (r, g, b) = match h as u32 {
			0 => (c, x, 0.0),
			1 => (x, c, 0.0),
			2 => (0.0, c, x),
			3 => (0.0, x, c),
			4 => (x, 0.0, c),
			_ => (c, 0.0, x),
		};
		let m = value - c;
		let to_u8 = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
		Color {
			r: to_u8(r),
			g: to_u8(g),
			b: to_u8(b),
			a: 255,
		}
	}

	/// Hue in degrees, saturation and value in `[0, 1]`.
	pub fn to_hsv(&self) -> (f64, f64, f64) {
		let r = self.r as f64 / 255.0;
		let g = self.g as f64 / 255.0;
		let b = self.b as f64 / 255.0;
		let max = r.max(g).max(b);
		let min = r.min(g).min(b);
		let delta = max - min;
		let hue = if delta == 0.0 {
			0.0
		} else if max == r {
			60.0 * ((g - b) / delta).rem_euclid(6.0)
		} else if max == g {
			60.0 * ((b - r) / delta + 2.0)
		} else {
			60.0 * ((r - g) / delta + 4.0)
		};
		let saturation = if max == 0.0 { 0.0 } else { delta / max };
		(hue, saturation, max)
	}

	/// Random hue at the starting saturation and brightness.
	pub fn random<R: Rng>(rng: &mut R) -> Self {
		Color::from_hsv(rng.random_range(0.0..360.0), 0.7, 0.9)
	}

	/// Child color: hue meets halfway along the shorter arc, saturation and value are averaged.
	pub fn blend(&self, other: &Color) -> Color {
		let (h1, s1, v1) = self.to_hsv();
		let (h2, s2, v2) = other.to_hsv();
		let mut diff = h2 - h1;
		if diff > 180.0 {
			diff -= 360.0;
		} else if diff < -180.0 {
			diff += 360.0;
		}
		Color::from_hsv(h1 + diff / 2.0, (s1 + s2) / 2.0, (v1 + v2) / 2.0)
	}
}

/// Muscle stiffness applied by the discrete actions.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct MuscleStrength {
	pub leg: f64,
	pub arm: f64,
}

impl Default for MuscleStrength {
	fn default() -> Self {
		Self {
			leg: crate::params::DEFAULT_LEG_STRENGTH,
			arm: crate::params::DEFAULT_ARM_STRENGTH,
		}
	}
}

/// Discrete muscle commands, one antagonist pair for the legs and one for the knees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
	LegsForward,
	LegsBackward,
	KneesBend,
	KneesStraighten,
}

impl Action {
	/// Pick at most one action per antagonist pair. When both outputs of a pair cross the
	/// threshold, the first output of the pair wins.
	pub fn decide(outputs: &[f64]) -> [Option<Action>; 2] {
		let fires = |i: usize| outputs.get(i).is_some_and(|&o| o >= ACTION_THRESHOLD);
		let legs = if fires(0) {
			Some(Action::LegsForward)
		} else if fires(1) {
			Some(Action::LegsBackward)
		} else {
			None
		};
		let knees = if fires(2) {
			Some(Action::KneesBend)
		} else if fires(3) {
			Some(Action::KneesStraighten)
		} else {
			None
		};
		[legs, knees]
	}

	/// Muscle commands as `(actuator, target angle in radians, strength)`.
	pub fn commands(self, strength: &MuscleStrength) -> Vec<(Actuator, f64, f64)> {
		let legs = 40f64.to_radians();
		let arms = 120f64.to_radians();
		let knees = 40f64.to_radians();
		use Actuator::*;
		match self {
			Action::LegsForward => vec![
				(LeftHip, -legs, strength.leg),
				(RightHip, legs, strength.leg),
				(RightShoulder, arms, strength.arm),
				(LeftShoulder, -arms, strength.arm),
			],
			Action::LegsBackward => vec![
				(LeftHip, legs, strength.leg),
				(RightHip, -legs, strength.leg),
				(RightShoulder, -arms, strength.arm),
				(LeftShoulder, arms, strength.arm),
			],
			Action::KneesBend => vec![
				(LeftKnee, knees, strength.leg),
				(RightKnee, -knees, strength.leg),
			],
			Action::KneesStraighten => vec![
				(LeftKnee, -knees, strength.leg),
				(RightKnee, knees, strength.leg),
			],
		}
	}
}

/// One candidate controller bound to one simulated body.
#[derive(Debug)]
pub struct Agent<B> {
	pub controller: NetworkController,
	pub color: Color,
	/// Distance travelled in metres. Negative when the body ends up behind the origin.
	pub fitness: f64,
	/// Set when the body reports a fall. Observational only; it does not end the episode or
	/// change fitness.
	pub collided: bool,
	body: B,
}

impl<B: Body> Agent<B> {
	pub fn new(controller: NetworkController, color: Color, body: B) -> Self {
		Agent {
			controller,
			color,
			fitness: 0.0,
			collided: false,
			body,
		}
	}

	/// Same controller, color and fitness on a fresh body.
	pub fn carry_over<C: Body>(&self, body: C) -> Agent<C> {
		Agent {
			controller: self.controller.clone(),
			color: self.color,
			fitness: self.fitness,
			collided: false,
			body,
		}
	}

	pub fn body(&self) -> &B {
		&self.body
	}

	/// Fails with [`Error::ShapeMismatch`] if the body's sensor vector does not fit the controller.
	pub fn check_sensors(&self) -> Result<()> {
		let expected = self.controller.topology().input_nodes;
		let actual = self.body.read_positions().len();
		if actual != expected {
			return Err(Error::ShapeMismatch { expected, actual });
		}
		Ok(())
	}

	/// Advance the body, sense, act, and refresh fitness.
	pub fn step(&mut self, dt: f64, strength: &MuscleStrength) -> Result<()> {
		let collided = &mut self.collided;
		self.body.step(dt, &mut |contact: Contact| {
			if contact.is_fall() {
				*collided = true;
			}
		});

		let sensors = self.body.read_positions();
		let outputs = self.controller.feedforward(&sensors)?;
		for action in Action::decide(&outputs).into_iter().flatten() {
			for (actuator, angle, stiffness) in action.commands(strength) {
				self.body.apply_actuator(actuator, angle, stiffness);
			}
		}

		self.update_fitness();
		Ok(())
	}

	/// Recompute fitness from where the reference body currently is.
	pub fn update_fitness(&mut self) {
		self.fitness = distance(self.body.reference_x());
	}

	pub fn view(&self) -> AgentView {
		AgentView {
			position: self.body.position(),
			color: self.color,
			collided: self.collided,
			fitness: self.fitness,
		}
	}
}

impl<B> Genome for Agent<B> {
	fn fitness(&self) -> f64 {
		self.fitness
	}
}

/// Read-only per-agent data for a renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentView {
	pub position: [f64; 2],
	pub color: Color,
	pub collided: bool,
	pub fitness: f64,
}
