//! Physics collaborator interface
//!
//! The rigid-body engine lives outside this crate. The training loop only steps one body per agent,
//! reads its tracked part positions, drives its muscles, and listens for contacts.

use serde::{Deserialize, Serialize};

/// Number of body parts whose positions feed the controller.
pub const TRACKED_PARTS: usize = 12;

/// Length of the sensor vector: x of every tracked part, then y of every tracked part.
pub const SENSOR_LEN: usize = 2 * TRACKED_PARTS;

/// Muscle-driven joints of the walker.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Actuator {
	LeftHip,
	RightHip,
	LeftShoulder,
	RightShoulder,
	LeftKnee,
	RightKnee,
}

/// Coarse body part classes, enough to tell a fall from a footstep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Limb {
	Head,
	Neck,
	Torso,
	UpperArm,
	Forearm,
	Thigh,
	Calf,
	Foot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
	Ground,
	Other,
}

/// A contact reported by the engine while stepping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
	pub limb: Limb,
	pub surface: Surface,
}

impl Contact {
	/// Head, torso or arms on the ground.
	pub fn is_fall(&self) -> bool {
		self.surface == Surface::Ground
			&& matches!(
				self.limb,
				Limb::Head | Limb::Torso | Limb::UpperArm | Limb::Forearm
			)
	}
}

/// One simulated body, owned by exactly one agent.
pub trait Body {
	/// Advance the simulation by `dt` seconds. Contacts are delivered synchronously, during the step.
	fn step(&mut self, dt: f64, on_contact: &mut dyn FnMut(Contact));

	/// Positions of the tracked parts: all x coordinates, then all y coordinates.
	fn read_positions(&self) -> Vec<f64>;

	/// Set a muscle's target angle (radians, relative to its limb) and stiffness.
	fn apply_actuator(&mut self, actuator: Actuator, target_angle: f64, strength: f64);

	/// Horizontal coordinate of the reference body. Larger is further travelled.
	fn reference_x(&self) -> f64;

	/// Display position of the body, for rendering.
	fn position(&self) -> [f64; 2];
}

/// Spawns fresh bodies. Agents never reuse a body across generations.
pub trait World {
	type Body: Body;

	fn spawn(&mut self) -> Self::Body;
}

impl<B, F> World for F
where
	B: Body,
	F: FnMut() -> B,
{
	type Body = B;

	fn spawn(&mut self) -> B {
		(self)()
	}
}

/// A body that never moves. Lets populations be bred and inspected without a physics engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct Inert;

impl Body for Inert {
	fn step(&mut self, _dt: f64, _on_contact: &mut dyn FnMut(Contact)) {}

	fn read_positions(&self) -> Vec<f64> {
		vec![0.0; SENSOR_LEN]
	}

	fn apply_actuator(&mut self, _actuator: Actuator, _target_angle: f64, _strength: f64) {}

	fn reference_x(&self) -> f64 {
		0.0
	}

	fn position(&self) -> [f64; 2] {
		[0.0, 0.0]
	}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct InertWorld;

impl World for InertWorld {
	type Body = Inert;

	fn spawn(&mut self) -> Inert {
		Inert
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn falls_are_upper_body_on_ground() {
		let fall = |limb, surface| Contact { limb, surface }.is_fall();
		assert!(fall(Limb::Head, Surface::Ground));
		assert!(fall(Limb::Torso, Surface::Ground));
		assert!(fall(Limb::Forearm, Surface::Ground));
		assert!(!fall(Limb::Foot, Surface::Ground));
		assert!(!fall(Limb::Calf, Surface::Ground));
		assert!(!fall(Limb::Head, Surface::Other));
	}

	#[test]
	fn closures_spawn_bodies() {
		let mut count = 0;
		let mut world = || {
			count += 1;
			Inert
		};
		let _ = world.spawn();
		let _ = world.spawn();
		assert_eq!(count, 2);
	}
}
