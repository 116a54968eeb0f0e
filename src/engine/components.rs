// Core ECS components for the sailing simulation.
// A vessel is an entity with a Transform, a Vessel, a VesselRole and one helm
// component (ManualHelm or ScriptedHelm, see helm.rs).

use bevy_ecs::prelude::*;
use glam::Vec3;

use super::probe::BlockedMask;

/// Position and heading of an entity in world space.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    /// Heading in radians around +Y. 0 faces +Z; `atan2(x, z)` of a travel
    /// direction gives the matching heading.
    pub facing: f32,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            facing: 0.0,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self { position, ..Self::default() }
    }
}

/// Per-tick motion state of a vessel.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct Vessel {
    /// Travel direction for the current tick, after the collision veto.
    /// Only X and Z are meaningful; both zero means the vessel holds still.
    pub direction: Vec3,
    /// Speed used for the current tick.
    pub speed: f32,
    /// Grows by `tick_step` every tick, moving or not. Kept in f64 so a
    /// quarter-step still registers after days of play.
    pub tick_count: f64,
    /// Whether the last tick translated the vessel.
    pub moved: bool,
    /// Ray-fan result of the last tick.
    pub blocked: BlockedMask,
}

impl Vessel {
    pub fn is_moving(&self) -> bool {
        self.direction.x != 0.0 || self.direction.z != 0.0
    }
}

/// Which vessel this is. Reports list the user vessel first.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VesselRole {
    User,
    Ai,
}
