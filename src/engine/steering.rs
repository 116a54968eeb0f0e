// Steering integrator shared by every vessel.
//
// Each tick: veto the desired direction with the probe mask, ease the heading
// toward the direction of travel, advance the position, bump the tick
// counter. Vessels differ only in where their intent comes from (helm.rs)
// and in their HeadingPolicy.

use std::f32::consts::{PI, TAU};

use glam::Vec3;

use super::components::{Transform, Vessel};
use super::helm::Intent;
use super::probe::BlockedMask;

/// How a vessel turns toward its direction of travel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingPolicy {
    /// Fraction of the remaining heading error closed per tick.
    pub easing: f32,
    /// Unwrap the heading by ±2π first so the turn takes the short way round.
    pub wraparound: bool,
}

impl HeadingPolicy {
    pub const MANUAL: Self = Self { easing: 1.5 / 128.0, wraparound: false };
    pub const SCRIPTED: Self = Self { easing: 1.0 / 128.0, wraparound: true };
}

/// Move `facing` a step toward `atan2(direction.x, direction.z)`.
///
/// Without wraparound a turn from just below +π to just above -π goes the
/// long way through 0.
pub fn ease_heading(facing: &mut f32, direction: Vec3, policy: HeadingPolicy) {
    let target = direction.x.atan2(direction.z);
    if policy.wraparound && (target - *facing).abs() > PI {
        // Re-express facing within half a turn of the target, same bearing.
        let error = (target - *facing + PI).rem_euclid(TAU) - PI;
        *facing = target - error;
    }
    let difference = target - *facing;
    if difference != 0.0 {
        *facing += difference * policy.easing;
    }
}

/// Advance `position` along `direction`.
///
/// Axis-aligned travel covers `sqrt(speed)` per tick, diagonal travel covers
/// `speed / 1.5` on each axis. Below speed 1 the square root makes straight
/// runs noticeably faster than diagonals.
pub fn advance_position(position: &mut Vec3, direction: Vec3, speed: f32) {
    let straight = speed.max(0.0).sqrt();
    let diagonal = speed / 1.5;
    position.x += direction.x * if direction.z == 0.0 { straight } else { diagonal };
    position.z += direction.z * if direction.x == 0.0 { straight } else { diagonal };
}

/// Run one tick for one vessel. Returns the "did move" signal.
pub fn steer(
    transform: &mut Transform,
    vessel: &mut Vessel,
    intent: Intent,
    mask: BlockedMask,
    policy: HeadingPolicy,
    tick_step: f32,
) -> bool {
    vessel.direction = mask.gate(intent.direction);
    vessel.speed = intent.speed;
    vessel.blocked = mask;

    let moving = vessel.is_moving();
    if moving {
        ease_heading(&mut transform.facing, vessel.direction, policy);
        advance_position(&mut transform.position, vessel.direction, vessel.speed);
    }

    vessel.tick_count += f64::from(tick_step);
    vessel.moved = moving;
    moving
}
