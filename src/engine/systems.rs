// ECS systems for the per-tick vessel simulation.
// One generic system per helm type; the scene chains them so the user vessel
// always moves before the AI vessel.

use std::time::Duration;

use bevy_ecs::prelude::*;
use log::debug;

use super::components::*;
use super::helm::IntentResolver;
use super::obstacle::ObstacleRegistry;
use super::probe::{probe, RAY_FAN};
use super::steering::steer;

/// Fixed per-tick parameters shared by all steering systems.
#[derive(Resource, Debug, Clone, Copy)]
pub struct TickSettings {
    /// Simulated time covered by one tick.
    pub dt: Duration,
    pub probe_distance: f32,
    pub tick_step: f32,
}

/// Probe, gate and move every vessel steered by helm type `H`.
pub fn steer_vessels<H: IntentResolver>(
    mut query: Query<(&VesselRole, &mut Transform, &mut Vessel, &mut H)>,
    registry: Res<ObstacleRegistry>,
    settings: Res<TickSettings>,
) {
    for (role, mut transform, mut vessel, mut helm) in query.iter_mut() {
        let intent = helm.resolve(vessel.tick_count, settings.dt);
        let mask = probe(
            transform.position,
            &RAY_FAN,
            registry.obstacles(),
            settings.probe_distance,
        );

        if mask != vessel.blocked && !mask.is_clear() {
            debug!(
                "{:?} vessel at ({:.1}, {:.1}) blocked in {} octant(s): {}",
                role,
                transform.position.x,
                transform.position.z,
                mask.blocked_count(),
                mask.describe()
            );
        }

        let policy = helm.heading_policy();
        steer(&mut transform, &mut vessel, intent, mask, policy, settings.tick_step);
    }
}
