// Frame orchestration: owns the ECS world, turns rendered-frame time into
// fixed simulation ticks, and reports vessel poses back to the renderer.

use std::time::Duration;

use bevy_ecs::prelude::*;
use bevy_ecs::schedule::ExecutorKind;
use glam::Vec3;
use log::{info, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};

use super::components::*;
use super::config::SimConfig;
use super::helm::{ControlState, ManualHelm, ScriptedHelm};
use super::mesh::unit_cube;
use super::obstacle::{Obstacle, ObstacleRegistry};
use super::probe::BlockedMask;
use super::systems::{steer_vessels, TickSettings};

// ============================================================================
// FRAME CLOCK
// ============================================================================

/// Fixed-timestep accumulator.
///
/// Per-tick constants (easing fractions, the anisotropic move rule, the tick
/// counter) are defined for one tick at `tick_hz`. Rendering runs at whatever
/// rate the display gives, so frame time is banked here and released as
/// whole ticks.
#[derive(Debug, Clone)]
pub struct FrameClock {
    step: Duration,
    accumulated: Duration,
    max_ticks: u32,
}

impl FrameClock {
    pub fn new(step: Duration, max_ticks: u32) -> Self {
        Self {
            step: step.max(Duration::from_micros(1)),
            accumulated: Duration::ZERO,
            max_ticks: max_ticks.max(1),
        }
    }

    /// Bank `elapsed` and return how many ticks are due now.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        self.accumulated += elapsed;
        let mut ticks = 0;
        while self.accumulated >= self.step && ticks < self.max_ticks {
            self.accumulated -= self.step;
            ticks += 1;
        }
        if self.accumulated >= self.step {
            warn!(
                "simulation fell behind; dropping {:.1} ms of backlog",
                self.accumulated.as_secs_f64() * 1000.0
            );
            self.accumulated = Duration::ZERO;
        }
        ticks
    }
}

// ============================================================================
// ARENA
// ============================================================================

/// Four inward-facing walls enclosing a square of side `arena_size`, plus
/// seeded rock scenery.
pub fn build_arena(config: &SimConfig) -> ObstacleRegistry {
    let half = config.arena_size / 2.0;
    let half_height = config.wall_height / 2.0;

    let mut obstacles: Vec<Obstacle> = [
        (Vec3::new(half, 0.0, 0.0), Vec3::NEG_X),
        (Vec3::new(-half, 0.0, 0.0), Vec3::X),
        (Vec3::new(0.0, 0.0, half), Vec3::NEG_Z),
        (Vec3::new(0.0, 0.0, -half), Vec3::Z),
    ]
    .into_iter()
    .map(|(at, normal)| Obstacle::Wall {
        center: at + Vec3::Y * half_height,
        normal,
        half_width: half,
        half_height,
    })
    .collect();

    obstacles.extend(scatter_rocks(config));

    info!(
        "arena built: {} walls, {} rocks",
        4,
        obstacles.len() - 4
    );
    ObstacleRegistry::from_obstacles(obstacles)
}

/// Scenery at seeded random spots, kept clear of both spawn points. Every
/// third piece is a low axis-aligned reef, the rest are boulder hulls.
fn scatter_rocks(config: &SimConfig) -> Vec<Obstacle> {
    let mut rng = StdRng::seed_from_u64(config.rock_seed);
    let cube = unit_cube();
    let spawns = [Vec3::ZERO, Vec3::new(config.ai_start_x, 0.0, 0.0)];
    let reach = config.arena_size / 2.0 - config.rock_max_size;

    let mut rocks = Vec::with_capacity(config.rock_count);
    if reach <= 0.0 {
        return rocks;
    }

    let mut attempts = 0;
    while rocks.len() < config.rock_count && attempts < config.rock_count * 20 {
        attempts += 1;
        let at = Vec3::new(rng.gen_range(-reach..reach), 0.0, rng.gen_range(-reach..reach));
        let size = rng.gen_range(config.rock_min_size..=config.rock_max_size);
        let clear = spawns
            .iter()
            .all(|spawn| spawn.distance(at) > config.spawn_clearance + size);
        if !clear {
            continue;
        }
        // Probe rays run at y = 0; a quarter of each piece sits below it.
        if rocks.len() % 3 == 2 {
            let half = Vec3::new(size * 0.5, size * 0.15, size * 0.3);
            let center = at + Vec3::Y * half.y * 0.5;
            rocks.push(Obstacle::Block { min: center - half, max: center + half });
        } else {
            let scale = Vec3::new(size, size * 0.6, size);
            rocks.push(Obstacle::hull_from_mesh(&cube, at + Vec3::Y * scale.y * 0.25, scale));
        }
    }
    rocks
}

// ============================================================================
// SCENE
// ============================================================================

/// What the renderer needs to know about one vessel after a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VesselPose {
    pub role: VesselRole,
    pub position: Vec3,
    pub facing: f32,
    pub speed: f32,
    pub moved: bool,
    pub blocked: BlockedMask,
    /// Rudder angle, for manually steered vessels.
    pub rudder: Option<f32>,
    /// Throttle setting in [0, 1], for manually steered vessels.
    pub throttle: Option<f32>,
}

#[derive(Debug, Clone, Default)]
pub struct FrameReport {
    /// Simulation ticks run during this frame.
    pub ticks: u32,
    /// One pose per vessel, user first.
    pub vessels: Vec<VesselPose>,
}

impl FrameReport {
    pub fn pose(&self, role: VesselRole) -> Option<&VesselPose> {
        self.vessels.iter().find(|pose| pose.role == role)
    }
}

pub struct Scene {
    world: World,
    schedule: Schedule,
    clock: FrameClock,
    user: Entity,
}

impl Scene {
    pub fn new(config: &SimConfig) -> Self {
        Self::with_parts(config, build_arena(config), ScriptedHelm::from_config(config))
    }

    /// Scene with an explicit obstacle registry and AI helm.
    pub fn with_parts(config: &SimConfig, registry: ObstacleRegistry, ai_helm: ScriptedHelm) -> Self {
        let mut world = World::new();
        // Geometry is installed last; until then the world reads as loading.
        world.insert_resource(ObstacleRegistry::loading());
        world.insert_resource(TickSettings {
            dt: config.tick_duration(),
            probe_distance: config.probe_distance,
            tick_step: config.tick_step,
        });

        let user = world
            .spawn((
                VesselRole::User,
                Transform::default(),
                Vessel::default(),
                ManualHelm::new(config),
            ))
            .id();
        world.spawn((
            VesselRole::Ai,
            Transform::from_position(Vec3::new(config.ai_start_x, 0.0, 0.0)),
            Vessel::default(),
            ai_helm,
        ));

        if registry.is_empty() {
            warn!("scene has no obstacles; every probe will report clear");
        }
        world.insert_resource(registry);

        let mut schedule = Schedule::default();
        schedule.set_executor_kind(ExecutorKind::SingleThreaded);
        schedule.add_systems((steer_vessels::<ManualHelm>, steer_vessels::<ScriptedHelm>).chain());

        info!(
            "scene ready: {} obstacles, {} Hz ticks",
            world.resource::<ObstacleRegistry>().len(),
            config.tick_hz
        );

        Self {
            world,
            schedule,
            clock: FrameClock::new(config.tick_duration(), config.max_ticks_per_frame),
            user,
        }
    }

    /// Forward one input event's control state to the user vessel's helm.
    pub fn set_controls(&mut self, controls: ControlState) {
        if let Some(mut helm) = self.world.get_mut::<ManualHelm>(self.user) {
            helm.set_controls(controls);
        }
    }

    /// Run the ticks due for a rendered frame that took `elapsed`.
    pub fn frame(&mut self, elapsed: Duration) -> FrameReport {
        let ticks = self.clock.advance(elapsed);
        for _ in 0..ticks {
            self.tick();
        }
        self.report(ticks)
    }

    /// Run exactly one simulation tick.
    pub fn tick(&mut self) {
        self.schedule.run(&mut self.world);
    }

    pub fn report(&mut self, ticks: u32) -> FrameReport {
        let user = self.user;
        let helm = self
            .world
            .get::<ManualHelm>(user)
            .map(|helm| (helm.rudder_angle(), helm.speed()));

        let mut query = self.world.query::<(Entity, &VesselRole, &Transform, &Vessel)>();
        let mut vessels: Vec<VesselPose> = query
            .iter(&self.world)
            .map(|(entity, role, transform, vessel)| VesselPose {
                role: *role,
                position: transform.position,
                facing: transform.facing,
                speed: vessel.speed,
                moved: vessel.moved,
                blocked: vessel.blocked,
                rudder: helm.filter(|_| entity == user).map(|(rudder, _)| rudder),
                throttle: helm.filter(|_| entity == user).map(|(_, throttle)| throttle),
            })
            .collect();
        vessels.sort_by_key(|pose| pose.role);

        FrameReport { ticks, vessels }
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        self.world.resource::<ObstacleRegistry>().obstacles()
    }
}
