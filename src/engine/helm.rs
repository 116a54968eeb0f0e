// Intent resolution: where a vessel wants to go this tick.
//
// ManualHelm turns keyboard state into throttle and rudder; ScriptedHelm asks
// a Script for a ControlState keyed on the vessel's tick counter. Both feed
// the same steering integrator (steering.rs).

use std::time::Duration;

use bevy_ecs::prelude::*;
use glam::Vec3;

use super::config::{AiScript, SimConfig};
use super::steering::HeadingPolicy;

/// Four independent direction keys. Last write wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlState {
    pub left: bool,
    pub up: bool,
    pub right: bool,
    pub down: bool,
}

impl ControlState {
    pub const NONE: Self = Self { left: false, up: false, right: false, down: false };
    pub const AHEAD: Self = Self { up: true, ..Self::NONE };
    pub const ASTERN: Self = Self { down: true, ..Self::NONE };
}

/// Desired direction and speed for one tick, before the collision veto.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intent {
    pub direction: Vec3,
    pub speed: f32,
}

/// A helm component the steering system can drive.
pub trait IntentResolver: Component {
    /// Produce this tick's intent. `dt` is the simulated time the tick covers.
    fn resolve(&mut self, tick_count: f64, dt: Duration) -> Intent;

    fn heading_policy(&self) -> HeadingPolicy;
}

// ============================================================================
// RUDDER SERVO
// ============================================================================

/// Which way a turn key pushes the rudder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    /// Left key: rudder angle decreases toward -1.
    Port,
    /// Right key: rudder angle increases toward +1.
    Starboard,
}

impl Turn {
    fn sign(self) -> f32 {
        match self {
            Turn::Port => -1.0,
            Turn::Starboard => 1.0,
        }
    }
}

/// Fixed-rate rudder actuator with one cancellable task per side.
///
/// A task starts on `engage`, stops on `release` or once the rudder reaches
/// the bound on its side. While running it moves the rudder by `step` for
/// every whole `period` of simulated time; leftover time carries over to the
/// next `advance`.
#[derive(Debug, Clone)]
pub struct RudderServo {
    angle: f32,
    step: f32,
    period: Duration,
    /// Carried time for each running task; `None` when idle.
    port: Option<Duration>,
    starboard: Option<Duration>,
}

impl RudderServo {
    pub fn new(step: f32, period: Duration) -> Self {
        Self {
            angle: 0.0,
            step,
            period: period.max(Duration::from_millis(1)),
            port: None,
            starboard: None,
        }
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    pub fn is_running(&self, turn: Turn) -> bool {
        self.task(turn).is_some()
    }

    /// Start the task for `turn` unless it already runs or the rudder sits at
    /// that side's bound.
    pub fn engage(&mut self, turn: Turn) {
        if !self.is_running(turn) && !self.at_bound(turn) {
            *self.task_mut(turn) = Some(Duration::ZERO);
        }
    }

    pub fn release(&mut self, turn: Turn) {
        *self.task_mut(turn) = None;
    }

    pub fn advance(&mut self, elapsed: Duration) {
        self.advance_task(Turn::Starboard, elapsed);
        self.advance_task(Turn::Port, elapsed);
    }

    fn advance_task(&mut self, turn: Turn, elapsed: Duration) {
        let Some(mut carry) = self.task(turn) else {
            return;
        };
        carry += elapsed;
        while carry >= self.period {
            carry -= self.period;
            self.angle = (self.angle + turn.sign() * self.step).clamp(-1.0, 1.0);
            if self.at_bound(turn) {
                *self.task_mut(turn) = None;
                return;
            }
        }
        *self.task_mut(turn) = Some(carry);
    }

    fn at_bound(&self, turn: Turn) -> bool {
        match turn {
            Turn::Port => self.angle <= -1.0,
            Turn::Starboard => self.angle >= 1.0,
        }
    }

    fn task(&self, turn: Turn) -> Option<Duration> {
        match turn {
            Turn::Port => self.port,
            Turn::Starboard => self.starboard,
        }
    }

    fn task_mut(&mut self, turn: Turn) -> &mut Option<Duration> {
        match turn {
            Turn::Port => &mut self.port,
            Turn::Starboard => &mut self.starboard,
        }
    }
}

// ============================================================================
// MANUAL HELM
// ============================================================================

/// Keyboard-driven helm of the user vessel.
///
/// Throttle moves in discrete steps, one per input event. The rudder is
/// moved by the servo and rotates the forward intent.
#[derive(Component, Debug, Clone)]
pub struct ManualHelm {
    controls: ControlState,
    speed: f32,
    speed_step: f32,
    rudder: RudderServo,
    policy: HeadingPolicy,
}

impl ManualHelm {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            controls: ControlState::NONE,
            speed: config.initial_speed,
            speed_step: config.speed_step,
            rudder: RudderServo::new(config.rudder_step, config.rudder_period()),
            policy: HeadingPolicy {
                easing: config.manual_easing,
                ..HeadingPolicy::MANUAL
            },
        }
    }

    /// Apply one input event's control state.
    pub fn set_controls(&mut self, controls: ControlState) {
        self.controls = controls;

        if controls.up && self.speed < 1.0 {
            self.speed = (self.speed + self.speed_step).min(1.0);
        }
        if controls.down && self.speed > 0.0 {
            self.speed = (self.speed - self.speed_step).max(0.0);
        }

        for (held, turn) in [(controls.right, Turn::Starboard), (controls.left, Turn::Port)] {
            if held {
                self.rudder.engage(turn);
            } else {
                self.rudder.release(turn);
            }
        }
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn rudder_angle(&self) -> f32 {
        self.rudder.angle()
    }
}

impl IntentResolver for ManualHelm {
    fn resolve(&mut self, _tick_count: f64, dt: Duration) -> Intent {
        self.rudder.advance(dt);

        // Forward intent is (0, z); the rudder rotates it in the XZ plane.
        let z = if self.controls.up { 1.0 } else { 0.0 };
        let (sin, cos) = self.rudder.angle().sin_cos();
        Intent {
            direction: Vec3::new(-z * sin, 0.0, z * cos),
            speed: self.speed,
        }
    }

    fn heading_policy(&self) -> HeadingPolicy {
        self.policy
    }
}

// ============================================================================
// SCRIPTED HELM
// ============================================================================

/// Time-driven control source for an AI vessel.
pub trait Script: Send + Sync + 'static {
    fn controls(&mut self, tick_count: f64) -> ControlState;
}

/// Never touches the controls.
pub struct Idle;

impl Script for Idle {
    fn controls(&mut self, _tick_count: f64) -> ControlState {
        ControlState::NONE
    }
}

/// Repeating sequence of `(controls, duration)` legs. Durations are measured
/// in tick-counter units, not ticks.
pub struct Legs {
    legs: Vec<(ControlState, f32)>,
    cycle: f32,
}

impl Legs {
    pub fn new(legs: Vec<(ControlState, f32)>) -> Self {
        let legs: Vec<_> = legs.into_iter().filter(|&(_, len)| len > 0.0).collect();
        let cycle = legs.iter().map(|&(_, len)| len).sum();
        Self { legs, cycle }
    }

    /// Out along +Z, jink left, back along -Z, jink right.
    pub fn patrol() -> Self {
        let ahead_left = ControlState { left: true, ..ControlState::AHEAD };
        let astern_right = ControlState { right: true, ..ControlState::ASTERN };
        Self::new(vec![
            (ControlState::AHEAD, 150.0),
            (ahead_left, 40.0),
            (ControlState::ASTERN, 150.0),
            (astern_right, 40.0),
        ])
    }
}

impl Script for Legs {
    fn controls(&mut self, tick_count: f64) -> ControlState {
        if self.legs.is_empty() {
            return ControlState::NONE;
        }
        let mut at = tick_count.rem_euclid(f64::from(self.cycle));
        for &(controls, len) in &self.legs {
            let len = f64::from(len);
            if at < len {
                return controls;
            }
            at -= len;
        }
        // Rounding at the very end of the cycle.
        self.legs[self.legs.len() - 1].0
    }
}

/// Speed curve of a scripted vessel: `floor + ln(1 + tick_count / scale)`.
/// Strictly increasing and unbounded.
pub fn scripted_speed(tick_count: f64, floor: f32, scale: f32) -> f32 {
    (f64::from(floor) + (tick_count / f64::from(scale)).ln_1p()) as f32
}

/// Helm of an AI vessel.
#[derive(Component)]
pub struct ScriptedHelm {
    script: Box<dyn Script>,
    speed_floor: f32,
    speed_scale: f32,
    policy: HeadingPolicy,
}

impl ScriptedHelm {
    pub fn new(script: Box<dyn Script>, config: &SimConfig) -> Self {
        Self {
            script,
            speed_floor: config.ai_speed_floor,
            speed_scale: config.ai_speed_scale,
            policy: HeadingPolicy {
                easing: config.scripted_easing,
                ..HeadingPolicy::SCRIPTED
            },
        }
    }

    /// Helm running the script selected in the config.
    pub fn from_config(config: &SimConfig) -> Self {
        let script: Box<dyn Script> = match config.ai_script {
            AiScript::Idle => Box::new(Idle),
            AiScript::Patrol => Box::new(Legs::patrol()),
        };
        Self::new(script, config)
    }
}

/// Axis-unit direction from four keys: left is +X, up is +Z. Diagonals stay
/// at (±1, ±1) so the steering integrator sees them as diagonals.
fn key_direction(controls: ControlState) -> Vec3 {
    let x = if controls.left {
        1.0
    } else if controls.right {
        -1.0
    } else {
        0.0
    };
    let z = if controls.up {
        1.0
    } else if controls.down {
        -1.0
    } else {
        0.0
    };
    Vec3::new(x, 0.0, z)
}

impl IntentResolver for ScriptedHelm {
    fn resolve(&mut self, tick_count: f64, _dt: Duration) -> Intent {
        let controls = self.script.controls(tick_count);
        Intent {
            direction: key_direction(controls),
            speed: scripted_speed(tick_count, self.speed_floor, self.speed_scale),
        }
    }

    fn heading_policy(&self) -> HeadingPolicy {
        self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TICK: Duration = Duration::from_micros(16_667);

    fn helm() -> ManualHelm {
        ManualHelm::new(&SimConfig::default())
    }

    #[test]
    fn test_throttle_steps_and_ceiling() {
        let mut helm = ManualHelm::new(&SimConfig { initial_speed: 0.0, ..SimConfig::default() });
        for n in 1..=5 {
            helm.set_controls(ControlState::AHEAD);
            assert!((helm.speed() - 0.1 * n as f32).abs() < 1e-5);
        }
        for _ in 0..20 {
            helm.set_controls(ControlState::AHEAD);
            assert!(helm.speed() <= 1.0);
        }
        assert_eq!(helm.speed(), 1.0);
    }

    #[test]
    fn test_throttle_floor() {
        let mut helm = helm();
        for _ in 0..25 {
            helm.set_controls(ControlState::ASTERN);
            assert!(helm.speed() >= 0.0);
        }
        assert_eq!(helm.speed(), 0.0);
    }

    #[test]
    fn test_release_does_not_change_speed() {
        let mut helm = ManualHelm::new(&SimConfig { initial_speed: 0.5, ..SimConfig::default() });
        helm.set_controls(ControlState::NONE);
        assert_eq!(helm.speed(), 0.5);
    }

    #[test]
    fn test_servo_runs_at_fixed_rate() {
        let mut servo = RudderServo::new(0.00005, Duration::from_millis(25));
        servo.engage(Turn::Starboard);
        servo.advance(Duration::from_millis(24));
        assert_eq!(servo.angle(), 0.0);
        // Carry: 24 + 26 = 50 ms → two steps.
        servo.advance(Duration::from_millis(26));
        assert!((servo.angle() - 0.0001).abs() < 1e-9);
        servo.release(Turn::Starboard);
        servo.advance(Duration::from_secs(1));
        assert!((servo.angle() - 0.0001).abs() < 1e-9);
    }

    #[test]
    fn test_servo_stops_at_bound() {
        let mut servo = RudderServo::new(0.25, Duration::from_millis(25));
        servo.engage(Turn::Port);
        servo.advance(Duration::from_millis(250));
        assert_eq!(servo.angle(), -1.0);
        assert!(!servo.is_running(Turn::Port));
        // Engaging at the bound is a no-op.
        servo.engage(Turn::Port);
        assert!(!servo.is_running(Turn::Port));
        // The other side can still pull it back.
        servo.engage(Turn::Starboard);
        servo.advance(Duration::from_millis(25));
        assert_eq!(servo.angle(), -0.75);
    }

    #[test]
    fn test_repeated_key_events_do_not_stack_tasks() {
        let mut helm = helm();
        let right = ControlState { right: true, ..ControlState::NONE };
        for _ in 0..10 {
            helm.set_controls(right);
        }
        helm.resolve(0.0, Duration::from_millis(100));
        // One task: 4 periods, not 40.
        assert!((helm.rudder_angle() - 4.0 * 0.00005).abs() < 1e-9);
    }

    #[test]
    fn test_manual_intent_rotated_by_rudder() {
        let mut helm = helm();
        assert_eq!(helm.resolve(0.0, TICK).direction, Vec3::ZERO);

        helm.set_controls(ControlState::AHEAD);
        let ahead = helm.resolve(0.0, TICK);
        assert_eq!(ahead.direction.z, 1.0);
        assert_eq!(ahead.direction.x, 0.0);
        assert_eq!(ahead.speed, 1.0);

        let ahead_right = ControlState { right: true, ..ControlState::AHEAD };
        helm.set_controls(ahead_right);
        let turned = helm.resolve(0.0, Duration::from_secs(10));
        let r = helm.rudder_angle();
        assert!(r > 0.0);
        assert!((turned.direction.x + r.sin()).abs() < 1e-6);
        assert!((turned.direction.z - r.cos()).abs() < 1e-6);
        assert!((turned.direction.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_scripted_key_directions() {
        assert_eq!(key_direction(ControlState::AHEAD), Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(key_direction(ControlState::ASTERN), Vec3::new(0.0, 0.0, -1.0));
        let diag = ControlState { left: true, up: true, ..ControlState::NONE };
        assert_eq!(key_direction(diag), Vec3::new(1.0, 0.0, 1.0));
        let right = ControlState { right: true, ..ControlState::NONE };
        assert_eq!(key_direction(right), Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_idle_script_is_still() {
        let mut helm = ScriptedHelm::new(Box::new(Idle), &SimConfig::default());
        let intent = helm.resolve(40.0, TICK);
        assert_eq!(intent.direction, Vec3::ZERO);
        assert!(intent.speed > 0.001);
    }

    #[test]
    fn test_legs_cycle() {
        let mut legs = Legs::new(vec![(ControlState::AHEAD, 10.0), (ControlState::ASTERN, 5.0)]);
        assert_eq!(legs.controls(0.0), ControlState::AHEAD);
        assert_eq!(legs.controls(9.75), ControlState::AHEAD);
        assert_eq!(legs.controls(10.0), ControlState::ASTERN);
        assert_eq!(legs.controls(15.0), ControlState::AHEAD);
        assert_eq!(legs.controls(27.0), ControlState::ASTERN);
        assert_eq!(Legs::new(vec![]).controls(3.0), ControlState::NONE);
    }

    #[test]
    fn test_scripted_speed_at_zero() {
        assert_eq!(scripted_speed(0.0, 0.001, 10.0), 0.001);
        assert!((scripted_speed(90.0, 0.001, 10.0) - (0.001 + 10.0f32.ln())).abs() < 1e-5);
    }

    #[test]
    fn test_speed_keeps_rising_after_days_at_sea() {
        // 2^22 quarter-steps is about 78 hours at 60 Hz.
        let late = 4_194_304.0f64;
        let next = late + 0.25;
        assert!(next > late);
        assert!(scripted_speed(next, 0.001, 10.0) >= scripted_speed(late, 0.001, 10.0));

        let mut helm = ScriptedHelm::new(Box::new(Idle), &SimConfig::default());
        assert!(helm.resolve(next, TICK).speed.is_finite());
    }

    proptest! {
        #[test]
        fn prop_scripted_speed_increasing(a in 0.0f64..10_000.0, delta in 0.25f64..100.0) {
            let slow = scripted_speed(a, 0.001, 10.0);
            let fast = scripted_speed(a + delta, 0.001, 10.0);
            prop_assert!(slow >= 0.001);
            prop_assert!(fast > slow);
        }
    }
}
