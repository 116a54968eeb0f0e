// Simulation configuration.
// Every tuning constant of the sailing simulation is collected here. A TOML
// file may override any subset of them; missing keys keep their defaults.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Which scripted policy drives the AI vessel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiScript {
    /// No input at all; the AI vessel stays where it spawned.
    Idle,
    /// Cycles through a fixed set of timed legs.
    Patrol,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    // === COLLISION PROBE ===
    /// Distance (world units) at which a ray-fan hit blocks its octant.
    pub probe_distance: f32,

    // === CLOCK ===
    /// Fixed simulation ticks per second. All per-tick constants below
    /// assume this rate.
    pub tick_hz: u32,
    /// Upper bound on ticks run for a single rendered frame. Backlog beyond
    /// this is dropped rather than replayed.
    pub max_ticks_per_frame: u32,
    /// Amount added to a vessel's tick counter every tick.
    pub tick_step: f32,

    // === MANUAL VESSEL ===
    /// Speed change per throttle input event.
    pub speed_step: f32,
    /// Speed the user vessel starts with, in [0, 1].
    pub initial_speed: f32,
    /// Rudder change applied by the servo once per `rudder_period_ms`.
    pub rudder_step: f32,
    /// Servo period in milliseconds of simulated time.
    pub rudder_period_ms: u64,
    /// Fraction of the remaining heading error closed per tick.
    pub manual_easing: f32,

    // === AI VESSEL ===
    pub ai_script: AiScript,
    pub scripted_easing: f32,
    /// Speed at tick 0; the log curve is added on top.
    pub ai_speed_floor: f32,
    /// Tick-count divisor inside the log speed curve.
    pub ai_speed_scale: f32,
    /// X coordinate the AI vessel spawns at.
    pub ai_start_x: f32,

    // === ARENA ===
    /// Side length of the square arena (walls sit at ±arena_size/2).
    pub arena_size: f32,
    pub wall_height: f32,
    /// Number of rocks scattered in the arena.
    pub rock_count: usize,
    /// Seed for the rock scatter, so the arena is identical run to run.
    pub rock_seed: u64,
    pub rock_min_size: f32,
    pub rock_max_size: f32,
    /// No rock is placed within this radius of either vessel's spawn point.
    pub spawn_clearance: f32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            probe_distance: 24.0,
            tick_hz: 60,
            max_ticks_per_frame: 8,
            tick_step: 0.25,
            speed_step: 0.1,
            initial_speed: 1.0,
            rudder_step: 0.00005,
            rudder_period_ms: 25,
            manual_easing: 1.5 / 128.0,
            ai_script: AiScript::Idle,
            scripted_easing: 1.0 / 128.0,
            ai_speed_floor: 0.001,
            ai_speed_scale: 10.0,
            ai_start_x: 180.0,
            arena_size: 9000.0,
            wall_height: 128.0,
            rock_count: 24,
            rock_seed: 0x5a11,
            rock_min_size: 40.0,
            rock_max_size: 160.0,
            spawn_clearance: 400.0,
        }
    }
}

impl SimConfig {
    /// Read and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.probe_distance > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "probe_distance must be positive, got {}",
                self.probe_distance
            )));
        }
        if self.tick_hz == 0 {
            return Err(ConfigError::Invalid("tick_hz must be at least 1".into()));
        }
        for (name, step) in [("tick_step", self.tick_step), ("speed_step", self.speed_step)] {
            if !(step > 0.0) {
                return Err(ConfigError::Invalid(format!("{name} must be positive, got {step}")));
            }
        }
        if self.rudder_period_ms == 0 {
            return Err(ConfigError::Invalid("rudder_period_ms must be at least 1".into()));
        }
        for (name, easing) in [
            ("manual_easing", self.manual_easing),
            ("scripted_easing", self.scripted_easing),
        ] {
            if !(easing > 0.0 && easing <= 1.0) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be in (0, 1], got {easing}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.initial_speed) {
            return Err(ConfigError::Invalid(format!(
                "initial_speed must be in [0, 1], got {}",
                self.initial_speed
            )));
        }
        if !(self.ai_speed_scale > 0.0) {
            return Err(ConfigError::Invalid("ai_speed_scale must be positive".into()));
        }
        if !(self.arena_size > 0.0) || !(self.wall_height > 0.0) {
            return Err(ConfigError::Invalid(
                "arena_size and wall_height must be positive".into(),
            ));
        }
        if !(self.rock_min_size > 0.0) || self.rock_min_size > self.rock_max_size {
            return Err(ConfigError::Invalid(
                "rock sizes must satisfy 0 < rock_min_size <= rock_max_size".into(),
            ));
        }
        Ok(())
    }

    /// Simulated time covered by one fixed tick.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_hz as f64)
    }

    pub fn rudder_period(&self) -> Duration {
        Duration::from_millis(self.rudder_period_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SimConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.probe_distance, 24.0);
        assert_eq!(config.tick_step, 0.25);
        assert_eq!(config.rudder_period(), Duration::from_millis(25));
        assert_eq!(config.ai_script, AiScript::Idle);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SimConfig::from_toml("probe_distance = 30.0\nai_script = \"patrol\"\n")
            .expect("valid toml");
        assert_eq!(config.probe_distance, 30.0);
        assert_eq!(config.ai_script, AiScript::Patrol);
        assert_eq!(config.tick_hz, 60);
        assert_eq!(config.arena_size, 9000.0);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            SimConfig::from_toml("probe_distance = 0.0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SimConfig::from_toml("tick_hz = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SimConfig::from_toml("manual_easing = 1.5"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_rejects_non_positive_steps() {
        for text in ["tick_step = 0.0", "tick_step = -0.25", "speed_step = 0.0", "speed_step = -0.1"] {
            assert!(
                matches!(SimConfig::from_toml(text), Err(ConfigError::Invalid(_))),
                "accepted {text}"
            );
        }
    }

    #[test]
    fn test_rejects_malformed_toml() {
        assert!(matches!(
            SimConfig::from_toml("probe_distance = \"far\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = SimConfig::load(Path::new("/definitely/not/here/regatta.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
