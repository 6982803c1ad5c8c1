use serde::{Deserialize, Serialize};
use std::{error::Error, fmt};

/// Reward shaping constants for training mode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Granted for every feeding contact that yields nectar.
    pub feed_base: f32,
    /// Scaled by forward/outward alignment clamped to `[0, 1]`.
    pub feed_alignment_bonus: f32,
    pub boundary_penalty: f32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            feed_base: 0.01,
            feed_alignment_bonus: 0.02,
            boundary_penalty: -0.5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub move_force: f64,
    pub mass: f64,
    pub drag: f64,
    /// Degrees per second at full pitch command.
    pub pitch_speed: f64,
    /// Degrees per second at full yaw command.
    pub yaw_speed: f64,
    /// Maximum change of the smoothed pitch/yaw command per second.
    pub smoothing_rate: f64,
    pub max_pitch_deg: f64,
    /// Beak tip in agent-local coordinates (+Z is forward).
    pub beak_offset: [f64; 3],
    pub beak_radius: f64,
    pub body_radius: f64,
    pub feed_amount: f32,
    pub placement_attempts: usize,
    pub placement_clearance: f64,
    pub near_flower_offset_min: f64,
    pub near_flower_offset_max: f64,
    pub open_air_radius_min: f64,
    pub open_air_radius_max: f64,
    pub open_air_height_min: f64,
    pub open_air_height_max: f64,
    pub open_air_pitch_deg: f64,
    pub reward: RewardConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            move_force: 2.0,
            mass: 1.0,
            drag: 0.5,
            pitch_speed: 100.0,
            yaw_speed: 100.0,
            smoothing_rate: 2.0,
            max_pitch_deg: 80.0,
            beak_offset: [0.0, 0.0, 0.03],
            beak_radius: 0.008,
            body_radius: 0.02,
            feed_amount: 0.01,
            placement_attempts: 100,
            placement_clearance: 0.05,
            near_flower_offset_min: 0.1,
            near_flower_offset_max: 0.2,
            open_air_radius_min: 2.0,
            open_air_radius_max: 7.0,
            open_air_height_min: 1.2,
            open_air_height_max: 2.5,
            open_air_pitch_deg: 60.0,
            reward: RewardConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    pub seed: u64,
    pub training: bool,
    pub num_agents: usize,
    /// Fixed physics timestep in seconds.
    pub dt: f64,
    /// Training episode horizon; 0 disables the limit.
    pub max_episode_steps: usize,
    pub bounds_min: [f64; 3],
    pub bounds_max: [f64; 3],
    pub agent: AgentConfig,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            training: false,
            num_agents: 2,
            dt: 0.02,
            max_episode_steps: 5000,
            bounds_min: [-10.0, 0.0, -10.0],
            bounds_max: [10.0, 8.0, 10.0],
            agent: AgentConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// The match ends when either agent collects this much nectar.
    pub max_nectar: f32,
    pub duration_secs: f64,
    pub countdown_interval_secs: f64,
    pub start_label: String,
    pub menu_label: String,
    pub win_banner: String,
    pub lose_banner: String,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            max_nectar: 8.0,
            duration_secs: 60.0,
            countdown_interval_secs: 1.0,
            start_label: "Start".to_string(),
            menu_label: "Main Menu".to_string(),
            win_banner: "You win!".to_string(),
            lose_banner: "ML-Agent wins!".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    NonPositive { field: &'static str, value: f64 },
    InvalidRange { field: &'static str, min: f64, max: f64 },
    NoAgents,
    ZeroPlacementAttempts,
    PitchLimitOutOfRange(f64),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NonPositive { field, value } => {
                write!(f, "{field} must be positive and finite (got {value})")
            }
            ConfigError::InvalidRange { field, min, max } => {
                write!(f, "{field} range is empty or inverted ({min}..{max})")
            }
            ConfigError::NoAgents => write!(f, "num_agents must be at least 1"),
            ConfigError::ZeroPlacementAttempts => {
                write!(f, "placement_attempts must be at least 1")
            }
            ConfigError::PitchLimitOutOfRange(v) => {
                write!(f, "max_pitch_deg must lie in (0, 90) (got {v})")
            }
        }
    }
}

impl Error for ConfigError {}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

fn range(field: &'static str, min: f64, max: f64) -> Result<(), ConfigError> {
    if min.is_finite() && max.is_finite() && min <= max {
        Ok(())
    } else {
        Err(ConfigError::InvalidRange { field, min, max })
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("move_force", self.move_force)?;
        positive("mass", self.mass)?;
        if !(self.drag.is_finite() && self.drag >= 0.0) {
            return Err(ConfigError::NonPositive {
                field: "drag",
                value: self.drag,
            });
        }
        positive("pitch_speed", self.pitch_speed)?;
        positive("yaw_speed", self.yaw_speed)?;
        positive("smoothing_rate", self.smoothing_rate)?;
        if !(self.max_pitch_deg > 0.0 && self.max_pitch_deg < 90.0) {
            return Err(ConfigError::PitchLimitOutOfRange(self.max_pitch_deg));
        }
        positive("beak_radius", self.beak_radius)?;
        positive("body_radius", self.body_radius)?;
        positive("feed_amount", self.feed_amount as f64)?;
        if self.placement_attempts == 0 {
            return Err(ConfigError::ZeroPlacementAttempts);
        }
        positive("placement_clearance", self.placement_clearance)?;
        range(
            "near_flower_offset",
            self.near_flower_offset_min,
            self.near_flower_offset_max,
        )?;
        range(
            "open_air_radius",
            self.open_air_radius_min,
            self.open_air_radius_max,
        )?;
        range(
            "open_air_height",
            self.open_air_height_min,
            self.open_air_height_max,
        )?;
        range("open_air_pitch", 0.0, self.open_air_pitch_deg)
    }
}

impl ArenaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_agents == 0 {
            return Err(ConfigError::NoAgents);
        }
        positive("dt", self.dt)?;
        for axis in 0..3 {
            range("bounds", self.bounds_min[axis], self.bounds_max[axis])?;
        }
        self.agent.validate()
    }
}

impl MatchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("max_nectar", self.max_nectar as f64)?;
        positive("duration_secs", self.duration_secs)?;
        positive("countdown_interval_secs", self.countdown_interval_secs)
    }
}
