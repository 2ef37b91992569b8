//! Gameplay tuning parsed from TOML files.
//!
//! Every field has a default mirroring `game::constants`, so an empty
//! document (or no file at all) yields the stock tuning and a level
//! designer only writes the values they want to change.

use serde::Deserialize;
use std::path::Path;

use crate::game::constants::{character, level, nav, physics};

/// Tunable gameplay values for one level session.
#[derive(Debug, Clone, Deserialize)]
pub struct Tuning {
    /// Fixed simulation timestep in seconds
    #[serde(default = "default_timestep")]
    pub timestep: f32,
    /// Clamp applied to a frame's wall-clock time before accumulation
    #[serde(default = "default_max_frame_time")]
    pub max_frame_time: f32,
    /// Collision circle radius of a character
    #[serde(default = "default_character_radius")]
    pub character_radius: f32,
    /// Movement speed along a path, world units per second
    #[serde(default = "default_move_speed")]
    pub move_speed: f32,
    /// Distance at which the current waypoint counts as reached
    #[serde(default = "default_waypoint_arrive_radius")]
    pub waypoint_arrive_radius: f32,
    /// Seconds without reaching a waypoint before the path is dropped
    #[serde(default = "default_move_stall_timeout")]
    pub move_stall_timeout: f32,
    /// Half-extent of the touch-selection query box around a tap
    #[serde(default = "default_activation_offset")]
    pub activation_offset: f32,
    /// Characters that must overlap the goal at once to finish the level
    #[serde(default = "default_required_in_goal")]
    pub required_in_goal: u32,
    /// Minimum seconds between two path requests for the active character
    #[serde(default = "default_path_request_cooldown")]
    pub path_request_cooldown: f32,
    /// Side-ray offset used by line-of-sight path smoothing
    #[serde(default = "default_path_smooth_side_offset")]
    pub path_smooth_side_offset: f32,
}

fn default_timestep() -> f32 {
    physics::TIMESTEP
}

fn default_max_frame_time() -> f32 {
    physics::MAX_FRAME_TIME
}

fn default_character_radius() -> f32 {
    character::RADIUS
}

fn default_move_speed() -> f32 {
    character::MOVE_SPEED
}

fn default_waypoint_arrive_radius() -> f32 {
    character::WAYPOINT_ARRIVE_RADIUS
}

fn default_move_stall_timeout() -> f32 {
    character::MOVE_STALL_TIMEOUT
}

fn default_activation_offset() -> f32 {
    character::ACTIVATION_OFFSET
}

fn default_required_in_goal() -> u32 {
    level::REQUIRED_IN_GOAL
}

fn default_path_request_cooldown() -> f32 {
    level::PATH_REQUEST_COOLDOWN
}

fn default_path_smooth_side_offset() -> f32 {
    nav::PATH_SMOOTH_SIDE_OFFSET
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            timestep: default_timestep(),
            max_frame_time: default_max_frame_time(),
            character_radius: default_character_radius(),
            move_speed: default_move_speed(),
            waypoint_arrive_radius: default_waypoint_arrive_radius(),
            move_stall_timeout: default_move_stall_timeout(),
            activation_offset: default_activation_offset(),
            required_in_goal: default_required_in_goal(),
            path_request_cooldown: default_path_request_cooldown(),
            path_smooth_side_offset: default_path_smooth_side_offset(),
        }
    }
}

impl Tuning {
    /// Load tuning from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, TuningError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TuningError::IoError(path.to_path_buf(), e))?;

        toml::from_str(&content).map_err(|e| TuningError::ParseError(path.to_path_buf(), e))
    }
}

/// Errors that can occur when loading tuning
#[derive(Debug)]
pub enum TuningError {
    IoError(std::path::PathBuf, std::io::Error),
    ParseError(std::path::PathBuf, toml::de::Error),
}

impl std::fmt::Display for TuningError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TuningError::IoError(path, e) => {
                write!(f, "Failed to read {}: {}", path.display(), e)
            }
            TuningError::ParseError(path, e) => {
                write!(f, "Failed to parse {}: {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for TuningError {}
