//! Gameplay and simulation constants.
//! Centralizing these prevents bugs from duplicated hardcoded values.

/// Physics stepping constants
pub mod physics {
    /// Fixed timestep for the rigid-body simulation (60 Hz)
    pub const TIMESTEP: f32 = 1.0 / 60.0;

    /// Upper bound on a single frame's wall-clock time fed to the
    /// accumulator; slower frames are clamped to this
    pub const MAX_FRAME_TIME: f32 = 0.25;

    /// Small epsilon for float comparisons
    pub const EPSILON: f32 = 0.001;
}

/// Navigation constants
pub mod nav {
    /// Perpendicular offset of the two side rays in the line-of-sight
    /// smoothing test, in world units (half a corridor margin)
    pub const PATH_SMOOTH_SIDE_OFFSET: f32 = 0.35;
}

/// Character defaults
pub mod character {
    /// Collision circle radius in world units (tile = 1.0)
    pub const RADIUS: f32 = 0.4;

    /// Movement speed along the smoothed path, world units per second
    pub const MOVE_SPEED: f32 = 3.0;

    /// Distance at which the current waypoint counts as reached
    pub const WAYPOINT_ARRIVE_RADIUS: f32 = 0.2;

    /// Seconds without reaching a waypoint before the path is cancelled
    pub const MOVE_STALL_TIMEOUT: f32 = 4.0;

    /// Body density for the dynamic collision circle
    pub const DENSITY: f32 = 4.0;

    /// Half-extent of the AABB used when resolving a touch to a character
    pub const ACTIVATION_OFFSET: f32 = 0.6;
}

/// Level rules
pub mod level {
    /// Simultaneous goal occupants required to complete a level
    pub const REQUIRED_IN_GOAL: u32 = 3;

    /// Minimum seconds between two path requests for the active character
    pub const PATH_REQUEST_COOLDOWN: f32 = 0.5;

    /// Slack subtracted from the cooldown so a frame landing just short
    /// of the cutoff still passes
    pub const PATH_COOLDOWN_SLACK: f32 = 0.01;
}
