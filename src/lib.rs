//! Mazebound game core library
//!
//! Headless core of a top-down tile-maze puzzle: per-capability
//! navigation graphs, A* pathfinding with line-of-sight smoothing, and
//! a fixed-timestep rigid-body level with contact-driven rules (goal
//! occupancy, breakable walls, buttons opening doors).

pub mod config;
pub mod game;
