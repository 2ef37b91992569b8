pub mod constants;
pub mod contact;
pub mod contact_events;
pub mod level;
pub mod map;
pub mod nav;
pub mod pathfinding;
pub mod physics;
pub mod player;
pub mod smoothing;
pub mod stepper;
