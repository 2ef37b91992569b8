//! Player characters: capability classes, their collision filters, and
//! movement along a smoothed waypoint path.

use nalgebra::Point2;
use rapier2d::prelude::{Group, RigidBodyHandle};

use crate::config::Tuning;

use super::physics::{
    PhysicsWorld, ALL_WALL_GROUPS, GROUP_CLIMB_WALLS, GROUP_WATER_WALLS,
};

/// Movement capability class. Each level fields one character per class;
/// the class decides which wall layers the character passes through and
/// whether strong walls break on contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Water,
    Climb,
    Strong,
}

impl Capability {
    pub const ALL: [Capability; 3] = [Capability::Water, Capability::Climb, Capability::Strong];

    pub fn name(&self) -> &'static str {
        match self {
            Capability::Water => "water",
            Capability::Climb => "climb",
            Capability::Strong => "strong",
        }
    }

    pub fn from_name(name: &str) -> Option<Capability> {
        match name {
            "water" => Some(Capability::Water),
            "climb" => Some(Capability::Climb),
            "strong" => Some(Capability::Strong),
            _ => None,
        }
    }

    /// The wall layer this class walks straight through, if any.
    fn passable_group(&self) -> Group {
        match self {
            Capability::Water => GROUP_WATER_WALLS,
            Capability::Climb => GROUP_CLIMB_WALLS,
            Capability::Strong => Group::NONE,
        }
    }

    /// Collision filter for the character's collider. Everything collides
    /// except the layer the class passes through.
    pub fn collision_filter(&self) -> Group {
        Group::ALL & !self.passable_group()
    }

    /// Solid groups that obstruct this class's line of sight during path
    /// smoothing. Unbroken strong walls block everyone, including the
    /// character that could break them.
    pub fn blocking_groups(&self) -> Group {
        ALL_WALL_GROUPS & !self.passable_group()
    }

    pub fn breaks_strong_walls(&self) -> bool {
        matches!(self, Capability::Strong)
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One controllable character: a dynamic circle body plus its current
/// waypoint path and movement timers.
#[derive(Debug)]
pub struct Character {
    capability: Capability,
    body: RigidBodyHandle,
    path: Vec<Point2<f32>>,
    next_waypoint: usize,
    time_since_move: f32,
    moving: bool,
    in_contact: bool,
}

impl Character {
    pub fn new(capability: Capability, body: RigidBodyHandle) -> Self {
        Self {
            capability,
            body,
            path: Vec::new(),
            next_waypoint: 0,
            time_since_move: 0.0,
            moving: false,
            in_contact: false,
        }
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn body(&self) -> RigidBodyHandle {
        self.body
    }

    pub fn is_moving(&self) -> bool {
        self.moving
    }

    pub fn is_in_contact(&self) -> bool {
        self.in_contact
    }

    pub fn set_in_contact(&mut self, in_contact: bool) {
        self.in_contact = in_contact;
    }

    /// Starts following `path` from its first waypoint. An empty path is
    /// ignored and the current movement keeps going.
    pub fn set_path(&mut self, path: Vec<Point2<f32>>) {
        if path.is_empty() {
            return;
        }
        self.path = path;
        self.next_waypoint = 0;
        self.time_since_move = 0.0;
        self.moving = true;
    }

    /// Drops the current path and brings the body to rest.
    pub fn stop(&mut self, world: &mut PhysicsWorld) {
        self.path.clear();
        self.next_waypoint = 0;
        self.moving = false;
        world.halt_body(self.body);
    }

    /// Advances path following by one frame: waypoints inside the arrive
    /// radius are consumed, the velocity is aimed at the next one, and a
    /// stalled move (no waypoint reached within the timeout) is cancelled.
    pub fn update_movement(&mut self, world: &mut PhysicsWorld, dt: f32, tuning: &Tuning) {
        if !self.moving {
            return;
        }
        let Some(position) = world.position(self.body) else {
            self.moving = false;
            self.path.clear();
            return;
        };

        self.time_since_move += dt;
        if self.time_since_move > tuning.move_stall_timeout {
            log::debug!("{} character stalled, dropping path", self.capability);
            self.stop(world);
            return;
        }

        while self.next_waypoint < self.path.len()
            && nalgebra::distance(&position, &self.path[self.next_waypoint])
                < tuning.waypoint_arrive_radius
        {
            self.next_waypoint += 1;
            self.time_since_move = 0.0;
        }
        if self.next_waypoint >= self.path.len() {
            self.stop(world);
            return;
        }

        let direction = self.path[self.next_waypoint] - position;
        let velocity = direction / direction.magnitude() * tuning.move_speed;
        world.set_linear_velocity(self.body, velocity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::{character as character_consts, physics as physics_consts};
    use crate::game::physics::{BodyTag, GROUP_CHARACTERS, GROUP_GOAL, GROUP_WALLS};
    use nalgebra::Vector2;

    #[test]
    fn test_capability_names_round_trip() {
        for capability in Capability::ALL {
            assert_eq!(Capability::from_name(capability.name()), Some(capability));
        }
        assert_eq!(Capability::from_name("lava"), None);
    }

    #[test]
    fn test_collision_filters_exempt_the_passable_layer() {
        assert!(!Capability::Water.collision_filter().contains(GROUP_WATER_WALLS));
        assert!(Capability::Water.collision_filter().contains(GROUP_CLIMB_WALLS));
        assert!(Capability::Water.collision_filter().contains(GROUP_GOAL));

        assert!(!Capability::Climb.collision_filter().contains(GROUP_CLIMB_WALLS));
        assert!(Capability::Climb.collision_filter().contains(GROUP_WATER_WALLS));

        assert_eq!(Capability::Strong.collision_filter(), Group::ALL);
        assert!(Capability::Strong.breaks_strong_walls());
        assert!(!Capability::Water.breaks_strong_walls());
    }

    #[test]
    fn test_blocking_groups_never_include_sensors_or_characters() {
        for capability in Capability::ALL {
            let blocking = capability.blocking_groups();
            assert!(!blocking.contains(GROUP_GOAL));
            assert!(!blocking.contains(GROUP_CHARACTERS));
            assert!(blocking.contains(GROUP_WALLS));
        }
        assert!(!Capability::Water.blocking_groups().contains(GROUP_WATER_WALLS));
        assert!(!Capability::Climb.blocking_groups().contains(GROUP_CLIMB_WALLS));
    }

    #[test]
    fn test_character_walks_a_two_waypoint_path_and_stops() {
        let mut world = PhysicsWorld::new();
        let body = world.add_character(
            0,
            Point2::new(0.5, 0.5),
            character_consts::RADIUS,
            Capability::Strong.collision_filter(),
        );
        let mut character = Character::new(Capability::Strong, body);
        let tuning = Tuning::default();

        character.set_path(vec![Point2::new(1.5, 0.5), Point2::new(2.5, 0.5)]);
        assert!(character.is_moving());

        for _ in 0..240 {
            character.update_movement(&mut world, physics_consts::TIMESTEP, &tuning);
            world.step(physics_consts::TIMESTEP);
        }

        assert!(!character.is_moving(), "path should finish within 4 seconds");
        let position = world.position(body).expect("body exists");
        let remaining = nalgebra::distance(&position, &Point2::new(2.5, 0.5));
        assert!(
            remaining < 0.3,
            "character should rest near the final waypoint, was {remaining} away"
        );
    }

    #[test]
    fn test_stalled_path_is_cancelled_after_timeout() {
        let mut world = PhysicsWorld::new();
        world.add_static_rect(
            Point2::new(1.5, 0.5),
            Vector2::new(0.5, 2.0),
            GROUP_WALLS,
            false,
            BodyTag::Wall,
        );
        let body = world.add_character(
            0,
            Point2::new(0.5, 0.5),
            character_consts::RADIUS,
            Capability::Strong.collision_filter(),
        );
        let mut character = Character::new(Capability::Strong, body);
        let tuning = Tuning::default();

        character.set_path(vec![Point2::new(3.5, 0.5)]);
        let frames = (tuning.move_stall_timeout / physics_consts::TIMESTEP) as usize + 10;
        for _ in 0..frames {
            character.update_movement(&mut world, physics_consts::TIMESTEP, &tuning);
            world.step(physics_consts::TIMESTEP);
        }

        assert!(!character.is_moving(), "blocked move should time out");
        let position = world.position(body).expect("body exists");
        assert!(position.x < 1.0, "wall should have held the character back");
    }

    #[test]
    fn test_empty_path_is_ignored() {
        let mut world = PhysicsWorld::new();
        let body = world.add_character(
            0,
            Point2::new(0.5, 0.5),
            character_consts::RADIUS,
            Capability::Water.collision_filter(),
        );
        let mut character = Character::new(Capability::Water, body);

        character.set_path(Vec::new());
        assert!(!character.is_moving());

        character.set_path(vec![Point2::new(5.5, 0.5)]);
        character.set_path(Vec::new());
        assert!(character.is_moving(), "an empty path must not cancel a move");
    }
}
