//! Wrapper around the rapier2d world for the maze simulation. Owns the
//! solver sets and query pipeline, builds the tagged level bodies with
//! their interaction groups, and collects collision begin/end events
//! through rapier's channel-based event collector.

use crossbeam_channel::Receiver;
use nalgebra::{Point2, Vector2};
use rapier2d::prelude::*;
use std::collections::HashMap;

use super::constants::character as character_consts;
use super::constants::physics as consts;

// Collision groups. Each wall class gets its own group so a character's
// filter can admit the terrain its capability walks through; the goal is
// a sensor and only ever observed through contact events.
pub const GROUP_WALLS: Group = Group::GROUP_1;
pub const GROUP_WATER_WALLS: Group = Group::GROUP_2;
pub const GROUP_CLIMB_WALLS: Group = Group::GROUP_3;
pub const GROUP_STRONG_WALLS: Group = Group::GROUP_4;
pub const GROUP_GOAL: Group = Group::GROUP_5;
pub const GROUP_DOORS: Group = Group::GROUP_6;
pub const GROUP_BUTTONS: Group = Group::GROUP_7;
pub const GROUP_CHARACTERS: Group = Group::GROUP_8;

/// Every solid group a ray or character could be blocked by.
pub const ALL_WALL_GROUPS: Group = GROUP_WALLS
    .union(GROUP_WATER_WALLS)
    .union(GROUP_CLIMB_WALLS)
    .union(GROUP_STRONG_WALLS)
    .union(GROUP_DOORS)
    .union(GROUP_BUTTONS);

/// Role tag carried by every collider in the level. Contact resolution
/// dispatches on these; an unexpected pairing falls through a default
/// match arm instead of failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyTag {
    /// Plain static wall, solid for everyone.
    Wall,
    /// Water terrain, passable only by the water character.
    WaterWall,
    /// Climbable fence, passable only by the climb character.
    ClimbWall,
    /// Breakable wall, removed when the strong character touches it.
    StrongWall,
    /// Goal region sensor.
    Goal,
    /// Door segment, keyed by its color group.
    Door { color: String },
    /// Button, named `<color>_button...`.
    Button { name: String },
    /// Player character, identified by its slot in the level roster.
    Character { slot: usize },
}

/// Rapier world plus the handle/tag bookkeeping the level needs.
pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub query_pipeline: QueryPipeline,

    /// Role tag per collider, used by contact resolution and queries.
    collider_tags: HashMap<ColliderHandle, BodyTag>,
    event_collector: ChannelEventCollector,
    collision_events: Receiver<CollisionEvent>,
    contact_force_events: Receiver<ContactForceEvent>,
}

impl PhysicsWorld {
    /// Creates a zero-gravity world; a top-down maze has no downhill.
    pub fn new() -> Self {
        let (collision_send, collision_recv) = crossbeam_channel::unbounded();
        let (force_send, force_recv) = crossbeam_channel::unbounded();
        Self {
            gravity: vector![0.0, 0.0],
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            collider_tags: HashMap::new(),
            event_collector: ChannelEventCollector::new(collision_send, force_send),
            collision_events: collision_recv,
            contact_force_events: force_recv,
        }
    }

    /// Steps the simulation forward by exactly `dt` seconds, gathering
    /// collision events into the internal channel.
    pub fn step(&mut self, dt: f32) {
        self.integration_parameters.dt = dt;
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &self.event_collector,
        );
        // Contact-force reporting is never enabled; keep the channel empty
        // all the same.
        for _ in self.contact_force_events.try_iter() {}
    }

    /// Drains the collision events gathered by the last `step` call.
    pub fn collision_events(&self) -> &Receiver<CollisionEvent> {
        &self.collision_events
    }

    /// Rebuilds the query pipeline after out-of-step world mutations.
    /// `step` keeps it fresh on its own.
    pub fn update_query_pipeline(&mut self) {
        self.query_pipeline.update(&self.collider_set);
    }

    /// Adds a static rectangle body centered at `center`. `sensor` bodies
    /// report contacts without a collision response.
    pub fn add_static_rect(
        &mut self,
        center: Point2<f32>,
        half_extents: Vector2<f32>,
        group: Group,
        sensor: bool,
        tag: BodyTag,
    ) -> RigidBodyHandle {
        let body = RigidBodyBuilder::fixed()
            .translation(vector![center.x, center.y])
            .build();
        let handle = self.rigid_body_set.insert(body);
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y)
            .sensor(sensor)
            .collision_groups(InteractionGroups::new(group, Group::ALL))
            .build();
        let collider_handle =
            self.collider_set
                .insert_with_parent(collider, handle, &mut self.rigid_body_set);
        self.collider_tags.insert(collider_handle, tag);
        handle
    }

    /// Adds a dynamic character body: a rotation-locked circle that
    /// reports collision events. `filter` decides which wall groups block
    /// it, so each capability passes its own terrain.
    pub fn add_character(
        &mut self,
        slot: usize,
        position: Point2<f32>,
        radius: f32,
        filter: Group,
    ) -> RigidBodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(vector![position.x, position.y])
            .lock_rotations()
            .build();
        let handle = self.rigid_body_set.insert(body);
        let collider = ColliderBuilder::ball(radius)
            .density(character_consts::DENSITY)
            .friction(0.0)
            .restitution(0.0)
            .collision_groups(InteractionGroups::new(GROUP_CHARACTERS, filter))
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .build();
        let collider_handle =
            self.collider_set
                .insert_with_parent(collider, handle, &mut self.rigid_body_set);
        self.collider_tags
            .insert(collider_handle, BodyTag::Character { slot });
        handle
    }

    /// Removes a body and its colliders from every solver set.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) -> bool {
        let Some(body) = self.rigid_body_set.get(handle) else {
            return false;
        };
        for &ch in body.colliders() {
            self.collider_tags.remove(&ch);
        }
        self.rigid_body_set.remove(
            handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
        true
    }

    pub fn tag(&self, collider: ColliderHandle) -> Option<&BodyTag> {
        self.collider_tags.get(&collider)
    }

    /// Rigid body a collider is attached to, if both still exist.
    pub fn body_of(&self, collider: ColliderHandle) -> Option<RigidBodyHandle> {
        self.collider_set.get(collider).and_then(|c| c.parent())
    }

    pub fn position(&self, handle: RigidBodyHandle) -> Option<Point2<f32>> {
        self.rigid_body_set.get(handle).map(|body| {
            let t = body.translation();
            Point2::new(t.x, t.y)
        })
    }

    /// Sets the linear velocity of a dynamic body, waking it.
    pub fn set_linear_velocity(&mut self, handle: RigidBodyHandle, velocity: Vector2<f32>) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            if body.is_dynamic() {
                body.set_linvel(vector![velocity.x, velocity.y], true);
            }
        }
    }

    /// Zeroes a body's velocity and puts it to sleep, ending a move.
    pub fn halt_body(&mut self, handle: RigidBodyHandle) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_linvel(vector![0.0, 0.0], false);
            body.sleep();
        }
    }

    /// True when the straight segment `from → to` hits any solid collider
    /// in `blocking`. Sensors never block; the segment acts as a member of
    /// the character group so wall filters apply symmetrically.
    pub fn segment_hits_solid(
        &self,
        from: Point2<f32>,
        to: Point2<f32>,
        blocking: Group,
    ) -> bool {
        let direction = to - from;
        let max_dist = direction.magnitude();
        if max_dist < consts::EPSILON {
            return false;
        }
        let ray = Ray::new(point![from.x, from.y], direction / max_dist);
        let filter = QueryFilter::default()
            .exclude_sensors()
            .groups(InteractionGroups::new(GROUP_CHARACTERS, blocking));
        self.query_pipeline
            .cast_ray(
                &self.rigid_body_set,
                &self.collider_set,
                &ray,
                max_dist,
                true,
                filter,
            )
            .is_some()
    }

    /// Resolves a touch position to a character. Runs an AABB query with
    /// the activation offset as half-extents, then keeps the first
    /// character whose collision circle actually contains the point.
    pub fn character_at_point(&self, point: Point2<f32>, half_extent: f32) -> Option<usize> {
        let shape = Cuboid::new(vector![half_extent, half_extent]);
        let shape_pos = Isometry::translation(point.x, point.y);
        let filter =
            QueryFilter::default().groups(InteractionGroups::new(Group::ALL, GROUP_CHARACTERS));

        let mut found = None;
        self.query_pipeline.intersections_with_shape(
            &self.rigid_body_set,
            &self.collider_set,
            &shape_pos,
            &shape,
            filter,
            |collider_handle| {
                let Some(BodyTag::Character { slot }) = self.collider_tags.get(&collider_handle)
                else {
                    return true;
                };
                let Some(collider) = self.collider_set.get(collider_handle) else {
                    return true;
                };
                let center = collider.translation();
                let radius = collider
                    .shape()
                    .as_ball()
                    .map(|b| b.radius)
                    .unwrap_or(character_consts::RADIUS);
                let delta = Vector2::new(point.x - center.x, point.y - center.y);
                if delta.magnitude() <= radius {
                    found = Some(*slot);
                    false
                } else {
                    true
                }
            },
        );
        found
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}
