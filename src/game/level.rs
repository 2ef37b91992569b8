//! A level session: the physics world, per-capability nav graphs, three
//! characters, and the two per-frame entry points (`update` for game
//! logic, `do_physics_step` for the fixed-timestep simulation).

use std::collections::HashMap;

use crossbeam_channel::{Receiver, Sender};
use nalgebra::{Point2, Vector2};

use crate::config::Tuning;

use super::constants::level as level_consts;
use super::contact::{resolve_transitions, LevelEventSink, LevelState};
use super::contact_events::collect_transitions;
use super::map::{color_prefix, MapData, Rect, TileGrid};
use super::nav::NavGraph;
use super::pathfinding;
use super::physics::{
    BodyTag, PhysicsWorld, GROUP_BUTTONS, GROUP_CLIMB_WALLS, GROUP_DOORS, GROUP_GOAL,
    GROUP_STRONG_WALLS, GROUP_WALLS, GROUP_WATER_WALLS,
};
use super::player::{Capability, Character};
use super::smoothing;
use super::stepper::FixedStepper;

/// A tap forwarded into the level from outside the frame loop.
#[derive(Debug, Clone, Copy)]
pub struct TouchCommand {
    pub position: Point2<f32>,
}

/// Session outcome latch. `Complete` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelStatus {
    Running,
    Complete,
}

/// Errors that can occur when building a level from a map
#[derive(Debug)]
pub enum LevelError {
    MissingNavLayer(&'static str),
    MissingSpawn(&'static str),
    SpawnOutOfBounds(&'static str),
}

impl std::fmt::Display for LevelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LevelError::MissingNavLayer(name) => write!(f, "Missing nav layer '{name}'"),
            LevelError::MissingSpawn(name) => write!(f, "Missing spawn '{name}'"),
            LevelError::SpawnOutOfBounds(name) => {
                write!(f, "Spawn '{name}' lies outside the map")
            }
        }
    }
}

impl std::error::Error for LevelError {}

pub struct Level {
    world: PhysicsWorld,
    graphs: HashMap<Capability, NavGraph>,
    characters: Vec<Character>,
    state: LevelState,
    tiles: TileGrid,
    stepper: FixedStepper,
    tuning: Tuning,
    status: LevelStatus,
    active_character: Option<usize>,
    time_since_last_path: f32,
    score_elapsed: f32,
    touch_tx: Sender<TouchCommand>,
    touch_rx: Receiver<TouchCommand>,
    sink: Box<dyn LevelEventSink>,
}

impl std::fmt::Debug for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Level")
            .field("status", &self.status)
            .field("characters", &self.characters)
            .field("active_character", &self.active_character)
            .field("score_elapsed", &self.score_elapsed)
            .finish_non_exhaustive()
    }
}

impl Level {
    /// Builds the physics world, nav graphs and characters for a map.
    /// The map is expected to be validated; a hand-built `MapData` that
    /// skips a nav layer or spawn fails here instead.
    pub fn new(
        map: MapData,
        tuning: Tuning,
        sink: Box<dyn LevelEventSink>,
    ) -> Result<Level, LevelError> {
        let mut world = PhysicsWorld::new();
        let mut state = LevelState::new(tuning.required_in_goal);

        for rect in &map.walls {
            world.add_static_rect(
                rect.center(),
                rect.half_extents(),
                GROUP_WALLS,
                false,
                BodyTag::Wall,
            );
        }
        for rect in &map.water_walls {
            world.add_static_rect(
                rect.center(),
                rect.half_extents(),
                GROUP_WATER_WALLS,
                false,
                BodyTag::WaterWall,
            );
        }
        for rect in &map.climb_walls {
            world.add_static_rect(
                rect.center(),
                rect.half_extents(),
                GROUP_CLIMB_WALLS,
                false,
                BodyTag::ClimbWall,
            );
        }
        for rect in &map.goals {
            world.add_static_rect(
                rect.center(),
                rect.half_extents(),
                GROUP_GOAL,
                true,
                BodyTag::Goal,
            );
        }

        // Destructible layers get one body per tile so each cell breaks
        // or opens on its own.
        for rect in &map.strong_walls {
            for center in tile_centers(rect) {
                world.add_static_rect(
                    center,
                    Vector2::new(0.5, 0.5),
                    GROUP_STRONG_WALLS,
                    false,
                    BodyTag::StrongWall,
                );
            }
        }
        for door in &map.doors {
            let color = color_prefix(&door.name);
            for center in tile_centers(&door.rect) {
                let body = world.add_static_rect(
                    center,
                    Vector2::new(0.5, 0.5),
                    GROUP_DOORS,
                    false,
                    BodyTag::Door {
                        color: color.to_string(),
                    },
                );
                state.register_door(color, body);
            }
        }
        for button in &map.buttons {
            for center in tile_centers(&button.rect) {
                world.add_static_rect(
                    center,
                    Vector2::new(0.5, 0.5),
                    GROUP_BUTTONS,
                    false,
                    BodyTag::Button {
                        name: button.name.clone(),
                    },
                );
            }
        }

        let mut graphs = HashMap::new();
        for capability in Capability::ALL {
            let grid = map
                .walkable_grid(capability)
                .ok_or(LevelError::MissingNavLayer(capability.name()))?;
            let graph = NavGraph::build(&grid);
            log::debug!(
                "{} nav graph: {} nodes",
                capability.name(),
                graph.node_count()
            );
            graphs.insert(capability, graph);
        }

        let mut characters = Vec::with_capacity(Capability::ALL.len());
        for (slot, capability) in Capability::ALL.into_iter().enumerate() {
            let spawn = map
                .spawn(capability)
                .ok_or(LevelError::MissingSpawn(capability.name()))?;
            if spawn.x < 0.0
                || spawn.y < 0.0
                || spawn.x > map.width as f32
                || spawn.y > map.height as f32
            {
                return Err(LevelError::SpawnOutOfBounds(capability.name()));
            }
            let body = world.add_character(
                slot,
                spawn,
                tuning.character_radius,
                capability.collision_filter(),
            );
            characters.push(Character::new(capability, body));
        }

        let tiles = TileGrid::from_map(&map);
        world.update_query_pipeline();
        log::info!(
            "level up: {}x{} map, {} bodies, {} destructible tiles",
            map.width,
            map.height,
            world.rigid_body_set.len(),
            tiles.set_count()
        );

        let (touch_tx, touch_rx) = crossbeam_channel::bounded(64);
        let stepper = FixedStepper::new(tuning.timestep, tuning.max_frame_time);
        Ok(Level {
            world,
            graphs,
            characters,
            state,
            tiles,
            stepper,
            tuning,
            status: LevelStatus::Running,
            active_character: None,
            time_since_last_path: 0.0,
            score_elapsed: 0.0,
            touch_tx,
            touch_rx,
            sink,
        })
    }

    /// Producer side of the touch queue. Clone freely; commands are
    /// drained at the top of the next `update`.
    pub fn input_sender(&self) -> Sender<TouchCommand> {
        self.touch_tx.clone()
    }

    /// Per-frame game logic: score timer, queued touches, and character
    /// movement. A no-op once the level is complete.
    pub fn update(&mut self, dt: f32) {
        if self.status != LevelStatus::Running {
            return;
        }

        self.score_elapsed += dt;
        if self.active_character.is_some() {
            self.time_since_last_path += dt;
        }

        let touches: Vec<TouchCommand> = self.touch_rx.try_iter().collect();
        for touch in touches {
            self.handle_touch(touch.position);
        }

        for character in &mut self.characters {
            character.update_movement(&mut self.world, dt, &self.tuning);
        }
    }

    /// Per-frame physics: flushes deferred deletions, then advances the
    /// world in fixed substeps, resolving contact transitions after each.
    pub fn do_physics_step(&mut self, frame_time: f32) {
        if self.status != LevelStatus::Running {
            return;
        }

        let pending = self.state.take_pending_deletions();
        if !pending.is_empty() {
            let mut removed = 0;
            for body in pending {
                if self.world.remove_body(body) {
                    removed += 1;
                }
            }
            log::debug!("deleted {removed} bodies");
            self.world.update_query_pipeline();
        }

        let substeps = self.stepper.advance(frame_time);
        for _ in 0..substeps {
            self.world.step(self.stepper.timestep());
            let transitions = collect_transitions(self.world.collision_events());
            if transitions.is_empty() {
                continue;
            }
            let score = self.score();
            resolve_transitions(
                &mut self.world,
                &transitions,
                &mut self.characters,
                &mut self.state,
                &mut self.tiles,
                score,
                self.sink.as_mut(),
            );
        }

        if self.state.is_complete() {
            log::info!("level complete, score {}", self.score());
            self.status = LevelStatus::Complete;
            for character in &mut self.characters {
                character.stop(&mut self.world);
            }
        }
    }

    /// Waypoint path for a capability between two world positions, already
    /// smoothed against the current geometry. Empty when no route exists.
    pub fn find_path(
        &self,
        capability: Capability,
        from: Point2<f32>,
        to: Point2<f32>,
    ) -> Vec<Point2<f32>> {
        let Some(graph) = self.graphs.get(&capability) else {
            return Vec::new();
        };
        let raw = pathfinding::find_waypoints(graph, from, to);
        if raw.is_empty() {
            return raw;
        }
        smoothing::smooth_path(
            &self.world,
            capability.blocking_groups(),
            self.tuning.path_smooth_side_offset,
            &raw,
        )
    }

    fn handle_touch(&mut self, position: Point2<f32>) {
        // Selection comes first: a touch on any character claims it and
        // consumes the touch without resetting the path cooldown.
        if let Some(slot) = self
            .world
            .character_at_point(position, self.tuning.activation_offset)
        {
            if self.active_character != Some(slot) {
                log::debug!(
                    "selected {} character",
                    self.characters[slot].capability()
                );
                self.active_character = Some(slot);
                self.sink.character_chosen(slot);
            }
            return;
        }

        let Some(slot) = self.active_character else {
            return;
        };
        if self.time_since_last_path
            < self.tuning.path_request_cooldown - level_consts::PATH_COOLDOWN_SLACK
        {
            return;
        }
        self.time_since_last_path = 0.0;

        let capability = self.characters[slot].capability();
        let Some(from) = self.world.position(self.characters[slot].body()) else {
            return;
        };
        let path = self.find_path(capability, from, position);
        if path.is_empty() {
            log::debug!(
                "no {} route from ({:.1}, {:.1}) to ({:.1}, {:.1})",
                capability,
                from.x,
                from.y,
                position.x,
                position.y
            );
            return;
        }
        self.characters[slot].set_path(path);
    }

    pub fn status(&self) -> LevelStatus {
        self.status
    }

    /// Elapsed play time rounded up to whole seconds.
    pub fn score(&self) -> u32 {
        self.score_elapsed.ceil() as u32
    }

    pub fn players_in_goal(&self) -> u32 {
        self.state.players_in_goal()
    }

    pub fn active_character(&self) -> Option<usize> {
        self.active_character
    }

    pub fn characters(&self) -> &[Character] {
        &self.characters
    }

    pub fn tiles(&self) -> &TileGrid {
        &self.tiles
    }

    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }
}

fn tile_centers(rect: &Rect) -> Vec<Point2<f32>> {
    rect.covered_cells()
        .into_iter()
        .map(|(x, y)| Point2::new(x as f32 + 0.5, y as f32 + 0.5))
        .collect()
}
