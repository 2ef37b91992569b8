//! Contact-driven level rules: goal occupancy, strong-wall breaking,
//! buttons opening doors, and the deferred body-deletion queue.
//!
//! Resolution never aborts a simulation step. Pairings with no rule fall
//! through a default match arm, and bodies are only ever removed through
//! the deferred queue, outside contact handling.

use std::collections::HashMap;

use rapier2d::prelude::{ColliderHandle, RigidBodyHandle};

use super::contact_events::ContactTransitions;
use super::map::{color_prefix, TileGrid};
use super::physics::{BodyTag, PhysicsWorld};
use super::player::Character;

/// Receives the level's defining moments. The level owner (demo binary,
/// tests, an embedding UI) injects an implementation.
pub trait LevelEventSink {
    /// Enough characters overlap the goal at once. `score` is the elapsed
    /// play time rounded up to whole seconds.
    fn goal_reached(&mut self, score: u32);
    /// A button was pressed and its doors queued for removal.
    fn button_pressed(&mut self, name: &str);
    /// A touch selected a character as the active one.
    fn character_chosen(&mut self, slot: usize);
}

/// Mutable level rule state outside the physics world: goal occupancy,
/// door registry, and bodies awaiting deletion.
#[derive(Debug)]
pub struct LevelState {
    players_in_goal: u32,
    required_in_goal: u32,
    complete: bool,
    door_bodies: HashMap<String, Vec<RigidBodyHandle>>,
    pending_deletions: Vec<RigidBodyHandle>,
}

impl LevelState {
    pub fn new(required_in_goal: u32) -> Self {
        Self {
            players_in_goal: 0,
            required_in_goal,
            complete: false,
            door_bodies: HashMap::new(),
            pending_deletions: Vec::new(),
        }
    }

    /// Registers a door body under its color group.
    pub fn register_door(&mut self, color: &str, body: RigidBodyHandle) {
        self.door_bodies.entry(color.to_string()).or_default().push(body);
    }

    pub fn players_in_goal(&self) -> u32 {
        self.players_in_goal
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Queues a body for removal at the next deletion flush. Duplicate
    /// enqueues of the same body are dropped here, so a body deletes at
    /// most once no matter how many contacts asked for it.
    pub fn enqueue_deletion(&mut self, body: RigidBodyHandle) {
        if !self.pending_deletions.contains(&body) {
            self.pending_deletions.push(body);
        }
    }

    pub fn pending_deletion_count(&self) -> usize {
        self.pending_deletions.len()
    }

    /// Drains the deletion queue, most recently enqueued first.
    pub fn take_pending_deletions(&mut self) -> Vec<RigidBodyHandle> {
        let mut drained = std::mem::take(&mut self.pending_deletions);
        drained.reverse();
        drained
    }
}

/// Applies one batch of contact transitions to the level state. Each pair
/// is resolved from both orientations, so character-character contacts
/// update both sides.
#[allow(clippy::too_many_arguments)]
pub fn resolve_transitions(
    world: &mut PhysicsWorld,
    transitions: &ContactTransitions,
    characters: &mut [Character],
    state: &mut LevelState,
    tiles: &mut TileGrid,
    score: u32,
    sink: &mut dyn LevelEventSink,
) {
    for &(a, b) in &transitions.began {
        begin_for_character(world, a, b, characters, state, tiles, score, sink);
        begin_for_character(world, b, a, characters, state, tiles, score, sink);
    }
    for &(a, b) in &transitions.ended {
        end_for_character(world, a, b, characters, state);
        end_for_character(world, b, a, characters, state);
    }
}

#[allow(clippy::too_many_arguments)]
fn begin_for_character(
    world: &mut PhysicsWorld,
    subject: ColliderHandle,
    other: ColliderHandle,
    characters: &mut [Character],
    state: &mut LevelState,
    tiles: &mut TileGrid,
    score: u32,
    sink: &mut dyn LevelEventSink,
) {
    let Some(BodyTag::Character { slot }) = world.tag(subject).cloned() else {
        return;
    };
    let other_tag = world.tag(other).cloned();
    let Some(character) = characters.get_mut(slot) else {
        return;
    };

    if other_tag.is_some() {
        character.set_in_contact(true);
    }

    match other_tag {
        Some(BodyTag::Goal) => {
            state.players_in_goal += 1;
            if state.players_in_goal >= state.required_in_goal && !state.complete {
                state.complete = true;
                log::info!(
                    "all {} characters in the goal, finished with score {score}",
                    state.required_in_goal
                );
                sink.goal_reached(score);
            }
        }
        Some(BodyTag::StrongWall) if character.capability().breaks_strong_walls() => {
            if let Some(body) = world.body_of(other) {
                clear_tile_under(world, tiles, body);
                state.enqueue_deletion(body);
            }
        }
        Some(BodyTag::Button { name }) => {
            press_button(world, &name, state, tiles);
            if let Some(body) = world.body_of(other) {
                clear_tile_under(world, tiles, body);
                state.enqueue_deletion(body);
            }
            character.stop(world);
            sink.button_pressed(&name);
        }
        _ => {}
    }
}

fn end_for_character(
    world: &mut PhysicsWorld,
    subject: ColliderHandle,
    other: ColliderHandle,
    characters: &mut [Character],
    state: &mut LevelState,
) {
    let Some(BodyTag::Character { slot }) = world.tag(subject).cloned() else {
        return;
    };
    let Some(character) = characters.get_mut(slot) else {
        return;
    };

    // The other collider may already be gone when this contact ended
    // through a deferred deletion; the flag clears regardless.
    character.set_in_contact(false);

    if matches!(world.tag(other), Some(BodyTag::Goal)) {
        state.players_in_goal = state.players_in_goal.saturating_sub(1);
    }
}

/// Queues every door of the button's color for removal and clears their
/// tiles. Re-presses are harmless: enqueues dedup and cleared tiles stay
/// cleared.
fn press_button(world: &PhysicsWorld, name: &str, state: &mut LevelState, tiles: &mut TileGrid) {
    let color = color_prefix(name);
    let Some(doors) = state.door_bodies.get(color) else {
        log::warn!("button '{name}' has no doors registered for color '{color}'");
        return;
    };
    let doors = doors.clone();
    log::debug!("button '{name}' opens {} door bodies", doors.len());
    for door in doors {
        clear_tile_under(world, tiles, door);
        state.enqueue_deletion(door);
    }
}

/// Clears the destructible tile at the body's cell.
fn clear_tile_under(world: &PhysicsWorld, tiles: &mut TileGrid, body: RigidBodyHandle) {
    if let Some(position) = world.position(body) {
        tiles.clear_cell(position.x.floor() as i64, position.y.floor() as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::character as character_consts;
    use crate::game::map::MapData;
    use crate::game::physics::{
        GROUP_BUTTONS, GROUP_DOORS, GROUP_GOAL, GROUP_STRONG_WALLS, GROUP_WALLS,
    };
    use crate::game::player::Capability;
    use nalgebra::{Point2, Vector2};

    #[derive(Default)]
    struct RecordingSink {
        goals: Vec<u32>,
        buttons: Vec<String>,
        chosen: Vec<usize>,
    }

    impl LevelEventSink for RecordingSink {
        fn goal_reached(&mut self, score: u32) {
            self.goals.push(score);
        }
        fn button_pressed(&mut self, name: &str) {
            self.buttons.push(name.to_string());
        }
        fn character_chosen(&mut self, slot: usize) {
            self.chosen.push(slot);
        }
    }

    fn collider_of(world: &PhysicsWorld, body: RigidBodyHandle) -> ColliderHandle {
        world.rigid_body_set.get(body).expect("body exists").colliders()[0]
    }

    fn spawn_characters(world: &mut PhysicsWorld, count: usize) -> Vec<Character> {
        (0..count)
            .map(|slot| {
                let capability = Capability::ALL[slot % 3];
                let body = world.add_character(
                    slot,
                    Point2::new(10.0 + slot as f32, 10.0),
                    character_consts::RADIUS,
                    capability.collision_filter(),
                );
                Character::new(capability, body)
            })
            .collect()
    }

    fn empty_tiles() -> TileGrid {
        let map = MapData::from_json(
            r#"{
                "width": 8, "height": 8,
                "spawns": [
                    {"name": "water", "x": 0, "y": 0, "w": 1, "h": 1},
                    {"name": "climb", "x": 1, "y": 0, "w": 1, "h": 1},
                    {"name": "strong", "x": 2, "y": 0, "w": 1, "h": 1}
                ],
                "nav": {
                    "water": ["........","........","........","........","........","........","........","........"],
                    "climb": ["........","........","........","........","........","........","........","........"],
                    "strong": ["........","........","........","........","........","........","........","........"]
                }
            }"#,
        )
        .expect("valid map");
        TileGrid::from_map(&map)
    }

    fn begins(pairs: &[(ColliderHandle, ColliderHandle)]) -> ContactTransitions {
        ContactTransitions {
            began: pairs.to_vec(),
            ended: Vec::new(),
        }
    }

    fn ends(pairs: &[(ColliderHandle, ColliderHandle)]) -> ContactTransitions {
        ContactTransitions {
            began: Vec::new(),
            ended: pairs.to_vec(),
        }
    }

    #[test]
    fn test_three_goal_entries_fire_level_complete_once() {
        let mut world = PhysicsWorld::new();
        let goal = world.add_static_rect(
            Point2::new(4.5, 4.5),
            Vector2::new(0.5, 0.5),
            GROUP_GOAL,
            true,
            BodyTag::Goal,
        );
        let goal_c = collider_of(&world, goal);
        let mut characters = spawn_characters(&mut world, 3);
        let colliders: Vec<_> = characters
            .iter()
            .map(|c| collider_of(&world, c.body()))
            .collect();
        let mut state = LevelState::new(3);
        let mut tiles = empty_tiles();
        let mut sink = RecordingSink::default();

        for &c in &colliders {
            resolve_transitions(
                &mut world,
                &begins(&[(c, goal_c)]),
                &mut characters,
                &mut state,
                &mut tiles,
                7,
                &mut sink,
            );
        }

        assert_eq!(state.players_in_goal(), 3);
        assert!(state.is_complete());
        assert_eq!(sink.goals, vec![7], "completion must fire exactly once");

        // Leaving and re-entering after the latch changes nothing.
        resolve_transitions(
            &mut world,
            &ends(&[(colliders[0], goal_c)]),
            &mut characters,
            &mut state,
            &mut tiles,
            9,
            &mut sink,
        );
        resolve_transitions(
            &mut world,
            &begins(&[(colliders[0], goal_c)]),
            &mut characters,
            &mut state,
            &mut tiles,
            9,
            &mut sink,
        );
        assert_eq!(sink.goals, vec![7]);
    }

    #[test]
    fn test_goal_exit_delays_completion() {
        let mut world = PhysicsWorld::new();
        let goal = world.add_static_rect(
            Point2::new(4.5, 4.5),
            Vector2::new(0.5, 0.5),
            GROUP_GOAL,
            true,
            BodyTag::Goal,
        );
        let goal_c = collider_of(&world, goal);
        let mut characters = spawn_characters(&mut world, 3);
        let colliders: Vec<_> = characters
            .iter()
            .map(|c| collider_of(&world, c.body()))
            .collect();
        let mut state = LevelState::new(3);
        let mut tiles = empty_tiles();
        let mut sink = RecordingSink::default();

        let script = [
            (colliders[0], true),
            (colliders[1], true),
            (colliders[0], false),
            (colliders[2], true),
            (colliders[0], true),
        ];
        for (collider, is_begin) in script {
            let pair = [(collider, goal_c)];
            let transitions = if is_begin { begins(&pair) } else { ends(&pair) };
            resolve_transitions(
                &mut world,
                &transitions,
                &mut characters,
                &mut state,
                &mut tiles,
                3,
                &mut sink,
            );
        }

        assert_eq!(state.players_in_goal(), 3);
        assert_eq!(
            sink.goals,
            vec![3],
            "completion waits until occupancy is back at the threshold"
        );
    }

    #[test]
    fn test_only_strong_characters_break_strong_walls() {
        let mut world = PhysicsWorld::new();
        let wall = world.add_static_rect(
            Point2::new(2.5, 1.5),
            Vector2::new(0.5, 0.5),
            GROUP_STRONG_WALLS,
            false,
            BodyTag::StrongWall,
        );
        let wall_c = collider_of(&world, wall);
        let mut characters = spawn_characters(&mut world, 3);
        let colliders: Vec<_> = characters
            .iter()
            .map(|c| collider_of(&world, c.body()))
            .collect();
        let mut state = LevelState::new(3);
        let mut tiles = empty_tiles();
        let mut sink = RecordingSink::default();

        // Slot 0 is the water character.
        resolve_transitions(
            &mut world,
            &begins(&[(colliders[0], wall_c)]),
            &mut characters,
            &mut state,
            &mut tiles,
            0,
            &mut sink,
        );
        assert_eq!(state.pending_deletion_count(), 0);
        assert!(characters[0].is_in_contact());

        // Slot 2 is the strong character.
        resolve_transitions(
            &mut world,
            &begins(&[(wall_c, colliders[2])]),
            &mut characters,
            &mut state,
            &mut tiles,
            0,
            &mut sink,
        );
        assert_eq!(state.pending_deletion_count(), 1);
    }

    #[test]
    fn test_button_opens_all_doors_of_its_color_once() {
        let mut world = PhysicsWorld::new();
        let door_a = world.add_static_rect(
            Point2::new(1.5, 3.5),
            Vector2::new(0.5, 0.5),
            GROUP_DOORS,
            false,
            BodyTag::Door { color: "red".to_string() },
        );
        let door_b = world.add_static_rect(
            Point2::new(2.5, 3.5),
            Vector2::new(0.5, 0.5),
            GROUP_DOORS,
            false,
            BodyTag::Door { color: "red".to_string() },
        );
        let button = world.add_static_rect(
            Point2::new(5.5, 1.5),
            Vector2::new(0.5, 0.5),
            GROUP_BUTTONS,
            false,
            BodyTag::Button { name: "red_button_1".to_string() },
        );
        let button_c = collider_of(&world, button);
        let mut characters = spawn_characters(&mut world, 2);
        let colliders: Vec<_> = characters
            .iter()
            .map(|c| collider_of(&world, c.body()))
            .collect();
        characters[0].set_path(vec![Point2::new(5.5, 1.5)]);

        let mut state = LevelState::new(3);
        state.register_door("red", door_a);
        state.register_door("red", door_b);
        let mut tiles = empty_tiles();
        let mut sink = RecordingSink::default();

        // Two characters hit the button in the same batch, before any
        // deletion flush runs.
        resolve_transitions(
            &mut world,
            &begins(&[(colliders[0], button_c), (colliders[1], button_c)]),
            &mut characters,
            &mut state,
            &mut tiles,
            0,
            &mut sink,
        );

        assert_eq!(
            state.pending_deletion_count(),
            3,
            "two doors and the button, each exactly once"
        );
        assert!(!characters[0].is_moving(), "pressing stops the path");
        assert_eq!(sink.buttons[0], "red_button_1");

        let drained = state.take_pending_deletions();
        assert_eq!(drained.len(), 3);
        assert_eq!(state.pending_deletion_count(), 0);
    }

    #[test]
    fn test_deletion_queue_drains_most_recent_first() {
        let mut world = PhysicsWorld::new();
        let first = world.add_static_rect(
            Point2::new(0.5, 0.5),
            Vector2::new(0.5, 0.5),
            GROUP_WALLS,
            false,
            BodyTag::Wall,
        );
        let second = world.add_static_rect(
            Point2::new(1.5, 0.5),
            Vector2::new(0.5, 0.5),
            GROUP_WALLS,
            false,
            BodyTag::Wall,
        );
        let mut state = LevelState::new(3);
        state.enqueue_deletion(first);
        state.enqueue_deletion(second);
        state.enqueue_deletion(first);

        assert_eq!(state.take_pending_deletions(), vec![second, first]);
    }

    #[test]
    fn test_unmatched_pairs_are_no_ops() {
        let mut world = PhysicsWorld::new();
        let wall = world.add_static_rect(
            Point2::new(0.5, 0.5),
            Vector2::new(0.5, 0.5),
            GROUP_WALLS,
            false,
            BodyTag::Wall,
        );
        let goal = world.add_static_rect(
            Point2::new(4.5, 4.5),
            Vector2::new(0.5, 0.5),
            GROUP_GOAL,
            true,
            BodyTag::Goal,
        );
        let wall_c = collider_of(&world, wall);
        let goal_c = collider_of(&world, goal);
        let mut characters = spawn_characters(&mut world, 2);
        let char_c: Vec<_> = characters
            .iter()
            .map(|c| collider_of(&world, c.body()))
            .collect();
        let mut state = LevelState::new(3);
        let mut tiles = empty_tiles();
        let mut sink = RecordingSink::default();

        // No character involved at all.
        resolve_transitions(
            &mut world,
            &begins(&[(wall_c, goal_c)]),
            &mut characters,
            &mut state,
            &mut tiles,
            0,
            &mut sink,
        );
        assert_eq!(state.players_in_goal(), 0);
        assert_eq!(state.pending_deletion_count(), 0);

        // Character against character only flips contact flags.
        resolve_transitions(
            &mut world,
            &begins(&[(char_c[0], char_c[1])]),
            &mut characters,
            &mut state,
            &mut tiles,
            0,
            &mut sink,
        );
        assert!(characters[0].is_in_contact());
        assert!(characters[1].is_in_contact());
        assert!(sink.goals.is_empty() && sink.buttons.is_empty() && sink.chosen.is_empty());
    }

    #[test]
    fn test_end_contact_clears_flag_after_other_body_removed() {
        let mut world = PhysicsWorld::new();
        let wall = world.add_static_rect(
            Point2::new(1.5, 0.5),
            Vector2::new(0.5, 0.5),
            GROUP_WALLS,
            false,
            BodyTag::Wall,
        );
        let wall_c = collider_of(&world, wall);
        let mut characters = spawn_characters(&mut world, 1);
        let char_c = collider_of(&world, characters[0].body());
        let mut state = LevelState::new(3);
        let mut tiles = empty_tiles();
        let mut sink = RecordingSink::default();

        resolve_transitions(
            &mut world,
            &begins(&[(char_c, wall_c)]),
            &mut characters,
            &mut state,
            &mut tiles,
            0,
            &mut sink,
        );
        assert!(characters[0].is_in_contact());

        assert!(world.remove_body(wall));
        resolve_transitions(
            &mut world,
            &ends(&[(char_c, wall_c)]),
            &mut characters,
            &mut state,
            &mut tiles,
            0,
            &mut sink,
        );
        assert!(!characters[0].is_in_contact());
    }
}
