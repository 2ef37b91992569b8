//! Mazebound demo runner - drives a level headless with scripted touches

use clap::Parser;
use nalgebra::Point2;
use std::path::PathBuf;
use std::process::ExitCode;

use mazebound::config::Tuning;
use mazebound::game::contact::LevelEventSink;
use mazebound::game::level::{Level, LevelStatus, TouchCommand};
use mazebound::game::map::MapData;

#[derive(Parser)]
#[command(name = "mazebound")]
#[command(about = "Headless tile-maze level runner", long_about = None)]
struct Cli {
    /// Path to a map JSON file (omit to run the built-in demo map)
    map: Option<PathBuf>,
    /// Path to a tuning TOML file
    #[arg(short, long)]
    tuning: Option<PathBuf>,
    /// Give up after this much simulated time, in seconds
    #[arg(long, default_value = "120.0")]
    max_seconds: f32,
}

/// 12x8 map exercising every layer: a water pond, a climbable fence, a
/// breakable block, and a red button opening the door by the goal.
const DEMO_MAP: &str = r#############"{
    "width": 12,
    "height": 8,
    "walls": [
        {"x": 0, "y": 0, "w": 12, "h": 1},
        {"x": 0, "y": 7, "w": 12, "h": 1},
        {"x": 0, "y": 1, "w": 1, "h": 6},
        {"x": 11, "y": 1, "w": 1, "h": 6}
    ],
    "water_walls": [{"x": 4, "y": 1, "w": 1, "h": 3}],
    "climb_walls": [{"x": 7, "y": 4, "w": 1, "h": 3}],
    "strong_walls": [{"x": 6, "y": 2, "w": 1, "h": 1}],
    "goals": [{"x": 9, "y": 5, "w": 2, "h": 2}],
    "doors": [{"name": "red_door_1", "x": 9, "y": 4, "w": 1, "h": 1}],
    "buttons": [{"name": "red_button_1", "x": 2, "y": 5, "w": 1, "h": 1}],
    "spawns": [
        {"name": "water", "x": 1, "y": 1, "w": 1, "h": 1},
        {"name": "climb", "x": 1, "y": 3, "w": 1, "h": 1},
        {"name": "strong", "x": 1, "y": 5, "w": 1, "h": 1}
    ],
    "nav": {
        "water": [
            "############",
            "#......#...#",
            "#......#...#",
            "#......#...#",
            "#..........#",
            "#.....#....#",
            "#..........#",
            "############"
        ],
        "climb": [
            "############",
            "#..........#",
            "#..........#",
            "#..........#",
            "#...#......#",
            "#...#.#....#",
            "#...#......#",
            "############"
        ],
        "strong": [
            "############",
            "#......#...#",
            "#......#...#",
            "#......#...#",
            "#...#......#",
            "#...#......#",
            "#...#......#",
            "############"
        ]
    }
}"#############;

struct LoggingSink;

impl LevelEventSink for LoggingSink {
    fn goal_reached(&mut self, score: u32) {
        log::info!("goal reached with score {score}");
    }

    fn button_pressed(&mut self, name: &str) {
        log::info!("button '{name}' pressed");
    }

    fn character_chosen(&mut self, slot: usize) {
        log::debug!("character {slot} selected");
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let map = match load_map(cli.map.as_deref()) {
        Ok(map) => map,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let tuning = match cli.tuning.as_deref() {
        Some(path) => match Tuning::from_file(path) {
            Ok(tuning) => tuning,
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::FAILURE;
            }
        },
        None => Tuning::default(),
    };

    let goal_cells: Vec<Point2<f32>> = map
        .goals
        .iter()
        .flat_map(|g| g.covered_cells())
        .map(|(x, y)| Point2::new(x as f32 + 0.5, y as f32 + 0.5))
        .collect();
    if goal_cells.is_empty() {
        eprintln!("Invalid map: no goal region");
        return ExitCode::FAILURE;
    }

    let frame = tuning.timestep;
    let mut level = match Level::new(map.clone(), tuning, Box::new(LoggingSink)) {
        Ok(level) => level,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let elapsed = drive(&mut level, &map, &goal_cells, frame, cli.max_seconds);
    match level.status() {
        LevelStatus::Complete => {
            println!(
                "Level complete: score {} after {:.1}s simulated",
                level.score(),
                elapsed
            );
            ExitCode::SUCCESS
        }
        LevelStatus::Running => {
            println!("Gave up after {:.1}s simulated", elapsed);
            ExitCode::FAILURE
        }
    }
}

fn load_map(path: Option<&std::path::Path>) -> Result<MapData, mazebound::game::map::MapError> {
    match path {
        Some(path) => MapData::from_file(path),
        None => MapData::from_json(DEMO_MAP),
    }
}

/// Runs the frame loop, periodically selecting an idle character and
/// tapping its next target: an unpressed button first, that character's
/// own goal cell after. Returns the simulated seconds consumed.
fn drive(
    level: &mut Level,
    map: &MapData,
    goal_cells: &[Point2<f32>],
    frame: f32,
    max_seconds: f32,
) -> f32 {
    let sender = level.input_sender();
    let mut simulated = 0.0f32;
    let mut next_action = 0.0f32;
    let mut awaiting_command: Option<usize> = None;

    while level.status() == LevelStatus::Running && simulated < max_seconds {
        if simulated >= next_action {
            if let Some(slot) = awaiting_command.take() {
                // The selection's path cooldown has run out by now.
                let _ = sender.try_send(TouchCommand {
                    position: current_target(level, map, goal_cells, slot),
                });
                next_action = simulated + 0.3;
            } else if let Some(slot) = idle_character(level) {
                if let Some(position) = level.world().position(level.characters()[slot].body()) {
                    let _ = sender.try_send(TouchCommand { position });
                    awaiting_command = Some(slot);
                    next_action = simulated + 0.6;
                }
            }
        }

        level.update(frame);
        level.do_physics_step(frame);
        simulated += frame;
    }

    simulated
}

fn idle_character(level: &Level) -> Option<usize> {
    level.characters().iter().position(|c| !c.is_moving())
}

/// While any button tile is still present, characters head for it;
/// afterwards each heads for its own goal cell.
fn current_target(
    level: &Level,
    map: &MapData,
    goal_cells: &[Point2<f32>],
    slot: usize,
) -> Point2<f32> {
    for button in &map.buttons {
        let center = button.rect.center();
        if level
            .tiles()
            .is_set(center.x.floor() as i64, center.y.floor() as i64)
        {
            return center;
        }
    }
    goal_cells[slot % goal_cells.len()]
}
