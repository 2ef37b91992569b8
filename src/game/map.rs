//! Level map documents parsed from JSON: wall geometry per layer, named
//! regions (doors, buttons, spawns), per-capability walkable grids, and
//! the shared destructible tile layer.

use std::collections::HashMap;
use std::path::Path;

use nalgebra::{Point2, Vector2};
use serde::Deserialize;

use super::nav::WalkableGrid;
use super::player::Capability;

/// Axis-aligned rectangle in world units, anchored at its lower-left
/// corner. Tile-aligned rects use integer coordinates and sizes.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn center(&self) -> Point2<f32> {
        Point2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }

    pub fn half_extents(&self) -> Vector2<f32> {
        Vector2::new(self.w / 2.0, self.h / 2.0)
    }

    /// Grid cells the rectangle overlaps, row by row.
    pub fn covered_cells(&self) -> Vec<(i64, i64)> {
        let x0 = self.x.floor() as i64;
        let y0 = self.y.floor() as i64;
        let x1 = (self.x + self.w).ceil() as i64;
        let y1 = (self.y + self.h).ceil() as i64;
        let mut cells = Vec::new();
        for y in y0..y1 {
            for x in x0..x1 {
                cells.push((x, y));
            }
        }
        cells
    }
}

/// A rectangle with a region name, e.g. `red_door_1` or a spawn's
/// capability name.
#[derive(Debug, Clone, Deserialize)]
pub struct NamedRect {
    pub name: String,
    #[serde(flatten)]
    pub rect: Rect,
}

/// The color part of a door or button name: everything before the first
/// underscore, or the whole name when there is none.
pub fn color_prefix(name: &str) -> &str {
    match name.find('_') {
        Some(i) => &name[..i],
        None => name,
    }
}

/// One level's map document.
///
/// `nav` maps a capability name to rows of `#` (blocked) and `.`
/// (walkable). Rows are written top row first so the JSON reads like the
/// level; row `i` covers world `y = height - 1 - i`.
#[derive(Debug, Clone, Deserialize)]
pub struct MapData {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub walls: Vec<Rect>,
    #[serde(default)]
    pub water_walls: Vec<Rect>,
    #[serde(default)]
    pub climb_walls: Vec<Rect>,
    #[serde(default)]
    pub strong_walls: Vec<Rect>,
    #[serde(default)]
    pub goals: Vec<Rect>,
    #[serde(default)]
    pub doors: Vec<NamedRect>,
    #[serde(default)]
    pub buttons: Vec<NamedRect>,
    #[serde(default)]
    pub spawns: Vec<NamedRect>,
    #[serde(default)]
    pub nav: HashMap<String, Vec<String>>,
}

impl MapData {
    /// Load and validate a map from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, MapError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MapError::IoError(path.to_path_buf(), e))?;
        Self::from_json(&content)
    }

    /// Parse and validate a map from a JSON string
    pub fn from_json(source: &str) -> Result<Self, MapError> {
        let map: MapData = serde_json::from_str(source).map_err(MapError::ParseError)?;
        map.validate()?;
        Ok(map)
    }

    /// Structural checks: positive dimensions, every nav layer shaped
    /// `height` rows of `width` cells with only `#`/`.`, a nav layer and a
    /// spawn for each capability. Extra spawn regions are allowed; extra
    /// nav layers are not, since each one would silently cost a graph.
    fn validate(&self) -> Result<(), MapError> {
        if self.width == 0 || self.height == 0 {
            return Err(MapError::Validation(format!(
                "map dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }

        for (name, rows) in &self.nav {
            if Capability::from_name(name).is_none() {
                return Err(MapError::Validation(format!("unknown nav layer '{name}'")));
            }
            if rows.len() != self.height as usize {
                return Err(MapError::Validation(format!(
                    "nav layer '{name}' has {} rows, expected {}",
                    rows.len(),
                    self.height
                )));
            }
            for (i, row) in rows.iter().enumerate() {
                if row.chars().count() != self.width as usize {
                    return Err(MapError::Validation(format!(
                        "nav layer '{name}' row {i} has {} cells, expected {}",
                        row.chars().count(),
                        self.width
                    )));
                }
                if let Some(bad) = row.chars().find(|c| *c != '#' && *c != '.') {
                    return Err(MapError::Validation(format!(
                        "nav layer '{name}' row {i} contains '{bad}', only '#' and '.' are allowed"
                    )));
                }
            }
        }

        for capability in Capability::ALL {
            if !self.nav.contains_key(capability.name()) {
                return Err(MapError::Validation(format!(
                    "missing nav layer '{}'",
                    capability.name()
                )));
            }
            if !self.spawns.iter().any(|s| s.name == capability.name()) {
                return Err(MapError::Validation(format!(
                    "missing spawn '{}'",
                    capability.name()
                )));
            }
        }

        Ok(())
    }

    /// Spawn position for a capability, at the spawn region's center.
    pub fn spawn(&self, capability: Capability) -> Option<Point2<f32>> {
        self.spawns
            .iter()
            .find(|s| s.name == capability.name())
            .map(|s| s.rect.center())
    }

    /// Walkable grid for a capability's nav layer.
    pub fn walkable_grid(&self, capability: Capability) -> Option<WalkableGrid> {
        let rows = self.nav.get(capability.name())?;
        let mut cells = vec![false; (self.width * self.height) as usize];
        for (i, row) in rows.iter().enumerate() {
            let y = self.height as usize - 1 - i;
            for (x, c) in row.chars().enumerate() {
                cells[y * self.width as usize + x] = c == '.';
            }
        }
        Some(WalkableGrid::new(self.width, self.height, cells))
    }
}

/// Errors that can occur when loading a map
#[derive(Debug)]
pub enum MapError {
    IoError(std::path::PathBuf, std::io::Error),
    ParseError(serde_json::Error),
    Validation(String),
}

impl std::fmt::Display for MapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MapError::IoError(path, e) => {
                write!(f, "Failed to read {}: {}", path.display(), e)
            }
            MapError::ParseError(e) => write!(f, "Failed to parse map: {e}"),
            MapError::Validation(msg) => write!(f, "Invalid map: {msg}"),
        }
    }
}

impl std::error::Error for MapError {}

/// Shared destructible tile layer. A set cell marks a removable tile
/// (strong wall, door or button) still present there; contact effects
/// clear cells as bodies are broken or opened.
#[derive(Debug, Clone)]
pub struct TileGrid {
    width: u32,
    height: u32,
    cells: Vec<bool>,
}

impl TileGrid {
    pub fn from_map(map: &MapData) -> Self {
        let mut grid = Self {
            width: map.width,
            height: map.height,
            cells: vec![false; (map.width * map.height) as usize],
        };
        for rect in &map.strong_walls {
            grid.stamp(rect);
        }
        for door in &map.doors {
            grid.stamp(&door.rect);
        }
        for button in &map.buttons {
            grid.stamp(&button.rect);
        }
        grid
    }

    fn stamp(&mut self, rect: &Rect) {
        for (x, y) in rect.covered_cells() {
            if self.in_bounds(x, y) {
                self.cells[(y as u32 * self.width + x as u32) as usize] = true;
            }
        }
    }

    fn in_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && x < self.width as i64 && y < self.height as i64
    }

    pub fn is_set(&self, x: i64, y: i64) -> bool {
        self.in_bounds(x, y) && self.cells[(y as u32 * self.width + x as u32) as usize]
    }

    /// Clears the tile at a cell. Returns whether a tile was present;
    /// out-of-bounds cells report `false`.
    pub fn clear_cell(&mut self, x: i64, y: i64) -> bool {
        if !self.is_set(x, y) {
            return false;
        }
        self.cells[(y as u32 * self.width + x as u32) as usize] = false;
        true
    }

    pub fn set_count(&self) -> usize {
        self.cells.iter().filter(|c| **c).count()
    }
}
