//! Per-capability navigation graphs built from the map's walkable-cell
//! layers. Nodes sit at cell centers and carry dense sequential indices so
//! search state can live in flat arrays.

use nalgebra::Point2;

/// Rectangular grid of walkable/blocked cells for one capability class.
#[derive(Debug, Clone)]
pub struct WalkableGrid {
    width: u32,
    height: u32,
    cells: Vec<bool>,
}

impl WalkableGrid {
    /// Build a grid from row-major cell flags. `cells` must hold exactly
    /// `width * height` entries, row `0` first.
    pub fn new(width: u32, height: u32, cells: Vec<bool>) -> Self {
        debug_assert_eq!(cells.len(), (width * height) as usize);
        Self {
            width,
            height,
            cells,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Out-of-bounds cells read as blocked.
    pub fn is_walkable(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
            return false;
        }
        self.cells[(y as u32 * self.width + x as u32) as usize]
    }

    pub fn walkable_count(&self) -> usize {
        self.cells.iter().filter(|c| **c).count()
    }
}

/// Graph vertex at a walkable cell center.
#[derive(Debug, Clone, Copy)]
pub struct Node {
    position: Point2<f32>,
    index: usize,
}

impl Node {
    pub fn position(&self) -> Point2<f32> {
        self.position
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

/// Directed connection between two nodes. Each adjacent pair is stored as
/// two independent edges, one per direction; costs happen to be symmetric
/// today but the directions stay free to diverge.
#[derive(Debug, Clone, Copy)]
pub struct Edge {
    from: usize,
    to: usize,
    cost: f32,
}

impl Edge {
    pub fn from(&self) -> usize {
        self.from
    }

    pub fn to(&self) -> usize {
        self.to
    }

    pub fn cost(&self) -> f32 {
        self.cost
    }
}

/// Navigation graph for one capability class. Owns every node and edge;
/// node indices are sequential insertion order, so `connections` is a
/// dense per-index table.
#[derive(Debug, Default)]
pub struct NavGraph {
    nodes: Vec<Node>,
    connections: Vec<Vec<Edge>>,
}

/// The 8 neighbor offsets checked during the connection sweep.
const NEIGHBOR_OFFSETS: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

impl NavGraph {
    /// Build the graph for a walkable grid: one node per walkable cell at
    /// `(x + 0.5, y + 0.5)`, then a full sweep connecting every node to
    /// its 8 neighbors. The sweep visits each ordered pair once, so both
    /// directions of every adjacency end up with their own edge.
    pub fn build(grid: &WalkableGrid) -> Self {
        let mut graph = NavGraph::default();
        let mut cell_nodes: Vec<Option<usize>> =
            vec![None; (grid.width() * grid.height()) as usize];

        for x in 0..grid.width() {
            for y in 0..grid.height() {
                if !grid.is_walkable(x as i64, y as i64) {
                    continue;
                }
                let index = graph.add_node(Point2::new(x as f32 + 0.5, y as f32 + 0.5));
                cell_nodes[(y * grid.width() + x) as usize] = Some(index);
            }
        }

        for x in 0..grid.width() as i64 {
            for y in 0..grid.height() as i64 {
                let Some(from) = cell_nodes[(y as u32 * grid.width() + x as u32) as usize]
                else {
                    continue;
                };
                for (dx, dy) in NEIGHBOR_OFFSETS {
                    let (nx, ny) = (x + dx, y + dy);
                    if !grid.is_walkable(nx, ny) {
                        continue;
                    }
                    if let Some(to) = cell_nodes[(ny as u32 * grid.width() + nx as u32) as usize]
                    {
                        graph.connect(from, to);
                    }
                }
            }
        }

        graph
    }

    fn add_node(&mut self, position: Point2<f32>) -> usize {
        let index = self.nodes.len();
        self.nodes.push(Node { position, index });
        self.connections.push(Vec::new());
        index
    }

    fn connect(&mut self, from: usize, to: usize) {
        let cost = nalgebra::distance(&self.nodes[from].position, &self.nodes[to].position);
        self.connections[from].push(Edge { from, to, cost });
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, index: usize) -> &Node {
        &self.nodes[index]
    }

    /// Outgoing edges of a node; empty for isolated nodes, never missing.
    pub fn connections(&self, index: usize) -> &[Edge] {
        &self.connections[index]
    }

    /// Nearest node to a world position by linear scan. Small per-level
    /// node counts make a spatial index unnecessary; ties keep the
    /// first-encountered node in insertion order.
    pub fn nearest_node(&self, position: Point2<f32>) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for node in &self.nodes {
            let d = nalgebra::distance_squared(&node.position, &position);
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((node.index, d));
            }
        }
        best.map(|(index, _)| index)
    }
}
