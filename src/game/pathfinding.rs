//! Indexed A* over a [`NavGraph`](super::nav::NavGraph). Node indices are
//! dense, so search state lives in flat arrays instead of hash maps. The
//! heuristic is straight-line distance, which never overestimates on a
//! graph whose edge costs are exact Euclidean distances.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use nalgebra::Point2;

use super::nav::NavGraph;

/// f32 cost with a total order so it can key the open list.
#[derive(Debug, Clone, Copy, PartialEq)]
struct TotalCost(f32);

impl Eq for TotalCost {}

impl PartialOrd for TotalCost {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TotalCost {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Full waypoint query: snap both endpoints to their nearest nodes, run
/// A*, and bracket the snapped interior with the exact `from`/`to`
/// positions. The first snapped node is dropped in favor of `from` so the
/// path starts where the requester actually stands. Empty result means no
/// route (or an empty graph); that is a normal outcome, not an error.
pub fn find_waypoints(
    graph: &NavGraph,
    from: Point2<f32>,
    to: Point2<f32>,
) -> Vec<Point2<f32>> {
    let (Some(start), Some(goal)) = (graph.nearest_node(from), graph.nearest_node(to)) else {
        return Vec::new();
    };
    let route = find_node_route(graph, start, goal);
    if route.is_empty() {
        return Vec::new();
    }

    let mut waypoints = Vec::with_capacity(route.len() + 1);
    waypoints.push(from);
    for &index in &route[1..] {
        waypoints.push(graph.node(index).position());
    }
    waypoints.push(to);
    waypoints
}

/// A* between two node indices. Returns the node sequence including both
/// endpoints, or an empty vector when `goal` is unreachable.
pub fn find_node_route(graph: &NavGraph, start: usize, goal: usize) -> Vec<usize> {
    if graph.node_count() == 0 {
        return Vec::new();
    }

    let heuristic = |index: usize| -> f32 {
        nalgebra::distance(&graph.node(index).position(), &graph.node(goal).position())
    };

    let mut g_scores = vec![f32::INFINITY; graph.node_count()];
    let mut came_from: Vec<Option<usize>> = vec![None; graph.node_count()];
    let mut open = BinaryHeap::<(Reverse<TotalCost>, Reverse<TotalCost>, usize)>::new();

    g_scores[start] = 0.0;
    open.push((
        Reverse(TotalCost(heuristic(start))),
        Reverse(TotalCost(0.0)),
        start,
    ));

    while let Some((_f, Reverse(TotalCost(g)), index)) = open.pop() {
        if g > g_scores[index] {
            continue;
        }
        if index == goal {
            return reconstruct_route(&came_from, goal);
        }
        for edge in graph.connections(index) {
            let tentative = g + edge.cost();
            if tentative < g_scores[edge.to()] {
                g_scores[edge.to()] = tentative;
                came_from[edge.to()] = Some(index);
                open.push((
                    Reverse(TotalCost(tentative + heuristic(edge.to()))),
                    Reverse(TotalCost(tentative)),
                    edge.to(),
                ));
            }
        }
    }

    Vec::new()
}

fn reconstruct_route(came_from: &[Option<usize>], goal: usize) -> Vec<usize> {
    let mut route = vec![goal];
    let mut current = goal;
    while let Some(parent) = came_from[current] {
        route.push(parent);
        current = parent;
    }
    route.reverse();
    route
}
