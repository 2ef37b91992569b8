//! Greedy line-of-sight path smoothing. Raw A* paths hug cell centers
//! and zig-zag; this pass keeps only the waypoints needed to walk
//! straight lines that clear wall geometry with a corridor margin.

use nalgebra::{Point2, Vector2};
use rapier2d::prelude::Group;

use super::constants::physics as consts;
use super::physics::PhysicsWorld;

/// Reduce `waypoints` to the subsequence where every retained segment
/// passes the three-ray obstruction test. The first and last entries are
/// always kept verbatim. For each retained index `i` the scan walks
/// outward-in from the final waypoint and keeps the furthest visible
/// candidate; the immediate successor is accepted unconditionally since
/// raw segments connect adjacent walkable cells.
pub fn smooth_path(
    world: &PhysicsWorld,
    blocking: Group,
    side_offset: f32,
    waypoints: &[Point2<f32>],
) -> Vec<Point2<f32>> {
    if waypoints.len() <= 2 {
        return waypoints.to_vec();
    }

    let last = waypoints.len() - 1;
    let mut smoothed = Vec::with_capacity(waypoints.len());
    smoothed.push(waypoints[0]);

    let mut i = 0;
    while i < last {
        let mut chosen = i + 1;
        for j in ((i + 1)..=last).rev() {
            if j == i + 1 || segment_clear(world, blocking, side_offset, waypoints[i], waypoints[j])
            {
                chosen = j;
                break;
            }
        }
        smoothed.push(waypoints[chosen]);
        i = chosen;
    }

    smoothed
}

/// Obstruction test for one straight segment: the center line plus two
/// rays offset perpendicular to the travel direction must all be free of
/// solid geometry in `blocking`.
fn segment_clear(
    world: &PhysicsWorld,
    blocking: Group,
    side_offset: f32,
    from: Point2<f32>,
    to: Point2<f32>,
) -> bool {
    let direction = to - from;
    let length = direction.magnitude();
    if length < consts::EPSILON {
        return true;
    }
    let unit = direction / length;
    let offset = Vector2::new(-unit.y, unit.x) * side_offset;

    !world.segment_hits_solid(from, to, blocking)
        && !world.segment_hits_solid(from + offset, to + offset, blocking)
        && !world.segment_hits_solid(from - offset, to - offset, blocking)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::constants::nav as nav_consts;
    use crate::game::nav::{NavGraph, WalkableGrid};
    use crate::game::pathfinding;
    use crate::game::physics::{BodyTag, ALL_WALL_GROUPS, GROUP_WALLS};

    fn corridor_waypoints() -> Vec<Point2<f32>> {
        (0..5).map(|x| Point2::new(x as f32 + 0.5, 0.5)).collect()
    }

    #[test]
    fn test_clear_five_by_five_grid_smooths_to_two_waypoints() {
        let grid = WalkableGrid::new(5, 5, vec![true; 25]);
        let graph = NavGraph::build(&grid);
        let raw = pathfinding::find_waypoints(
            &graph,
            Point2::new(0.5, 0.5),
            Point2::new(4.5, 4.5),
        );
        assert!(raw.len() >= 2);

        let world = PhysicsWorld::new();
        let smoothed = smooth_path(
            &world,
            ALL_WALL_GROUPS,
            nav_consts::PATH_SMOOTH_SIDE_OFFSET,
            &raw,
        );
        assert_eq!(smoothed, vec![Point2::new(0.5, 0.5), Point2::new(4.5, 4.5)]);
    }

    #[test]
    fn test_never_grows_and_keeps_endpoints() {
        let mut world = PhysicsWorld::new();
        world.add_static_rect(
            Point2::new(2.5, 1.5),
            Vector2::new(0.5, 0.5),
            GROUP_WALLS,
            false,
            BodyTag::Wall,
        );
        world.update_query_pipeline();

        let input: Vec<Point2<f32>> = vec![
            Point2::new(0.5, 0.5),
            Point2::new(1.5, 0.5),
            Point2::new(2.5, 0.5),
            Point2::new(3.5, 1.5),
            Point2::new(4.5, 2.5),
        ];
        let smoothed = smooth_path(
            &world,
            ALL_WALL_GROUPS,
            nav_consts::PATH_SMOOTH_SIDE_OFFSET,
            &input,
        );
        assert!(smoothed.len() <= input.len());
        assert_eq!(smoothed.first(), input.first());
        assert_eq!(smoothed.last(), input.last());
    }

    #[test]
    fn test_side_rays_reject_wall_grazing_segments() {
        let clear_world = PhysicsWorld::new();
        let smoothed = smooth_path(
            &clear_world,
            ALL_WALL_GROUPS,
            nav_consts::PATH_SMOOTH_SIDE_OFFSET,
            &corridor_waypoints(),
        );
        assert_eq!(smoothed.len(), 2, "nothing nearby, straight shot");

        // A block just off the center line, inside the side-ray margin.
        let mut world = PhysicsWorld::new();
        world.add_static_rect(
            Point2::new(2.5, 1.05),
            Vector2::new(0.5, 0.25),
            GROUP_WALLS,
            false,
            BodyTag::Wall,
        );
        world.update_query_pipeline();
        let smoothed = smooth_path(
            &world,
            ALL_WALL_GROUPS,
            nav_consts::PATH_SMOOTH_SIDE_OFFSET,
            &corridor_waypoints(),
        );
        assert!(
            smoothed.len() > 2,
            "grazing segments must be rejected, got {:?}",
            smoothed
        );
    }

    #[test]
    fn test_two_point_paths_pass_through_untouched() {
        let world = PhysicsWorld::new();
        let input = vec![Point2::new(0.2, 0.3), Point2::new(7.5, 3.5)];
        let smoothed = smooth_path(
            &world,
            ALL_WALL_GROUPS,
            nav_consts::PATH_SMOOTH_SIDE_OFFSET,
            &input,
        );
        assert_eq!(smoothed, input);
    }
}
