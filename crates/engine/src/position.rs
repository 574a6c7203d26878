//! Spawn placement for the player when entering a room through a door.

use crate::entity::{Door, Entity};
use crate::geometry::Point2D;

/// Distance kept between a spawned player and the door edge, and the margin
/// used both to classify edge doors and to clamp the spawn into the room.
pub const SPAWN_OFFSET: i32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorEdge {
    Left,
    Right,
    Top,
    Bottom,
    Interior,
}

/// Classifies a door by the edge it sits on. Left/right are tested before
/// top/bottom, so a corner door resolves to its vertical edge.
pub fn classify_door_edge(door_position: Point2D, environment_size: Point2D) -> DoorEdge {
    if door_position.x <= SPAWN_OFFSET {
        DoorEdge::Left
    } else if door_position.x >= environment_size.x - SPAWN_OFFSET {
        DoorEdge::Right
    } else if door_position.y <= SPAWN_OFFSET {
        DoorEdge::Top
    } else if door_position.y >= environment_size.y - SPAWN_OFFSET {
        DoorEdge::Bottom
    } else {
        DoorEdge::Interior
    }
}

pub fn default_spawn_position(environment_size: Point2D) -> Point2D {
    environment_size.half()
}

pub fn position_after_transition(entering_door: &Door, environment_size: Point2D) -> Point2D {
    spawn_position(
        entering_door.position(),
        entering_door.dimension(),
        environment_size,
    )
}

pub fn spawn_position(
    door_position: Point2D,
    door_dimension: Point2D,
    environment_size: Point2D,
) -> Point2D {
    let door_center = door_position + door_dimension.half();

    let unclamped = match classify_door_edge(door_position, environment_size) {
        DoorEdge::Left => Point2D::new(
            door_position
                .x
                .saturating_add(door_dimension.x)
                .saturating_add(SPAWN_OFFSET),
            door_center.y,
        ),
        DoorEdge::Right => Point2D::new(door_position.x.saturating_sub(SPAWN_OFFSET), door_center.y),
        DoorEdge::Top => Point2D::new(
            door_center.x,
            door_position
                .y
                .saturating_add(door_dimension.y)
                .saturating_add(SPAWN_OFFSET),
        ),
        DoorEdge::Bottom => Point2D::new(door_center.x, door_position.y.saturating_sub(SPAWN_OFFSET)),
        DoorEdge::Interior => default_spawn_position(environment_size),
    };

    Point2D::new(
        clamp_axis(unclamped.x, environment_size.x),
        clamp_axis(unclamped.y, environment_size.y),
    )
}

// max-then-min so an environment narrower than twice the offset still yields
// a value instead of panicking like `i32::clamp` would.
fn clamp_axis(value: i32, extent: i32) -> i32 {
    SPAWN_OFFSET.max(value.min(extent - SPAWN_OFFSET))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::RoomId;

    const ENV: Point2D = Point2D::new(1280, 720);

    fn door_at(x: i32, y: i32, w: i32, h: i32) -> Door {
        Door::new(
            RoomId(1),
            RoomId(0),
            Point2D::new(x, y),
            Point2D::new(w, h),
            ENV,
        )
    }

    #[test]
    fn left_edge_door_spawns_to_its_right() {
        let door = door_at(10, 300, 30, 80);
        assert_eq!(
            position_after_transition(&door, ENV),
            Point2D::new(10 + 30 + SPAWN_OFFSET, 340)
        );
    }

    #[test]
    fn right_edge_door_spawns_to_its_left() {
        let door = door_at(1240, 300, 30, 80);
        assert_eq!(
            position_after_transition(&door, ENV),
            Point2D::new(1240 - SPAWN_OFFSET, 340)
        );
    }

    #[test]
    fn top_edge_door_spawns_below() {
        let door = door_at(600, 10, 80, 30);
        assert_eq!(
            position_after_transition(&door, ENV),
            Point2D::new(640, 10 + 30 + SPAWN_OFFSET)
        );
    }

    #[test]
    fn bottom_edge_door_spawns_above() {
        let door = door_at(600, 680, 80, 30);
        assert_eq!(
            position_after_transition(&door, ENV),
            Point2D::new(640, 680 - SPAWN_OFFSET)
        );
    }

    #[test]
    fn interior_door_spawns_at_center() {
        let door = door_at(400, 300, 60, 60);
        assert_eq!(position_after_transition(&door, ENV), Point2D::new(640, 360));
    }

    #[test]
    fn corner_door_prefers_vertical_edge() {
        assert_eq!(classify_door_edge(Point2D::new(10, 10), ENV), DoorEdge::Left);
        assert_eq!(
            classify_door_edge(Point2D::new(1250, 700), ENV),
            DoorEdge::Right
        );
    }

    #[test]
    fn edge_thresholds_are_inclusive() {
        assert_eq!(classify_door_edge(Point2D::new(50, 300), ENV), DoorEdge::Left);
        assert_eq!(
            classify_door_edge(Point2D::new(1230, 300), ENV),
            DoorEdge::Right
        );
        assert_eq!(classify_door_edge(Point2D::new(300, 50), ENV), DoorEdge::Top);
        assert_eq!(
            classify_door_edge(Point2D::new(300, 670), ENV),
            DoorEdge::Bottom
        );
        assert_eq!(
            classify_door_edge(Point2D::new(51, 51), ENV),
            DoorEdge::Interior
        );
    }

    #[test]
    fn spawn_near_corner_is_clamped_into_room() {
        // Tall door on the left edge near the top: its center is above the margin.
        let door = door_at(0, 0, 20, 40);
        let spawn = position_after_transition(&door, ENV);
        assert_eq!(spawn, Point2D::new(70, SPAWN_OFFSET));
    }

    #[test]
    fn spawn_always_within_margins_for_many_layouts() {
        let envs = [
            Point2D::new(100, 100),
            Point2D::new(101, 240),
            Point2D::new(640, 480),
            Point2D::new(1920, 1080),
        ];
        let dimensions = [Point2D::new(0, 0), Point2D::new(30, 80), Point2D::new(500, 500)];

        for env in envs {
            for dimension in dimensions {
                for x in (-200..=env.x + 200).step_by(37) {
                    for y in (-200..=env.y + 200).step_by(41) {
                        let spawn = spawn_position(Point2D::new(x, y), dimension, env);
                        assert!(
                            (SPAWN_OFFSET..=env.x - SPAWN_OFFSET).contains(&spawn.x),
                            "x {} out of range for env {env} door ({x}, {y})",
                            spawn.x
                        );
                        assert!(
                            (SPAWN_OFFSET..=env.y - SPAWN_OFFSET).contains(&spawn.y),
                            "y {} out of range for env {env} door ({x}, {y})",
                            spawn.y
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn default_spawn_is_center() {
        assert_eq!(default_spawn_position(ENV), Point2D::new(640, 360));
    }
}
