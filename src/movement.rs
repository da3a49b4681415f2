//! Per-tick pose update: turning, walking and axis-separated collision.

use serde::{Deserialize, Serialize};

use crate::camera::Pose;
use crate::world::WallGrid;

/// Which actions are held during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputIntents {
    pub turn_left: bool,
    pub turn_right: bool,
    pub forward: bool,
    pub backward: bool,
    pub strafe_left: bool,
    pub strafe_right: bool,
}

impl InputIntents {
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementConfig {
    pub move_speed: f32,     // grid units per tick
    pub rot_speed: f32,      // radians per tick
    pub strafe_factor: f32,  // strafe step relative to move_speed
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            move_speed: 0.08,
            rot_speed: 0.05,
            strafe_factor: 0.7,
        }
    }
}

/// Advances `pose` by one tick of `intents`.
///
/// `scale` multiplies both speeds; pass `1.0` for fixed per-tick steps. Each axis of a
/// step is committed only if the cell it lands in is open, reading the other axis at
/// its current value. That gives wall sliding, and it also lets a diagonal step slip
/// through a wall corner when both side cells are open.
pub fn resolve(
    pose: &mut Pose,
    intents: &InputIntents,
    walls: &WallGrid,
    config: &MovementConfig,
    scale: f32,
) {
    if intents.is_idle() {
        return;
    }
    let rot = config.rot_speed * scale;
    if intents.turn_left {
        pose.rotate(rot);
    }
    if intents.turn_right {
        pose.rotate(-rot);
    }

    let step = config.move_speed * scale;
    let [dx, dy] = pose.dir;
    if intents.forward {
        slide(pose, [dx * step, dy * step], walls);
    }
    if intents.backward {
        slide(pose, [-dx * step, -dy * step], walls);
    }

    let strafe = step * config.strafe_factor;
    if intents.strafe_left {
        slide(pose, [-dy * strafe, dx * strafe], walls);
    }
    if intents.strafe_right {
        slide(pose, [dy * strafe, -dx * strafe], walls);
    }
}

/// Moves along x, then y, each only into an open cell.
fn slide(pose: &mut Pose, delta: [f32; 2], walls: &WallGrid) {
    let nx = pose.pos[0] + delta[0];
    if walls.is_open(nx.floor() as i32, pose.pos[1].floor() as i32) {
        pose.pos[0] = nx;
    }
    let ny = pose.pos[1] + delta[1];
    if walls.is_open(pose.pos[0].floor() as i32, ny.floor() as i32) {
        pose.pos[1] = ny;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() <= eps
    }

    fn room() -> WallGrid {
        WallGrid::from_digit_rows(&[
            "11111", //
            "10001", //
            "10001", //
            "10001", //
            "11111",
        ])
        .unwrap()
    }

    fn pose_at(x: f32, y: f32) -> Pose {
        Pose::new([x, y], [1.0, 0.0], [0.0, 0.66])
    }

    #[test]
    fn forward_moves_along_dir() {
        let mut pose = pose_at(1.5, 2.5);
        let intents = InputIntents {
            forward: true,
            ..Default::default()
        };
        resolve(&mut pose, &intents, &room(), &MovementConfig::default(), 1.0);
        assert!(approx_eq(pose.pos[0], 1.58, 1e-6));
        assert!(approx_eq(pose.pos[1], 2.5, 1e-6));
    }

    #[test]
    fn wall_blocks_only_the_blocked_axis() {
        // Heading into the east wall at a slant: x is refused, y still slides.
        let mut pose = Pose::new([3.95, 2.5], [0.8, 0.6], [-0.396, 0.528]);
        let intents = InputIntents {
            forward: true,
            ..Default::default()
        };
        let cfg = MovementConfig {
            move_speed: 0.1,
            ..Default::default()
        };
        resolve(&mut pose, &intents, &room(), &cfg, 1.0);
        assert!(approx_eq(pose.pos[0], 3.95, 1e-6));
        assert!(approx_eq(pose.pos[1], 2.56, 1e-6));
    }

    #[test]
    fn never_enters_a_wall_cell() {
        let walls = room();
        let mut pose = pose_at(2.5, 2.5);
        let cfg = MovementConfig {
            move_speed: 0.3,
            ..Default::default()
        };
        let intents = InputIntents {
            forward: true,
            turn_left: true,
            ..Default::default()
        };
        for _ in 0..500 {
            resolve(&mut pose, &intents, &walls, &cfg, 1.0);
            let (cx, cy) = pose.cell();
            assert!(walls.is_open(cx, cy), "entered wall at {:?}", pose.pos);
        }
    }

    #[test]
    fn strafing_left_then_right_returns_home() {
        let walls = room();
        let mut pose = pose_at(2.5, 2.5);
        let start = pose.pos;
        let cfg = MovementConfig::default();
        let left = InputIntents {
            strafe_left: true,
            ..Default::default()
        };
        let right = InputIntents {
            strafe_right: true,
            ..Default::default()
        };
        for _ in 0..5 {
            resolve(&mut pose, &left, &walls, &cfg, 1.0);
        }
        assert!(approx_eq(pose.pos[1], 2.5 + 5.0 * 0.08 * 0.7, 1e-5));
        for _ in 0..5 {
            resolve(&mut pose, &right, &walls, &cfg, 1.0);
        }
        assert!(approx_eq(pose.pos[0], start[0], 1e-5));
        assert!(approx_eq(pose.pos[1], start[1], 1e-5));
    }

    #[test]
    fn turning_rotates_plane_with_dir() {
        let mut pose = pose_at(2.5, 2.5);
        let intents = InputIntents {
            turn_right: true,
            ..Default::default()
        };
        resolve(&mut pose, &intents, &room(), &MovementConfig::default(), 2.0);
        assert!(approx_eq(pose.facing_angle(), -0.1, 1e-6));
        let dot = pose.dir[0] * pose.plane[0] + pose.dir[1] * pose.plane[1];
        assert!(approx_eq(dot, 0.0, 1e-6));
        assert_eq!(pose.pos, [2.5, 2.5]);
    }

    #[test]
    fn idle_intents_leave_pose_untouched() {
        let mut pose = pose_at(2.5, 2.5);
        let before = pose;
        assert!(InputIntents::default().is_idle());
        resolve(&mut pose, &InputIntents::default(), &room(), &MovementConfig::default(), 1.0);
        assert_eq!(pose, before);
    }
}
