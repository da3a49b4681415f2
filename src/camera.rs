use serde::{Deserialize, Serialize};

/// Horizontal field of view of the default 0.66 camera plane.
pub const DEFAULT_FOV_DEG: f32 = 66.849_62;

/// Viewpoint of the player: position plus the view basis used to fan out rays.
///
/// `dir` and `plane` are kept perpendicular; `|plane| / |dir|` is the tangent of
/// half the horizontal field of view (0.66 gives roughly 66 degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub pos: [f32; 2],   // (x, y) position in grid units
    pub dir: [f32; 2],   // view direction
    pub plane: [f32; 2], // camera plane, perpendicular to dir
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            pos: [22.0, 12.0],
            dir: [-1.0, 0.0],
            plane: [0.0, 0.66],
        }
    }
}

impl Pose {
    pub fn new(pos: [f32; 2], dir: [f32; 2], plane: [f32; 2]) -> Self {
        Self { pos, dir, plane }
    }

    /// Builds a pose looking along `dir` with the plane derived from a horizontal FOV.
    pub fn looking(pos: [f32; 2], dir: [f32; 2], fov_x_deg: f32) -> Self {
        let len = (dir[0] * dir[0] + dir[1] * dir[1]).sqrt().max(f32::EPSILON);
        let d = [dir[0] / len, dir[1] / len];
        let half = (0.5 * fov_x_deg.to_radians()).tan();
        // Same handedness as the default (-1,0) / (0,0.66) pair.
        Self {
            pos,
            dir: d,
            plane: [d[1] * half, -d[0] * half],
        }
    }

    /// Rotates `dir` and `plane` together by `angle` radians (positive is a left turn).
    pub fn rotate(&mut self, angle: f32) {
        let (s, c) = angle.sin_cos();
        let [dx, dy] = self.dir;
        let [px, py] = self.plane;
        self.dir = [dx * c - dy * s, dx * s + dy * c];
        self.plane = [px * c - py * s, px * s + py * c];
    }

    /// Ray direction through screen column `x` of `width`; column 0 is `dir - plane`.
    #[inline]
    pub fn ray_dir(&self, x: usize, width: usize) -> [f32; 2] {
        let camera_x = 2.0 * x as f32 / width as f32 - 1.0;
        self.ray_dir_at(camera_x)
    }

    /// Ray direction for a camera-space coordinate in [-1, 1].
    #[inline]
    pub fn ray_dir_at(&self, camera_x: f32) -> [f32; 2] {
        [
            self.dir[0] + self.plane[0] * camera_x,
            self.dir[1] + self.plane[1] * camera_x,
        ]
    }

    /// Transforms a world point into camera space.
    ///
    /// Returns `[lateral, depth]`: the inverse of the `[plane, dir]` basis applied to
    /// the offset from the camera. `depth > 0` means the point is in front.
    #[inline]
    pub fn to_camera_space(&self, p: [f32; 2]) -> [f32; 2] {
        let dx = p[0] - self.pos[0];
        let dy = p[1] - self.pos[1];
        let det = self.plane[0] * self.dir[1] - self.dir[0] * self.plane[1];
        let inv_det = 1.0 / det;
        let cx = inv_det * (self.dir[1] * dx - self.dir[0] * dy);
        let cy = inv_det * (-self.plane[1] * dx + self.plane[0] * dy);
        [cx, cy]
    }

    /// Screen column of a camera-space point.
    #[inline]
    pub fn project_x(&self, cx: f32, cy: f32, screen_width: f32) -> f32 {
        0.5 * screen_width * (1.0 + cx / cy)
    }

    /// Facing angle in radians, as a HUD would show it.
    pub fn facing_angle(&self) -> f32 {
        self.dir[1].atan2(self.dir[0])
    }

    /// `|plane| / |dir|`, the quantity rotations must not change.
    pub fn fov_ratio(&self) -> f32 {
        let d = (self.dir[0] * self.dir[0] + self.dir[1] * self.dir[1]).sqrt();
        let p = (self.plane[0] * self.plane[0] + self.plane[1] * self.plane[1]).sqrt();
        p / d
    }

    /// Grid cell containing the camera.
    #[inline]
    pub fn cell(&self) -> (i32, i32) {
        (self.pos[0].floor() as i32, self.pos[1].floor() as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32, eps: f32) -> bool {
        (a - b).abs() <= eps
    }

    #[test]
    fn rotation_keeps_basis_perpendicular() {
        let mut pose = Pose::default();
        for i in 0..1000 {
            pose.rotate(if i % 3 == 0 { -0.05 } else { 0.07 });
            let dot = pose.dir[0] * pose.plane[0] + pose.dir[1] * pose.plane[1];
            assert!(approx_eq(dot, 0.0, 1e-4), "dot drifted to {dot}");
        }
        assert!(approx_eq(pose.fov_ratio(), 0.66, 1e-3));
    }

    #[test]
    fn left_twice_then_right_once_restores_direction() {
        let mut pose = Pose::default();
        let start = pose;
        pose.rotate(0.05);
        pose.rotate(0.05);
        pose.rotate(-0.1);
        assert!(approx_eq(pose.dir[0], start.dir[0], 1e-5));
        assert!(approx_eq(pose.dir[1], start.dir[1], 1e-5));
        assert!(approx_eq(pose.plane[1], start.plane[1], 1e-5));
    }

    #[test]
    fn edge_columns_use_dir_minus_and_plus_plane() {
        let pose = Pose::default();
        assert_eq!(pose.ray_dir(0, 640), [-1.0, -0.66]);
        let center = pose.ray_dir(320, 640);
        assert!(approx_eq(center[0], -1.0, 1e-6) && approx_eq(center[1], 0.0, 1e-6));
    }

    #[test]
    fn point_ahead_has_positive_depth() {
        let pose = Pose::default();
        let [cx, cy] = pose.to_camera_space([18.0, 12.0]);
        assert!(approx_eq(cx, 0.0, 1e-5));
        assert!(approx_eq(cy, 4.0, 1e-5));
        let [_, behind] = pose.to_camera_space([23.0, 12.0]);
        assert!(behind < 0.0);
        assert!(approx_eq(pose.project_x(cx, cy, 640.0), 320.0, 1e-3));
    }

    #[test]
    fn looking_matches_default_basis() {
        let pose = Pose::looking([22.0, 12.0], [-2.0, 0.0], DEFAULT_FOV_DEG);
        assert!(approx_eq(pose.dir[0], -1.0, 1e-6));
        assert!(approx_eq(pose.plane[1], 0.66, 1e-4));
        assert!(approx_eq(pose.facing_angle(), std::f32::consts::PI, 1e-6));
    }
}
