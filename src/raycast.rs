//! Wall casting: one DDA ray per screen column.

use crate::camera::Pose;
use crate::color::darken;
use crate::renderer::Frame;
use crate::texture::{AtlasError, TextureAtlas};
use crate::world::WallGrid;

/// Stand-in for an infinite distance when a ray component is zero.
const FAR: f32 = 1e30;
/// Smallest wall distance a ray reports.
const MIN_DIST: f32 = 1e-4;

/// Which kind of grid line the ray crossed last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Crossed a vertical line: an east or west face.
    X,
    /// Crossed a horizontal line: a north or south face, drawn shaded.
    Y,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallHit {
    pub cell: (i32, i32),
    pub id: u16,
    pub side: Side,
    /// Distance projected on the view direction, not Euclidean.
    pub perp_dist: f32,
    /// Fractional position of the hit along the wall face, in [0, 1).
    pub wall_x: f32,
    pub ray_dir: [f32; 2],
}

impl WallHit {
    /// Horizontal texel column, mirrored so faces read the same from either side.
    pub fn tex_x(&self, tex_size: usize) -> usize {
        let tx = ((self.wall_x * tex_size as f32) as usize).min(tex_size - 1);
        let mirrored = match self.side {
            Side::X => self.ray_dir[0] > 0.0,
            Side::Y => self.ray_dir[1] < 0.0,
        };
        if mirrored { tex_size - tx - 1 } else { tx }
    }
}

/// Steps a ray cell by cell until it lands on a wall.
///
/// Returns `None` only when the ray leaves the grid, which a closed border rules out.
pub fn cast_ray(pose: &Pose, walls: &WallGrid, ray_dir: [f32; 2]) -> Option<WallHit> {
    let [px, py] = pose.pos;
    let [rx, ry] = ray_dir;
    let (mut map_x, mut map_y) = pose.cell();

    let (step_x, delta_x, mut side_x) = axis_setup(px, map_x, rx);
    let (step_y, delta_y, mut side_y) = axis_setup(py, map_y, ry);

    loop {
        let side = if side_x < side_y {
            side_x += delta_x;
            map_x += step_x;
            Side::X
        } else {
            side_y += delta_y;
            map_y += step_y;
            Side::Y
        };

        let id = walls.get(map_x, map_y)?;
        if id == 0 {
            continue;
        }

        // Zero when the camera sits on the grid line of the wall it faces.
        let perp_dist = match side {
            Side::X => side_x - delta_x,
            Side::Y => side_y - delta_y,
        }
        .max(MIN_DIST);
        let along = match side {
            Side::X => py + perp_dist * ry,
            Side::Y => px + perp_dist * rx,
        };
        return Some(WallHit {
            cell: (map_x, map_y),
            id,
            side,
            perp_dist,
            wall_x: along - along.floor(),
            ray_dir,
        });
    }
}

/// Step direction, per-cell distance and distance to the first grid line on one axis.
#[inline]
fn axis_setup(pos: f32, cell: i32, dir: f32) -> (i32, f32, f32) {
    if dir == 0.0 {
        return (1, FAR, FAR);
    }
    let delta = (1.0 / dir).abs();
    if dir < 0.0 {
        (-1, delta, (pos - cell as f32) * delta)
    } else {
        (1, delta, (cell as f32 + 1.0 - pos) * delta)
    }
}

/// Vertical extent of a wall column: `(draw_start, draw_end, line_height)`, ends inclusive.
///
/// `None` when the wall is too far away to cover a whole pixel.
#[inline]
pub fn column_span(perp_dist: f32, height: usize) -> Option<(usize, usize, i32)> {
    let h = height as i32;
    let line_height = (height as f32 / perp_dist.max(MIN_DIST)).min(i32::MAX as f32 / 4.0) as i32;
    if line_height <= 0 || h == 0 {
        return None;
    }
    let start = (h / 2 - line_height / 2).max(0);
    let end = (h / 2 + line_height / 2).min(h - 1);
    Some((start as usize, end.max(start) as usize, line_height))
}

/// Draws wall columns and remembers each column's wall distance.
#[derive(Debug, Default)]
pub struct WallCaster {
    depth: Vec<f32>,
}

impl WallCaster {
    pub fn new(width: usize) -> Self {
        Self {
            depth: vec![f32::INFINITY; width],
        }
    }

    /// Perpendicular wall distance per column from the last render.
    pub fn depth(&self) -> &[f32] {
        &self.depth
    }

    pub fn render(
        &mut self,
        frame: &mut Frame,
        pose: &Pose,
        walls: &WallGrid,
        atlas: &TextureAtlas,
        elapsed_ms: u64,
        side_shade: f32,
    ) -> Result<(), AtlasError> {
        let (width, height) = (frame.width, frame.height);
        self.depth.resize(width, f32::INFINITY);
        let tex_size = atlas.size();

        for x in 0..width {
            let Some(hit) = cast_ray(pose, walls, pose.ray_dir(x, width)) else {
                self.depth[x] = f32::INFINITY;
                continue;
            };
            self.depth[x] = hit.perp_dist;

            let image = atlas.wall(hit.id)?.frame_at(elapsed_ms);
            let tex_x = hit.tex_x(tex_size);
            let Some((y0, y1, line_height)) = column_span(hit.perp_dist, height) else {
                continue;
            };

            // Texel rows advance by a fixed step; start where the clipped top lands.
            let step = tex_size as f32 / line_height.max(1) as f32;
            let mut tex_pos = (y0 as f32 - height as f32 / 2.0 + line_height as f32 / 2.0) * step;

            let mut idx = y0 * width + x;
            for _y in y0..=y1 {
                let tex_y = (tex_pos as usize).min(tex_size - 1);
                tex_pos += step;
                let texel = image.sample(tex_x, tex_y);
                frame.pixels[idx] = match hit.side {
                    Side::X => texel & crate::color::RGB_MASK,
                    Side::Y => darken(texel, side_shade),
                };
                idx += width;
            }
        }
        Ok(())
    }
}
