//! Floor casting into a persistent lower-half buffer.

use rayon::{
    iter::{IndexedParallelIterator, ParallelIterator},
    slice::ParallelSliceMut,
};

use crate::camera::Pose;
use crate::renderer::Frame;
use crate::texture::{AtlasError, Image, TextureAtlas};
use crate::world::FloorGrid;

/// World distance covered by floor row `y`, counted down from the horizon.
///
/// Similar triangles with the eye at half the screen height; `+1` keeps the horizon
/// row finite.
#[inline]
pub fn row_distance(y: usize, screen_height: usize) -> f32 {
    0.5 * screen_height as f32 / (y as f32 + 1.0)
}

/// Lower half of the screen, reused every frame.
pub struct FloorCaster {
    width: usize,
    rows: usize,
    buf: Vec<u32>,
}

impl FloorCaster {
    pub fn new(width: usize, screen_height: usize) -> Self {
        let rows = screen_height - screen_height / 2;
        Self {
            width,
            rows,
            buf: vec![0; width * rows],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn buffer(&self) -> &[u32] {
        &self.buf
    }

    /// Fills the buffer with textured floor as seen from `pose`.
    pub fn cast(
        &mut self,
        pose: &Pose,
        floors: &FloorGrid,
        atlas: &TextureAtlas,
        screen_height: usize,
    ) -> Result<(), AtlasError> {
        let width = self.width;
        let size = atlas.size();
        let variants = (0..atlas.floor_count())
            .map(|v| atlas.floor(v as u8))
            .collect::<Result<Vec<&Image>, _>>()?;

        let left = pose.ray_dir_at(-1.0);
        let right = pose.ray_dir_at(1.0);
        let [px, py] = pose.pos;

        // Rows are independent; each reads only the pose, grid and textures.
        self.buf
            .par_chunks_mut(width)
            .enumerate()
            .try_for_each(|(y, row)| {
                let dist = row_distance(y, screen_height);
                let step_x = dist * (right[0] - left[0]) / width as f32;
                let step_y = dist * (right[1] - left[1]) / width as f32;
                let mut fx = px + dist * left[0];
                let mut fy = py + dist * left[1];

                for out in row.iter_mut() {
                    let cx = fx.floor();
                    let cy = fy.floor();
                    let tx = ((size as f32 * (fx - cx)) as usize) & (size - 1);
                    let ty = ((size as f32 * (fy - cy)) as usize) & (size - 1);
                    fx += step_x;
                    fy += step_y;

                    // Cells beyond the grid are hidden behind walls; draw base floor.
                    let variant = floors.get(cx as i32, cy as i32).unwrap_or(0);
                    let image = variants
                        .get(variant as usize)
                        .ok_or(AtlasError::UnknownFloor(variant))?;
                    *out = image.sample(tx, ty) & crate::color::RGB_MASK;
                }
                Ok(())
            })
    }

    /// Copies the buffer under the horizon in one block.
    pub fn blit(&self, frame: &mut Frame) {
        let start = (frame.height - self.rows) * frame.width;
        frame.pixels[start..start + self.buf.len()].copy_from_slice(&self.buf);
    }
}
