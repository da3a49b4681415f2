//! Billboard props, drawn far to near over the walls.

use crate::camera::Pose;
use crate::color::{RGB_MASK, is_transparent};
use crate::renderer::Frame;
use crate::texture::{AtlasError, TextureAtlas};
use crate::world::Sprite;

/// Sprites closer than this to the camera plane are not drawn.
pub const NEAR: f32 = 0.1;

/// One visible sprite, projected to the screen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteDraw {
    pub index: usize,
    pub texture: u16,
    /// Camera-space depth, at least `NEAR`.
    pub depth: f32,
    pub screen_x: i32,
    /// Side of the on-screen square, in pixels.
    pub size: i32,
    /// Downward shift in pixels from `v_offset`.
    pub shift: i32,
}

/// Projects every sprite past the near plane and orders them farthest first.
pub fn project(pose: &Pose, sprites: &[Sprite], width: usize, height: usize) -> Vec<SpriteDraw> {
    let mut out = Vec::with_capacity(sprites.len());
    project_into(&mut out, pose, sprites, width, height);
    out
}

fn project_into(
    out: &mut Vec<SpriteDraw>,
    pose: &Pose,
    sprites: &[Sprite],
    width: usize,
    height: usize,
) {
    out.clear();
    let h = height as f32;
    for (index, s) in sprites.iter().enumerate() {
        let [cx, depth] = pose.to_camera_space([s.x, s.y]);
        if !(NEAR..f32::INFINITY).contains(&depth) {
            continue;
        }
        let unscaled = h / depth;
        out.push(SpriteDraw {
            index,
            texture: s.texture,
            depth,
            screen_x: pose.project_x(cx, depth, width as f32) as i32,
            size: (unscaled * s.scale).abs() as i32,
            shift: (unscaled * s.v_offset) as i32,
        });
    }
    out.sort_by(|a, b| b.depth.total_cmp(&a.depth));
}

/// Painter's-algorithm sprite pass.
///
/// With `occlude` off a sprite is drawn over every wall, even one standing in front of
/// it; with it on, each sprite column is dropped where the wall is nearer.
#[derive(Debug, Default)]
pub struct SpriteCompositor {
    pub occlude: bool,
    draws: Vec<SpriteDraw>,
}

impl SpriteCompositor {
    pub fn new(occlude: bool) -> Self {
        Self {
            occlude,
            draws: Vec::new(),
        }
    }

    /// Draws issued by the last `compose`, in issue order.
    pub fn last_draws(&self) -> &[SpriteDraw] {
        &self.draws
    }

    pub fn compose(
        &mut self,
        frame: &mut Frame,
        pose: &Pose,
        sprites: &[Sprite],
        atlas: &TextureAtlas,
        wall_depth: &[f32],
    ) -> Result<(), AtlasError> {
        project_into(&mut self.draws, pose, sprites, frame.width, frame.height);
        for d in &self.draws {
            let image = atlas.sprite(d.texture)?;
            draw_one(frame, d, image.size(), |tx, ty| image.sample(tx, ty), |x| {
                !self.occlude || wall_depth.get(x).is_none_or(|&w| d.depth < w)
            });
        }
        Ok(())
    }
}

fn draw_one(
    frame: &mut Frame,
    d: &SpriteDraw,
    tex_size: usize,
    texel: impl Fn(usize, usize) -> u32,
    column_visible: impl Fn(usize) -> bool,
) {
    if d.size <= 0 {
        return;
    }
    let (w, h) = (frame.width as i32, frame.height as i32);
    let half = d.size / 2;
    let top = (h / 2).saturating_sub(half).saturating_add(d.shift);
    let left = d.screen_x.saturating_sub(half);

    let y0 = top.max(0);
    let y1 = top.saturating_add(d.size).min(h);
    let x0 = left.max(0);
    let x1 = left.saturating_add(d.size).min(w);

    // Offsets into the square can exceed i32 when it is much larger than the frame.
    let texel_index = |p: i32, origin: i32| {
        ((i64::from(p) - i64::from(origin)) as usize * tex_size) / d.size as usize
    };
    for x in x0..x1 {
        if !column_visible(x as usize) {
            continue;
        }
        let tx = texel_index(x, left);
        let mut idx = y0 as usize * frame.width + x as usize;
        for y in y0..y1 {
            let ty = texel_index(y, top);
            let c = texel(tx, ty);
            if !is_transparent(c) {
                frame.pixels[idx] = c & RGB_MASK;
            }
            idx += frame.width;
        }
    }
}
