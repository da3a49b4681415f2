//! Procedural texture atlas for the built-in level.
//!
//! Everything is generated from a fixed seed so frames are reproducible.

use crate::color::opaque;
use crate::texture::{AtlasError, Image, Texture, TextureAtlas};

pub const TEXTURE_SIZE: usize = 64;
pub const TORCH_FRAME_MS: u32 = 150;

/// Small xorshift generator, enough for speckles.
struct Rng(u64);

impl Rng {
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }

    fn chance(&mut self, p: f32) -> bool {
        (self.next_u64() % 10_000) as f32 / 10_000.0 < p
    }
}

/// Scratch pixel grid drawn with rectangles.
#[derive(Clone)]
struct Canvas {
    size: usize,
    px: Vec<u32>,
}

impl Canvas {
    fn new(size: usize, fill: u32) -> Self {
        Self {
            size,
            px: vec![fill; size * size],
        }
    }

    fn rect(&mut self, x: i32, y: i32, w: i32, h: i32, c: u32) {
        let s = self.size as i32;
        for yy in y.max(0)..(y + h).min(s) {
            for xx in x.max(0)..(x + w).min(s) {
                self.px[(yy * s + xx) as usize] = c;
            }
        }
    }

    fn disc(&mut self, cx: i32, cy: i32, r: i32, c: u32) {
        let s = self.size as i32;
        for yy in (cy - r).max(0)..(cy + r + 1).min(s) {
            for xx in (cx - r).max(0)..(cx + r + 1).min(s) {
                let (dx, dy) = (xx - cx, yy - cy);
                if dx * dx + dy * dy <= r * r {
                    self.px[(yy * s + xx) as usize] = c;
                }
            }
        }
    }

    fn image(self) -> Result<Image, AtlasError> {
        Image::new(self.size, self.px)
    }
}

fn bricks(base: u32, brick: u32) -> Canvas {
    let s = TEXTURE_SIZE as i32;
    let mut c = Canvas::new(TEXTURE_SIZE, base);
    for y in (0..s).step_by(16) {
        let offset = if (y / 16) % 2 == 0 { 0 } else { 16 };
        for x in (0..s).step_by(32) {
            c.rect(x + offset + 1, y + 1, 30, 14, brick);
            // Wrap the half brick on offset rows.
            c.rect(x + offset + 1 - s, y + 1, 30, 14, brick);
        }
    }
    c
}

fn stone(rng: &mut Rng) -> Canvas {
    let mut c = Canvas::new(TEXTURE_SIZE, opaque(0x44, 0x44, 0x44));
    for i in 0..16 {
        for j in 0..16 {
            if (i + j) % 2 == 0 {
                c.rect(i * 4, j * 4, 4, 4, opaque(0x55, 0x55, 0x55));
            }
        }
    }
    speckle(&mut c, rng, 200, opaque(0x66, 0x66, 0x66), opaque(0x33, 0x33, 0x33));
    c
}

fn speckle(c: &mut Canvas, rng: &mut Rng, count: usize, a: u32, b: u32) {
    for _ in 0..count {
        let color = if rng.chance(0.5) { a } else { b };
        let (x, y) = (rng.below(c.size) as i32, rng.below(c.size) as i32);
        c.rect(x, y, 2, 2, color);
    }
}

fn mossy(rng: &mut Rng) -> Canvas {
    let mut c = Canvas::new(TEXTURE_SIZE, opaque(0x2a, 0x4a, 0x2a));
    speckle(&mut c, rng, 300, opaque(0x3a, 0x5a, 0x3a), opaque(0x1a, 0x3a, 0x1a));
    for _ in 0..5 {
        let (x, y) = (rng.below(TEXTURE_SIZE) as i32, rng.below(TEXTURE_SIZE) as i32);
        c.rect(x, y, 8, 8, opaque(0x1a, 0x3a, 0x1a));
    }
    c
}

fn wood() -> Canvas {
    let mut c = Canvas::new(TEXTURE_SIZE, opaque(0x5c, 0x40, 0x33));
    for x in (0..TEXTURE_SIZE as i32).step_by(8) {
        c.rect(x, 0, 2, TEXTURE_SIZE as i32, opaque(0x4a, 0x33, 0x2a));
    }
    c.disc(20, 30, 3, opaque(0x3e, 0x2b, 0x23));
    c.disc(50, 50, 2, opaque(0x3e, 0x2b, 0x23));
    c
}

fn torch_frames(rng: &mut Rng) -> Result<Vec<Image>, AtlasError> {
    let base = stone(rng);
    let cx = TEXTURE_SIZE as i32 / 2;
    let cy = (TEXTURE_SIZE as f32 / 1.8) as i32;
    (0..3)
        .map(|frame| {
            let mut c = base.clone();
            c.rect(cx - 4, cy + 10, 8, 8, opaque(0x22, 0x22, 0x22));
            c.rect(cx - 3, cy, 6, 12, opaque(0x8b, 0x45, 0x13));
            c.rect(cx - 6, cy, 13, 3, opaque(0x44, 0x44, 0x44));
            c.disc(cx, cy - 4, 5, opaque(0xff, 0xff, 0x00));
            for _ in 0..30 {
                if !rng.chance(0.8) {
                    continue;
                }
                let x = cx + rng.below(10) as i32 - 5;
                let rise = rng.below(15) as i32 + rng.below(2 * frame + 1) as i32;
                let y = cy - 4 - rise;
                let color = match rise * 10 / 15 {
                    0..=2 => opaque(0xff, 0xff, 0x00),
                    3..=6 => opaque(0xff, 0x8c, 0x00),
                    _ => opaque(0xff, 0x00, 0x00),
                };
                let part = rng.below(4) as i32 + 1;
                c.rect(x, y, part, part, color);
            }
            c.image()
        })
        .collect()
}

fn cobblestone(rng: &mut Rng) -> Canvas {
    let mut c = Canvas::new(TEXTURE_SIZE, opaque(0x1a, 0x1a, 0x1a));
    let s = TEXTURE_SIZE as i32;
    for y in (0..s).step_by(8) {
        let x_off = if (y / 8) % 2 == 0 { 0 } else { 4 };
        for x in (0..s).step_by(8) {
            let stone_x = (x + x_off) % s;
            let tone = 100 + rng.below(50) as u8;
            c.rect(stone_x + 1, y + 1, 6, 6, opaque(tone + 10, tone + 5, tone));
            c.rect(stone_x + 1, y + 1, 6, 2, opaque(tone + 35, tone + 30, tone + 25));
        }
    }
    for _ in 0..12 {
        let (x, y) = (rng.below(TEXTURE_SIZE) as i32, rng.below(TEXTURE_SIZE) as i32);
        c.rect(x, y, 4, 4, opaque(0x32, 0x50, 0x28));
    }
    c
}

fn carpet() -> Canvas {
    let mut c = Canvas::new(TEXTURE_SIZE, opaque(0x7a, 0x12, 0x12));
    let s = TEXTURE_SIZE as i32;
    c.rect(0, 0, s, 3, opaque(0xc8, 0x9b, 0x2c));
    c.rect(0, 0, 3, s, opaque(0xc8, 0x9b, 0x2c));
    for i in (8..s).step_by(16) {
        for j in (8..s).step_by(16) {
            c.rect(i, j, 4, 4, opaque(0xa0, 0x30, 0x30));
        }
    }
    c
}

fn table() -> Canvas {
    let s = TEXTURE_SIZE as i32;
    let mut c = Canvas::new(TEXTURE_SIZE, 0);
    let top = 20;
    c.rect(10, top, s - 20, 3, opaque(0x8b, 0x69, 0x14));
    c.rect(5, top + 3, s - 10, 3, opaque(0x8b, 0x69, 0x14));
    c.rect(10, top, s - 20, 1, opaque(0xa0, 0x79, 0x1a));
    let leg = 25;
    c.rect(12, top + 6, 4, leg, opaque(0x5c, 0x3d, 0x0d));
    c.rect(s - 16, top + 6, 4, leg, opaque(0x5c, 0x3d, 0x0d));
    c.rect(18, top + 6, 3, leg - 5, opaque(0x4a, 0x30, 0x0a));
    c.rect(s - 21, top + 6, 3, leg - 5, opaque(0x4a, 0x30, 0x0a));
    c
}

fn grenades() -> Canvas {
    let mut c = Canvas::new(TEXTURE_SIZE, 0);
    for cx in [24, 40] {
        c.rect(cx - 2, 34, 4, 20, opaque(0x5c, 0x3d, 0x0d));
        c.rect(cx - 2, 34, 1, 20, opaque(0x7a, 0x52, 0x10));
        c.rect(cx - 5, 26, 10, 8, opaque(0x2f, 0x4f, 0x2f));
        c.rect(cx - 5, 25, 10, 1, opaque(0x55, 0x55, 0x55));
    }
    c
}

fn machine_gun() -> Canvas {
    let (gx, gy) = (TEXTURE_SIZE as i32 / 2, TEXTURE_SIZE as i32 / 2);
    let mut c = Canvas::new(TEXTURE_SIZE, 0);
    c.rect(gx - 20, gy - 4, 30, 8, opaque(0x1a, 0x1a, 0x1a));
    c.rect(gx + 10, gy - 2, 15, 4, opaque(0x0a, 0x0a, 0x0a));
    c.rect(gx + 10, gy - 2, 15, 1, opaque(0x33, 0x33, 0x33));
    c.rect(gx - 5, gy + 4, 8, 12, opaque(0x2a, 0x2a, 0x2a));
    c.rect(gx - 25, gy - 3, 8, 6, opaque(0x5c, 0x3d, 0x0d));
    c.rect(gx - 8, gy + 2, 4, 8, opaque(0x3a, 0x2a, 0x1a));
    c
}

/// Builds the atlas for the default level's wall, floor and sprite ids.
pub fn build_default_atlas(seed: u64) -> Result<TextureAtlas, AtlasError> {
    let mut rng = Rng(seed | 1);
    let atlas = TextureAtlas::builder(TEXTURE_SIZE)
        .wall(1, Texture::Static(bricks(opaque(0x2a, 0x2a, 0x5a), opaque(0x4a, 0x4a, 0x8a)).image()?))
        .wall(2, Texture::Static(mossy(&mut rng).image()?))
        .wall(3, Texture::Static(bricks(opaque(0x5a, 0x2a, 0x2a), opaque(0x8a, 0x4a, 0x4a)).image()?))
        .wall(4, Texture::Static(stone(&mut rng).image()?))
        .wall(5, Texture::Static(wood().image()?))
        .wall(
            6,
            Texture::Animated {
                frames: torch_frames(&mut rng)?,
                frame_ms: TORCH_FRAME_MS,
            },
        )
        .floor(cobblestone(&mut rng).image()?)
        .floor(carpet().image()?)
        .sprite(0, table().image()?)
        .sprite(1, grenades().image()?)
        .sprite(2, machine_gun().image()?)
        .build()?;
    tracing::debug!("generated procedural atlas with seed {seed}");
    Ok(atlas)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::is_transparent;
    use crate::world::Level;

    #[test]
    fn default_atlas_covers_default_level() {
        let atlas = build_default_atlas(7).unwrap();
        let level = Level::default_level().unwrap();
        atlas.covers(&level).unwrap();
        assert!(matches!(atlas.wall(6).unwrap(), Texture::Animated { frames, .. } if frames.len() == 3));
    }

    #[test]
    fn generation_is_deterministic() {
        let a = build_default_atlas(42).unwrap();
        let b = build_default_atlas(42).unwrap();
        assert_eq!(a.wall(2).unwrap(), b.wall(2).unwrap());
        assert_eq!(a.floor(0).unwrap(), b.floor(0).unwrap());
    }

    #[test]
    fn sprites_have_transparent_background() {
        let atlas = build_default_atlas(1).unwrap();
        for id in 0..3 {
            let img = atlas.sprite(id).unwrap();
            assert!(is_transparent(img.sample(0, 0)));
            assert!(img.pixels().iter().any(|&p| !is_transparent(p)));
        }
    }
}
