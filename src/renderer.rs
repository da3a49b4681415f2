use serde::{Deserialize, Serialize};

use crate::camera::Pose;
use crate::color::pack_rgb;
use crate::floor::FloorCaster;
use crate::raycast::WallCaster;
use crate::sprites::SpriteCompositor;
use crate::texture::{AtlasError, TextureAtlas};
use crate::world::Level;

/// CPU frame buffer, row-major `0x00RRGGBB`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<u32>,
}

impl Frame {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> u32 {
        self.pixels[y * self.width + x]
    }

    /// Fills a clipped rectangle.
    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: u32) {
        let x0 = x.max(0) as usize;
        let y0 = y.max(0) as usize;
        let x1 = ((x + w).max(0) as usize).min(self.width);
        let y1 = ((y + h).max(0) as usize).min(self.height);
        for row in y0..y1 {
            let start = row * self.width;
            if x0 < x1 {
                self.pixels[start + x0..start + x1].fill(color);
            }
        }
    }

    /// Sets one pixel if it is on screen.
    #[inline]
    pub fn put(&mut self, x: i32, y: i32, color: u32) {
        if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
            self.pixels[y as usize * self.width + x as usize] = color;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderSettings {
    pub ceiling: u32,
    /// Strength of the black overlay on north/south faces.
    pub side_shade: f32,
    /// Depth-test sprites against each column's wall distance.
    pub occlude_sprites: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            ceiling: pack_rgb(56, 56, 56),
            side_shade: 0.35,
            occlude_sprites: false,
        }
    }
}

/// The three render stages and the buffers they keep between frames.
pub struct Renderer {
    settings: RenderSettings,
    walls: WallCaster,
    floor: FloorCaster,
    sprites: SpriteCompositor,
}

impl Renderer {
    pub fn new(width: usize, height: usize, settings: RenderSettings) -> Self {
        Self {
            settings,
            walls: WallCaster::new(width),
            floor: FloorCaster::new(width, height),
            sprites: SpriteCompositor::new(settings.occlude_sprites),
        }
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Wall distance per column from the last frame.
    pub fn wall_depth(&self) -> &[f32] {
        self.walls.depth()
    }

    pub fn sprites(&self) -> &SpriteCompositor {
        &self.sprites
    }

    /// Ceiling and floor, then walls, then sprites far to near.
    pub fn render_frame(
        &mut self,
        frame: &mut Frame,
        pose: &Pose,
        level: &Level,
        atlas: &TextureAtlas,
        elapsed_ms: u64,
    ) -> Result<(), AtlasError> {
        let (width, height) = (frame.width, frame.height);
        let horizon = height / 2;
        frame.pixels[..horizon * width].fill(self.settings.ceiling);

        self.floor.cast(pose, &level.floors, atlas, height)?;
        self.floor.blit(frame);

        self.walls.render(
            frame,
            pose,
            &level.walls,
            atlas,
            elapsed_ms,
            self.settings.side_shade,
        )?;

        self.sprites
            .compose(frame, pose, &level.sprites, atlas, self.walls.depth())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{darken, opaque};
    use crate::texture::{Image, Texture};
    use crate::world::{FloorGrid, Sprite, WallGrid};

    fn level() -> Level {
        let walls = WallGrid::from_digit_rows(&[
            "11111", //
            "10001", //
            "10001", //
            "10001", //
            "11111",
        ])
        .unwrap();
        let floors = FloorGrid::filled(5, 5, 0);
        Level::new(
            walls,
            floors,
            vec![Sprite::new(2.5, 2.5, 0)],
            Pose::new([1.5, 2.5], [1.0, 0.0], [0.0, 0.66]),
        )
        .unwrap()
    }

    fn atlas() -> TextureAtlas {
        TextureAtlas::builder(8)
            .wall(1, Texture::Static(Image::solid(8, opaque(0, 0, 200)).unwrap()))
            .floor(Image::solid(8, opaque(0, 200, 0)).unwrap())
            .sprite(0, Image::solid(8, opaque(200, 0, 0)).unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn stages_compose_in_order() {
        let level = level();
        let mut frame = Frame::new(64, 48);
        let mut renderer = Renderer::new(64, 48, RenderSettings::default());
        renderer
            .render_frame(&mut frame, &level.spawn, &level, &atlas(), 0)
            .unwrap();

        // Ceiling above the wall top, floor below its bottom at the screen edge.
        assert_eq!(frame.pixel(0, 0), RenderSettings::default().ceiling);
        assert_eq!(frame.pixel(0, 47), pack_rgb(0, 200, 0));
        // Column 0 meets the north wall, a shaded face.
        assert_eq!(frame.pixel(0, 24), darken(opaque(0, 0, 200), 0.35));
        // The sprite one cell ahead covers the centre.
        assert_eq!(frame.pixel(32, 24), pack_rgb(200, 0, 0));
        assert_eq!(renderer.wall_depth().len(), 64);
        assert_eq!(renderer.sprites().last_draws().len(), 1);
    }

    #[test]
    fn fill_rect_and_put_clip() {
        let mut frame = Frame::new(4, 4);
        frame.fill_rect(-2, -2, 4, 4, 9);
        assert_eq!(frame.pixel(1, 1), 9);
        assert_eq!(frame.pixel(2, 2), 0);
        frame.put(10, 10, 5);
        frame.put(3, 3, 5);
        assert_eq!(frame.pixel(3, 3), 5);
    }
}
