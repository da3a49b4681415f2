use std::collections::BTreeMap;

use crate::world::Level;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AtlasError {
    #[error("texture size {0} is not a power of two")]
    NotPowerOfTwo(usize),
    #[error("image is {found}x{found}, atlas size is {expected}x{expected}")]
    SizeMismatch { expected: usize, found: usize },
    #[error("image has {found} pixels, expected {expected}")]
    BadPixelCount { expected: usize, found: usize },
    #[error("animated texture {0} has no frames")]
    EmptyAnimation(u16),
    #[error("no wall texture for id {0}")]
    UnknownWall(u16),
    #[error("no floor texture for variant {0}")]
    UnknownFloor(u8),
    #[error("no sprite texture for id {0}")]
    UnknownSprite(u16),
}

/// Square texture image, `size x size` pixels, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    size: usize,
    pixels: Vec<u32>,
}

impl Image {
    pub fn new(size: usize, pixels: Vec<u32>) -> Result<Self, AtlasError> {
        if !size.is_power_of_two() {
            return Err(AtlasError::NotPowerOfTwo(size));
        }
        if pixels.len() != size * size {
            return Err(AtlasError::BadPixelCount {
                expected: size * size,
                found: pixels.len(),
            });
        }
        Ok(Self { size, pixels })
    }

    pub fn from_fn(size: usize, mut f: impl FnMut(usize, usize) -> u32) -> Result<Self, AtlasError> {
        let mut pixels = Vec::with_capacity(size * size);
        for y in 0..size {
            for x in 0..size {
                pixels.push(f(x, y));
            }
        }
        Self::new(size, pixels)
    }

    pub fn solid(size: usize, color: u32) -> Result<Self, AtlasError> {
        Self::new(size, vec![color; size * size])
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Texel lookup with coordinates wrapped by the power-of-two mask.
    #[inline]
    pub fn sample(&self, tx: usize, ty: usize) -> u32 {
        let mask = self.size - 1;
        self.pixels[(ty & mask) * self.size + (tx & mask)]
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }
}

/// A wall surface: one image, or frames cycled on a shared clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Texture {
    Static(Image),
    Animated { frames: Vec<Image>, frame_ms: u32 },
}

impl Texture {
    /// Frame visible at `elapsed_ms`: `floor(elapsed / frame_ms) mod frames`.
    #[inline]
    pub fn frame_at(&self, elapsed_ms: u64) -> &Image {
        match self {
            Texture::Static(img) => img,
            Texture::Animated { frames, frame_ms } => {
                let step = elapsed_ms / u64::from((*frame_ms).max(1));
                &frames[(step % frames.len() as u64) as usize]
            }
        }
    }

    fn images(&self) -> &[Image] {
        match self {
            Texture::Static(img) => std::slice::from_ref(img),
            Texture::Animated { frames, .. } => frames,
        }
    }
}

/// Id-keyed textures for walls, floor variants and sprites, all one size.
#[derive(Debug, Clone)]
pub struct TextureAtlas {
    size: usize,
    walls: BTreeMap<u16, Texture>,
    floors: Vec<Image>,
    sprites: BTreeMap<u16, Image>,
}

impl TextureAtlas {
    pub fn builder(size: usize) -> AtlasBuilder {
        AtlasBuilder {
            size,
            walls: BTreeMap::new(),
            floors: Vec::new(),
            sprites: BTreeMap::new(),
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn wall(&self, id: u16) -> Result<&Texture, AtlasError> {
        self.walls.get(&id).ok_or(AtlasError::UnknownWall(id))
    }

    #[inline]
    pub fn floor(&self, variant: u8) -> Result<&Image, AtlasError> {
        self.floors
            .get(variant as usize)
            .ok_or(AtlasError::UnknownFloor(variant))
    }

    #[inline]
    pub fn sprite(&self, id: u16) -> Result<&Image, AtlasError> {
        self.sprites.get(&id).ok_or(AtlasError::UnknownSprite(id))
    }

    pub fn floor_count(&self) -> usize {
        self.floors.len()
    }

    /// Checks every id the level references, so rendering never meets an unknown one.
    pub fn covers(&self, level: &Level) -> Result<(), AtlasError> {
        for (_, _, id) in level.walls.iter() {
            if id != 0 {
                self.wall(id)?;
            }
        }
        for (_, _, variant) in level.floors.iter() {
            self.floor(variant)?;
        }
        for s in &level.sprites {
            self.sprite(s.texture)?;
        }
        Ok(())
    }
}

pub struct AtlasBuilder {
    size: usize,
    walls: BTreeMap<u16, Texture>,
    floors: Vec<Image>,
    sprites: BTreeMap<u16, Image>,
}

impl AtlasBuilder {
    pub fn wall(mut self, id: u16, texture: Texture) -> Self {
        self.walls.insert(id, texture);
        self
    }

    /// Appends the next floor variant (0, 1, ...).
    pub fn floor(mut self, image: Image) -> Self {
        self.floors.push(image);
        self
    }

    pub fn sprite(mut self, id: u16, image: Image) -> Self {
        self.sprites.insert(id, image);
        self
    }

    pub fn build(self) -> Result<TextureAtlas, AtlasError> {
        if !self.size.is_power_of_two() {
            return Err(AtlasError::NotPowerOfTwo(self.size));
        }
        let check = |img: &Image| {
            if img.size() == self.size {
                Ok(())
            } else {
                Err(AtlasError::SizeMismatch {
                    expected: self.size,
                    found: img.size(),
                })
            }
        };
        for (&id, tex) in &self.walls {
            if tex.images().is_empty() {
                return Err(AtlasError::EmptyAnimation(id));
            }
            tex.images().iter().try_for_each(check)?;
        }
        self.floors.iter().try_for_each(check)?;
        self.sprites.values().try_for_each(check)?;

        Ok(TextureAtlas {
            size: self.size,
            walls: self.walls,
            floors: self.floors,
            sprites: self.sprites,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(c: u32) -> Image {
        Image::solid(4, c).unwrap()
    }

    #[test]
    fn image_rejects_odd_sizes() {
        assert_eq!(Image::solid(6, 0), Err(AtlasError::NotPowerOfTwo(6)));
        assert!(matches!(
            Image::new(4, vec![0; 15]),
            Err(AtlasError::BadPixelCount { .. })
        ));
    }

    #[test]
    fn sample_wraps_coordinates() {
        let img = Image::from_fn(4, |x, y| (y * 4 + x) as u32).unwrap();
        assert_eq!(img.sample(1, 2), 9);
        assert_eq!(img.sample(5, 6), 9);
    }

    #[test]
    fn animation_phase_follows_elapsed_time() {
        let tex = Texture::Animated {
            frames: vec![solid(1), solid(2), solid(3)],
            frame_ms: 150,
        };
        assert_eq!(tex.frame_at(0).sample(0, 0), 1);
        assert_eq!(tex.frame_at(149).sample(0, 0), 1);
        assert_eq!(tex.frame_at(150).sample(0, 0), 2);
        assert_eq!(tex.frame_at(450).sample(0, 0), 1);
        assert_eq!(Texture::Static(solid(7)).frame_at(99_999).sample(0, 0), 7);
    }

    #[test]
    fn unknown_ids_fail_loudly() {
        let atlas = TextureAtlas::builder(4)
            .wall(1, Texture::Static(solid(1)))
            .floor(solid(0))
            .build()
            .unwrap();
        assert!(atlas.wall(1).is_ok());
        assert_eq!(atlas.wall(9).unwrap_err(), AtlasError::UnknownWall(9));
        assert_eq!(atlas.floor(1).unwrap_err(), AtlasError::UnknownFloor(1));
        assert_eq!(atlas.sprite(0).unwrap_err(), AtlasError::UnknownSprite(0));
    }

    #[test]
    fn build_checks_sizes_and_frames() {
        let err = TextureAtlas::builder(4)
            .wall(2, Texture::Static(Image::solid(8, 0).unwrap()))
            .build()
            .unwrap_err();
        assert_eq!(err, AtlasError::SizeMismatch { expected: 4, found: 8 });

        let err = TextureAtlas::builder(4)
            .wall(6, Texture::Animated { frames: vec![], frame_ms: 150 })
            .build()
            .unwrap_err();
        assert_eq!(err, AtlasError::EmptyAnimation(6));
    }
}
