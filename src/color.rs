//! Packed pixel helpers.
//!
//! Frame pixels are `0x00RRGGBB` (BGRA8 in little-endian memory, alpha ignored by the
//! presenter). Texture pixels use the top byte as coverage: `0` is transparent.

pub const ALPHA_MASK: u32 = 0xFF00_0000;
pub const RGB_MASK: u32 = 0x00FF_FFFF;

#[inline]
pub const fn pack_rgb(r: u8, g: u8, b: u8) -> u32 {
    (b as u32) | ((g as u32) << 8) | ((r as u32) << 16)
}

/// Opaque texture pixel.
#[inline]
pub const fn opaque(r: u8, g: u8, b: u8) -> u32 {
    ALPHA_MASK | pack_rgb(r, g, b)
}

#[inline]
pub const fn is_transparent(texel: u32) -> bool {
    texel & ALPHA_MASK == 0
}

/// Blends `a` toward `b` with weight `w256` in [0, 256].
#[inline]
pub fn lerp_color_u32(a: u32, b: u32, w256: u32) -> u32 {
    let inv = 256 - w256;
    // R and B share one multiply (00RR00BB), G gets its own (0000GG00)
    let rb = (((a & 0x00FF00FF) * inv + (b & 0x00FF00FF) * w256) >> 8) & 0x00FF00FF;
    let g = (((a & 0x0000FF00) * inv + (b & 0x0000FF00) * w256) >> 8) & 0x0000FF00;
    rb | g
}

/// Darkens an opaque colour, as if overlaid with black at `strength` (0..=1).
#[inline]
pub fn darken(c: u32, strength: f32) -> u32 {
    let w = (strength.clamp(0.0, 1.0) * 256.0).round() as u32;
    lerp_color_u32(c & RGB_MASK, 0, w)
}
