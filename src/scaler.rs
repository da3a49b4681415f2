//! Stretches the fixed-size engine frame onto the window surface.

use rayon::{
    iter::{IndexedParallelIterator, ParallelIterator},
    slice::ParallelSliceMut,
};

use crate::color::lerp_color_u32;
use crate::renderer::Frame;

/// Precomputed mapping from window pixels to frame neighbours and weights.
#[derive(Debug, Default)]
pub struct ScaleLut {
    dst: (usize, usize),
    x0: Vec<usize>,
    x1: Vec<usize>,
    wx: Vec<u16>,
    y0: Vec<usize>,
    y1: Vec<usize>,
    wy: Vec<u16>,
}

/// Neighbour pair and 8.8 fixed-point weight for each destination coordinate.
fn axis(dst: usize, src: usize) -> (Vec<usize>, Vec<usize>, Vec<u16>) {
    let scale = src as f32 / dst as f32;
    let last = src.saturating_sub(1);
    let mut lo = Vec::with_capacity(dst);
    let mut hi = Vec::with_capacity(dst);
    let mut w = Vec::with_capacity(dst);
    for i in 0..dst {
        let f = i as f32 * scale;
        let a = (f.floor() as usize).min(last);
        lo.push(a);
        hi.push((a + 1).min(last));
        w.push(((f - a as f32).clamp(0.0, 1.0) * 256.0).round() as u16);
    }
    (lo, hi, w)
}

impl ScaleLut {
    pub fn new(dst_w: usize, dst_h: usize, src_w: usize, src_h: usize) -> Self {
        let (x0, x1, wx) = axis(dst_w, src_w);
        let (y0, y1, wy) = axis(dst_h, src_h);
        Self {
            dst: (dst_w, dst_h),
            x0,
            x1,
            wx,
            y0,
            y1,
            wy,
        }
    }

    /// Window size this table was built for.
    pub fn dst(&self) -> (usize, usize) {
        self.dst
    }
}

/// Bilinear stretch of `src` into a `dst` of the LUT's size, rows in parallel.
pub fn blit_bilinear_stretch(dst: &mut [u32], src: &Frame, lut: &ScaleLut) {
    let (dw, _) = lut.dst;
    if dw == 0 {
        return;
    }
    let sw = src.width;
    dst.par_chunks_mut(dw).enumerate().for_each(|(y, dst_row)| {
        let row0 = lut.y0[y] * sw;
        let row1 = lut.y1[y] * sw;
        let wy = lut.wy[y] as u32;

        for (x, out) in dst_row.iter_mut().enumerate() {
            let (x0, x1) = (lut.x0[x], lut.x1[x]);
            let wx = lut.wx[x] as u32;

            let top = lerp_color_u32(src.pixels[row0 + x0], src.pixels[row0 + x1], wx);
            let bot = lerp_color_u32(src.pixels[row1 + x0], src.pixels[row1 + x1], wx);
            *out = lerp_color_u32(top, bot, wy);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_size_copies_pixels() {
        let mut src = Frame::new(3, 2);
        src.pixels.copy_from_slice(&[1, 2, 3, 4, 5, 6]);
        let lut = ScaleLut::new(3, 2, 3, 2);
        let mut dst = vec![0; 6];
        blit_bilinear_stretch(&mut dst, &src, &lut);
        assert_eq!(dst, src.pixels);
    }

    #[test]
    fn doubling_interpolates_between_neighbours() {
        let mut src = Frame::new(2, 1);
        src.pixels.copy_from_slice(&[0x0000_0000, 0x00C8_C8C8]);
        let lut = ScaleLut::new(4, 2, 2, 1);
        let mut dst = vec![0; 8];
        blit_bilinear_stretch(&mut dst, &src, &lut);
        assert_eq!(dst[0], 0);
        assert_eq!(dst[1], 0x0064_6464);
        // Past the last source column the edge is held.
        assert_eq!(dst[3], 0x00C8_C8C8);
        assert_eq!(&dst[4..], &dst[..4]);
    }
}
