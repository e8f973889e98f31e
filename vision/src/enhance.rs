//! Contrast-limited adaptive histogram equalisation on the Lab luminance
//! channel.
//!
//! Chrominance is carried through untouched (and unquantised), so only the
//! lightness of the frame changes.

use image::GrayImage;

use crate::frame::{ChannelOrder, Frame};

const DEFAULT_CLIP_LIMIT: f32 = 3.0;
const DEFAULT_GRID: (u32, u32) = (8, 8);
const BINS: usize = 256;

/// Pure, deterministic local-contrast enhancer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ImageEnhancer {
    clip_limit: f32,
    grid: (u32, u32),
}

impl Default for ImageEnhancer {
    fn default() -> Self {
        Self::new(DEFAULT_CLIP_LIMIT, DEFAULT_GRID)
    }
}

impl ImageEnhancer {
    /// `clip_limit <= 0` disables clipping. Grid cells are clamped to at
    /// least one tile per axis.
    pub fn new(clip_limit: f32, grid: (u32, u32)) -> Self {
        Self {
            clip_limit,
            grid: (grid.0.max(1), grid.1.max(1)),
        }
    }

    /// Return an enhanced copy of `frame` with the same size and channel
    /// order.
    pub fn enhance(&self, frame: &Frame) -> Frame {
        let (w, h) = (frame.width(), frame.height());
        let mut lightness = GrayImage::new(w, h);
        let mut chroma = Vec::with_capacity(w as usize * h as usize);
        for y in 0..h {
            for x in 0..w {
                let [l, a, b] = rgb_to_lab(frame.rgb_at(x, y));
                lightness.put_pixel(x, y, image::Luma([quantize(l * 255.0 / 100.0)]));
                chroma.push((a, b));
            }
        }

        let equalized = self.equalize(&lightness);

        let mut data = Vec::with_capacity(frame.data().len());
        for (px, (a, b)) in equalized.pixels().zip(chroma) {
            let l = px.0[0] as f32 * 100.0 / 255.0;
            let [r, g, bl] = lab_to_rgb([l, a, b]);
            match frame.order() {
                ChannelOrder::Rgb => data.extend_from_slice(&[r, g, bl]),
                ChannelOrder::Bgr => data.extend_from_slice(&[bl, g, r]),
            }
        }
        frame.with_data(data)
    }

    /// CLAHE over a single 8-bit channel.
    pub fn equalize(&self, channel: &GrayImage) -> GrayImage {
        let (w, h) = channel.dimensions();
        if w == 0 || h == 0 {
            return channel.clone();
        }
        let tile_w = w.div_ceil(self.grid.0.min(w));
        let tile_h = h.div_ceil(self.grid.1.min(h));
        let tiles_x = w.div_ceil(tile_w);
        let tiles_y = h.div_ceil(tile_h);

        let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
        for ty in 0..tiles_y {
            for tx in 0..tiles_x {
                let x0 = tx * tile_w;
                let y0 = ty * tile_h;
                let x1 = (x0 + tile_w).min(w);
                let y1 = (y0 + tile_h).min(h);
                luts.push(self.tile_lut(channel, x0, y0, x1, y1));
            }
        }
        let lut_at = |tx: u32, ty: u32| &luts[(ty * tiles_x + tx) as usize];

        let mut out = GrayImage::new(w, h);
        for y in 0..h {
            let gy = y as f32 / tile_h as f32 - 0.5;
            let ty_lo = gy.floor();
            let fy = gy - ty_lo;
            let ty0 = clamp_tile(ty_lo, tiles_y);
            let ty1 = clamp_tile(ty_lo + 1.0, tiles_y);
            for x in 0..w {
                let gx = x as f32 / tile_w as f32 - 0.5;
                let tx_lo = gx.floor();
                let fx = gx - tx_lo;
                let tx0 = clamp_tile(tx_lo, tiles_x);
                let tx1 = clamp_tile(tx_lo + 1.0, tiles_x);

                let v = channel.get_pixel(x, y).0[0] as usize;
                let top = (1.0 - fx) * lut_at(tx0, ty0)[v] as f32 + fx * lut_at(tx1, ty0)[v] as f32;
                let bottom =
                    (1.0 - fx) * lut_at(tx0, ty1)[v] as f32 + fx * lut_at(tx1, ty1)[v] as f32;
                out.put_pixel(x, y, image::Luma([quantize((1.0 - fy) * top + fy * bottom)]));
            }
        }
        out
    }

    fn tile_lut(&self, channel: &GrayImage, x0: u32, y0: u32, x1: u32, y1: u32) -> [u8; BINS] {
        let mut hist = [0u32; BINS];
        for y in y0..y1 {
            for x in x0..x1 {
                hist[channel.get_pixel(x, y).0[0] as usize] += 1;
            }
        }
        let area = (x1 - x0) * (y1 - y0);

        if self.clip_limit > 0.0 {
            let limit = ((self.clip_limit * area as f32 / BINS as f32) as u32).max(1);
            let mut excess = 0u32;
            for bin in hist.iter_mut() {
                if *bin > limit {
                    excess += *bin - limit;
                    *bin = limit;
                }
            }
            let spread = excess / BINS as u32;
            let residual = (excess % BINS as u32) as usize;
            for bin in hist.iter_mut() {
                *bin += spread;
            }
            if residual > 0 {
                let step = (BINS / residual).max(1);
                for bin in hist.iter_mut().step_by(step).take(residual) {
                    *bin += 1;
                }
            }
        }

        let scale = 255.0 / area as f32;
        let mut lut = [0u8; BINS];
        let mut cdf = 0u32;
        for (value, count) in hist.iter().enumerate() {
            cdf += count;
            lut[value] = quantize(cdf as f32 * scale);
        }
        lut
    }
}

fn clamp_tile(index: f32, tiles: u32) -> u32 {
    (index.max(0.0) as u32).min(tiles - 1)
}

fn quantize(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

// sRGB (D65) <-> CIE L*a*b*, with L in 0..=100.

const WHITE_X: f32 = 0.950456;
const WHITE_Z: f32 = 1.088754;
const EPSILON: f32 = 0.008856;
const KAPPA: f32 = 903.3;

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

fn lab_f(t: f32) -> f32 {
    if t > EPSILON {
        t.cbrt()
    } else {
        7.787 * t + 16.0 / 116.0
    }
}

fn lab_f_inv(f: f32) -> f32 {
    let cube = f * f * f;
    if cube > EPSILON {
        cube
    } else {
        (f - 16.0 / 116.0) / 7.787
    }
}

fn rgb_to_lab(rgb: [u8; 3]) -> [f32; 3] {
    let [r, g, b] = rgb.map(|c| srgb_to_linear(c as f32 / 255.0));
    let x = (0.412_453 * r + 0.357_580 * g + 0.180_423 * b) / WHITE_X;
    let y = 0.212_671 * r + 0.715_160 * g + 0.072_169 * b;
    let z = (0.019_334 * r + 0.119_193 * g + 0.950_227 * b) / WHITE_Z;

    let l = if y > EPSILON {
        116.0 * y.cbrt() - 16.0
    } else {
        KAPPA * y
    };
    let (fx, fy, fz) = (lab_f(x), lab_f(y), lab_f(z));
    [l, 500.0 * (fx - fy), 200.0 * (fy - fz)]
}

fn lab_to_rgb(lab: [f32; 3]) -> [u8; 3] {
    let [l, a, b] = lab;
    let fy = (l + 16.0) / 116.0;
    let fx = fy + a / 500.0;
    let fz = fy - b / 200.0;

    let y = if l > KAPPA * EPSILON { fy * fy * fy } else { l / KAPPA };
    let x = lab_f_inv(fx) * WHITE_X;
    let z = lab_f_inv(fz) * WHITE_Z;

    let r = 3.240_479 * x - 1.537_150 * y - 0.498_535 * z;
    let g = -0.969_256 * x + 1.875_991 * y + 0.041_556 * z;
    let bl = 0.055_648 * x - 0.204_043 * y + 1.057_311 * z;
    [r, g, bl].map(|c| quantize(linear_to_srgb(c.clamp(0.0, 1.0)) * 255.0))
}
