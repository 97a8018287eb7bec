use image::{GrayImage, Luma};
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq)]
pub struct CoverageMask {
    pixels: GrayImage,
}

impl CoverageMask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: GrayImage::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn get(&self, x: i64, y: i64) -> u8 {
        if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
            return 0;
        }
        self.pixels.get_pixel(x as u32, y as u32)[0]
    }

    pub fn as_raw(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    /// Keeps the larger coverage where the block overlaps the mask.
    pub fn blit_max(&mut self, src: &[u8], src_w: u32, src_h: u32, x: i64, y: i64) {
        for sy in 0..src_h as i64 {
            let dy = y + sy;
            if dy < 0 || dy >= self.height() as i64 {
                continue;
            }
            for sx in 0..src_w as i64 {
                let dx = x + sx;
                if dx < 0 || dx >= self.width() as i64 {
                    continue;
                }
                let value = src[(sy * src_w as i64 + sx) as usize];
                let pixel = self.pixels.get_pixel_mut(dx as u32, dy as u32);
                pixel[0] = pixel[0].max(value);
            }
        }
    }

    pub fn fill_rect(&mut self, x0: f32, y0: f32, x1: f32, y1: f32) {
        if x1 <= x0 || y1 <= y0 {
            return;
        }
        let px0 = x0.floor().max(0.0) as i64;
        let py0 = y0.floor().max(0.0) as i64;
        let px1 = (x1.ceil() as i64).min(self.width() as i64);
        let py1 = (y1.ceil() as i64).min(self.height() as i64);
        for py in py0..py1 {
            let cover_y = span_overlap(py as f32, y0, y1);
            for px in px0..px1 {
                let cover_x = span_overlap(px as f32, x0, x1);
                let value = (cover_x * cover_y * 255.0).round() as u8;
                let pixel = self.pixels.get_pixel_mut(px as u32, py as u32);
                pixel[0] = pixel[0].max(value);
            }
        }
    }

    pub(crate) fn translated(&self, dx: i32, dy: i32) -> Self {
        let (width, height) = self.pixels.dimensions();
        let mut out = GrayImage::new(width, height);
        for (x, y, pixel) in out.enumerate_pixels_mut() {
            pixel[0] = self.get(x as i64 - dx as i64, y as i64 - dy as i64);
        }
        Self { pixels: out }
    }

    pub(crate) fn dilated(&self, radius: u32) -> Self {
        if radius == 0 {
            return self.clone();
        }
        let (width, height) = self.pixels.dimensions();
        let (w, h) = (width as usize, height as usize);
        let r = radius as i64;
        let src = self.pixels.as_raw();
        let mut out = vec![0u8; w * h];
        let mut row_max = vec![0u8; w];

        for dy in -r..=r {
            let half = (((r * r - dy * dy) as f64).sqrt().floor()) as usize;
            for y in 0..h as i64 {
                let sy = y + dy;
                if sy < 0 || sy >= h as i64 {
                    continue;
                }
                let row = &src[sy as usize * w..(sy as usize + 1) * w];
                sliding_max(row, half, &mut row_max);
                let dst = &mut out[y as usize * w..(y as usize + 1) * w];
                for (value, candidate) in dst.iter_mut().zip(&row_max) {
                    *value = (*value).max(*candidate);
                }
            }
        }

        Self {
            pixels: GrayImage::from_raw(width, height, out)
                .unwrap_or_else(|| GrayImage::new(width, height)),
        }
    }

    pub(crate) fn blurred(&self, radius: u32) -> Self {
        if radius == 0 {
            return self.clone();
        }
        let kernel = gaussian_kernel(radius);
        let (width, height) = self.pixels.dimensions();
        let (w, h) = (width as usize, height as usize);
        let r = radius as i64;
        let src: Vec<f32> = self.pixels.as_raw().iter().map(|v| *v as f32).collect();

        let mut horizontal = vec![0f32; w * h];
        for y in 0..h {
            for x in 0..w {
                let mut acc = 0f32;
                for (ki, weight) in kernel.iter().enumerate() {
                    let sx = x as i64 + ki as i64 - r;
                    if sx >= 0 && sx < w as i64 {
                        acc += weight * src[y * w + sx as usize];
                    }
                }
                horizontal[y * w + x] = acc;
            }
        }

        let mut out = GrayImage::new(width, height);
        for y in 0..h {
            for x in 0..w {
                let mut acc = 0f32;
                for (ki, weight) in kernel.iter().enumerate() {
                    let sy = y as i64 + ki as i64 - r;
                    if sy >= 0 && sy < h as i64 {
                        acc += weight * horizontal[sy as usize * w + x];
                    }
                }
                let value = acc.round().clamp(0.0, 255.0) as u8;
                out.put_pixel(x as u32, y as u32, Luma([value]));
            }
        }
        Self { pixels: out }
    }

    pub(crate) fn minus(&self, other: &CoverageMask) -> Self {
        let mut out = self.clone();
        for (x, y, pixel) in out.pixels.enumerate_pixels_mut() {
            pixel[0] = pixel[0].saturating_sub(other.get(x as i64, y as i64));
        }
        out
    }
}

fn span_overlap(start: f32, lo: f32, hi: f32) -> f32 {
    ((start + 1.0).min(hi) - start.max(lo)).clamp(0.0, 1.0)
}

// monotonic deque over row[x - half ..= x + half]
fn sliding_max(row: &[u8], half: usize, out: &mut [u8]) {
    let len = row.len();
    let mut window: VecDeque<usize> = VecDeque::new();
    let mut next = 0usize;
    for x in 0..len {
        let hi = (x + half).min(len - 1);
        while next <= hi {
            while window.back().is_some_and(|&idx| row[idx] <= row[next]) {
                window.pop_back();
            }
            window.push_back(next);
            next += 1;
        }
        let lo = x.saturating_sub(half);
        while window.front().is_some_and(|&idx| idx < lo) {
            window.pop_front();
        }
        out[x] = window.front().map(|&idx| row[idx]).unwrap_or(0);
    }
}

// sigma = radius / 3
fn gaussian_kernel(radius: u32) -> Vec<f32> {
    let r = radius as i32;
    let sigma = (radius as f64 / 3.0).max(0.5);
    let denom = 2.0 * sigma * sigma;
    let weights: Vec<f64> = (-r..=r)
        .map(|i| {
            let x = i as f64;
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.iter().map(|w| (w / sum) as f32).collect()
}
