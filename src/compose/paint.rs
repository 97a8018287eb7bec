use image::{Rgba, RgbaImage};

use crate::mask::CoverageMask;
use crate::style::{Color, Fill};

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ShadeBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Paint {
    Uniform(Color),
    Shaded { fill: Fill, area: ShadeBox },
}

impl Paint {
    pub(crate) fn for_fill(fill: Fill, area: ShadeBox) -> Self {
        match fill {
            Fill::Solid(color) => Paint::Uniform(color),
            fill => Paint::Shaded { fill, area },
        }
    }

    fn color_at(&self, x: u32, y: u32) -> [f32; 4] {
        match *self {
            Paint::Uniform(color) => channels(color),
            Paint::Shaded { fill, area } => {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;
                match fill {
                    Fill::Solid(color) => channels(color),
                    Fill::Linear {
                        from,
                        to,
                        angle_deg,
                    } => {
                        let t = linear_t(area, angle_deg, px, py);
                        lerp(channels(from), channels(to), t)
                    }
                    Fill::FourCorner { tl, tr, bl, br } => {
                        let u = unit(px - area.x, area.width);
                        let v = unit(py - area.y, area.height);
                        let top = lerp(channels(tl), channels(tr), u);
                        let bottom = lerp(channels(bl), channels(br), u);
                        lerp(top, bottom, v)
                    }
                }
            }
        }
    }

    pub(crate) fn paint_over(&self, mask: &CoverageMask, canvas: &mut RgbaImage) {
        for (x, y, pixel) in canvas.enumerate_pixels_mut() {
            let coverage = mask.get(x as i64, y as i64);
            if coverage == 0 {
                continue;
            }
            let color = self.color_at(x, y);
            over(pixel, color, coverage);
        }
    }
}

fn channels(color: Color) -> [f32; 4] {
    [
        color.r as f32,
        color.g as f32,
        color.b as f32,
        color.a as f32,
    ]
}

fn lerp(a: [f32; 4], b: [f32; 4], t: f32) -> [f32; 4] {
    let mut out = a;
    for (channel, (lo, hi)) in out.iter_mut().zip(a.iter().zip(b.iter())) {
        *channel = lo + (hi - lo) * t;
    }
    out
}

fn unit(offset: f32, extent: f32) -> f32 {
    if extent <= 0.0 {
        return 0.0;
    }
    (offset / extent).clamp(0.0, 1.0)
}

// 0 at the corner the axis starts from, 1 at the opposite one
fn linear_t(area: ShadeBox, angle_deg: f32, px: f32, py: f32) -> f32 {
    let (sin, cos) = angle_deg.to_radians().sin_cos();
    let project = |x: f32, y: f32| x * cos + y * sin;
    let corners = [
        project(area.x, area.y),
        project(area.x + area.width, area.y),
        project(area.x, area.y + area.height),
        project(area.x + area.width, area.y + area.height),
    ];
    let lo = corners.iter().copied().fold(f32::INFINITY, f32::min);
    let hi = corners.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    unit(project(px, py) - lo, hi - lo)
}

fn over(dst: &mut Rgba<u8>, color: [f32; 4], coverage: u8) {
    let src_a = color[3] / 255.0 * coverage as f32 / 255.0;
    if src_a <= 0.0 {
        return;
    }
    let dst_a = dst[3] as f32 / 255.0;
    if dst_a <= 0.0 {
        *dst = Rgba([
            to_u8(color[0]),
            to_u8(color[1]),
            to_u8(color[2]),
            to_u8(src_a * 255.0),
        ]);
        return;
    }
    let out_a = src_a + dst_a * (1.0 - src_a);
    let mut out = [0u8; 4];
    for channel in 0..3 {
        let blended =
            (color[channel] * src_a + dst[channel] as f32 * dst_a * (1.0 - src_a)) / out_a;
        out[channel] = to_u8(blended);
    }
    out[3] = to_u8(out_a * 255.0);
    *dst = Rgba(out);
}

fn to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
