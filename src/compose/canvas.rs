use image::{Rgba, RgbaImage};

use crate::style::ReflectAxis;

use super::Effects;

pub(crate) fn bleed_margin(effects: &Effects, extra_vpadding: u32) -> u32 {
    let stroke = effects.stroke.map_or(0, |stroke| stroke.width);
    let glow = effects
        .glow
        .map_or(0, |glow| glow.radius.saturating_add(glow.softness));
    let shadow = effects
        .shadow
        .map_or(0, |shadow| shadow.dx.unsigned_abs().max(shadow.dy.unsigned_abs()));
    stroke
        .max(glow)
        .max(shadow)
        .saturating_add(extra_vpadding)
}

pub(crate) fn empty_canvas(extra_vpadding: u32) -> RgbaImage {
    let side = extra_vpadding.saturating_mul(2).max(1);
    RgbaImage::new(side, side)
}

/// Appends a mirrored copy whose alpha fades linearly from the seam to the far edge.
pub(crate) fn reflect(image: &RgbaImage, axis: ReflectAxis) -> RgbaImage {
    let (width, height) = image.dimensions();
    match axis {
        ReflectAxis::Vertical => {
            let mut out = RgbaImage::new(width, height * 2);
            for (x, y, pixel) in image.enumerate_pixels() {
                out.put_pixel(x, y, *pixel);
                let mirrored_row = height - 1 - y;
                out.put_pixel(
                    x,
                    height + mirrored_row,
                    faded(*pixel, mirrored_row, height),
                );
            }
            out
        }
        ReflectAxis::Horizontal => {
            let mut out = RgbaImage::new(width * 2, height);
            for (x, y, pixel) in image.enumerate_pixels() {
                out.put_pixel(x, y, *pixel);
                let mirrored_col = width - 1 - x;
                out.put_pixel(
                    width + mirrored_col,
                    y,
                    faded(*pixel, mirrored_col, width),
                );
            }
            out
        }
    }
}

fn faded(pixel: Rgba<u8>, step: u32, len: u32) -> Rgba<u8> {
    if len <= 1 {
        return pixel;
    }
    let fade = 1.0 - step as f32 / (len - 1) as f32;
    let Rgba([r, g, b, a]) = pixel;
    Rgba([r, g, b, (a as f32 * fade).round() as u8])
}
