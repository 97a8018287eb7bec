mod canvas;
mod paint;

use image::RgbaImage;
use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::error::{RenderError, RenderWarning};
use crate::font::{GlyphFace, InkRect};
use crate::layout::TextLayout;
use crate::mask::CoverageMask;
use crate::render::{RenderResult, TextBounds};
use crate::style::{Glow, ReflectAxis, Shadow, Stroke, StyleSpec};

use paint::{Paint, ShadeBox};

pub const MAX_EFFECT_RADIUS: u32 = 128;
/// Largest side of a rendered image, reflection included.
pub const MAX_CANVAS_SIDE: u32 = 16384;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum LayerSlot {
    Shadow,
    Glow,
    Stroke,
    Fill,
}

struct Layer {
    slot: LayerSlot,
    mask: CoverageMask,
    paint: Paint,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Effects {
    pub stroke: Option<Stroke>,
    pub glow: Option<Glow>,
    pub shadow: Option<Shadow>,
}

impl Effects {
    fn from_spec(spec: &StyleSpec, warnings: &mut Vec<RenderWarning>) -> Self {
        let stroke = spec
            .stroke
            .filter(|stroke| !stroke.is_noop())
            .map(|stroke| Stroke {
                width: clamp_radius("stroke width", stroke.width, warnings),
                ..stroke
            });
        let glow = spec.glow.filter(|glow| !glow.is_noop()).map(|glow| Glow {
            radius: clamp_radius("glow radius", glow.radius, warnings),
            softness: clamp_radius("glow softness", glow.softness, warnings),
            ..glow
        });
        let shadow = spec
            .shadow
            .filter(|shadow| !shadow.is_noop())
            .map(|shadow| Shadow {
                dx: clamp_offset("shadow dx", shadow.dx, warnings),
                dy: clamp_offset("shadow dy", shadow.dy, warnings),
                ..shadow
            });
        Self {
            stroke,
            glow,
            shadow,
        }
    }
}

fn clamp_radius(effect: &'static str, requested: u32, warnings: &mut Vec<RenderWarning>) -> u32 {
    if requested <= MAX_EFFECT_RADIUS {
        return requested;
    }
    warn!("{} {}px clamped to {}px", effect, requested, MAX_EFFECT_RADIUS);
    warnings.push(RenderWarning::EffectClamped {
        effect,
        requested,
        applied: MAX_EFFECT_RADIUS,
    });
    MAX_EFFECT_RADIUS
}

fn clamp_offset(effect: &'static str, requested: i32, warnings: &mut Vec<RenderWarning>) -> i32 {
    let magnitude = clamp_radius(effect, requested.unsigned_abs(), warnings) as i32;
    if requested < 0 { -magnitude } else { magnitude }
}

fn ink_extent(layout: &TextLayout, face: &dyn GlyphFace) -> (i64, i64, i64, i64) {
    let mut extent = InkRect {
        x0: 0.0,
        y0: 0.0,
        x1: layout.width,
        y1: layout.height,
    };
    for line in &layout.lines {
        for run in &line.runs {
            if let Some(ink) = face.ink_bounds(&run.text) {
                extent = extent.union(ink.offset(line.x + run.x, line.baseline));
            }
        }
    }
    (
        extent.x0.floor() as i64,
        extent.y0.floor() as i64,
        extent.x1.ceil() as i64,
        extent.y1.ceil() as i64,
    )
}

pub(crate) fn compose(
    layout: &TextLayout,
    face: &dyn GlyphFace,
    spec: &StyleSpec,
    mut warnings: Vec<RenderWarning>,
) -> Result<RenderResult, RenderError> {
    let pad = spec.extra_vpadding;
    if layout.is_empty() {
        debug!("compose: empty text, padding {}", pad);
        let side = (pad as u64 * 2).max(1);
        check_canvas(side, side)?;
        return Ok(RenderResult {
            image: canvas::empty_canvas(pad),
            text_bounds: TextBounds {
                x: pad,
                y: pad,
                width: 0,
                height: 0,
            },
            warnings,
        });
    }

    let effects = Effects::from_spec(spec, &mut warnings);
    let margin = canvas::bleed_margin(&effects, pad);
    let (min_x, min_y, max_x, max_y) = ink_extent(layout, face);
    let text_w = max_x.saturating_sub(min_x).max(1) as u64;
    let text_h = max_y.saturating_sub(min_y).max(1) as u64;
    let canvas_w = text_w.saturating_add(2 * margin as u64);
    let canvas_h = text_h.saturating_add(2 * margin as u64);
    match spec.reflect {
        Some(ReflectAxis::Horizontal) => check_canvas(canvas_w.saturating_mul(2), canvas_h)?,
        Some(ReflectAxis::Vertical) => check_canvas(canvas_w, canvas_h.saturating_mul(2))?,
        None => check_canvas(canvas_w, canvas_h)?,
    }
    // bounded by MAX_CANVAS_SIDE from here on
    let (text_w, text_h) = (text_w as u32, text_h as u32);
    let (canvas_w, canvas_h) = (canvas_w as u32, canvas_h as u32);
    debug!(
        "compose: text {}x{}, margin {}, canvas {}x{}",
        text_w, text_h, margin, canvas_w, canvas_h
    );

    let origin_x = margin as f32 - min_x as f32;
    let origin_y = margin as f32 - min_y as f32;
    let mut coverage = CoverageMask::new(canvas_w, canvas_h);
    let mut missing = BTreeSet::new();
    for line in &layout.lines {
        for run in &line.runs {
            let pen = (origin_x + line.x + run.x, origin_y + line.baseline);
            missing.extend(face.rasterize(&run.text, pen, &mut coverage));
        }
    }
    if !missing.is_empty() {
        let chars: Vec<char> = missing.into_iter().collect();
        warn!("{} characters without glyphs in '{}'", chars.len(), face.family());
        warnings.push(RenderWarning::MissingGlyphs { chars });
    }

    let text_box = ShadeBox {
        x: margin as f32,
        y: margin as f32,
        width: text_w as f32,
        height: text_h as f32,
    };
    let mut layers = build_layers(&effects, &coverage);
    layers.push(Layer {
        slot: LayerSlot::Fill,
        mask: coverage,
        paint: Paint::for_fill(spec.fill, text_box),
    });
    layers.sort_by_key(|layer| layer.slot);

    let mut image = RgbaImage::new(canvas_w, canvas_h);
    for layer in &layers {
        layer.paint.paint_over(&layer.mask, &mut image);
    }

    if let Some(axis) = spec.reflect {
        image = canvas::reflect(&image, axis);
        debug!("compose: reflected {:?}, canvas {:?}", axis, image.dimensions());
    }

    Ok(RenderResult {
        image,
        text_bounds: TextBounds {
            x: margin,
            y: margin,
            width: text_w,
            height: text_h,
        },
        warnings,
    })
}

fn check_canvas(width: u64, height: u64) -> Result<(), RenderError> {
    let limit = MAX_CANVAS_SIDE as u64;
    if width > limit || height > limit {
        return Err(RenderError::CanvasTooLarge {
            width,
            height,
            limit: MAX_CANVAS_SIDE,
        });
    }
    Ok(())
}

fn build_layers(effects: &Effects, coverage: &CoverageMask) -> Vec<Layer> {
    let mut layers = Vec::new();
    if let Some(shadow) = effects.shadow {
        layers.push(Layer {
            slot: LayerSlot::Shadow,
            mask: coverage.translated(shadow.dx, shadow.dy),
            paint: Paint::Uniform(shadow.color),
        });
    }
    if let Some(glow) = effects.glow {
        layers.push(Layer {
            slot: LayerSlot::Glow,
            mask: coverage.dilated(glow.radius).blurred(glow.softness),
            paint: Paint::Uniform(glow.color),
        });
    }
    if let Some(stroke) = effects.stroke {
        layers.push(Layer {
            slot: LayerSlot::Stroke,
            mask: coverage.dilated(stroke.width).minus(coverage),
            paint: Paint::Uniform(stroke.color),
        });
    }
    layers
}
