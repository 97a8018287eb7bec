use image::RgbaImage;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, warn};

use crate::compose::compose;
use crate::error::{RenderError, RenderWarning};
use crate::font::FontProvider;
use crate::layout::layout;
use crate::style::StyleSpec;

/// Text box inside the image, without effect bleed or padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextBounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone)]
pub struct RenderResult {
    pub image: RgbaImage,
    pub text_bounds: TextBounds,
    pub warnings: Vec<RenderWarning>,
}

impl RenderResult {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Fails on invalid parameters or an oversized canvas. Font and effect problems
/// become warnings.
pub fn render(fonts: &dyn FontProvider, spec: &StyleSpec) -> Result<RenderResult, RenderError> {
    spec.validate()?;
    let started = Instant::now();

    let resolved = fonts.resolve(&spec.font_family, spec.font_px);
    let mut warnings = Vec::new();
    if let Some(warning) = resolved.warning() {
        warn!("{}", warning);
        warnings.push(warning);
    }

    let face = resolved.face.as_ref();
    let text_layout = layout(
        face,
        &spec.text,
        spec.font_px,
        spec.width_px,
        spec.align,
        spec.line_spacing,
    );
    let result = compose(&text_layout, face, spec, warnings)?;
    debug!(
        "render: {}x{} in {:?}",
        result.width(),
        result.height(),
        started.elapsed()
    );
    Ok(result)
}

/// Results keep input order. A panicking render becomes `RenderError::Aborted`.
pub fn render_many(
    fonts: &dyn FontProvider,
    specs: &[StyleSpec],
    workers: usize,
) -> Vec<Result<RenderResult, RenderError>> {
    let workers = workers.clamp(1, specs.len().max(1));
    if workers == 1 {
        return specs.iter().map(|spec| render_isolated(fonts, spec)).collect();
    }

    let counter = AtomicUsize::new(0);
    let next = &counter;
    let mut indexed: Vec<(usize, Result<RenderResult, RenderError>)> =
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(move || {
                        let mut done = Vec::new();
                        loop {
                            let idx = next.fetch_add(1, Ordering::Relaxed);
                            let Some(spec) = specs.get(idx) else {
                                break;
                            };
                            done.push((idx, render_isolated(fonts, spec)));
                        }
                        done
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|payload| panic::resume_unwind(payload))
                })
                .collect()
        });
    indexed.sort_by_key(|(idx, _)| *idx);
    indexed.into_iter().map(|(_, result)| result).collect()
}

fn render_isolated(
    fonts: &dyn FontProvider,
    spec: &StyleSpec,
) -> Result<RenderResult, RenderError> {
    panic::catch_unwind(AssertUnwindSafe(|| render(fonts, spec))).unwrap_or_else(|payload| {
        let reason = panic_message(payload.as_ref());
        warn!("render of {:?} aborted: {}", spec.text, reason);
        Err(RenderError::Aborted(reason))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic".to_string()
    }
}
