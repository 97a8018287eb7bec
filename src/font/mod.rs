
mod builtin;
mod system;

use std::sync::Arc;

use crate::error::RenderWarning;
use crate::mask::CoverageMask;

pub use builtin::{BUILTIN_FAMILY, BlockFace, BuiltinFonts};
pub use system::{FontOptions, SystemFonts};

// distances from the baseline, in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMetrics {
    pub ascent: f32,
    pub descent: f32,
}

impl LineMetrics {
    pub fn line_height(&self) -> f32 {
        self.ascent + self.descent
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InkRect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl InkRect {
    pub fn union(self, other: InkRect) -> InkRect {
        InkRect {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    pub fn offset(self, dx: f32, dy: f32) -> InkRect {
        InkRect {
            x0: self.x0 + dx,
            y0: self.y0 + dy,
            x1: self.x1 + dx,
            y1: self.y1 + dy,
        }
    }
}

pub trait GlyphFace: Send + Sync {
    fn family(&self) -> &str;

    fn metrics(&self) -> LineMetrics;

    fn measure(&self, run: &str) -> f32;

    fn ink_bounds(&self, run: &str) -> Option<InkRect>;

    /// Returns the characters drawn as boxes for lack of a glyph.
    fn rasterize(&self, run: &str, origin: (f32, f32), mask: &mut CoverageMask) -> Vec<char>;
}

pub trait FontProvider: Send + Sync {
    /// Never fails: an unknown family degrades to a default face.
    fn resolve(&self, family: &str, font_px: u32) -> ResolvedFace;
}

#[derive(Clone)]
pub struct ResolvedFace {
    pub face: Arc<dyn GlyphFace>,
    pub requested: String,
    pub substituted: bool,
}

impl ResolvedFace {
    pub fn warning(&self) -> Option<RenderWarning> {
        if !self.substituted {
            return None;
        }
        let requested = if self.requested.trim().is_empty() {
            "default".to_string()
        } else {
            self.requested.clone()
        };
        Some(RenderWarning::FontSubstituted {
            requested,
            used: self.face.family().to_string(),
        })
    }
}

impl std::fmt::Debug for ResolvedFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedFace")
            .field("family", &self.face.family())
            .field("requested", &self.requested)
            .field("substituted", &self.substituted)
            .finish()
    }
}

pub(crate) fn missing_glyph_box(advance: f32, font_px: f32) -> [(f32, f32, f32, f32); 4] {
    let x0 = advance * 0.1;
    let x1 = (advance * 0.9).max(x0 + 1.0);
    let y0 = -font_px * 0.7;
    let y1 = 0.0;
    let t = (font_px / 16.0).max(1.0);
    [
        (x0, y0, x1, y0 + t),
        (x0, y1 - t, x1, y1),
        (x0, y0, x0 + t, y1),
        (x1 - t, y0, x1, y1),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_glyph_box_is_a_hollow_outline() {
        let mut mask = CoverageMask::new(12, 20);
        for (x0, y0, x1, y1) in missing_glyph_box(10.0, 16.0) {
            mask.fill_rect(x0, y0 + 16.0, x1, y1 + 16.0);
        }
        // box spans x 1..9 and y 4.8..16 with 1px edges
        assert_eq!(mask.get(1, 10), 255);
        assert_eq!(mask.get(8, 10), 255);
        assert_eq!(mask.get(4, 15), 255);
        assert_eq!(mask.get(4, 10), 0);
        assert_eq!(mask.get(10, 10), 0);
    }

    #[test]
    fn substitution_warning_names_both_families() {
        let resolved = ResolvedFace {
            face: Arc::new(BlockFace::new(20)),
            requested: " ".to_string(),
            substituted: true,
        };
        assert_eq!(
            resolved.warning(),
            Some(RenderWarning::FontSubstituted {
                requested: "default".to_string(),
                used: BUILTIN_FAMILY.to_string(),
            })
        );
    }
}
