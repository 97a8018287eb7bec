use std::sync::Arc;

use super::{FontProvider, GlyphFace, InkRect, LineMetrics, ResolvedFace};
use crate::mask::CoverageMask;

pub const BUILTIN_FAMILY: &str = "builtin-block";

// ascent 0.8px, descent 0.2px, advance 0.6px (0.3px for whitespace),
// block 0.5px x 0.7px starting 0.05px after the pen
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockFace {
    px: f32,
}

impl BlockFace {
    pub fn new(font_px: u32) -> Self {
        Self {
            px: font_px as f32,
        }
    }

    fn advance(&self, ch: char) -> f32 {
        if ch.is_whitespace() {
            self.px * 3.0 / 10.0
        } else {
            self.px * 3.0 / 5.0
        }
    }

    fn block(&self, pen: f32) -> InkRect {
        InkRect {
            x0: pen + self.px / 20.0,
            y0: -(self.px * 7.0 / 10.0),
            x1: pen + self.px / 20.0 + self.px / 2.0,
            y1: 0.0,
        }
    }
}

impl GlyphFace for BlockFace {
    fn family(&self) -> &str {
        BUILTIN_FAMILY
    }

    fn metrics(&self) -> LineMetrics {
        LineMetrics {
            ascent: self.px * 4.0 / 5.0,
            descent: self.px / 5.0,
        }
    }

    fn measure(&self, run: &str) -> f32 {
        run.chars().map(|ch| self.advance(ch)).sum()
    }

    fn ink_bounds(&self, run: &str) -> Option<InkRect> {
        let mut pen = 0.0;
        let mut bounds: Option<InkRect> = None;
        for ch in run.chars() {
            if !ch.is_whitespace() {
                let block = self.block(pen);
                bounds = Some(bounds.map_or(block, |b| b.union(block)));
            }
            pen += self.advance(ch);
        }
        bounds
    }

    fn rasterize(&self, run: &str, origin: (f32, f32), mask: &mut CoverageMask) -> Vec<char> {
        let mut pen = 0.0;
        for ch in run.chars() {
            if !ch.is_whitespace() {
                let block = self.block(pen).offset(origin.0, origin.1);
                mask.fill_rect(block.x0, block.y0, block.x1, block.y1);
            }
            pen += self.advance(ch);
        }
        Vec::new()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinFonts;

impl FontProvider for BuiltinFonts {
    fn resolve(&self, family: &str, font_px: u32) -> ResolvedFace {
        let requested = family.trim();
        ResolvedFace {
            face: Arc::new(BlockFace::new(font_px)),
            requested: requested.to_string(),
            substituted: !requested.is_empty() && requested != BUILTIN_FAMILY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_face_has_integral_metrics_at_twenty_px() {
        let face = BlockFace::new(20);
        assert_eq!(face.metrics(), LineMetrics { ascent: 16.0, descent: 4.0 });
        assert_eq!(face.measure("ab"), 24.0);
        assert_eq!(face.measure(" "), 6.0);
        assert_eq!(
            face.ink_bounds("ab"),
            Some(InkRect { x0: 1.0, y0: -14.0, x1: 23.0, y1: 0.0 })
        );
        assert_eq!(face.ink_bounds("  "), None);
    }

    #[test]
    fn rasterizes_solid_blocks() {
        let face = BlockFace::new(20);
        let mut mask = CoverageMask::new(30, 20);
        let missing = face.rasterize("a", (0.0, 16.0), &mut mask);
        assert!(missing.is_empty());
        assert_eq!(mask.get(1, 2), 255);
        assert_eq!(mask.get(10, 15), 255);
        assert_eq!(mask.get(0, 10), 0);
        assert_eq!(mask.get(11, 10), 0);
        assert_eq!(mask.get(5, 1), 0);
        assert_eq!(mask.get(5, 16), 0);
    }

    #[test]
    fn unknown_family_is_reported_as_substitution() {
        let resolved = BuiltinFonts.resolve("Comic Neue", 24);
        assert!(resolved.substituted);
        assert!(resolved.warning().is_some());
        assert!(BuiltinFonts.resolve("", 24).warning().is_none());
        assert!(BuiltinFonts.resolve(BUILTIN_FAMILY, 24).warning().is_none());
    }
}
