use anyhow::{Context, Result, anyhow};
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use tiny_skia::{FillRule, Mask, PathBuilder, Transform};
use tracing::{debug, warn};
use ttf_parser::{Face, GlyphId, OutlineBuilder, name_id};
use usvg::fontdb;

use super::builtin::BlockFace;
use super::{FontProvider, GlyphFace, InkRect, LineMetrics, ResolvedFace, missing_glyph_box};
use crate::mask::CoverageMask;

const DEFAULT_CACHE_CAPACITY: usize = 64;

const SANS_SERIF_FAMILIES: &[&str] = &[
    "DejaVu Sans",
    "Noto Sans",
    "Liberation Sans",
    "Arial",
    "Helvetica",
    "Roboto",
];
const SERIF_FAMILIES: &[&str] = &[
    "DejaVu Serif",
    "Noto Serif",
    "Liberation Serif",
    "Times New Roman",
];
const MONOSPACE_FAMILIES: &[&str] = &[
    "DejaVu Sans Mono",
    "Noto Sans Mono",
    "Liberation Mono",
    "Courier New",
];

#[derive(Debug, Clone)]
pub struct FontOptions {
    pub load_system_fonts: bool,
    pub dirs: Vec<PathBuf>,
    /// Family used when the request is empty, and tried first on fallback.
    pub default_family: Option<String>,
    pub fallback_families: Vec<String>,
    pub cache_capacity: usize,
}

impl Default for FontOptions {
    fn default() -> Self {
        Self {
            load_system_fonts: true,
            dirs: Vec::new(),
            default_family: None,
            fallback_families: vec!["sans-serif".to_string()],
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

struct FaceData {
    bytes: Vec<u8>,
    index: u32,
    family: String,
    units_per_em: u16,
    ascender: i16,
    descender: i16,
    space_advance: u16,
    notdef_advance: u16,
}

impl FaceData {
    fn parse(bytes: Vec<u8>, index: u32, fallback_family: &str) -> Result<Self> {
        let face = Face::parse(&bytes, index)
            .map_err(|err| anyhow!("failed to parse font face {}: {}", index, err))?;
        let units_per_em = face.units_per_em().max(1);
        let space_advance = face
            .glyph_index(' ')
            .and_then(|id| face.glyph_hor_advance(id))
            .unwrap_or(units_per_em / 4);
        let notdef_advance = face
            .glyph_hor_advance(GlyphId(0))
            .filter(|advance| *advance > 0)
            .unwrap_or(units_per_em / 2);
        let family = extract_family_name(&face).unwrap_or_else(|| fallback_family.to_string());
        let ascender = face.ascender();
        let descender = face.descender();
        Ok(Self {
            family,
            units_per_em,
            ascender,
            descender,
            space_advance,
            notdef_advance,
            index,
            bytes,
        })
    }
}

fn extract_family_name(face: &Face<'_>) -> Option<String> {
    let mut fallback = None;
    for name in face.names() {
        if name.name_id == name_id::TYPOGRAPHIC_FAMILY {
            if let Some(value) = name.to_string() {
                return Some(value);
            }
        } else if name.name_id == name_id::FAMILY && fallback.is_none() {
            fallback = name.to_string();
        }
    }
    fallback
}

struct OutlineFace {
    data: Arc<FaceData>,
    px: f32,
    scale: f32,
}

impl OutlineFace {
    fn new(data: Arc<FaceData>, font_px: u32) -> Self {
        let px = font_px as f32;
        let scale = px / data.units_per_em as f32;
        Self { data, px, scale }
    }

    fn with_face<R>(&self, f: impl FnOnce(&Face<'_>) -> R) -> Option<R> {
        Face::parse(&self.data.bytes, self.data.index)
            .ok()
            .map(|face| f(&face))
    }

    fn glyph_advance(&self, face: &Face<'_>, ch: char) -> (u16, Option<GlyphId>) {
        if ch.is_whitespace() {
            return (self.data.space_advance, None);
        }
        match face.glyph_index(ch) {
            Some(glyph) => (
                face.glyph_hor_advance(glyph).unwrap_or(self.data.space_advance),
                Some(glyph),
            ),
            None => (self.data.notdef_advance, None),
        }
    }
}

impl GlyphFace for OutlineFace {
    fn family(&self) -> &str {
        &self.data.family
    }

    fn metrics(&self) -> LineMetrics {
        LineMetrics {
            ascent: self.data.ascender as f32 * self.scale,
            descent: -(self.data.descender as f32) * self.scale,
        }
    }

    fn measure(&self, run: &str) -> f32 {
        self.with_face(|face| {
            let units: u32 = run
                .chars()
                .map(|ch| self.glyph_advance(face, ch).0 as u32)
                .sum();
            units as f32 * self.scale
        })
        .unwrap_or(0.0)
    }

    fn ink_bounds(&self, run: &str) -> Option<InkRect> {
        self.with_face(|face| {
            let mut pen = 0u32;
            let mut bounds: Option<InkRect> = None;
            for ch in run.chars() {
                let (advance, glyph) = self.glyph_advance(face, ch);
                let pen_px = pen as f32 * self.scale;
                let rect = match glyph {
                    Some(glyph) => face.glyph_bounding_box(glyph).map(|bbox| InkRect {
                        x0: pen_px + bbox.x_min as f32 * self.scale,
                        y0: -(bbox.y_max as f32) * self.scale,
                        x1: pen_px + bbox.x_max as f32 * self.scale,
                        y1: -(bbox.y_min as f32) * self.scale,
                    }),
                    None if !ch.is_whitespace() => {
                        let edges = missing_glyph_box(advance as f32 * self.scale, self.px);
                        Some(InkRect {
                            x0: pen_px + edges[0].0,
                            y0: edges[0].1,
                            x1: pen_px + edges[0].2,
                            y1: edges[1].3,
                        })
                    }
                    None => None,
                };
                if let Some(rect) = rect {
                    bounds = Some(bounds.map_or(rect, |b| b.union(rect)));
                }
                pen += advance as u32;
            }
            bounds
        })
        .flatten()
    }

    fn rasterize(&self, run: &str, origin: (f32, f32), mask: &mut CoverageMask) -> Vec<char> {
        let Some((path, missing)) = self.with_face(|face| {
            let mut builder = PathBuilder::new();
            let mut missing = Vec::new();
            let mut pen = 0u32;
            for ch in run.chars() {
                let (advance, glyph) = self.glyph_advance(face, ch);
                let pen_x = origin.0 + pen as f32 * self.scale;
                match glyph {
                    Some(glyph) => {
                        let mut outline = OutlinePen {
                            builder: &mut builder,
                            scale: self.scale,
                            x: pen_x,
                            y: origin.1,
                        };
                        face.outline_glyph(glyph, &mut outline);
                    }
                    None if !ch.is_whitespace() => {
                        let edges = missing_glyph_box(advance as f32 * self.scale, self.px);
                        for (x0, y0, x1, y1) in edges {
                            mask.fill_rect(pen_x + x0, origin.1 + y0, pen_x + x1, origin.1 + y1);
                        }
                        missing.push(ch);
                    }
                    None => {}
                }
                pen += advance as u32;
            }
            (builder.finish(), missing)
        }) else {
            return Vec::new();
        };
        if let Some(path) = path {
            fill_path_into(&path, mask);
        }
        missing
    }
}

// font units, y up -> mask pixels, y down
struct OutlinePen<'a> {
    builder: &'a mut PathBuilder,
    scale: f32,
    x: f32,
    y: f32,
}

impl OutlinePen<'_> {
    fn point(&self, x: f32, y: f32) -> (f32, f32) {
        (self.x + x * self.scale, self.y - y * self.scale)
    }
}

impl OutlineBuilder for OutlinePen<'_> {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.point(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.point(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.point(x1, y1);
        let (x, y) = self.point(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.point(x1, y1);
        let (x2, y2) = self.point(x2, y2);
        let (x, y) = self.point(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

fn fill_path_into(path: &tiny_skia::Path, mask: &mut CoverageMask) {
    let bounds = path.bounds();
    let left = bounds.left().floor().max(0.0);
    let top = bounds.top().floor().max(0.0);
    let right = bounds.right().ceil().min(mask.width() as f32);
    let bottom = bounds.bottom().ceil().min(mask.height() as f32);
    if right <= left || bottom <= top {
        return;
    }
    let (w, h) = ((right - left) as u32, (bottom - top) as u32);
    let Some(mut scratch) = Mask::new(w, h) else {
        return;
    };
    scratch.fill_path(
        path,
        FillRule::Winding,
        true,
        Transform::from_translate(-left, -top),
    );
    mask.blit_max(scratch.data(), w, h, left as i64, top as i64);
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FontKey {
    family: String,
    px: u32,
}

/// Concurrent first use of one (family, size) loads the face once; the other
/// callers block on the same `OnceLock`.
pub struct SystemFonts {
    db: fontdb::Database,
    options: FontOptions,
    sources: Mutex<HashMap<fontdb::ID, Arc<FaceData>>>,
    resolved: Mutex<LruCache<FontKey, Arc<OnceLock<ResolvedFace>>>>,
}

impl SystemFonts {
    pub fn new(options: FontOptions) -> Self {
        let mut db = fontdb::Database::new();
        if options.load_system_fonts {
            db.load_system_fonts();
        }
        for dir in &options.dirs {
            if dir.is_dir() {
                db.load_fonts_dir(dir);
            } else {
                warn!("font directory not found: {}", dir.display());
            }
        }
        assign_generic_families(&mut db);
        debug!("font database ready ({} faces)", db.len());
        let capacity = NonZeroUsize::new(options.cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            db,
            options,
            sources: Mutex::new(HashMap::new()),
            resolved: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn load_font_file(&mut self, path: &Path) -> Result<()> {
        self.db
            .load_font_file(path)
            .with_context(|| format!("failed to read font: {}", path.display()))?;
        self.fonts_changed();
        Ok(())
    }

    pub fn load_font_data(&mut self, data: Vec<u8>) {
        self.db.load_font_data(data);
        self.fonts_changed();
    }

    pub fn face_count(&self) -> usize {
        self.db.len()
    }

    /// Sorted and deduplicated.
    pub fn families(&self) -> Vec<String> {
        family_names(&self.db)
    }

    fn fonts_changed(&mut self) {
        assign_generic_families(&mut self.db);
        lock(&self.resolved).clear();
    }

    fn load(&self, family: &str, font_px: u32) -> ResolvedFace {
        let requested = family.trim();
        if !requested.is_empty() {
            if let Some(data) = self.find_family(requested) {
                return self.scaled(data, requested, font_px, false);
            }
            warn!("font family '{}' not found; falling back", requested);
        }

        let candidates = self
            .options
            .default_family
            .iter()
            .chain(self.options.fallback_families.iter());
        for candidate in candidates {
            if let Some(data) = self.find_family(candidate) {
                return self.scaled(data, requested, font_px, !requested.is_empty());
            }
        }
        if let Some(data) = self.plainest_face() {
            return self.scaled(data, requested, font_px, !requested.is_empty());
        }

        warn!("no usable font faces; using the builtin block face");
        ResolvedFace {
            face: Arc::new(BlockFace::new(font_px)),
            requested: requested.to_string(),
            substituted: true,
        }
    }

    fn scaled(
        &self,
        data: Arc<FaceData>,
        requested: &str,
        font_px: u32,
        substituted: bool,
    ) -> ResolvedFace {
        debug!(
            "resolved font '{}' -> '{}' at {}px",
            requested, data.family, font_px
        );
        ResolvedFace {
            face: Arc::new(OutlineFace::new(data, font_px)),
            requested: requested.to_string(),
            substituted,
        }
    }

    fn find_family(&self, family: &str) -> Option<Arc<FaceData>> {
        let generic = match family.to_ascii_lowercase().as_str() {
            "sans-serif" | "sans" => Some(fontdb::Family::SansSerif),
            "serif" => Some(fontdb::Family::Serif),
            "monospace" => Some(fontdb::Family::Monospace),
            "cursive" => Some(fontdb::Family::Cursive),
            "fantasy" => Some(fontdb::Family::Fantasy),
            _ => None,
        };
        let id = match generic {
            Some(generic) => self.query(generic),
            None => self.query(fontdb::Family::Name(family)).or_else(|| {
                // fontdb matches names exactly; retry with the stored spelling
                let stored = self.db.faces().find_map(|face| {
                    face.families
                        .iter()
                        .find(|(name, _)| name.eq_ignore_ascii_case(family))
                        .map(|(name, _)| name.clone())
                })?;
                self.query(fontdb::Family::Name(&stored))
            }),
        }?;
        self.source(id)
    }

    // upright, closest to regular weight, then by family name
    fn plainest_face(&self) -> Option<Arc<FaceData>> {
        let face = self.db.faces().min_by_key(|face| {
            (
                face.style != fontdb::Style::Normal,
                face.weight.0.abs_diff(fontdb::Weight::NORMAL.0),
                face.families.first().map(|(name, _)| name.clone()),
                face.index,
            )
        })?;
        self.source(face.id)
    }

    fn query(&self, family: fontdb::Family<'_>) -> Option<fontdb::ID> {
        let families = [family];
        let query = fontdb::Query {
            families: &families,
            ..Default::default()
        };
        self.db.query(&query)
    }

    fn source(&self, id: fontdb::ID) -> Option<Arc<FaceData>> {
        if let Some(data) = lock(&self.sources).get(&id) {
            return Some(data.clone());
        }
        let fallback_family = self
            .db
            .face(id)
            .and_then(|info| info.families.first().map(|(name, _)| name.clone()))
            .unwrap_or_default();
        let parsed = self.db.with_face_data(id, |data, index| {
            FaceData::parse(data.to_vec(), index, &fallback_family)
        })?;
        match parsed {
            Ok(data) => {
                let data = Arc::new(data);
                lock(&self.sources).insert(id, data.clone());
                Some(data)
            }
            Err(err) => {
                warn!("skipping unreadable font face: {:#}", err);
                None
            }
        }
    }
}

impl Default for SystemFonts {
    fn default() -> Self {
        Self::new(FontOptions::default())
    }
}

impl FontProvider for SystemFonts {
    fn resolve(&self, family: &str, font_px: u32) -> ResolvedFace {
        let key = FontKey {
            family: family.trim().to_lowercase(),
            px: font_px,
        };
        let cell = {
            let mut cache = lock(&self.resolved);
            match cache.get(&key) {
                Some(cell) => cell.clone(),
                None => {
                    let cell = Arc::new(OnceLock::new());
                    cache.put(key, cell.clone());
                    cell
                }
            }
        };
        cell.get_or_init(|| self.load(family, font_px)).clone()
    }
}

fn family_names(db: &fontdb::Database) -> Vec<String> {
    let mut names: Vec<String> = db
        .faces()
        .flat_map(|face| face.families.iter().map(|(name, _)| name.clone()))
        .collect();
    names.sort();
    names.dedup();
    names
}

fn assign_generic_families(db: &mut fontdb::Database) {
    let names = family_names(db);
    if let Some(name) = pick_generic(&names, SANS_SERIF_FAMILIES, is_sans_serif_name) {
        debug!("sans-serif -> '{}'", name);
        db.set_sans_serif_family(name);
    }
    if let Some(name) = pick_generic(&names, SERIF_FAMILIES, is_serif_name) {
        debug!("serif -> '{}'", name);
        db.set_serif_family(name);
    }
    if let Some(name) = pick_generic(&names, MONOSPACE_FAMILIES, is_monospace_name) {
        debug!("monospace -> '{}'", name);
        db.set_monospace_family(name);
    }
}

fn pick_generic(names: &[String], preferred: &[&str], fits: fn(&str) -> bool) -> Option<String> {
    preferred
        .iter()
        .find(|wanted| names.iter().any(|name| name.as_str() == **wanted))
        .map(|name| name.to_string())
        .or_else(|| names.iter().find(|name| fits(name)).cloned())
}

fn is_sans_serif_name(name: &str) -> bool {
    name.contains("Sans") && !name.contains("Mono") && !name.contains("Math")
}

fn is_serif_name(name: &str) -> bool {
    name.contains("Serif") && !name.contains("Sans")
}

fn is_monospace_name(name: &str) -> bool {
    name.contains("Mono")
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
