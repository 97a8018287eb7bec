use anyhow::{Context, Result, anyhow};
use image::ImageFormat;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

mod compose;
pub mod error;
pub mod font;
pub mod layout;
pub mod logging;
pub mod mask;
pub mod render;
pub mod settings;
pub mod style;
mod test_util;

pub use compose::{MAX_CANVAS_SIDE, MAX_EFFECT_RADIUS};
pub use error::{RenderError, RenderWarning};
pub use font::{BuiltinFonts, FontOptions, FontProvider, GlyphFace, SystemFonts};
pub use render::{RenderResult, TextBounds, render, render_many};
pub use style::{
    Align, Color, Fill, Glow, LineSpacing, MAX_EXTRA_PADDING, ReflectAxis, Shadow, Stroke,
    StyleRecord, StyleSpec,
};

/// Directory the editor reads rendered bubble text from.
pub const DEFAULT_BATCH_DIR: &str = "text_images";

#[derive(Debug, Clone)]
pub struct Config {
    pub settings_path: Option<String>,
    pub job: Job,
}

#[derive(Debug, Clone)]
pub enum Job {
    Render {
        style: Option<PathBuf>,
        text: Option<String>,
        out: PathBuf,
    },
    Batch { input: PathBuf, out_dir: PathBuf },
}

#[derive(Debug, Clone, Deserialize)]
struct BatchEntry {
    id: String,
    #[serde(flatten)]
    style: StyleRecord,
}

pub fn run(config: Config) -> Result<String> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;
    let fonts = SystemFonts::new(settings.font_options());
    execute(&fonts, settings.worker_count(), config.job)
}

fn execute(fonts: &dyn FontProvider, workers: usize, job: Job) -> Result<String> {
    match job {
        Job::Render { style, text, out } => {
            let mut record = match style.as_deref() {
                Some(path) => load_style_record(path)?,
                None => StyleRecord::default(),
            };
            if let Some(text) = text {
                record.text = text;
            }
            let spec = StyleSpec::try_from(record).context("invalid style")?;
            let result = render(fonts, &spec)?;
            save_image(&result, &out)?;
            Ok(format_render_output(&out, &result))
        }
        Job::Batch { input, out_dir } => run_batch(fonts, workers, &input, &out_dir),
    }
}

fn run_batch(
    fonts: &dyn FontProvider,
    workers: usize,
    input: &Path,
    out_dir: &Path,
) -> Result<String> {
    let content = fs::read_to_string(input)
        .with_context(|| format!("failed to read batch manifest: {}", input.display()))?;
    let entries: Vec<BatchEntry> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse batch manifest: {}", input.display()))?;
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create output directory: {}", out_dir.display()))?;

    let total = entries.len();
    let mut failures = Vec::new();
    let mut jobs = Vec::new();
    let mut taken = HashSet::new();
    for (idx, entry) in entries.into_iter().enumerate() {
        let name = unique_stem(sanitize_id(&entry.id, idx), &mut taken);
        if name != entry.id.trim() {
            info!("bubble '{}' written as {}.png", entry.id, name);
        }
        match StyleSpec::try_from(entry.style) {
            Ok(spec) => jobs.push((name, spec)),
            Err(err) => failures.push(format!("{}: {}", name, err)),
        }
    }

    let specs: Vec<StyleSpec> = jobs.iter().map(|(_, spec)| spec.clone()).collect();
    let results = render_many(fonts, &specs, workers);
    let mut lines = Vec::new();
    for ((name, _), result) in jobs.iter().zip(results) {
        let outcome = result
            .map_err(anyhow::Error::from)
            .and_then(|result| {
                let path = out_dir.join(format!("{}.png", name));
                save_image(&result, &path)?;
                Ok(format_render_output(&path, &result))
            });
        match outcome {
            Ok(line) => lines.push(line),
            Err(err) => failures.push(format!("{}: {:#}", name, err)),
        }
    }

    if !failures.is_empty() {
        for failure in &failures {
            warn!("bubble failed: {}", failure);
        }
        return Err(anyhow!(
            "{} of {} bubbles failed:\n{}",
            failures.len(),
            total,
            failures.join("\n")
        ));
    }
    lines.push(format!("rendered {} bubbles into {}", total, out_dir.display()));
    Ok(lines.join("\n"))
}

fn load_style_record(path: &Path) -> Result<StyleRecord> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read style: {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse style: {}", path.display()))
    } else {
        toml::from_str(&content)
            .with_context(|| format!("failed to parse style: {}", path.display()))
    }
}

fn save_image(result: &RenderResult, path: &Path) -> Result<()> {
    let format = ImageFormat::from_path(path)
        .with_context(|| format!("unsupported image format: {}", path.display()))?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }
    result
        .image
        .save_with_format(path, format)
        .with_context(|| format!("failed to write image: {}", path.display()))?;
    info!("wrote {} ({}x{})", path.display(), result.width(), result.height());
    Ok(())
}

fn format_render_output(path: &Path, result: &RenderResult) -> String {
    let bounds = result.text_bounds;
    let mut output = format!(
        "{}\t{}x{}\ttext {},{} {}x{}",
        path.display(),
        result.width(),
        result.height(),
        bounds.x,
        bounds.y,
        bounds.width,
        bounds.height
    );
    for warning in &result.warnings {
        output.push_str(&format!("\nwarning: {}", warning));
    }
    output
}

fn sanitize_id(id: &str, idx: usize) -> String {
    let cleaned: String = id
        .trim()
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        format!("bubble-{}", idx)
    } else {
        cleaned
    }
}

// ids that sanitize to the same stem get -2, -3, ... in manifest order
fn unique_stem(stem: String, taken: &mut HashSet<String>) -> String {
    if taken.insert(stem.clone()) {
        return stem;
    }
    let mut suffix = 2;
    loop {
        let candidate = format!("{}-{}", stem, suffix);
        if taken.insert(candidate.clone()) {
            warn!("bubble file name '{}' already used; writing '{}'", stem, candidate);
            return candidate;
        }
        suffix += 1;
    }
}
