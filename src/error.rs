use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("invalid parameter `{field}`: {reason}")]
    InvalidParameter { field: &'static str, reason: String },
    #[error("canvas {width}x{height} exceeds the {limit}px limit")]
    CanvasTooLarge { width: u64, height: u64, limit: u32 },
    #[error("render aborted: {0}")]
    Aborted(String),
}

impl RenderError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            field,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderWarning {
    #[error("font family '{requested}' is unavailable; rendered with '{used}'")]
    FontSubstituted { requested: String, used: String },
    #[error("no glyph for {}; drawn as missing-glyph boxes", format_chars(.chars))]
    MissingGlyphs { chars: Vec<char> },
    #[error("{effect} {requested}px exceeds the {applied}px limit")]
    EffectClamped {
        effect: &'static str,
        requested: u32,
        applied: u32,
    },
}

fn format_chars(chars: &[char]) -> String {
    chars
        .iter()
        .map(|ch| format!("U+{:04X}", *ch as u32))
        .collect::<Vec<_>>()
        .join(", ")
}
