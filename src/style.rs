use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::error::RenderError;

pub const MAX_EXTRA_PADDING: u32 = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::rgba(r, g, b, 255)
    }
}

impl FromStr for Color {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parsed = csscolorparser::parse(value.trim())
            .map_err(|err| format!("invalid color '{}': {}", value, err))?;
        let [r, g, b, a] = parsed.to_rgba8();
        Ok(Self { r, g, b, a })
    }
}

impl TryFrom<String> for Color {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:02x}{:02x}{:02x}{:02x}",
            self.r, self.g, self.b, self.a
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineSpacing {
    Pixels(f32),
    /// Percent of the nominal font size, rounded to whole pixels.
    Percent(f32),
}

impl Default for LineSpacing {
    fn default() -> Self {
        Self::Pixels(0.0)
    }
}

impl LineSpacing {
    pub fn gap_px(self, font_px: u32) -> f32 {
        match self {
            Self::Pixels(px) => px,
            Self::Percent(percent) => (font_px as f32 * percent / 100.0).round(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Fill {
    Solid(Color),
    /// Two-color gradient; 0° runs left to right, angles turn clockwise.
    Linear { from: Color, to: Color, angle_deg: f32 },
    FourCorner {
        tl: Color,
        tr: Color,
        bl: Color,
        br: Color,
    },
}

impl Default for Fill {
    fn default() -> Self {
        Self::Solid(Color::WHITE)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stroke {
    pub color: Color,
    pub width: u32,
}

impl Stroke {
    pub fn is_noop(&self) -> bool {
        self.width == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Glow {
    pub color: Color,
    pub radius: u32,
    pub softness: u32,
}

impl Glow {
    pub fn is_noop(&self) -> bool {
        self.radius == 0 && self.softness == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shadow {
    pub color: Color,
    pub dx: i32,
    pub dy: i32,
}

impl Shadow {
    pub fn is_noop(&self) -> bool {
        self.dx == 0 && self.dy == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReflectAxis {
    #[serde(alias = "x")]
    Horizontal,
    #[serde(alias = "y")]
    Vertical,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyleSpec {
    pub text: String,
    /// Empty means "the provider's default family".
    pub font_family: String,
    pub font_px: u32,
    pub width_px: u32,
    pub line_spacing: LineSpacing,
    pub align: Align,
    pub extra_vpadding: u32,
    pub fill: Fill,
    pub stroke: Option<Stroke>,
    pub glow: Option<Glow>,
    pub shadow: Option<Shadow>,
    pub reflect: Option<ReflectAxis>,
}

impl StyleSpec {
    pub fn new(
        text: impl Into<String>,
        font_family: impl Into<String>,
        font_px: u32,
        width_px: u32,
    ) -> Self {
        Self {
            text: text.into(),
            font_family: font_family.into(),
            font_px,
            width_px,
            line_spacing: LineSpacing::default(),
            align: Align::default(),
            extra_vpadding: 0,
            fill: Fill::default(),
            stroke: None,
            glow: None,
            shadow: None,
            reflect: None,
        }
    }

    pub fn with_align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn with_line_spacing(mut self, spacing: LineSpacing) -> Self {
        self.line_spacing = spacing;
        self
    }

    pub fn with_padding(mut self, extra_vpadding: u32) -> Self {
        self.extra_vpadding = extra_vpadding;
        self
    }

    pub fn with_fill(mut self, fill: Fill) -> Self {
        self.fill = fill;
        self
    }

    pub fn with_stroke(mut self, color: Color, width: u32) -> Self {
        self.stroke = Some(Stroke { color, width });
        self
    }

    pub fn with_glow(mut self, color: Color, radius: u32, softness: u32) -> Self {
        self.glow = Some(Glow {
            color,
            radius,
            softness,
        });
        self
    }

    pub fn with_shadow(mut self, color: Color, dx: i32, dy: i32) -> Self {
        self.shadow = Some(Shadow { color, dx, dy });
        self
    }

    pub fn with_reflect(mut self, axis: ReflectAxis) -> Self {
        self.reflect = Some(axis);
        self
    }

    pub fn validate(&self) -> Result<(), RenderError> {
        if self.font_px == 0 {
            return Err(RenderError::invalid("font_px", "must be positive"));
        }
        if self.width_px == 0 {
            return Err(RenderError::invalid("width_px", "must be positive"));
        }
        let spacing = match self.line_spacing {
            LineSpacing::Pixels(px) => ("line_spacing_px", px),
            LineSpacing::Percent(percent) => ("line_spacing_percent", percent),
        };
        if !spacing.1.is_finite() || spacing.1 < 0.0 {
            return Err(RenderError::invalid(
                spacing.0,
                format!("must be a non-negative number, got {}", spacing.1),
            ));
        }
        if self.extra_vpadding > MAX_EXTRA_PADDING {
            return Err(RenderError::invalid(
                "extra_vpadding",
                format!(
                    "{} exceeds the {}px limit",
                    self.extra_vpadding, MAX_EXTRA_PADDING
                ),
            ));
        }
        if let Fill::Linear { angle_deg, .. } = self.fill {
            if !angle_deg.is_finite() {
                return Err(RenderError::invalid(
                    "gradient_angle_deg",
                    "must be a finite angle",
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Corners {
    pub tl: Color,
    pub tr: Color,
    pub bl: Color,
    pub br: Color,
}

/// Per-bubble style record in the editor's field layout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StyleRecord {
    pub text: String,
    pub font_family: String,
    pub font_px: i64,
    pub color: Option<Color>,
    pub width: i64,
    pub line_spacing_px: Option<f32>,
    pub line_spacing_percent: Option<f32>,
    pub align: Align,
    pub stroke_color: Option<Color>,
    pub stroke_width: u32,
    pub glow_color: Option<Color>,
    pub glow_radius: u32,
    pub glow_softness: u32,
    pub shadow_offset: Option<(i32, i32)>,
    pub shadow_color: Option<Color>,
    pub gradient: Option<(Color, Color)>,
    pub gradient_angle_deg: f32,
    pub gradient4: Option<Corners>,
    pub extra_vpadding: u32,
    pub reflect: Option<ReflectAxis>,
}

impl Default for StyleRecord {
    fn default() -> Self {
        Self {
            text: String::new(),
            font_family: String::new(),
            font_px: 48,
            color: None,
            width: 800,
            line_spacing_px: None,
            line_spacing_percent: None,
            align: Align::Left,
            stroke_color: None,
            stroke_width: 0,
            glow_color: None,
            glow_radius: 0,
            glow_softness: 0,
            shadow_offset: None,
            shadow_color: None,
            gradient: None,
            gradient_angle_deg: 0.0,
            gradient4: None,
            extra_vpadding: 0,
            reflect: None,
        }
    }
}

impl TryFrom<StyleRecord> for StyleSpec {
    type Error = RenderError;

    fn try_from(record: StyleRecord) -> Result<Self, Self::Error> {
        let font_px = positive_px("font_px", record.font_px)?;
        let width_px = positive_px("width_px", record.width)?;

        let fill = match (record.gradient, record.gradient4) {
            (Some(_), Some(_)) => {
                return Err(RenderError::invalid(
                    "fill",
                    "gradient and gradient4 are mutually exclusive",
                ));
            }
            (Some((from, to)), None) => Fill::Linear {
                from,
                to,
                angle_deg: record.gradient_angle_deg,
            },
            (None, Some(corners)) => Fill::FourCorner {
                tl: corners.tl,
                tr: corners.tr,
                bl: corners.bl,
                br: corners.br,
            },
            (None, None) => Fill::Solid(record.color.unwrap_or(Color::WHITE)),
        };

        // percent wins when both are present
        let line_spacing = match (record.line_spacing_percent, record.line_spacing_px) {
            (Some(percent), _) => LineSpacing::Percent(percent),
            (None, Some(px)) => LineSpacing::Pixels(px),
            (None, None) => LineSpacing::default(),
        };

        let spec = StyleSpec {
            text: record.text,
            font_family: record.font_family,
            font_px,
            width_px,
            line_spacing,
            align: record.align,
            extra_vpadding: record.extra_vpadding,
            fill,
            stroke: record.stroke_color.map(|color| Stroke {
                color,
                width: record.stroke_width,
            }),
            glow: record.glow_color.map(|color| Glow {
                color,
                radius: record.glow_radius,
                softness: record.glow_softness,
            }),
            shadow: record
                .shadow_color
                .zip(record.shadow_offset)
                .map(|(color, (dx, dy))| Shadow { color, dx, dy }),
            reflect: record.reflect,
        };
        spec.validate()?;
        Ok(spec)
    }
}

fn positive_px(field: &'static str, value: i64) -> Result<u32, RenderError> {
    if value <= 0 {
        return Err(RenderError::invalid(
            field,
            format!("must be positive, got {}", value),
        ));
    }
    u32::try_from(value)
        .map_err(|_| RenderError::invalid(field, format!("{} is out of range", value)))
}
