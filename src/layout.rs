use tracing::debug;

use crate::font::GlyphFace;
use crate::style::{Align, LineSpacing};

#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub text: String,
    pub x: f32,
    pub advance: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub runs: Vec<Run>,
    pub x: f32,
    pub baseline: f32,
    pub width: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub lines: Vec<Line>,
    /// The wrap width, or the widest line when one token overflows it.
    pub width: f32,
    pub height: f32,
    pub ascent: f32,
    pub descent: f32,
    pub gap: f32,
}

impl TextLayout {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

struct PendingLine<'a> {
    tokens: Vec<(&'a str, f32)>,
    width: f32,
    ends_paragraph: bool,
}

pub fn layout(
    face: &dyn GlyphFace,
    text: &str,
    font_px: u32,
    width_px: u32,
    align: Align,
    line_spacing: LineSpacing,
) -> TextLayout {
    let metrics = face.metrics();
    let gap = line_spacing.gap_px(font_px);
    if text.trim().is_empty() {
        return TextLayout {
            lines: Vec::new(),
            width: 0.0,
            height: 0.0,
            ascent: metrics.ascent,
            descent: metrics.descent,
            gap,
        };
    }

    let wrap_width = width_px as f32;
    let space = face.measure(" ");
    let pending = wrap_paragraphs(face, text, wrap_width, space);

    let box_width = pending
        .iter()
        .map(|line| line.width)
        .fold(wrap_width, f32::max);
    let line_height = metrics.line_height();

    let lines: Vec<Line> = pending
        .into_iter()
        .enumerate()
        .map(|(idx, pending)| {
            let baseline = metrics.ascent + idx as f32 * (line_height + gap);
            place_line(pending, baseline, box_width, space, align)
        })
        .collect();

    let count = lines.len() as f32;
    let height = count * line_height + (count - 1.0) * gap;
    debug!(
        "layout: {} lines, box {:.1}x{:.1}, gap {}",
        lines.len(),
        box_width,
        height,
        gap
    );
    TextLayout {
        lines,
        width: box_width,
        height,
        ascent: metrics.ascent,
        descent: metrics.descent,
        gap,
    }
}

fn wrap_paragraphs<'a>(
    face: &dyn GlyphFace,
    text: &'a str,
    wrap_width: f32,
    space: f32,
) -> Vec<PendingLine<'a>> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let paragraph = paragraph.strip_suffix('\r').unwrap_or(paragraph);
        let mut current = PendingLine {
            tokens: Vec::new(),
            width: 0.0,
            ends_paragraph: false,
        };
        for token in paragraph.split_whitespace() {
            let advance = face.measure(token);
            if current.tokens.is_empty() {
                current.tokens.push((token, advance));
                current.width = advance;
                continue;
            }
            let extended = current.width + space + advance;
            if extended <= wrap_width {
                current.tokens.push((token, advance));
                current.width = extended;
            } else {
                lines.push(current);
                current = PendingLine {
                    tokens: vec![(token, advance)],
                    width: advance,
                    ends_paragraph: false,
                };
            }
        }
        current.ends_paragraph = true;
        lines.push(current);
    }
    lines
}

fn place_line(
    pending: PendingLine<'_>,
    baseline: f32,
    box_width: f32,
    space: f32,
    align: Align,
) -> Line {
    let slack = (box_width - pending.width).max(0.0);
    let gaps = pending.tokens.len().saturating_sub(1);
    let stretch = align == Align::Justify && !pending.ends_paragraph && gaps > 0;
    let (x, word_gap) = match align {
        Align::Left => (0.0, space),
        Align::Right => (slack, space),
        Align::Center => (slack / 2.0, space),
        Align::Justify if stretch => (0.0, space + slack / gaps as f32),
        Align::Justify => (0.0, space),
    };

    let mut pen = 0.0;
    let mut runs = Vec::with_capacity(pending.tokens.len());
    for (idx, (token, advance)) in pending.tokens.into_iter().enumerate() {
        if idx > 0 {
            pen += word_gap;
        }
        runs.push(Run {
            text: token.to_string(),
            x: pen,
            advance,
        });
        pen += advance;
    }
    let width = if stretch { box_width } else { pending.width };
    Line {
        runs,
        x,
        baseline,
        width,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::BlockFace;

    // BlockFace at 20px: advance 12 per character, space 6, ascent 16, descent 4.
    fn face() -> BlockFace {
        BlockFace::new(20)
    }

    fn texts(line: &Line) -> Vec<&str> {
        line.runs.iter().map(|run| run.text.as_str()).collect()
    }

    #[test]
    fn wraps_greedily_within_width() {
        // "aa bb" = 24 + 6 + 24 = 54
        let out = layout(&face(), "aa bb cc dd", 20, 54, Align::Left, LineSpacing::default());
        assert_eq!(out.lines.len(), 2);
        assert_eq!(texts(&out.lines[0]), vec!["aa", "bb"]);
        assert_eq!(texts(&out.lines[1]), vec!["cc", "dd"]);
        for line in &out.lines {
            assert!(line.width <= 54.0);
        }
    }

    #[test]
    fn no_line_exceeds_width_when_every_token_fits() {
        let text = "the quick brown fox jumps over the lazy dog again and again";
        for width in [120u32, 150, 200, 333] {
            let out = layout(&face(), text, 20, width, Align::Left, LineSpacing::default());
            for line in &out.lines {
                assert!(line.width <= width as f32, "{} > {}", line.width, width);
            }
        }
    }

    #[test]
    fn overlong_token_gets_its_own_line() {
        let out = layout(&face(), "a abcdefgh b", 20, 40, Align::Left, LineSpacing::default());
        assert_eq!(out.lines.len(), 3);
        assert_eq!(texts(&out.lines[1]), vec!["abcdefgh"]);
        assert_eq!(out.width, 96.0);
    }

    #[test]
    fn explicit_breaks_start_new_paragraphs() {
        let out = layout(&face(), "a\r\n\nb", 20, 200, Align::Left, LineSpacing::default());
        assert_eq!(out.lines.len(), 3);
        assert!(out.lines[1].runs.is_empty());
        assert_eq!(texts(&out.lines[2]), vec!["b"]);
    }

    #[test]
    fn baselines_follow_line_height_and_gap() {
        let out = layout(&face(), "a\nb\nc", 20, 100, Align::Left, LineSpacing::Pixels(5.0));
        let baselines: Vec<f32> = out.lines.iter().map(|line| line.baseline).collect();
        assert_eq!(baselines, vec![16.0, 41.0, 66.0]);
        assert_eq!(out.height, 3.0 * 20.0 + 2.0 * 5.0);
    }

    #[test]
    fn percent_spacing_uses_rounded_font_fraction() {
        let out = layout(&face(), "a\nb", 20, 100, Align::Left, LineSpacing::Percent(33.0));
        assert_eq!(out.gap, 7.0);
        assert_eq!(out.lines[1].baseline, 16.0 + 27.0);
    }

    #[test]
    fn alignment_offsets() {
        // "ab" = 24 wide in a 100px box
        let right = layout(&face(), "ab", 20, 100, Align::Right, LineSpacing::default());
        assert_eq!(right.lines[0].x, 76.0);
        let center = layout(&face(), "ab", 20, 100, Align::Center, LineSpacing::default());
        assert_eq!(center.lines[0].x, 38.0);
        let left = layout(&face(), "ab", 20, 100, Align::Left, LineSpacing::default());
        assert_eq!(left.lines[0].x, 0.0);
    }

    #[test]
    fn justify_stretches_all_but_last_line() {
        // width 100: "aa bb cc" = 84 fits, "dd" wraps
        let out = layout(&face(), "aa bb cc dd", 20, 100, Align::Justify, LineSpacing::default());
        assert_eq!(out.lines.len(), 2);
        let first = &out.lines[0];
        let last_run = first.runs.last().expect("run");
        assert_eq!(last_run.x + last_run.advance, 100.0);
        assert_eq!(first.width, 100.0);
        assert_eq!(first.x, 0.0);
        let second = &out.lines[1];
        assert_eq!(second.x, 0.0);
        assert_eq!(second.width, 24.0);
    }

    #[test]
    fn single_token_line_is_not_stretched() {
        let out = layout(&face(), "abcdefgh ab", 20, 40, Align::Justify, LineSpacing::default());
        assert_eq!(out.lines[0].runs[0].x, 0.0);
        assert_eq!(out.lines[0].width, 96.0);
    }

    #[test]
    fn whitespace_only_text_has_no_lines() {
        for text in ["", "   ", "\n\t \n"] {
            let out = layout(&face(), text, 20, 100, Align::Center, LineSpacing::default());
            assert!(out.is_empty());
            assert_eq!(out.height, 0.0);
            assert_eq!(out.width, 0.0);
        }
    }

    #[test]
    fn layout_is_idempotent() {
        let run = || {
            layout(
                &face(),
                "Привет, мир!\nЭто тест длинной строки",
                20,
                130,
                Align::Justify,
                LineSpacing::Percent(50.0),
            )
        };
        assert_eq!(run(), run());
    }
}
