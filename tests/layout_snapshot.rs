use manhwa_textfx::font::BlockFace;
use manhwa_textfx::layout::{TextLayout, layout};
use manhwa_textfx::{Align, LineSpacing};

fn describe(out: &TextLayout) -> String {
    let mut lines = vec![format!("box {}x{} gap {}", out.width, out.height, out.gap)];
    for line in &out.lines {
        let runs: Vec<String> = line
            .runs
            .iter()
            .map(|run| format!("{}@{}", run.text, run.x))
            .collect();
        lines.push(format!(
            "{} x={} w={} | {}",
            line.baseline,
            line.x,
            line.width,
            runs.join(" ")
        ));
    }
    lines.join("\n")
}

#[test]
fn centered_layout_geometry() {
    let face = BlockFace::new(20);
    let out = layout(
        &face,
        "Wham! the door\nflew open",
        20,
        100,
        Align::Center,
        LineSpacing::Pixels(4.0),
    );
    insta::assert_snapshot!(describe(&out), @r"
    box 100x92 gap 4
    16 x=20 w=60 | Wham!@0
    40 x=5 w=90 | the@0 door@42
    64 x=26 w=48 | flew@0
    88 x=26 w=48 | open@0
    ");
}
