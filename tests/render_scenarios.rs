use image::RgbaImage;
use manhwa_textfx::font::BlockFace;
use manhwa_textfx::layout::layout;
use manhwa_textfx::{
    Align, BuiltinFonts, Color, Fill, LineSpacing, ReflectAxis, RenderResult, StyleRecord,
    StyleSpec, render,
};

const FILL: Color = Color::rgb(250, 210, 40);

fn draw(spec: &StyleSpec) -> RenderResult {
    render(&BuiltinFonts, spec).expect("render")
}

fn bubble() -> StyleSpec {
    StyleSpec::new("Kyaa! Watch out", "", 20, 120)
        .with_align(Align::Center)
        .with_fill(Fill::Solid(FILL))
}

#[test]
fn wrapped_lines_fit_the_width() {
    let face = BlockFace::new(20);
    let text = "every token here is shorter than the wrap width";
    for width in [100u32, 160, 240] {
        let out = layout(&face, text, 20, width, Align::Justify, LineSpacing::default());
        assert!(out.lines.len() > 1);
        for line in &out.lines {
            let last = line.runs.last().expect("run");
            assert!(line.x + last.x + last.advance <= width as f32 + 1e-3);
        }
    }
}

#[test]
fn rendering_is_deterministic() {
    let spec = bubble()
        .with_stroke(Color::BLACK, 3)
        .with_glow(Color::rgb(0, 255, 255), 4, 3)
        .with_shadow(Color::rgba(0, 0, 0, 128), 2, 3)
        .with_reflect(ReflectAxis::Vertical);
    let first = draw(&spec);
    let second = draw(&spec);
    assert_eq!(first.image, second.image);
    assert_eq!(first.text_bounds, second.text_bounds);
}

#[test]
fn canvas_grows_monotonically_with_effects() {
    let dims = |spec: StyleSpec| draw(&spec).image.dimensions();
    let mut previous = dims(bubble());
    for width in 1..=6 {
        let current = dims(bubble().with_stroke(Color::BLACK, width));
        assert!(current.0 >= previous.0 && current.1 >= previous.1);
        previous = current;
    }

    let mut previous = dims(bubble());
    for size in 1..=5 {
        let current = dims(bubble().with_glow(Color::WHITE, size, size));
        assert!(current.0 >= previous.0 && current.1 >= previous.1);
        previous = current;
    }

    let mut previous = dims(bubble());
    for offset in 1..=5 {
        let current = dims(bubble().with_shadow(Color::BLACK, -offset, offset / 2));
        assert!(current.0 >= previous.0 && current.1 >= previous.1);
        previous = current;
    }

    let mut previous = dims(bubble());
    for pad in 1..=5 {
        let current = dims(bubble().with_padding(pad));
        assert!(current.0 >= previous.0 && current.1 >= previous.1);
        previous = current;
    }
}

#[test]
fn solid_fill_without_effects_is_fill_color_at_coverage() {
    let result = draw(&StyleSpec::new("Hi there", "", 48, 400).with_fill(Fill::Solid(FILL)));
    let mut opaque = 0;
    for pixel in result.image.pixels() {
        if pixel[3] == 0 {
            assert_eq!(pixel.0, [0, 0, 0, 0]);
        } else {
            assert_eq!(&pixel.0[..3], &[FILL.r, FILL.g, FILL.b]);
            if pixel[3] == 255 {
                opaque += 1;
            }
        }
    }
    assert!(opaque > 0);
}

#[test]
fn vertical_reflection_doubles_height_and_fades_out() {
    let spec = bubble().with_stroke(Color::BLACK, 2);
    let plain = draw(&spec).image;
    let reflected = draw(&spec.with_reflect(ReflectAxis::Vertical)).image;
    let (width, height) = plain.dimensions();
    assert_eq!(reflected.dimensions(), (width, height * 2));
    for x in 0..width {
        assert_eq!(reflected.get_pixel(x, height)[3], plain.get_pixel(x, height - 1)[3]);
        assert_eq!(reflected.get_pixel(x, height * 2 - 1)[3], 0);
        assert_eq!(reflected.get_pixel(x, 0), plain.get_pixel(x, 0));
    }
}

#[test]
fn horizontal_reflection_doubles_width() {
    let plain = draw(&bubble()).image;
    let reflected = draw(&bubble().with_reflect(ReflectAxis::Horizontal)).image;
    assert_eq!(
        reflected.dimensions(),
        (plain.width() * 2, plain.height())
    );
}

#[test]
fn empty_text_yields_padding_sized_transparent_image() {
    let transparent = |image: &RgbaImage| image.pixels().all(|pixel| pixel[3] == 0);

    let result = draw(&StyleSpec::new("", "", 20, 100).with_padding(6));
    assert_eq!(result.image.dimensions(), (12, 12));
    assert!(transparent(&result.image));

    let result = draw(&StyleSpec::new("  \n ", "", 20, 100).with_stroke(Color::BLACK, 5));
    assert_eq!(result.image.dimensions(), (1, 1));
    assert!(transparent(&result.image));
}

#[test]
fn overlong_word_renders_on_one_line() {
    let face = BlockFace::new(48);
    let out = layout(&face, "Hi", 48, 10, Align::Left, LineSpacing::default());
    assert_eq!(out.lines.len(), 1);
    let advance = out.lines[0].runs[0].advance;

    let result = draw(&StyleSpec::new("Hi", "", 48, 10));
    assert!(result.width() as f32 >= advance);
    assert!(result.image.pixels().any(|pixel| pixel[3] > 0));
}

#[test]
fn stroke_grows_canvas_on_every_side() {
    let plain = draw(&bubble());
    let stroked = draw(&bubble().with_stroke(Color::BLACK, 4));
    assert!(stroked.width() >= plain.width() + 8);
    assert!(stroked.height() >= plain.height() + 8);
    assert!(stroked.text_bounds.x >= plain.text_bounds.x + 4);
    assert!(stroked.text_bounds.y >= plain.text_bounds.y + 4);
    assert_eq!(stroked.text_bounds.width, plain.text_bounds.width);
    assert_eq!(stroked.text_bounds.height, plain.text_bounds.height);
}

#[test]
fn equal_corner_gradient_matches_solid_fill() {
    let corners = Fill::FourCorner {
        tl: FILL,
        tr: FILL,
        bl: FILL,
        br: FILL,
    };
    let solid = draw(&bubble().with_stroke(Color::BLACK, 2)).image;
    let gradient = draw(&bubble().with_stroke(Color::BLACK, 2).with_fill(corners)).image;
    assert_eq!(solid, gradient);
}

#[test]
fn linear_gradient_runs_left_to_right_at_zero_degrees() {
    let spec = StyleSpec::new("MMMMMMMM", "", 40, 400).with_fill(Fill::Linear {
        from: Color::rgb(0, 0, 0),
        to: Color::rgb(255, 255, 255),
        angle_deg: 0.0,
    });
    let result = draw(&spec);
    let bounds = result.text_bounds;
    let row = bounds.y + bounds.height / 2;
    let opaque: Vec<u8> = (bounds.x..bounds.x + bounds.width)
        .map(|x| *result.image.get_pixel(x, row))
        .filter(|pixel| pixel[3] == 255)
        .map(|pixel| pixel[0])
        .collect();
    assert!(opaque.len() > 10);
    assert!(opaque.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(opaque[0] < opaque[opaque.len() - 1]);
}

#[test]
fn percent_spacing_wins_over_pixel_spacing() {
    let record = StyleRecord {
        text: "a\nb".to_string(),
        font_px: 20,
        width: 100,
        line_spacing_px: Some(6.0),
        line_spacing_percent: Some(50.0),
        ..StyleRecord::default()
    };
    let spec = StyleSpec::try_from(record).expect("spec");
    let result = draw(&spec);
    // two 20px lines with a 10px gap
    assert_eq!(result.text_bounds.height, 50);
}

#[test]
fn glow_is_symmetric_around_a_single_glyph() {
    let spec = StyleSpec::new("I", "", 20, 12).with_glow(Color::rgb(0, 255, 255), 3, 4);
    let result = draw(&spec);
    let image = &result.image;
    let (width, height) = image.dimensions();
    // the block sits at x 1..11 of a 12px box, so the canvas is mirror-symmetric in x
    for y in 0..height {
        for x in 0..width / 2 {
            let left = image.get_pixel(x, y)[3];
            let right = image.get_pixel(width - 1 - x, y)[3];
            assert!(left.abs_diff(right) <= 1, "({x}, {y}): {left} vs {right}");
        }
    }
}
