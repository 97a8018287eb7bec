use manhwa_textfx::{
    Color, Fill, FontOptions, FontProvider, GlyphFace, RenderWarning, StyleSpec, SystemFonts,
    render,
};

const CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
];

const FILL: Color = Color::rgb(250, 210, 40);

// None on hosts without any of the candidate fonts
fn one_font() -> Option<SystemFonts> {
    let bytes = CANDIDATES.iter().find_map(|path| std::fs::read(path).ok())?;
    let mut fonts = SystemFonts::new(FontOptions {
        load_system_fonts: false,
        ..FontOptions::default()
    });
    fonts.load_font_data(bytes);
    Some(fonts)
}

#[test]
fn loaded_font_is_listed_and_used_by_default() {
    let Some(fonts) = one_font() else {
        return;
    };
    let families = fonts.families();
    assert_eq!(families.len(), 1);
    let resolved = fonts.resolve("", 32);
    assert_eq!(resolved.face.family(), families[0]);
    assert!(!resolved.substituted);
}

#[test]
fn outline_text_is_painted_in_the_fill_color() {
    let Some(fonts) = one_font() else {
        return;
    };
    let spec = StyleSpec::new("Hig", "", 48, 400).with_fill(Fill::Solid(FILL));
    let result = render(&fonts, &spec).expect("render");
    assert!(result.warnings.is_empty(), "{:?}", result.warnings);

    let mut opaque = 0;
    let mut partial = 0;
    for pixel in result.image.pixels() {
        match pixel[3] {
            0 => assert_eq!(pixel.0, [0, 0, 0, 0]),
            alpha => {
                assert_eq!(&pixel.0[..3], &[FILL.r, FILL.g, FILL.b]);
                if alpha == 255 {
                    opaque += 1;
                } else {
                    partial += 1;
                }
            }
        }
    }
    assert!(opaque > 0);
    // outlines are anti-aliased
    assert!(partial > 0);
}

#[test]
fn unmapped_code_point_is_reported_once() {
    let Some(fonts) = one_font() else {
        return;
    };
    let spec = StyleSpec::new("Hig \u{10FFFD} \u{10FFFD}", "", 32, 400);
    let result = render(&fonts, &spec).expect("render");
    assert_eq!(
        result.warnings,
        vec![RenderWarning::MissingGlyphs {
            chars: vec!['\u{10FFFD}'],
        }]
    );
    assert!(result.image.pixels().any(|pixel| pixel[3] == 255));
}
