use ab_glyph::{point, Font, FontVec, GlyphId, OutlinedGlyph, PxScale, Rect, ScaleFont};
use image::{GrayImage, Luma};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[cfg(target_os = "macos")]
const PLATFORM_FONTS: &[&str] = &[
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/System/Library/Fonts/PingFang.ttc",
];

#[cfg(target_os = "windows")]
const PLATFORM_FONTS: &[&str] = &["C:\\Windows\\Fonts\\arial.ttf", "C:\\Windows\\Fonts\\msgothic.ttc"];

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
const PLATFORM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
];

/// Built-in glyphs are 5x7 cells drawn at a fixed integer scale.
const BUILTIN_SCALE: u32 = 2;
const BUILTIN_COLS: u32 = 5;
const BUILTIN_ROWS: u32 = 7;

pub enum WatermarkFont {
    Outline {
        font: FontVec,
        scale: PxScale,
        path: PathBuf,
    },
    Builtin,
}

impl WatermarkFont {
    /// Tries `extra` paths, then the platform fonts, and settles on the
    /// built-in bitmap font when none of them load.
    pub fn load(font_size: u32, extra: &[PathBuf]) -> Self {
        let candidates = extra
            .iter()
            .cloned()
            .chain(PLATFORM_FONTS.iter().map(PathBuf::from));

        for path in candidates {
            match load_outline(&path) {
                Some(font) => {
                    debug!("フォントを読み込みました: {}", path.display());
                    return Self::Outline {
                        font,
                        scale: PxScale::from(font_size as f32),
                        path,
                    };
                }
                None => debug!("フォントを読み込めませんでした: {}", path.display()),
            }
        }

        debug!("組み込みフォントを使用します (サイズ指定は無視されます)");
        Self::Builtin
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, Self::Builtin)
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Outline { path, .. } => path.display().to_string(),
            Self::Builtin => "builtin".to_string(),
        }
    }

    /// Size of the inked box of `text`.
    pub fn measure(&self, text: &str) -> (u32, u32) {
        match self {
            Self::Outline { font, scale, .. } => {
                let glyphs = layout_outline(font, *scale, text);
                ink_bounds(&glyphs).map_or((0, 0), |bounds| {
                    (bounds.width() as u32, bounds.height() as u32)
                })
            }
            Self::Builtin => builtin_size(text),
        }
    }

    /// Rasterizes `text` into a coverage mask sized by [`Self::measure`].
    pub fn render_mask(&self, text: &str) -> GrayImage {
        match self {
            Self::Outline { font, scale, .. } => {
                draw_outline(&layout_outline(font, *scale, text))
            }
            Self::Builtin => {
                let (width, height) = builtin_size(text);
                let mut mask = GrayImage::new(width.max(1), height.max(1));
                draw_builtin(&mut mask, text);
                mask
            }
        }
    }
}

/// Lays glyphs along a baseline at the font's ascent.
fn layout_outline(font: &FontVec, scale: PxScale, text: &str) -> Vec<OutlinedGlyph> {
    let scaled = font.as_scaled(scale);
    let mut caret = 0.0f32;
    let mut prev: Option<GlyphId> = None;
    let mut glyphs = Vec::new();

    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(prev) = prev {
            caret += scaled.kern(prev, id);
        }
        let glyph = id.with_scale_and_position(scale, point(caret, scaled.ascent()));
        caret += scaled.h_advance(id);
        prev = Some(id);

        if let Some(outlined) = font.outline_glyph(glyph) {
            glyphs.push(outlined);
        }
    }
    glyphs
}

/// Union of the glyph pixel bounds; `None` when nothing is inked.
fn ink_bounds(glyphs: &[OutlinedGlyph]) -> Option<Rect> {
    glyphs.iter().map(OutlinedGlyph::px_bounds).reduce(|acc, b| Rect {
        min: point(acc.min.x.min(b.min.x), acc.min.y.min(b.min.y)),
        max: point(acc.max.x.max(b.max.x), acc.max.y.max(b.max.y)),
    })
}

fn draw_outline(glyphs: &[OutlinedGlyph]) -> GrayImage {
    let Some(bounds) = ink_bounds(glyphs) else {
        return GrayImage::new(1, 1);
    };
    let mut mask = GrayImage::new(
        (bounds.width() as u32).max(1),
        (bounds.height() as u32).max(1),
    );

    for glyph in glyphs {
        let glyph_bounds = glyph.px_bounds();
        // px_bounds are whole pixels, so the offsets are exact.
        let offset_x = (glyph_bounds.min.x - bounds.min.x) as u32;
        let offset_y = (glyph_bounds.min.y - bounds.min.y) as u32;
        glyph.draw(|gx, gy, coverage| {
            let (x, y) = (offset_x + gx, offset_y + gy);
            if x >= mask.width() || y >= mask.height() {
                return;
            }
            let value = (coverage.clamp(0.0, 1.0) * 255.0).round() as u8;
            let pixel = mask.get_pixel_mut(x, y);
            pixel[0] = pixel[0].max(value);
        });
    }
    mask
}

fn load_outline(path: &Path) -> Option<FontVec> {
    let data = fs::read(path).ok()?;
    FontVec::try_from_vec(data).ok()
}

fn builtin_size(text: &str) -> (u32, u32) {
    let chars = text.chars().count() as u32;
    if chars == 0 {
        return (0, 0);
    }
    let advance = (BUILTIN_COLS + 1) * BUILTIN_SCALE;
    (
        chars * advance - BUILTIN_SCALE,
        BUILTIN_ROWS * BUILTIN_SCALE,
    )
}

fn draw_builtin(mask: &mut GrayImage, text: &str) {
    let advance = (BUILTIN_COLS + 1) * BUILTIN_SCALE;
    for (index, ch) in text.chars().enumerate() {
        let origin_x = index as u32 * advance;
        for (row, bits) in glyph(ch).iter().enumerate() {
            for col in 0..BUILTIN_COLS {
                if bits & (1 << (BUILTIN_COLS - 1 - col)) == 0 {
                    continue;
                }
                for dy in 0..BUILTIN_SCALE {
                    for dx in 0..BUILTIN_SCALE {
                        let x = origin_x + col * BUILTIN_SCALE + dx;
                        let y = row as u32 * BUILTIN_SCALE + dy;
                        if x < mask.width() && y < mask.height() {
                            mask.put_pixel(x, y, Luma([255]));
                        }
                    }
                }
            }
        }
    }
}

fn glyph(ch: char) -> [u8; 7] {
    match ch {
        '0' => [0x0E, 0x11, 0x13, 0x15, 0x19, 0x11, 0x0E],
        '1' => [0x04, 0x0C, 0x04, 0x04, 0x04, 0x04, 0x0E],
        '2' => [0x0E, 0x11, 0x01, 0x02, 0x04, 0x08, 0x1F],
        '3' => [0x1F, 0x02, 0x04, 0x02, 0x01, 0x11, 0x0E],
        '4' => [0x02, 0x06, 0x0A, 0x12, 0x1F, 0x02, 0x02],
        '5' => [0x1F, 0x10, 0x1E, 0x01, 0x01, 0x11, 0x0E],
        '6' => [0x06, 0x08, 0x10, 0x1E, 0x11, 0x11, 0x0E],
        '7' => [0x1F, 0x01, 0x02, 0x04, 0x08, 0x08, 0x08],
        '8' => [0x0E, 0x11, 0x11, 0x0E, 0x11, 0x11, 0x0E],
        '9' => [0x0E, 0x11, 0x11, 0x0F, 0x01, 0x02, 0x0C],
        '-' => [0x00, 0x00, 0x00, 0x1F, 0x00, 0x00, 0x00],
        ':' => [0x00, 0x0C, 0x0C, 0x00, 0x0C, 0x0C, 0x00],
        '/' => [0x01, 0x01, 0x02, 0x04, 0x08, 0x10, 0x10],
        ' ' => [0x00; 7],
        // unknown
        _ => [0x1F, 0x11, 0x11, 0x11, 0x11, 0x11, 0x1F],
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use imageproc::drawing::draw_text_mut;

    /// First platform font that loads, for tests exercising outline rendering.
    pub(crate) fn platform_outline(font_size: u32) -> Option<WatermarkFont> {
        PLATFORM_FONTS.iter().find_map(|path| {
            load_outline(Path::new(path)).map(|font| WatermarkFont::Outline {
                font,
                scale: PxScale::from(font_size as f32),
                path: PathBuf::from(path),
            })
        })
    }

    fn ink_total(image: &GrayImage) -> u64 {
        image.pixels().map(|p| p[0] as u64).sum()
    }

    #[test]
    fn outline_mask_keeps_every_inked_pixel() {
        let Some(font) = platform_outline(30) else {
            // no outline font on this host
            return;
        };
        let WatermarkFont::Outline { font: face, scale, .. } = &font else {
            unreachable!("platform_outline returns outline fonts");
        };

        for text in ["2023-05-17", "gjpqy"] {
            let mask = font.render_mask(text);
            assert_eq!(mask.dimensions(), font.measure(text), "text {text:?}");

            // Reference rasterization on a canvas with plenty of room.
            let mut reference = GrayImage::new(mask.width() + 200, mask.height() + 200);
            draw_text_mut(&mut reference, Luma([255]), 100, 100, *scale, face, text);
            let reference_total = ink_total(&reference);
            let mask_total = ink_total(&mask);
            assert!(reference_total > 0);
            let diff = reference_total.abs_diff(mask_total);
            assert!(
                diff * 100 <= reference_total,
                "text {text:?}: mask ink {mask_total}, reference ink {reference_total}"
            );
        }
    }

    #[test]
    fn outline_measure_grows_with_font_size() {
        let (Some(small), Some(large)) = (platform_outline(20), platform_outline(60)) else {
            return;
        };
        let (sw, sh) = small.measure("2023-05-17");
        let (lw, lh) = large.measure("2023-05-17");
        assert!(lw > sw * 2 && lh > sh * 2);
        assert_eq!(small.measure(""), (0, 0));
        assert_eq!(small.measure("   "), (0, 0));
    }

    #[test]
    fn missing_fonts_settle_on_builtin() {
        let font = WatermarkFont::load(30, &[PathBuf::from("/definitely/not/a/font.ttf")]);
        // Platform fonts may exist on the host; only assert when they don't.
        if PLATFORM_FONTS.iter().all(|p| !Path::new(p).exists()) {
            assert!(font.is_builtin());
            assert_eq!(font.describe(), "builtin");
        }
    }

    #[test]
    fn builtin_measure_ignores_requested_size() {
        let font = WatermarkFont::Builtin;
        assert_eq!(font.measure("2023-05-17"), (118, 14));
        assert_eq!(font.measure(""), (0, 0));
    }

    #[test]
    fn builtin_mask_covers_glyph_pixels() {
        let mask = WatermarkFont::Builtin.render_mask("-");
        assert_eq!(mask.dimensions(), (10, 14));
        // middle bar row 3, scaled by 2
        assert_eq!(mask.get_pixel(0, 6)[0], 255);
        assert_eq!(mask.get_pixel(9, 7)[0], 255);
        assert_eq!(mask.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn non_font_file_is_skipped() {
        let temp = tempfile::tempdir().expect("tempdir");
        let bogus = temp.path().join("bogus.ttf");
        fs::write(&bogus, b"not a font").expect("write bogus");
        assert!(load_outline(&bogus).is_none());
    }
}
