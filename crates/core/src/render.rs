use crate::font::WatermarkFont;
use crate::watermark::Position;
use anyhow::{Context, Result};
use image::{DynamicImage, GrayImage, ImageReader, Rgba, RgbaImage};
use std::path::Path;

pub const SHADOW_COLOR: Rgba<u8> = Rgba([0, 0, 0, 128]);
pub const SHADOW_OFFSET: i32 = 1;

/// Draws `text` with a drop shadow onto `image` and returns the origin used.
pub fn draw_watermark(
    image: &mut RgbaImage,
    text: &str,
    font: &WatermarkFont,
    color: Rgba<u8>,
    position: Position,
) -> (i32, i32) {
    let mask = font.render_mask(text);
    let (x, y) = position.origin(image.dimensions(), font.measure(text));

    composite_mask(image, &mask, x + SHADOW_OFFSET, y + SHADOW_OFFSET, SHADOW_COLOR);
    composite_mask(image, &mask, x, y, color);
    (x, y)
}

/// Source-over blend of `color` through a coverage `mask` placed at (x, y).
/// Pixels falling outside `image` are clipped.
pub fn composite_mask(image: &mut RgbaImage, mask: &GrayImage, x: i32, y: i32, color: Rgba<u8>) {
    if color[3] == 0 {
        return;
    }

    let (img_w, img_h) = (image.width() as i64, image.height() as i64);
    for (mx, my, coverage) in mask.enumerate_pixels() {
        if coverage[0] == 0 {
            continue;
        }
        let tx = x as i64 + mx as i64;
        let ty = y as i64 + my as i64;
        if tx < 0 || ty < 0 || tx >= img_w || ty >= img_h {
            continue;
        }

        let src_a = (color[3] as f32 / 255.0) * (coverage[0] as f32 / 255.0);
        let dst = image.get_pixel_mut(tx as u32, ty as u32);
        let dst_a = dst[3] as f32 / 255.0;
        let out_a = src_a + dst_a * (1.0 - src_a);
        if out_a <= 0.0 {
            continue;
        }

        for channel in 0..3 {
            let src = color[channel] as f32;
            let below = dst[channel] as f32;
            let blended = (src * src_a + below * dst_a * (1.0 - src_a)) / out_a;
            dst[channel] = blended.round().clamp(0.0, 255.0) as u8;
        }
        dst[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    }
}

/// Opens `source`, stamps `text` and writes the result to `output` in the
/// format implied by its extension.
pub fn add_watermark(
    source: &Path,
    output: &Path,
    text: &str,
    font: &WatermarkFont,
    color: Rgba<u8>,
    position: Position,
) -> Result<()> {
    let original = ImageReader::open(source)
        .and_then(|reader| reader.with_guessed_format())
        .with_context(|| format!("画像を開けませんでした: {}", source.display()))?
        .decode()
        .with_context(|| format!("画像を読み込めませんでした: {}", source.display()))?;
    let keep_alpha = original.color().has_alpha();

    let mut canvas = original.into_rgba8();
    draw_watermark(&mut canvas, text, font, color, position);

    let stamped = DynamicImage::ImageRgba8(canvas);
    let stamped = if keep_alpha {
        stamped
    } else {
        DynamicImage::ImageRgb8(stamped.into_rgb8())
    };

    stamped
        .save(output)
        .with_context(|| format!("画像を保存できませんでした: {}", output.display()))?;
    Ok(())
}
