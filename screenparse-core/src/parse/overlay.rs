//! Overlay rendering: draws numbered element boxes on a copy of the
//! source screenshot and encodes it as an embeddable base64 PNG.

use std::io::Cursor;

use ab_glyph::{FontRef, PxScale};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use snafu::ResultExt;

use crate::consts::{
    BOX_THICKNESS_BASE, FONT, LABEL_FONT_PX, LABEL_TEXT_COLOR, MIN_TEXT_SCALE, PALETTE,
    REFERENCE_OVERLAY_WIDTH, TEXT_PADDING_BASE, TEXT_SCALE_BASE, TEXT_THICKNESS_BASE,
};
use crate::error::{FontSnafu, ImageEncodeSnafu, ParseError};
use crate::layout::element::Element;

/// Drawing parameters derived once per request from the image width
/// relative to the reference width.
///
/// Discrete fields are floored at one pixel so boxes and labels stay
/// visible on very small screenshots.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawConfig {
    pub text_scale: f32,
    pub text_thickness: i32,
    pub text_padding: i32,
    pub box_thickness: i32,
}

impl DrawConfig {
    pub fn for_image_width(width: u32) -> Self {
        let ratio = width as f32 / REFERENCE_OVERLAY_WIDTH;
        Self {
            text_scale: (TEXT_SCALE_BASE * ratio).max(MIN_TEXT_SCALE),
            text_thickness: ((TEXT_THICKNESS_BASE as f32 * ratio) as i32).max(1),
            text_padding: ((TEXT_PADDING_BASE as f32 * ratio) as i32).max(1),
            box_thickness: ((BOX_THICKNESS_BASE as f32 * ratio) as i32).max(1),
        }
    }
}

/// Renders the overlay: each element's box plus its numeric id on a
/// filled label pad, in fusion order, on a copy of the source image.
///
/// Rendering is deterministic: a fixed palette keyed on `element_id` and
/// a fixed encoder make identical inputs byte-reproducible.
pub fn render(
    image: &DynamicImage,
    elements: &[Element],
    config: &DrawConfig,
) -> Result<String, ParseError> {
    let mut canvas = image.to_rgb8();
    let font = FontRef::try_from_slice(FONT).context(FontSnafu)?;
    let scale = PxScale::from(config.text_scale * LABEL_FONT_PX);

    for element in elements {
        draw_element(&mut canvas, element, config, &font, scale);
    }

    encode_base64_png(&canvas)
}

fn draw_element(
    canvas: &mut RgbImage,
    element: &Element,
    config: &DrawConfig,
    font: &FontRef<'_>,
    scale: PxScale,
) {
    let x = element.bbox.min.x as i32;
    let y = element.bbox.min.y as i32;
    let width = element.bbox.width() as u32;
    let height = element.bbox.height() as u32;

    if width == 0 || height == 0 {
        return;
    }

    let color = Rgb(PALETTE[element.element_id % PALETTE.len()]);

    // Offset rectangles approximate line thickness
    for offset in 0..config.box_thickness {
        let rect = Rect::at(x - offset, y - offset)
            .of_size(width + (offset as u32) * 2, height + (offset as u32) * 2);
        draw_hollow_rect_mut(canvas, rect, color);
    }

    let label = element.element_id.to_string();
    let (text_width, text_height) = text_size(scale, font, &label);
    let pad = config.text_padding;
    let pad_width = text_width + (pad as u32) * 2;
    let pad_height = text_height + (pad as u32) * 2;

    // Label pad sits above the box's top-left corner, or inside it when
    // the box touches the top edge
    let label_x = x.max(0);
    let mut label_y = y - pad_height as i32;
    if label_y < 0 {
        label_y = y.max(0);
    }

    draw_filled_rect_mut(
        canvas,
        Rect::at(label_x, label_y).of_size(pad_width, pad_height),
        color,
    );

    // Repeated 1px-offset draws approximate text weight
    for offset in 0..config.text_thickness {
        draw_text_mut(
            canvas,
            Rgb(LABEL_TEXT_COLOR),
            label_x + pad + offset,
            label_y + pad,
            scale,
            font,
            &label,
        );
    }
}

fn encode_base64_png(canvas: &RgbImage) -> Result<String, ParseError> {
    use base64::Engine;

    let mut buffer = Cursor::new(Vec::new());
    canvas
        .write_to(&mut buffer, ImageFormat::Png)
        .context(ImageEncodeSnafu)?;

    Ok(base64::engine::general_purpose::STANDARD.encode(buffer.into_inner()))
}

#[cfg(test)]
mod tests {
    use base64::Engine;

    use super::*;
    use crate::analysis::bbox::Bbox;
    use crate::layout::element::ElementKind;

    fn element(element_id: usize, x1: f32, y1: f32, x2: f32, y2: f32) -> Element {
        Element {
            element_id,
            bbox: Bbox::from_xyxy(x1, y1, x2, y2),
            kind: ElementKind::Icon,
            text: None,
            caption: Some("settings gear".to_string()),
            confidence: Some(0.8),
        }
    }

    fn checker_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            if (x + y) % 2 == 0 {
                Rgb([230, 230, 230])
            } else {
                Rgb([40, 40, 40])
            }
        }))
    }

    fn decode(overlay: &str) -> RgbImage {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(overlay)
            .unwrap();
        image::load_from_memory(&bytes).unwrap().to_rgb8()
    }

    #[test]
    fn test_draw_config_at_reference_width() {
        let config = DrawConfig::for_image_width(3200);
        assert!((config.text_scale - 0.8).abs() < 1e-6);
        assert_eq!(config.text_thickness, 2);
        assert_eq!(config.text_padding, 3);
        assert_eq!(config.box_thickness, 3);
    }

    #[test]
    fn test_draw_config_floors_on_small_images() {
        let config = DrawConfig::for_image_width(320);
        assert_eq!(config.text_scale, MIN_TEXT_SCALE);
        assert_eq!(config.text_thickness, 1);
        assert_eq!(config.text_padding, 1);
        assert_eq!(config.box_thickness, 1);
    }

    #[test]
    fn test_draw_config_scales_up_on_large_images() {
        let config = DrawConfig::for_image_width(6400);
        assert!((config.text_scale - 1.6).abs() < 1e-6);
        assert_eq!(config.text_thickness, 4);
        assert_eq!(config.text_padding, 6);
        assert_eq!(config.box_thickness, 6);
    }

    #[test]
    fn test_empty_elements_leave_source_untouched() {
        let image = checker_image(64, 48);
        let config = DrawConfig::for_image_width(64);

        let overlay = render(&image, &[], &config).unwrap();
        assert_eq!(decode(&overlay), image.to_rgb8());
    }

    #[test]
    fn test_rendered_boxes_change_pixels() {
        let image = checker_image(120, 120);
        let config = DrawConfig::for_image_width(120);
        let elements = vec![element(0, 20.0, 30.0, 80.0, 90.0)];

        let overlay = render(&image, &elements, &config).unwrap();
        let rendered = decode(&overlay);
        assert_ne!(rendered, image.to_rgb8());
        // Box edge carries the first palette color
        assert_eq!(rendered.get_pixel(20, 60), &Rgb(PALETTE[0]));
    }

    #[test]
    fn test_render_is_byte_reproducible() {
        let image = checker_image(200, 150);
        let config = DrawConfig::for_image_width(200);
        let elements = vec![
            element(0, 10.0, 40.0, 60.0, 80.0),
            element(1, 100.0, 40.0, 160.0, 100.0),
        ];

        let first = render(&image, &elements, &config).unwrap();
        let second = render(&image, &elements, &config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_degenerate_box_is_skipped() {
        let image = checker_image(64, 64);
        let config = DrawConfig::for_image_width(64);
        let elements = vec![element(0, 10.0, 10.0, 10.0, 30.0)];

        let overlay = render(&image, &elements, &config).unwrap();
        assert_eq!(decode(&overlay), image.to_rgb8());
    }
}
