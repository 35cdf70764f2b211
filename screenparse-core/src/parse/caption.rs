//! Caption assignment: crops every icon element out of the source image
//! and resolves their descriptions with one batched caption call.

use image::DynamicImage;
use snafu::ResultExt;
use tracing::debug;

use crate::analysis::bbox::Bbox;
use crate::error::{CollaboratorSnafu, ParseError, Stage};
use crate::inference::CaptionGenerator;
use crate::layout::element::{Element, ElementKind};

/// Generates captions for all icon elements in a single batched call and
/// attaches them in crop order.
///
/// Text elements already carry their recognized string and never reach
/// the caption generator. A failed or short reply aborts the request:
/// partially captioned output would silently degrade downstream
/// automation decisions.
pub fn assign_captions(
    elements: &mut [Element],
    image: &DynamicImage,
    generator: &dyn CaptionGenerator,
) -> Result<(), ParseError> {
    let targets: Vec<usize> = elements
        .iter()
        .enumerate()
        .filter(|(_, e)| e.kind == ElementKind::Icon && e.text.is_none())
        .map(|(idx, _)| idx)
        .collect();

    if targets.is_empty() {
        return Ok(());
    }

    let crops: Vec<DynamicImage> = targets
        .iter()
        .map(|&idx| crop_region(image, &elements[idx].bbox))
        .collect();

    let captions = generator.caption(&crops).context(CollaboratorSnafu {
        stage: Stage::Caption,
    })?;

    if captions.len() != targets.len() {
        return Err(ParseError::Collaborator {
            stage: Stage::Caption,
            source: format!(
                "expected {} captions, got {}",
                targets.len(),
                captions.len()
            )
            .into(),
        });
    }

    debug!(icons = targets.len(), "caption batch complete");

    for (idx, caption) in targets.into_iter().zip(captions) {
        elements[idx].caption = Some(caption);
    }

    Ok(())
}

/// Crops the image to a bounding box, clamped to the image extent with a
/// minimum crop of one pixel.
fn crop_region(image: &DynamicImage, bbox: &Bbox) -> DynamicImage {
    let image_size = glam::Vec2::new(image.width() as f32, image.height() as f32);
    let clamped = bbox.clamp(glam::Vec2::ZERO, image_size);

    let x = clamped.min.x.max(0.0) as u32;
    let y = clamped.min.y.max(0.0) as u32;
    let width = (clamped.width().max(1.0) as u32).min(image.width().saturating_sub(x));
    let height = (clamped.height().max(1.0) as u32).min(image.height().saturating_sub(y));

    if width == 0 || height == 0 {
        return DynamicImage::new_rgb8(1, 1);
    }

    image.crop_imm(x, y, width, height)
}
