//! Coordinate normalization: pixel boxes to resolution-independent
//! ratio boxes keyed by `element_id`.

use std::collections::BTreeMap;

use glam::Vec2;

use crate::analysis::bbox::RatioBox;
use crate::layout::element::Element;

/// Builds the `element_id` to ratio-box map for the fused element list.
///
/// Output components are always in [0, 1]; reconstructing pixel boxes
/// from them matches the originals within one pixel of rounding.
pub fn label_coordinates(elements: &[Element], image_size: Vec2) -> BTreeMap<usize, RatioBox> {
    elements
        .iter()
        .map(|element| (element.element_id, element.bbox.to_ratio(image_size)))
        .collect()
}
