//! Box fusion: merges OCR text boxes and detector icon boxes into one
//! deduplicated element list with stable reading-order identifiers.

use std::cmp::Ordering;

use glam::Vec2;
use tracing::debug;

use crate::analysis::bbox::Bbox;
use crate::layout::element::{Detection, Element, ElementKind, TextRegion};

/// Overlap test used for both detector-internal dedup and cross-source
/// absorption.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OverlapMetric {
    /// Intersection over union.
    Iou,
    /// Intersection over the smaller box's area. Catches a small icon
    /// fully inside a large text block, which pure IOU scores near zero.
    #[default]
    Containment,
}

impl OverlapMetric {
    fn measure(&self, a: &Bbox, b: &Bbox) -> f32 {
        match self {
            OverlapMetric::Iou => a.iou(b),
            OverlapMetric::Containment => a.overlap_ratio(b),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct FusionParams {
    /// Minimum detector confidence to keep a box.
    pub box_threshold: f32,
    /// Overlap above this merges two boxes into one element.
    pub iou_threshold: f32,
    pub metric: OverlapMetric,
}

/// Merges text regions and detector candidates into a single element list.
///
/// Detector boxes below `box_threshold` are discarded; overlapping
/// detector pairs keep only the higher-confidence box; detector boxes
/// overlapping a text region are absorbed into it. Survivors are sorted
/// into reading order (top-to-bottom, then left-to-right on the box
/// top-left corner, ties kept in arrival order) and numbered from zero.
///
/// Empty OCR or detector input is a valid degenerate case: whichever
/// side is non-empty is promoted as-is.
pub fn fuse(
    text_regions: Vec<TextRegion>,
    detections: Vec<Detection>,
    params: &FusionParams,
    image_size: Vec2,
) -> Vec<Element> {
    let raw_detections = detections.len();

    let mut text_regions = text_regions;
    for region in &mut text_regions {
        region.bbox.clamp_mut(Vec2::ZERO, image_size);
    }

    // Threshold filter, keeping the original arrival index for stable ties.
    let mut candidates: Vec<(usize, Detection)> = detections
        .into_iter()
        .enumerate()
        .filter(|(_, d)| d.confidence >= params.box_threshold)
        .map(|(idx, mut d)| {
            d.bbox.clamp_mut(Vec2::ZERO, image_size);
            (idx, d)
        })
        .collect();

    dedup_detections(&mut candidates, params);

    // Cross-source absorption: a detector box overlapping recognized text
    // does not become a separate icon element.
    candidates.retain(|(_, detection)| {
        !text_regions
            .iter()
            .any(|region| params.metric.measure(&detection.bbox, &region.bbox) > params.iou_threshold)
    });

    let mut elements: Vec<Element> = Vec::with_capacity(text_regions.len() + candidates.len());
    for region in text_regions {
        elements.push(Element {
            element_id: 0,
            bbox: region.bbox,
            kind: ElementKind::Text,
            text: Some(region.text),
            caption: None,
            confidence: None,
        });
    }
    for (_, detection) in candidates {
        elements.push(Element {
            element_id: 0,
            bbox: detection.bbox,
            kind: ElementKind::Icon,
            text: None,
            caption: None,
            confidence: Some(detection.confidence),
        });
    }

    sort_by_reading_order(&mut elements);
    for (element_id, element) in elements.iter_mut().enumerate() {
        element.element_id = element_id;
    }

    debug!(
        text = elements.iter().filter(|e| e.kind == ElementKind::Text).count(),
        icons = elements.iter().filter(|e| e.kind == ElementKind::Icon).count(),
        raw_detections,
        "box fusion complete"
    );

    elements
}

/// Detector-internal dedup: among overlapping pairs only the
/// higher-confidence box survives. Keep-flag sweep over the candidates
/// sorted by confidence, then arrival order is restored.
fn dedup_detections(candidates: &mut Vec<(usize, Detection)>, params: &FusionParams) {
    if candidates.len() < 2 {
        return;
    }

    candidates.sort_by(|(_, a), (_, b)| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut keep = vec![true; candidates.len()];
    for current in 0..candidates.len() {
        if !keep[current] {
            continue;
        }
        for kept in 0..current {
            if !keep[kept] {
                continue;
            }
            let overlap = params
                .metric
                .measure(&candidates[current].1.bbox, &candidates[kept].1.bbox);
            if overlap > params.iou_threshold {
                keep[current] = false;
                break;
            }
        }
    }

    let mut write_index = 0;
    for read_index in 0..candidates.len() {
        if keep[read_index] {
            if write_index != read_index {
                candidates.swap(write_index, read_index);
            }
            write_index += 1;
        }
    }
    candidates.truncate(write_index);

    candidates.sort_by_key(|(arrival, _)| *arrival);
}

/// Reading order: top-to-bottom, then left-to-right, keyed on the box
/// top-left corner. The sort is stable so exact ties keep arrival order.
fn sort_by_reading_order(elements: &mut [Element]) {
    elements.sort_by(|a, b| {
        a.bbox
            .min
            .y
            .partial_cmp(&b.bbox.min.y)
            .unwrap_or(Ordering::Equal)
            .then(
                a.bbox
                    .min
                    .x
                    .partial_cmp(&b.bbox.min.x)
                    .unwrap_or(Ordering::Equal),
            )
    });
}
