//! Collaborator interfaces.
//!
//! The heavy model state behind these traits (OCR engine, icon detector,
//! caption model) is loaded once at process start and injected into the
//! pipeline as shared read-only handles. The core never mutates it, so a
//! single instance may serve concurrent requests.

use image::DynamicImage;
use serde::Serialize;

use crate::consts::DEFAULT_TEXT_THRESHOLD;
use crate::layout::element::{Detection, TextRegion};

/// Error type collaborators surface; the engine tags it with the
/// offending stage.
pub type CollabError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Which OCR engine backs the text region provider.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrBackend {
    #[default]
    Paddle,
    Easy,
}

#[derive(Clone, Copy, Debug)]
pub struct OcrOptions {
    pub backend: OcrBackend,
    /// Minimum recognition confidence for keeping a text region.
    pub text_threshold: f32,
    /// Merge adjacent regions into paragraphs instead of returning lines.
    pub paragraph: bool,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            backend: OcrBackend::default(),
            text_threshold: DEFAULT_TEXT_THRESHOLD,
            paragraph: false,
        }
    }
}

/// Recognizes text strings with pixel bounding boxes.
///
/// The boolean flag reports whether the provider filtered its raw output
/// (e.g. dropped low-confidence lines); it is logged but does not alter
/// fusion.
pub trait TextRegionProvider: Send + Sync {
    fn detect_text(
        &self,
        image: &DynamicImage,
        options: &OcrOptions,
    ) -> Result<(Vec<TextRegion>, bool), CollabError>;
}

/// Proposes candidate icon boxes with confidence scores.
pub trait ElementDetector: Send + Sync {
    fn detect(
        &self,
        image: &DynamicImage,
        confidence_threshold: f32,
        target_size: u32,
    ) -> Result<Vec<Detection>, CollabError>;
}

/// Produces one short description per crop, order-preserving.
pub trait CaptionGenerator: Send + Sync {
    fn caption(&self, crops: &[DynamicImage]) -> Result<Vec<String>, CollabError>;
}
