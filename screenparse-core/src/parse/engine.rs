//! Pipeline orchestration and result assembly.

use std::sync::Arc;
use std::time::Instant;

use glam::Vec2;
use image::DynamicImage;
use snafu::ResultExt;
use tracing::{debug, info, info_span};
use uuid::Uuid;

use crate::consts::{DEFAULT_BOX_THRESHOLD, DEFAULT_DETECTOR_IMGSZ, DEFAULT_IOU_THRESHOLD};
use crate::error::{CollaboratorSnafu, ImageDecodeSnafu, ParseError, Stage};
use crate::inference::{CaptionGenerator, ElementDetector, OcrBackend, OcrOptions, TextRegionProvider};
use crate::layout::element::{ParsedContent, ParsedScreen};
use crate::parse::fusion::{self, FusionParams, OverlapMetric};
use crate::parse::overlay::DrawConfig;
use crate::parse::{caption, normalize, overlay};

/// Per-request tuning knobs, all optional with production defaults.
#[derive(Clone, Copy, Debug)]
pub struct ParseOptions {
    /// Minimum detector confidence to keep an icon box.
    pub box_threshold: f32,
    /// Maximum allowed overlap before two boxes merge into one element.
    pub iou_threshold: f32,
    pub ocr_backend: OcrBackend,
    /// Inference size handed to the element detector.
    pub imgsz: u32,
    pub overlap_metric: OverlapMetric,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            box_threshold: DEFAULT_BOX_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            ocr_backend: OcrBackend::default(),
            imgsz: DEFAULT_DETECTOR_IMGSZ,
            overlap_metric: OverlapMetric::default(),
        }
    }
}

impl ParseOptions {
    fn validate(&self) -> Result<(), ParseError> {
        if !(0.0..=1.0).contains(&self.box_threshold) {
            return Err(ParseError::InvalidOption {
                name: "box_threshold",
                value: self.box_threshold.to_string(),
                reason: "must be within [0, 1]",
            });
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            return Err(ParseError::InvalidOption {
                name: "iou_threshold",
                value: self.iou_threshold.to_string(),
                reason: "must be within [0, 1]",
            });
        }
        if self.imgsz == 0 {
            return Err(ParseError::InvalidOption {
                name: "imgsz",
                value: self.imgsz.to_string(),
                reason: "must be positive",
            });
        }
        Ok(())
    }
}

/// The screenshot parsing pipeline.
///
/// Holds shared read-only collaborator handles injected at startup and
/// keeps no per-request state, so one instance may serve concurrent
/// requests. A request either completes with a full bundle or fails
/// outright; no partial element list is ever returned.
pub struct ScreenParser {
    ocr: Arc<dyn TextRegionProvider>,
    detector: Arc<dyn ElementDetector>,
    captioner: Arc<dyn CaptionGenerator>,
}

impl ScreenParser {
    pub fn new(
        ocr: Arc<dyn TextRegionProvider>,
        detector: Arc<dyn ElementDetector>,
        captioner: Arc<dyn CaptionGenerator>,
    ) -> Self {
        Self {
            ocr,
            detector,
            captioner,
        }
    }

    /// Decodes an encoded screenshot and parses it.
    pub fn parse_bytes(&self, bytes: &[u8], options: &ParseOptions) -> Result<ParsedScreen, ParseError> {
        let image = image::load_from_memory(bytes).context(ImageDecodeSnafu)?;
        self.parse_image(&image, options)
    }

    /// Runs the full pipeline on a decoded screenshot: OCR and detection,
    /// box fusion, caption assignment, then coordinate normalization and
    /// overlay rendering off the same fused list.
    pub fn parse_image(
        &self,
        image: &DynamicImage,
        options: &ParseOptions,
    ) -> Result<ParsedScreen, ParseError> {
        options.validate()?;

        let request_id = Uuid::new_v4();
        let span = info_span!("parse", %request_id);
        let _guard = span.enter();
        let started = Instant::now();

        let image_size = Vec2::new(image.width() as f32, image.height() as f32);

        let ocr_options = OcrOptions {
            backend: options.ocr_backend,
            ..OcrOptions::default()
        };
        let (text_regions, filtered) = self
            .ocr
            .detect_text(image, &ocr_options)
            .context(CollaboratorSnafu { stage: Stage::Ocr })?;
        debug!(regions = text_regions.len(), filtered, "text regions recognized");

        let detections = self
            .detector
            .detect(image, options.box_threshold, options.imgsz)
            .context(CollaboratorSnafu {
                stage: Stage::Detect,
            })?;
        debug!(candidates = detections.len(), "detector candidates proposed");

        let fusion_params = FusionParams {
            box_threshold: options.box_threshold,
            iou_threshold: options.iou_threshold,
            metric: options.overlap_metric,
        };
        let mut elements = fusion::fuse(text_regions, detections, &fusion_params, image_size);

        caption::assign_captions(&mut elements, image, self.captioner.as_ref())?;

        let draw_config = DrawConfig::for_image_width(image.width());
        let (label_coordinates, rendered) = rayon::join(
            || normalize::label_coordinates(&elements, image_size),
            || overlay::render(image, &elements, &draw_config),
        );
        let rendered = rendered?;

        let parsed_content = elements
            .iter()
            .map(|element| {
                debug_assert!(element.content().is_some());
                ParsedContent {
                    element_id: element.element_id,
                    kind: element.kind,
                    content: element.content().unwrap_or_default().to_string(),
                }
            })
            .collect();

        info!(
            elements = elements.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "screenshot parsed"
        );

        Ok(ParsedScreen {
            image: rendered,
            parsed_content,
            label_coordinates,
        })
    }
}

#[cfg(test)]
mod tests {
    use base64::Engine;
    use image::{Rgb, RgbImage};

    use super::*;
    use crate::analysis::bbox::Bbox;
    use crate::inference::CollabError;
    use crate::layout::element::{Detection, ElementKind, TextRegion};

    struct StaticOcr(Vec<TextRegion>);

    impl TextRegionProvider for StaticOcr {
        fn detect_text(
            &self,
            _image: &DynamicImage,
            _options: &OcrOptions,
        ) -> Result<(Vec<TextRegion>, bool), CollabError> {
            Ok((self.0.clone(), false))
        }
    }

    struct StaticDetector(Vec<Detection>);

    impl ElementDetector for StaticDetector {
        fn detect(
            &self,
            _image: &DynamicImage,
            _confidence_threshold: f32,
            _target_size: u32,
        ) -> Result<Vec<Detection>, CollabError> {
            Ok(self.0.clone())
        }
    }

    struct EchoCaptioner;

    impl CaptionGenerator for EchoCaptioner {
        fn caption(&self, crops: &[DynamicImage]) -> Result<Vec<String>, CollabError> {
            Ok((0..crops.len()).map(|i| format!("icon {i}")).collect())
        }
    }

    struct FailingOcr;

    impl TextRegionProvider for FailingOcr {
        fn detect_text(
            &self,
            _image: &DynamicImage,
            _options: &OcrOptions,
        ) -> Result<(Vec<TextRegion>, bool), CollabError> {
            Err("ocr backend crashed".into())
        }
    }

    struct FailingDetector;

    impl ElementDetector for FailingDetector {
        fn detect(
            &self,
            _image: &DynamicImage,
            _confidence_threshold: f32,
            _target_size: u32,
        ) -> Result<Vec<Detection>, CollabError> {
            Err("detector timed out".into())
        }
    }

    fn region(x1: f32, y1: f32, x2: f32, y2: f32, text: &str) -> TextRegion {
        TextRegion {
            bbox: Bbox::from_xyxy(x1, y1, x2, y2),
            text: text.to_string(),
        }
    }

    fn detection(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32) -> Detection {
        Detection {
            bbox: Bbox::from_xyxy(x1, y1, x2, y2),
            confidence,
        }
    }

    fn screenshot(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([250, 250, 250])))
    }

    fn parser(ocr: Vec<TextRegion>, detections: Vec<Detection>) -> ScreenParser {
        ScreenParser::new(
            Arc::new(StaticOcr(ocr)),
            Arc::new(StaticDetector(detections)),
            Arc::new(EchoCaptioner),
        )
    }

    #[test]
    fn test_single_text_region_screen() {
        let parser = parser(vec![region(10.0, 10.0, 100.0, 30.0, "Submit")], vec![]);
        let image = screenshot(200, 50);

        let bundle = parser.parse_image(&image, &ParseOptions::default()).unwrap();

        assert_eq!(bundle.parsed_content.len(), 1);
        let entry = &bundle.parsed_content[0];
        assert_eq!(entry.element_id, 0);
        assert_eq!(entry.kind, ElementKind::Text);
        assert_eq!(entry.content, "Submit");

        let ratio = &bundle.label_coordinates[&0];
        assert!((ratio.x - 0.05).abs() < 1e-6);
        assert!((ratio.y - 0.2).abs() < 1e-6);
        assert!((ratio.w - 0.45).abs() < 1e-6);
        assert!((ratio.h - 0.4).abs() < 1e-6);
    }

    #[test]
    fn test_empty_screen_yields_empty_bundle() {
        let parser = parser(vec![], vec![]);
        let image = screenshot(64, 64);

        let bundle = parser.parse_image(&image, &ParseOptions::default()).unwrap();

        assert!(bundle.parsed_content.is_empty());
        assert!(bundle.label_coordinates.is_empty());

        // Overlay equals the source image when nothing is drawn
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(&bundle.image)
            .unwrap();
        let overlay = image::load_from_memory(&bytes).unwrap().to_rgb8();
        assert_eq!(overlay, image.to_rgb8());
    }

    #[test]
    fn test_mixed_screen_alignment_invariant() {
        let parser = parser(
            vec![
                region(10.0, 10.0, 120.0, 30.0, "File"),
                region(10.0, 300.0, 120.0, 320.0, "Status: ready"),
            ],
            vec![
                detection(400.0, 10.0, 440.0, 40.0, 0.9),
                detection(400.0, 100.0, 440.0, 140.0, 0.7),
            ],
        );
        let image = screenshot(640, 480);

        let bundle = parser.parse_image(&image, &ParseOptions::default()).unwrap();

        assert_eq!(bundle.parsed_content.len(), 4);
        assert_eq!(bundle.label_coordinates.len(), 4);
        for (index, entry) in bundle.parsed_content.iter().enumerate() {
            assert_eq!(entry.element_id, index);
            assert!(bundle.label_coordinates.contains_key(&entry.element_id));
            assert!(!entry.content.is_empty());
        }

        // Icons resolved through the caption generator
        let icons: Vec<&ParsedContent> = bundle
            .parsed_content
            .iter()
            .filter(|e| e.kind == ElementKind::Icon)
            .collect();
        assert_eq!(icons.len(), 2);
        assert!(icons.iter().all(|e| e.content.starts_with("icon ")));
    }

    #[test]
    fn test_option_validation() {
        let parser = parser(vec![], vec![]);
        let image = screenshot(32, 32);

        let bad_box = ParseOptions {
            box_threshold: 1.5,
            ..ParseOptions::default()
        };
        assert!(matches!(
            parser.parse_image(&image, &bad_box),
            Err(ParseError::InvalidOption {
                name: "box_threshold",
                ..
            })
        ));

        let bad_iou = ParseOptions {
            iou_threshold: -0.1,
            ..ParseOptions::default()
        };
        assert!(matches!(
            parser.parse_image(&image, &bad_iou),
            Err(ParseError::InvalidOption {
                name: "iou_threshold",
                ..
            })
        ));

        let bad_imgsz = ParseOptions {
            imgsz: 0,
            ..ParseOptions::default()
        };
        assert!(matches!(
            parser.parse_image(&image, &bad_imgsz),
            Err(ParseError::InvalidOption { name: "imgsz", .. })
        ));
    }

    #[test]
    fn test_collaborator_failures_name_their_stage() {
        let image = screenshot(32, 32);

        let ocr_down = ScreenParser::new(
            Arc::new(FailingOcr),
            Arc::new(StaticDetector(vec![])),
            Arc::new(EchoCaptioner),
        );
        let err = ocr_down.parse_image(&image, &ParseOptions::default()).unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Ocr));

        let detector_down = ScreenParser::new(
            Arc::new(StaticOcr(vec![])),
            Arc::new(FailingDetector),
            Arc::new(EchoCaptioner),
        );
        let err = detector_down
            .parse_image(&image, &ParseOptions::default())
            .unwrap_err();
        assert_eq!(err.stage(), Some(Stage::Detect));
    }

    #[test]
    fn test_parse_bytes_rejects_undecodable_input() {
        let parser = parser(vec![], vec![]);
        let err = parser
            .parse_bytes(b"not an image", &ParseOptions::default())
            .unwrap_err();
        assert!(matches!(err, ParseError::ImageDecode { .. }));
    }

    #[test]
    fn test_parse_bytes_accepts_encoded_screenshot() {
        use std::io::Cursor;

        let parser = parser(vec![region(5.0, 5.0, 50.0, 20.0, "Ok")], vec![]);

        let mut buffer = Cursor::new(Vec::new());
        screenshot(100, 60)
            .write_to(&mut buffer, image::ImageFormat::Png)
            .unwrap();

        let bundle = parser
            .parse_bytes(buffer.get_ref(), &ParseOptions::default())
            .unwrap();
        assert_eq!(bundle.parsed_content.len(), 1);
        assert_eq!(bundle.parsed_content[0].content, "Ok");
    }

    #[test]
    fn test_bundle_json_shape() {
        let parser = parser(
            vec![region(10.0, 10.0, 100.0, 30.0, "Submit")],
            vec![detection(200.0, 200.0, 240.0, 240.0, 0.9)],
        );
        let image = screenshot(400, 300);

        let bundle = parser.parse_image(&image, &ParseOptions::default()).unwrap();
        let json = serde_json::to_value(&bundle).unwrap();

        assert!(json["image"].is_string());
        assert_eq!(json["parsed_content"].as_array().unwrap().len(), 2);
        assert_eq!(json["parsed_content"][0]["kind"], "text");
        assert_eq!(json["parsed_content"][0]["content"], "Submit");
        let coordinates = json["label_coordinates"].as_object().unwrap();
        assert_eq!(coordinates.len(), 2);
        assert_eq!(coordinates["0"].as_array().unwrap().len(), 4);
    }
}
