/// Reference screenshot width used to scale overlay drawing parameters.
///
/// The draw defaults (text scale, line thickness, label padding) are tuned
/// for screenshots around this width; narrower or wider images scale the
/// parameters linearly from it.
pub const REFERENCE_OVERLAY_WIDTH: f32 = 3200.0;

/// Default minimum detector confidence for keeping an icon box.
pub const DEFAULT_BOX_THRESHOLD: f32 = 0.05;

/// Default maximum allowed overlap before two boxes are treated as the
/// same element and merged.
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.1;

/// Default inference size handed to the element detector.
pub const DEFAULT_DETECTOR_IMGSZ: u32 = 640;

/// Default OCR text confidence threshold.
pub const DEFAULT_TEXT_THRESHOLD: f32 = 0.9;

/// Base text scale at the reference width.
pub const TEXT_SCALE_BASE: f32 = 0.8;

/// Lower bound for the text scale so labels stay legible on very small
/// screenshots.
pub const MIN_TEXT_SCALE: f32 = 0.3;

/// Font pixel height corresponding to a text scale of 1.0.
pub const LABEL_FONT_PX: f32 = 30.0;

/// Base label text thickness at the reference width, in pixels.
pub const TEXT_THICKNESS_BASE: i32 = 2;

/// Base label padding at the reference width, in pixels.
pub const TEXT_PADDING_BASE: i32 = 3;

/// Base bounding box line thickness at the reference width, in pixels.
pub const BOX_THICKNESS_BASE: i32 = 3;

/// Fixed box color palette, indexed by `element_id` modulo its length.
///
/// A fixed palette keeps the rendered overlay byte-reproducible for
/// identical inputs.
pub const PALETTE: [[u8; 3]; 12] = [
    [255, 0, 0],     // Red
    [0, 128, 0],     // Dark Green
    [0, 0, 255],     // Blue
    [255, 165, 0],   // Orange
    [255, 0, 255],   // Magenta
    [0, 255, 255],   // Cyan
    [128, 0, 128],   // Purple
    [255, 20, 147],  // Deep Pink
    [128, 128, 128], // Gray
    [255, 255, 0],   // Yellow
    [0, 255, 0],     // Green
    [139, 69, 19],   // Brown
];

/// Color used for label digits drawn on the filled pad.
pub const LABEL_TEXT_COLOR: [u8; 3] = [255, 255, 255];

pub const FONT: &[u8] = include_bytes!("../../fonts/DejaVuSans.ttf");
