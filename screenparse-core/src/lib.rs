pub mod analysis;
pub mod consts;
pub mod error;
pub mod inference;
pub mod layout;
pub mod parse;

// Re-export commonly used types
pub use analysis::bbox::{Bbox, RatioBox};
pub use error::{ParseError, Stage};
pub use inference::{
    CaptionGenerator, CollabError, ElementDetector, OcrBackend, OcrOptions, TextRegionProvider,
};
pub use layout::element::{
    Detection, Element, ElementKind, ParsedContent, ParsedScreen, TextRegion,
};
pub use parse::engine::{ParseOptions, ScreenParser};
pub use parse::fusion::OverlapMetric;
pub use parse::overlay::DrawConfig;
