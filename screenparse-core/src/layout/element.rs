use std::collections::BTreeMap;

use serde::Serialize;

use crate::analysis::bbox::{Bbox, RatioBox};

/// What a detected element is made of: recognized text or an icon that
/// needs a generated caption.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Text,
    Icon,
}

/// A recognized text string with its pixel bounding box, as returned by
/// the text region provider.
#[derive(Clone, Debug, PartialEq)]
pub struct TextRegion {
    pub bbox: Bbox,
    pub text: String,
}

/// A raw detector candidate before fusion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub bbox: Bbox,
    pub confidence: f32,
}

/// A single addressable screen region carried through the pipeline.
///
/// `element_id` is assigned once in reading order at fusion time and is
/// the key linking the overlay label, the parsed content list, and the
/// coordinate map. A fully resolved element has exactly one of `text`
/// or `caption` populated.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Element {
    pub element_id: usize,
    pub bbox: Bbox,
    pub kind: ElementKind,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub confidence: Option<f32>,
}

impl Element {
    /// The element's resolved content: recognized text if present,
    /// otherwise the generated caption.
    pub fn content(&self) -> Option<&str> {
        self.text.as_deref().or(self.caption.as_deref())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ParsedContent {
    pub element_id: usize,
    pub kind: ElementKind,
    pub content: String,
}

/// The response bundle: base64-encoded overlay PNG, content entries
/// ordered by `element_id`, and the id-to-ratio-box coordinate map.
///
/// The three parts are index/key-aligned on `element_id`.
#[derive(Clone, Debug, Serialize)]
pub struct ParsedScreen {
    pub image: String,
    pub parsed_content: Vec<ParsedContent>,
    pub label_coordinates: BTreeMap<usize, RatioBox>,
}
