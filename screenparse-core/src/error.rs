use std::fmt;

use snafu::prelude::*;

use crate::inference::CollabError;

/// Pipeline stage a collaborator failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ocr,
    Detect,
    Caption,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Ocr => "ocr",
            Stage::Detect => "detect",
            Stage::Caption => "caption",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ParseError {
    #[snafu(display("failed to decode input image: {source}"))]
    ImageDecode { source: image::ImageError },

    #[snafu(display("invalid option `{name}` = {value}: {reason}"))]
    InvalidOption {
        name: &'static str,
        value: String,
        reason: &'static str,
    },

    #[snafu(display("collaborator failed at stage `{stage}`: {source}"))]
    Collaborator { stage: Stage, source: CollabError },

    #[snafu(display("failed to load label font: {source}"))]
    Font { source: ab_glyph::InvalidFont },

    #[snafu(display("failed to encode overlay image: {source}"))]
    ImageEncode { source: image::ImageError },
}

impl ParseError {
    /// The stage this error is attributed to, for collaborator failures.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            ParseError::Collaborator { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
