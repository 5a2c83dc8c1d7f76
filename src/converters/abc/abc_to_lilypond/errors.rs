//! Error types for ABC conversion
//!
//! Every error here is fatal: the tune that raised it is not rendered any
//! further. Unreadable notation text is not an error, it becomes a
//! `Warning` on the parse result instead.

use crate::converters::abc::abc_to_lilypond::types::Rational;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors while reading notation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid meter {0:?}")]
    InvalidMeter(String),

    #[error("invalid unit note length {0:?}")]
    InvalidNoteLength(String),

    /// Duration multiplier or divisor out of range
    #[error("invalid number {0:?}")]
    InvalidNumber(String),

    #[error("invalid octave {0:?}")]
    InvalidOctave(String),

    #[error("unknown key {0:?}")]
    UnknownKey(String),

    #[error("failed to parse note {0:?}")]
    InvalidNote(String),

    #[error("tune {id:?}: {source}")]
    InTune {
        id: String,
        source: Box<ParseError>,
    },
}

impl ParseError {
    pub fn in_tune(self, id: &str) -> Self {
        ParseError::InTune {
            id: id.to_string(),
            source: Box::new(self),
        }
    }
}

/// Fatal errors while rendering a tune
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("unhandled bar {0:?}")]
    UnhandledBar(String),

    #[error("unhandled decoration {0:?}")]
    UnhandledDecoration(String),

    #[error("unhandled field {tag}:{value}")]
    UnhandledField { tag: char, value: String },

    #[error("unhandled duration {0}")]
    UnhandledDuration(Rational),

    #[error("still in repeat at final bar")]
    StillInRepeat,

    #[error("did not expect volta {0:?} on |]")]
    VoltaOnFinalBar(String),

    #[error("note without pitches")]
    EmptyNote,

    #[error("tune {id:?}: {source}")]
    InTune {
        id: String,
        source: Box<ConversionError>,
    },
}

impl ConversionError {
    pub fn in_tune(self, id: &str) -> Self {
        ConversionError::InTune {
            id: id.to_string(),
            source: Box::new(self),
        }
    }
}

/// Errors while writing one file per tune
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}
