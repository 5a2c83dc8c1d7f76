//! ABC format converters
//!
//! This module contains converters for ABC notation.

pub mod abc_to_lilypond;

// Re-export for convenience
pub use abc_to_lilypond::{
    convert_abc_to_lilypond,
    export_tunes,
    parse,
    render_book,
    render_tune,
    AccidentalScope,
    ConversionError,
    ConversionResult,
    ConversionSettings,
    ExportError,
    ParseError,
    ParsedBook,
    TuneBook,
    Warning,
};
