//! ABC to LilyPond converter
//!
//! Reads tune books in ABC notation and renders each tune as a LilyPond
//! `\score` block. The binary in `main.rs` is a thin wrapper around the
//! functions re-exported here.

pub mod converters;

// Re-export commonly used types
pub use converters::abc::abc_to_lilypond::{
    convert_abc_to_lilypond, export_tunes, parse, parse_with_settings, render_book, render_tune,
    AccidentalScope, Bar, Body, ConversionError, ConversionResult, ConversionSettings,
    ExportError, Field, Meter, Note, NotePitch, ParseError, ParsedBook, Rational, Rest, RestKind,
    Rhythm, Stave, Symbol, Tune, TuneBook, Warning,
};
