//! ABC to LilyPond converter module
//!
//! This module converts tune books written in ABC notation to LilyPond
//! source code.
//!
//! # Overview
//!
//! The converter follows a three-stage pipeline:
//! 1. **Parse**: Split the book into tunes and tokenize every body line
//! 2. **Convert**: Walk each tune's staves, tracking accidentals, ties,
//!    repeats and voltas
//! 3. **Generate**: Wrap the result in `\score` blocks and a book document
//!
//! Unreadable line remainders are reported as warnings and skipped. Every
//! other problem is a typed error that stops the conversion.
//!
//! # Basic Usage
//!
//! ```ignore
//! use abc2ly::converters::abc::convert_abc_to_lilypond;
//!
//! let abc = "X:1\nT:Scale\nM:4/4\nL:1/8\nK:D\nDEFG ABcd|]\n";
//! let result = convert_abc_to_lilypond(abc, None)?;
//! println!("{}", result.lilypond_source);
//! ```

pub mod errors;
pub mod types;
pub mod fields;
pub mod key_signature;
pub mod tokens;
pub mod parser;
pub mod rhythm;
pub mod converter;
pub mod lilypond;
pub mod templates;
pub mod export;


// Re-export main API
pub use errors::{ConversionError, ExportError, ParseError};
pub use export::export_tunes;
pub use lilypond::{render_book, render_tune};
pub use parser::{parse, parse_with_settings};
pub use types::{
    AccidentalScope, Bar, Body, ConversionResult, ConversionSettings, Field, Meter, Note,
    NotePitch, ParsedBook, Rational, Rest, RestKind, Rhythm, Stave, Symbol, Tune, TuneBook,
    Warning,
};

/// Convert an ABC tune book to LilyPond source code.
///
/// # Arguments
///
/// * `abc` - ABC document as string
/// * `settings` - Optional conversion settings (uses defaults if None)
///
/// # Returns
///
/// * `Ok(ConversionResult)` - LilyPond source for every tune plus parse warnings
/// * `Err(ConversionError)` - Fatal error naming the token and tune
pub fn convert_abc_to_lilypond(
    abc: &str,
    settings: Option<ConversionSettings>,
) -> Result<ConversionResult, ConversionError> {
    let settings = settings.unwrap_or_default();

    let ParsedBook { book, warnings } = parse_with_settings(abc, &settings)?;
    let lilypond_source = render_book(&book, &settings)?;

    Ok(ConversionResult {
        lilypond_source,
        warnings,
        tune_count: book.tunes.len(),
    })
}
