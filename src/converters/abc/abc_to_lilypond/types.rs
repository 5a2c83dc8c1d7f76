//! Type definitions for ABC conversion
//!
//! This module defines the types shared by the conversion pipeline:
//! - Public API types (ConversionResult, ConversionSettings, Warning)
//! - The symbolic tune representation (TuneBook, Tune, Stave, Symbol, ...)
//! - Rhythm values built on exact rational arithmetic

use num_rational::Rational32;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Exact fraction of a whole note
pub type Rational = Rational32;

/// Canonical zero, used as the "no duration" sentinel
pub fn zero_duration() -> Rational {
    Rational::from_integer(0)
}

// ============================================================================
// PUBLIC API TYPES
// ============================================================================

/// Result of converting a whole ABC tune book
#[derive(Debug, Clone, Serialize)]
pub struct ConversionResult {
    /// Generated LilyPond source for every tune, in book order
    pub lilypond_source: String,

    /// Lines (or line remainders) the tokenizer could not read
    pub warnings: Vec<Warning>,

    /// Number of tunes rendered
    pub tune_count: usize,
}

/// Output of the parsing stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedBook {
    pub book: TuneBook,
    pub warnings: Vec<Warning>,
}

/// Recoverable problem found while tokenizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    /// The unparsed text
    pub fragment: String,
    pub message: String,
}

impl Warning {
    pub fn unparsed(fragment: &str) -> Self {
        Self {
            fragment: fragment.to_string(),
            message: format!("unable to parse {:?}", fragment),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// How far an explicit accidental reaches within a bar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AccidentalScope {
    /// `^c` also sharpens `c'` and `C` later in the bar
    #[default]
    Pitch,

    /// `^c` only affects `c` in the same octave
    PitchAndOctave,
}

/// Configuration options for conversion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionSettings {
    /// Emit `\version "<v>"` at the top of book and index documents
    pub target_lilypond_version: Option<String>,

    /// Command placed right after `\new Staff{`
    pub staff_preamble: Option<String>,

    pub accidental_scope: AccidentalScope,

    /// Unit note length for tunes without an `L:` field
    pub default_unit_note_length: Rational,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            target_lilypond_version: None,
            staff_preamble: Some("\\configureStaff".to_string()),
            accidental_scope: AccidentalScope::Pitch,
            default_unit_note_length: Rational::new(1, 4),
        }
    }
}

// ============================================================================
// TUNE BOOK STRUCTURE
// ============================================================================

/// Every tune of one ABC input, plus the optional file header
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TuneBook {
    /// Fields given before the first `X:` line
    pub header: Vec<Field>,
    pub tunes: Vec<Tune>,
}

/// One notation piece
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tune {
    pub id: String,
    pub title: String,
    pub key: String,
    pub meter: Option<Meter>,
    pub unit_note_length: Rational,

    /// Header fields in source order, duplicates allowed
    pub fields: Vec<Field>,
    pub body: Body,

    /// Source text of the tune
    pub raw: String,
}

impl Tune {
    pub fn new(raw: &str, unit_note_length: Rational) -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            key: String::new(),
            meter: None,
            unit_note_length,
            fields: Vec::new(),
            body: Body::default(),
            raw: raw.to_string(),
        }
    }

    /// First header field carrying `tag`
    pub fn field(&self, tag: char) -> Option<&Field> {
        self.fields.iter().find(|field| field.tag == tag)
    }
}

/// Time signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Meter {
    pub beats_per_measure: u32,
    pub beat_length: u32,
}

impl fmt::Display for Meter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.beats_per_measure, self.beat_length)
    }
}

/// `tag:value` information field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub tag: char,
    pub value: String,
}

impl Field {
    pub fn new(tag: char, value: &str) -> Self {
        Self {
            tag,
            value: value.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Body {
    pub staves: Vec<Stave>,
}

/// One line of music, symbols in source order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Stave {
    pub symbols: Vec<Symbol>,
}

// ============================================================================
// SYMBOLS
// ============================================================================

/// Tokenized body element
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Symbol {
    /// Quoted annotation, `"text"`
    Text(String),
    Note(Note),
    Rest(Rest),
    Bar(Bar),
    /// Literal decoration token, `.` or `!trill!`
    Decoration(String),
    /// Inline field, `[K:D]`
    Field(Field),
}

impl Symbol {
    pub fn rhythm(&self) -> Option<&Rhythm> {
        match self {
            Symbol::Note(note) => Some(&note.rhythm),
            Symbol::Rest(rest) => Some(&rest.rhythm),
            _ => None,
        }
    }

    /// Notes and rests take the place of annotations written before them
    pub fn is_timed(&self) -> bool {
        matches!(self, Symbol::Note(_) | Symbol::Rest(_))
    }

    pub fn is_annotation(&self) -> bool {
        matches!(self, Symbol::Decoration(_) | Symbol::Text(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Symbol::Text(_) => "Text",
            Symbol::Note(_) => "Note",
            Symbol::Rest(_) => "Rest",
            Symbol::Bar(_) => "Bar",
            Symbol::Decoration(_) => "Decoration",
            Symbol::Field(_) => "Field",
        }
    }
}

/// Length, broken rhythm and tie of a note or rest
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rhythm {
    /// Multiplier of the unit note length
    pub duration: Rational,

    /// `>` counts up, `<` counts down
    pub syncopation: i32,
    pub tie: bool,
}

impl Rhythm {
    pub fn new(duration: Rational, syncopation: i32, tie: bool) -> Self {
        Self {
            duration,
            syncopation,
            tie,
        }
    }
}

impl Default for Rhythm {
    fn default() -> Self {
        Self::new(zero_duration(), 0, false)
    }
}

/// Single note or chord
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Note {
    pub pitches: Vec<NotePitch>,
    pub rhythm: Rhythm,
}

/// One pitch of a note or chord
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotePitch {
    /// Raw `^`, `_`, `=` markers, possibly empty
    pub accidentals: String,

    /// Lowercase letter a-g
    pub pitch: char,

    /// Octave relative to the uppercase letters
    pub octave: i32,
}

pub const ACCIDENTAL_FLAT: char = '_';
pub const ACCIDENTAL_SHARP: char = '^';
pub const ACCIDENTAL_NATURAL: char = '=';

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rest {
    pub kind: RestKind,
    pub rhythm: Rhythm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RestKind {
    /// `z`
    Visible,
    /// `x`, `X`, `y`
    Invisible,
    /// `Z`
    FullMeasure,
}

impl RestKind {
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "z" => Some(RestKind::Visible),
            "Z" => Some(RestKind::FullMeasure),
            "x" | "X" | "y" => Some(RestKind::Invisible),
            _ => None,
        }
    }
}

/// Barline with optional volta annotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bar {
    /// Literal barline, `|`, `:|:`, `|]`, ...
    pub token: String,

    /// Volta range, `1` or `1,3` or `1-2`
    pub volta: Option<String>,
    pub close_volta: bool,
}
