//! Symbol tokenizer for ABC body lines
//!
//! A line is read by trying a fixed list of prefix matchers in priority
//! order: inline field, decoration, note/rest/chord, quoted text, barline.
//! The first matcher that succeeds emits a symbol and consumes its prefix,
//! then matching restarts from the top of the list on what is left.

use crate::converters::abc::abc_to_lilypond::errors::ParseError;
use crate::converters::abc::abc_to_lilypond::types::{
    Bar, Field, Note, NotePitch, Rational, Rest, RestKind, Rhythm, Symbol,
};
use lazy_static::lazy_static;
use num_traits::CheckedMul;
use regex::{Captures, Regex};

lazy_static! {
    static ref RX_INLINE_FIELD: Regex =
        Regex::new(r"^\[([a-zA-Z]):([^\]]*)\]").expect("inline field pattern");
    static ref RX_DECORATION: Regex =
        Regex::new(r"^([.~HLMOPSTuv]|![^!]+!)").expect("decoration pattern");
    static ref RX_NOTE: Regex = Regex::new(concat!(
        r"^([_^=]*[a-gA-G][,']*|\[(?:[_^=]*[a-gA-G][,']*)+\]|[yzZxX])",
        r"([0-9]*)(/*)([0-9]*)([<>]*)(-?)",
    ))
    .expect("note pattern");
    static ref RX_NOTE_PITCH: Regex =
        Regex::new(r"([_^=]*)([a-gA-G])([,']*)").expect("note pitch pattern");
    // no escape handling, an embedded quote ends the text
    static ref RX_TEXT: Regex = Regex::new(r#"^"([^"]*)""#).expect("text pattern");
    // `:|: [1-2`
    static ref RX_BAR: Regex =
        Regex::new(r"^([:|\[\]]*[:|\]])(?:(?:\s*\[)?([0-9,-]+)|(\])|)").expect("bar pattern");
}

/// More halvings than this cannot be represented
const MAX_HALVINGS: usize = 24;

/// A matched symbol and the number of bytes it consumed
type Matched = Option<(Symbol, usize)>;

type Matcher = fn(&str) -> Result<Matched, ParseError>;

/// Matchers in priority order
const MATCHERS: &[Matcher] = &[
    match_inline_field,
    match_decoration,
    match_note,
    match_text,
    match_bar,
];

/// Tokenize one comment-stripped line into `symbols`.
///
/// Returns the part of the line no matcher could read, empty when the
/// whole line was consumed.
pub fn tokenize_line<'a>(
    line: &'a str,
    symbols: &mut Vec<Symbol>,
) -> Result<&'a str, ParseError> {
    let mut rest = trim_horizontal(line);

    'scan: while !rest.is_empty() {
        for matcher in MATCHERS {
            if let Some((symbol, len)) = matcher(rest)? {
                log::trace!("matched {} {:?}", symbol.kind(), &rest[..len]);
                symbols.push(symbol);
                rest = trim_horizontal(&rest[len..]);
                continue 'scan;
            }
        }
        break;
    }

    Ok(rest)
}

fn trim_horizontal(s: &str) -> &str {
    s.trim_start_matches([' ', '\t'])
}

fn group<'t>(caps: &Captures<'t>, index: usize) -> &'t str {
    caps.get(index).map_or("", |m| m.as_str())
}

fn matched_len(caps: &Captures<'_>) -> usize {
    caps.get(0).map_or(0, |m| m.end())
}

fn match_inline_field(line: &str) -> Result<Matched, ParseError> {
    let Some(caps) = RX_INLINE_FIELD.captures(line) else {
        return Ok(None);
    };
    let tag = group(&caps, 1).chars().next().unwrap_or_default();
    let field = Field::new(tag, group(&caps, 2));
    Ok(Some((Symbol::Field(field), matched_len(&caps))))
}

fn match_decoration(line: &str) -> Result<Matched, ParseError> {
    let Some(caps) = RX_DECORATION.captures(line) else {
        return Ok(None);
    };
    let token = group(&caps, 1).trim().to_string();
    Ok(Some((Symbol::Decoration(token), matched_len(&caps))))
}

fn match_note(line: &str) -> Result<Matched, ParseError> {
    let Some(caps) = RX_NOTE.captures(line) else {
        return Ok(None);
    };

    let note = group(&caps, 1);
    let duration = parse_duration(group(&caps, 2), group(&caps, 3), group(&caps, 4))?;
    let syncopation = group(&caps, 5)
        .chars()
        .map(|c| if c == '>' { 1 } else { -1 })
        .sum();
    let rhythm = Rhythm::new(duration, syncopation, !group(&caps, 6).is_empty());

    let symbol = match RestKind::parse(note) {
        Some(kind) => Symbol::Rest(Rest { kind, rhythm }),
        None => {
            let pitches = parse_pitches(note);
            if pitches.is_empty() {
                return Err(ParseError::InvalidNote(note.to_string()));
            }
            Symbol::Note(Note { pitches, rhythm })
        }
    };

    Ok(Some((symbol, matched_len(&caps))))
}

fn match_text(line: &str) -> Result<Matched, ParseError> {
    let Some(caps) = RX_TEXT.captures(line) else {
        return Ok(None);
    };
    Ok(Some((
        Symbol::Text(group(&caps, 1).to_string()),
        matched_len(&caps),
    )))
}

fn match_bar(line: &str) -> Result<Matched, ParseError> {
    let Some(caps) = RX_BAR.captures(line) else {
        return Ok(None);
    };

    let volta = caps
        .get(2)
        .map(|m| m.as_str().trim_start_matches([' ', '[']).to_string())
        .filter(|v| !v.is_empty());
    let bar = Bar {
        token: group(&caps, 1).to_string(),
        volta,
        close_volta: caps.get(3).is_some(),
    };

    Ok(Some((Symbol::Bar(bar), matched_len(&caps))))
}

/// Length multiplier written after a note: `2`, `/`, `//`, `3/4`, `/8`.
///
/// A divisor only applies together with exactly one slash, otherwise every
/// slash halves the length.
pub fn parse_duration(
    multiplier: &str,
    halving: &str,
    divisor: &str,
) -> Result<Rational, ParseError> {
    let mut duration = Rational::from_integer(1);

    if !multiplier.is_empty() {
        duration *= Rational::from_integer(parse_number(multiplier)?);
    }

    let slashes = halving.chars().filter(|&c| c == '/').count();
    if slashes == 1 && !divisor.is_empty() {
        let divisor_value = parse_number(divisor)?;
        if divisor_value == 0 {
            return Err(ParseError::InvalidNumber(divisor.to_string()));
        }
        duration *= Rational::new(1, divisor_value);
    } else {
        if slashes > MAX_HALVINGS {
            return Err(ParseError::InvalidNumber(halving.to_string()));
        }
        for _ in 0..slashes {
            duration = duration
                .checked_mul(&Rational::new(1, 2))
                .ok_or_else(|| ParseError::InvalidNumber(halving.to_string()))?;
        }
    }

    Ok(duration)
}

fn parse_number(digits: &str) -> Result<i32, ParseError> {
    digits
        .parse()
        .map_err(|_| ParseError::InvalidNumber(digits.to_string()))
}

/// Split a note or chord into its pitches
pub fn parse_pitches(note: &str) -> Vec<NotePitch> {
    RX_NOTE_PITCH
        .captures_iter(note)
        .filter_map(|caps| {
            let letter = group(&caps, 2).chars().next()?;
            let mut octave: i32 = group(&caps, 3)
                .chars()
                .map(|mark| if mark == '\'' { 1 } else { -1 })
                .sum();
            if letter.is_ascii_lowercase() {
                octave += 1;
            }
            Some(NotePitch {
                accidentals: group(&caps, 1).to_string(),
                pitch: letter.to_ascii_lowercase(),
                octave,
            })
        })
        .collect()
}
