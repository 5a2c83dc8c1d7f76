//! Tune assembler
//!
//! Splits an ABC document into tunes, reads each tune's header fields and
//! turns every body line into a stave of tokenized symbols.

use crate::converters::abc::abc_to_lilypond::errors::ParseError;
use crate::converters::abc::abc_to_lilypond::fields::{
    field_def, FIELD_KEY, FIELD_METER, FIELD_NOTES, FIELD_REFERENCE_NUMBER, FIELD_REMARK,
    FIELD_TUNE_TITLE, FIELD_UNIT_NOTE_LENGTH,
};
use crate::converters::abc::abc_to_lilypond::tokens::tokenize_line;
use crate::converters::abc::abc_to_lilypond::types::{
    ConversionSettings, Field, Meter, ParsedBook, Rational, Stave, Symbol, Tune, TuneBook,
    Warning,
};
use lazy_static::lazy_static;
use regex::Regex;

/// Tags accepted on their own line in a tune body
const BODY_FIELD_TAGS: [char; 5] = [
    FIELD_KEY.tag,
    FIELD_UNIT_NOTE_LENGTH.tag,
    FIELD_METER.tag,
    FIELD_NOTES.tag,
    FIELD_REMARK.tag,
];

lazy_static! {
    static ref RX_HEADER: Regex = Regex::new(r"^([a-zA-Z]):(.*)$").expect("header pattern");
    static ref RX_NEW_TUNE: Regex = Regex::new(r"(?m)^X:").expect("tune start pattern");
}

/// Parse a whole ABC document with default settings
pub fn parse(content: &str) -> Result<ParsedBook, ParseError> {
    parse_with_settings(content, &ConversionSettings::default())
}

pub fn parse_with_settings(
    content: &str,
    settings: &ConversionSettings,
) -> Result<ParsedBook, ParseError> {
    Parser::new(settings).parse_book(content)
}

/// Accumulates tunes and warnings over one document
pub struct Parser {
    book: TuneBook,
    warnings: Vec<Warning>,
    default_meter: Option<Meter>,
    default_unit_note_length: Rational,
}

impl Parser {
    pub fn new(settings: &ConversionSettings) -> Self {
        Self {
            book: TuneBook::default(),
            warnings: Vec::new(),
            default_meter: None,
            default_unit_note_length: settings.default_unit_note_length,
        }
    }

    pub fn parse_book(mut self, content: &str) -> Result<ParsedBook, ParseError> {
        for chunk in split_tune_book(content) {
            if is_file_header(chunk) {
                self.parse_file_header(chunk)?;
            } else {
                self.parse_tune(chunk)?;
            }
        }

        log::debug!(
            "parsed {} tunes with {} warnings",
            self.book.tunes.len(),
            self.warnings.len()
        );
        Ok(ParsedBook {
            book: self.book,
            warnings: self.warnings,
        })
    }

    /// Fields before the first tune apply to every tune that follows
    fn parse_file_header(&mut self, content: &str) -> Result<(), ParseError> {
        for field in content.lines().map(clean_line).filter_map(header_field) {
            if field.tag == FIELD_METER.tag {
                self.default_meter = parse_meter(&field.value)?;
            } else if field.tag == FIELD_UNIT_NOTE_LENGTH.tag {
                self.default_unit_note_length = parse_note_length(&field.value)?;
            }
            self.book.header.push(field);
        }
        Ok(())
    }

    fn parse_tune(&mut self, content: &str) -> Result<(), ParseError> {
        let mut tune = Tune::new(content, self.default_unit_note_length);
        tune.meter = self.default_meter;

        let mut in_header = true;
        // field lines in the body apply from the next music line on
        let mut pending_fields = Vec::new();
        for line in content.lines().map(clean_line).filter(|l| !l.is_empty()) {
            if in_header {
                if let Some(field) = header_field(line) {
                    in_header =
                        apply_header_field(&mut tune, &field).map_err(|err| err.in_tune(&tune.id))?;
                    tune.fields.push(field);
                    continue;
                }
                // body started without a `K:` line
                in_header = false;
            }

            if let Some(field) = body_field(line) {
                pending_fields.push(Symbol::Field(field));
                continue;
            }

            let mut stave = Stave {
                symbols: std::mem::take(&mut pending_fields),
            };
            let rest = tokenize_line(line, &mut stave.symbols)
                .map_err(|err| err.in_tune(&tune.id))?;
            if !stave.symbols.is_empty() {
                tune.body.staves.push(stave);
            }
            if !rest.is_empty() {
                self.warn(rest);
            }
        }

        if !pending_fields.is_empty() {
            match tune.body.staves.last_mut() {
                Some(stave) => stave.symbols.append(&mut pending_fields),
                None => tune.body.staves.push(Stave {
                    symbols: pending_fields,
                }),
            }
        }

        log::debug!(
            "parsed tune {:?} with {} staves",
            tune.id,
            tune.body.staves.len()
        );
        self.book.tunes.push(tune);
        Ok(())
    }

    fn warn(&mut self, fragment: &str) {
        let warning = Warning::unparsed(fragment);
        log::warn!("{}", warning);
        self.warnings.push(warning);
    }
}

/// Returns whether the header continues after this field
fn apply_header_field(tune: &mut Tune, field: &Field) -> Result<bool, ParseError> {
    match field.tag {
        tag if tag == FIELD_REFERENCE_NUMBER.tag => tune.id = field.value.clone(),
        tag if tag == FIELD_TUNE_TITLE.tag => {
            // later titles are subtitles
            if tune.title.is_empty() {
                tune.title = field.value.clone();
            }
        }
        tag if tag == FIELD_METER.tag => tune.meter = parse_meter(&field.value)?,
        tag if tag == FIELD_UNIT_NOTE_LENGTH.tag => {
            tune.unit_note_length = parse_note_length(&field.value)?
        }
        tag if tag == FIELD_KEY.tag => {
            tune.key = field.value.clone();
            return Ok(false);
        }
        _ => {}
    }
    Ok(true)
}

/// Split a document at every line starting with `X:`, dropping chunks
/// without visible content
pub fn split_tune_book(content: &str) -> Vec<&str> {
    let mut starts: Vec<usize> = RX_NEW_TUNE.find_iter(content).map(|m| m.start()).collect();
    starts.push(content.len());

    let mut tunes = Vec::new();
    let mut start = 0;
    for end in starts {
        let chunk = content[start..end].trim();
        if has_visible_content(chunk) {
            tunes.push(chunk);
        }
        start = end;
    }
    tunes
}

/// A leading chunk made only of fields that may appear in a file header.
/// Anything else is read as a tune, with or without a reference number.
fn is_file_header(chunk: &str) -> bool {
    chunk
        .lines()
        .map(clean_line)
        .filter(|line| !line.is_empty())
        .all(|line| {
            header_field(line)
                .and_then(|field| field_def(field.tag))
                .map_or(false, |def| def.contexts.file_header)
        })
}

fn has_visible_content(chunk: &str) -> bool {
    chunk.lines().any(|line| !clean_line(line).is_empty())
}

/// Field line inside a tune body that changes how the music reads
fn body_field(line: &str) -> Option<Field> {
    header_field(line).filter(|field| BODY_FIELD_TAGS.contains(&field.tag))
}

fn header_field(line: &str) -> Option<Field> {
    let caps = RX_HEADER.captures(line)?;
    let tag = caps.get(1)?.as_str().chars().next()?;
    let value = caps.get(2).map_or("", |m| m.as_str());
    Some(Field::new(tag, value))
}

/// Strip a trailing comment and trailing whitespace
pub fn clean_line(line: &str) -> &str {
    trim_comment(line).trim_end_matches([' ', '\t', '\n', '\r'])
}

/// Cut the line at the first `%` that is not escaped as `\%`
fn trim_comment(line: &str) -> &str {
    let mut escaped = false;
    for (i, c) in line.char_indices() {
        match c {
            '%' if !escaped => return &line[..i],
            '\\' => escaped = !escaped,
            _ => escaped = false,
        }
    }
    line
}

/// `M:` value: `6/8`, `C` (4/4), `C|` (2/2) or `none`
pub fn parse_meter(value: &str) -> Result<Option<Meter>, ParseError> {
    let value = value.trim();
    let invalid = || ParseError::InvalidMeter(value.to_string());

    match value {
        "none" => return Ok(None),
        "C" => return Ok(Some(Meter { beats_per_measure: 4, beat_length: 4 })),
        "C|" => return Ok(Some(Meter { beats_per_measure: 2, beat_length: 2 })),
        _ => {}
    }

    let (beats, length) = value.split_once('/').ok_or_else(invalid)?;
    let beats_per_measure: u32 = beats.trim().parse().map_err(|_| invalid())?;
    let beat_length: u32 = length.trim().parse().map_err(|_| invalid())?;
    if beat_length == 0 {
        return Err(invalid());
    }

    Ok(Some(Meter {
        beats_per_measure,
        beat_length,
    }))
}

/// `L:` value, always a fraction such as `1/8`
pub fn parse_note_length(value: &str) -> Result<Rational, ParseError> {
    let value = value.trim();
    let invalid = || ParseError::InvalidNoteLength(value.to_string());

    let (numer, denom) = value.split_once('/').ok_or_else(invalid)?;
    let numer: i32 = numer.trim().parse().map_err(|_| invalid())?;
    let denom: i32 = denom.trim().parse().map_err(|_| invalid())?;
    if numer <= 0 || denom <= 0 {
        return Err(invalid());
    }

    Ok(Rational::new(numer, denom))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_tune_book() {
        let content = "% file comment\n\nX:1\nT:One\n\nX:2\nT:Two\n";
        let tunes = split_tune_book(content);
        assert_eq!(tunes, vec!["X:1\nT:One", "X:2\nT:Two"]);
    }

    #[test]
    fn test_split_keeps_file_header() {
        let tunes = split_tune_book("L:1/8\nX:1\nK:C\nabc|");
        assert_eq!(tunes, vec!["L:1/8", "X:1\nK:C\nabc|"]);
    }

    #[test]
    fn test_clean_line() {
        assert_eq!(clean_line("abc | % comment"), "abc |");
        assert_eq!(clean_line("%%MIDI program 1"), "");
        assert_eq!(clean_line("\"50\\% off\" A\t\r"), "\"50\\% off\" A");
    }

    #[test]
    fn test_parse_meter() {
        assert_eq!(
            parse_meter("6/8").unwrap(),
            Some(Meter { beats_per_measure: 6, beat_length: 8 })
        );
        assert_eq!(
            parse_meter("C|").unwrap(),
            Some(Meter { beats_per_measure: 2, beat_length: 2 })
        );
        assert_eq!(parse_meter("none").unwrap(), None);
        assert_eq!(
            parse_meter("2+3/8").unwrap_err(),
            ParseError::InvalidMeter("2+3/8".to_string())
        );
        assert!(parse_meter("3").is_err());
        assert!(parse_meter("3/0").is_err());
    }

    #[test]
    fn test_parse_note_length() {
        assert_eq!(parse_note_length("1/8").unwrap(), Rational::new(1, 8));
        assert_eq!(parse_note_length(" 2/16 ").unwrap(), Rational::new(1, 8));
        assert!(parse_note_length("1/0").is_err());
        assert!(parse_note_length("1").is_err());
    }

    #[test]
    fn test_header_fields() {
        let parsed = parse("X:7\nT:Title\nT:Subtitle\nC:Trad.\nM:3/4\nL:1/8\nK:G\nabc|\n").unwrap();
        let tune = &parsed.book.tunes[0];
        assert_eq!(tune.id, "7");
        assert_eq!(tune.title, "Title");
        assert_eq!(tune.key, "G");
        assert_eq!(tune.meter, Some(Meter { beats_per_measure: 3, beat_length: 4 }));
        assert_eq!(tune.unit_note_length, Rational::new(1, 8));
        assert_eq!(tune.fields.len(), 7);
        assert_eq!(tune.fields[3], Field::new('C', "Trad."));
        assert_eq!(tune.body.staves.len(), 1);
    }

    #[test]
    fn test_body_without_key_line() {
        let parsed = parse("X:1\nT:No key\nabc|\nW:words\n").unwrap();
        let tune = &parsed.book.tunes[0];
        assert_eq!(tune.key, "");
        assert_eq!(tune.body.staves.len(), 1);
        // `W:` is not a body field and cannot be tokenized
        assert_eq!(parsed.warnings, vec![Warning::unparsed("W:words")]);
    }

    #[test]
    fn test_body_field_lines() {
        let parsed = parse("X:1\nK:C\nAB|\nM:3/4\nr:remark\ncd|\nK:G\n").unwrap();
        assert!(parsed.warnings.is_empty());
        let staves = &parsed.book.tunes[0].body.staves;
        assert_eq!(staves.len(), 2);
        assert_eq!(staves[1].symbols[0], Symbol::Field(Field::new('M', "3/4")));
        assert_eq!(staves[1].symbols[1], Symbol::Field(Field::new('r', "remark")));
        // trailing fields join the last stave
        assert_eq!(staves[1].symbols.last(), Some(&Symbol::Field(Field::new('K', "G"))));
    }

    #[test]
    fn test_empty_staves_are_dropped() {
        let parsed = parse("X:1\nK:C\n% only a comment\n(((\nabc|\n").unwrap();
        let tune = &parsed.book.tunes[0];
        assert_eq!(tune.body.staves.len(), 1);
        assert_eq!(parsed.warnings.len(), 1);
        assert_eq!(parsed.warnings[0].fragment, "(((");
    }

    #[test]
    fn test_file_header_defaults() {
        let content = "M:6/8\nL:1/8\nZ:someone\n\nX:1\nK:C\nabc|\n\nX:2\nL:1/4\nK:C\nabc|\n";
        let parsed = parse(content).unwrap();
        assert_eq!(parsed.book.header.len(), 3);
        let first = &parsed.book.tunes[0];
        assert_eq!(first.meter, Some(Meter { beats_per_measure: 6, beat_length: 8 }));
        assert_eq!(first.unit_note_length, Rational::new(1, 8));
        assert_eq!(parsed.book.tunes[1].unit_note_length, Rational::new(1, 4));
    }

    #[test]
    fn test_tune_without_reference_number() {
        let parsed = parse("K:C\nM:4/4\nL:1/4\nABC|").unwrap();
        assert!(parsed.book.header.is_empty());
        assert!(parsed.warnings.is_empty());
        let tune = &parsed.book.tunes[0];
        assert_eq!(tune.id, "");
        assert_eq!(tune.key, "C");
        // the header ended at `K:`, later fields belong to the body
        assert_eq!(tune.fields.len(), 1);
        assert_eq!(tune.body.staves.len(), 1);
        assert_eq!(tune.body.staves[0].symbols.len(), 6);
    }

    #[test]
    fn test_malformed_header_value_is_fatal() {
        let err = parse("X:4\nM:three/4\nK:C\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidMeter("three/4".to_string()).in_tune("4")
        );
    }
}
