//! ABC symbol conversion logic
//!
//! Walks the staves of one tune and emits LilyPond tokens. State that
//! outlives a single symbol (bar accidentals, ties, repeats, voltas and the
//! previous rhythm for broken pairs) lives in `ConversionContext`.

use crate::converters::abc::abc_to_lilypond::errors::ConversionError;
use crate::converters::abc::abc_to_lilypond::fields::{
    FIELD_KEY, FIELD_METER, FIELD_NOTES, FIELD_REMARK, FIELD_UNIT_NOTE_LENGTH,
};
use crate::converters::abc::abc_to_lilypond::key_signature::{parse_key_signature, KeySignature};
use crate::converters::abc::abc_to_lilypond::lilypond::escape_lilypond_string;
use crate::converters::abc::abc_to_lilypond::parser::{parse_meter, parse_note_length};
use crate::converters::abc::abc_to_lilypond::errors::ParseError;
use crate::converters::abc::abc_to_lilypond::rhythm::{
    calculate_duration, checked_product, duration_to_string,
};
use crate::converters::abc::abc_to_lilypond::types::{
    AccidentalScope, Bar, ConversionSettings, Field, Note, NotePitch, Rational, Rest, RestKind,
    Rhythm, Stave, Symbol, Tune, ACCIDENTAL_FLAT, ACCIDENTAL_NATURAL, ACCIDENTAL_SHARP,
};
use std::collections::BTreeMap;

/// Bar accidental entry: pitch letter, plus the octave when accidentals
/// are scoped per octave. Key signature entries never carry an octave.
type AccidentalKey = (char, Option<i32>);

/// Conversion state carried across the staves of one tune
pub struct ConversionContext {
    pub unit_note_length: Rational,
    pub key: KeySignature,
    pub accidental_scope: AccidentalScope,
    bar_accidentals: BTreeMap<AccidentalKey, String>,
    /// Rendered pitch of a tied note, reused verbatim by the next note
    tied_pitch: Option<String>,
    inside_repeat: bool,
    inside_volta: bool,
    previous: Rhythm,
}

impl ConversionContext {
    /// Initial state from the tune header
    pub fn new(tune: &Tune, settings: &ConversionSettings) -> Result<Self, ConversionError> {
        let key = parse_key_signature(&tune.key, KeySignature::none().octave_offset)?;
        let mut context = Self {
            unit_note_length: tune.unit_note_length,
            key,
            accidental_scope: settings.accidental_scope,
            bar_accidentals: BTreeMap::new(),
            tied_pitch: None,
            inside_repeat: false,
            inside_volta: false,
            previous: Rhythm::default(),
        };
        context.reset_bar_accidentals();
        Ok(context)
    }

    /// Convert one stave into a run of space-prefixed LilyPond tokens
    pub fn convert_stave(&mut self, stave: &Stave) -> Result<String, ConversionError> {
        let mut symbols = stave.symbols.clone();
        order_annotations(&mut symbols);

        let mut out = String::new();
        for symbol in &symbols {
            self.convert_symbol(symbol, &mut out)?;

            if let Some(rhythm) = symbol.rhythm() {
                self.previous = rhythm.clone();
            } else if matches!(symbol, Symbol::Bar(_)) {
                self.previous = Rhythm::default();
            }
        }
        Ok(out)
    }

    fn convert_symbol(&mut self, symbol: &Symbol, out: &mut String) -> Result<(), ConversionError> {
        match symbol {
            Symbol::Text(text) => {
                out.push_str(&format!(" ^\"{}\"", escape_lilypond_string(text)));
                Ok(())
            }
            Symbol::Note(note) => self.convert_note(note, out),
            Symbol::Rest(rest) => self.convert_rest(rest, out),
            Symbol::Bar(bar) => self.convert_bar(bar, out),
            Symbol::Decoration(token) => {
                let markup = decoration_to_lilypond(token)
                    .ok_or_else(|| ConversionError::UnhandledDecoration(token.clone()))?;
                out.push_str(markup);
                Ok(())
            }
            Symbol::Field(field) => self.convert_field(field, out),
        }
    }

    fn convert_note(&mut self, note: &Note, out: &mut String) -> Result<(), ConversionError> {
        let duration = calculate_duration(self.unit_note_length, &note.rhythm, &self.previous)?;

        let pitch = match self.tied_pitch.take() {
            Some(pitch) => pitch,
            None => self.resolve_pitch(note)?,
        };

        out.push(' ');
        out.push_str(&pitch);
        out.push_str(&duration_to_string(duration)?);
        if note.rhythm.tie {
            out.push('~');
            self.tied_pitch = Some(pitch);
        }
        Ok(())
    }

    /// Written pitch of a note or chord, updating the bar accidentals
    fn resolve_pitch(&mut self, note: &Note) -> Result<String, ConversionError> {
        let mut rendered = Vec::with_capacity(note.pitches.len());
        // explicit accidentals take effect after the whole chord is read
        let mut pending = Vec::new();

        for component in &note.pitches {
            let mut name = component.pitch.to_string();
            if component.accidentals.is_empty() {
                name.push_str(self.bar_accidental(component));
            } else {
                let suffix = accidental_suffix(&component.accidentals);
                name.push_str(&suffix);
                pending.push((self.accidental_key(component), suffix));
            }

            let octave = component
                .octave
                .checked_add(self.key.octave_offset)
                .ok_or_else(|| ParseError::InvalidOctave(self.key.octave_offset.to_string()))?;
            if octave > 0 {
                name.push_str(&"'".repeat(octave as usize));
            } else if octave < 0 {
                name.push_str(&",".repeat(octave.unsigned_abs() as usize));
            }
            rendered.push(name);
        }

        self.bar_accidentals.extend(pending);

        match rendered.len() {
            0 => Err(ConversionError::EmptyNote),
            1 => Ok(rendered.swap_remove(0)),
            _ => Ok(format!("<{}>", rendered.join(" "))),
        }
    }

    fn accidental_key(&self, component: &NotePitch) -> AccidentalKey {
        match self.accidental_scope {
            AccidentalScope::Pitch => (component.pitch, None),
            AccidentalScope::PitchAndOctave => (component.pitch, Some(component.octave)),
        }
    }

    fn bar_accidental(&self, component: &NotePitch) -> &str {
        let scoped = match self.accidental_scope {
            AccidentalScope::Pitch => None,
            AccidentalScope::PitchAndOctave => self
                .bar_accidentals
                .get(&(component.pitch, Some(component.octave))),
        };
        scoped
            .or_else(|| self.bar_accidentals.get(&(component.pitch, None)))
            .map_or("", String::as_str)
    }

    fn reset_bar_accidentals(&mut self) {
        self.bar_accidentals = self
            .key
            .accidentals
            .iter()
            .map(|(pitch, suffix)| ((*pitch, None), suffix.clone()))
            .collect();
    }

    fn convert_rest(&mut self, rest: &Rest, out: &mut String) -> Result<(), ConversionError> {
        self.tied_pitch = None;
        let duration = calculate_duration(self.unit_note_length, &rest.rhythm, &self.previous)?;

        match rest.kind {
            RestKind::Visible => out.push_str(&format!(" r{}", duration_to_string(duration)?)),
            // the rest is drawn twice the written length, not a measured bar
            RestKind::FullMeasure => {
                let doubled = checked_product(duration, Rational::from_integer(2))?;
                out.push_str(&format!(" r{}", duration_to_string(doubled)?));
            }
            RestKind::Invisible => {}
        }
        Ok(())
    }

    fn convert_bar(&mut self, bar: &Bar, out: &mut String) -> Result<(), ConversionError> {
        self.reset_bar_accidentals();

        match bar.token.as_str() {
            "|" => {
                out.push_str(" |");
                if let Some(command) = self.volta_command(bar, false) {
                    out.push_str(&repeat_commands(&[command]));
                }
            }
            "||" => {
                out.push_str(" \\bar \"||\"");
                if let Some(command) = self.volta_command(bar, true) {
                    out.push_str(&repeat_commands(&[command]));
                }
            }
            "|]" => {
                if self.inside_repeat {
                    return Err(ConversionError::StillInRepeat);
                }
                if let Some(volta) = &bar.volta {
                    return Err(ConversionError::VoltaOnFinalBar(volta.clone()));
                }
                if self.inside_volta || bar.close_volta {
                    self.inside_volta = false;
                    out.push_str(&repeat_commands(&["(volta #f)".to_string()]));
                }
                out.push_str(" \\bar \"|.\"");
            }
            "[|" => out.push_str(" \\bar \".|\""),
            "|:" | "||:" | "::" | ":|:" | ":||:" => {
                let mut commands = Vec::new();
                if self.inside_repeat {
                    commands.push("end-repeat".to_string());
                }
                commands.push("start-repeat".to_string());
                self.inside_repeat = true;

                commands.extend(self.volta_command(bar, true));
                out.push_str(&repeat_commands(&commands));
            }
            ":|" | ":||" | ":|]" | ":]" => {
                let mut commands = vec!["end-repeat".to_string()];
                self.inside_repeat = false;

                commands.extend(self.volta_command(bar, true));
                out.push_str(&repeat_commands(&commands));
            }
            other => return Err(ConversionError::UnhandledBar(other.to_string())),
        }
        Ok(())
    }

    /// Volta bracket change at a bar. `close_open` also closes a bracket
    /// left open by an earlier bar.
    fn volta_command(&mut self, bar: &Bar, close_open: bool) -> Option<String> {
        if let Some(volta) = &bar.volta {
            self.inside_volta = true;
            Some(format!("(volta \"{}\")", escape_lilypond_string(volta)))
        } else if bar.close_volta || (close_open && self.inside_volta) {
            self.inside_volta = false;
            Some("(volta #f)".to_string())
        } else {
            None
        }
    }

    fn convert_field(&mut self, field: &Field, out: &mut String) -> Result<(), ConversionError> {
        match field.tag {
            tag if tag == FIELD_REMARK.tag || tag == FIELD_NOTES.tag => {}
            tag if tag == FIELD_UNIT_NOTE_LENGTH.tag => {
                self.unit_note_length = parse_note_length(&field.value)?;
            }
            tag if tag == FIELD_METER.tag => {
                if let Some(meter) = parse_meter(&field.value)? {
                    out.push_str(&format!(" \\time {}", meter));
                }
            }
            tag if tag == FIELD_KEY.tag => {
                self.key = parse_key_signature(&field.value, self.key.octave_offset)?;
                self.reset_bar_accidentals();
                if let Some(declaration) = self.key.declaration() {
                    out.push(' ');
                    out.push_str(&declaration);
                }
            }
            _ => {
                return Err(ConversionError::UnhandledField {
                    tag: field.tag,
                    value: field.value.clone(),
                })
            }
        }
        Ok(())
    }
}

/// Move each note or rest in front of the decorations and texts written
/// before it, keeping their order. Nothing moves across a bar or field.
pub fn order_annotations(symbols: &mut [Symbol]) {
    let mut i = symbols.len();
    while i > 0 {
        i -= 1;
        if !symbols[i].is_timed() {
            continue;
        }

        let mut start = i;
        while start > 0 && symbols[start - 1].is_annotation() {
            start -= 1;
        }
        symbols[start..=i].rotate_right(1);
        i = start;
    }
}

/// `^` sharpens, `_` flattens, `=` cancels everything before it
fn accidental_suffix(accidentals: &str) -> String {
    let mut suffix = String::new();
    for marker in accidentals.chars() {
        match marker {
            ACCIDENTAL_SHARP => suffix.push_str("is"),
            ACCIDENTAL_FLAT => suffix.push_str("es"),
            ACCIDENTAL_NATURAL => suffix.clear(),
            _ => {}
        }
    }
    suffix
}

fn repeat_commands(commands: &[String]) -> String {
    format!(" \\set Score.repeatCommands = #'({})", commands.join(" "))
}

/// LilyPond markup for a decoration token
fn decoration_to_lilypond(token: &str) -> Option<&'static str> {
    let markup = match token {
        "." | "!staccato!" => "-.",
        "!marcato!" => "-^",
        "L" | "!accent!" => "->",
        "!tenuto!" => "--",
        "H" | "!fermata!" => "\\fermata",
        "T" | "!trill!" => "\\trill",
        "~" | "!turn!" => "\\turn",
        "M" | "!mordent!" => "\\mordent",
        "P" | "!pralltriller!" => "\\prall",
        "u" | "!upbow!" => "\\upbow",
        "v" | "!downbow!" => "\\downbow",
        "S" | "!segno!" => " \\segnoMark 1 ",
        "O" | "!coda!" => " \\codaMark 1 ",
        _ => return None,
    };
    Some(markup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::abc::abc_to_lilypond::parser::parse;

    fn convert_with(body: &str, settings: &ConversionSettings) -> Result<String, ConversionError> {
        let parsed = parse(&format!("X:1\n{}", body)).unwrap();
        assert!(parsed.warnings.is_empty(), "{:?}", parsed.warnings);
        let tune = &parsed.book.tunes[0];

        let mut context = ConversionContext::new(tune, settings)?;
        let mut out = String::new();
        for stave in &tune.body.staves {
            out.push_str(&context.convert_stave(stave)?);
        }
        Ok(out)
    }

    fn convert(body: &str) -> Result<String, ConversionError> {
        convert_with(body, &ConversionSettings::default())
    }

    fn bar(token: &str) -> Symbol {
        Symbol::Bar(Bar {
            token: token.to_string(),
            volta: None,
            close_volta: false,
        })
    }

    #[test]
    fn test_key_accidentals_and_octaves() {
        assert_eq!(convert("K:D\nF C, c'").unwrap(), " fis'4 cis4 cis'''4");
    }

    #[test]
    fn test_explicit_accidental_lasts_until_bar() {
        assert_eq!(convert("K:C\n^c c | c").unwrap(), " cis''4 cis''4 | c''4");
        assert_eq!(convert("K:D\n=F F | F").unwrap(), " f'4 f'4 | fis'4");
        assert_eq!(convert("K:C\n__B ^=c").unwrap(), " beses'4 c''4");
    }

    #[test]
    fn test_accidental_scope() {
        assert_eq!(convert("K:C\n^c C").unwrap(), " cis''4 cis'4");

        let settings = ConversionSettings {
            accidental_scope: AccidentalScope::PitchAndOctave,
            ..ConversionSettings::default()
        };
        assert_eq!(convert_with("K:C\n^c C c", &settings).unwrap(), " cis''4 c'4 cis''4");
        assert_eq!(convert_with("K:D\n=f F", &settings).unwrap(), " f''4 fis'4");
    }

    #[test]
    fn test_tie_reuses_rendered_pitch() {
        assert_eq!(
            convert("K:D\n[FA]2- F2 F").unwrap(),
            " <fis' a'>2~ <fis' a'>2 fis'4"
        );
        // across a bar the pitch text still carries over
        assert_eq!(convert("K:C\n^c- | c").unwrap(), " cis''4~ | cis''4");
    }

    #[test]
    fn test_rest_clears_tie() {
        assert_eq!(convert("K:C\n^c- z c").unwrap(), " cis''4~ r4 cis''4");
    }

    #[test]
    fn test_broken_rhythm() {
        assert_eq!(convert("L:1/8\nK:C\nA>B c<d | e").unwrap(), " a'8. b'16 c''16 d''8. | e''8");
    }

    #[test]
    fn test_rests() {
        assert_eq!(convert("L:1/8\nK:C\nz2 Z x4 y").unwrap(), " r4 r4");
    }

    #[test]
    fn test_annotations_follow_their_note() {
        assert_eq!(convert("K:C\n!fermata!\"Am\"A .B").unwrap(), " a'4\\fermata ^\"Am\" b'4-.");
        assert_eq!(convert("K:C\n!segno! A").unwrap(), " a'4 \\segnoMark 1 ");
    }

    #[test]
    fn test_order_annotations() {
        let note = Symbol::Note(Note {
            pitches: vec![NotePitch { accidentals: String::new(), pitch: 'a', octave: 0 }],
            rhythm: Rhythm::new(Rational::from_integer(1), 0, false),
        });
        let deco = Symbol::Decoration(".".to_string());
        let text = Symbol::Text("x".to_string());

        let mut symbols = vec![deco.clone(), bar("|"), text.clone(), deco.clone(), note.clone()];
        order_annotations(&mut symbols);
        assert_eq!(symbols, vec![deco.clone(), bar("|"), note.clone(), text, deco]);
    }

    #[test]
    fn test_unhandled_decoration_is_fatal() {
        assert_eq!(
            convert("K:C\n!wobble!A").unwrap_err(),
            ConversionError::UnhandledDecoration("!wobble!".to_string())
        );
    }

    #[test]
    fn test_plain_barlines() {
        assert_eq!(
            convert("K:C\nA | B || c |]").unwrap(),
            " a'4 | b'4 \\bar \"||\" c''4 \\bar \"|.\""
        );
        assert_eq!(convert("K:C\n[| A").unwrap(), " \\bar \".|\" a'4");
    }

    #[test]
    fn test_repeats() {
        assert_eq!(
            convert("K:C\n|: A :|").unwrap(),
            concat!(
                " \\set Score.repeatCommands = #'(start-repeat) a'4",
                " \\set Score.repeatCommands = #'(end-repeat)",
            )
        );
        assert_eq!(
            convert("K:C\nA :|: B :: c").unwrap(),
            concat!(
                " a'4 \\set Score.repeatCommands = #'(start-repeat) b'4",
                " \\set Score.repeatCommands = #'(end-repeat start-repeat) c''4",
            )
        );
        // closing without an explicit start repeats back to the beginning
        assert_eq!(
            convert("K:C\nA :| B |]").unwrap(),
            " a'4 \\set Score.repeatCommands = #'(end-repeat) b'4 \\bar \"|.\""
        );
    }

    #[test]
    fn test_voltas() {
        assert_eq!(
            convert("K:C\n|: A |1 B :|2 c || d").unwrap(),
            concat!(
                " \\set Score.repeatCommands = #'(start-repeat) a'4",
                " | \\set Score.repeatCommands = #'((volta \"1\")) b'4",
                " \\set Score.repeatCommands = #'(end-repeat (volta \"2\")) c''4",
                " \\bar \"||\" \\set Score.repeatCommands = #'((volta #f)) d''4",
            )
        );
        assert_eq!(
            convert("K:C\nA :|: [2 B").unwrap(),
            " a'4 \\set Score.repeatCommands = #'(start-repeat (volta \"2\")) b'4"
        );
    }

    #[test]
    fn test_final_bar_closes_open_volta() {
        let out = convert("K:C\n|: A |1 B :|2 c |]").unwrap();
        assert!(out.ends_with(
            " c''4 \\set Score.repeatCommands = #'((volta #f)) \\bar \"|.\""
        ));
        let close = out.find("(volta #f)").unwrap();
        let final_bar = out.find("\\bar \"|.\"").unwrap();
        assert!(close < final_bar);
    }

    #[test]
    fn test_duration_overflow_is_an_error() {
        assert!(matches!(
            convert("L:1/8\nK:C\nA>>>>>>>>>>>>>>>>>>>>>B|").unwrap_err(),
            ConversionError::UnhandledDuration(_)
        ));
        assert!(matches!(
            convert("L:1/1024\nK:C\nA//////////////////////|").unwrap_err(),
            ConversionError::UnhandledDuration(_)
        ));
    }

    #[test]
    fn test_octave_overflow_is_an_error() {
        assert_eq!(
            convert("K:C octave=2147483646\nc").unwrap_err(),
            ConversionError::Parse(ParseError::InvalidOctave("2147483647".to_string()))
        );
    }

    #[test]
    fn test_close_volta_flag() {
        let tune = Tune::new("", Rational::new(1, 4));
        let mut context = ConversionContext::new(&tune, &ConversionSettings::default()).unwrap();
        let stave = Stave {
            symbols: vec![Symbol::Bar(Bar {
                token: "|".to_string(),
                volta: None,
                close_volta: true,
            })],
        };
        assert_eq!(
            context.convert_stave(&stave).unwrap(),
            " | \\set Score.repeatCommands = #'((volta #f))"
        );
    }

    #[test]
    fn test_final_bar_errors() {
        assert_eq!(convert("K:C\n|: A |]").unwrap_err(), ConversionError::StillInRepeat);
        assert_eq!(
            convert("K:C\nA |][1 B").unwrap_err(),
            ConversionError::VoltaOnFinalBar("1".to_string())
        );
        assert_eq!(
            convert("K:C\nA [|| B").unwrap_err(),
            ConversionError::UnhandledBar("[||".to_string())
        );
    }

    #[test]
    fn test_inline_fields() {
        assert_eq!(convert("K:C\nA [L:1/8] A [M:3/4] B").unwrap(), " a'4 a'8 \\time 3/4 b'8");
        assert_eq!(convert("K:C\n[r:remark] A").unwrap(), " a'4");
        assert_eq!(
            convert("K:C\n[P:A] A").unwrap_err(),
            ConversionError::UnhandledField { tag: 'P', value: "A".to_string() }
        );
    }

    #[test]
    fn test_inline_key_change() {
        assert_eq!(convert("K:D\nF [K:Dm] F B").unwrap(), " fis'4 \\key d \\minor f'4 bes'4");
        assert_eq!(convert("K:C\n[K:C octave=-1] c").unwrap(), " \\key c \\major c'4");
    }

    #[test]
    fn test_unknown_inline_key_is_fatal() {
        let err = convert("K:C\n[K:Hx] A").unwrap_err();
        assert!(matches!(err, ConversionError::Parse(_)));
    }

    #[test]
    fn test_unhandled_duration() {
        assert_eq!(
            convert("K:C\nA5").unwrap_err(),
            ConversionError::UnhandledDuration(Rational::new(5, 4))
        );
    }
}
