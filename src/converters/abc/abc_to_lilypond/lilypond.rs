//! LilyPond notation generation
//!
//! Wraps the converted staves of a tune in a `\score` block with its
//! header, and joins scores into a whole-book document.

use crate::converters::abc::abc_to_lilypond::converter::ConversionContext;
use crate::converters::abc::abc_to_lilypond::errors::ConversionError;
use crate::converters::abc::abc_to_lilypond::fields::{FIELD_COMPOSER, FIELD_HISTORY, FIELD_TEMPO};
use crate::converters::abc::abc_to_lilypond::templates::{
    render_lilypond, LilyPondTemplate, TemplateContext,
};
use crate::converters::abc::abc_to_lilypond::types::{ConversionSettings, Tune, TuneBook};

/// Header keys written for tune fields, in addition to `piece`
const HEADER_KEYS: &[(char, &str)] = &[
    (FIELD_COMPOSER.tag, "composer"),
    (FIELD_HISTORY.tag, "history"),
    (FIELD_TEMPO.tag, "tempo"),
];

/// Render one tune as a `\score` block
pub fn render_tune(tune: &Tune, settings: &ConversionSettings) -> Result<String, ConversionError> {
    generate_score(tune, settings).map_err(|err| err.in_tune(&tune.id))
}

fn generate_score(tune: &Tune, settings: &ConversionSettings) -> Result<String, ConversionError> {
    let mut context = ConversionContext::new(tune, settings)?;
    let mut output = String::new();

    output.push_str("\\score {\n");
    output.push_str(&generate_header(tune));

    output.push_str("  \\new Staff{\n");
    if let Some(preamble) = &settings.staff_preamble {
        output.push_str(&format!("  {}\n", preamble));
    }

    if let Some(meter) = &tune.meter {
        output.push_str(&format!("    \\time {}", meter));
    }
    if let Some(declaration) = context.key.declaration() {
        output.push_str(&format!(" {}", declaration));
    }
    output.push('\n');

    for (i, stave) in tune.body.staves.iter().enumerate() {
        if i > 0 {
            output.push_str(" \\break\n");
        }
        output.push_str("   ");
        output.push_str(&context.convert_stave(stave)?);
    }
    output.push('\n');

    output.push_str("  }\n");
    output.push_str("}\n");

    log::debug!("rendered tune {:?}", tune.id);
    Ok(output)
}

fn generate_header(tune: &Tune) -> String {
    let mut header = String::from("  \\header {\n");
    header.push_str(&format!(
        "      piece = \"{}\"\n",
        escape_lilypond_string(&tune.title)
    ));

    for field in &tune.fields {
        if let Some((_, key)) = HEADER_KEYS.iter().find(|(tag, _)| *tag == field.tag) {
            header.push_str(&format!(
                "      {} = \"{}\"\n",
                key,
                escape_lilypond_string(&field.value)
            ));
        }
    }

    header.push_str("  }\n");
    header
}

/// Render every tune of a book into one document
pub fn render_book(
    book: &TuneBook,
    settings: &ConversionSettings,
) -> Result<String, ConversionError> {
    let mut scores = String::new();
    for tune in &book.tunes {
        scores.push_str(&render_tune(tune, settings)?);
    }

    let context = TemplateContext::builder(scores.clone())
        .version(settings.target_lilypond_version.clone())
        .build();

    match render_lilypond(LilyPondTemplate::Book, &context) {
        Ok(output) => Ok(output),
        Err(e) => {
            log::warn!("Template rendering failed: {}", e);
            Ok(generate_book_fallback(scores, settings))
        }
    }
}

/// Used if template rendering fails
fn generate_book_fallback(scores: String, settings: &ConversionSettings) -> String {
    match &settings.target_lilypond_version {
        Some(version) => format!("\\version \"{}\"\n\n{}", escape_lilypond_string(version), scores),
        None => scores,
    }
}

/// Escape a string for a LilyPond double-quoted literal
pub fn escape_lilypond_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
}
