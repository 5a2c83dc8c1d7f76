//! One LilyPond file per tune
//!
//! Every tune with a reference number is written to `<id>.ly` inside the
//! output directory, and `_index.ly` includes each file that was written.

use crate::converters::abc::abc_to_lilypond::errors::ExportError;
use crate::converters::abc::abc_to_lilypond::lilypond::render_tune;
use crate::converters::abc::abc_to_lilypond::templates::{
    render_lilypond, LilyPondTemplate, TemplateContext,
};
use crate::converters::abc::abc_to_lilypond::types::{ConversionSettings, TuneBook};
use std::fs;
use std::path::Path;

pub const INDEX_FILE_NAME: &str = "_index.ly";

/// Write each tune and the index file into `dir`, creating it if needed.
///
/// Returns the file names listed in the index. A tune that fails to render
/// stops the export, a tune file that fails to write is only logged.
pub fn export_tunes(
    book: &TuneBook,
    settings: &ConversionSettings,
    dir: &Path,
) -> Result<Vec<String>, ExportError> {
    fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::new();
    for tune in &book.tunes {
        if tune.id.is_empty() {
            log::warn!("skipping tune {:?} without reference number", tune.title);
            continue;
        }

        let source = render_tune(tune, settings)?;
        let file_name = format!("{}.ly", tune.id);
        let path = dir.join(&file_name);
        if let Err(err) = fs::write(&path, source) {
            log::error!("failed to write {}: {}", path.display(), err);
            continue;
        }
        written.push(file_name);
    }

    let index_path = dir.join(INDEX_FILE_NAME);
    fs::write(&index_path, generate_index(&written, settings)).map_err(|source| ExportError::Io {
        path: index_path.clone(),
        source,
    })?;

    log::info!("exported {} tunes to {}", written.len(), dir.display());
    Ok(written)
}

fn generate_index(files: &[String], settings: &ConversionSettings) -> String {
    let context = files
        .iter()
        .fold(TemplateContext::builder(String::new()), |builder, file| builder.include(file))
        .version(settings.target_lilypond_version.clone())
        .build();

    match render_lilypond(LilyPondTemplate::Index, &context) {
        Ok(output) => output,
        Err(e) => {
            log::warn!("Template rendering failed: {}", e);
            context
                .includes
                .iter()
                .map(|entry| format!("\\include {}\n", entry.path))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converters::abc::abc_to_lilypond::parser::parse;

    #[test]
    fn test_generate_index() {
        let files = vec!["1.ly".to_string(), "2.ly".to_string()];
        let index = generate_index(&files, &ConversionSettings::default());
        assert!(index.contains("\\include \"1.ly\"\n\\include \"2.ly\"\n"));
        assert!(!index.contains("\\version"));
    }

    #[test]
    fn test_export_skips_tunes_without_id() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("scores");
        let book = parse("X:\nT:Anonymous\nK:C\nA|\n\nX:5\nK:C\nB|\n").unwrap().book;

        let written = export_tunes(&book, &ConversionSettings::default(), &out).unwrap();
        assert_eq!(written, vec!["5.ly".to_string()]);
        assert!(out.join("5.ly").exists());

        let index = fs::read_to_string(out.join(INDEX_FILE_NAME)).unwrap();
        assert!(index.contains("\\include \"5.ly\""));
    }
}
