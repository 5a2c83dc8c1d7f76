//! LilyPond template rendering system
//!
//! Mustache templates for the documents that wrap rendered scores:
//!
//! - `Book`: every score of a tune book in one document
//! - `Index`: one `\include` line per exported tune file
//!
//! Both templates start with a `\version` line when a target version is
//! configured. Score text itself is produced by `lilypond.rs` and passed in
//! unescaped.

use crate::converters::abc::abc_to_lilypond::lilypond::escape_lilypond_string;
use serde::Serialize;

/// Template selection for LilyPond output
#[derive(Debug, Clone, Copy)]
pub enum LilyPondTemplate {
    /// Concatenated scores
    Book,
    /// `\include` list for per-tune exports
    Index,
}

/// One `\include` target, already quoted for LilyPond
#[derive(Debug, Clone, Serialize)]
pub struct IncludeEntry {
    pub path: String,
}

/// Context data for template rendering
#[derive(Debug, Clone, Serialize)]
pub struct TemplateContext {
    /// Mustache sections cannot test an empty string, so the flag is explicit
    pub has_version: bool,

    /// LilyPond version (e.g., "2.24.0")
    pub version: String,

    /// Rendered scores
    pub scores: String,

    pub includes: Vec<IncludeEntry>,
}

impl TemplateContext {
    pub fn new(scores: String) -> Self {
        Self {
            has_version: false,
            version: String::new(),
            scores,
            includes: Vec::new(),
        }
    }

    /// Builder pattern for fluent API
    pub fn builder(scores: String) -> TemplateContextBuilder {
        TemplateContextBuilder::new(scores)
    }
}

/// Builder for TemplateContext
pub struct TemplateContextBuilder {
    context: TemplateContext,
}

impl TemplateContextBuilder {
    pub fn new(scores: String) -> Self {
        Self {
            context: TemplateContext::new(scores),
        }
    }

    /// Set the target version, `None` leaves the `\version` line out
    pub fn version(mut self, version: Option<String>) -> Self {
        self.context.has_version = version.is_some();
        self.context.version = version.unwrap_or_default();
        self
    }

    /// Add an include target, quoting it
    pub fn include<S: AsRef<str>>(mut self, path: S) -> Self {
        self.context.includes.push(IncludeEntry {
            path: format!("\"{}\"", escape_lilypond_string(path.as_ref())),
        });
        self
    }

    pub fn build(self) -> TemplateContext {
        self.context
    }
}

/// Get template content by type
pub fn get_template_content(template_type: LilyPondTemplate) -> &'static str {
    match template_type {
        LilyPondTemplate::Book => include_str!("templates/book.ly.mustache"),
        LilyPondTemplate::Index => include_str!("templates/index.ly.mustache"),
    }
}

/// Render a LilyPond document using a template
pub fn render_lilypond(
    template_type: LilyPondTemplate,
    context: &TemplateContext,
) -> Result<String, Box<dyn std::error::Error>> {
    let template_content = get_template_content(template_type);
    let template = mustache::compile_str(template_content)?;
    Ok(template.render_to_string(context)?)
}
