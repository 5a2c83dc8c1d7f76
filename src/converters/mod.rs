//! Format converters
//!
//! This module contains converters between different music notation formats.

pub mod abc;

// Re-export for convenience
pub use abc::{convert_abc_to_lilypond, ConversionResult, ConversionSettings};
