//! Duration arithmetic
//!
//! ABC lengths are multiples of the unit note length, adjusted by broken
//! rhythm markers on the current and previous symbol. LilyPond wants a
//! power-of-two denominator with optional dots.

use crate::converters::abc::abc_to_lilypond::errors::ConversionError;
use crate::converters::abc::abc_to_lilypond::types::{Rational, Rhythm};
use num_traits::CheckedMul;

/// Absolute duration of `current` as a fraction of a whole note.
///
/// `>` on a symbol lengthens it by half and shortens the next one by half,
/// `<` does the reverse. A length that does not fit an `i32` fraction is an
/// `UnhandledDuration` carrying the last representable value.
pub fn calculate_duration(
    unit: Rational,
    current: &Rhythm,
    previous: &Rhythm,
) -> Result<Rational, ConversionError> {
    let dotted = Rational::new(3, 2);
    let halved = Rational::new(1, 2);

    let duration = checked_product(unit, current.duration)?;
    let duration = apply_syncopation(duration, current.syncopation, dotted, halved)?;
    apply_syncopation(duration, -previous.syncopation, dotted, halved)
}

fn apply_syncopation(
    duration: Rational,
    count: i32,
    longer: Rational,
    shorter: Rational,
) -> Result<Rational, ConversionError> {
    let base = if count >= 0 { longer } else { shorter };
    let mut duration = duration;
    for _ in 0..count.unsigned_abs() {
        duration = checked_product(duration, base)?;
    }
    Ok(duration)
}

/// `a * b`, or `UnhandledDuration(a)` on overflow
pub fn checked_product(a: Rational, b: Rational) -> Result<Rational, ConversionError> {
    a.checked_mul(&b).ok_or(ConversionError::UnhandledDuration(a))
}

/// LilyPond duration token for a whole-note fraction
pub fn duration_to_string(duration: Rational) -> Result<String, ConversionError> {
    let numer = *duration.numer();
    let denom = *duration.denom();

    match (numer, denom) {
        (2, 1) => Ok("\\breve".to_string()),
        (1, d) => Ok(d.to_string()),
        (3, d) if d % 2 == 0 => Ok(format!("{}.", d / 2)),
        (7, d) if d % 4 == 0 => Ok(format!("{}..", d / 4)),
        _ => Err(ConversionError::UnhandledDuration(duration)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rhythm(numer: i32, denom: i32, syncopation: i32) -> Rhythm {
        Rhythm::new(Rational::new(numer, denom), syncopation, false)
    }

    #[test]
    fn test_plain_duration() {
        let unit = Rational::new(1, 8);
        let d = calculate_duration(unit, &rhythm(2, 1, 0), &Rhythm::default()).unwrap();
        assert_eq!(d, Rational::new(1, 4));
    }

    #[test]
    fn test_broken_rhythm_pair() {
        let unit = Rational::new(1, 8);
        let first = rhythm(1, 1, 1);
        let second = rhythm(1, 1, 0);
        assert_eq!(
            calculate_duration(unit, &first, &Rhythm::default()).unwrap(),
            Rational::new(3, 16)
        );
        assert_eq!(calculate_duration(unit, &second, &first).unwrap(), Rational::new(1, 16));

        let first = rhythm(1, 1, -1);
        assert_eq!(
            calculate_duration(unit, &first, &Rhythm::default()).unwrap(),
            Rational::new(1, 16)
        );
        assert_eq!(calculate_duration(unit, &second, &first).unwrap(), Rational::new(3, 16));
    }

    #[test]
    fn test_double_broken_rhythm() {
        let unit = Rational::new(1, 8);
        let first = rhythm(1, 1, 2);
        assert_eq!(
            calculate_duration(unit, &first, &Rhythm::default()).unwrap(),
            Rational::new(9, 32)
        );
        assert_eq!(
            calculate_duration(unit, &rhythm(1, 1, 0), &first).unwrap(),
            Rational::new(1, 32)
        );
    }

    #[test]
    fn test_long_broken_run_overflows_into_an_error() {
        let unit = Rational::new(1, 8);
        let err = calculate_duration(unit, &rhythm(1, 1, 21), &Rhythm::default()).unwrap_err();
        assert!(matches!(err, ConversionError::UnhandledDuration(_)));

        let err = calculate_duration(unit, &rhythm(1, 1, 0), &rhythm(1, 1, 40)).unwrap_err();
        assert!(matches!(err, ConversionError::UnhandledDuration(_)));
    }

    #[test]
    fn test_tiny_unit_overflows_into_an_error() {
        let unit = Rational::new(1, 1024);
        let err = calculate_duration(unit, &rhythm(1, 1 << 22, 0), &Rhythm::default()).unwrap_err();
        assert_eq!(err, ConversionError::UnhandledDuration(unit));
    }

    #[test]
    fn test_duration_strings() {
        assert_eq!(duration_to_string(Rational::new(1, 4)).unwrap(), "4");
        assert_eq!(duration_to_string(Rational::new(1, 1)).unwrap(), "1");
        assert_eq!(duration_to_string(Rational::new(3, 8)).unwrap(), "4.");
        assert_eq!(duration_to_string(Rational::new(3, 16)).unwrap(), "8.");
        assert_eq!(duration_to_string(Rational::new(7, 16)).unwrap(), "4..");
        assert_eq!(duration_to_string(Rational::new(2, 1)).unwrap(), "\\breve");
    }

    #[test]
    fn test_unhandled_durations() {
        assert_eq!(
            duration_to_string(Rational::new(5, 8)).unwrap_err(),
            ConversionError::UnhandledDuration(Rational::new(5, 8))
        );
        assert!(duration_to_string(Rational::new(9, 32)).is_err());
        assert!(duration_to_string(Rational::new(3, 1)).is_err());
    }
}
