//! Key signature resolution
//!
//! Maps an ABC `K:` value to its canonical key token, the accidentals the
//! key implies for each natural pitch letter, and the octave offset.

use crate::converters::abc::abc_to_lilypond::errors::ParseError;
use serde::Serialize;
use std::collections::BTreeMap;

/// Order in which sharps are added to a key signature
const SHARP_ORDER: &str = "fcgdaeb";
/// Order in which flats are added to a key signature
const FLAT_ORDER: &str = "beadgcf";

const SHARP_SUFFIX: &str = "is";
const FLAT_SUFFIX: &str = "es";

/// Every accepted key spelling by position on the circle of fifths.
/// Positive counts are sharps, negative counts are flats.
const KEY_TABLE: &[(i32, &[&str])] = &[
    (7, &["c#", "a#m", "g#mix", "d#dor", "e#phr", "f#lyd", "b#loc"]),
    (6, &["f#", "d#m", "c#mix", "g#dor", "a#phr", "blyd", "e#loc"]),
    (5, &["b", "g#m", "f#mix", "c#dor", "d#phr", "elyd", "a#loc"]),
    (4, &["e", "c#m", "bmix", "f#dor", "g#phr", "alyd", "d#loc"]),
    (3, &["a", "f#m", "emix", "bdor", "c#phr", "dlyd", "g#loc"]),
    (2, &["d", "bm", "amix", "edor", "f#phr", "glyd", "c#loc"]),
    (1, &["g", "em", "dmix", "ador", "bphr", "clyd", "f#loc"]),
    (0, &["c", "am", "gmix", "ddor", "ephr", "flyd", "bloc"]),
    (-1, &["f", "dm", "cmix", "gdor", "aphr", "bblyd", "eloc"]),
    (-2, &["bb", "gm", "fmix", "cdor", "dphr", "eblyd", "aloc"]),
    (-3, &["eb", "cm", "bbmix", "fdor", "gphr", "ablyd", "dloc"]),
    (-4, &["ab", "fm", "ebmix", "bbdor", "cphr", "dblyd", "gloc"]),
    (-5, &["db", "bbm", "abmix", "ebdor", "fphr", "gblyd", "cloc"]),
    (-6, &["gb", "ebm", "dbmix", "abdor", "bbphr", "cblyd", "floc"]),
    (-7, &["cb", "abm", "gbmix", "dbdor", "ebphr", "fblyd", "bbloc"]),
];

/// Resolved key signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeySignature {
    /// Canonical lowercase key token, empty when no key was given
    pub key: String,

    /// Natural pitch letter to LilyPond accidental suffix
    pub accidentals: BTreeMap<char, String>,

    /// Added to every note's octave
    pub octave_offset: i32,
}

impl KeySignature {
    /// No key: no accidentals, default octave offset
    pub fn none() -> Self {
        Self {
            key: String::new(),
            accidentals: BTreeMap::new(),
            octave_offset: 1,
        }
    }

    /// LilyPond `\key` command, `None` when no key was given
    pub fn declaration(&self) -> Option<String> {
        let (tonic, mode) = split_key(&self.key)?;
        let mut name = String::new();
        let mut chars = tonic.chars();
        name.push(chars.next()?);
        match chars.next() {
            Some('#') => name.push_str(SHARP_SUFFIX),
            Some('b') => name.push_str(FLAT_SUFFIX),
            _ => {}
        }

        let mode = match mode {
            "" => "major",
            "m" => "minor",
            "mix" => "mixolydian",
            "dor" => "dorian",
            "phr" => "phrygian",
            "lyd" => "lydian",
            "loc" => "locrian",
            _ => return None,
        };
        Some(format!("\\key {} \\{}", name, mode))
    }
}

/// Resolve a `K:` value. `octave_offset` is kept unless the value carries
/// an `octave=N` modifier.
pub fn parse_key_signature(keysig: &str, octave_offset: i32) -> Result<KeySignature, ParseError> {
    let mut tokens = keysig.split_whitespace();
    let Some(first) = tokens.next() else {
        return Ok(KeySignature {
            octave_offset,
            ..KeySignature::none()
        });
    };

    let key = normalize_key(first).ok_or_else(|| ParseError::UnknownKey(first.to_string()))?;
    let accidentals =
        lookup_accidental_map(&key).ok_or_else(|| ParseError::UnknownKey(first.to_string()))?;

    let mut octave_offset = octave_offset;
    for token in tokens {
        if let Some(octave) = token.strip_prefix("octave=") {
            octave_offset = octave
                .parse::<i32>()
                .ok()
                .and_then(|n| n.checked_add(1))
                .ok_or_else(|| ParseError::InvalidOctave(octave.to_string()))?;
        }
    }

    Ok(KeySignature {
        key,
        accidentals,
        octave_offset,
    })
}

/// Lowercase the key token and shorten its mode to the table spelling
fn normalize_key(token: &str) -> Option<String> {
    let lower = token.to_lowercase();
    let mut chars = lower.chars();
    let tonic = chars.next().filter(|c| ('a'..='g').contains(c))?;

    let mut key = String::from(tonic);
    let rest = chars.as_str();
    let rest = match rest.chars().next() {
        Some(c @ ('#' | 'b')) => {
            key.push(c);
            &rest[1..]
        }
        _ => rest,
    };

    let mode = match rest {
        "" => "",
        "m" => "m",
        _ => match rest.get(..3)? {
            "maj" | "ion" => "",
            "min" | "aeo" => "m",
            "mix" => "mix",
            "dor" => "dor",
            "phr" => "phr",
            "lyd" => "lyd",
            "loc" => "loc",
            _ => return None,
        },
    };
    key.push_str(mode);
    Some(key)
}

/// Split a canonical key into tonic and mode
fn split_key(key: &str) -> Option<(&str, &str)> {
    if key.is_empty() {
        return None;
    }
    let tonic_len = match key.as_bytes().get(1) {
        Some(b'#') | Some(b'b') => 2,
        _ => 1,
    };
    Some(key.split_at(tonic_len))
}

fn lookup_accidental_map(key: &str) -> Option<BTreeMap<char, String>> {
    let (count, _) = KEY_TABLE
        .iter()
        .find(|(_, spellings)| spellings.contains(&key))?;

    let map = if *count >= 0 {
        make_accidental_map(SHARP_ORDER, *count as usize, SHARP_SUFFIX)
    } else {
        make_accidental_map(FLAT_ORDER, count.unsigned_abs() as usize, FLAT_SUFFIX)
    };
    Some(map)
}

fn make_accidental_map(order: &str, count: usize, suffix: &str) -> BTreeMap<char, String> {
    order
        .chars()
        .take(count)
        .map(|pitch| (pitch, suffix.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accidentals(pairs: &[(char, &str)]) -> BTreeMap<char, String> {
        pairs.iter().map(|(p, s)| (*p, s.to_string())).collect()
    }

    #[test]
    fn test_d_major_sharpens_f_and_c() {
        let sig = parse_key_signature("D", 1).unwrap();
        assert_eq!(sig.key, "d");
        assert_eq!(sig.accidentals, accidentals(&[('f', "is"), ('c', "is")]));
        assert_eq!(sig.octave_offset, 1);
    }

    #[test]
    fn test_flat_keys() {
        let sig = parse_key_signature("Eb", 1).unwrap();
        assert_eq!(sig.accidentals, accidentals(&[('b', "es"), ('e', "es"), ('a', "es")]));
        assert_eq!(sig.declaration().as_deref(), Some("\\key ees \\major"));

        let sig = parse_key_signature("Cb", 1).unwrap();
        assert_eq!(sig.accidentals.len(), 7);
    }

    #[test]
    fn test_d_minor_has_one_flat() {
        let sig = parse_key_signature("Dm", 1).unwrap();
        assert_eq!(sig.key, "dm");
        assert_eq!(sig.accidentals, accidentals(&[('b', "es")]));
        assert_eq!(sig.declaration().as_deref(), Some("\\key d \\minor"));
    }

    #[test]
    fn test_mode_spellings() {
        let sig = parse_key_signature("AMix", 1).unwrap();
        assert_eq!(sig.key, "amix");
        assert_eq!(sig.accidentals, accidentals(&[('f', "is"), ('c', "is")]));
        assert_eq!(sig.declaration().as_deref(), Some("\\key a \\mixolydian"));

        assert_eq!(parse_key_signature("Ador", 1).unwrap().key, "ador");
        assert_eq!(parse_key_signature("Amin", 1).unwrap().key, "am");
        assert_eq!(parse_key_signature("ADorian", 1).unwrap().key, "ador");
        assert_eq!(parse_key_signature("Gmajor", 1).unwrap().key, "g");
        assert_eq!(
            parse_key_signature("F#m", 1).unwrap().declaration().as_deref(),
            Some("\\key fis \\minor")
        );
    }

    #[test]
    fn test_octave_modifier() {
        let sig = parse_key_signature("G octave=-1", 1).unwrap();
        assert_eq!(sig.octave_offset, 0);

        let err = parse_key_signature("G octave=high", 1).unwrap_err();
        assert_eq!(err, ParseError::InvalidOctave("high".to_string()));

        let err = parse_key_signature("G octave=2147483647", 1).unwrap_err();
        assert_eq!(err, ParseError::InvalidOctave("2147483647".to_string()));
    }

    #[test]
    fn test_empty_key_keeps_octave() {
        let sig = parse_key_signature("", 3).unwrap();
        assert!(sig.key.is_empty());
        assert!(sig.accidentals.is_empty());
        assert_eq!(sig.octave_offset, 3);
        assert_eq!(sig.declaration(), None);
    }

    #[test]
    fn test_unknown_key() {
        assert_eq!(
            parse_key_signature("Hp", 1).unwrap_err(),
            ParseError::UnknownKey("Hp".to_string())
        );
        assert_eq!(
            parse_key_signature("Dxyz", 1).unwrap_err(),
            ParseError::UnknownKey("Dxyz".to_string())
        );
        // spelled correctly but missing from the circle of fifths
        assert!(parse_key_signature("Fbm", 1).is_err());
    }
}
