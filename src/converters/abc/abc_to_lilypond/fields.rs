//! ABC information field registry
//!
//! Fixed table of every field tag, where it may appear and how its value is
//! read. The table is static data, nothing mutates it at runtime.

use serde::Serialize;

/// Places a field may appear in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldContexts {
    pub file_header: bool,
    pub tune_header: bool,
    pub tune_body: bool,
    pub inline: bool,
}

impl FieldContexts {
    const fn new(file_header: bool, tune_header: bool, tune_body: bool, inline: bool) -> Self {
        Self {
            file_header,
            tune_header,
            tune_body,
            inline,
        }
    }
}

/// How the value of a field is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldKind {
    FreeText,
    Instruction,
    Unspecified,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldDef {
    pub tag: char,
    pub name: &'static str,
    pub contexts: FieldContexts,
    pub kind: FieldKind,
    pub example: &'static str,
}

impl FieldDef {
    const fn new(
        tag: char,
        name: &'static str,
        contexts: FieldContexts,
        kind: FieldKind,
        example: &'static str,
    ) -> Self {
        Self {
            tag,
            name,
            contexts,
            kind,
            example,
        }
    }
}

const HEADERS: FieldContexts = FieldContexts::new(true, true, false, false);
const EVERYWHERE: FieldContexts = FieldContexts::new(true, true, true, true);
const TUNE_ANYWHERE: FieldContexts = FieldContexts::new(false, true, true, true);
const TUNE_LINES: FieldContexts = FieldContexts::new(false, true, true, false);

pub const FIELD_AREA: FieldDef = FieldDef::new(
    'A',
    "area",
    HEADERS,
    FieldKind::FreeText,
    "A:Donegal, A:Bampton",
);
pub const FIELD_BOOK: FieldDef = FieldDef::new(
    'B',
    "book",
    HEADERS,
    FieldKind::FreeText,
    "B:O'Neills",
);
pub const FIELD_COMPOSER: FieldDef = FieldDef::new(
    'C',
    "composer",
    HEADERS,
    FieldKind::FreeText,
    "C:Robert Jones, C:Trad.",
);
pub const FIELD_DISCOGRAPHY: FieldDef = FieldDef::new(
    'D',
    "discography",
    HEADERS,
    FieldKind::FreeText,
    "D:Chieftains IV",
);
pub const FIELD_FILE: FieldDef = FieldDef::new(
    'F',
    "file url",
    HEADERS,
    FieldKind::FreeText,
    "F:http://a.b.c/file.abc",
);
pub const FIELD_GROUP: FieldDef = FieldDef::new(
    'G',
    "group",
    HEADERS,
    FieldKind::FreeText,
    "G:flute",
);
pub const FIELD_HISTORY: FieldDef = FieldDef::new(
    'H',
    "history",
    HEADERS,
    FieldKind::FreeText,
    "H:The story behind this tune ...",
);
pub const FIELD_INSTRUCTION: FieldDef = FieldDef::new(
    'I',
    "instruction",
    EVERYWHERE,
    FieldKind::Instruction,
    "I:papersize A4, I:newpage",
);
pub const FIELD_KEY: FieldDef = FieldDef::new(
    'K',
    "key",
    TUNE_ANYWHERE,
    FieldKind::Instruction,
    "K:G, K:Dm, K:AMix",
);
pub const FIELD_UNIT_NOTE_LENGTH: FieldDef = FieldDef::new(
    'L',
    "unit note length",
    EVERYWHERE,
    FieldKind::Instruction,
    "L:1/4",
);
pub const FIELD_METER: FieldDef = FieldDef::new(
    'M',
    "meter",
    EVERYWHERE,
    FieldKind::Instruction,
    "M:3/4, M:4/4",
);
pub const FIELD_MACRO: FieldDef = FieldDef::new(
    'm',
    "macro",
    EVERYWHERE,
    FieldKind::Instruction,
    "m: ~G2 = {A}G{F}G",
);
pub const FIELD_NOTES: FieldDef = FieldDef::new(
    'N',
    "notes",
    EVERYWHERE,
    FieldKind::FreeText,
    "N:see also O'Neills - 234",
);
pub const FIELD_ORIGIN: FieldDef = FieldDef::new(
    'O',
    "origin",
    HEADERS,
    FieldKind::FreeText,
    "O:UK; Yorkshire; Bradford",
);
pub const FIELD_PARTS: FieldDef = FieldDef::new(
    'P',
    "parts",
    TUNE_ANYWHERE,
    FieldKind::Instruction,
    "P:A, P:ABAC, P:(A2B)3",
);
pub const FIELD_TEMPO: FieldDef = FieldDef::new(
    'Q',
    "tempo",
    TUNE_ANYWHERE,
    FieldKind::Instruction,
    "Q:\"allegro\" 1/4=120",
);
pub const FIELD_RHYTHM: FieldDef = FieldDef::new(
    'R',
    "rhythm",
    EVERYWHERE,
    FieldKind::FreeText,
    "R:R, R:reel",
);
pub const FIELD_REMARK: FieldDef = FieldDef::new(
    'r',
    "remark",
    EVERYWHERE,
    FieldKind::Unspecified,
    "r:I love abc",
);
pub const FIELD_SOURCE: FieldDef = FieldDef::new(
    'S',
    "source",
    HEADERS,
    FieldKind::FreeText,
    "S:collected in Brittany",
);
pub const FIELD_SYMBOL_LINE: FieldDef = FieldDef::new(
    's',
    "symbol line",
    FieldContexts::new(false, false, true, false),
    FieldKind::Instruction,
    "s: !pp! ** !f!",
);
pub const FIELD_TUNE_TITLE: FieldDef = FieldDef::new(
    'T',
    "tune title",
    TUNE_LINES,
    FieldKind::FreeText,
    "T:Paddy O'Rafferty",
);
pub const FIELD_USER_DEFINED: FieldDef = FieldDef::new(
    'U',
    "user defined",
    EVERYWHERE,
    FieldKind::Instruction,
    "U: T = !trill!",
);
pub const FIELD_VOICE: FieldDef = FieldDef::new(
    'V',
    "voice",
    TUNE_ANYWHERE,
    FieldKind::Instruction,
    "V:4 clef=bass",
);
pub const FIELD_WORDS: FieldDef = FieldDef::new(
    'W',
    "words",
    TUNE_LINES,
    FieldKind::FreeText,
    "W:lyrics printed after the end of the tune",
);
pub const FIELD_ALIGNED_WORDS: FieldDef = FieldDef::new(
    'w',
    "words",
    TUNE_LINES,
    FieldKind::FreeText,
    "w:lyrics aligned under the notes",
);
pub const FIELD_REFERENCE_NUMBER: FieldDef = FieldDef::new(
    'X',
    "reference number",
    FieldContexts::new(false, true, false, false),
    FieldKind::Instruction,
    "X:1, X:2",
);
pub const FIELD_TRANSCRIPTION: FieldDef = FieldDef::new(
    'Z',
    "transcription",
    HEADERS,
    FieldKind::FreeText,
    "Z:John Smith, <j.s@example.com>",
);

pub const FIELD_DEFS: &[FieldDef] = &[
    FIELD_AREA,
    FIELD_BOOK,
    FIELD_COMPOSER,
    FIELD_DISCOGRAPHY,
    FIELD_FILE,
    FIELD_GROUP,
    FIELD_HISTORY,
    FIELD_INSTRUCTION,
    FIELD_KEY,
    FIELD_UNIT_NOTE_LENGTH,
    FIELD_METER,
    FIELD_MACRO,
    FIELD_NOTES,
    FIELD_ORIGIN,
    FIELD_PARTS,
    FIELD_TEMPO,
    FIELD_RHYTHM,
    FIELD_REMARK,
    FIELD_SOURCE,
    FIELD_SYMBOL_LINE,
    FIELD_TUNE_TITLE,
    FIELD_USER_DEFINED,
    FIELD_VOICE,
    FIELD_WORDS,
    FIELD_ALIGNED_WORDS,
    FIELD_REFERENCE_NUMBER,
    FIELD_TRANSCRIPTION,
];

/// Look up a field definition, tags are case-sensitive
pub fn field_def(tag: char) -> Option<&'static FieldDef> {
    FIELD_DEFS.iter().find(|def| def.tag == tag)
}
