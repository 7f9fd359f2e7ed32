use std::sync::OnceLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

/// Typographic ligatures that PDF fonts commonly emit as a single glyph.
const LIGATURES: [(char, &str); 5] = [
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
];

/// Normalise the text of a single extracted line.
///
/// Applies NFC normalisation, expands ligatures, drops U+FFFD replacement
/// characters, collapses whitespace runs to one space and trims. Returns an
/// empty string for lines with no visible content.
pub fn clean_line_text(text: &str) -> String {
    let mut result: String = text.nfc().collect();

    for (lig, replacement) in LIGATURES {
        if result.contains(lig) {
            result = result.replace(lig, replacement);
        }
    }

    result = result.replace('\u{FFFD}', "");

    static RE_SPACES: OnceLock<Regex> = OnceLock::new();
    let re_spaces = RE_SPACES.get_or_init(|| Regex::new(r"\s+").unwrap());
    re_spaces.replace_all(result.trim(), " ").into_owned()
}
