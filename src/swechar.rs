//! Swedish character transliteration.
//!
//! Swedish SVI machines reuse six ASCII punctuation codes for the national
//! letters.  The remap is applied only when text is shown to (or taken from)
//! the user; the disk and BASIC layers always work on raw bytes.

/// Pairs of (ASCII byte, Swedish glyph).
static SWE_CHARS: [(u8, char); 6] = [
    (b'}', 'å'),
    (b'{', 'ä'),
    (b'|', 'ö'),
    (b']', 'Å'),
    (b'[', 'Ä'),
    (b'\\', 'Ö'),
];

/// Map one byte to the glyph it represents on a Swedish machine.  Bytes
/// outside the table are interpreted as Latin-1.
pub fn byte_to_glyph(byte: u8) -> char {
    SWE_CHARS
        .iter()
        .find(|(b, _)| *b == byte)
        .map(|(_, c)| *c)
        .unwrap_or(byte as char)
}

/// Map a Swedish glyph back to the byte it is stored as.  Characters without
/// a mapping are returned unchanged.
pub fn glyph_to_ascii(c: char) -> char {
    SWE_CHARS
        .iter()
        .find(|(_, g)| *g == c)
        .map(|(b, _)| *b as char)
        .unwrap_or(c)
}

/// Render the national characters in an already-decoded string.
pub fn to_swechars(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii() { byte_to_glyph(c as u8) } else { c })
        .collect()
}

/// Replace national characters with the ASCII codes used on disk.
pub fn from_swechars(s: &str) -> String {
    s.chars().map(glyph_to_ascii).collect()
}
