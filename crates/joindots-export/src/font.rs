//! Text metrics for the paged document's label font.
//!
//! Labels are set in the standard Type 1 font Helvetica-Bold, which
//! every PDF reader provides, so no font program is embedded. Widths
//! come from the font's AFM metrics in 1/1000 em.

/// Name of the base font in the PDF font dictionary.
pub const BASE_FONT: &str = "Helvetica-Bold";

/// Cap height in 1/1000 em. Digits are as tall as capitals.
pub const CAP_HEIGHT: f64 = 718.0;

/// Advance width of `ch` in 1/1000 em.
///
/// Covers digits, lowercase letters, space, `.` and `-`. Uppercase
/// letters use their lowercase width; anything else is treated as a
/// digit-width glyph.
#[must_use]
pub const fn char_width(ch: char) -> u16 {
    match ch.to_ascii_lowercase() {
        ' ' | '.' | 'i' | 'j' | 'l' => 278,
        '-' | 'f' | 't' => 333,
        'b' | 'd' | 'g' | 'h' | 'n' | 'o' | 'p' | 'q' | 'u' => 611,
        'm' => 889,
        'r' => 389,
        'w' => 778,
        'z' => 500,
        // Digits and a c e k s v x y.
        _ => 556,
    }
}

/// Width of `text` set at `size` points.
#[must_use]
pub fn text_width(text: &str, size: f64) -> f64 {
    let units: u32 = text.chars().map(|c| u32::from(char_width(c))).sum();
    f64::from(units) * size / 1000.0
}

/// Height of a digit or capital set at `size` points.
#[must_use]
pub fn cap_height(size: f64) -> f64 {
    CAP_HEIGHT * size / 1000.0
}
