//! 5×6 bitmap font
//!
//! Each glyph packs 30 bits, one per pixel: bit `x * 6 + y` is column `x`
//! (0..5, left to right) and row `y` (0..6, bottom to top).

/// Glyphs for printable ASCII, indexed from `' '`
const GLYPHS: [u32; 95] = [
    // ' '..'\''
    0x00000000, 0x0003D000, 0x00C00C00, 0x14FE4FCA, 0x005B3680, 0x2240C091, 0x054AD542, 0x00030000,
    // '('..'/'
    0x00021780, 0x007A1000, 0x00A10A00, 0x0411F104, 0x00002040, 0x04104104, 0x00001000, 0x00C0C0C0,
    // '0'..'7'
    0x1E961A5E, 0x01FD1441, 0x190658D1, 0x16A69852, 0x3F208238, 0x26A69A7A, 0x06A6995E, 0x38922860,
    // '8'..'?'
    0x16A69A56, 0x1E965958, 0x00012000, 0x00012040, 0x1144A284, 0x12492492, 0x0428A451, 0x10A25810,
    // '@'..'G'
    0x1E867990, 0x1FA28A1F, 0x16A69A7F, 0x1286185E, 0x1E86187F, 0x21869A7F, 0x20828A3F, 0x1796585E,
    // 'H'..'O'
    0x3F20823F, 0x2183F861, 0x20FA1862, 0x2350823F, 0x0104107F, 0x3F40843F, 0x3F10843F, 0x1E86185E,
    // 'P'..'W'
    0x1892493F, 0x1D8A185E, 0x1B92493F, 0x12969A52, 0x2083F820, 0x3E04107E, 0x381811B8, 0x3F0840BF,
    // 'X'..'_'
    0x23508523, 0x30207230, 0x31A658B1, 0x00861FC0, 0x000CCC00, 0x00FE1840, 0x08420408, 0x01041041,
    // '`'..'g'
    0x00010800, 0x1F25144E, 0x0624917F, 0x0A45144E, 0x3F149246, 0x0855554E, 0x004247C0, 0x1E555548,
    // 'h'..'o'
    0x0720813F, 0x00017000, 0x00B81080, 0x002C413F, 0x00001F80, 0x0F80C41F, 0x0F41021F, 0x0E45144E,
    // 'p'..'w'
    0x0C49229F, 0x1F29248C, 0x0841021F, 0x02555548, 0x0027E200, 0x1F04105E, 0x1C08109C, 0x1E04605E,
    // 'x'..'~'
    0x11282291, 0x1E145158, 0x19555553, 0x00861588, 0x0003F000, 0x085A1840, 0x0608420C,
];

/// Glyph for a character; anything unprintable renders as a space
pub fn glyph(c: char) -> u32 {
    match c {
        ' '..='~' => GLYPHS[c as usize - ' ' as usize],
        _ => 0,
    }
}

/// Pixel at column `x`, row `y` of a glyph
pub const fn pixel(glyph: u32, x: usize, y: usize) -> bool {
    (glyph >> (x * 6 + y)) & 1 != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_and_unprintables_are_blank() {
        assert_eq!(glyph(' '), 0);
        assert_eq!(glyph('\0'), 0);
        assert_eq!(glyph('\n'), 0);
        assert_eq!(glyph('°'), 0);
    }

    #[test]
    fn test_table_ends() {
        assert_eq!(glyph('!'), 0x0003_D000);
        assert_eq!(glyph('A'), 0x1FA2_8A1F);
        assert_eq!(glyph('~'), 0x0608_420C);
    }

    #[test]
    fn test_glyphs_fit_in_30_bits() {
        for c in ' '..='~' {
            assert_eq!(glyph(c) >> 30, 0, "glyph {:?} overflows", c);
        }
    }

    #[test]
    fn test_underscore_is_bottom_row() {
        let g = glyph('_');
        for x in 0..5 {
            assert!(pixel(g, x, 0));
            assert!(!pixel(g, x, 5));
        }
    }
}
