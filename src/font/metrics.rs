//! Advance widths for the standard Helvetica faces, in 1/1000 em.
//!
//! Values come from the Adobe Core 14 AFM files. The oblique faces share the
//! widths of their upright counterparts.

/// Width table for one standard face.
#[derive(Debug)]
pub struct StandardFontMetrics {
    /// U+0020..=U+007E
    ascii: [u16; 95],
    /// U+00A0..=U+00FF
    latin1: [u16; 96],
    /// Width used for characters outside the tables.
    default_width: u16,
    /// Curly single and double quotes differ between the faces.
    quote_single: u16,
    quote_double: u16,
    pub ascender: i16,
    pub descender: i16,
}

impl StandardFontMetrics {
    fn width_units(&self, ch: char) -> u16 {
        let cp = ch as u32;
        match cp {
            0x20..=0x7E => self.ascii[(cp - 0x20) as usize],
            0xA0..=0xFF => self.latin1[(cp - 0xA0) as usize],
            0x20AC => 556,                          // €
            0x2013 => 556,                          // en dash
            0x2014 => 1000,                         // em dash
            0x2018 | 0x2019 | 0x201A => self.quote_single,
            0x201C | 0x201D | 0x201E => self.quote_double,
            0x2022 => 350,                          // bullet
            0x2026 => 1000,                         // ellipsis
            0x2122 => 1000,                         // trademark
            _ => self.default_width,
        }
    }

    /// Advance width of `ch` in points.
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        self.width_units(ch) as f64 / 1000.0 * font_size
    }
}

pub static HELVETICA: StandardFontMetrics = StandardFontMetrics {
    ascii: [
        278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // sp..'/'
        556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0..?
        1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // @..O
        667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // P.._
        333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // `..o
        556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // p..~
    ],
    latin1: [
        278, 333, 556, 556, 556, 556, 260, 556, 333, 737, 370, 556, 584, 333, 737, 333, // A0..AF
        400, 584, 333, 333, 333, 556, 537, 278, 333, 333, 365, 556, 834, 834, 834, 611, // B0..BF
        667, 667, 667, 667, 667, 667, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278, // C0..CF
        722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611, // D0..DF
        556, 556, 556, 556, 556, 556, 889, 500, 556, 556, 556, 556, 278, 278, 278, 278, // E0..EF
        556, 556, 556, 556, 556, 556, 556, 584, 611, 556, 556, 556, 556, 500, 556, 500, // F0..FF
    ],
    default_width: 556,
    quote_single: 222,
    quote_double: 333,
    ascender: 718,
    descender: -207,
};

pub static HELVETICA_BOLD: StandardFontMetrics = StandardFontMetrics {
    ascii: [
        278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // sp..'/'
        556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, // 0..?
        975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, // @..O
        667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556, // P.._
        333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, // `..o
        611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584, // p..~
    ],
    latin1: [
        278, 333, 556, 556, 556, 556, 280, 556, 333, 737, 370, 556, 584, 333, 737, 333, // A0..AF
        400, 584, 333, 333, 333, 611, 556, 278, 333, 333, 365, 556, 834, 834, 834, 611, // B0..BF
        722, 722, 722, 722, 722, 722, 1000, 722, 667, 667, 667, 667, 278, 278, 278, 278, // C0..CF
        722, 722, 778, 778, 778, 778, 778, 584, 778, 722, 722, 722, 722, 667, 667, 611, // D0..DF
        556, 556, 556, 556, 556, 556, 889, 556, 556, 556, 556, 556, 278, 278, 278, 278, // E0..EF
        611, 611, 611, 611, 611, 611, 611, 584, 611, 611, 611, 611, 611, 556, 611, 556, // F0..FF
    ],
    default_width: 556,
    quote_single: 278,
    quote_double: 500,
    ascender: 718,
    descender: -207,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_width() {
        assert!((HELVETICA.char_width(' ', 12.0) - 3.336).abs() < 1e-9);
    }

    #[test]
    fn table_spot_checks() {
        assert_eq!(HELVETICA.width_units('A'), 667);
        assert_eq!(HELVETICA.width_units('~'), 584);
        assert_eq!(HELVETICA.width_units('é'), 556);
        assert_eq!(HELVETICA_BOLD.width_units('A'), 722);
        assert_eq!(HELVETICA_BOLD.width_units('ù'), 611);
        assert_eq!(HELVETICA.width_units('€'), 556);
    }

    #[test]
    fn bold_quotes_wider() {
        assert!(HELVETICA_BOLD.char_width('\u{2019}', 10.0) > HELVETICA.char_width('\u{2019}', 10.0));
    }
}
