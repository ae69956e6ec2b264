//! Static Helvetica metric tables for the page writer's string-width measurement.
//!
//! Widths are the Adobe core-font AFM advance widths in 1/1000 em.
//! All tables cover ASCII 0x20..=0x7E (95 printable characters).
//! Index = (char as usize) - 32.

use crate::render::ParagraphStyle;

// ────────────────────────────────────────────────────────────────────────────
// Core fonts
// ────────────────────────────────────────────────────────────────────────────

/// The three PDF core fonts the page writer uses. They are never embedded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PdfFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
}

impl PdfFont {
    pub const ALL: [PdfFont; 3] = [
        PdfFont::Helvetica,
        PdfFont::HelveticaBold,
        PdfFont::HelveticaOblique,
    ];

    pub fn for_style(style: ParagraphStyle) -> Self {
        match style {
            ParagraphStyle::Heading | ParagraphStyle::Category => PdfFont::HelveticaBold,
            ParagraphStyle::Title => PdfFont::HelveticaOblique,
            ParagraphStyle::Regular | ParagraphStyle::Blank => PdfFont::Helvetica,
        }
    }

    /// `/BaseFont` name in the font dictionary.
    pub fn base_font(&self) -> &'static str {
        match self {
            PdfFont::Helvetica => "Helvetica",
            PdfFont::HelveticaBold => "Helvetica-Bold",
            PdfFont::HelveticaOblique => "Helvetica-Oblique",
        }
    }

    /// Key under the page `/Resources /Font` dictionary.
    pub fn resource_name(&self) -> &'static str {
        match self {
            PdfFont::Helvetica => "F1",
            PdfFont::HelveticaBold => "F2",
            PdfFont::HelveticaOblique => "F3",
        }
    }

    pub fn metrics(&self) -> &'static FontMetricTable {
        match self {
            // Oblique is a slanted Helvetica with identical advance widths.
            PdfFont::Helvetica | PdfFont::HelveticaOblique => &HELVETICA_TABLE,
            PdfFont::HelveticaBold => &HELVETICA_BOLD_TABLE,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Font metric table
// ────────────────────────────────────────────────────────────────────────────

/// Width array slot layout:
/// ```text
/// [0]=sp  [1]=!   [2]="   [3]=#   [4]=$   [5]=%   [6]=&   [7]='
/// [8]=(   [9]=)   [10]=*  [11]=+  [12]=,  [13]=-  [14]=.  [15]=/
/// [16..25]=0-9
/// [26]=:  [27]=;  [28]=<  [29]==  [30]=>  [31]=?  [32]=@
/// [33..58]=A-Z
/// [59]=[  [60]=\  [61]=]  [62]=^  [63]=_  [64]=`
/// [65..90]=a-z
/// [91]={  [92]=|  [93]=}  [94]=~
/// ```
pub struct FontMetricTable {
    widths: [u16; 95],
    /// Fallback for characters outside the table and the punctuation below.
    fallback_width: u16,
    quote_single_width: u16,
    quote_double_width: u16,
}

impl FontMetricTable {
    /// Advance width of one character in 1/1000 em.
    pub fn char_width(&self, c: char) -> u16 {
        let code = c as usize;
        if (32..=126).contains(&code) {
            return self.widths[code - 32];
        }
        match c {
            '\u{2014}' | '\u{2026}' | '\u{2030}' => 1000,
            '\u{2013}' | '\u{20AC}' => 556,
            '\u{2022}' => 350,
            '\u{2018}' | '\u{2019}' | '\u{201A}' => self.quote_single_width,
            '\u{201C}' | '\u{201D}' | '\u{201E}' => self.quote_double_width,
            '\u{00A0}' => self.widths[0],
            _ => self.fallback_width,
        }
    }

    /// Rendered width of `s` in points at `size_pt`.
    pub fn measure_str(&self, s: &str, size_pt: f32) -> f32 {
        let units: u32 = s.chars().map(|c| u32::from(self.char_width(c))).sum();
        units as f32 * size_pt / 1000.0
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Static width tables  (95 ASCII printable characters each)
// ────────────────────────────────────────────────────────────────────────────

static HELVETICA_TABLE: FontMetricTable = FontMetricTable {
    #[rustfmt::skip]
    widths: [
        // sp   !    "    #    $    %    &    '    (    )    *    +    ,    -    .    /
        278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
        // 0    1    2    3    4    5    6    7    8    9
        556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
        // :    ;    <    =    >    ?    @
        278, 278, 584, 584, 584, 556, 1015,
        // A    B    C    D    E    F    G    H    I    J    K    L    M
        667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
        // N    O    P    Q    R    S    T    U    V    W    X    Y    Z
        722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
        // [    \    ]    ^    _    `
        278, 278, 278, 469, 556, 333,
        // a    b    c    d    e    f    g    h    i    j    k    l    m
        556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
        // n    o    p    q    r    s    t    u    v    w    x    y    z
        556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
        // {    |    }    ~
        334, 260, 334, 584,
    ],
    fallback_width: 556,
    quote_single_width: 222,
    quote_double_width: 333,
};

static HELVETICA_BOLD_TABLE: FontMetricTable = FontMetricTable {
    #[rustfmt::skip]
    widths: [
        // sp   !    "    #    $    %    &    '    (    )    *    +    ,    -    .    /
        278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
        // 0    1    2    3    4    5    6    7    8    9
        556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
        // :    ;    <    =    >    ?    @
        333, 333, 584, 584, 584, 611, 975,
        // A    B    C    D    E    F    G    H    I    J    K    L    M
        722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
        // N    O    P    Q    R    S    T    U    V    W    X    Y    Z
        722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
        // [    \    ]    ^    _    `
        333, 278, 333, 584, 556, 333,
        // a    b    c    d    e    f    g    h    i    j    k    l    m
        556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
        // n    o    p    q    r    s    t    u    v    w    x    y    z
        611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
        // {    |    }    ~
        389, 280, 389, 584,
    ],
    fallback_width: 611,
    quote_single_width: 278,
    quote_double_width: 500,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_afm_widths() {
        let regular = PdfFont::Helvetica.metrics();
        assert_eq!(regular.char_width(' '), 278);
        assert_eq!(regular.char_width('W'), 944);
        assert_eq!(regular.char_width('i'), 222);
        assert_eq!(regular.char_width('~'), 584);

        let bold = PdfFont::HelveticaBold.metrics();
        assert_eq!(bold.char_width('i'), 278);
        assert_eq!(bold.char_width('m'), 889);
    }

    #[test]
    fn test_measure_str_scales_with_size() {
        let table = PdfFont::Helvetica.metrics();
        // "Hi" = 722 + 222 = 944 units
        assert!((table.measure_str("Hi", 10.0) - 9.44).abs() < 1e-4);
        assert!((table.measure_str("Hi", 20.0) - 18.88).abs() < 1e-4);
        assert_eq!(table.measure_str("", 11.0), 0.0);
    }

    #[test]
    fn test_bold_is_never_narrower_than_regular() {
        let sample = "EXPERIENCE Programming Languages: Rust, Go & SQL";
        let regular = PdfFont::Helvetica.metrics().measure_str(sample, 11.0);
        let bold = PdfFont::HelveticaBold.metrics().measure_str(sample, 11.0);
        assert!(bold >= regular);
    }

    #[test]
    fn test_oblique_shares_regular_widths() {
        let s = "Frontend Developer Intern";
        assert_eq!(
            PdfFont::Helvetica.metrics().measure_str(s, 11.0),
            PdfFont::HelveticaOblique.metrics().measure_str(s, 11.0)
        );
    }

    #[test]
    fn test_non_ascii_punctuation() {
        let table = PdfFont::Helvetica.metrics();
        assert_eq!(table.char_width('\u{2014}'), 1000);
        assert_eq!(table.char_width('\u{2022}'), 350);
        assert_eq!(table.char_width('\u{00E9}'), 556);
    }

    #[test]
    fn test_styles_map_to_fonts() {
        assert_eq!(PdfFont::for_style(ParagraphStyle::Heading), PdfFont::HelveticaBold);
        assert_eq!(PdfFont::for_style(ParagraphStyle::Category), PdfFont::HelveticaBold);
        assert_eq!(PdfFont::for_style(ParagraphStyle::Title), PdfFont::HelveticaOblique);
        assert_eq!(PdfFont::for_style(ParagraphStyle::Regular), PdfFont::Helvetica);
    }
}
