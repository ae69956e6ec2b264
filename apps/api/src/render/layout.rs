//! Page layout for the PDF writer: greedy word-wrap and pagination into placed lines.
//!
//! Pure computation, no PDF objects. `pdf.rs` turns the result into content streams.
//! Coordinates are PDF user space (points, origin bottom-left, y = baseline).

use crate::render::font_metrics::{FontMetricTable, PdfFont};
use crate::render::{ParagraphStyle, StyleRules};

/// Extra gap above a heading that does not open a page.
const HEADING_GAP_PT: f32 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
    pub line_height: f32,
}

/// US letter, 50 pt margins, 14 pt lines.
pub const LETTER: PageGeometry = PageGeometry {
    width: 612.0,
    height: 792.0,
    margin: 50.0,
    line_height: 14.0,
};

impl Default for PageGeometry {
    fn default() -> Self {
        LETTER
    }
}

impl PageGeometry {
    /// Baseline of the first line on every page.
    pub fn top(&self) -> f32 {
        self.height - self.margin
    }

    pub fn usable_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font: PdfFont,
    pub size: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageLayout {
    pub lines: Vec<PlacedLine>,
}

struct Cursor<'g> {
    geometry: &'g PageGeometry,
    pages: Vec<PageLayout>,
    y: f32,
}

impl<'g> Cursor<'g> {
    fn new(geometry: &'g PageGeometry) -> Self {
        Self {
            geometry,
            pages: vec![PageLayout::default()],
            y: geometry.top(),
        }
    }

    fn page_is_empty(&self) -> bool {
        self.pages.last().map(|p| p.lines.is_empty()).unwrap_or(true)
    }

    /// Places one line at the cursor, breaking to a new page first if the
    /// cursor has dropped below the bottom margin. A page that holds no lines
    /// yet is reused instead.
    fn place(&mut self, text: String, font: PdfFont, size: f32) {
        if self.y < self.geometry.margin {
            if !self.page_is_empty() {
                self.pages.push(PageLayout::default());
            }
            self.y = self.geometry.top();
        }
        let line = PlacedLine {
            text,
            x: self.geometry.margin,
            y: self.y,
            font,
            size,
        };
        if let Some(page) = self.pages.last_mut() {
            page.lines.push(line);
        }
    }
}

/// Lays out `text` paragraph by paragraph.
///
/// Always returns at least one page; an empty document yields one empty page.
pub fn layout_pages(text: &str, rules: &StyleRules, geometry: &PageGeometry) -> Vec<PageLayout> {
    let mut cursor = Cursor::new(geometry);
    let line_height = geometry.line_height;

    for raw in text.split('\n') {
        let (style, body) = rules.classify(raw);
        if style == ParagraphStyle::Blank {
            cursor.y -= line_height * style.spacing_after();
            continue;
        }

        let font = PdfFont::for_style(style);
        let size = style.font_size_pt();
        if style == ParagraphStyle::Heading && !cursor.page_is_empty() {
            cursor.y -= HEADING_GAP_PT;
        }

        let lines = wrap_words(&body, font.metrics(), size, geometry.usable_width());
        let count = lines.len();
        for (i, line) in lines.into_iter().enumerate() {
            cursor.place(line, font, size);
            cursor.y -= if i + 1 == count {
                line_height * style.spacing_after()
            } else {
                line_height
            };
        }
    }

    cursor.pages
}

/// Greedy word-wrap against `max_width` points. Words are never split unless a
/// single word is wider than a whole line.
pub fn wrap_words(text: &str, metrics: &FontMetricTable, size: f32, max_width: f32) -> Vec<String> {
    let space_w = metrics.measure_str(" ", size);
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_width = 0.0_f32;

    for word in text.split_whitespace() {
        for piece in split_oversized(word, metrics, size, max_width) {
            let piece_w = metrics.measure_str(&piece, size);
            if line.is_empty() {
                line = piece;
                line_width = piece_w;
            } else if line_width + space_w + piece_w <= max_width {
                line.push(' ');
                line.push_str(&piece);
                line_width += space_w + piece_w;
            } else {
                lines.push(std::mem::replace(&mut line, piece));
                line_width = piece_w;
            }
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

fn split_oversized(word: &str, metrics: &FontMetricTable, size: f32, max_width: f32) -> Vec<String> {
    if metrics.measure_str(word, size) <= max_width {
        return vec![word.to_string()];
    }

    let mut pieces = Vec::new();
    let mut piece = String::new();
    let mut width = 0.0_f32;
    for c in word.chars() {
        let char_w = f32::from(metrics.char_width(c)) * size / 1000.0;
        if !piece.is_empty() && width + char_w > max_width {
            pieces.push(std::mem::take(&mut piece));
            width = 0.0;
        }
        piece.push(c);
        width += char_w;
    }
    if !piece.is_empty() {
        pieces.push(piece);
    }
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORDS: [&str; 8] = [
        "designed", "scalable", "services", "in", "Rust", "and", "reduced", "latency",
    ];

    /// `count` lines of exactly 60 characters built from `WORDS`.
    fn sixty_char_lines(count: usize) -> Vec<String> {
        (0..count)
            .map(|i| {
                let mut line = String::new();
                let mut k = i;
                while line.len() < 60 {
                    if !line.is_empty() {
                        line.push(' ');
                    }
                    line.push_str(WORDS[k % WORDS.len()]);
                    k += 1;
                }
                line.truncate(60);
                line.trim_end().to_string()
            })
            .collect()
    }

    fn all_lines(pages: &[PageLayout]) -> impl Iterator<Item = &PlacedLine> {
        pages.iter().flat_map(|p| p.lines.iter())
    }

    #[test]
    fn test_long_resume_paginates_without_splitting_words() {
        let source = sixty_char_lines(200);
        let text = source.join("\n");
        let pages = layout_pages(&text, &StyleRules::default(), &LETTER);

        assert!(pages.len() > 1, "expected multiple pages, got {}", pages.len());
        for page in &pages {
            assert_eq!(page.lines[0].y, LETTER.top());
        }

        let source_words: Vec<&str> = source.iter().flat_map(|l| l.split_whitespace()).collect();
        let placed_words: Vec<&str> = all_lines(&pages)
            .flat_map(|l| l.text.split_whitespace())
            .collect();
        assert_eq!(placed_words, source_words);
    }

    #[test]
    fn test_text_stays_inside_margins() {
        let mut text = sixty_char_lines(120).join("\n");
        text.push_str("\nEXPERIENCE\n");
        text.push_str(&"word ".repeat(400));
        text.push_str("\nhttps://example.com/");
        text.push_str(&"x".repeat(300));
        let pages = layout_pages(&text, &StyleRules::default(), &LETTER);

        for line in all_lines(&pages) {
            let width = line.font.metrics().measure_str(&line.text, line.size);
            assert!(line.x >= LETTER.margin);
            assert!(line.x + width <= LETTER.width - LETTER.margin + 1e-3, "{:?}", line.text);
            assert!(line.y >= LETTER.margin, "y = {}", line.y);
            assert!(line.y <= LETTER.top());
        }
    }

    #[test]
    fn test_paragraph_spacing() {
        let text = "EXPERIENCE\nProgramming Languages: Rust\nJane Doe\n\nEnd";
        let pages = layout_pages(text, &StyleRules::default(), &LETTER);
        let ys: Vec<f32> = pages[0].lines.iter().map(|l| l.y).collect();
        let lh = LETTER.line_height;

        assert_eq!(ys[0], 742.0);
        assert!((ys[0] - ys[1] - 2.0 * lh).abs() < 1e-3);
        assert!((ys[1] - ys[2] - 1.5 * lh).abs() < 1e-3);
        assert!((ys[2] - ys[3] - (1.3 * lh + 0.5 * lh)).abs() < 1e-3);
    }

    #[test]
    fn test_heading_gap_inside_page() {
        let text = "Jane Doe\nEDUCATION";
        let pages = layout_pages(text, &StyleRules::default(), &LETTER);
        let lines = &pages[0].lines;
        assert!((lines[0].y - lines[1].y - (1.3 * 14.0 + HEADING_GAP_PT)).abs() < 1e-3);
        assert_eq!(lines[1].font, PdfFont::HelveticaBold);
        assert_eq!(lines[1].size, 14.0);
    }

    #[test]
    fn test_wrapped_paragraph_keeps_font_across_page_break() {
        let mut text = "filler\n".repeat(37);
        text.push_str("Frontend Developer Intern ");
        text.push_str(&"responsibilities ".repeat(60));
        let pages = layout_pages(&text, &StyleRules::default(), &LETTER);

        assert!(pages.len() >= 2);
        let first_on_second = &pages[1].lines[0];
        assert_eq!(first_on_second.font, PdfFont::HelveticaOblique);
        assert_eq!(first_on_second.y, LETTER.top());
    }

    #[test]
    fn test_leading_blank_lines_do_not_leave_an_empty_page() {
        let text = format!("{}Jane Doe", "\n".repeat(120));
        let pages = layout_pages(&text, &StyleRules::default(), &LETTER);

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].lines.len(), 1);
        assert_eq!(pages[0].lines[0].text, "Jane Doe");
        assert_eq!(pages[0].lines[0].y, LETTER.top());
    }

    #[test]
    fn test_empty_text_yields_one_empty_page() {
        let pages = layout_pages("", &StyleRules::default(), &LETTER);
        assert_eq!(pages.len(), 1);
        assert!(pages[0].lines.is_empty());
    }

    #[test]
    fn test_oversized_word_is_broken_by_characters() {
        let metrics = PdfFont::Helvetica.metrics();
        let word = "a".repeat(200); // 200 * 556 * 11 / 1000 ≈ 1223 pt
        let lines = wrap_words(&word, metrics, 11.0, 512.0);
        assert!(lines.len() >= 3);
        assert_eq!(lines.concat(), word);
        for line in &lines {
            assert!(metrics.measure_str(line, 11.0) <= 512.0);
        }
    }
}
