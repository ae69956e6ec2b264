//! Word-processing writer: one paragraph per input line.

use std::io::Cursor;

use docx_rs::{Docx, LineSpacing, Paragraph, Run};
use tracing::debug;

use crate::render::{DocumentFormat, ParagraphStyle, RenderError, RenderedDocument, StyleRules};

/// Space before/after a heading, in twentieths of a point.
const HEADING_SPACE_BEFORE: u32 = 240;
const HEADING_SPACE_AFTER: u32 = 120;

pub fn write_docx(text: &str, rules: &StyleRules) -> Result<RenderedDocument, RenderError> {
    let mut docx = Docx::new();
    let mut paragraphs = 0usize;

    for line in text.split('\n') {
        let (style, body) = rules.classify(line);
        docx = docx.add_paragraph(styled_paragraph(style, &body));
        paragraphs += 1;
    }

    let mut buffer = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut buffer)
        .map_err(|e| RenderError::Docx(e.to_string()))?;

    let bytes = buffer.into_inner();
    debug!(paragraphs, bytes = bytes.len(), "Rendered DOCX");
    Ok(RenderedDocument {
        bytes,
        format: DocumentFormat::Docx,
    })
}

fn styled_paragraph(style: ParagraphStyle, text: &str) -> Paragraph {
    if style == ParagraphStyle::Blank {
        return Paragraph::new();
    }

    // docx sizes are half-points.
    let mut run = Run::new()
        .add_text(text)
        .size((style.font_size_pt() * 2.0) as usize);
    if style.is_bold() {
        run = run.bold();
    }
    if style.is_italic() {
        run = run.italic();
    }

    let paragraph = Paragraph::new().add_run(run);
    if style == ParagraphStyle::Heading {
        paragraph.line_spacing(
            LineSpacing::new()
                .before(HEADING_SPACE_BEFORE)
                .after(HEADING_SPACE_AFTER),
        )
    } else {
        paragraph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Read;

    use quick_xml::events::{BytesStart, Event};
    use quick_xml::Reader;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct ParagraphInfo {
        text: String,
        bold: bool,
        italic: bool,
        half_points: Option<usize>,
    }

    fn document_xml(bytes: &[u8]) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        xml
    }

    /// Run-level text and formatting of every body paragraph.
    fn paragraphs(xml: &str) -> Vec<ParagraphInfo> {
        let mut reader = Reader::from_str(xml);
        let mut out = Vec::new();
        let mut current: Option<ParagraphInfo> = None;
        let mut in_run = false;
        let mut in_text = false;

        let apply = |e: &BytesStart, current: &mut Option<ParagraphInfo>, in_run: bool| {
            let Some(p) = current.as_mut() else { return };
            if !in_run {
                return;
            }
            match e.name().as_ref() {
                b"w:b" => p.bold = true,
                b"w:i" => p.italic = true,
                b"w:sz" => {
                    p.half_points = e
                        .try_get_attribute("w:val")
                        .unwrap()
                        .and_then(|a| a.unescape_value().ok()?.parse().ok());
                }
                _ => {}
            }
        };

        loop {
            match reader.read_event().unwrap() {
                Event::Start(e) => match e.name().as_ref() {
                    b"w:p" => current = Some(ParagraphInfo::default()),
                    b"w:r" => in_run = true,
                    b"w:t" => in_text = true,
                    _ => apply(&e, &mut current, in_run),
                },
                Event::Empty(e) => match e.name().as_ref() {
                    b"w:p" => out.push(ParagraphInfo::default()),
                    _ => apply(&e, &mut current, in_run),
                },
                Event::Text(t) if in_text => {
                    if let Some(p) = current.as_mut() {
                        p.text.push_str(&t.unescape().unwrap());
                    }
                }
                Event::End(e) => match e.name().as_ref() {
                    b"w:p" => out.extend(current.take()),
                    b"w:r" => in_run = false,
                    b"w:t" => in_text = false,
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }
        out
    }

    #[test]
    fn test_section_headings_and_categories_are_styled() {
        let text = "Jane Doe\n\nEXPERIENCE\nAcme \u{2014} Engineer\n\nSKILLS\nProgramming Languages: Python, Go";
        let rendered = write_docx(text, &StyleRules::default()).unwrap();
        let paras = paragraphs(&document_xml(&rendered.bytes));

        // One paragraph per input line, blanks included.
        assert_eq!(paras.len(), 7);
        let non_empty: Vec<&ParagraphInfo> = paras.iter().filter(|p| !p.text.is_empty()).collect();
        assert_eq!(non_empty.len(), 5);

        let find = |needle: &str| {
            paras
                .iter()
                .find(|p| p.text.contains(needle))
                .unwrap()
                .clone()
        };

        for heading in ["EXPERIENCE", "SKILLS"] {
            let p = find(heading);
            assert!(p.bold, "{heading} should be bold");
            assert_eq!(p.half_points, Some(28));
        }

        let category = find("Programming Languages:");
        assert!(category.bold);
        assert_eq!(category.half_points, Some(22));

        let regular = find("Jane Doe");
        assert!(!regular.bold && !regular.italic);
        assert_eq!(find("Acme").text, "Acme \u{2014} Engineer");
    }

    #[test]
    fn test_titles_are_italic() {
        let rendered =
            write_docx("Frontend Developer Intern | Acme", &StyleRules::default()).unwrap();
        let paras = paragraphs(&document_xml(&rendered.bytes));
        assert_eq!(paras.len(), 1);
        assert!(paras[0].italic);
        assert!(!paras[0].bold);
        assert_eq!(paras[0].half_points, Some(22));
    }

    #[test]
    fn test_marker_lines_render_without_marker() {
        let rendered = write_docx("# Volunteering\n## Cloud: AWS", &StyleRules::default()).unwrap();
        let paras = paragraphs(&document_xml(&rendered.bytes));
        assert_eq!(paras[0].text, "Volunteering");
        assert_eq!(paras[0].half_points, Some(28));
        assert_eq!(paras[1].text, "Cloud: AWS");
        assert!(paras[1].bold);
    }

    #[test]
    fn test_special_characters_are_escaped() {
        let text = "CERTIFICATIONS & WORKSHOPS\nC++ <templates> & \"generics\"";
        let rendered = write_docx(text, &StyleRules::default()).unwrap();
        let paras = paragraphs(&document_xml(&rendered.bytes));
        assert_eq!(paras[0].text, "CERTIFICATIONS & WORKSHOPS");
        assert!(paras[0].bold);
        assert_eq!(paras[1].text, "C++ <templates> & \"generics\"");
    }
}
