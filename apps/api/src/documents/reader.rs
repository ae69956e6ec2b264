use std::fs::File;
use std::io::Read;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

use crate::documents::{DocumentError, SourceFormat};

const DOCX_BODY_PART: &str = "word/document.xml";

/// `extract(path) → text`, dispatching on the file extension.
///
/// The result uses `\n` between paragraphs (and between PDF pages), carries no
/// control characters other than `\n`, and is never blank.
pub fn extract_text(path: &Path) -> Result<String, DocumentError> {
    let format = SourceFormat::from_path(path)?;
    extract_with_format(path, format)
}

fn extract_with_format(path: &Path, format: SourceFormat) -> Result<String, DocumentError> {
    let raw = match format {
        SourceFormat::Pdf => extract_pdf(path)?,
        SourceFormat::Docx => extract_docx(path)?,
    };

    let text = clean_control_chars(&raw);
    if text.trim().is_empty() {
        return Err(DocumentError::Empty);
    }

    debug!(
        format = %format,
        chars = text.len(),
        "Extracted text from {}",
        path.display()
    );
    Ok(text)
}

fn extract_pdf(path: &Path) -> Result<String, DocumentError> {
    let bytes = std::fs::read(path)?;
    // pdf-extract panics on some malformed inputs; contain it to this request.
    std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(&bytes))
        .map_err(|_| DocumentError::Extraction("PDF parser aborted on malformed input".into()))?
        .map_err(|e| DocumentError::Extraction(e.to_string()))
}

fn extract_docx(path: &Path) -> Result<String, DocumentError> {
    let file = File::open(path)?;
    let mut archive =
        zip::ZipArchive::new(file).map_err(|e| DocumentError::Extraction(e.to_string()))?;
    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY_PART)
        .map_err(|e| DocumentError::Extraction(format!("{DOCX_BODY_PART}: {e}")))?
        .read_to_string(&mut xml)?;

    Ok(docx_paragraphs(&xml)?.join("\n"))
}

/// Plain text of each paragraph that is a direct child of `w:body`.
///
/// Tables, text boxes, headers and footers are skipped.
fn docx_paragraphs(xml: &str) -> Result<Vec<String>, DocumentError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();

    let mut depth = 0usize;
    let mut body_depth: Option<usize> = None;
    // Nesting level of `w:p` elements; 1 means we are inside a top-level paragraph.
    let mut paragraph_nesting = 0usize;
    let mut current: Option<String> = None;
    let mut in_text = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| DocumentError::Extraction(format!("invalid document XML: {e}")))?;
        match event {
            Event::Start(e) => {
                depth += 1;
                match e.name().as_ref() {
                    b"w:body" => body_depth = Some(depth),
                    b"w:p" => {
                        if paragraph_nesting == 0 && body_depth.map(|b| depth == b + 1).unwrap_or(false)
                        {
                            current = Some(String::new());
                        }
                        paragraph_nesting += 1;
                    }
                    b"w:t" => in_text = true,
                    _ => {}
                }
            }
            Event::Empty(e) => {
                let top_level = current.is_some() && paragraph_nesting == 1;
                match e.name().as_ref() {
                    b"w:p" if paragraph_nesting == 0
                        && body_depth.map(|b| depth == b).unwrap_or(false) =>
                    {
                        paragraphs.push(String::new());
                    }
                    b"w:tab" if top_level => push(&mut current, " "),
                    b"w:br" | b"w:cr" if top_level => push(&mut current, "\n"),
                    _ => {}
                }
            }
            Event::Text(t) if in_text && paragraph_nesting == 1 => {
                let text = t
                    .unescape()
                    .map_err(|e| DocumentError::Extraction(format!("invalid text run: {e}")))?;
                push(&mut current, &text);
            }
            Event::CData(t) if in_text && paragraph_nesting == 1 => {
                push(&mut current, &String::from_utf8_lossy(&t));
            }
            Event::End(e) => {
                match e.name().as_ref() {
                    b"w:t" => in_text = false,
                    b"w:p" => {
                        if paragraph_nesting == 1 {
                            if let Some(paragraph) = current.take() {
                                paragraphs.push(paragraph);
                            }
                        }
                        paragraph_nesting = paragraph_nesting.saturating_sub(1);
                    }
                    b"w:body" => body_depth = None,
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(paragraphs)
}

fn push(current: &mut Option<String>, text: &str) {
    if let Some(paragraph) = current.as_mut() {
        paragraph.push_str(text);
    }
}

/// Normalises line endings and page breaks to `\n`, tabs to a space, and drops
/// other control characters.
fn clean_control_chars(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n");
    unified
        .chars()
        .filter_map(|c| match c {
            '\n' => Some(c),
            '\t' => Some(' '),
            '\r' | '\u{000C}' | '\u{000B}' => Some('\n'),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect()
}
