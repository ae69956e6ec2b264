//! Page writer: emits the computed layout as a letter-size PDF using the
//! unembedded Helvetica core fonts.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::debug;

use crate::render::font_metrics::PdfFont;
use crate::render::layout::{layout_pages, PageGeometry, PageLayout, LETTER};
use crate::render::{DocumentFormat, RenderError, RenderedDocument, StyleRules};

pub fn write_pdf(text: &str, rules: &StyleRules) -> Result<RenderedDocument, RenderError> {
    let pages = layout_pages(text, rules, &LETTER);
    let bytes = emit_pdf(&pages, &LETTER)?;
    debug!(pages = pages.len(), bytes = bytes.len(), "Rendered PDF");
    Ok(RenderedDocument {
        bytes,
        format: DocumentFormat::Pdf,
    })
}

fn emit_pdf(pages: &[PageLayout], geometry: &PageGeometry) -> Result<Vec<u8>, RenderError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut fonts = lopdf::Dictionary::new();
    for font in PdfFont::ALL {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => font.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(font.resource_name(), font_id);
    }
    let resources_id = doc.add_object(dictionary! { "Font" => fonts });
    let media_box: Vec<Object> = vec![
        0.into(),
        0.into(),
        geometry.width.into(),
        geometry.height.into(),
    ];

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for page in pages {
        let content = page_content(page);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => media_box.clone(),
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count,
        "Resources" => resources_id,
        "MediaBox" => media_box,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id: ObjectId = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

/// One text object per page. `Tf` is re-issued at the top of every page and
/// whenever the font or size changes.
fn page_content(page: &PageLayout) -> Content {
    let mut operations = vec![Operation::new("BT", vec![])];
    let mut current: Option<(PdfFont, f32)> = None;

    for line in &page.lines {
        if current != Some((line.font, line.size)) {
            operations.push(Operation::new(
                "Tf",
                vec![line.font.resource_name().into(), line.size.into()],
            ));
            current = Some((line.font, line.size));
        }
        operations.push(Operation::new(
            "Tm",
            vec![
                1.into(),
                0.into(),
                0.into(),
                1.into(),
                line.x.into(),
                line.y.into(),
            ],
        ));
        operations.push(Operation::new(
            "Tj",
            vec![Object::String(encode_win_ansi(&line.text), StringFormat::Literal)],
        ));
    }

    operations.push(Operation::new("ET", vec![]));
    Content { operations }
}

/// Encodes text for a WinAnsiEncoding simple font; unmappable characters become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{00A0}'..='\u{00FF}' => c as u32 as u8,
            '\u{20AC}' => 0x80,
            '\u{201A}' => 0x82,
            '\u{201E}' => 0x84,
            '\u{2026}' => 0x85,
            '\u{2030}' => 0x89,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2122}' => 0x99,
            '\t' => b' ',
            _ => b'?',
        })
        .collect()
}
