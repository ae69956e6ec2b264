//! Document Writers: the rewritten resume as `.docx` or `.pdf`.
//!
//! Both writers share one styling pass. Each `\n`-separated line is a paragraph,
//! classified by `StyleRules` into a `ParagraphStyle`.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub mod docx;
pub mod font_metrics;
pub mod layout;
pub mod pdf;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("PDF generation failed: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("DOCX generation failed: {0}")]
    Docx(String),

    #[error("I/O error while rendering: {0}")]
    Io(#[from] std::io::Error),
}

// ────────────────────────────────────────────────────────────────────────────
// Paragraph styling
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParagraphStyle {
    /// Section heading: bold 14 pt with extra spacing.
    Heading,
    /// Skill category line: bold 11 pt.
    Category,
    /// Job or project title: italic 11 pt.
    Title,
    Regular,
    /// Empty or whitespace-only line.
    Blank,
}

impl ParagraphStyle {
    pub fn is_bold(&self) -> bool {
        matches!(self, ParagraphStyle::Heading | ParagraphStyle::Category)
    }

    pub fn is_italic(&self) -> bool {
        matches!(self, ParagraphStyle::Title)
    }

    pub fn font_size_pt(&self) -> f32 {
        match self {
            ParagraphStyle::Heading => 14.0,
            _ => 11.0,
        }
    }

    /// Vertical advance after the paragraph's last line, in multiples of the line height.
    pub fn spacing_after(&self) -> f32 {
        match self {
            ParagraphStyle::Heading => 2.0,
            ParagraphStyle::Category | ParagraphStyle::Title => 1.5,
            ParagraphStyle::Regular => 1.3,
            ParagraphStyle::Blank => 0.5,
        }
    }
}

/// Substring markers that select a paragraph style, checked in order
/// heading, category, title.
#[derive(Debug, Clone)]
pub struct StyleRules {
    pub headings: Vec<String>,
    pub categories: Vec<String>,
    pub titles: Vec<String>,
}

pub const DEFAULT_HEADINGS: [&str; 6] = [
    "EXPERIENCE",
    "EDUCATION",
    "PROJECTS",
    "SKILLS",
    "CERTIFICATIONS & WORKSHOPS",
    "EXTRACURRICULARS",
];

pub const DEFAULT_CATEGORIES: [&str; 4] = [
    "Programming Languages:",
    "Tools & Technologies:",
    "Soft Skills:",
    "Languages:",
];

pub const DEFAULT_TITLES: [&str; 4] = [
    "Frontend Developer Intern",
    "Event Tech Innovator",
    "Real-time Emergency Response Application",
    "Student Feedback Analyzer",
];

impl Default for StyleRules {
    fn default() -> Self {
        let owned = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        Self {
            headings: owned(&DEFAULT_HEADINGS),
            categories: owned(&DEFAULT_CATEGORIES),
            titles: owned(&DEFAULT_TITLES),
        }
    }
}

impl StyleRules {
    /// Classifies one line and returns the text to render.
    ///
    /// `# ` and `## ` prefixes force heading and category styles and are removed
    /// from the output; every other line is rendered verbatim.
    pub fn classify<'a>(&self, line: &'a str) -> (ParagraphStyle, Cow<'a, str>) {
        if line.trim().is_empty() {
            return (ParagraphStyle::Blank, Cow::Borrowed(""));
        }

        let trimmed = line.trim_start();
        for (marker, style) in [("## ", ParagraphStyle::Category), ("# ", ParagraphStyle::Heading)] {
            if let Some(rest) = trimmed.strip_prefix(marker) {
                let rest = rest.trim();
                if rest.is_empty() {
                    return (ParagraphStyle::Blank, Cow::Borrowed(""));
                }
                return (style, Cow::Borrowed(rest));
            }
        }

        let contains_any = |markers: &[String]| markers.iter().any(|m| line.contains(m.as_str()));
        let style = if contains_any(&self.headings) {
            ParagraphStyle::Heading
        } else if contains_any(&self.categories) {
            ParagraphStyle::Category
        } else if contains_any(&self.titles) {
            ParagraphStyle::Title
        } else {
            ParagraphStyle::Regular
        };
        (style, Cow::Borrowed(line))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Output formats
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Docx,
    Pdf,
}

impl DocumentFormat {
    pub fn mime(&self) -> &'static str {
        match self {
            DocumentFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            DocumentFormat::Pdf => "application/pdf",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            DocumentFormat::Docx => "docx",
            DocumentFormat::Pdf => "pdf",
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown document format: {0}")]
pub struct UnknownFormat(pub String);

impl FromStr for DocumentFormat {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "docx" => Ok(DocumentFormat::Docx),
            "pdf" => Ok(DocumentFormat::Pdf),
            other => Err(UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A finished document held in memory.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub format: DocumentFormat,
}

impl RenderedDocument {
    pub fn mime(&self) -> &'static str {
        self.format.mime()
    }

    /// `<base>_rewritten.<ext>`
    pub fn file_name(&self, base: &str) -> String {
        format!("{}_rewritten.{}", base, self.format.extension())
    }
}

/// Renders `text` in the requested format.
pub fn render(
    text: &str,
    format: DocumentFormat,
    rules: &StyleRules,
) -> Result<RenderedDocument, RenderError> {
    match format {
        DocumentFormat::Docx => docx::write_docx(text, rules),
        DocumentFormat::Pdf => pdf::write_pdf(text, rules),
    }
}
