//! Document assembly and output.
//!
//! Turns a [`SelectedSet`] into a [`Document`] and writes it in one of the
//! supported [`OutputFormat`]s. Output is staged in a temporary file next to
//! the destination and only renamed into place on [`StagedFile::commit`].

use crate::error::{PaperError, Result};
use crate::openalex::WorkRecord;
use crate::selector::SelectedSet;
use docx_rs::{
    AlignmentType, Docx, LineSpacing, PageMargin, Paragraph, Run, SpecialIndentType,
};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Section body used when a work has no abstract
pub const ABSTRACT_PLACEHOLDER: &str = "No abstract available.";

/// Heading of the bibliography block
const REFERENCES_HEADING: &str = "References";

/// One inch in twentieths of a point
const INCH_TWIPS: i32 = 1440;

/// One section of the generated paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub heading: String,
    pub body: String,
}

/// The generated research-paper document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub sections: Vec<Section>,
    /// Citation strings, one per section, in the same order
    pub bibliography: Vec<String>,
}

/// On-disk rendering of a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Markdown,
    Json,
    /// Word document with APA page layout
    Docx,
}

impl OutputFormat {
    /// Infer the format from a file extension, falling back to plain text.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("md") | Some("markdown") => OutputFormat::Markdown,
            Some("json") => OutputFormat::Json,
            Some("docx") => OutputFormat::Docx,
            _ => OutputFormat::Text,
        }
    }

    /// Default file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
            OutputFormat::Docx => "docx",
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = PaperError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "txt" | "text" => Ok(OutputFormat::Text),
            "md" | "markdown" => Ok(OutputFormat::Markdown),
            "json" => Ok(OutputFormat::Json),
            "docx" => Ok(OutputFormat::Docx),
            other => Err(PaperError::Validation(format!(
                "unknown format {:?} (expected txt, md, json or docx)",
                other
            ))),
        }
    }
}

/// Build the document for `selected`.
///
/// One section per record in selection order; the bibliography follows the
/// same order.
pub fn assemble(title: &str, selected: &SelectedSet) -> Document {
    let sections = selected
        .iter()
        .map(|record| Section {
            heading: record.title.clone(),
            body: if record.abstract_text.trim().is_empty() {
                ABSTRACT_PLACEHOLDER.to_string()
            } else {
                record.abstract_text.clone()
            },
        })
        .collect();

    let bibliography = selected.iter().map(format_citation).collect();

    Document {
        title: title.to_string(),
        sections,
        bibliography,
    }
}

/// Format a bibliography entry as `Authors (Year). Title.`, with the DOI
/// link appended when known.
pub fn format_citation(record: &WorkRecord) -> String {
    let authors = if record.authors.is_empty() {
        "Anonymous".to_string()
    } else {
        record.authors.join(", ")
    };

    let title = single_line(&record.title);
    let mut entry = format!("{} ({}). {}", authors, record.year, title);
    if !title.ends_with('.') {
        entry.push('.');
    }
    if let Some(doi) = &record.doi {
        entry.push_str(&format!(" https://doi.org/{}", doi));
    }
    entry
}

/// Collapse runs of whitespace, newlines included, into single spaces.
fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Render the document in `format`.
pub fn render(document: &Document, format: OutputFormat) -> Result<Vec<u8>> {
    match format {
        OutputFormat::Text => Ok(render_text(document).into_bytes()),
        OutputFormat::Markdown => Ok(render_markdown(document).into_bytes()),
        OutputFormat::Json => {
            let mut json = serde_json::to_vec_pretty(document)
                .map_err(|e| PaperError::Validation(format!("Failed to serialize document: {}", e)))?;
            json.push(b'\n');
            Ok(json)
        }
        OutputFormat::Docx => render_docx(document),
    }
}

fn render_text(document: &Document) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", single_line(&document.title));

    for section in &document.sections {
        let _ = write!(out, "\n{}\n\n{}\n", single_line(&section.heading), section.body);
    }

    let _ = writeln!(out, "\n{}\n", REFERENCES_HEADING);
    for entry in &document.bibliography {
        let _ = writeln!(out, "{}", entry);
    }
    out
}

fn render_markdown(document: &Document) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}", single_line(&document.title));

    for section in &document.sections {
        let _ = write!(out, "\n## {}\n\n{}\n", single_line(&section.heading), section.body);
    }

    let _ = writeln!(out, "\n## {}\n", REFERENCES_HEADING);
    for entry in &document.bibliography {
        let _ = writeln!(out, "- {}", entry);
    }
    out
}

fn docx_heading(text: &str, size: usize, align: AlignmentType) -> Paragraph {
    Paragraph::new()
        .add_run(Run::new().add_text(single_line(text)).bold().size(size))
        .align(align)
}

/// APA layout: 1" margins, centred title and references heading, double-spaced
/// body with first-line indent, hanging-indent references.
fn render_docx(document: &Document) -> Result<Vec<u8>> {
    let double_spaced = || LineSpacing::new().line(480);

    let mut docx = Docx::new()
        .page_margin(
            PageMargin::new()
                .top(INCH_TWIPS)
                .bottom(INCH_TWIPS)
                .left(INCH_TWIPS)
                .right(INCH_TWIPS),
        )
        .add_paragraph(docx_heading(&document.title, 32, AlignmentType::Center));

    for section in &document.sections {
        docx = docx
            .add_paragraph(docx_heading(&section.heading, 26, AlignmentType::Left))
            .add_paragraph(
                Paragraph::new()
                    .add_run(Run::new().add_text(section.body.as_str()))
                    .line_spacing(double_spaced())
                    .indent(None, Some(SpecialIndentType::FirstLine(INCH_TWIPS / 2)), None, None),
            );
    }

    docx = docx.add_paragraph(docx_heading(REFERENCES_HEADING, 28, AlignmentType::Center));
    for entry in &document.bibliography {
        docx = docx.add_paragraph(
            Paragraph::new()
                .add_run(Run::new().add_text(entry.as_str()))
                .line_spacing(double_spaced())
                .indent(
                    Some(INCH_TWIPS / 2),
                    Some(SpecialIndentType::Hanging(INCH_TWIPS / 2)),
                    None,
                    None,
                ),
        );
    }

    let mut buf = std::io::Cursor::new(Vec::new());
    docx.build()
        .pack(&mut buf)
        .map_err(|e| PaperError::Validation(format!("Failed to build docx: {}", e)))?;
    Ok(buf.into_inner())
}

/// Output written to a temporary file beside its destination.
///
/// Dropping it without [`commit`](StagedFile::commit) removes the temporary
/// file and leaves the destination untouched.
#[derive(Debug)]
pub struct StagedFile {
    tmp: NamedTempFile,
    path: PathBuf,
}

impl StagedFile {
    fn new(bytes: &[u8], path: &Path) -> Result<Self> {
        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| PaperError::write(path, e))?;
        tmp.write_all(bytes)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| PaperError::write(path, e))?;
        debug!(tmp = %tmp.path().display(), dest = %path.display(), "Staged output");

        Ok(Self {
            tmp,
            path: path.to_path_buf(),
        })
    }

    /// Final destination
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically move the staged content to its destination.
    pub fn commit(self) -> Result<()> {
        let path = self.path;
        self.tmp
            .persist(&path)
            .map_err(|e| PaperError::write(&path, e.error))?;
        info!(path = %path.display(), "Output written");
        Ok(())
    }
}

/// Render `document` and stage it for `path`.
pub fn stage(document: &Document, path: &Path, format: OutputFormat) -> Result<StagedFile> {
    let content = render(document, format)?;
    StagedFile::new(&content, path)
}

/// Write the document to `path`, replacing any existing file.
///
/// A failure never leaves a partial file at `path`.
pub fn write(document: &Document, path: &Path, format: OutputFormat) -> Result<()> {
    stage(document, path, format)?.commit()?;
    debug!(sections = document.sections.len(), "Document written");
    Ok(())
}

/// CSV row for [`write_records_csv`]
#[derive(Debug, Serialize)]
struct RecordRow<'a> {
    id: &'a str,
    title: &'a str,
    authors: String,
    year: i32,
    citations: u64,
    doi: &'a str,
    abstract_text: &'a str,
}

/// Serialize `records` as CSV and stage them for `path`.
pub fn stage_records_csv(records: &[WorkRecord], path: &Path) -> Result<StagedFile> {
    let csv_err = |e: csv::Error| PaperError::write(path, std::io::Error::from(e));
    let mut wtr = csv::WriterBuilder::new().has_headers(true).from_writer(Vec::new());

    for record in records {
        wtr.serialize(RecordRow {
            id: &record.id,
            title: &record.title,
            authors: record.authors.join("; "),
            year: record.year,
            citations: record.citations,
            doi: record.doi.as_deref().unwrap_or_default(),
            abstract_text: &record.abstract_text,
        })
        .map_err(csv_err)?;
    }

    let bytes = wtr
        .into_inner()
        .map_err(|e| PaperError::write(path, std::io::Error::new(e.error().kind(), e.error().to_string())))?;
    debug!(rows = records.len(), "Serialized records");
    StagedFile::new(&bytes, path)
}

/// Export records as CSV, one row per record.
pub fn write_records_csv(records: &[WorkRecord], path: &Path) -> Result<()> {
    stage_records_csv(records, path)?.commit()
}
