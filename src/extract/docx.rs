//! Word document text: body paragraphs first, then table rows
//!
//! Reads `word/document.xml` straight out of the zip container.

use anyhow::Context;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const DOCUMENT_XML: &str = "word/document.xml";

pub fn extract(path: &Path) -> anyhow::Result<String> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_XML)
        .with_context(|| format!("missing {}", DOCUMENT_XML))?
        .read_to_string(&mut xml)?;

    let body = parse_document_xml(&xml)?;
    Ok(body.render())
}

/// Text pulled from the document body
#[derive(Debug, Default, PartialEq)]
pub(crate) struct DocxBody {
    /// Non-blank paragraphs outside tables
    pub paragraphs: Vec<String>,
    /// Each table row as its non-blank cell texts
    pub rows: Vec<Vec<String>>,
}

impl DocxBody {
    pub fn render(&self) -> String {
        let mut blocks: Vec<String> = self.paragraphs.clone();
        blocks.extend(
            self.rows
                .iter()
                .filter(|cells| !cells.is_empty())
                .map(|cells| cells.join(" | ")),
        );
        blocks.join("\n\n")
    }
}

pub(crate) fn parse_document_xml(xml: &str) -> anyhow::Result<DocxBody> {
    let mut reader = Reader::from_str(xml);
    let mut body = DocxBody::default();

    let mut table_depth = 0usize;
    let mut paragraph = String::new();
    let mut in_paragraph = false;
    let mut in_text = false;
    let mut cell_paragraphs: Vec<String> = Vec::new();
    let mut row_cells: Vec<String> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:tbl" => table_depth += 1,
                b"w:tr" if table_depth == 1 => row_cells.clear(),
                b"w:tc" if table_depth == 1 => cell_paragraphs.clear(),
                b"w:p" => {
                    in_paragraph = true;
                    paragraph.clear();
                }
                b"w:t" => in_text = true,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" if in_paragraph => paragraph.push('\t'),
                b"w:br" | b"w:cr" if in_paragraph => paragraph.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text => {
                paragraph.push_str(&t.unescape()?);
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => {
                    in_paragraph = false;
                    if table_depth == 0 {
                        if !paragraph.trim().is_empty() {
                            body.paragraphs.push(paragraph.clone());
                        }
                    } else {
                        cell_paragraphs.push(paragraph.clone());
                    }
                }
                b"w:tc" if table_depth == 1 => {
                    let text = cell_paragraphs.join("\n");
                    let text = text.trim();
                    if !text.is_empty() {
                        row_cells.push(text.to_string());
                    }
                }
                b"w:tr" if table_depth == 1 => {
                    body.rows.push(std::mem::take(&mut row_cells));
                }
                b"w:tbl" => table_depth = table_depth.saturating_sub(1),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(body)
}
