
use std::io::{Cursor, Read};

use itertools::Itertools;
use quick_xml::Reader;
use quick_xml::events::Event;

use crate::RagError;

/// Main body part of a WordprocessingML package
const DOCX_BODY: &str = "word/document.xml";

/// Text of an in-memory PDF, pages separated by blank lines
pub fn pdf_to_text(bytes: &[u8]) -> Result<String, RagError> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| RagError::Extraction(format!("Failed to extract PDF text: {e}")))?;

    // pdf-extract separates pages with form feeds
    Ok(text
        .split('\x0c')
        .map(str::trim)
        .filter(|page| !page.is_empty())
        .join("\n\n"))
}

/// Text of an in-memory DOCX, one line per non-empty paragraph
pub fn docx_to_text(bytes: &[u8]) -> Result<String, RagError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| RagError::Extraction(format!("Failed to read DOCX as ZIP: {e}")))?;

    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY)
        .map_err(|_| RagError::Extraction(format!("Invalid DOCX: missing {DOCX_BODY}")))?
        .read_to_string(&mut xml)?;

    paragraphs_of(&xml)
}

/// Collect `<w:t>` runs into paragraphs, honouring tabs and line breaks
fn paragraphs_of(xml: &str) -> Result<String, RagError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut paragraph = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"p" => paragraph.clear(),
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"tab" => paragraph.push('\t'),
                b"br" | b"cr" => paragraph.push('\n'),
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"p" => {
                    let line = paragraph.trim();
                    if !line.is_empty() {
                        paragraphs.push(line.to_string());
                    }
                    paragraph.clear();
                }
                b"t" => in_text = false,
                _ => {}
            },
            Ok(Event::Text(e)) if in_text => {
                let text = e.unescape().map_err(|err| {
                    RagError::Extraction(format!("Invalid text in {DOCX_BODY}: {err}"))
                })?;
                paragraph.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(RagError::Extraction(format!(
                    "Failed to parse {DOCX_BODY}: {e}"
                )));
            }
        }
    }

    Ok(paragraphs.join("\n"))
}
