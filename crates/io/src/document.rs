// Text fragments from reference documents (.docx, .txt)

use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::csv::read_file_as_utf8;
use crate::error::{IoError, Result};
use crate::xml::{open_archive, read_zip_file, resolve_entity, xml_error};

const DOCUMENT_PART: &str = "word/document.xml";

/// Read a document as text fragments: one per paragraph (.docx) or line (.txt).
/// Blank fragments are dropped.
pub fn read_fragments(path: &Path) -> Result<Vec<String>> {
    let ext = extension(path);
    let fragments = match ext.as_str() {
        "docx" | "docm" => {
            let mut archive = open_archive(path)?;
            let xml = read_zip_file(&mut archive, DOCUMENT_PART)?;
            docx_paragraphs(&xml)?
        }
        "txt" | "text" => read_file_as_utf8(path)?.lines().map(str::to_string).collect(),
        _ => return Err(IoError::UnsupportedFormat(path.display().to_string())),
    };

    let fragments: Vec<String> = fragments.into_iter().filter(|f| !f.trim().is_empty()).collect();
    tracing::debug!(file = %path.display(), fragments = fragments.len(), "document read");
    Ok(fragments)
}

fn extension(path: &Path) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Join the `<w:t>` runs of each `<w:p>`. Tabs and breaks become spaces.
fn docx_paragraphs(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    // Run boundaries carry meaningful spaces
    reader.config_mut().trim_text(false);

    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"t" => in_text = true,
                b"p" => current.clear(),
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"tab" | b"br" | b"cr" => current.push(' '),
                b"p" => paragraphs.push(String::new()),
                _ => {}
            },
            Ok(Event::Text(ref t)) if in_text => {
                current.push_str(&t.decode().map_err(|e| xml_error(DOCUMENT_PART, e))?);
            }
            Ok(Event::GeneralRef(ref r)) if in_text => {
                if let Some(ch) = resolve_entity(&String::from_utf8_lossy(&r[..])) {
                    current.push(ch);
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => paragraphs.push(std::mem::take(&mut current)),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(DOCUMENT_PART, e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs)
}
