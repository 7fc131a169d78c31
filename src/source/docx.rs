//! Paragraph text of Word (`.docx`) documents.

use crate::opc::Package;
use crate::opc::error::{OpcError, Result};
use crate::xml::{reference_content, text_content};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::path::Path;

/// Open a `.docx` file and return the text of its paragraphs in order.
pub fn read_paragraphs<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let package = Package::open(path)?;
    let document = package.main_document_partname()?;
    paragraphs(package.part(&document)?)
}

/// Paragraph texts of a `word/document.xml` part.
///
/// Text of paragraphs nested in another paragraph (text boxes, shapes) is
/// folded into the enclosing one. Tabs and breaks become `\t` and `\n`.
pub fn paragraphs(xml: &[u8]) -> Result<Vec<String>> {
    let mut reader = Reader::from_reader(xml);

    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_text = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"p" => depth += 1,
                b"t" if depth > 0 => in_text = true,
                _ => {},
            },
            Ok(Event::Empty(ref e)) if depth > 0 => match e.local_name().as_ref() {
                b"tab" => current.push('\t'),
                b"br" | b"cr" => current.push('\n'),
                _ => {},
            },
            Ok(Event::Empty(ref e)) if e.local_name().as_ref() == b"p" => {
                paragraphs.push(String::new());
            },
            Ok(Event::Text(ref t)) if in_text => current.push_str(&text_content(t)?),
            Ok(Event::GeneralRef(ref r)) if in_text => current.push_str(&reference_content(r)?),
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" if depth > 0 => {
                    depth -= 1;
                    if depth == 0 {
                        paragraphs.push(std::mem::take(&mut current));
                    }
                },
                _ => {},
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(OpcError::Xml(format!("Document parse error: {}", e))),
            _ => {},
        }
        buf.clear();
    }

    Ok(paragraphs)
}
