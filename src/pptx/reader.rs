//! Reading slide text back from a deck.
//!
//! Used before each refinement round so edits made by hand in PowerPoint
//! are part of what the model sees.

use crate::deck::{SlideContent, SlideDeck};
use crate::error::Result;
use crate::opc::constants::relationship_type as RT;
use crate::opc::error::OpcError;
use crate::opc::{PackURI, Package};
use crate::pptx::template::{PlaceholderKind, id_list_rids};
use crate::xml::{attr, reference_content, text_content};
use quick_xml::Reader;
use quick_xml::events::Event;
use std::path::Path;

/// Text of one shape with a text frame.
#[derive(Debug, Default, Clone, PartialEq)]
struct ShapeText {
    /// Placeholder kind, `None` for free shapes
    kind: Option<PlaceholderKind>,
    text: String,
}

/// Read the slides of a deck, or `None` when the file does not exist.
pub fn read_deck<P: AsRef<Path>>(path: P) -> Result<Option<SlideDeck>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(None);
    }
    let deck = deck_from_package(&Package::open(path)?)?;
    tracing::debug!(path = %path.display(), slides = deck.len(), "read deck");
    Ok(Some(deck))
}

/// Slides of a loaded package, numbered from 1 in presentation order.
///
/// The title is the title placeholder's text (or the first free text box
/// when there is none), the content is every other text shape, and the
/// narration is the body of the notes slide.
pub fn deck_from_package(package: &Package) -> Result<SlideDeck> {
    let presentation = package.main_document_partname()?;
    let pres_rels = package.rels_for(&presentation)?;

    let mut slides = Vec::new();
    for (i, rid) in id_list_rids(package.part(&presentation)?, b"sldId")?.iter().enumerate() {
        let slide = pres_rels.resolve(rid)?;
        let mut shapes = shape_texts(package.part(&slide)?)?;

        let title_at = shapes
            .iter()
            .position(|s| s.kind == Some(PlaceholderKind::Title))
            .or_else(|| shapes.iter().position(|s| s.kind.is_none()));
        let title = title_at.map(|at| shapes.remove(at).text).unwrap_or_default();
        let content = shapes
            .iter()
            .map(|s| s.text.as_str())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        let narration = match notes_partname(package, &slide)? {
            Some(notes) => shape_texts(package.part(&notes)?)?
                .into_iter()
                .filter(|s| s.kind == Some(PlaceholderKind::Body))
                .map(|s| s.text)
                .collect::<Vec<_>>()
                .join("\n"),
            None => String::new(),
        };

        slides.push(SlideContent::new((i + 1) as f64, title, content).with_narration(narration));
    }

    Ok(SlideDeck::new(slides))
}

fn notes_partname(package: &Package, slide: &PackURI) -> std::result::Result<Option<PackURI>, OpcError> {
    let rels = package.rels_for(slide)?;
    match rels.first_of(RT::NOTES_SLIDE) {
        Ok(rel) => Ok(Some(rels.target_partname(rel)?)),
        Err(_) => Ok(None),
    }
}

/// Text of every `p:sp` with a text body, in document order.
fn shape_texts(xml: &[u8]) -> std::result::Result<Vec<ShapeText>, OpcError> {
    let mut reader = Reader::from_reader(xml);

    let mut shapes = Vec::new();
    let mut current: Option<ShapeText> = None;
    let mut has_text_body = false;
    let mut paragraphs = 0usize;
    let mut in_text = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"sp" => {
                    current = Some(ShapeText::default());
                    has_text_body = false;
                    paragraphs = 0;
                },
                b"txBody" => has_text_body = true,
                b"p" if has_text_body => {
                    if let Some(shape) = current.as_mut()
                        && paragraphs > 0
                    {
                        shape.text.push('\n');
                    }
                    paragraphs += 1;
                },
                b"t" => in_text = true,
                b"ph" => set_kind(&mut current, e)?,
                _ => {},
            },
            Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"ph" => set_kind(&mut current, e)?,
                b"p" if has_text_body => {
                    if let Some(shape) = current.as_mut()
                        && paragraphs > 0
                    {
                        shape.text.push('\n');
                    }
                    paragraphs += 1;
                },
                b"br" => {
                    if let Some(shape) = current.as_mut() {
                        shape.text.push('\n');
                    }
                },
                _ => {},
            },
            Ok(Event::Text(ref t)) if in_text => {
                if let Some(shape) = current.as_mut() {
                    shape.text.push_str(&text_content(t)?);
                }
            },
            Ok(Event::GeneralRef(ref r)) if in_text => {
                if let Some(shape) = current.as_mut() {
                    shape.text.push_str(&reference_content(r)?);
                }
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"sp" => {
                    if let Some(shape) = current.take()
                        && has_text_body
                    {
                        shapes.push(shape);
                    }
                    has_text_body = false;
                },
                _ => {},
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(OpcError::Xml(format!("Slide parse error: {}", e))),
            _ => {},
        }
        buf.clear();
    }

    Ok(shapes)
}

fn set_kind(current: &mut Option<ShapeText>, e: &quick_xml::events::BytesStart<'_>) -> std::result::Result<(), OpcError> {
    if let Some(shape) = current.as_mut() {
        shape.kind = Some(PlaceholderKind::from_ph_type(attr(e, b"type")?.as_deref()));
    }
    Ok(())
}
