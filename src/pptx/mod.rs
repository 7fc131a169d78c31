//! PowerPoint (`.pptx`) templates and output decks.
//!
//! - [`template`] loads the slide layouts of a template
//! - [`matcher`] picks a layout by name and the placeholder for body text
//! - [`writer`] replaces the template's slides with generated ones
//! - [`reader`] reads the text of a written deck back

pub mod matcher;
pub mod reader;
pub mod template;
pub mod writer;

#[cfg(test)]
pub(crate) mod fixtures;

pub use matcher::{
    find_content_placeholder, find_most_similar_layout, find_slide_layout_by_name, resolve_layout,
    similarity,
};
pub use reader::read_deck;
pub use template::{Layout, Placeholder, PlaceholderKind, Template};
pub use writer::PresentationWriter;
