//! Slidewright - draft PowerPoint decks from documents with an LLM
//!
//! A source document is read in word-bounded chunks, a chat completion model
//! turns each chunk into slide text, and the slides are written into a copy
//! of a user-supplied `.pptx` template using its own slide layouts.
//!
//! # Features
//!
//! - **Templates**: Slide layouts and their placeholders are read straight
//!   from the template package
//! - **Layout matching**: Requested layout names are matched exactly, then by
//!   similarity, so any template with a layout can be used
//! - **Sessions**: Progress is checkpointed after every slide and can be
//!   resumed
//! - **Refinement**: An interactive loop revises the deck by chat, with undo
//!
//! # Example - Picking layouts
//!
//! ```no_run
//! use slidewright::pptx::{Template, find_content_placeholder, find_most_similar_layout};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let template = Template::open("template.pptx")?;
//! for name in template.layout_names() {
//!     println!("Layout: {}", name);
//! }
//!
//! if let Some(layout) = find_most_similar_layout(&template, "Two Content Layout") {
//!     let body = find_content_placeholder(layout);
//!     println!("{} -> body placeholder {:?}", layout.name(), body.map(|ph| ph.idx));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Example - Building a deck
//!
//! ```no_run
//! use slidewright::builder::{BuildOptions, PresentationBuilder};
//! use slidewright::config::LlmConfig;
//! use slidewright::llm::OpenAiClient;
//! use slidewright::pptx::Template;
//! use slidewright::session::Session;
//! use slidewright::source;
//! use slidewright::terminal::{Console, StdinPrompter};
//!
//! # fn main() -> slidewright::Result<()> {
//! let template = Template::open("template.pptx")?;
//! let model = OpenAiClient::new(&LlmConfig::load(None)?)?;
//! let console = Console::detect();
//! let builder = PresentationBuilder::new(&template, model, console, BuildOptions::new("deck_session.json"));
//!
//! let mut session = Session::default();
//! builder.build(source::read_chunks("report.docx", 500)?, &mut session)?;
//! builder.render(&session.current_deck(), "deck.pptx".as_ref(), &mut StdinPrompter::new(console))?;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod config;
pub mod deck;
pub mod error;
pub mod llm;
pub mod logging;
pub mod opc;
pub mod pptx;
pub mod session;
pub mod source;
pub mod terminal;
pub mod xml;

pub use builder::{BuildOptions, PresentationBuilder};
pub use deck::{SlideContent, SlideDeck};
pub use error::{Result, SlideError};
pub use llm::LanguageModel;
pub use pptx::{Layout, Placeholder, PlaceholderKind, Template};
pub use session::Session;
