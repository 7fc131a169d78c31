//! Open Packaging Conventions (OPC) support.
//!
//! `.pptx` and `.docx` files are zip containers of XML parts linked by
//! relationship parts. This module provides just enough of the convention to
//! read templates and documents and to write presentations back:
//!
//! - [`Package`]: the container, held in memory
//! - [`PackURI`]: part names and relative reference resolution
//! - [`Relationships`]: `.rels` parts
//! - [`ContentTypes`]: `[Content_Types].xml`

pub mod constants;
pub mod content_types;
pub mod error;
pub mod package;
pub mod packuri;
pub mod rel;

pub use content_types::ContentTypes;
pub use error::OpcError;
pub use package::Package;
pub use packuri::PackURI;
pub use rel::{Relationship, Relationships};
