//! DIMAP documents
//!
//! Markup writer, document builder and the key reader used to re-open
//! later-family containers.

pub mod markup;
pub mod document;
pub mod keys;

pub use document::{build_document, skeleton_document, write_document, DOCUMENT_FILE};
pub use markup::{MarkupWriter, Node, QuoteStyle};
