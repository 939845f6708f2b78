//! Bookwise Ingest — HTML extraction, deep text cleaning, chunking, and the
//! ingestion orchestrator.

pub mod chunking;
pub mod clean;
pub mod html;
pub mod ingest;

pub use chunking::{Chunker, DocumentChunk};
pub use clean::clean;
pub use html::{
    HtmlExtractor, ImageTextExtractor, NoopImageTextExtractor, UNKNOWN_AUTHOR, UNKNOWN_TITLE,
};
pub use ingest::Ingester;
