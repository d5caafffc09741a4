mod client;
mod splitter;

pub use client::{DocumentIndexer, VectorIndexClient};
pub use splitter::split_text;
