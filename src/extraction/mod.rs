//! Producers of partial graphs: label normalization, relation
//! classification, chunked text and tabular co-occurrence extraction, and
//! the concurrent runner that drives them.

pub mod chunker;
pub mod classifier;
pub mod normalizer;
pub mod runner;
pub mod table;
pub mod text;

pub use chunker::{split_sentences, TextChunker, TextUnit};
pub use classifier::{Classification, RelationshipClassifier, Signal};
pub use normalizer::{canonical_id, clean_label, EntityNormalizer, Lexicon, Rejection};
pub use runner::{
    CompletedUnit, ExtractionReport, ExtractionRunner, ExtractionUnit, HeuristicExtractor,
    UnitExtractor, UnitFailure, UnitPayload,
};
pub use table::TableExtractor;
pub use text::TextExtractor;
