//! Identifier extraction and classification
//!
//! # Components
//!
//! - `pattern`: the shared case-insensitive identifier matcher
//! - `IdentifierExtractor`: five-channel scan of a parsed page
//! - `IdentifierClassifier`: heuristic personal/institutional predicate

mod classifier;
mod extractor;
mod pattern;

pub use classifier::{IdentifierClassifier, Verdict};
pub use extractor::{ExtractedIdentifier, ExtractionChannel, IdentifierExtractor, SourceType};
pub use pattern::{identifier_pattern, split_identifier};
