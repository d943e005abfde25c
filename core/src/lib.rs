//! Inverted index construction and lnc.ltc query execution.

pub mod error;
pub mod index;
pub mod persist;
pub mod postings;
pub mod query;
pub mod scoring;
pub mod source;
pub mod tokenizer;

pub use error::{Error, Result};
pub use index::{build, build_parallel, BuiltIndex, IndexBuilder};
pub use persist::IndexPaths;
pub use postings::{DocId, Posting, PostingsList, SkipPointer, TermFreq};
pub use query::{LoadedIndex, ScoredDoc, SearchConfig, DEFAULT_TOP_K};
pub use source::{DirectorySource, DocumentSource};
pub use tokenizer::{Normalizer, NormalizerConfig, StemmingNormalizer};
