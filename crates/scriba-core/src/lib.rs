//! # Scriba Core
//!
//! Corpus ingestion and label alignment for the Scriba NLP toolkit.
//! Converts heterogeneous annotated corpora (mixed-content XML with inline
//! entity spans, GROBID CRF matrices, CoNLL files) into one aligned
//! tokens/labels representation, and normalizes tag schemes to IOB2.
//!
//! ## Quick Start
//!
//! ```rust
//! use scriba_core::reader::xml::{read_xml_str, XmlDialect};
//!
//! let doc = r#"<TEI><p>bla <rs type="insult">CENSURED</rs> bla</p></TEI>"#;
//! let corpus = read_xml_str(doc, XmlDialect::Tei).unwrap();
//!
//! assert_eq!(corpus.sentences[0], vec!["bla", "CENSURED", "bla"]);
//! assert_eq!(corpus.labels[0], vec!["O", "B-<insult>", "O"]);
//! ```
pub mod error;
pub mod reader;
pub mod tags;
pub mod tokenizer;
pub mod types;

// Re-export primary API
pub use error::{CorpusError, Result};
pub use reader::{CorpusFormat, XmlDialect, read_corpus};
pub use tokenizer::{Token, tokenize, tokenize_with_offsets};
pub use types::{Corpus, CrfMatrix};
