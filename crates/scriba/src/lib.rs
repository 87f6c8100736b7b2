//! # Scriba
//!
//! Neural toolkit for two NLP tasks: multi-class sentiment classification
//! of citation sentences and sequence labelling (NER) over tokenized
//! text, with pluggable pretrained word embeddings.
//!
//! The heavy lifting lives in two crates re-exported here:
//! [`scriba_core`] ingests heterogeneous annotated corpora into one
//! aligned tokens/labels representation, and [`scriba_models`] runs the
//! model lifecycle (train, k-fold train, predict, evaluate, persist,
//! reload).
//!
//! ## Quick Start
//!
//! ```rust
//! use scriba::{read_xml_str, XmlDialect};
//!
//! let doc = r#"<TEI><p>bla <rs type="insult">CENSURED</rs> bla</p></TEI>"#;
//! let corpus = read_xml_str(doc, XmlDialect::Tei).unwrap();
//! assert_eq!(corpus.labels[0], vec!["O", "B-<insult>", "O"]);
//! ```

pub use scriba_core::{
    Corpus, CorpusError, CorpusFormat, CrfMatrix, Token, XmlDialect, read_corpus, tokenize,
    tokenize_with_offsets,
};
pub use scriba_core::reader::xml::{read_xml_file, read_xml_str};
pub use scriba_core::reader::{
    read_citation_sentiment_file, read_conll_file, read_crf_file, read_crf_str,
};
pub use scriba_core::tags::grobid_to_iob2;

pub use scriba_models::{
    Annotation, ClassificationReport, Classifier, ClassifierConfig, EntityMention, ModelError,
    Preprocessor, SequenceConfig, SequenceReport, SequenceTagger, TrainingConfig, WordEmbeddings,
};
