//! # Corpus Readers
//!
//! Four readers over heterogeneous annotated corpora, all producing the
//! same aligned tokens/labels representation: CoNLL tab-separated files,
//! GROBID CRF matrices, and two mixed-content XML dialects.

pub mod citations;
pub mod conll;
pub mod crf;
pub mod xml;

use std::path::Path;

pub use citations::{CITATION_CLASSES, read_citation_sentiment_file, read_citation_sentiment_str};
pub use conll::{read_conll_file, read_conll_str};
pub use crf::{read_crf_file, read_crf_str};
pub use xml::{XmlDialect, read_xml_file, read_xml_str};

use crate::error::Result;
use crate::types::Corpus;

/// Source formats understood by the sequence-labelling corpus loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorpusFormat {
    /// Tab-separated `token\ttag` lines, blank line as sentence boundary.
    Conll,
    /// GROBID CRF training matrix, tags normalized to IOB2.
    CrfMatrix,
    /// TEI-style mixed-content XML.
    TeiXml,
    /// ENAMEX-style mixed-content XML.
    EnamexXml,
}

/// Read a sequence-labelling corpus file in the given format.
///
/// The CRF matrix's feature columns are dropped here; use
/// [`read_crf_file`] directly when they are needed.
pub fn read_corpus(path: impl AsRef<Path>, format: CorpusFormat) -> Result<Corpus> {
    match format {
        CorpusFormat::Conll => read_conll_file(path),
        CorpusFormat::CrfMatrix => Ok(read_crf_file(path)?.corpus),
        CorpusFormat::TeiXml => read_xml_file(path, XmlDialect::Tei),
        CorpusFormat::EnamexXml => read_xml_file(path, XmlDialect::Enamex),
    }
}
