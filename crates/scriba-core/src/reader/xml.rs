//! # XML Span Projection
//!
//! Streaming reader for mixed-content XML corpora. Inline entity markup is
//! projected onto a flat BIO tag sequence aligned with the output of the
//! toolkit tokenizer, one `(tokens, labels)` pair per sentence element.

use std::fs;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use tracing::warn;

use crate::error::Result;
use crate::tags::OUTSIDE;
use crate::tokenizer::tokenize;
use crate::types::Corpus;

/// The two mixed-content dialects understood by the span projector.
///
/// The dialect is chosen explicitly by the caller; nothing is sniffed from
/// the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlDialect {
    /// TEI-style markup: root `TEI`, sentence element `p`, entity element
    /// `rs` with a `type` attribute carrying the raw entity type.
    Tei,
    /// ENAMEX-style markup: root `corpus`, sentence element `sentence`,
    /// entity element `ENAMEX` with `type` and optional `sub_type`
    /// attributes mapped through a fixed type-translation table.
    Enamex,
}

impl XmlDialect {
    fn is_root(self, name: &[u8]) -> bool {
        match self {
            XmlDialect::Tei => name == b"TEI" || name == b"tei",
            XmlDialect::Enamex => name == b"corpus",
        }
    }

    fn is_sentence(self, name: &[u8]) -> bool {
        match self {
            XmlDialect::Tei => name == b"p",
            XmlDialect::Enamex => name == b"sentence",
        }
    }

    fn is_entity(self, name: &[u8]) -> bool {
        match self {
            XmlDialect::Tei => name == b"rs",
            XmlDialect::Enamex => name == b"ENAMEX",
        }
    }
}

/// Entity type translation table for the ENAMEX dialect.
///
/// Unknown main types map to `None`, i.e. the mention is kept but its
/// tokens stay outside any entity.
fn translate_enamex(main_type: &str, sub_type: &str) -> Option<&'static str> {
    match main_type.to_lowercase().as_str() {
        "company" => Some("business"),
        "fictioncharacter" => Some("person"),
        "organization" => match sub_type.to_lowercase().as_str() {
            "institutionalorganization" => Some("institution"),
            "company" => Some("business"),
            _ => Some("organisation"),
        },
        "person" => Some("person"),
        "location" | "poi" => Some("location"),
        "product" => Some("artifact"),
        _ => None,
    }
}

/// Accumulation state for one document parse.
///
/// One projector owns the state of exactly one document; callers construct
/// a fresh projector per parse. Completed sentences are moved out of the
/// working buffers with `mem::take`, so a finished sentence is never
/// aliased by later events.
struct SpanProjector {
    dialect: XmlDialect,
    tokens: Vec<String>,
    labels: Vec<String>,
    corpus: Corpus,
    accumulated: String,
    current_label: Option<String>,
}

impl SpanProjector {
    fn new(dialect: XmlDialect) -> Self {
        Self {
            dialect,
            tokens: Vec::new(),
            labels: Vec::new(),
            corpus: Corpus::new(),
            accumulated: String::new(),
            current_label: None,
        }
    }

    /// Tokenize pending character data and emit it outside any entity.
    fn flush_outside(&mut self) {
        if self.accumulated.is_empty() {
            return;
        }
        for token in tokenize(&self.accumulated) {
            self.tokens.push(token);
            self.labels.push(OUTSIDE.to_string());
        }
        self.accumulated.clear();
    }

    fn text(&mut self, chunk: &str) {
        self.accumulated.push_str(chunk);
    }

    fn start_element(&mut self, e: &BytesStart) -> Result<()> {
        self.flush_outside();
        let name = e.name();
        let name = name.as_ref();

        if self.dialect.is_root(name) {
            self.tokens = Vec::new();
            self.labels = Vec::new();
            self.corpus = Corpus::new();
        }
        if self.dialect.is_sentence(name) {
            self.tokens = Vec::new();
            self.labels = Vec::new();
            self.current_label = None;
        }
        if self.dialect.is_entity(name) {
            self.current_label = self.entity_label(e)?;
        }
        Ok(())
    }

    /// Resolve the label for an opening entity element, or `None` when the
    /// mention should stay outside any entity.
    fn entity_label(&self, e: &BytesStart) -> Result<Option<String>> {
        let mut main_type: Option<String> = None;
        let mut sub_type = String::new();
        for attr in e.attributes() {
            let attr = attr?;
            match attr.key.as_ref() {
                b"type" => main_type = Some(attr.unescape_value()?.into_owned()),
                b"sub_type" => sub_type = attr.unescape_value()?.into_owned(),
                _ => {}
            }
        }
        // An entity without a type attribute projects as outside material.
        let Some(main_type) = main_type else {
            return Ok(None);
        };

        let label = match self.dialect {
            XmlDialect::Tei => {
                if main_type != "insult" && main_type != "threat" {
                    warn!(entity_type = %main_type, "unexpected entity type");
                }
                main_type
            }
            XmlDialect::Enamex => match translate_enamex(&main_type, &sub_type) {
                Some(translated) => translated.to_string(),
                None => {
                    warn!(
                        entity_type = %main_type,
                        sub_type = %sub_type,
                        "untranslatable entity type"
                    );
                    return Ok(None);
                }
            },
        };
        Ok(Some(format!("<{label}>")))
    }

    /// Tokenize the entity's text content and emit `B-`/`I-` labels.
    fn end_entity(&mut self) {
        let text = std::mem::take(&mut self.accumulated);
        match self.current_label.take() {
            Some(label) => {
                for (i, token) in tokenize(&text).into_iter().enumerate() {
                    let prefix = if i == 0 { "B-" } else { "I-" };
                    self.tokens.push(token);
                    self.labels.push(format!("{prefix}{label}"));
                }
            }
            None => {
                for token in tokenize(&text) {
                    self.tokens.push(token);
                    self.labels.push(OUTSIDE.to_string());
                }
            }
        }
    }

    fn end_element(&mut self, name: &[u8]) {
        if self.dialect.is_sentence(name) {
            self.flush_outside();
            // Move the finished pair into the corpus; the working buffers
            // start over empty rather than being cleared in place.
            let tokens = std::mem::take(&mut self.tokens);
            let labels = std::mem::take(&mut self.labels);
            self.corpus.push(tokens, labels);
        } else if self.dialect.is_entity(name) {
            self.end_entity();
        }
        self.accumulated.clear();
    }

    fn into_corpus(self) -> Corpus {
        self.corpus
    }
}

/// Parse a mixed-content XML document held in memory.
///
/// # Examples
/// ```
/// use scriba_core::reader::xml::{read_xml_str, XmlDialect};
///
/// let doc = r#"<TEI><p>bla <rs type="insult">CENSURED</rs> bla</p></TEI>"#;
/// let corpus = read_xml_str(doc, XmlDialect::Tei).unwrap();
/// assert_eq!(corpus.sentences[0], vec!["bla", "CENSURED", "bla"]);
/// assert_eq!(corpus.labels[0], vec!["O", "B-<insult>", "O"]);
/// ```
pub fn read_xml_str(xml: &str, dialect: XmlDialect) -> Result<Corpus> {
    let mut reader = Reader::from_str(xml);
    let mut projector = SpanProjector::new(dialect);

    loop {
        match reader.read_event()? {
            Event::Start(e) => projector.start_element(&e)?,
            Event::Empty(e) => {
                projector.start_element(&e)?;
                let name = e.name();
                projector.end_element(name.as_ref());
            }
            Event::End(e) => {
                let name = e.name();
                projector.end_element(name.as_ref());
            }
            Event::Text(t) => projector.text(&t.unescape()?),
            Event::CData(t) => {
                let bytes = t.into_inner();
                projector.text(&String::from_utf8_lossy(&bytes));
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(projector.into_corpus())
}

/// Parse a mixed-content XML corpus file.
///
/// Reads the whole document and delegates to [`read_xml_str`].
pub fn read_xml_file(path: impl AsRef<Path>, dialect: XmlDialect) -> Result<Corpus> {
    let xml = fs::read_to_string(path)?;
    read_xml_str(&xml, dialect)
}
