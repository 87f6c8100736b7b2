use thiserror::Error;

/// Errors that can occur while reading and aligning annotated corpora.
#[derive(Debug, Error)]
pub enum CorpusError {
    /// A tabular record did not match the expected shape.
    #[error("malformed record at {path}:{line}: {reason}")]
    Format {
        /// Source file, or `<string>` for in-memory input.
        path: String,
        /// 1-based line number of the offending record.
        line: usize,
        /// What was wrong with the record.
        reason: String,
    },

    /// The XML engine rejected the document. The read is aborted; there is
    /// no partial-document recovery.
    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// An entity attribute could not be decoded.
    #[error("XML attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),

    /// Underlying I/O failure while reading a corpus file.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias for corpus operations.
pub type Result<T> = std::result::Result<T, CorpusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_error_carries_location() {
        let err = CorpusError::Format {
            path: "eng.train".into(),
            line: 42,
            reason: "expected 2 tab-separated fields, got 3".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("eng.train:42"));
        assert!(msg.contains("expected 2"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CorpusError>();
    }
}
