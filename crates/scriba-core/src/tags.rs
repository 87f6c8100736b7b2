//! # Tag Scheme Normalization
//!
//! Conversion between the GROBID field-tagging scheme and standard IOB2,
//! plus well-formedness checks and repair for BIO label sequences.

/// The outside-of-any-entity marker.
pub const OUTSIDE: &str = "O";

/// Convert a GROBID-style label to IOB2.
///
/// In the GROBID scheme an `I-` prefix opens a field and a bare bracketed
/// tag continues it, which is the opposite of the IOB2 prefixes. The rules
/// are applied in order:
///
/// 1. a tag ending in `other>` marks outside material and becomes `O`;
/// 2. `I-<x>` opens a span and becomes `B-<x>`;
/// 3. a bare `<x>` continues a span and becomes `I-<x>`;
/// 4. anything else passes through unchanged.
///
/// # Examples
/// ```
/// use scriba_core::tags::grobid_to_iob2;
///
/// assert_eq!(grobid_to_iob2("I-<title>"), "B-<title>");
/// assert_eq!(grobid_to_iob2("<title>"), "I-<title>");
/// assert_eq!(grobid_to_iob2("<other>"), "O");
/// assert_eq!(grobid_to_iob2("O"), "O");
/// ```
pub fn grobid_to_iob2(tag: &str) -> String {
    if tag.ends_with("other>") {
        OUTSIDE.to_string()
    } else if let Some(rest) = tag.strip_prefix("I-") {
        format!("B-{rest}")
    } else if tag.starts_with('<') {
        format!("I-{tag}")
    } else {
        tag.to_string()
    }
}

/// Split an IOB2 label into its prefix and entity type.
///
/// Returns `None` for `O` and for labels without a `B-`/`I-` prefix.
fn split_bio(label: &str) -> Option<(char, &str)> {
    let rest = label.strip_prefix("B-").or_else(|| label.strip_prefix("I-"))?;
    Some((label.as_bytes()[0] as char, rest))
}

/// Check the IOB2 well-formedness invariant: an `I-t` label only ever
/// follows a `B-t` or `I-t` of the same type.
pub fn is_well_formed_bio(labels: &[String]) -> bool {
    let mut prev: Option<&str> = None;
    for label in labels {
        if let Some(('I', ty)) = split_bio(label) {
            match prev {
                Some(prev_ty) if prev_ty == ty => {}
                _ => return false,
            }
        }
        prev = split_bio(label).map(|(_, ty)| ty);
    }
    true
}

/// Repair orphan continuation labels in place.
///
/// An `I-t` with no preceding `B-t`/`I-t` of the same type is rewritten to
/// `B-t`. This is the standard IOB1 to IOB2 conversion and makes any
/// reader output satisfy [`is_well_formed_bio`].
pub fn repair_bio(labels: &mut [String]) {
    let mut prev_ty: Option<String> = None;
    for label in labels.iter_mut() {
        let parsed = split_bio(label).map(|(prefix, ty)| (prefix, ty.to_string()));
        prev_ty = match parsed {
            Some(('I', ty)) => {
                if prev_ty.as_deref() != Some(ty.as_str()) {
                    *label = format!("B-{ty}");
                }
                Some(ty)
            }
            Some((_, ty)) => Some(ty),
            None => None,
        };
    }
}

/// A contiguous entity span decoded from a BIO label sequence.
///
/// `start`/`end` are token indices, end exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct EntitySpan {
    pub start: usize,
    pub end: usize,
    pub label: String,
}

/// Decode the entity spans encoded in a BIO label sequence.
///
/// A span opens at every `B-t` and extends over the following `I-t` run of
/// the same type. Orphan `I-t` labels open a span as well, so the function
/// is total over unrepaired sequences.
pub fn entity_spans(labels: &[String]) -> Vec<EntitySpan> {
    let mut spans = Vec::new();
    let mut open: Option<EntitySpan> = None;

    for (i, label) in labels.iter().enumerate() {
        match split_bio(label) {
            Some(('I', ty)) if open.as_ref().is_some_and(|s| s.label == ty) => {
                open.as_mut().unwrap().end = i + 1;
            }
            Some((_, ty)) => {
                if let Some(span) = open.take() {
                    spans.push(span);
                }
                open = Some(EntitySpan {
                    start: i,
                    end: i + 1,
                    label: ty.to_string(),
                });
            }
            None => {
                if let Some(span) = open.take() {
                    spans.push(span);
                }
            }
        }
    }
    if let Some(span) = open {
        spans.push(span);
    }
    spans
}
