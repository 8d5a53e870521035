//! Reference marker discovery.

use serde::Serialize;

use crate::html::{Document, NodeId};

use super::style::ReferenceStyle;

/// One marker occurrence inside a text node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    pub text: String,
    pub number: usize,
    #[serde(skip)]
    pub node: NodeId,
    /// Byte range of the marker within the text node.
    #[serde(skip)]
    pub start: usize,
    #[serde(skip)]
    pub end: usize,
}

/// Scan the body's prose for markers in `style`.
///
/// Text inside `script`, `style` and existing links is skipped, so running
/// this after linking finds only markers that are still unlinked. Numbers too
/// large to represent are ignored.
pub fn collect_references(doc: &Document, style: &ReferenceStyle) -> Vec<Reference> {
    let mut references = Vec::new();
    for node in doc.text_nodes(doc.body()) {
        if doc.has_ancestor_tag(node, &["a"]) {
            continue;
        }
        let Some(text) = doc.text(node) else {
            continue;
        };
        for caps in style.pattern().captures_iter(text) {
            let (Some(whole), Some(digits)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let Ok(number) = digits.as_str().parse::<usize>() else {
                continue;
            };
            references.push(Reference {
                text: whole.as_str().to_string(),
                number,
                node,
                start: whole.start(),
                end: whole.end(),
            });
        }
    }
    references
}
