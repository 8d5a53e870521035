//! Turning reference markers into links to their sources.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::warn;

use crate::html::{Document, NodeId};

use super::references::Reference;
use super::sources::{source_id, SourceElement};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkReport {
    /// Markers replaced by links.
    pub linked: usize,
    /// Distinct source ids that received a link.
    pub targets: usize,
    /// Marker numbers with no source of that number, ascending, deduplicated.
    pub unresolved: Vec<usize>,
}

/// Replace each marker whose number has a source with
/// `<a href="#source-n">marker</a>` and give the source element its id.
///
/// Text around markers is kept as separate text nodes. `sources` and
/// `references` must come from a document identical to `doc`.
pub fn link_references(
    doc: &mut Document,
    sources: &[SourceElement],
    references: &[Reference],
) -> LinkReport {
    let by_id: HashMap<&str, &SourceElement> =
        sources.iter().map(|s| (s.id.as_str(), s)).collect();

    let mut per_node: BTreeMap<NodeId, Vec<&Reference>> = BTreeMap::new();
    let mut unresolved: Vec<usize> = Vec::new();
    let mut targets: Vec<&SourceElement> = Vec::new();
    for reference in references {
        let id = source_id(reference.number);
        match by_id.get(id.as_str()) {
            Some(source) => {
                per_node.entry(reference.node).or_default().push(reference);
                if !targets.iter().any(|t| t.id == source.id) {
                    targets.push(source);
                }
            }
            None => {
                if !unresolved.contains(&reference.number) {
                    unresolved.push(reference.number);
                }
            }
        }
    }
    unresolved.sort_unstable();

    let mut linked = 0;
    for (node, mut refs) in per_node {
        let Some(text) = doc.text(node).map(str::to_string) else {
            continue;
        };
        refs.sort_by_key(|r| r.start);
        let mut replacements = Vec::with_capacity(refs.len() * 2 + 1);
        let mut cursor = 0;
        for reference in refs {
            if reference.start < cursor || text.get(reference.start..reference.end).is_none() {
                continue;
            }
            if reference.start > cursor {
                replacements.push(doc.create_text(&text[cursor..reference.start]));
            }
            let href = format!("#{}", source_id(reference.number));
            let anchor = doc.create_element_with("a", &[("href", href.as_str())]);
            doc.set_text_content(anchor, &reference.text);
            replacements.push(anchor);
            cursor = reference.end;
            linked += 1;
        }
        if cursor < text.len() {
            replacements.push(doc.create_text(&text[cursor..]));
        }
        doc.replace_with(node, &replacements);
    }

    for source in &targets {
        if let Some(existing) = doc.get_element_by_id(&source.id) {
            if existing != source.node {
                warn!(id = %source.id, "another element already carries this id");
            }
        }
        if let Some(el) = doc.element_mut(source.node) {
            el.set_attr("id", source.id.clone());
        }
    }

    LinkReport {
        linked,
        targets: targets.len(),
        unresolved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::references::collect_references;
    use crate::session::sources::{collect_sources, parse_sources_selector};
    use crate::session::style::ReferenceStyle;

    fn link(html: &str, selector: &str, style: &str) -> (String, LinkReport) {
        let mut doc = Document::parse(html).unwrap();
        let sources = collect_sources(&doc, &parse_sources_selector(selector).unwrap());
        let style = ReferenceStyle::new(style).unwrap();
        let references = collect_references(&doc, &style);
        let report = link_references(&mut doc, &sources, &references);
        (doc.to_html(), report)
    }

    #[test]
    fn test_links_markers_and_tags_sources() {
        let (html, report) = link(
            "<p>See (2) and (1).</p><ol><li>A</li><li>B</li></ol>",
            "ol li",
            "(1)",
        );
        assert_eq!(
            html,
            concat!(
                r##"<p>See <a href="#source-2">(2)</a> and <a href="#source-1">(1)</a>.</p>"##,
                r#"<ol><li id="source-1">A</li><li id="source-2">B</li></ol>"#
            )
        );
        assert_eq!(report.linked, 2);
        assert_eq!(report.targets, 2);
        assert!(report.unresolved.is_empty());
    }

    #[test]
    fn test_unresolved_markers_stay_text() {
        let (html, report) = link("<p>[1] [7] [7]</p><div class=src>X</div>", ".src", "[1]");
        assert_eq!(
            html,
            r##"<p><a href="#source-1">[1]</a> [7] [7]</p><div class="src" id="source-1">X</div>"##
        );
        assert_eq!(report.unresolved, vec![7]);
    }

    #[test]
    fn test_existing_source_id_is_overwritten() {
        let (html, _) = link(
            r#"<p>Quelle 1</p><p id="lit" class="q">Buch</p>"#,
            "p.q",
            "Quelle 1",
        );
        assert!(html.contains(r#"<p id="source-1" class="q">Buch</p>"#), "{html}");
    }

    #[test]
    fn test_nothing_linked_without_matching_sources() {
        let (html, report) = link("<p>(3)</p><li>a</li>", "li", "(1)");
        assert_eq!(html, "<p>(3)</p><li>a</li>");
        assert_eq!(report.linked, 0);
        assert_eq!(report.unresolved, vec![3]);
    }
}
