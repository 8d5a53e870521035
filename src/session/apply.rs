//! Final pass: renumber jump links and highlight everything that was touched.

use serde::Serialize;

use crate::html::{Document, NodeId};

use super::style::ReferenceStyle;
use super::toc::TOC_ID;

pub const HIGHLIGHT_COLOR: &str = "#e0f7fa";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub renumbered: usize,
    pub highlighted: usize,
}

pub fn reference_anchor_id(number: usize) -> String {
    format!("ref-{number}")
}

fn is_jump_link(doc: &Document, id: NodeId) -> bool {
    doc.element(id)
        .is_some_and(|el| el.name == "a" && el.attr("href").is_some_and(|h| h.starts_with('#')))
}

/// Renumber every `a[href^="#"]` outside the table of contents: the n-th
/// link gets `id="ref-n"` and the text of `style` rendered with `n`. Then
/// set the highlight background on the table of contents and on every
/// element carrying an id.
pub fn apply_changes(doc: &mut Document, style: &ReferenceStyle) -> ApplyReport {
    let toc = doc.get_element_by_id(TOC_ID);
    let links: Vec<NodeId> = doc
        .elements()
        .filter(|id| is_jump_link(doc, *id))
        .filter(|id| toc.is_none_or(|toc| !doc.has_ancestor(*id, toc)))
        .collect();

    for (index, &link) in links.iter().enumerate() {
        let number = index + 1;
        if let Some(el) = doc.element_mut(link) {
            el.set_attr("id", reference_anchor_id(number));
        }
        doc.set_text_content(link, &style.render(number));
    }

    let targets: Vec<NodeId> = doc
        .elements()
        .filter(|id| doc.element(*id).and_then(|el| el.id()).is_some())
        .collect();
    for &target in &targets {
        if let Some(el) = doc.element_mut(target) {
            el.set_style_property("background-color", HIGHLIGHT_COLOR);
        }
    }

    ApplyReport {
        renumbered: links.len(),
        highlighted: targets.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renumbers_jump_links_sequentially() {
        let mut doc = Document::parse(
            r##"<p><a href="#source-4">(4)</a> <a href="https://x">web</a> <a href="#source-1">(1)</a></p>"##,
        )
        .unwrap();
        let style = ReferenceStyle::new("[1]").unwrap();
        let report = apply_changes(&mut doc, &style);
        assert_eq!(report.renumbered, 2);
        assert_eq!(
            doc.to_html(),
            concat!(
                r##"<p><a href="#source-4" id="ref-1" style="background-color: #e0f7fa;">[1]</a> "##,
                r##"<a href="https://x">web</a> "##,
                r##"<a href="#source-1" id="ref-2" style="background-color: #e0f7fa;">[2]</a></p>"##
            )
        );
    }

    #[test]
    fn test_toc_links_are_left_alone_but_toc_is_highlighted() {
        let mut doc = Document::parse(
            r##"<div id="table-of-contents"><ol><li><a href="#h1-0">Intro</a></li></ol></div><h1 id="h1-0" style="color: red">Intro</h1>"##,
        )
        .unwrap();
        let style = ReferenceStyle::new("(1)").unwrap();
        let report = apply_changes(&mut doc, &style);
        assert_eq!(report, ApplyReport { renumbered: 0, highlighted: 2 });
        let html = doc.to_html();
        assert!(html.contains(r##"<a href="#h1-0">Intro</a>"##), "{html}");
        assert!(
            html.contains(r#"<h1 id="h1-0" style="color: red; background-color: #e0f7fa;">"#),
            "{html}"
        );
        assert!(
            html.starts_with(r#"<div id="table-of-contents" style="background-color: #e0f7fa;">"#),
            "{html}"
        );
    }
}
