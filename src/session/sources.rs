//! Source element selection.

use serde::Serialize;

use crate::html::{Document, NodeId, SelectorList};

use super::ActionError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceElement {
    #[serde(skip)]
    pub node: NodeId,
    /// `source-<n>`, 1-based in document order.
    pub id: String,
    /// Whitespace-collapsed text, shortened for display.
    pub label: String,
}

const LABEL_CHARS: usize = 60;

fn short_label(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= LABEL_CHARS {
        return collapsed;
    }
    let mut label: String = collapsed.chars().take(LABEL_CHARS - 1).collect();
    label.push('…');
    label
}

pub fn source_id(number: usize) -> String {
    format!("source-{number}")
}

/// Parse a sources selector, mapping failures to an alert-ready error.
///
/// # Errors
///
/// [`ActionError::NoSourcesSelector`] for an empty selector and
/// [`ActionError::Selector`] for a malformed one.
pub fn parse_sources_selector(selector: &str) -> Result<SelectorList, ActionError> {
    let selector = selector.trim();
    if selector.is_empty() {
        return Err(ActionError::NoSourcesSelector);
    }
    SelectorList::parse(selector).map_err(|source| ActionError::Selector {
        selector: selector.to_string(),
        source,
    })
}

/// Every element matching `selectors`, numbered in document order.
pub fn collect_sources(doc: &Document, selectors: &SelectorList) -> Vec<SourceElement> {
    doc.select(selectors)
        .into_iter()
        .enumerate()
        .map(|(index, node)| SourceElement {
            node,
            id: source_id(index + 1),
            label: short_label(&doc.text_content(node)),
        })
        .collect()
}

/// A compound selector naming `node`: `tag#id.class1.class2`.
pub fn selector_for_element(doc: &Document, node: NodeId) -> Option<String> {
    let el = doc.element(node)?;
    let mut selector = el.name.clone();
    if let Some(id) = el.id() {
        selector.push('#');
        selector.push_str(&escape_ident(id));
    }
    for class in el.classes() {
        selector.push('.');
        selector.push_str(&escape_ident(class));
    }
    Some(selector)
}

/// Selectors for all `nodes`, joined into one list.
pub fn selector_for_elements(doc: &Document, nodes: &[NodeId]) -> String {
    let mut parts: Vec<String> = Vec::new();
    for selector in nodes.iter().filter_map(|node| selector_for_element(doc, *node)) {
        if !parts.contains(&selector) {
            parts.push(selector);
        }
    }
    parts.join(", ")
}

/// A selector matching exactly `node`: `tag#id` when the element or an
/// ancestor has an id, otherwise a `>` chain of `:nth-child` steps from the
/// top-level element.
pub fn unique_selector_for_element(doc: &Document, node: NodeId) -> Option<String> {
    let mut steps = Vec::new();
    let mut current = node;
    loop {
        let el = doc.element(current)?;
        if let Some(id) = el.id().filter(|id| !id.is_empty()) {
            steps.push(format!("{}#{}", el.name, escape_ident(id)));
            break;
        }
        let index = doc.element_index(current)?;
        steps.push(format!("{}:nth-child({index})", el.name));
        match doc.parent(current) {
            Some(parent) if doc.element(parent).is_some() => current = parent,
            _ => break,
        }
    }
    steps.reverse();
    Some(steps.join(" > "))
}

fn escape_ident(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len());
    for (i, ch) in ident.chars().enumerate() {
        let plain = ch.is_alphanumeric() || ch == '-' || ch == '_' || !ch.is_ascii();
        if !plain || (i == 0 && ch.is_ascii_digit()) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<h2>Quellen</h2><ol id="refs" class="bib list"><li>Müller 2019</li><li class="web">Example, https://example.org</li></ol>"#;

    #[test]
    fn test_collect_sources_numbers_in_document_order() {
        let doc = Document::parse(PAGE).unwrap();
        let list = parse_sources_selector("ol#refs > li").unwrap();
        let sources = collect_sources(&doc, &list);
        let ids: Vec<_> = sources.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["source-1", "source-2"]);
        assert_eq!(sources[0].label, "Müller 2019");
    }

    #[test]
    fn test_empty_and_invalid_selectors() {
        assert!(matches!(
            parse_sources_selector("  "),
            Err(ActionError::NoSourcesSelector)
        ));
        assert!(matches!(
            parse_sources_selector("li["),
            Err(ActionError::Selector { .. })
        ));
    }

    #[test]
    fn test_selector_for_element_round_trips() {
        let doc = Document::parse(PAGE).unwrap();
        let ol = doc.elements_by_tag("ol").next().unwrap();
        let web = doc.elements_by_tag("li").nth(1).unwrap();
        let selector = selector_for_elements(&doc, &[ol, web, web]);
        assert_eq!(selector, "ol#refs.bib.list, li.web");

        let list = SelectorList::parse(&selector).unwrap();
        assert_eq!(doc.select(&list), vec![ol, web]);
    }

    #[test]
    fn test_selector_escapes_odd_identifiers() {
        let doc = Document::parse(r#"<p id="1st" class="a:b">x</p>"#).unwrap();
        let p = doc.elements_by_tag("p").next().unwrap();
        let selector = selector_for_element(&doc, p).unwrap();
        assert_eq!(selector, r"p#\1st.a\:b");
        let list = SelectorList::parse(&selector).unwrap();
        assert_eq!(doc.select(&list), vec![p]);
    }

    #[test]
    fn test_unique_selector_matches_only_its_element() {
        let doc = Document::parse(
            r#"<html><body><div><p>a</p><p>b</p></div><section id="s"><p>c</p></section></body></html>"#,
        )
        .unwrap();
        let paragraphs: Vec<_> = doc.elements_by_tag("p").collect();

        let second = unique_selector_for_element(&doc, paragraphs[1]).unwrap();
        assert_eq!(
            second,
            "html:nth-child(1) > body:nth-child(1) > div:nth-child(1) > p:nth-child(2)"
        );
        let list = SelectorList::parse(&second).unwrap();
        assert_eq!(doc.select(&list), vec![paragraphs[1]]);

        let third = unique_selector_for_element(&doc, paragraphs[2]).unwrap();
        assert_eq!(third, "section#s > p:nth-child(1)");
        let list = SelectorList::parse(&third).unwrap();
        assert_eq!(doc.select(&list), vec![paragraphs[2]]);
    }

    #[test]
    fn test_long_labels_are_shortened() {
        let label = short_label(&"word ".repeat(40));
        assert_eq!(label.chars().count(), LABEL_CHARS);
        assert!(label.ends_with('…'));
    }
}
