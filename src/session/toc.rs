//! Table of contents generation.

use serde::Serialize;
use tracing::debug;

use crate::html::{Document, NodeId, SelectorList};

use super::{ActionError, HeadingTag};

pub const TOC_ID: &str = "table-of-contents";
pub const DEFAULT_TOC_TITLE: &str = "Inhaltsverzeichnis";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    pub tag: HeadingTag,
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy)]
pub struct TocOptions<'a> {
    pub tags: &'a [HeadingTag],
    pub title: &'a str,
    pub anchor: Option<&'a str>,
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Insert a fresh table of contents into `doc`, replacing any previous one.
///
/// Headings are grouped by tag in the order the tags were selected, and by
/// document order within a tag. Each heading gets the id `<tag>-<index>`.
///
/// # Errors
///
/// Fails without touching `doc` when no tag is selected, no heading matches,
/// or the anchor selector is invalid or matches nothing.
pub fn insert_table_of_contents(
    doc: &mut Document,
    options: TocOptions<'_>,
) -> Result<Vec<TocEntry>, ActionError> {
    if options.tags.is_empty() {
        return Err(ActionError::NoTagsSelected);
    }
    let old_toc = doc.get_element_by_id(TOC_ID);

    let mut headings: Vec<(HeadingTag, NodeId)> = Vec::new();
    for &tag in options.tags {
        headings.extend(
            doc.elements_by_tag(tag.name())
                .filter(|id| old_toc.is_none_or(|toc| !doc.has_ancestor(*id, toc)))
                .map(|id| (tag, id)),
        );
    }
    if headings.is_empty() {
        return Err(ActionError::NoHeadings {
            tags: options
                .tags
                .iter()
                .map(|tag| tag.name())
                .collect::<Vec<_>>()
                .join(", "),
        });
    }

    let anchor = match options.anchor.map(str::trim).filter(|s| !s.is_empty()) {
        Some(selector) => {
            let list = SelectorList::parse(selector).map_err(|source| ActionError::Selector {
                selector: selector.to_string(),
                source,
            })?;
            let found = doc
                .select(&list)
                .into_iter()
                .find(|id| old_toc.is_none_or(|toc| *id != toc && !doc.has_ancestor(*id, toc)))
                .ok_or_else(|| ActionError::AnchorNotFound(selector.to_string()))?;
            Some(found)
        }
        None => None,
    };

    if let Some(toc) = old_toc {
        debug!("replacing existing table of contents");
        doc.detach(toc);
    }

    let mut counters = [0usize; 6];
    let mut entries = Vec::with_capacity(headings.len());
    for (tag, node) in headings {
        let counter = &mut counters[usize::from(tag.level() - 1)];
        let id = format!("{}-{}", tag.name(), counter);
        *counter += 1;
        let text = collapse_whitespace(&doc.text_content(node));
        if let Some(el) = doc.element_mut(node) {
            el.set_attr("id", id.clone());
        }
        entries.push(TocEntry { tag, id, text });
    }

    let toc = build_toc_element(doc, options.title, &entries);
    match anchor {
        Some(anchor) => {
            let parent = doc.parent(anchor).unwrap_or_else(|| doc.root());
            doc.insert_before(parent, toc, Some(anchor));
        }
        None => {
            let (parent, before) = doc.content_start();
            doc.insert_before(parent, toc, before);
        }
    }
    Ok(entries)
}

fn build_toc_element(doc: &mut Document, title: &str, entries: &[TocEntry]) -> NodeId {
    let toc = doc.create_element_with("div", &[("id", TOC_ID)]);
    let heading = doc.create_element_with("h2", &[("style", "margin-bottom: 10px;")]);
    doc.set_text_content(heading, title);
    doc.append_child(toc, heading);

    let list = doc.create_element_with("ol", &[("style", "padding-left: 20px;")]);
    for entry in entries {
        let item = doc.create_element("li");
        let href = format!("#{}", entry.id);
        let link = doc.create_element_with("a", &[("href", href.as_str())]);
        doc.set_text_content(link, &entry.text);
        doc.append_child(item, link);
        doc.append_child(list, item);
    }
    doc.append_child(toc, list);
    toc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options<'a>(tags: &'a [HeadingTag], anchor: Option<&'a str>) -> TocOptions<'a> {
        TocOptions {
            tags,
            title: DEFAULT_TOC_TITLE,
            anchor,
        }
    }

    #[test]
    fn test_toc_groups_by_selected_tag_order() {
        let mut doc = Document::parse(
            "<body><h1>A</h1><h2>B</h2><h1>C</h1><h2>D</h2></body>",
        )
        .unwrap();
        let entries = insert_table_of_contents(
            &mut doc,
            options(&[HeadingTag::H2, HeadingTag::H1], None),
        )
        .unwrap();
        let ids: Vec<_> = entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["h2-0", "h2-1", "h1-0", "h1-1"]);
        let texts: Vec<_> = entries.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["B", "D", "A", "C"]);
    }

    #[test]
    fn test_toc_inserted_first_in_body() {
        let mut doc = Document::parse("<body><p>x</p><h1>Title  <em>one</em></h1></body>").unwrap();
        insert_table_of_contents(&mut doc, options(&[HeadingTag::H1], None)).unwrap();
        assert_eq!(
            doc.to_html(),
            concat!(
                r#"<body><div id="table-of-contents"><h2 style="margin-bottom: 10px;">Inhaltsverzeichnis</h2>"#,
                r##"<ol style="padding-left: 20px;"><li><a href="#h1-0">Title one</a></li></ol></div>"##,
                r#"<p>x</p><h1 id="h1-0">Title  <em>one</em></h1></body>"#
            )
        );
    }

    #[test]
    fn test_toc_without_body_follows_head_content() {
        let mut doc =
            Document::parse("<!DOCTYPE html><!-- x --><meta charset=\"utf-8\"><h1>A</h1>").unwrap();
        insert_table_of_contents(&mut doc, options(&[HeadingTag::H1], None)).unwrap();
        let html = doc.to_html();
        assert!(html.starts_with(r#"<!DOCTYPE html><!-- x --><meta charset="utf-8"><div id="table-of-contents">"#));
    }

    #[test]
    fn test_toc_inserted_before_anchor() {
        let mut doc =
            Document::parse(r#"<div><p>intro</p><section id="s"><h2>T</h2></section></div>"#)
                .unwrap();
        insert_table_of_contents(&mut doc, options(&[HeadingTag::H2], Some("#s"))).unwrap();
        let div = doc.elements_by_tag("div").next().unwrap();
        let children: Vec<_> = doc
            .children(div)
            .iter()
            .map(|id| doc.element(*id).and_then(|el| el.id().map(str::to_string)))
            .collect();
        assert_eq!(
            children,
            vec![None, Some(TOC_ID.to_string()), Some("s".to_string())]
        );
    }

    #[test]
    fn test_regenerating_replaces_previous_toc() {
        let mut doc = Document::parse("<body><h1>A</h1></body>").unwrap();
        insert_table_of_contents(&mut doc, options(&[HeadingTag::H1, HeadingTag::H2], None))
            .unwrap();
        let entries =
            insert_table_of_contents(&mut doc, options(&[HeadingTag::H1, HeadingTag::H2], None))
                .unwrap();
        assert_eq!(entries.len(), 1, "the toc's own h2 is not an entry");
        let tocs = doc
            .elements()
            .filter(|id| doc.element(*id).and_then(|el| el.id()) == Some(TOC_ID))
            .count();
        assert_eq!(tocs, 1);
    }

    #[test]
    fn test_errors_leave_document_untouched() {
        let input = "<body><h1>A</h1></body>";
        let mut doc = Document::parse(input).unwrap();
        assert!(matches!(
            insert_table_of_contents(&mut doc, options(&[HeadingTag::H3], None)),
            Err(ActionError::NoHeadings { .. })
        ));
        assert!(matches!(
            insert_table_of_contents(&mut doc, options(&[HeadingTag::H1], Some("#nope"))),
            Err(ActionError::AnchorNotFound(_))
        ));
        assert!(matches!(
            insert_table_of_contents(&mut doc, options(&[], None)),
            Err(ActionError::NoTagsSelected)
        ));
        assert_eq!(doc.to_html(), input);
    }
}
