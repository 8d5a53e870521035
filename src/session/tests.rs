use super::*;

const ARTICLE: &str = r#"<!DOCTYPE html>
<html><head><title>Bericht</title></head>
<body>
<h1>Bericht</h1>
<p>Erste Aussage (1) und zweite (2).</p>
<h2>Details</h2>
<p>Noch einmal (1), dann (3).</p>
<h2>Quellen</h2>
<ol class="sources"><li>Buch A</li><li>Artikel B</li></ol>
</body></html>"#;

fn session() -> Session {
    let settings = Settings {
        sources_selector: "ol.sources li".to_string(),
        ..Settings::default()
    };
    Session::new(ARTICLE, settings)
}

#[test]
fn test_failing_action_leaves_state_untouched() {
    let mut session = session();
    session.settings_mut().style = "(n)".to_string();
    assert!(matches!(
        session.find_references(),
        Err(ActionError::InvalidStyle)
    ));
    assert!(matches!(
        session.apply_changes(),
        Err(ActionError::InvalidStyle)
    ));
    assert_eq!(session.content(), ARTICLE);
    assert!(!session.can_undo());
}

#[test]
fn test_parse_error_is_reported_with_original_message() {
    let mut session = Session::new("<p>broken <a href=\"x", Settings::default());
    let err = session.generate_toc().unwrap_err();
    assert!(matches!(err, ActionError::Parse(_)));
    assert!(
        err.to_string()
            .starts_with("Error parsing HTML content. Please check the file structure.")
    );
}

#[test]
fn test_generate_toc_then_undo_restores_exact_string() {
    let mut session = session();
    let outcome = session.generate_toc().unwrap();
    let Outcome::TocGenerated { entries } = outcome else {
        panic!("unexpected outcome {outcome:?}");
    };
    let ids: Vec<_> = entries.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["h1-0", "h2-0", "h2-1"]);
    assert!(session.content().contains(r#"<div id="table-of-contents">"#));
    assert!(session.content().starts_with("<!DOCTYPE html>"));

    session.undo().unwrap();
    assert_eq!(session.content(), ARTICLE);
    assert!(matches!(session.undo(), Err(ActionError::NothingToUndo)));
}

#[test]
fn test_select_and_find_do_not_mutate() {
    let mut session = session();
    let Outcome::SourcesSelected { sources } = session.select_sources().unwrap() else {
        panic!("expected sources");
    };
    assert_eq!(sources.len(), 2);
    let Outcome::ReferencesFound { references } = session.find_references().unwrap() else {
        panic!("expected references");
    };
    let numbers: Vec<_> = references.iter().map(|r| r.number).collect();
    assert_eq!(numbers, vec![1, 2, 1, 3]);
    assert_eq!(session.content(), ARTICLE);
    assert!(!session.can_undo());
    assert_eq!(session.sources().map(<[_]>::len), Some(2));
    assert_eq!(session.references().map(<[_]>::len), Some(4));
}

#[test]
fn test_full_pipeline() {
    let mut session = session();
    session.select_sources().unwrap();
    session.find_references().unwrap();
    let Outcome::Linked(report) = session.link_sources().unwrap() else {
        panic!("expected link report");
    };
    assert_eq!(report.linked, 3);
    assert_eq!(report.unresolved, vec![3]);
    let html = session.content().to_string();
    assert!(html.contains(r##"Erste Aussage <a href="#source-1">(1)</a> und zweite <a href="#source-2">(2)</a>."##));
    assert!(html.contains(r#"<li id="source-1">Buch A</li><li id="source-2">Artikel B</li>"#));
    assert!(html.contains("dann (3)."));

    // Selections are stale now; they are not offered for the new content.
    assert!(session.sources().is_none());

    session.generate_toc().unwrap();
    let Outcome::Applied(report) = session.apply_changes().unwrap() else {
        panic!("expected apply report");
    };
    assert_eq!(report.renumbered, 3);
    let html = session.content();
    assert!(html.contains(r##"<a href="#source-1" id="ref-1" style="background-color: #e0f7fa;">(1)</a>"##));
    assert!(html.contains(r##"<a href="#source-1" id="ref-3" style="background-color: #e0f7fa;">(3)</a>"##));
    assert!(html.contains(r#"<div id="table-of-contents" style="background-color: #e0f7fa;">"#));
}

const NO_BODY: &str = "<!DOCTYPE html>
<html><head><title>Quelle 1</title></head>
<h1>Bericht</h1><p>Siehe Quelle 1.</p><ol><li>Buch</li></ol></html>";

#[test]
fn test_document_without_body_keeps_head_intact() {
    let mut session = Session::new(
        NO_BODY,
        Settings {
            style: "Quelle 1".to_string(),
            sources_selector: "ol li".to_string(),
            ..Settings::default()
        },
    );
    session.select_sources().unwrap();
    let Outcome::ReferencesFound { references } = session.find_references().unwrap() else {
        panic!("expected references");
    };
    assert_eq!(references.len(), 1);
    session.link_sources().unwrap();
    assert!(session.content().contains("<title>Quelle 1</title>"));
    assert!(session.content().contains(r##"Siehe <a href="#source-1">Quelle 1</a>."##));

    session.generate_toc().unwrap();
    let html = session.content();
    assert!(html.starts_with("<!DOCTYPE html>\n<html><head><title>Quelle 1</title></head>\n<div id=\"table-of-contents\">"));
    let doc = Document::parse(html).unwrap();
    let title = doc.elements_by_tag("title").next().unwrap();
    assert_eq!(doc.text_content(title), "Quelle 1");
}

#[test]
fn test_toc_in_fragment_goes_after_doctype() {
    let mut session = Session::new("<!DOCTYPE html><title>T</title><h1>A</h1>", Settings::default());
    session.generate_toc().unwrap();
    let html = session.content();
    assert!(html.starts_with(r#"<!DOCTYPE html><title>T</title><div id="table-of-contents">"#));
    assert!(html.ends_with(r#"</div><h1 id="h1-0">A</h1>"#));
}

#[test]
fn test_link_requires_both_selections() {
    let mut session = session();
    assert!(matches!(
        session.link_sources(),
        Err(ActionError::NothingToLink)
    ));
    session.select_sources().unwrap();
    assert!(matches!(
        session.link_sources(),
        Err(ActionError::NothingToLink)
    ));
}

#[test]
fn test_link_recomputes_stale_selections() {
    let mut session = session();
    session.select_sources().unwrap();
    session.find_references().unwrap();
    session.generate_toc().unwrap();
    assert!(session.references().is_none());

    let Outcome::Linked(report) = session.link_sources().unwrap() else {
        panic!("expected link report");
    };
    assert_eq!(report.linked, 3);
    assert!(session.content().contains(r#"<div id="table-of-contents">"#));
}

#[test]
fn test_link_without_any_resolved_reference_fails() {
    let mut session = Session::new(
        "<p>(5)</p><ul><li>only</li></ul>",
        Settings {
            sources_selector: "li".to_string(),
            ..Settings::default()
        },
    );
    session.select_sources().unwrap();
    session.find_references().unwrap();
    let err = session.link_sources().unwrap_err();
    assert!(matches!(err, ActionError::NoMatchingSources(ref n) if n == "5"));
    assert!(!session.can_undo());
}

#[test]
fn test_empty_match_sets_are_errors() {
    let mut session = Session::new("<p>nothing</p>", Settings::default());
    assert!(matches!(
        session.select_sources(),
        Err(ActionError::NoSourcesSelector)
    ));
    session.settings_mut().sources_selector = "ol li".to_string();
    assert!(matches!(
        session.select_sources(),
        Err(ActionError::NoSources(_))
    ));
    assert!(matches!(
        session.find_references(),
        Err(ActionError::NoReferences)
    ));
    assert!(matches!(
        session.generate_toc(),
        Err(ActionError::NoHeadings { .. })
    ));
    assert!(matches!(
        session.apply_changes(),
        Err(ActionError::NothingToApply)
    ));
}

#[test]
fn test_undo_is_single_step() {
    let mut session = session();
    session.generate_toc().unwrap();
    let after_toc = session.content().to_string();
    session.apply_changes().unwrap();
    session.undo().unwrap();
    assert_eq!(session.content(), after_toc);
    assert!(!session.can_undo());
}

#[test]
fn test_replace_content_validates_and_records_undo() {
    let mut session = session();
    assert!(session.replace_content("<p>unclosed <b".to_string()).is_err());
    assert_eq!(session.content(), ARTICLE);

    session.replace_content("<p>new</p>".to_string()).unwrap();
    assert_eq!(session.content(), "<p>new</p>");
    session.undo().unwrap();
    assert_eq!(session.content(), ARTICLE);
}

#[test]
fn test_load_resets_undo_and_selections() {
    let mut session = session();
    session.select_sources().unwrap();
    session.generate_toc().unwrap();
    session.load("<h1>x</h1>");
    assert!(!session.can_undo());
    assert!(session.sources().is_none());
}

#[test]
fn test_run_dispatches_actions() {
    let mut session = session();
    assert!(matches!(
        session.run(Action::GenerateToc),
        Ok(Outcome::TocGenerated { .. })
    ));
    assert!(matches!(session.run(Action::Undo), Ok(Outcome::Undone)));
}

#[test]
fn test_settings_toggle_tag_keeps_selection_order() {
    let mut settings = Settings::default();
    settings.toggle_tag(HeadingTag::H1);
    settings.toggle_tag(HeadingTag::H4);
    settings.toggle_tag(HeadingTag::H1);
    assert_eq!(
        settings.tags,
        vec![HeadingTag::H2, HeadingTag::H3, HeadingTag::H4, HeadingTag::H1]
    );
}

#[test]
fn test_heading_tag_parsing() {
    assert_eq!("H2".parse::<HeadingTag>(), Ok(HeadingTag::H2));
    assert!("h7".parse::<HeadingTag>().is_err());
    assert_eq!(HeadingTag::from_level(6), Some(HeadingTag::H6));
    assert_eq!(HeadingTag::from_level(0), None);
}

#[test]
fn test_outcome_messages() {
    let outcome = Outcome::Linked(LinkReport {
        linked: 2,
        targets: 1,
        unresolved: vec![4, 9],
    });
    assert_eq!(
        outcome.to_string(),
        "References have been linked. (2 links, unresolved: 4, 9)"
    );
    assert_eq!(
        ActionError::NoReferences.to_string(),
        "No references found matching the source style."
    );
}
