use std::path::PathBuf;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use tempfile::tempdir;

use crate::editor::Direction;
use crate::session::{Action, HeadingTag, Settings};

use super::event_loop::ResizeDebouncer;
use super::{App, Message, Model, PromptKind, ToastLevel, ViewMode, update};

const REPORT: &str = "<html>\n<body>\n<h1 id=\"top\">Bericht</h1>\n<p>Wie gezeigt (1) und (2).</p>\n<ol class=\"quellen\">\n<li>Quelle A</li>\n<li>Quelle B</li>\n</ol>\n</body>\n</html>\n";

fn create_test_model() -> Model {
    Model::new(
        PathBuf::from("bericht.html"),
        REPORT.to_string(),
        Settings::default(),
        (80, 24),
    )
}

fn create_long_test_model() -> Model {
    let mut html = String::from("<h1>Lang</h1>\n");
    for i in 1..=60 {
        html.push_str(&format!("<h2>Teil {i}</h2>\n<p>Absatz {i}</p>\n"));
    }
    Model::new(PathBuf::from("lang.html"), html, Settings::default(), (80, 24))
}

fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
}

fn ctrl(c: char) -> KeyEvent {
    KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
}

fn outline_index(model: &Model, selector: &str) -> usize {
    model
        .preview
        .outline()
        .iter()
        .position(|entry| entry.selector == selector)
        .unwrap()
}

#[test]
fn test_scroll_down_updates_viewport() {
    let model = update(create_long_test_model(), Message::ScrollDown(5));
    assert_eq!(model.viewport.offset(), 5);
    let model = update(model, Message::ScrollUp(3));
    assert_eq!(model.viewport.offset(), 2);
}

#[test]
fn test_go_to_bottom_clamps_to_last_page() {
    let model = update(create_long_test_model(), Message::GoToBottom);
    let total = model.preview.line_count();
    assert_eq!(model.viewport.offset(), total - 23);
}

#[test]
fn test_action_keys_map_to_actions() {
    let model = create_test_model();
    let cases = [
        ('t', Action::GenerateToc),
        ('l', Action::SelectSources),
        ('f', Action::FindReferences),
        ('L', Action::LinkSources),
        ('a', Action::ApplyChanges),
        ('u', Action::Undo),
    ];
    for (c, action) in cases {
        assert_eq!(
            App::handle_key(key(KeyCode::Char(c)), &model),
            Some(Message::RunAction(action)),
            "key {c}"
        );
    }
    assert_eq!(App::handle_key(key(KeyCode::Char('d')), &model), Some(Message::Download));
    assert_eq!(App::handle_key(ctrl('s'), &model), Some(Message::Download));
    assert_eq!(
        App::handle_key(key(KeyCode::Char('3')), &model),
        Some(Message::ToggleTag(HeadingTag::H3))
    );
    assert_eq!(App::handle_key(key(KeyCode::Char('7')), &model), None);
}

#[test]
fn test_any_key_dismisses_alert() {
    let model = update(create_test_model(), Message::RunAction(Action::Undo));
    let alert = model.alert.clone().unwrap();
    assert!(alert.is_error);
    assert_eq!(alert.message, "Nothing to undo.");
    assert_eq!(
        App::handle_key(key(KeyCode::Char('t')), &model),
        Some(Message::DismissAlert)
    );
    let model = update(model, Message::DismissAlert);
    assert!(model.alert.is_none());
}

#[test]
fn test_generate_toc_marks_model_modified_and_undo_restores() {
    let model = update(create_test_model(), Message::RunAction(Action::GenerateToc));
    let alert = model.alert.clone().unwrap();
    assert!(!alert.is_error);
    assert!(alert.message.starts_with("Table of contents generated"));
    assert!(model.is_modified());
    assert!(model.session.content().contains("table-of-contents"));

    let model = update(model, Message::DismissAlert);
    let model = update(model, Message::RunAction(Action::Undo));
    assert!(!model.is_modified());
    assert_eq!(model.session.content(), REPORT);
}

#[test]
fn test_toggle_tag_updates_settings() {
    let model = update(create_test_model(), Message::ToggleTag(HeadingTag::H2));
    assert_eq!(
        model.session.settings().tags,
        vec![HeadingTag::H1, HeadingTag::H3]
    );
    let model = update(model, Message::ToggleTag(HeadingTag::H2));
    assert_eq!(
        model.session.settings().tags,
        vec![HeadingTag::H1, HeadingTag::H3, HeadingTag::H2]
    );
    assert!(model.active_toast().is_some());
}

#[test]
fn test_cycle_style_walks_predefined_styles() {
    let model = update(create_test_model(), Message::CycleStyle);
    assert_eq!(model.session.settings().style, "[1]");
    let model = update(model, Message::CycleStyle);
    assert_eq!(model.session.settings().style, "Quelle 1");
    let model = update(model, Message::CycleStyle);
    assert_eq!(model.session.settings().style, "(1)");
}

#[test]
fn test_prompt_edits_setting() {
    let mut model = update(create_test_model(), Message::OpenPrompt(PromptKind::Sources));
    assert_eq!(model.prompt.as_ref().unwrap().input, "");
    for c in "ol li".chars() {
        model = update(model, Message::PromptInput(c));
    }
    assert_eq!(
        App::handle_key(key(KeyCode::Char('q')), &model),
        Some(Message::PromptInput('q'))
    );
    let model = update(model, Message::PromptSubmit);
    assert!(model.prompt.is_none());
    assert_eq!(model.session.settings().sources_selector, "ol li");
}

#[test]
fn test_prompt_cancel_keeps_setting() {
    let mut model = update(create_test_model(), Message::OpenPrompt(PromptKind::Style));
    model = update(model, Message::PromptBackspace);
    model = update(model, Message::PromptCancel);
    assert_eq!(model.session.settings().style, "(1)");
}

#[test]
fn test_empty_anchor_prompt_clears_anchor() {
    let mut model = create_test_model();
    model.session.settings_mut().toc_anchor = Some("p".to_string());
    let mut model = update(model, Message::OpenPrompt(PromptKind::Anchor));
    assert_eq!(model.prompt.as_ref().unwrap().input, "p");
    model = update(model, Message::PromptBackspace);
    let model = update(model, Message::PromptSubmit);
    assert_eq!(model.session.settings().toc_anchor, None);
}

#[test]
fn test_full_workflow_links_references() {
    let mut model = create_test_model();
    model.session.settings_mut().sources_selector = "ol.quellen li".to_string();
    for action in [Action::SelectSources, Action::FindReferences, Action::LinkSources] {
        model = update(model, Message::RunAction(action));
        let alert = model.alert.clone().unwrap();
        assert!(!alert.is_error, "{action:?}: {}", alert.message);
        model = update(model, Message::DismissAlert);
    }
    assert!(model.session.content().contains("href=\"#source-1\""));
    assert!(model.session.content().contains("href=\"#source-2\""));
}

#[test]
fn test_outline_picks_become_sources_selector() {
    let mut model = update(create_test_model(), Message::ToggleOutlineFocus);
    assert!(model.outline_visible && model.outline_focused);
    let first_li = outline_index(&model, "li");
    model = update(model, Message::OutlineClick(first_li));
    model = update(model, Message::TogglePick);
    model = update(model, Message::OutlineDown);
    model = update(model, Message::TogglePick);
    assert_eq!(model.picks.len(), 2);

    let model = update(model, Message::ConfirmPicks);
    assert!(model.picks.is_empty());
    assert_eq!(model.session.settings().sources_selector, "li");
    let alert = model.alert.clone().unwrap();
    assert_eq!(alert.message, "Source elements selected. (2 found)");
    assert_eq!(model.session.sources().unwrap().len(), 2);
}

#[test]
fn test_toggle_pick_twice_unpicks() {
    let mut model = update(create_test_model(), Message::ToggleOutline);
    model = update(model, Message::TogglePick);
    assert_eq!(model.picks.len(), 1);
    model = update(model, Message::TogglePick);
    assert!(model.picks.is_empty());
}

#[test]
fn test_confirm_without_picks_warns() {
    let model = update(create_test_model(), Message::ConfirmPicks);
    assert!(model.alert.is_none());
    assert!(matches!(model.active_toast(), Some((_, ToastLevel::Warning))));
}

#[test]
fn test_anchor_from_outline_places_toc() {
    let mut model = update(create_test_model(), Message::ToggleOutlineFocus);
    let paragraph = outline_index(&model, "p");
    model = update(model, Message::OutlineClick(paragraph));
    model = update(model, Message::SetAnchorFromOutline);
    assert_eq!(
        model.session.settings().toc_anchor.as_deref(),
        Some("html:nth-child(1) > body:nth-child(1) > p:nth-child(2)")
    );

    let model = update(model, Message::RunAction(Action::GenerateToc));
    assert!(!model.alert.as_ref().unwrap().is_error);
    let content = model.session.content();
    let toc = content.find("table-of-contents").unwrap();
    assert!(content.find("Bericht").unwrap() < toc);
    assert!(toc < content.find("Wie gezeigt").unwrap());
}

#[test]
fn test_outline_focus_keys() {
    let model = update(create_test_model(), Message::ToggleOutlineFocus);
    assert_eq!(
        App::handle_key(key(KeyCode::Char(' ')), &model),
        Some(Message::TogglePick)
    );
    assert_eq!(
        App::handle_key(key(KeyCode::Char('c')), &model),
        Some(Message::ConfirmPicks)
    );
    assert_eq!(
        App::handle_key(key(KeyCode::Char('a')), &model),
        Some(Message::SetAnchorFromOutline)
    );
    // Unclaimed keys fall through to the document bindings.
    assert_eq!(
        App::handle_key(key(KeyCode::Char('t')), &model),
        Some(Message::RunAction(Action::GenerateToc))
    );
}

#[test]
fn test_outline_jump_scrolls_preview() {
    let mut model = update(create_long_test_model(), Message::ToggleOutline);
    let index = model.preview.outline().len() - 1;
    let line = model.preview.outline()[index].line;
    model = update(model, Message::OutlineClick(index));
    assert_eq!(model.outline_selected, Some(index));
    assert_eq!(
        model.viewport.offset(),
        line.min(model.preview.line_count() - 23)
    );
}

#[test]
fn test_scrolling_syncs_outline_selection() {
    let model = update(create_long_test_model(), Message::ToggleOutline);
    let model = update(model, Message::ScrollDown(30));
    let expected = model.preview.outline_index_for_line(30);
    assert_eq!(model.outline_selected, expected);
}

#[test]
fn test_toggle_view_switches_line_source() {
    let model = update(create_test_model(), Message::ToggleView);
    assert_eq!(model.view_mode, ViewMode::Source);
    assert_eq!(model.viewport.total_lines(), model.source_lines.len());
    let model = update(model, Message::ToggleView);
    assert_eq!(model.view_mode, ViewMode::Preview);
    assert_eq!(model.viewport.total_lines(), model.preview.line_count());
}

#[test]
fn test_editor_commit_replaces_content() {
    let mut model = update(create_test_model(), Message::EnterEditMode);
    assert!(model.editor_mode());
    for _ in 0..2 {
        model = update(model, Message::EditorMoveCursor(Direction::Down));
    }
    model = update(model, Message::EditorMoveEnd);
    model = update(model, Message::EditorSplitLine);
    for c in "<h2>Neu</h2".chars() {
        model = update(model, Message::EditorInsertChar(c));
    }
    model = update(model, Message::EditorCloseTag);
    assert!(model.editor_is_dirty());

    let model = update(model, Message::EditorCommit);
    assert!(!model.editor_is_dirty());
    assert!(model.session.content().contains("<h2>Neu</h2>"));
    assert!(model.session.can_undo());
    assert!(model.preview.outline().iter().any(|entry| entry.text.contains("Neu")));
}

#[test]
fn test_editor_exit_with_edits_needs_confirmation() {
    let mut model = update(create_test_model(), Message::EnterEditMode);
    model = update(model, Message::EditorInsertChar('x'));
    model = update(model, Message::ExitEditMode);
    assert!(model.editor_mode());
    assert!(model.exit_confirmed);
    let model = update(model, Message::ExitEditMode);
    assert!(!model.editor_mode());
    assert_eq!(model.session.content(), REPORT);
}

#[test]
fn test_editor_keys() {
    let model = update(create_test_model(), Message::EnterEditMode);
    assert_eq!(
        App::handle_key(key(KeyCode::Char('t')), &model),
        Some(Message::EditorInsertChar('t'))
    );
    assert_eq!(
        App::handle_key(key(KeyCode::Char('>')), &model),
        Some(Message::EditorCloseTag)
    );
    assert_eq!(App::handle_key(ctrl('s'), &model), Some(Message::EditorCommit));
    assert_eq!(App::handle_key(key(KeyCode::Esc), &model), Some(Message::ExitEditMode));
}

#[test]
fn test_quit_with_unsaved_changes_needs_confirmation() {
    let model = update(create_test_model(), Message::RunAction(Action::GenerateToc));
    let model = update(model, Message::DismissAlert);
    let model = update(model, Message::Quit);
    assert!(!model.should_quit);
    assert!(model.quit_confirmed);
    let model = update(model, Message::Quit);
    assert!(model.should_quit);
}

#[test]
fn test_quit_without_changes_is_immediate() {
    let model = update(create_test_model(), Message::Quit);
    assert!(model.should_quit);
}

#[test]
fn test_download_writes_output_and_clears_modified() {
    let dir = tempdir().unwrap();
    let mut model = update(create_test_model(), Message::RunAction(Action::GenerateToc));
    model.output_path = dir.path().join("modified.html");
    let mut watcher = None;
    App::dispatch(&mut model, &mut watcher, Message::Download);

    let written = std::fs::read_to_string(dir.path().join("modified.html")).unwrap();
    assert_eq!(written, model.session.content());
    assert!(!model.is_modified());
    assert!(matches!(model.active_toast(), Some((_, ToastLevel::Info))));
}

#[test]
fn test_download_failure_shows_error() {
    let dir = tempdir().unwrap();
    let mut model = create_test_model();
    model.output_path = dir.path().join("missing").join("modified.html");
    let mut watcher = None;
    App::dispatch(&mut model, &mut watcher, Message::Download);
    assert!(matches!(model.active_toast(), Some((_, ToastLevel::Error))));
}

#[test]
fn test_reload_reads_file_and_clears_undo() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bericht.html");
    std::fs::write(&path, REPORT).unwrap();
    let mut model = Model::new(path.clone(), REPORT.to_string(), Settings::default(), (80, 24));
    model = update(model, Message::RunAction(Action::GenerateToc));
    std::fs::write(&path, "<h1>Neu</h1>").unwrap();

    let mut watcher = None;
    App::dispatch(&mut model, &mut watcher, Message::ForceReload);
    assert_eq!(model.session.content(), "<h1>Neu</h1>");
    assert!(!model.session.can_undo());
    assert!(!model.is_modified());
}

#[test]
fn test_file_change_keeps_unsaved_work() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bericht.html");
    std::fs::write(&path, REPORT).unwrap();
    let mut model = Model::new(path.clone(), REPORT.to_string(), Settings::default(), (80, 24));
    model = update(model, Message::RunAction(Action::GenerateToc));
    let generated = model.session.content().to_string();
    std::fs::write(&path, "<h1>Neu</h1>").unwrap();

    let mut watcher = None;
    App::dispatch(&mut model, &mut watcher, Message::FileChanged);
    assert_eq!(model.session.content(), generated);
    assert!(matches!(model.active_toast(), Some((_, ToastLevel::Warning))));
}

#[test]
fn test_file_change_reloads_clean_document() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bericht.html");
    std::fs::write(&path, REPORT).unwrap();
    let mut model = Model::new(path.clone(), REPORT.to_string(), Settings::default(), (80, 24));
    std::fs::write(&path, "<p>Neu</p>").unwrap();

    let mut watcher = None;
    App::dispatch(&mut model, &mut watcher, Message::FileChanged);
    assert_eq!(model.session.content(), "<p>Neu</p>");
}

#[test]
fn test_unparseable_content_falls_back_to_raw_text() {
    let model = Model::new(
        PathBuf::from("kaputt.html"),
        "<p>offen</p>\n<div class=\"x".to_string(),
        Settings::default(),
        (80, 24),
    );
    assert!(model.parse_error.is_some());
    assert_eq!(model.preview.line_count(), 2);
    assert!(model.preview.outline().is_empty());

    let model = update(model, Message::RunAction(Action::GenerateToc));
    assert!(model.alert.unwrap().is_error);
}

#[test]
fn test_default_output_path_sits_next_to_input() {
    assert_eq!(
        super::default_output_path(std::path::Path::new("docs/bericht.html")),
        PathBuf::from("docs/modified.html")
    );
    assert_eq!(
        super::default_output_path(std::path::Path::new("bericht.html")),
        PathBuf::from("modified.html")
    );
}

#[test]
fn test_read_document_replaces_invalid_utf8() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("latin1.html");
    std::fs::write(&path, b"<p>Gr\xfc\xdfe</p>").unwrap();
    let text = super::read_document(&path).unwrap();
    assert!(text.starts_with("<p>Gr"));
    assert!(text.contains('\u{fffd}'));
}

#[test]
fn test_resize_debouncer_waits_for_quiet_period() {
    let mut debouncer = ResizeDebouncer::new(100);
    debouncer.queue(100, 40, 1_000);
    assert!(debouncer.is_pending());
    assert_eq!(debouncer.take_ready(1_050), None);
    debouncer.queue(120, 40, 1_060);
    assert_eq!(debouncer.take_ready(1_150), None);
    assert_eq!(debouncer.take_ready(1_160), Some((120, 40)));
    assert!(!debouncer.is_pending());
}

#[test]
fn test_resize_event_is_queued_not_applied() {
    let model = create_test_model();
    let mut debouncer = ResizeDebouncer::new(100);
    let msg = App::handle_event(&Event::Resize(100, 30), &model, 5, &mut debouncer);
    assert_eq!(msg, None);
    assert!(debouncer.is_pending());
}

#[test]
fn test_resize_rewraps_preview() {
    let model = create_long_test_model();
    let model = update(model, Message::Resize(120, 50));
    assert_eq!(model.viewport.width(), 120);
    assert_eq!(model.viewport.height(), 49);
}

#[test]
fn test_mouse_wheel_scrolls_document() {
    let model = create_long_test_model();
    let wheel = MouseEvent {
        kind: MouseEventKind::ScrollDown,
        column: 40,
        row: 5,
        modifiers: KeyModifiers::NONE,
    };
    assert_eq!(App::handle_mouse(wheel, &model), Some(Message::ScrollDown(3)));
}

#[test]
fn test_mouse_click_in_outline_selects_entry() {
    let model = update(create_test_model(), Message::ToggleOutline);
    let click = MouseEvent {
        kind: MouseEventKind::Up(MouseButton::Left),
        column: 3,
        row: 2,
        modifiers: KeyModifiers::NONE,
    };
    assert_eq!(App::handle_mouse(click, &model), Some(Message::OutlineClick(1)));
}

#[test]
fn test_help_keys_scroll_then_close() {
    let model = update(create_test_model(), Message::ToggleHelp);
    assert_eq!(
        App::handle_key(key(KeyCode::Char('j')), &model),
        Some(Message::HelpScrollDown(1))
    );
    assert_eq!(App::handle_key(key(KeyCode::Esc), &model), Some(Message::HideHelp));
}

#[test]
fn test_build_model_applies_startup_options() {
    let settings = Settings {
        toc_title: "Inhalt".to_string(),
        ..Settings::default()
    };
    let app = App::new(PathBuf::from("docs/bericht.html"))
        .with_settings(settings)
        .with_output_path(Some(PathBuf::from("out.html")))
        .with_outline_visible(true)
        .with_watch(true);
    let model = app.build_model(REPORT.to_string(), (100, 30));
    assert_eq!(model.output_path, PathBuf::from("out.html"));
    assert!(model.outline_visible && model.outline_focused && model.watch_enabled);
    assert_eq!(model.outline_selected, Some(0));
    assert_eq!(model.session.settings().toc_title, "Inhalt");
}
