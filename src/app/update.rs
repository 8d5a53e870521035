use crate::app::model::{Prompt, PromptKind, ViewMode};
use crate::app::{Model, ToastLevel};
use crate::editor::{Direction, EditorBuffer};
use crate::perf::ActionOrigin;
use crate::session::{
    next_predefined_style, selector_for_elements, unique_selector_for_element, Action, HeadingTag,
};

/// All events and actions of the application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    // Navigation
    ScrollUp(usize),
    ScrollDown(usize),
    PageUp,
    PageDown,
    HalfPageUp,
    HalfPageDown,
    GoToTop,
    GoToBottom,
    GoToLine(usize),

    // Outline
    /// Show or hide the outline sidebar
    ToggleOutline,
    /// Show the outline and focus it, or hide it
    ToggleOutlineFocus,
    /// Move focus between outline and document
    SwitchFocus,
    OutlineUp,
    OutlineDown,
    OutlineScrollUp,
    OutlineScrollDown,
    /// Scroll the document to the selected outline entry
    OutlineJump,
    /// Select an outline entry by index and jump to it
    OutlineClick(usize),
    /// Add or remove the selected element from the picks
    TogglePick,
    /// Use the picked elements as the sources selector
    ConfirmPicks,
    /// Use the selected element as the TOC anchor
    SetAnchorFromOutline,

    // Actions
    RunAction(Action),
    /// Write the content to the output file
    Download,
    ToggleTag(HeadingTag),
    CycleStyle,
    OpenPrompt(PromptKind),
    PromptInput(char),
    PromptBackspace,
    PromptSubmit,
    PromptCancel,
    DismissAlert,
    /// Switch between rendered preview and markup
    ToggleView,

    // Editor
    EnterEditMode,
    ExitEditMode,
    EditorInsertChar(char),
    EditorIndent,
    /// Type `>` and close the tag it finishes
    EditorCloseTag,
    EditorDeleteBack,
    EditorDeleteForward,
    EditorSplitLine,
    EditorMoveCursor(Direction),
    EditorMoveHome,
    EditorMoveEnd,
    EditorPageUp,
    EditorPageDown,
    /// Replace the document with the editor text
    EditorCommit,

    // File watching
    ToggleWatch,
    FileChanged,
    ForceReload,

    ToggleHelp,
    HideHelp,
    HelpScrollUp(usize),
    HelpScrollDown(usize),

    // Window
    Resize(u16, u16),
    Redraw,

    Quit,
}

/// State transitions. File system work happens in the effects that follow.
pub fn update(mut model: Model, msg: Message) -> Model {
    let should_sync_outline = matches!(
        msg,
        Message::ScrollUp(_)
            | Message::ScrollDown(_)
            | Message::PageUp
            | Message::PageDown
            | Message::HalfPageUp
            | Message::HalfPageDown
            | Message::GoToTop
            | Message::GoToBottom
            | Message::GoToLine(_)
    );
    // Confirmations only hold for the immediately following key.
    if !matches!(msg, Message::Quit | Message::EditorCommit) {
        model.quit_confirmed = false;
    }
    if !matches!(msg, Message::ExitEditMode | Message::EditorCommit) {
        model.exit_confirmed = false;
    }

    match msg {
        Message::ScrollUp(n) => model.viewport.scroll_up(n),
        Message::ScrollDown(n) => model.viewport.scroll_down(n),
        Message::PageUp => model.viewport.page_up(),
        Message::PageDown => model.viewport.page_down(),
        Message::HalfPageUp => model.viewport.half_page_up(),
        Message::HalfPageDown => model.viewport.half_page_down(),
        Message::GoToTop => model.viewport.go_to_top(),
        Message::GoToBottom => model.viewport.go_to_bottom(),
        Message::GoToLine(line) => model.viewport.go_to_line(line),

        Message::ToggleOutline => {
            model.outline_visible = !model.outline_visible;
            if !model.outline_visible {
                model.outline_focused = false;
            }
            open_outline_selection(&mut model);
            model.refresh_document();
        }
        Message::ToggleOutlineFocus => {
            model.outline_visible = !model.outline_visible;
            model.outline_focused = model.outline_visible;
            open_outline_selection(&mut model);
            model.refresh_document();
        }
        Message::SwitchFocus => {
            if model.outline_visible {
                model.outline_focused = !model.outline_focused;
            }
        }
        Message::OutlineUp => {
            if let Some(selected) = model.outline_selected {
                model.outline_selected = Some(selected.saturating_sub(1));
                model.scroll_outline_to_selection();
            }
        }
        Message::OutlineDown => {
            if let Some(selected) = model.outline_selected {
                let last = model.preview.outline().len().saturating_sub(1);
                model.outline_selected = Some((selected + 1).min(last));
                model.scroll_outline_to_selection();
            }
        }
        Message::OutlineScrollUp => {
            model.outline_scroll_offset = model.outline_scroll_offset.saturating_sub(1);
        }
        Message::OutlineScrollDown => {
            model.outline_scroll_offset =
                (model.outline_scroll_offset + 1).min(model.max_outline_scroll_offset());
        }
        Message::OutlineJump => jump_to_outline_selection(&mut model),
        Message::OutlineClick(index) => {
            if index < model.preview.outline().len() {
                model.outline_selected = Some(index);
                jump_to_outline_selection(&mut model);
            }
        }
        Message::TogglePick => {
            if let Some(entry) = selected_outline_entry(&model) {
                let node = entry.node;
                if let Some(pos) = model.picks.iter().position(|picked| *picked == node) {
                    model.picks.remove(pos);
                } else {
                    model.picks.push(node);
                }
                model.refresh_document();
            }
        }
        Message::ConfirmPicks => confirm_picks(&mut model),
        Message::SetAnchorFromOutline => set_anchor_from_outline(&mut model),

        Message::RunAction(action) => run_action(&mut model, action),
        Message::ToggleTag(tag) => {
            model.session.settings_mut().toggle_tag(tag);
            let tags = model.session.settings().tags.clone();
            let names: Vec<_> = tags.iter().map(|tag| tag.name()).collect();
            let message = if names.is_empty() {
                "No heading tags selected".to_string()
            } else {
                format!("TOC tags: {}", names.join(", "))
            };
            model.show_toast(ToastLevel::Info, message);
        }
        Message::CycleStyle => {
            let next = next_predefined_style(&model.session.settings().style);
            model.session.settings_mut().style = next.to_string();
            model.show_toast(ToastLevel::Info, format!("Source style: {next}"));
            model.refresh_document();
        }
        Message::OpenPrompt(kind) => {
            let settings = model.session.settings();
            let input = match kind {
                PromptKind::Style => settings.style.clone(),
                PromptKind::Sources => settings.sources_selector.clone(),
                PromptKind::Anchor => settings.toc_anchor.clone().unwrap_or_default(),
                PromptKind::TocTitle => settings.toc_title.clone(),
            };
            model.prompt = Some(Prompt { kind, input });
        }
        Message::PromptInput(ch) => {
            if let Some(prompt) = &mut model.prompt {
                prompt.input.push(ch);
            }
        }
        Message::PromptBackspace => {
            if let Some(prompt) = &mut model.prompt {
                prompt.input.pop();
            }
        }
        Message::PromptSubmit => {
            if let Some(prompt) = model.prompt.take() {
                submit_prompt(&mut model, prompt);
            }
        }
        Message::PromptCancel => model.prompt = None,
        Message::DismissAlert => model.alert = None,
        Message::ToggleView => {
            model.view_mode = match model.view_mode {
                ViewMode::Preview => ViewMode::Source,
                ViewMode::Source => ViewMode::Preview,
            };
            model.viewport.go_to_top();
            model.viewport.set_total_lines(model.line_count());
        }

        Message::EnterEditMode => {
            if !model.editor_mode() {
                let mut buffer = EditorBuffer::from_text(model.session.content());
                let target = editor_line_for_viewport(&model, buffer.line_count());
                buffer.move_to(target, 0);
                model.editor_scroll_offset = target;
                model.editor_buffer = Some(buffer);
            }
        }
        Message::ExitEditMode => {
            if model.editor_mode() {
                if model.editor_is_dirty() && !model.exit_confirmed {
                    model.show_toast(
                        ToastLevel::Warning,
                        "Uncommitted edits! Press Esc again to discard, or Ctrl+S to apply",
                    );
                    model.exit_confirmed = true;
                    return model;
                }
                model.editor_buffer = None;
                model.editor_scroll_offset = 0;
            }
        }
        Message::EditorInsertChar(ch) => edit(&mut model, |buffer| buffer.insert_char(ch)),
        Message::EditorIndent => edit(&mut model, EditorBuffer::insert_indent),
        Message::EditorCloseTag => edit(&mut model, EditorBuffer::close_tag),
        Message::EditorDeleteBack => edit(&mut model, |buffer| {
            buffer.delete_back();
        }),
        Message::EditorDeleteForward => edit(&mut model, |buffer| {
            buffer.delete_forward();
        }),
        Message::EditorSplitLine => edit(&mut model, EditorBuffer::split_line),
        Message::EditorMoveCursor(direction) => {
            edit(&mut model, |buffer| buffer.move_cursor(direction));
        }
        Message::EditorMoveHome => edit(&mut model, EditorBuffer::move_home),
        Message::EditorMoveEnd => edit(&mut model, EditorBuffer::move_end),
        Message::EditorPageUp | Message::EditorPageDown => {
            let lines = editor_visible_height(&model).max(1);
            let down = matches!(msg, Message::EditorPageDown);
            edit(&mut model, |buffer| buffer.move_page(lines, down));
        }
        Message::EditorCommit => commit_editor(&mut model),

        Message::ToggleWatch => model.watch_enabled = !model.watch_enabled,
        Message::ToggleHelp => {
            model.help_visible = !model.help_visible;
            model.help_scroll_offset = 0;
        }
        Message::HideHelp => model.help_visible = false,
        Message::HelpScrollUp(n) => {
            model.help_scroll_offset = model.help_scroll_offset.saturating_sub(n);
        }
        Message::HelpScrollDown(n) => {
            model.help_scroll_offset = model.help_scroll_offset.saturating_add(n);
        }
        // Handled as side effects.
        Message::Download | Message::FileChanged | Message::ForceReload | Message::Redraw => {}

        Message::Resize(width, height) => {
            model.viewport.resize(width, height.saturating_sub(1));
            model.refresh_document();
        }
        Message::Quit => {
            let unsaved = model.is_modified() || model.editor_is_dirty();
            if unsaved && !model.quit_confirmed {
                model.show_toast(
                    ToastLevel::Warning,
                    "Changes not downloaded! Press q again to quit, or d to download",
                );
                model.quit_confirmed = true;
            } else {
                model.should_quit = true;
            }
        }
    }
    if should_sync_outline && model.outline_visible {
        model.sync_outline_to_viewport();
    }
    model
}

fn open_outline_selection(model: &mut Model) {
    if model.outline_visible && model.outline_selected.is_none() {
        model.outline_selected = Some(0);
        model.sync_outline_to_viewport();
    }
}

fn selected_outline_entry(model: &Model) -> Option<&crate::preview::OutlineEntry> {
    model
        .outline_selected
        .and_then(|index| model.preview.outline().get(index))
}

fn jump_to_outline_selection(model: &mut Model) {
    let Some(line) = selected_outline_entry(model).map(|entry| entry.line) else {
        return;
    };
    if model.view_mode != ViewMode::Preview {
        model.view_mode = ViewMode::Preview;
        model.viewport.set_total_lines(model.line_count());
    }
    model.viewport.go_to_line(line);
}

fn confirm_picks(model: &mut Model) {
    if model.picks.is_empty() {
        model.show_toast(ToastLevel::Warning, "No elements picked (Space picks in the outline)");
        return;
    }
    let selector = match model.session.parse() {
        Ok(doc) => selector_for_elements(&doc, &model.picks),
        Err(err) => {
            model.show_alert(err.to_string(), true);
            return;
        }
    };
    model.session.settings_mut().sources_selector = selector;
    model.picks.clear();
    run_action(model, Action::SelectSources);
}

fn set_anchor_from_outline(model: &mut Model) {
    let Some(node) = selected_outline_entry(model).map(|entry| entry.node) else {
        return;
    };
    let selector = model
        .session
        .parse()
        .ok()
        .and_then(|doc| unique_selector_for_element(&doc, node));
    match selector {
        Some(selector) => {
            model.show_toast(ToastLevel::Info, format!("TOC anchor: {selector}"));
            model.session.settings_mut().toc_anchor = Some(selector);
            model.refresh_document();
        }
        None => model.show_toast(ToastLevel::Warning, "Cannot address this element"),
    }
}

fn run_action(model: &mut Model, action: Action) {
    let name = crate::batch::action_name(action);
    let _scope = crate::perf::scope("app.run_action").with_detail(name.clone());
    match model.session.run(action) {
        Ok(outcome) => {
            let message = outcome.to_string();
            crate::perf::log_action(ActionOrigin::Ui, &name, Ok(&message));
            model.show_alert(message, false);
        }
        Err(err) => {
            let message = err.to_string();
            crate::perf::log_action(ActionOrigin::Ui, &name, Err(&message));
            model.show_alert(message, true);
        }
    }
    model.refresh_document();
}

fn submit_prompt(model: &mut Model, prompt: Prompt) {
    let value = prompt.input.trim().to_string();
    let settings = model.session.settings_mut();
    match prompt.kind {
        PromptKind::Style => settings.style = value,
        PromptKind::Sources => settings.sources_selector = value,
        PromptKind::Anchor => settings.toc_anchor = Some(value).filter(|v| !v.is_empty()),
        PromptKind::TocTitle => settings.toc_title = value,
    }
    model.show_toast(ToastLevel::Info, format!("{} updated", prompt.kind.label()));
    model.refresh_document();
}

fn commit_editor(model: &mut Model) {
    let Some(buffer) = &model.editor_buffer else {
        return;
    };
    if !buffer.is_dirty() {
        model.show_toast(ToastLevel::Info, "No edits to apply");
        return;
    }
    let cursor = buffer.cursor();
    let text = buffer.text();
    match model.session.replace_content(text) {
        Ok(outcome) => {
            crate::perf::log_content("edit", model.session.content().len(), model.is_modified());
            let mut fresh = EditorBuffer::from_text(model.session.content());
            fresh.move_to(cursor.line, cursor.col);
            model.editor_buffer = Some(fresh);
            model.exit_confirmed = false;
            model.show_toast(ToastLevel::Info, outcome.to_string());
            model.refresh_document();
        }
        Err(err) => model.show_toast(ToastLevel::Error, err.to_string()),
    }
}

fn edit(model: &mut Model, op: impl FnOnce(&mut EditorBuffer)) {
    if let Some(buffer) = &mut model.editor_buffer {
        op(buffer);
        editor_ensure_cursor_visible(model);
    }
}

/// Source line shown when entering the editor, proportional to the scroll
/// position in the current view.
fn editor_line_for_viewport(model: &Model, source_lines: usize) -> usize {
    let offset = model.viewport.offset();
    match model.view_mode {
        ViewMode::Source => offset.min(source_lines.saturating_sub(1)),
        ViewMode::Preview => {
            let rendered = model.preview.line_count().saturating_sub(1);
            if rendered == 0 {
                0
            } else {
                offset * source_lines.saturating_sub(1) / rendered
            }
        }
    }
}

fn editor_visible_height(model: &Model) -> usize {
    usize::from(model.viewport.height().saturating_sub(1))
}

fn editor_ensure_cursor_visible(model: &mut Model) {
    let Some(buffer) = &model.editor_buffer else {
        return;
    };
    let cursor_line = buffer.cursor().line;
    let height = editor_visible_height(model);
    if height == 0 {
        model.editor_scroll_offset = cursor_line;
    } else if cursor_line < model.editor_scroll_offset {
        model.editor_scroll_offset = cursor_line;
    } else if cursor_line >= model.editor_scroll_offset + height {
        model.editor_scroll_offset = cursor_line + 1 - height;
    }
}
