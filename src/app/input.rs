use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::Frame;
use ratatui::layout::Rect;

use crate::app::model::PromptKind;
use crate::app::{App, Message, Model};
use crate::editor::Direction;
use crate::session::{Action, HeadingTag};

use super::event_loop::ResizeDebouncer;

impl App {
    pub(super) fn handle_event(
        event: &Event,
        model: &Model,
        now_ms: u64,
        resize_debouncer: &mut ResizeDebouncer,
    ) -> Option<Message> {
        match event {
            Event::Key(key) => Self::handle_key(*key, model),
            Event::Mouse(mouse) => Self::handle_mouse(*mouse, model),
            Event::Resize(width, height) => {
                crate::perf::log_event(
                    "event.resize.queue",
                    format!("width={width} height={height}"),
                );
                resize_debouncer.queue(*width, *height, now_ms);
                None
            }
            _ => None,
        }
    }

    pub(super) fn handle_mouse(mouse: MouseEvent, model: &Model) -> Option<Message> {
        if model.help_visible || model.alert.is_some() || model.prompt.is_some() {
            return None;
        }
        if model.editor_mode() {
            return match mouse.kind {
                MouseEventKind::ScrollDown => Some(Message::EditorMoveCursor(Direction::Down)),
                MouseEventKind::ScrollUp => Some(Message::EditorMoveCursor(Direction::Up)),
                _ => None,
            };
        }

        if model.outline_visible {
            let area = total_area(model);
            let outline_area = crate::ui::split_main_columns(area)[0];
            if point_in_rect(mouse.column, mouse.row, outline_area) {
                return match mouse.kind {
                    MouseEventKind::Up(MouseButton::Left) => {
                        outline_index_for_row(model, outline_area, mouse.row)
                            .map(Message::OutlineClick)
                    }
                    MouseEventKind::ScrollDown => Some(Message::OutlineScrollDown),
                    MouseEventKind::ScrollUp => Some(Message::OutlineScrollUp),
                    _ => None,
                };
            }
        }

        match mouse.kind {
            MouseEventKind::ScrollDown => Some(Message::ScrollDown(3)),
            MouseEventKind::ScrollUp => Some(Message::ScrollUp(3)),
            _ => None,
        }
    }

    pub(super) fn handle_key(key: KeyEvent, model: &Model) -> Option<Message> {
        if model.alert.is_some() {
            return Some(Message::DismissAlert);
        }

        if model.help_visible {
            return match key.code {
                KeyCode::Char('j') | KeyCode::Down => Some(Message::HelpScrollDown(1)),
                KeyCode::Char('k') | KeyCode::Up => Some(Message::HelpScrollUp(1)),
                KeyCode::PageDown | KeyCode::Char(' ') => Some(Message::HelpScrollDown(10)),
                KeyCode::PageUp => Some(Message::HelpScrollUp(10)),
                _ => Some(Message::HideHelp),
            };
        }

        if model.prompt.is_some() {
            return match key.code {
                KeyCode::Esc => Some(Message::PromptCancel),
                KeyCode::Enter => Some(Message::PromptSubmit),
                KeyCode::Backspace => Some(Message::PromptBackspace),
                KeyCode::Char(c) if !has_control_or_alt(key) => Some(Message::PromptInput(c)),
                _ => None,
            };
        }

        if model.editor_mode() {
            return Self::handle_editor_key(key);
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if model.outline_focused && model.outline_visible {
            let outline_msg = match key.code {
                KeyCode::Char('j') | KeyCode::Down => Some(Message::OutlineDown),
                KeyCode::Char('k') | KeyCode::Up => Some(Message::OutlineUp),
                KeyCode::Enter => Some(Message::OutlineJump),
                KeyCode::Char(' ') => Some(Message::TogglePick),
                KeyCode::Char('c') if !ctrl => Some(Message::ConfirmPicks),
                KeyCode::Char('a') => Some(Message::SetAnchorFromOutline),
                KeyCode::Tab | KeyCode::Esc => Some(Message::SwitchFocus),
                _ => None,
            };
            if outline_msg.is_some() {
                return outline_msg;
            }
        }

        match key.code {
            KeyCode::Char('j') | KeyCode::Down => Some(Message::ScrollDown(1)),
            KeyCode::Char('k') | KeyCode::Up => Some(Message::ScrollUp(1)),
            KeyCode::Char(' ') | KeyCode::PageDown => Some(Message::PageDown),
            KeyCode::Char('b') | KeyCode::PageUp => Some(Message::PageUp),
            KeyCode::Char('d') if ctrl => Some(Message::HalfPageDown),
            KeyCode::Char('u') if ctrl => Some(Message::HalfPageUp),
            KeyCode::Char('g') | KeyCode::Home => Some(Message::GoToTop),
            KeyCode::Char('G') | KeyCode::End => Some(Message::GoToBottom),

            KeyCode::Char('s') if ctrl => Some(Message::Download),
            KeyCode::Char('c') if ctrl => Some(Message::Quit),
            KeyCode::Char('t') => Some(Message::RunAction(Action::GenerateToc)),
            KeyCode::Char('l') => Some(Message::RunAction(Action::SelectSources)),
            KeyCode::Char('f') => Some(Message::RunAction(Action::FindReferences)),
            KeyCode::Char('L') => Some(Message::RunAction(Action::LinkSources)),
            KeyCode::Char('a') => Some(Message::RunAction(Action::ApplyChanges)),
            KeyCode::Char('u') => Some(Message::RunAction(Action::Undo)),
            KeyCode::Char('d') => Some(Message::Download),
            KeyCode::Char(c @ '1'..='6') => {
                HeadingTag::from_level(c as u8 - b'0').map(Message::ToggleTag)
            }
            KeyCode::Char('s') => Some(Message::CycleStyle),
            KeyCode::Char('S') => Some(Message::OpenPrompt(PromptKind::Style)),
            KeyCode::Char('p') => Some(Message::OpenPrompt(PromptKind::Sources)),
            KeyCode::Char('P') => Some(Message::OpenPrompt(PromptKind::Anchor)),
            KeyCode::Char('T') => Some(Message::OpenPrompt(PromptKind::TocTitle)),

            KeyCode::Char('v') => Some(Message::ToggleView),
            KeyCode::Char('e') => Some(Message::EnterEditMode),
            KeyCode::Char('o') => Some(Message::ToggleOutline),
            KeyCode::Char('O') => Some(Message::ToggleOutlineFocus),
            KeyCode::Tab if model.outline_visible => Some(Message::SwitchFocus),

            KeyCode::Char('w') => Some(Message::ToggleWatch),
            KeyCode::Char('r') => Some(Message::ForceReload),
            KeyCode::Char('?') | KeyCode::F(1) => Some(Message::ToggleHelp),
            KeyCode::Char('q') => Some(Message::Quit),
            _ => None,
        }
    }

    fn handle_editor_key(key: KeyEvent) -> Option<Message> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('s') if ctrl => Some(Message::EditorCommit),
            KeyCode::Char('q') if ctrl => Some(Message::Quit),
            KeyCode::Esc => Some(Message::ExitEditMode),
            KeyCode::Char('>') => Some(Message::EditorCloseTag),
            KeyCode::Char(c) if !has_control_or_alt(key) => Some(Message::EditorInsertChar(c)),
            KeyCode::Tab => Some(Message::EditorIndent),
            KeyCode::Enter => Some(Message::EditorSplitLine),
            KeyCode::Backspace => Some(Message::EditorDeleteBack),
            KeyCode::Delete => Some(Message::EditorDeleteForward),
            KeyCode::Left => Some(Message::EditorMoveCursor(Direction::Left)),
            KeyCode::Right => Some(Message::EditorMoveCursor(Direction::Right)),
            KeyCode::Up => Some(Message::EditorMoveCursor(Direction::Up)),
            KeyCode::Down => Some(Message::EditorMoveCursor(Direction::Down)),
            KeyCode::Home => Some(Message::EditorMoveHome),
            KeyCode::End => Some(Message::EditorMoveEnd),
            KeyCode::PageUp => Some(Message::EditorPageUp),
            KeyCode::PageDown => Some(Message::EditorPageDown),
            _ => None,
        }
    }

    pub(super) fn view(model: &Model, frame: &mut Frame) {
        crate::ui::render(model, frame);
    }
}

fn has_control_or_alt(key: KeyEvent) -> bool {
    key.modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
}

fn total_area(model: &Model) -> Rect {
    Rect::new(
        0,
        0,
        model.viewport.width(),
        model.viewport.height().saturating_add(1),
    )
}

fn point_in_rect(col: u16, row: u16, rect: Rect) -> bool {
    col >= rect.x && col < rect.x + rect.width && row >= rect.y && row < rect.y + rect.height
}

/// Outline entry under a row of the bordered sidebar.
fn outline_index_for_row(model: &Model, area: Rect, row: u16) -> Option<usize> {
    if row <= area.y || row >= area.y + area.height.saturating_sub(1) {
        return None;
    }
    let entries = model.preview.outline().len();
    let inner_height = usize::from(area.height.saturating_sub(2));
    let start = model
        .outline_scroll_offset
        .min(entries.saturating_sub(inner_height));
    let index = start + usize::from(row - area.y - 1);
    (index < entries).then_some(index)
}
