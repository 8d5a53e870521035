use std::io::stdout;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use ratatui::DefaultTerminal;

use crate::app::model::read_document;
use crate::app::{App, Message, Model, ToastLevel, update};
use crate::watcher::FileWatcher;

pub(super) struct ResizeDebouncer {
    delay_ms: u64,
    pending: Option<(u16, u16, u64)>,
}

impl ResizeDebouncer {
    pub(super) const fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            pending: None,
        }
    }

    pub(super) const fn queue(&mut self, width: u16, height: u16, now_ms: u64) {
        self.pending = Some((width, height, now_ms));
    }

    pub(super) fn take_ready(&mut self, now_ms: u64) -> Option<(u16, u16)> {
        let (width, height, queued_at) = self.pending?;
        if now_ms.saturating_sub(queued_at) >= self.delay_ms {
            self.pending = None;
            Some((width, height))
        } else {
            None
        }
    }

    pub(super) const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl App {
    /// Run the interactive session until the user quits.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, the terminal cannot be
    /// initialized, or terminal I/O fails.
    pub fn run(&mut self) -> Result<()> {
        let _run_scope = crate::perf::scope("app.run.total");

        let content = read_document(&self.file_path)?;
        let mut terminal = ratatui::try_init()
            .context("Failed to initialize terminal (jumplink needs an interactive terminal; use --batch otherwise)")?;
        let size = terminal.size()?;

        let mut model = self.build_model(content, (size.width, size.height));
        execute!(stdout(), EnableMouseCapture)?;
        let result = Self::event_loop(&mut terminal, &mut model);

        let _ = execute!(stdout(), DisableMouseCapture);
        ratatui::restore();
        result
    }

    /// The initial model for `content` at the given terminal size.
    pub(super) fn build_model(&self, content: String, size: (u16, u16)) -> Model {
        let mut model = Model::new(
            self.file_path.clone(),
            content,
            self.settings.clone(),
            size,
        );
        if let Some(output) = &self.output_path {
            model.output_path.clone_from(output);
        }
        model.watch_enabled = self.watch_enabled;
        model.outline_visible = self.outline_visible;
        model.outline_focused = self.outline_visible;
        model
            .config_global_path
            .clone_from(&self.config_global_path);
        model.config_local_path.clone_from(&self.config_local_path);
        if model.outline_visible {
            model.refresh_document();
        }
        if let Some(err) = &model.parse_error {
            let message = format!("Showing raw text: {err}");
            model.show_toast(ToastLevel::Warning, message);
        }
        model
    }

    fn event_loop(terminal: &mut DefaultTerminal, model: &mut Model) -> Result<()> {
        let clock = Instant::now();
        let mut resize_debouncer = ResizeDebouncer::new(100);
        let mut file_watcher = Self::initial_watcher(model);
        let mut frame_idx: u64 = 0;
        let mut dirty = true;

        while !model.should_quit {
            dirty |= model.expire_toast(Instant::now());

            if let Some((width, height)) = resize_debouncer.take_ready(elapsed_ms(clock)) {
                crate::perf::log_event(
                    "event.resize.apply",
                    format!("frame={frame_idx} width={width} height={height}"),
                );
                *model = update(std::mem::take(model), Message::Resize(width, height));
                dirty = true;
            }

            let changed_on_disk = model.watch_enabled
                && file_watcher
                    .as_mut()
                    .is_some_and(FileWatcher::take_change_ready);
            if changed_on_disk {
                Self::dispatch(model, &mut file_watcher, Message::FileChanged);
                dirty = true;
            }

            let mut timeout = poll_timeout(dirty, &resize_debouncer);
            // After the first event, drain whatever else is queued so key
            // repeat bursts render once.
            while event::poll(timeout)? {
                timeout = Duration::ZERO;
                let event = event::read()?;
                let Some(msg) =
                    Self::handle_event(&event, model, elapsed_ms(clock), &mut resize_debouncer)
                else {
                    continue;
                };
                crate::perf::log_event("event.message", format!("frame={frame_idx} msg={msg:?}"));
                Self::dispatch(model, &mut file_watcher, msg);
                dirty = true;
            }

            if dirty {
                frame_idx += 1;
                Self::draw_frame(terminal, model, frame_idx)?;
                dirty = false;
            }
        }
        Ok(())
    }

    fn initial_watcher(model: &mut Model) -> Option<FileWatcher> {
        if !model.watch_enabled {
            return None;
        }
        Self::make_file_watcher(&model.file_path)
            .inspect_err(|err| {
                model.watch_enabled = false;
                model.show_toast(ToastLevel::Warning, format!("Watch unavailable: {err}"));
            })
            .ok()
    }

    fn draw_frame(terminal: &mut DefaultTerminal, model: &Model, frame_idx: u64) -> Result<()> {
        let started = Instant::now();
        terminal.draw(|frame| Self::view(model, frame))?;
        crate::perf::log_event(
            "frame.draw",
            format!(
                "frame={frame_idx} draw_ms={:.3}",
                started.elapsed().as_secs_f64() * 1000.0
            ),
        );
        Ok(())
    }

    /// Apply `msg` to the model, then run its side effects.
    pub(super) fn dispatch(
        model: &mut Model,
        file_watcher: &mut Option<FileWatcher>,
        msg: Message,
    ) {
        let side_msg = msg.clone();
        *model = update(std::mem::take(model), msg);
        Self::handle_message_side_effects(model, file_watcher, &side_msg);
    }
}

fn elapsed_ms(clock: Instant) -> u64 {
    u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Render immediately, poll fast while a resize settles, otherwise idle.
const fn poll_timeout(dirty: bool, resize_debouncer: &ResizeDebouncer) -> Duration {
    if dirty {
        Duration::ZERO
    } else if resize_debouncer.is_pending() {
        Duration::from_millis(10)
    } else {
        Duration::from_millis(250)
    }
}
