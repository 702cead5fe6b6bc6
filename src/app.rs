use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::csv_export::{CsvQuoting, ExportError};
use crate::tracker::Tracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Task,
    Description,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppState {
    Tracking,
    ConfirmClear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub kind: StatusKind,
    pub text: String,
}

impl Status {
    fn info(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Info,
            text: text.into(),
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Error,
            text: text.into(),
        }
    }
}

/// Records skipped per PageUp/PageDown in the summary.
const SUMMARY_PAGE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Continue,
    Quit,
}

/// The widget state: the form inputs around a [`Tracker`].
#[derive(Debug)]
pub struct App {
    pub tracker: Tracker,
    pub task_input: String,
    pub description_input: String,
    pub focus: Focus,
    pub state: AppState,
    pub status: Option<Status>,
    pub export_dir: PathBuf,
    pub csv_quoting: CsvQuoting,
    /// Index of the first summary record on screen.
    pub summary_offset: usize,
}

impl App {
    pub fn new(tracker: Tracker, export_dir: PathBuf, csv_quoting: CsvQuoting) -> Self {
        let status = tracker.recovery().map(|r| {
            Status::error(format!(
                "Log illeggibile, copia salvata in {}",
                r.backup.display()
            ))
        });

        Self {
            tracker,
            task_input: String::new(),
            description_input: String::new(),
            focus: Focus::Task,
            state: AppState::Tracking,
            status,
            export_dir,
            csv_quoting,
            summary_offset: 0,
        }
    }

    pub fn can_start(&self) -> bool {
        self.tracker.can_start(&self.task_input)
    }

    pub fn start(&mut self) {
        if self
            .tracker
            .start(&self.task_input, &self.description_input)
        {
            self.status = None;
        }
    }

    /// Stops the running task and resets the form. The record takes the
    /// description as it reads now. It is kept even if saving it fails; the
    /// failure is shown in the status line.
    pub fn stop(&mut self) {
        if !self.tracker.is_running() {
            return;
        }
        match self.tracker.stop(&self.description_input) {
            Ok(_) => {
                self.status = None;
                self.summary_offset = 0;
            }
            Err(e) => self.status = Some(Status::error(format!("Salvataggio fallito: {e}"))),
        }
        self.task_input.clear();
        self.description_input.clear();
        self.focus = Focus::Task;
    }

    pub fn export(&mut self) {
        match self.tracker.export_csv(&self.export_dir, self.csv_quoting) {
            Ok(path) => {
                self.status = Some(Status::info(format!("CSV esportato: {}", path.display())))
            }
            Err(ExportError::EmptyLog) => {}
            Err(e) => self.status = Some(Status::error(format!("Esportazione fallita: {e}"))),
        }
    }

    pub fn request_clear(&mut self) {
        if self.tracker.can_clear() {
            self.state = AppState::ConfirmClear;
        }
    }

    pub fn confirm_clear(&mut self, confirmed: bool) {
        self.state = AppState::Tracking;
        match self.tracker.clear(confirmed) {
            Ok(true) => {
                self.summary_offset = 0;
                self.status = Some(Status::info("Log cancellati"));
            }
            Ok(false) => {}
            Err(e) => self.status = Some(Status::error(format!("Cancellazione fallita: {e}"))),
        }
    }

    /// Moves the summary window by `delta` records, keeping the newest record
    /// reachable at 0 and at least one record on screen.
    pub fn scroll_summary(&mut self, delta: isize) {
        let last = self.tracker.log().len().saturating_sub(1);
        self.summary_offset = self
            .summary_offset
            .saturating_add_signed(delta)
            .min(last);
    }

    pub fn on_tick(&mut self) {
        self.tracker.on_tick();
    }

    pub fn shutdown(&mut self) {
        self.tracker.shutdown();
    }

    fn focused_input_mut(&mut self) -> &mut String {
        match self.focus {
            Focus::Task => &mut self.task_input,
            Focus::Description => &mut self.description_input,
        }
    }

    fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Task => Focus::Description,
            Focus::Description => Focus::Task,
        };
    }

    pub fn on_key(&mut self, key: KeyEvent) -> KeyOutcome {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && key.code == KeyCode::Char('c') {
            return KeyOutcome::Quit;
        }

        match self.state {
            AppState::ConfirmClear => match key.code {
                KeyCode::Char('y' | 'Y' | 's' | 'S') => self.confirm_clear(true),
                KeyCode::Char('n' | 'N') | KeyCode::Esc => self.confirm_clear(false),
                _ => {}
            },
            AppState::Tracking => match key.code {
                KeyCode::Esc => return KeyOutcome::Quit,
                KeyCode::Tab | KeyCode::BackTab => self.toggle_focus(),
                KeyCode::Up => self.scroll_summary(-1),
                KeyCode::Down => self.scroll_summary(1),
                KeyCode::PageUp => self.scroll_summary(-(SUMMARY_PAGE as isize)),
                KeyCode::PageDown => self.scroll_summary(SUMMARY_PAGE as isize),
                KeyCode::Char('s') if ctrl => self.start(),
                KeyCode::Char('x') if ctrl => self.stop(),
                KeyCode::Char('e') if ctrl => self.export(),
                KeyCode::Char('d') if ctrl => self.request_clear(),
                KeyCode::Enter => match self.focus {
                    Focus::Task => self.start(),
                    Focus::Description => self.description_input.push('\n'),
                },
                KeyCode::Backspace => {
                    self.focused_input_mut().pop();
                }
                KeyCode::Char(c)
                    if !ctrl && !key.modifiers.contains(KeyModifiers::ALT) =>
                {
                    self.focused_input_mut().push(c);
                }
                _ => {}
            },
        }
        KeyOutcome::Continue
    }
}
