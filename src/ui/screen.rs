use ratatui::Frame;

use crate::app::{App, AppState};
use crate::ui::{cursor_position, ConfirmClearDialog, FormLayout};

/// A UI Screen boundary: responsible for rendering one application state
pub trait Screen {
    fn render(&self, app: &App, f: &mut Frame);
}

/// The tracker form with the cursor placed in the focused input
pub struct TrackerScreen;

impl Screen for TrackerScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        let area = f.area();
        f.render_widget(app, area);
        if let Some(pos) = cursor_position(app, &FormLayout::new(area)) {
            f.set_cursor_position(pos);
        }
    }
}

/// The form underneath the clear confirmation dialog
pub struct ConfirmClearScreen;

impl Screen for ConfirmClearScreen {
    fn render(&self, app: &App, f: &mut Frame) {
        let area = f.area();
        f.render_widget(app, area);
        f.render_widget(ConfirmClearDialog, area);
    }
}

/// Helper to construct the appropriate screen for the current state
pub fn current_screen(state: &AppState) -> Box<dyn Screen> {
    match state {
        AppState::Tracking => Box::new(TrackerScreen),
        AppState::ConfirmClear => Box::new(ConfirmClearScreen),
    }
}
