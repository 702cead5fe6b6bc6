pub mod screen;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        Block, Borders, Clear, List, ListItem, ListState, Paragraph, StatefulWidget, Widget, Wrap,
    },
};
use unicode_width::UnicodeWidthStr;

use crate::app::{App, Focus, StatusKind};
use crate::format::format_duration;

const HORIZONTAL_MARGIN: u16 = 2;
const DESCRIPTION_ROWS: u16 = 2;

/// Screen regions of the tracker form.
#[derive(Debug, Clone, Copy)]
pub struct FormLayout {
    pub title: Rect,
    pub task: Rect,
    pub description: Rect,
    pub actions: Rect,
    pub running: Rect,
    pub summary: Rect,
    pub status: Rect,
}

impl FormLayout {
    pub fn new(area: Rect) -> Self {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(1)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(3),
                Constraint::Length(DESCRIPTION_ROWS + 2),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(area);

        Self {
            title: chunks[0],
            task: chunks[1],
            description: chunks[2],
            actions: chunks[3],
            running: chunks[4],
            summary: chunks[5],
            status: chunks[6],
        }
    }
}

/// Where the terminal cursor goes for the focused input, if it fits.
pub fn cursor_position(app: &App, layout: &FormLayout) -> Option<(u16, u16)> {
    let (rect, text) = match app.focus {
        Focus::Task => (layout.task, app.task_input.as_str()),
        Focus::Description => (layout.description, app.description_input.as_str()),
    };
    if rect.width < 3 || rect.height < 3 {
        return None;
    }
    let lines: Vec<&str> = text.split('\n').collect();
    let visible_rows = rect.height - 2;
    let row = (lines.len() as u16 - 1).min(visible_rows - 1);
    let last = lines.last().copied().unwrap_or_default();
    let col = (last.width() as u16).min(rect.width - 3);
    Some((rect.x + 1 + col, rect.y + 1 + row))
}

fn input_block(title: &str, focused: bool) -> Block<'_> {
    let border_style = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(title)
}

fn action_span(label: &str, enabled: bool) -> Span<'_> {
    let style = if enabled {
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::DIM)
    };
    Span::styled(label, style)
}

fn summary_item(record: &crate::record::LogRecord) -> ListItem<'_> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let italic = Style::default().add_modifier(Modifier::ITALIC);

    let mut lines = vec![Line::from(vec![
        Span::styled(record.task.as_str(), bold),
        Span::raw(format!(" ({})", record.duration)),
    ])];
    if !record.description.is_empty() {
        lines.extend(
            record
                .description
                .lines()
                .map(|l| Line::from(Span::styled(l, italic))),
        );
    }
    lines.push(Line::from(format!("{} - {}", record.start, record.end)));
    lines.push(Line::default());
    ListItem::new(lines)
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let layout = FormLayout::new(area);
        let tracker = &self.tracker;

        Paragraph::new(Span::styled(
            "Time Tracker",
            Style::default().add_modifier(Modifier::BOLD),
        ))
        .render(layout.title, buf);

        let task_placeholder = self.task_input.is_empty();
        Paragraph::new(if task_placeholder {
            Span::styled("Commessa", Style::default().fg(Color::DarkGray))
        } else {
            Span::raw(self.task_input.as_str())
        })
        .block(input_block("Commessa", self.focus == Focus::Task))
        .render(layout.task, buf);

        let description_lines = self.description_input.split('\n').count() as u16;
        let scroll = description_lines.saturating_sub(DESCRIPTION_ROWS);
        Paragraph::new(if self.description_input.is_empty() {
            vec![Line::from(Span::styled(
                "Descrizione",
                Style::default().fg(Color::DarkGray),
            ))]
        } else {
            self.description_input.split('\n').map(Line::from).collect()
        })
        .scroll((scroll, 0))
        .block(input_block("Descrizione", self.focus == Focus::Description))
        .render(layout.description, buf);

        Paragraph::new(Line::from(vec![
            action_span("[^S] Start", self.can_start()),
            Span::raw("  "),
            action_span("[^X] Stop", tracker.can_stop()),
            Span::raw("  "),
            action_span("[^E] Esporta CSV", tracker.can_export()),
            Span::raw("  "),
            action_span("[^D] Cancella Tutto", tracker.can_clear()),
        ]))
        .render(layout.actions, buf);

        if let Some(active) = tracker.active() {
            Paragraph::new(Span::styled(
                format!(
                    "⏱️ In corso: {} - {}",
                    active.task_name,
                    format_duration(tracker.elapsed())
                ),
                Style::default().fg(Color::Green),
            ))
            .render(layout.running, buf);
        }

        let summary_block = Block::default().borders(Borders::ALL).title("Riepilogo");
        let inner = summary_block.inner(layout.summary);
        summary_block.render(layout.summary, buf);

        if tracker.log().is_empty() {
            Paragraph::new("Nessuna attività registrata.").render(inner, buf);
        } else {
            let parts = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(1)])
                .split(inner);

            let items: Vec<ListItem> = tracker.log().records().iter().map(summary_item).collect();
            let mut state = ListState::default().with_offset(self.summary_offset);
            StatefulWidget::render(List::new(items), parts[0], buf, &mut state);

            Paragraph::new(Span::styled(
                format!("Totale: {}", format_duration(tracker.total_seconds())),
                Style::default().add_modifier(Modifier::BOLD),
            ))
            .render(parts[1], buf);
        }

        let status = match &self.status {
            Some(status) => {
                let color = match status.kind {
                    StatusKind::Info => Color::Blue,
                    StatusKind::Error => Color::Red,
                };
                Span::styled(status.text.as_str(), Style::default().fg(color))
            }
            None => Span::styled(
                "[Tab] campo  [Invio] start  [↑↓ PgSu PgGiù] scorri  [Esc] esci",
                Style::default().add_modifier(Modifier::DIM),
            ),
        };
        Paragraph::new(status).render(layout.status, buf);
    }
}

/// Confirmation dialog drawn over the form before clearing the log.
pub struct ConfirmClearDialog;

impl Widget for ConfirmClearDialog {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let rect = centered_rect(50, 7, area);
        Clear.render(rect, buf);
        Paragraph::new(vec![
            Line::from("Sei sicuro di voler cancellare tutti i log?"),
            Line::default(),
            Line::from(vec![
                Span::styled("[s] Sì", Style::default().fg(Color::Red)),
                Span::raw("   "),
                Span::raw("[n] No"),
            ]),
        ])
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red))
                .title("Conferma"),
        )
        .render(rect, buf);
    }
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
