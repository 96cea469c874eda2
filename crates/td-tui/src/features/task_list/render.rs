//! Task list view.

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Row, Table, TableState};
use td_core::tasks::TaskState as StoreSnapshot;
use td_core::types::{Task, TaskStatus};
use unicode_width::UnicodeWidthStr;

use super::TaskList;
use crate::common::truncate_with_ellipsis;
use crate::render::{centered, render_panel};

const HINTS: &str =
    "j/k move · n new · s status · d delete · r refresh · i import · e export · t template · o log out · q quit";

pub fn render_task_list(frame: &mut Frame, list: &TaskList, store: &StoreSnapshot, area: Rect) {
    let [status_area, table_area, hint_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(3),
        Constraint::Length(1),
    ])
    .areas(area);

    frame.render_widget(Paragraph::new(status_line(store)), status_area);
    render_table(frame, list, &store.tasks, table_area);
    frame.render_widget(
        Paragraph::new(Line::styled(
            truncate_with_ellipsis(HINTS, hint_area.width as usize),
            Style::default().fg(Color::DarkGray),
        )),
        hint_area,
    );

    if let Some(prompt) = &list.import_prompt {
        let popup = centered(area, 60, 5);
        render_panel(frame, popup, "Import tasks from file", Color::Yellow);
        let inner = Rect::new(popup.x + 2, popup.y + 1, popup.width.saturating_sub(4), 3);
        let lines = vec![
            Line::raw(truncate_with_ellipsis(prompt.value(), inner.width as usize)),
            Line::default(),
            Line::styled(
                "Enter upload · Esc cancel",
                Style::default().fg(Color::DarkGray),
            ),
        ];
        frame.render_widget(Paragraph::new(lines), inner);
        let before: String = prompt.value().chars().take(prompt.cursor()).collect();
        let x = inner.x + (before.width() as u16).min(inner.width.saturating_sub(1));
        frame.set_cursor_position(Position::new(x, inner.y));
    }
}

fn status_line(store: &StoreSnapshot) -> Line<'static> {
    if let Some(error) = &store.error {
        return Line::styled(error.clone(), Style::default().fg(Color::Red));
    }
    if store.loading {
        return Line::styled("Loading tasks...", Style::default().fg(Color::Yellow));
    }
    let count = store.tasks.len();
    Line::from(Span::styled(
        format!("{count} task{}", if count == 1 { "" } else { "s" }),
        Style::default().fg(Color::Gray),
    ))
}

fn status_color(status: TaskStatus) -> Color {
    match status {
        TaskStatus::Pending => Color::Yellow,
        TaskStatus::InProgress => Color::Blue,
        TaskStatus::Completed => Color::Green,
    }
}

fn render_table(frame: &mut Frame, list: &TaskList, tasks: &[Task], area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Tasks ");

    if tasks.is_empty() {
        frame.render_widget(
            Paragraph::new(Line::styled(
                "No tasks yet. Press n to add one.",
                Style::default().fg(Color::DarkGray),
            ))
            .block(block),
            area,
        );
        return;
    }

    let rows = tasks.iter().map(|task| {
        Row::new(vec![
            Line::raw(task.title.clone()),
            Line::styled(
                task.status.label(),
                Style::default().fg(status_color(task.status)),
            ),
            Line::raw(task.effort.map(|e| e.to_string()).unwrap_or_default()),
            Line::raw(
                task.due_date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
            ),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Min(20),
            Constraint::Length(12),
            Constraint::Length(8),
            Constraint::Length(11),
        ],
    )
    .header(
        Row::new(vec!["Title", "Status", "Effort", "Due"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(block)
    .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
    .highlight_symbol("› ");

    let mut state = TableState::default().with_selected(Some(list.selected));
    frame.render_stateful_widget(table, area, &mut state);
}
