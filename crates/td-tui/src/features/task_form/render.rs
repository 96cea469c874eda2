//! New task view.

use ratatui::Frame;
use ratatui::layout::{Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use td_core::types::TaskStatus;
use unicode_width::UnicodeWidthStr;

use super::{FormField, TaskForm};
use crate::common::truncate_with_ellipsis;
use crate::render::{centered, render_panel};

const LABEL_WIDTH: u16 = 13;

pub fn render_task_form(frame: &mut Frame, form: &TaskForm, area: Rect) {
    let popup = centered(area, 64, 14);
    render_panel(frame, popup, "New task", Color::Green);

    let inner = Rect::new(
        popup.x + 2,
        popup.y + 1,
        popup.width.saturating_sub(4),
        popup.height.saturating_sub(2),
    );
    let value_width = inner.width.saturating_sub(LABEL_WIDTH) as usize;

    let mut lines: Vec<Line> = FormField::ALL
        .iter()
        .map(|&field| {
            let value = match form.text(field) {
                Some(text) => truncate_with_ellipsis(text.value(), value_width),
                None => status_picker(form.status),
            };
            field_line(field, value, form.focus == field)
        })
        .collect();

    lines.push(Line::default());
    lines.push(match &form.error {
        Some(error) => Line::styled(error.clone(), Style::default().fg(Color::Red)),
        None => Line::default(),
    });
    lines.push(Line::default());
    let button = if form.submitting { "Adding..." } else { "Add task" };
    lines.push(Line::styled(
        format!("[ {button} ]"),
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
    ));
    lines.push(Line::default());
    lines.push(Line::styled(
        "Tab field · ←/→ status · Ctrl+S save · Esc back",
        Style::default().fg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(lines), inner);

    if form.submitting {
        return;
    }
    if let Some(text) = form.text(form.focus) {
        let row = FormField::ALL
            .iter()
            .position(|&f| f == form.focus)
            .unwrap_or_default() as u16;
        let before: String = text.value().chars().take(text.cursor()).collect();
        let max = inner.width.saturating_sub(LABEL_WIDTH + 1);
        let x = inner.x + LABEL_WIDTH + (before.width() as u16).min(max);
        frame.set_cursor_position(Position::new(x, inner.y + row));
    }
}

fn status_picker(current: TaskStatus) -> String {
    TaskStatus::all()
        .iter()
        .map(|&status| {
            if status == current {
                format!("[{}]", status.label())
            } else {
                format!(" {} ", status.label())
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn field_line(field: FormField, value: String, focused: bool) -> Line<'static> {
    let label_style = if focused {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };
    Line::from(vec![
        Span::styled(
            format!("{:<width$}", field.label(), width = LABEL_WIDTH as usize),
            label_style,
        ),
        Span::raw(value),
    ])
}
