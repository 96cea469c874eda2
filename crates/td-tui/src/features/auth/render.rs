//! Auth form view.

use ratatui::Frame;
use ratatui::layout::{Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use unicode_width::UnicodeWidthStr;

use super::{AuthField, AuthForm, AuthMode};
use crate::common::{mask, truncate_with_ellipsis};
use crate::render::{centered, render_panel};

const LABEL_WIDTH: u16 = 10;

pub fn render_auth_form(frame: &mut Frame, form: &AuthForm, area: Rect) {
    let popup = centered(area, 56, 11);
    render_panel(frame, popup, form.mode.title(), Color::Cyan);

    let inner = Rect::new(
        popup.x + 2,
        popup.y + 1,
        popup.width.saturating_sub(4),
        popup.height.saturating_sub(2),
    );
    let value_width = inner.width.saturating_sub(LABEL_WIDTH) as usize;

    let email = truncate_with_ellipsis(form.email.value(), value_width);
    let password = truncate_with_ellipsis(&mask(form.password.value()), value_width);

    let switch_hint = match form.mode {
        AuthMode::Login => "Ctrl+R register",
        AuthMode::Register => "Ctrl+R log in",
    };

    let mut lines = vec![
        field_line("Email", email, form.focus == AuthField::Email),
        field_line("Password", password, form.focus == AuthField::Password),
        Line::default(),
    ];
    match &form.error {
        Some(error) => lines.push(Line::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )),
        None => lines.push(Line::default()),
    }
    lines.push(Line::default());
    lines.push(Line::styled(
        format!("[ {} ]", form.mode.submit_label(form.submitting)),
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    ));
    lines.push(Line::default());
    lines.push(Line::styled(
        format!("Tab field · Enter submit · {switch_hint} · Esc quit"),
        Style::default().fg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(lines), inner);

    if !form.submitting {
        let (row, field) = match form.focus {
            AuthField::Email => (0, &form.email),
            AuthField::Password => (1, &form.password),
        };
        let before: String = field.value().chars().take(field.cursor()).collect();
        let offset = match form.focus {
            AuthField::Email => before.width(),
            AuthField::Password => before.chars().count(),
        };
        let room = inner.width.saturating_sub(LABEL_WIDTH + 1);
        let x = inner.x + LABEL_WIDTH + (offset as u16).min(room);
        frame.set_cursor_position(Position::new(x, inner.y + row));
    }
}

fn field_line(label: &str, value: String, focused: bool) -> Line<'static> {
    let label_style = if focused {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Gray)
    };
    Line::from(vec![
        Span::styled(format!("{label:<width$}", width = LABEL_WIDTH as usize), label_style),
        Span::raw(value),
    ])
}
