//! Pure view functions.
//!
//! Everything here takes `&AppState` and draws to a ratatui `Frame`. No
//! mutations, no effects.

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use td_core::router::Route;

use crate::common::truncate_with_ellipsis;
use crate::features::{auth, task_form, task_list};
use crate::state::{AppState, Notice};

/// Spinner frames for the footer while a request is in flight.
const SPINNER_FRAMES: &[&str] = &["◐", "◓", "◑", "◒"];

/// Renders the entire TUI.
pub fn render(app: &AppState, frame: &mut Frame) {
    let [header, body, footer] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    render_header(app, frame, header);

    match app.route {
        Route::Login => auth::render_auth_form(frame, &app.login, body),
        Route::Register => auth::render_auth_form(frame, &app.register, body),
        Route::NewTask => task_form::render_task_form(frame, &app.form, body),
        Route::Tasks | Route::Root => {
            task_list::render_task_list(frame, &app.list, &app.store, body);
        }
    }

    render_footer(app, frame, footer);
}

fn render_header(app: &AppState, frame: &mut Frame, area: Rect) {
    let mut spans = vec![
        Span::styled(
            " taskdesk ",
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(app.route.path(), Style::default().fg(Color::Gray)),
    ];

    if let Some(user) = &app.session.user {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            user.email.clone(),
            Style::default().fg(Color::Cyan),
        ));
    } else if app.session.is_authenticated() {
        spans.push(Span::styled("  signed in", Style::default().fg(Color::Cyan)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_footer(app: &AppState, frame: &mut Frame, area: Rect) {
    let width = area.width as usize;
    let line = if app.inflight.is_any_running() {
        let spinner = SPINNER_FRAMES[app.spinner_frame % SPINNER_FRAMES.len()];
        Line::styled(
            truncate_with_ellipsis(&format!("{spinner} Working..."), width),
            Style::default().fg(Color::Yellow),
        )
    } else if let Some(notice) = &app.notice {
        let color = match notice {
            Notice::Info(_) => Color::Green,
            Notice::Error(_) => Color::Red,
        };
        Line::styled(
            truncate_with_ellipsis(notice.text(), width),
            Style::default().fg(color),
        )
    } else {
        Line::default()
    };
    frame.render_widget(Paragraph::new(line), area);
}

/// Returns a `width` x `height` rectangle centered in `area`, shrunk to fit.
pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(2));
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

/// Clears the area and draws a bordered, titled panel.
pub fn render_panel(frame: &mut Frame, area: Rect, title: &str, border_color: Color) {
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(format!(" {title} "))
        .title_style(
            Style::default()
                .fg(border_color)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(block, area);
}
