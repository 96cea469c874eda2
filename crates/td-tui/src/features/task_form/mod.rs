//! Task creation form.
//!
//! Holds a local draft until submit. Validation covers the title's presence,
//! a non-negative numeric effort and a `YYYY-MM-DD` due date; everything
//! else is left to the server.

mod render;

use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use td_core::types::{TaskDraft, TaskStatus};

pub use render::render_task_form;

use crate::common::TextField;

/// Shown when the server rejects the new task.
pub const CREATE_FAILED_MESSAGE: &str = "Failed to create task.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormField {
    #[default]
    Title,
    Description,
    Effort,
    DueDate,
    Status,
}

impl FormField {
    pub const ALL: [FormField; 5] = [
        FormField::Title,
        FormField::Description,
        FormField::Effort,
        FormField::DueDate,
        FormField::Status,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FormField::Title => "Title",
            FormField::Description => "Description",
            FormField::Effort => "Effort",
            FormField::DueDate => "Due date",
            FormField::Status => "Status",
        }
    }

    fn next(self) -> Self {
        match self {
            FormField::Title => FormField::Description,
            FormField::Description => FormField::Effort,
            FormField::Effort => FormField::DueDate,
            FormField::DueDate => FormField::Status,
            FormField::Status => FormField::Title,
        }
    }

    fn prev(self) -> Self {
        match self {
            FormField::Title => FormField::Status,
            FormField::Description => FormField::Title,
            FormField::Effort => FormField::Description,
            FormField::DueDate => FormField::Effort,
            FormField::Status => FormField::DueDate,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormAction {
    None,
    Submit(TaskDraft),
    /// Back to the list without saving.
    Cancel,
}

#[derive(Debug, Clone, Default)]
pub struct TaskForm {
    pub title: TextField,
    pub description: TextField,
    pub effort: TextField,
    pub due_date: TextField,
    pub status: TaskStatus,
    pub focus: FormField,
    pub error: Option<String>,
    pub submitting: bool,
}

impl TaskForm {
    pub fn text(&self, field: FormField) -> Option<&TextField> {
        match field {
            FormField::Title => Some(&self.title),
            FormField::Description => Some(&self.description),
            FormField::Effort => Some(&self.effort),
            FormField::DueDate => Some(&self.due_date),
            FormField::Status => None,
        }
    }

    fn text_mut(&mut self, field: FormField) -> Option<&mut TextField> {
        match field {
            FormField::Title => Some(&mut self.title),
            FormField::Description => Some(&mut self.description),
            FormField::Effort => Some(&mut self.effort),
            FormField::DueDate => Some(&mut self.due_date),
            FormField::Status => None,
        }
    }

    /// Builds the draft, or explains the first problem found.
    ///
    /// # Errors
    /// Returns a displayable message if a field is invalid.
    pub fn validate(&self) -> Result<TaskDraft, String> {
        let title = self.title.value().trim();
        if title.is_empty() {
            return Err("Title is required.".to_string());
        }

        let effort = match self.effort.value().trim() {
            "" => None,
            raw => match raw.parse::<f64>() {
                Ok(value) if value.is_finite() && value >= 0.0 => Some(value),
                _ => return Err("Effort must be a non-negative number.".to_string()),
            },
        };

        let due_date = match self.due_date.value().trim() {
            "" => None,
            raw => Some(
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .map_err(|_| "Due date must be YYYY-MM-DD.".to_string())?,
            ),
        };

        Ok(TaskDraft {
            title: title.to_string(),
            description: self.description.value().to_string(),
            effort,
            due_date,
            status: self.status,
        })
    }

    fn submit(&mut self) -> FormAction {
        match self.validate() {
            Ok(draft) => FormAction::Submit(draft),
            Err(message) => {
                self.error = Some(message);
                FormAction::None
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> FormAction {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if key.code == KeyCode::Esc {
            return FormAction::Cancel;
        }
        if self.submitting {
            return FormAction::None;
        }

        match key.code {
            KeyCode::Char('s') if ctrl => self.submit(),
            KeyCode::Tab | KeyCode::Down => {
                self.focus = self.focus.next();
                FormAction::None
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.focus = self.focus.prev();
                FormAction::None
            }
            KeyCode::Enter if self.focus == FormField::Status => self.submit(),
            KeyCode::Enter => {
                self.focus = self.focus.next();
                FormAction::None
            }
            KeyCode::Left if self.focus == FormField::Status => {
                self.status = self.status.prev();
                FormAction::None
            }
            KeyCode::Right | KeyCode::Char(' ') if self.focus == FormField::Status => {
                self.status = self.status.next();
                FormAction::None
            }
            code => {
                let focus = self.focus;
                if let Some(field) = self.text_mut(focus) {
                    match code {
                        KeyCode::Char(ch) if !ctrl => field.insert(ch),
                        KeyCode::Backspace => field.backspace(),
                        KeyCode::Delete => field.delete(),
                        KeyCode::Left => field.left(),
                        KeyCode::Right => field.right(),
                        KeyCode::Home => field.home(),
                        KeyCode::End => field.end(),
                        _ => {}
                    }
                }
                FormAction::None
            }
        }
    }

    pub fn paste(&mut self, text: &str) {
        if self.submitting {
            return;
        }
        let focus = self.focus;
        if let Some(field) = self.text_mut(focus) {
            for ch in text.chars().filter(|c| !c.is_control()) {
                field.insert(ch);
            }
        }
    }

    pub fn on_submitted(&mut self) {
        self.submitting = true;
        self.error = None;
    }

    pub fn on_failed(&mut self) {
        self.submitting = false;
        self.error = Some(CREATE_FAILED_MESSAGE.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form_with(title: &str, effort: &str, due: &str) -> TaskForm {
        TaskForm {
            title: TextField::with_value(title),
            effort: TextField::with_value(effort),
            due_date: TextField::with_value(due),
            ..TaskForm::default()
        }
    }

    #[test]
    fn test_minimal_draft_defaults_to_pending_with_unset_fields() {
        let draft = form_with("T", "", "").validate().unwrap();
        assert_eq!(
            draft,
            TaskDraft {
                title: "T".to_string(),
                description: String::new(),
                effort: None,
                due_date: None,
                status: TaskStatus::Pending,
            }
        );
    }

    #[test]
    fn test_validation_messages() {
        assert_eq!(
            form_with("  ", "", "").validate().unwrap_err(),
            "Title is required."
        );
        assert!(form_with("T", "-1", "").validate().is_err());
        assert!(form_with("T", "lots", "").validate().is_err());
        assert!(form_with("T", "", "03/01/2026").validate().is_err());
    }

    #[test]
    fn test_parses_effort_and_due_date() {
        let draft = form_with("T", "2.5", "2026-03-01").validate().unwrap();
        assert_eq!(draft.effort, Some(2.5));
        assert_eq!(draft.due_date, NaiveDate::from_ymd_opt(2026, 3, 1));
    }

    #[test]
    fn test_enter_on_status_submits_and_esc_cancels() {
        let mut form = form_with("T", "", "");
        form.focus = FormField::Status;
        form.handle_key(KeyEvent::new(KeyCode::Right, KeyModifiers::NONE));
        assert_eq!(form.status, TaskStatus::InProgress);

        let action = form.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        assert!(matches!(action, FormAction::Submit(d) if d.status == TaskStatus::InProgress));

        assert_eq!(
            form.handle_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)),
            FormAction::Cancel
        );
    }

    #[test]
    fn test_invalid_submit_shows_error_and_stays() {
        let mut form = TaskForm::default();
        let action = form.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL));
        assert_eq!(action, FormAction::None);
        assert_eq!(form.error.as_deref(), Some("Title is required."));
    }
}
