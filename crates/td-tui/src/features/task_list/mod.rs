//! Task list screen.
//!
//! Rows come straight from the task store snapshot. The screen only keeps
//! the selection and the import path prompt.

mod render;

use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use td_core::types::{RecordId, Task, TaskDraft};

pub use render::render_task_list;

use crate::common::TextField;

#[derive(Debug, Clone, PartialEq)]
pub enum ListAction {
    None,
    Refresh,
    NewTask,
    Delete(RecordId),
    /// Save the task with its status advanced by one.
    CycleStatus(RecordId, TaskDraft),
    Import(PathBuf),
    Export,
    Template,
    Logout,
    Quit,
}

#[derive(Debug, Clone, Default)]
pub struct TaskList {
    pub selected: usize,
    /// Open while the user types the path of a file to import.
    pub import_prompt: Option<TextField>,
}

impl TaskList {
    /// Keeps the selection inside the list after it shrinks.
    pub fn clamp(&mut self, len: usize) {
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    pub fn selected_task<'a>(&self, tasks: &'a [Task]) -> Option<&'a Task> {
        tasks.get(self.selected)
    }

    pub fn handle_key(&mut self, key: KeyEvent, tasks: &[Task]) -> ListAction {
        if self.import_prompt.is_some() {
            return self.handle_prompt_key(key);
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => ListAction::Quit,
            KeyCode::Char('q') | KeyCode::Esc => ListAction::Quit,
            KeyCode::Char('j') | KeyCode::Down => {
                if self.selected + 1 < tasks.len() {
                    self.selected += 1;
                }
                ListAction::None
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
                ListAction::None
            }
            KeyCode::Home | KeyCode::Char('g') => {
                self.selected = 0;
                ListAction::None
            }
            KeyCode::End | KeyCode::Char('G') => {
                self.selected = tasks.len().saturating_sub(1);
                ListAction::None
            }
            KeyCode::Char('r') => ListAction::Refresh,
            KeyCode::Char('n') => ListAction::NewTask,
            KeyCode::Char('d') | KeyCode::Delete => self
                .selected_task(tasks)
                .map_or(ListAction::None, |task| ListAction::Delete(task.id.clone())),
            KeyCode::Char('s') => self.selected_task(tasks).map_or(ListAction::None, |task| {
                let draft = TaskDraft {
                    status: task.status.next(),
                    ..TaskDraft::from(task)
                };
                ListAction::CycleStatus(task.id.clone(), draft)
            }),
            KeyCode::Char('i') => {
                self.import_prompt = Some(TextField::default());
                ListAction::None
            }
            KeyCode::Char('e') => ListAction::Export,
            KeyCode::Char('t') => ListAction::Template,
            KeyCode::Char('o') => ListAction::Logout,
            _ => ListAction::None,
        }
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) -> ListAction {
        let Some(prompt) = self.import_prompt.as_mut() else {
            return ListAction::None;
        };
        match key.code {
            KeyCode::Esc => {
                self.import_prompt = None;
                ListAction::None
            }
            KeyCode::Enter => {
                if prompt.is_blank() {
                    return ListAction::None;
                }
                let path = PathBuf::from(prompt.value().trim());
                self.import_prompt = None;
                ListAction::Import(path)
            }
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                prompt.insert(ch);
                ListAction::None
            }
            KeyCode::Backspace => {
                prompt.backspace();
                ListAction::None
            }
            KeyCode::Delete => {
                prompt.delete();
                ListAction::None
            }
            KeyCode::Left => {
                prompt.left();
                ListAction::None
            }
            KeyCode::Right => {
                prompt.right();
                ListAction::None
            }
            KeyCode::Home => {
                prompt.home();
                ListAction::None
            }
            KeyCode::End => {
                prompt.end();
                ListAction::None
            }
            _ => ListAction::None,
        }
    }

    pub fn paste(&mut self, text: &str) {
        if let Some(prompt) = self.import_prompt.as_mut() {
            for ch in text.chars().filter(|c| !c.is_control()) {
                prompt.insert(ch);
            }
        }
    }
}
