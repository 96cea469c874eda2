//! Login and registration forms.

mod render;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
pub use render::render_auth_form;

use crate::common::TextField;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    Login,
    Register,
}

impl AuthMode {
    pub fn title(self) -> &'static str {
        match self {
            AuthMode::Login => "Log in",
            AuthMode::Register => "Create account",
        }
    }

    pub fn submit_label(self, submitting: bool) -> &'static str {
        match (self, submitting) {
            (AuthMode::Login, false) => "Log in",
            (AuthMode::Login, true) => "Logging in...",
            (AuthMode::Register, false) => "Register",
            (AuthMode::Register, true) => "Registering...",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthField {
    #[default]
    Email,
    Password,
}

/// What a key press on the form asks the reducer to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthAction {
    None,
    Submit { email: String, password: String },
    /// Go to the other form (login <-> register).
    SwitchMode,
    Quit,
}

#[derive(Debug, Clone)]
pub struct AuthForm {
    pub mode: AuthMode,
    pub email: TextField,
    pub password: TextField,
    pub focus: AuthField,
    pub error: Option<String>,
    pub submitting: bool,
}

impl AuthForm {
    pub fn new(mode: AuthMode) -> Self {
        Self {
            mode,
            email: TextField::default(),
            password: TextField::default(),
            focus: AuthField::Email,
            error: None,
            submitting: false,
        }
    }

    fn focused_mut(&mut self) -> &mut TextField {
        match self.focus {
            AuthField::Email => &mut self.email,
            AuthField::Password => &mut self.password,
        }
    }

    fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            AuthField::Email => AuthField::Password,
            AuthField::Password => AuthField::Email,
        };
    }

    /// Presence check only; the server decides whether credentials are valid.
    fn credentials(&self) -> Result<(String, String), String> {
        let email = self.email.value().trim();
        if email.is_empty() || self.password.value().is_empty() {
            return Err("Email and password are required.".to_string());
        }
        Ok((email.to_string(), self.password.value().to_string()))
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> AuthAction {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => return AuthAction::Quit,
            KeyCode::Char('c') if ctrl => return AuthAction::Quit,
            _ => {}
        }
        if self.submitting {
            return AuthAction::None;
        }

        match key.code {
            KeyCode::Char('r') if ctrl => AuthAction::SwitchMode,
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.toggle_focus();
                AuthAction::None
            }
            KeyCode::Enter if self.focus == AuthField::Email => {
                self.focus = AuthField::Password;
                AuthAction::None
            }
            KeyCode::Enter => match self.credentials() {
                Ok((email, password)) => AuthAction::Submit { email, password },
                Err(message) => {
                    self.error = Some(message);
                    AuthAction::None
                }
            },
            KeyCode::Char(ch) if !ctrl => {
                self.focused_mut().insert(ch);
                AuthAction::None
            }
            KeyCode::Backspace => {
                self.focused_mut().backspace();
                AuthAction::None
            }
            KeyCode::Delete => {
                self.focused_mut().delete();
                AuthAction::None
            }
            KeyCode::Left => {
                self.focused_mut().left();
                AuthAction::None
            }
            KeyCode::Right => {
                self.focused_mut().right();
                AuthAction::None
            }
            KeyCode::Home => {
                self.focused_mut().home();
                AuthAction::None
            }
            KeyCode::End => {
                self.focused_mut().end();
                AuthAction::None
            }
            _ => AuthAction::None,
        }
    }

    /// Inserts pasted text into the focused field, dropping newlines.
    pub fn paste(&mut self, text: &str) {
        if self.submitting {
            return;
        }
        let field = self.focused_mut();
        for ch in text.chars().filter(|c| !c.is_control()) {
            field.insert(ch);
        }
    }

    pub fn on_submitted(&mut self) {
        self.submitting = true;
        self.error = None;
    }

    pub fn on_failed(&mut self, message: String) {
        self.submitting = false;
        self.error = Some(message);
    }

    /// Forgets the password once it has been used or abandoned.
    pub fn reset_secret(&mut self) {
        self.submitting = false;
        self.password.clear();
    }
}
