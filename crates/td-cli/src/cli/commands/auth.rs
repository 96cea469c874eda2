//! Login, registration and logout.

use std::io::{self, BufRead, IsTerminal, Write};

use anyhow::{Context, Result};
use td_core::AppContext;

pub async fn login(ctx: &AppContext, email: &str, password: Option<String>) -> Result<()> {
    let password = resolve_password(password)?;
    let user = ctx
        .session
        .login(email, &password)
        .await
        .context("Login failed")?;
    println!("Logged in as {}", display_email(&user.email, email));
    Ok(())
}

pub async fn register(ctx: &AppContext, email: &str, password: Option<String>) -> Result<()> {
    let password = resolve_password(password)?;
    let user = ctx
        .session
        .register(email, &password)
        .await
        .context("Registration failed")?;
    println!("Registered and logged in as {}", display_email(&user.email, email));
    Ok(())
}

pub fn logout(ctx: &AppContext) {
    ctx.session.logout();
    println!("Logged out.");
}

/// Servers may omit the email from the user object.
fn display_email<'a>(returned: &'a str, requested: &'a str) -> &'a str {
    if returned.is_empty() { requested } else { returned }
}

/// Uses `--password` when given, otherwise reads one line from stdin.
fn resolve_password(password: Option<String>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }

    let stdin = io::stdin();
    if stdin.is_terminal() {
        eprint!("Password: ");
        io::stderr().flush()?;
    }
    let mut line = String::new();
    stdin
        .lock()
        .read_line(&mut line)
        .context("read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        anyhow::bail!("A password is required (pass --password or pipe it on stdin)");
    }
    Ok(password)
}
