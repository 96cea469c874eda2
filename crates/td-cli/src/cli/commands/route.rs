//! Route guard inspection.

use anyhow::Result;
use td_core::AppContext;
use td_core::router::{Navigation, RouteGuard};

/// Prints where the guard sends `path` with the saved session.
pub fn show(ctx: &AppContext, path: &str) -> Result<()> {
    match RouteGuard::navigate(path, ctx.session.as_ref())? {
        Navigation::Allowed(route) => println!("{route}: allowed"),
        Navigation::Redirected { from, to } => println!("{from}: redirected to {to}"),
    }
    Ok(())
}
