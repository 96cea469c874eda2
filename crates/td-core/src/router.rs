//! Routes and the guard in front of the protected ones.

use std::fmt;
use std::str::FromStr;

use crate::error::RouteError;
use crate::session::SessionAccess;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Root,
    Login,
    Register,
    Tasks,
    NewTask,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Root => "/",
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Tasks => "/tasks",
            Route::NewTask => "/tasks/new",
        }
    }

    /// Protected routes require a session token.
    pub fn is_protected(self) -> bool {
        matches!(self, Route::Tasks | Route::NewTask)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for Route {
    type Err = RouteError;

    /// Accepts paths with or without a trailing slash or query string.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let path = trimmed.split(['?', '#']).next().unwrap_or_default();
        let path = match path.trim_end_matches('/') {
            "" => "/",
            p => p,
        };
        match path {
            "/" => Ok(Route::Root),
            "/login" => Ok(Route::Login),
            "/register" => Ok(Route::Register),
            "/tasks" => Ok(Route::Tasks),
            "/tasks/new" => Ok(Route::NewTask),
            _ => Err(RouteError::UnknownPath(trimmed.to_string())),
        }
    }
}

/// Outcome of a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Allowed(Route),
    Redirected { from: Route, to: Route },
}

impl Navigation {
    /// The route that ends up rendered.
    pub fn destination(self) -> Route {
        match self {
            Navigation::Allowed(route) | Navigation::Redirected { to: route, .. } => route,
        }
    }

    pub fn is_allowed(self) -> bool {
        matches!(self, Navigation::Allowed(_))
    }
}

/// Decides navigations from token presence alone.
///
/// A stale or server-rejected token still passes; the server's 401 is the
/// only later enforcement point.
pub struct RouteGuard;

impl RouteGuard {
    /// Resolves `/` to `/tasks`, then redirects protected routes to `/login`
    /// when no token is present.
    pub fn check(route: Route, session: &(impl SessionAccess + ?Sized)) -> Navigation {
        let target = match route {
            Route::Root => Route::Tasks,
            other => other,
        };

        if target.is_protected() && !session.is_authenticated() {
            return Navigation::Redirected {
                from: route,
                to: Route::Login,
            };
        }

        if target == route {
            Navigation::Allowed(route)
        } else {
            Navigation::Redirected {
                from: route,
                to: target,
            }
        }
    }

    /// Parses `path` and checks it.
    ///
    /// # Errors
    /// Returns an error if `path` names no known route.
    pub fn navigate(
        path: &str,
        session: &(impl SessionAccess + ?Sized),
    ) -> Result<Navigation, RouteError> {
        Ok(Self::check(path.parse()?, session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Session;

    fn with_token(token: Option<&str>) -> Session {
        Session {
            user: None,
            token: token.map(str::to_string),
        }
    }

    #[test]
    fn test_protected_route_redirects_without_token() {
        let nav = RouteGuard::check(Route::Tasks, &with_token(None));
        assert_eq!(
            nav,
            Navigation::Redirected {
                from: Route::Tasks,
                to: Route::Login
            }
        );
        assert!(!nav.is_allowed());
    }

    #[test]
    fn test_any_token_string_is_allowed() {
        for token in ["tok1", "expired-or-garbage"] {
            let nav = RouteGuard::check(Route::NewTask, &with_token(Some(token)));
            assert_eq!(nav, Navigation::Allowed(Route::NewTask));
        }
    }

    #[test]
    fn test_root_goes_to_tasks_or_login() {
        assert_eq!(
            RouteGuard::check(Route::Root, &with_token(Some("t"))).destination(),
            Route::Tasks
        );
        assert_eq!(
            RouteGuard::check(Route::Root, &with_token(None)).destination(),
            Route::Login
        );
    }

    #[test]
    fn test_public_routes_always_allowed() {
        for route in [Route::Login, Route::Register] {
            assert_eq!(
                RouteGuard::check(route, &with_token(None)),
                Navigation::Allowed(route)
            );
        }
    }

    #[test]
    fn test_parse_paths() {
        assert_eq!("/tasks/".parse::<Route>(), Ok(Route::Tasks));
        assert_eq!("/tasks/new?x=1".parse::<Route>(), Ok(Route::NewTask));
        assert_eq!("".parse::<Route>(), Ok(Route::Root));
        assert_eq!(
            "/settings".parse::<Route>(),
            Err(RouteError::UnknownPath("/settings".to_string()))
        );
    }

    #[test]
    fn test_navigate_rejects_unknown_path() {
        assert!(RouteGuard::navigate("/nope", &with_token(Some("t"))).is_err());
    }
}
