use std::fmt;

use serde::Serialize;
use tracing::debug;

use super::session::{SessionManager, SessionStatus};

/// Authorization requirement attached to a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    Public,
    Authenticated,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "route", content = "id", rename_all = "snake_case")]
pub enum Route {
    Home,
    Login,
    Article(i64),
    Preferences,
    Profile,
    Admin,
}

impl Route {
    pub fn requirement(&self) -> Requirement {
        match self {
            Route::Home | Route::Login | Route::Article(_) => Requirement::Public,
            Route::Preferences | Route::Profile => Requirement::Authenticated,
            Route::Admin => Requirement::Admin,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Login => "/login".to_string(),
            Route::Article(id) => format!("/news/{}", id),
            Route::Preferences => "/preferences".to_string(),
            Route::Profile => "/profile".to_string(),
            Route::Admin => "/admin".to_string(),
        }
    }

    /// Parse a location path; trailing slashes and query strings are ignored.
    pub fn parse(path: &str) -> Option<Route> {
        let path = path.split(['?', '#']).next().unwrap_or("");
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Some(Route::Home),
            ["login"] => Some(Route::Login),
            ["news", id] => id.parse::<i64>().ok().filter(|v| *v > 0).map(Route::Article),
            ["preferences"] => Some(Route::Preferences),
            ["profile"] => Some(Route::Profile),
            ["admin"] => Some(Route::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.path()) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "to", rename_all = "snake_case")]
pub enum Decision {
    Allow,
    RedirectTo(Route),
}

/// Per-navigation authorization decision.
pub struct AccessGate;

impl AccessGate {
    /// Pure decision over a session snapshot. `Unknown` counts as not authenticated.
    pub fn decide(requirement: Requirement, session: &SessionStatus) -> Decision {
        match requirement {
            Requirement::Public => Decision::Allow,
            Requirement::Authenticated if !session.is_authenticated() => Decision::RedirectTo(Route::Login),
            Requirement::Authenticated => Decision::Allow,
            Requirement::Admin if !session.is_authenticated() => Decision::RedirectTo(Route::Login),
            // authenticated but insufficient privilege goes home, not to login
            Requirement::Admin if !session.roles.is_admin => Decision::RedirectTo(Route::Home),
            Requirement::Admin => Decision::Allow,
        }
    }

    pub fn check(route: Route, session: &SessionManager) -> Decision {
        let decision = Self::decide(route.requirement(), &session.status());
        debug!(target: "newsdesk::gate", "route={} decision={:?}", route, decision);
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{Credential, Identity, RoleFlags, SessionPhase, TokenStore};

    fn status(phase: SessionPhase, is_admin: bool) -> SessionStatus {
        SessionStatus { phase, identity: None, roles: RoleFlags { is_admin, is_superuser: false }, epoch: 1 }
    }

    #[test]
    fn decision_table() {
        let anon = status(SessionPhase::Anonymous, false);
        let unknown = status(SessionPhase::Unknown, false);
        let user = status(SessionPhase::Authenticated, false);
        let admin = status(SessionPhase::Authenticated, true);

        assert_eq!(AccessGate::decide(Requirement::Admin, &anon), Decision::RedirectTo(Route::Login));
        assert_eq!(AccessGate::decide(Requirement::Admin, &unknown), Decision::RedirectTo(Route::Login));
        assert_eq!(AccessGate::decide(Requirement::Admin, &user), Decision::RedirectTo(Route::Home));
        assert_eq!(AccessGate::decide(Requirement::Admin, &admin), Decision::Allow);
        assert_eq!(AccessGate::decide(Requirement::Authenticated, &anon), Decision::RedirectTo(Route::Login));
        assert_eq!(AccessGate::decide(Requirement::Authenticated, &user), Decision::Allow);
        assert_eq!(AccessGate::decide(Requirement::Public, &anon), Decision::Allow);
    }

    #[test]
    fn route_paths_round_trip() {
        for r in [Route::Home, Route::Login, Route::Article(42), Route::Preferences, Route::Profile, Route::Admin] {
            assert_eq!(Route::parse(&r.path()), Some(r));
        }
        assert_eq!(Route::parse("/news/12/"), Some(Route::Article(12)));
        assert_eq!(Route::parse("/admin?tab=stats"), Some(Route::Admin));
        assert_eq!(Route::parse("/news/abc"), None);
        assert_eq!(Route::parse("/news/0"), None);
        assert_eq!(Route::parse("/nowhere"), None);
    }

    #[test]
    fn check_reads_live_session() {
        let sm = SessionManager::new(TokenStore::in_memory());
        sm.start();
        assert_eq!(AccessGate::check(Route::Preferences, &sm), Decision::RedirectTo(Route::Login));
        sm.login(Identity { id: 5, username: "eva".into(), ..Default::default() }, Credential::new("a", "r").unwrap());
        assert_eq!(AccessGate::check(Route::Preferences, &sm), Decision::Allow);
        assert_eq!(AccessGate::check(Route::Admin, &sm), Decision::RedirectTo(Route::Home));
        // credential disappearing revokes access on the next check
        sm.store().clear().unwrap();
        assert_eq!(AccessGate::check(Route::Preferences, &sm), Decision::RedirectTo(Route::Login));
    }
}
