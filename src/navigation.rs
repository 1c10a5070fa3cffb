//! Route tracking for the client shell. Every navigation and every session
//! transition goes back through the access gate.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info};

use crate::feed::FeedController;
use crate::identity::{AccessGate, Decision, Route, SessionManager};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Navigation {
    pub requested: Route,
    pub landed: Route,
    pub decision: Decision,
}

impl Navigation {
    pub fn redirected(&self) -> bool { self.requested != self.landed }
}

pub struct Navigator {
    session: Arc<SessionManager>,
    feed: Option<Arc<FeedController>>,
    current: RwLock<Route>,
}

impl Navigator {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session, feed: None, current: RwLock::new(Route::Home) }
    }

    /// Feed whose in-flight loads are dropped when the user leaves the home view.
    pub fn with_feed(mut self, feed: Arc<FeedController>) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn current(&self) -> Route { *self.current.read() }

    pub fn navigate(&self, route: Route) -> Navigation {
        let decision = AccessGate::check(route, &self.session);
        let landed = match decision {
            Decision::Allow => route,
            // redirect targets are public routes; one hop is enough
            Decision::RedirectTo(target) => target,
        };
        let previous = std::mem::replace(&mut *self.current.write(), landed);
        if previous == Route::Home && landed != Route::Home {
            if let Some(feed) = &self.feed {
                feed.cancel();
            }
        }
        debug!(target: "newsdesk::gate", "navigate {} -> {} ({:?})", route, landed, decision);
        Navigation { requested: route, landed, decision }
    }

    /// Re-run the gate for the current route. Returns the navigation if it moved.
    pub fn revalidate(&self) -> Option<Navigation> {
        let current = self.current();
        let nav = self.navigate(current);
        if nav.redirected() {
            info!(target: "newsdesk::gate", "access to {} revoked, now at {}", current, nav.landed);
            Some(nav)
        } else {
            None
        }
    }

    /// Revalidate on every session transition. Abort the returned handle to stop.
    pub fn spawn_revalidation(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let nav = Arc::clone(self);
        let mut rx = self.session.subscribe();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                nav.revalidate();
            }
        })
    }
}
