//! Client-side session state machine: `Unknown` → `Anonymous` | `Authenticated`.
//!
//! The manager is the only writer of the [`TokenStore`]; every transition updates
//! the store before the in-memory state so the durable record never shows a
//! session the process no longer believes in. Transitions bump an epoch which
//! requests capture when they attach a credential.

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::credential::Credential;
use super::principal::{Identity, RoleFlags};
use super::token_store::TokenStore;
use crate::feed::PreferenceSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Unknown,
    Anonymous,
    Authenticated,
}

/// Snapshot of the session as seen by gates and subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub phase: SessionPhase,
    pub identity: Option<Identity>,
    pub roles: RoleFlags,
    pub epoch: u64,
}

impl SessionStatus {
    pub fn is_authenticated(&self) -> bool { self.phase == SessionPhase::Authenticated }
}

/// Credential read at request-issue time together with the epoch it belongs to.
#[derive(Debug, Clone)]
pub struct BearerGrant {
    pub header: String,
    pub epoch: u64,
}

#[derive(Debug, Clone)]
struct Active {
    identity: Identity,
    roles: RoleFlags,
    preferences: Option<PreferenceSet>,
}

#[derive(Debug, Clone)]
enum State {
    Unknown,
    Anonymous,
    Authenticated(Active),
}

struct Inner {
    state: State,
    epoch: u64,
}

pub struct SessionManager {
    store: TokenStore,
    inner: RwLock<Inner>,
    // serializes login/logout/heal so their store + state updates never interleave
    transition: Mutex<()>,
    notify: watch::Sender<SessionStatus>,
}

impl SessionManager {
    pub fn new(store: TokenStore) -> Self {
        let (notify, _) = watch::channel(SessionStatus {
            phase: SessionPhase::Unknown,
            identity: None,
            roles: RoleFlags::default(),
            epoch: 0,
        });
        Self {
            store,
            inner: RwLock::new(Inner { state: State::Unknown, epoch: 0 }),
            transition: Mutex::new(()),
            notify,
        }
    }

    pub fn store(&self) -> &TokenStore { &self.store }

    /// Startup status check. Only meaningful from `Unknown`; later calls return the current phase.
    pub fn start(&self) -> SessionPhase {
        let _t = self.transition.lock();
        if !matches!(self.inner.read().state, State::Unknown) {
            debug!(target: "newsdesk::session", "start() after startup ignored");
            return self.phase();
        }
        match self.store.load() {
            Some(stored) => {
                let identity = stored.identity;
                info!(target: "newsdesk::session", "rehydrated session user={} id={}", identity.username, identity.id);
                self.set_state(State::Authenticated(Active::new(identity)));
            }
            None => {
                if let Err(e) = self.store.clear() {
                    warn!(target: "newsdesk::session", "clearing token store at startup failed: {:#}", e);
                }
                debug!(target: "newsdesk::session", "no stored session; anonymous");
                self.set_state(State::Anonymous);
            }
        }
        self.phase()
    }

    /// Record a session validated upstream. Persists before updating memory.
    pub fn login(&self, identity: Identity, credential: Credential) {
        let _t = self.transition.lock();
        if let Err(e) = self.store.save(&credential, &identity) {
            warn!(target: "newsdesk::session", "persisting session failed, continuing in memory: {:#}", e);
            self.store.fall_back_to_memory();
            if let Err(e) = self.store.save(&credential, &identity) {
                warn!(target: "newsdesk::session", "in-memory session save failed: {:#}", e);
            }
        }
        info!(target: "newsdesk::session", "login user={} id={}", identity.username, identity.id);
        self.set_state(State::Authenticated(Active::new(identity)));
    }

    /// Idempotent: logging out an anonymous session only re-clears the store.
    pub fn logout(&self) {
        let _t = self.transition.lock();
        self.logout_locked("logout");
    }

    /// Reaction to an authorization failure for a request issued at `epoch`.
    /// Returns whether the session was actually ended.
    pub fn force_logout(&self, epoch: u64) -> bool {
        let _t = self.transition.lock();
        {
            let inner = self.inner.read();
            if inner.epoch != epoch || !matches!(inner.state, State::Authenticated(_)) {
                debug!(target: "newsdesk::session", "stale authorization failure epoch={} current={}", epoch, inner.epoch);
                return false;
            }
        }
        self.logout_locked("forced logout after authorization failure");
        true
    }

    pub fn is_authenticated(&self) -> bool { self.ensure_live() }

    pub fn is_admin(&self) -> bool { self.ensure_live() && self.roles().is_admin }

    pub fn is_superuser(&self) -> bool { self.ensure_live() && self.roles().is_superuser }

    pub fn phase(&self) -> SessionPhase {
        match self.inner.read().state {
            State::Unknown => SessionPhase::Unknown,
            State::Anonymous => SessionPhase::Anonymous,
            State::Authenticated(_) => SessionPhase::Authenticated,
        }
    }

    pub fn identity(&self) -> Option<Identity> {
        if !self.ensure_live() {
            return None;
        }
        match &self.inner.read().state {
            State::Authenticated(a) => Some(a.identity.clone()),
            _ => None,
        }
    }

    pub fn epoch(&self) -> u64 { self.inner.read().epoch }

    /// Snapshot after a liveness check.
    pub fn status(&self) -> SessionStatus {
        self.ensure_live();
        Self::snapshot(&self.inner.read())
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> { self.notify.subscribe() }

    /// Authorization header for a request about to be issued, if authenticated.
    pub fn bearer(&self) -> Option<BearerGrant> {
        if !self.ensure_live() {
            return None;
        }
        let epoch = self.epoch();
        let credential = self.store.credential()?;
        Some(BearerGrant { header: credential.bearer(), epoch })
    }

    pub fn preferences(&self) -> Option<PreferenceSet> {
        match &self.inner.read().state {
            State::Authenticated(a) => a.preferences.clone(),
            _ => None,
        }
    }

    /// Cache a preference set fetched under `epoch`. Dropped if the session moved on.
    pub fn cache_preferences(&self, epoch: u64, prefs: PreferenceSet) -> bool {
        let mut inner = self.inner.write();
        if inner.epoch != epoch {
            return false;
        }
        match &mut inner.state {
            State::Authenticated(a) => {
                debug!(target: "newsdesk::session", "cached {} preferred categories", prefs.len());
                a.preferences = Some(prefs);
                true
            }
            _ => false,
        }
    }

    fn roles(&self) -> RoleFlags {
        match &self.inner.read().state {
            State::Authenticated(a) => a.roles,
            _ => RoleFlags::default(),
        }
    }

    /// True iff authenticated with a live credential; heals the pair otherwise.
    fn ensure_live(&self) -> bool {
        if !matches!(self.inner.read().state, State::Authenticated(_)) {
            return false;
        }
        if self.store.credential().is_some() {
            return true;
        }
        let _t = self.transition.lock();
        // re-check under the transition lock; a concurrent login may have fixed it
        if !matches!(self.inner.read().state, State::Authenticated(_)) {
            return false;
        }
        if self.store.credential().is_some() {
            return true;
        }
        warn!(target: "newsdesk::session", "credential missing for active session; clearing");
        self.logout_locked("self-heal");
        false
    }

    fn logout_locked(&self, reason: &str) {
        if let Err(e) = self.store.clear() {
            warn!(target: "newsdesk::session", "clearing token store failed: {:#}", e);
        }
        if matches!(self.inner.read().state, State::Anonymous) {
            return;
        }
        info!(target: "newsdesk::session", "{}", reason);
        self.set_state(State::Anonymous);
    }

    fn set_state(&self, state: State) {
        let status = {
            let mut inner = self.inner.write();
            inner.state = state;
            inner.epoch += 1;
            Self::snapshot(&inner)
        };
        self.notify.send_replace(status);
    }

    fn snapshot(inner: &Inner) -> SessionStatus {
        match &inner.state {
            State::Unknown => SessionStatus { phase: SessionPhase::Unknown, identity: None, roles: RoleFlags::default(), epoch: inner.epoch },
            State::Anonymous => SessionStatus { phase: SessionPhase::Anonymous, identity: None, roles: RoleFlags::default(), epoch: inner.epoch },
            State::Authenticated(a) => SessionStatus {
                phase: SessionPhase::Authenticated,
                identity: Some(a.identity.clone()),
                roles: a.roles,
                epoch: inner.epoch,
            },
        }
    }
}

impl Active {
    fn new(identity: Identity) -> Self {
        let roles = RoleFlags::derive(&identity);
        Self { identity, roles, preferences: None }
    }
}
