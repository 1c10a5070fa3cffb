//! Session-aware access to the portal API.
//!
//! Every call reads the credential at issue time, so a logout that happened
//! before the request left the queue is honoured. An authorization failure on a
//! credentialed call ends the session it was issued under.

use std::sync::Arc;

use tracing::{debug, warn};

use super::client::ApiClient;
use super::models::{Article, Category, CategoryRef, NewsListResponse};
use crate::error::{ClientError, ClientResult};
use crate::feed::PreferenceSet;
use crate::identity::{BearerGrant, Credential, Identity, SessionManager};

/// One page of the raw news listing plus whether a credential rode along.
#[derive(Debug, Clone)]
pub struct NewsFetch {
    pub body: NewsListResponse,
    pub credentialed: bool,
}

#[derive(Clone)]
pub struct PortalClient {
    api: ApiClient,
    session: Arc<SessionManager>,
}

impl PortalClient {
    pub fn new(api: ApiClient, session: Arc<SessionManager>) -> Self { Self { api, session } }

    pub fn api(&self) -> &ApiClient { &self.api }
    pub fn session(&self) -> &Arc<SessionManager> { &self.session }

    /// Authenticate remotely, record the session, then refetch preferences.
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<Identity> {
        let resp = self.api.login(username, password).await?;
        let credential = Credential::new(resp.access_token, resp.refresh_token)
            .map_err(|e| ClientError::fetch_failed(None, format!("login response: {}", e.message())))?;
        if !resp.identity.is_well_formed() {
            return Err(ClientError::fetch_failed(None, "login response: identity lacks a stable id"));
        }
        let identity = resp.identity;
        self.session.login(identity.clone(), credential);
        match self.preferences().await {
            Ok(_) => {}
            // the refresh already ended the session
            Err(e) if e.is_unauthorized() => return Err(e),
            Err(e) => warn!(target: "newsdesk::api", "preference refresh after login failed: {}", e),
        }
        Ok(identity)
    }

    pub fn logout(&self) { self.session.logout(); }

    pub async fn news(&self, page: u32, category: Option<i64>) -> ClientResult<NewsFetch> {
        let grant = self.session.bearer();
        let res = self.api.list_news(page, category, header(&grant)).await;
        let body = self.settle(&grant, res)?;
        Ok(NewsFetch { body, credentialed: grant.is_some() })
    }

    /// Listing sent without the bearer so the server cannot personalize it.
    pub async fn news_unpersonalized(&self, page: u32, category: Option<i64>) -> ClientResult<NewsFetch> {
        let body = self.api.list_news(page, category, None).await?;
        Ok(NewsFetch { body, credentialed: false })
    }

    pub async fn article(&self, id: i64) -> ClientResult<Article> {
        let grant = self.session.bearer();
        let res = self.api.get_article(id, header(&grant)).await;
        self.settle(&grant, res)
    }

    pub async fn categories(&self) -> ClientResult<Vec<Category>> {
        let grant = self.session.bearer();
        let res = self.api.list_categories(header(&grant)).await;
        self.settle(&grant, res)
    }

    /// Fetch the preference set and cache it on the session it was fetched for.
    pub async fn preferences(&self) -> ClientResult<PreferenceSet> {
        let grant = self.require_grant()?;
        let res = self.api.get_preferences(&grant.header).await;
        let body = self.settle(&Some(grant.clone()), res)?;
        let prefs = PreferenceSet::from_ids(body.preferred_categories.iter().map(CategoryRef::id));
        self.session.cache_preferences(grant.epoch, prefs.clone());
        Ok(prefs)
    }

    /// Cached set for the current session, fetching it on first use.
    pub async fn cached_preferences(&self) -> ClientResult<PreferenceSet> {
        match self.session.preferences() {
            Some(p) => Ok(p),
            None => self.preferences().await,
        }
    }

    pub async fn save_preferences(&self, ids: &[i64]) -> ClientResult<PreferenceSet> {
        let grant = self.require_grant()?;
        let res = self.api.put_preferences(&grant.header, ids).await;
        self.settle(&Some(grant.clone()), res)?;
        let prefs = PreferenceSet::from_ids(ids.iter().copied());
        self.session.cache_preferences(grant.epoch, prefs.clone());
        Ok(prefs)
    }

    fn require_grant(&self) -> ClientResult<BearerGrant> {
        self.session
            .bearer()
            .ok_or_else(|| ClientError::unauthorized("login required"))
    }

    /// Apply the forced-logout rule to a finished call.
    fn settle<T>(&self, grant: &Option<BearerGrant>, res: ClientResult<T>) -> ClientResult<T> {
        if let (Err(e), Some(g)) = (&res, grant) {
            if e.is_unauthorized() {
                let ended = self.session.force_logout(g.epoch);
                debug!(target: "newsdesk::api", "authorization failure epoch={} session_ended={}", g.epoch, ended);
            }
        }
        res
    }
}

fn header(grant: &Option<BearerGrant>) -> Option<&str> { grant.as_ref().map(|g| g.header.as_str()) }
