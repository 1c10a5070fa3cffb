//! Feed retrieval with last-request-wins supersession.
//!
//! Each `load` takes a ticket from a generation counter. A response is applied
//! only if its ticket is still current when it arrives; `cancel` and any newer
//! `load` invalidate older tickets.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, warn};

use super::page::{FeedPage, PageAssembly, Personalization};
use super::preferences::PreferenceSet;
use super::query::{FeedQuery, PersonalizationMode};
use crate::api::{NewsFetch, PortalClient};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum FeedState {
    Idle,
    Loading { query: FeedQuery },
    Ready { query: FeedQuery, page: FeedPage },
    Failed { query: FeedQuery, error: ClientError },
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedOutcome {
    Ready(FeedPage),
    /// A newer load or a cancel arrived first; nothing was applied.
    Superseded,
}

pub struct FeedController {
    portal: PortalClient,
    mode: PersonalizationMode,
    page_size: u32,
    generation: AtomicU64,
    state: RwLock<FeedState>,
}

impl FeedController {
    pub fn new(portal: PortalClient, mode: PersonalizationMode, page_size: u32) -> Self {
        Self {
            portal,
            mode,
            page_size: page_size.max(1),
            generation: AtomicU64::new(0),
            state: RwLock::new(FeedState::Idle),
        }
    }

    pub fn from_config(portal: PortalClient, cfg: &ClientConfig) -> Self {
        Self::new(portal, cfg.personalization, cfg.page_size)
    }

    pub fn mode(&self) -> PersonalizationMode { self.mode }
    pub fn page_size(&self) -> u32 { self.page_size }
    pub fn state(&self) -> FeedState { self.state.read().clone() }

    pub async fn load(&self, query: FeedQuery) -> ClientResult<FeedOutcome> {
        let query = query.normalized();
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.state.write() = FeedState::Loading { query };
        debug!(target: "newsdesk::feed", "load ticket={} query={:?}", ticket, query);

        let result = self.fetch(query).await;

        let mut state = self.state.write();
        if self.generation.load(Ordering::SeqCst) != ticket {
            debug!(target: "newsdesk::feed", "discarding superseded response ticket={}", ticket);
            return Ok(FeedOutcome::Superseded);
        }
        match result {
            Ok(page) => {
                *state = FeedState::Ready { query, page: page.clone() };
                Ok(FeedOutcome::Ready(page))
            }
            Err(e) => {
                *state = FeedState::Failed { query, error: e.clone() };
                Err(e)
            }
        }
    }

    /// Discard whatever is in flight, e.g. when the view unmounts.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        *self.state.write() = FeedState::Idle;
    }

    async fn fetch(&self, query: FeedQuery) -> ClientResult<FeedPage> {
        // the server narrows any credentialed listing, so opting out means not sending one
        let opt_out = self.mode == PersonalizationMode::Server
            && !query.applies_preferences
            && query.category_id.is_none();
        let NewsFetch { body, credentialed } = if opt_out {
            self.portal.news_unpersonalized(query.page, query.category_id).await?
        } else {
            self.portal.news(query.page, query.category_id).await?
        };
        let articles = body.results.unwrap_or_default();
        let personalize = credentialed && query.wants_personalization();

        let (personalization, narrow_to) = match self.mode {
            PersonalizationMode::Server if personalize => match self.portal.session().preferences() {
                // known empty: the server had nothing to narrow by
                Some(prefs) if prefs.is_empty() => (Personalization::None, None),
                _ => (Personalization::ServerSide, None),
            },
            PersonalizationMode::Server => (Personalization::None, None),
            PersonalizationMode::Client if personalize => match self.client_side_set().await? {
                Some(prefs) => (Personalization::ClientSide, Some(prefs)),
                None => (Personalization::None, None),
            },
            PersonalizationMode::Client => (Personalization::None, None),
        };

        Ok(PageAssembly {
            articles,
            count: body.count,
            page: query.page,
            page_size: self.page_size,
            personalization,
            narrow_to,
        }
        .build())
    }

    /// Preference set for local narrowing; `None` means show the page unfiltered.
    async fn client_side_set(&self) -> ClientResult<Option<PreferenceSet>> {
        match self.portal.cached_preferences().await {
            Ok(prefs) if prefs.is_empty() => Ok(None),
            Ok(prefs) => Ok(Some(prefs)),
            Err(e) if e.is_unauthorized() => Err(e),
            Err(e) => {
                warn!(target: "newsdesk::feed", "preferences unavailable, showing unfiltered page: {}", e);
                Ok(None)
            }
        }
    }
}
