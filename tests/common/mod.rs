//! In-process portal backend for integration tests. Binds 127.0.0.1:0 and
//! serves the subset of the API the client consumes.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};

use newsdesk::api::{ApiClient, PortalClient};
use newsdesk::config::normalize_base;
use newsdesk::feed::{FeedController, PersonalizationMode};
use newsdesk::identity::{SessionManager, TokenStore};

pub const PAGE_SIZE: usize = 10;
pub const CATEGORY_COUNT: i64 = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct NewsRequest {
    pub page: Option<String>,
    pub category: Option<String>,
    pub authorization: Option<String>,
}

pub struct MockState {
    articles: Vec<Value>,
    accepted_tokens: Mutex<HashSet<String>>,
    preferences: Mutex<HashMap<String, Vec<i64>>>,
    pub server_narrows: AtomicBool,
    pub categories_bare: AtomicBool,
    pub omit_results: AtomicBool,
    pub fail_news_with: Mutex<Option<u16>>,
    pub fail_preferences_with: Mutex<Option<u16>>,
    // page number -> artificial latency
    delays: Mutex<HashMap<u32, Duration>>,
    news_log: Mutex<Vec<NewsRequest>>,
}

impl MockState {
    fn new(article_count: i64) -> Self {
        let articles = (1..=article_count).map(article_json).collect();
        Self {
            articles,
            accepted_tokens: Mutex::new(HashSet::new()),
            preferences: Mutex::new(HashMap::new()),
            server_narrows: AtomicBool::new(true),
            categories_bare: AtomicBool::new(false),
            omit_results: AtomicBool::new(false),
            fail_news_with: Mutex::new(None),
            fail_preferences_with: Mutex::new(None),
            delays: Mutex::new(HashMap::new()),
            news_log: Mutex::new(Vec::new()),
        }
    }

    /// Every issued access token stops being accepted, as if it expired.
    pub fn expire_tokens(&self) { self.accepted_tokens.lock().clear(); }

    pub fn delay_page(&self, page: u32, delay: Duration) { self.delays.lock().insert(page, delay); }

    pub fn set_preferences(&self, user: &str, ids: &[i64]) {
        self.preferences.lock().insert(user.to_string(), ids.to_vec());
    }

    pub fn preferences_of(&self, user: &str) -> Vec<i64> {
        self.preferences.lock().get(user).cloned().unwrap_or_default()
    }

    pub fn news_log(&self) -> Vec<NewsRequest> { self.news_log.lock().clone() }

    /// Username behind an accepted bearer header.
    fn user_for(&self, headers: &HeaderMap) -> Result<Option<String>, Response> {
        let Some(raw) = headers.get("authorization").and_then(|v| v.to_str().ok()) else { return Ok(None) };
        let token = raw.strip_prefix("Bearer ").unwrap_or("");
        if !self.accepted_tokens.lock().contains(token) {
            return Err(error(StatusCode::UNAUTHORIZED, "Given token not valid for any token type"));
        }
        Ok(token.strip_prefix("tok-").map(|u| u.to_string()))
    }
}

/// Article `id` belongs to category `id % 3 + 1`; later ids are newer.
pub fn article_json(id: i64) -> Value {
    let cat = id % CATEGORY_COUNT + 1;
    json!({
        "id": id,
        "title": format!("Story {}", id),
        "content": format!("Body of story {}", id),
        "category": { "id": cat, "name": format!("Category {}", cat), "slug": format!("cat-{}", cat) },
        "author": { "id": 100, "username": "desk" },
        "source": "wire",
        "published_at": format!("2024-03-01T00:{:02}:00Z", id),
        "sentiment": { "score": 0.5, "label": "neutral" }
    })
}

pub fn category_of(article_id: i64) -> i64 { article_id % CATEGORY_COUNT + 1 }

fn error(status: StatusCode, detail: &str) -> Response {
    (status, Json(json!({ "detail": detail }))).into_response()
}

fn identity_for(user: &str) -> Option<Value> {
    match user {
        "rita" => Some(json!({ "id": 1, "username": "rita", "email": "rita@example.com", "is_admin": false })),
        "root" => Some(json!({ "id": 2, "username": "root", "email": "root@example.com", "user_type": "admin" })),
        _ => None,
    }
}

async fn login(State(st): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    let user = body.get("username").and_then(|v| v.as_str()).unwrap_or("");
    let pass = body.get("password").and_then(|v| v.as_str()).unwrap_or("");
    match identity_for(user) {
        Some(identity) if pass == "pw" => {
            let token = format!("tok-{}", user);
            st.accepted_tokens.lock().insert(token.clone());
            Json(json!({ "accessToken": token, "refreshToken": format!("ref-{}", user), "identity": identity }))
                .into_response()
        }
        _ => error(StatusCode::UNAUTHORIZED, "No active account found with the given credentials"),
    }
}

async fn news(
    State(st): State<Arc<MockState>>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    st.news_log.lock().push(NewsRequest {
        page: params.get("page").cloned(),
        category: params.get("category").cloned(),
        authorization: headers.get("authorization").and_then(|v| v.to_str().ok()).map(String::from),
    });
    let page: u32 = params.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let delay = st.delays.lock().get(&page).copied();
    if let Some(d) = delay {
        tokio::time::sleep(d).await;
    }
    if let Some(code) = *st.fail_news_with.lock() {
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return error(status, "backend unavailable");
    }
    let user = match st.user_for(&headers) {
        Ok(u) => u,
        Err(resp) => return resp,
    };
    if st.omit_results.load(Ordering::SeqCst) {
        return Json(json!({ "count": 0 })).into_response();
    }

    let category: Option<i64> = params.get("category").and_then(|c| c.parse().ok());
    let preferred: Option<Vec<i64>> = match (&user, category) {
        (Some(u), None) if st.server_narrows.load(Ordering::SeqCst) => {
            Some(st.preferences_of(u)).filter(|p| !p.is_empty())
        }
        _ => None,
    };
    let matching: Vec<&Value> = st
        .articles
        .iter()
        .filter(|a| {
            let cat = a["category"]["id"].as_i64().unwrap_or(0);
            match (category, &preferred) {
                (Some(c), _) => cat == c,
                (None, Some(p)) => p.contains(&cat),
                (None, None) => true,
            }
        })
        .collect();
    // oldest first on purpose; the client owns the ordering
    let start = (page.saturating_sub(1) as usize) * PAGE_SIZE;
    let results: Vec<Value> = matching.iter().skip(start).take(PAGE_SIZE).map(|v| (*v).clone()).collect();
    Json(json!({ "count": matching.len(), "results": results })).into_response()
}

async fn article(State(st): State<Arc<MockState>>, Path(id): Path<i64>) -> Response {
    match st.articles.iter().find(|a| a["id"].as_i64() == Some(id)) {
        Some(a) => Json(a.clone()).into_response(),
        None => error(StatusCode::NOT_FOUND, "Not found."),
    }
}

async fn categories(State(st): State<Arc<MockState>>) -> Response {
    let cats: Vec<Value> = (1..=CATEGORY_COUNT)
        .map(|id| json!({ "id": id, "name": format!("Category {}", id), "slug": format!("cat-{}", id), "news_count": 8 }))
        .collect();
    if st.categories_bare.load(Ordering::SeqCst) {
        Json(Value::Array(cats)).into_response()
    } else {
        Json(json!({ "count": cats.len(), "results": cats })).into_response()
    }
}

async fn get_preferences(State(st): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if let Some(code) = *st.fail_preferences_with.lock() {
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return error(status, "preferences unavailable");
    }
    match st.user_for(&headers) {
        Ok(Some(u)) => Json(json!({ "preferredCategories": st.preferences_of(&u) })).into_response(),
        Ok(None) => error(StatusCode::UNAUTHORIZED, "Authentication credentials were not provided."),
        Err(resp) => resp,
    }
}

async fn put_preferences(State(st): State<Arc<MockState>>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    match st.user_for(&headers) {
        Ok(Some(u)) => {
            let ids: Vec<i64> = body["preferredCategories"]
                .as_array()
                .map(|a| a.iter().filter_map(|v| v.as_i64()).collect())
                .unwrap_or_default();
            st.set_preferences(&u, &ids);
            Json(json!({ "preferredCategories": ids })).into_response()
        }
        Ok(None) => error(StatusCode::UNAUTHORIZED, "Authentication credentials were not provided."),
        Err(resp) => resp,
    }
}

pub struct MockPortal {
    pub addr: SocketAddr,
    pub state: Arc<MockState>,
    handle: tokio::task::JoinHandle<()>,
}

impl MockPortal {
    pub async fn start(article_count: i64) -> Self {
        let state = Arc::new(MockState::new(article_count));
        let app = Router::new()
            .route("/api/login", post(login))
            .route("/api/news", get(news))
            .route("/api/news/{id}", get(article))
            .route("/api/categories", get(categories))
            .route("/api/profiles/me/preferences", get(get_preferences).put(put_preferences))
            .with_state(Arc::clone(&state));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { addr, state, handle }
    }

    pub fn base(&self) -> String { format!("http://{}/api", self.addr) }
}

impl Drop for MockPortal {
    fn drop(&mut self) { self.handle.abort(); }
}

/// Client stack wired the way the binary wires it.
pub struct Client {
    pub session: Arc<SessionManager>,
    pub portal: PortalClient,
    pub feed: Arc<FeedController>,
}

pub fn client(mock: &MockPortal, store: TokenStore, mode: PersonalizationMode) -> Client {
    let session = Arc::new(SessionManager::new(store));
    session.start();
    let base = normalize_base(&mock.base()).unwrap();
    let api = ApiClient::new(base, Duration::from_secs(5)).unwrap();
    let portal = PortalClient::new(api, Arc::clone(&session));
    let feed = Arc::new(FeedController::new(portal.clone(), mode, PAGE_SIZE as u32));
    Client { session, portal, feed }
}
