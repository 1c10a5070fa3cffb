use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::models::{
    Article, CategoriesResponse, Category, LoginRequest, LoginResponse, NewsListResponse,
    PreferencesResponse, PreferencesUpdate,
};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult, INVALID_LOGIN_MESSAGE};

/// Stateless HTTP binding of the portal API. Credentials are passed per call;
/// session bookkeeping lives in `PortalClient`.
#[derive(Clone)]
pub struct ApiClient {
    base: Url,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base: Url, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { base, http })
    }

    pub fn from_config(cfg: &ClientConfig) -> anyhow::Result<Self> { Self::new(cfg.base_url.clone(), cfg.request_timeout) }

    pub fn base(&self) -> &Url { &self.base }

    fn url(&self, path: &str) -> ClientResult<Url> {
        self.base
            .join(path)
            .map_err(|e| ClientError::fetch_failed(None, format!("invalid endpoint '{}': {}", path, e)))
    }

    fn with_bearer(req: RequestBuilder, bearer: Option<&str>) -> RequestBuilder {
        match bearer {
            Some(b) => req.header(AUTHORIZATION, b),
            None => req,
        }
    }

    /// POST /login. A 401 maps to a uniform message, never the backend's wording.
    pub async fn login(&self, username: &str, password: &str) -> ClientResult<LoginResponse> {
        let url = self.url("login")?;
        debug!(target: "newsdesk::api", "POST {} user={}", url, username);
        let resp = self.http.post(url).json(&LoginRequest { username, password }).send().await?;
        if resp.status().as_u16() == 401 {
            return Err(ClientError::unauthorized(INVALID_LOGIN_MESSAGE));
        }
        decode(resp).await
    }

    /// GET /news?page=N[&category=C]
    pub async fn list_news(&self, page: u32, category: Option<i64>, bearer: Option<&str>) -> ClientResult<NewsListResponse> {
        let url = self.url("news")?;
        let mut params: Vec<(&str, String)> = vec![("page", page.to_string())];
        if let Some(c) = category {
            params.push(("category", c.to_string()));
        }
        debug!(target: "newsdesk::api", "GET {} page={} category={:?} credentialed={}", url, page, category, bearer.is_some());
        let req = Self::with_bearer(self.http.get(url).query(&params), bearer);
        decode(req.send().await?).await
    }

    pub async fn get_article(&self, id: i64, bearer: Option<&str>) -> ClientResult<Article> {
        let url = self.url(&format!("news/{}", id))?;
        debug!(target: "newsdesk::api", "GET {}", url);
        let resp = Self::with_bearer(self.http.get(url), bearer).send().await?;
        if resp.status().as_u16() == 404 {
            return Err(ClientError::not_found(format!("article {} not found", id)));
        }
        decode(resp).await
    }

    pub async fn list_categories(&self, bearer: Option<&str>) -> ClientResult<Vec<Category>> {
        let url = self.url("categories")?;
        debug!(target: "newsdesk::api", "GET {}", url);
        let resp = Self::with_bearer(self.http.get(url), bearer).send().await?;
        let body: CategoriesResponse = decode(resp).await?;
        Ok(body.into_categories())
    }

    pub async fn get_preferences(&self, bearer: &str) -> ClientResult<PreferencesResponse> {
        let url = self.url("profiles/me/preferences")?;
        debug!(target: "newsdesk::api", "GET {}", url);
        let resp = self.http.get(url).header(AUTHORIZATION, bearer).send().await?;
        decode(resp).await
    }

    pub async fn put_preferences(&self, bearer: &str, ids: &[i64]) -> ClientResult<()> {
        let url = self.url("profiles/me/preferences")?;
        debug!(target: "newsdesk::api", "PUT {} ids={:?}", url, ids);
        let body = PreferencesUpdate { preferred_categories: ids.to_vec() };
        let resp = self.http.put(url).header(AUTHORIZATION, bearer).json(&body).send().await?;
        if !resp.status().is_success() {
            return Err(error_from_response(resp).await);
        }
        Ok(())
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> ClientResult<T> {
    let status = resp.status();
    if !status.is_success() {
        return Err(error_from_response(resp).await);
    }
    let bytes = resp.bytes().await?;
    debug!(target: "newsdesk::api", "response status={} bytes={}", status.as_u16(), bytes.len());
    serde_json::from_slice(&bytes)
        .map_err(|e| ClientError::fetch_failed(Some(status.as_u16()), format!("invalid response body: {}", e)))
}

/// Classify a non-2xx response, preferring the server's own message field.
async fn error_from_response(resp: Response) -> ClientError {
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    let message = extract_message(&text)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    debug!(target: "newsdesk::api", "error status={} message={}", status.as_u16(), message);
    ClientError::from_status(status.as_u16(), message)
}

fn extract_message(body: &str) -> Option<String> {
    let v: serde_json::Value = serde_json::from_str(body).ok()?;
    ["detail", "error", "message"]
        .iter()
        .find_map(|k| v.get(*k).and_then(|m| m.as_str()))
        .map(|s| s.to_string())
}
