//! Wire shapes of the portal API. Read-only from the client's point of view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::Identity;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "news_count")]
    pub news_count: u64,
}

/// Category reference embedded in an article.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArticleCategory {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Author {
    #[serde(default)]
    pub id: Option<i64>,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sentiment {
    pub score: f64,
    pub label: String,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: i64,
    pub title: String,
    // list endpoints may omit the body
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub category: Option<ArticleCategory>,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(alias = "published_at")]
    pub published_at: DateTime<Utc>,
    #[serde(default)]
    pub sentiment: Option<Sentiment>,
}

impl Article {
    pub fn category_id(&self) -> Option<i64> { self.category.as_ref().map(|c| c.id) }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(alias = "access_token", alias = "access")]
    pub access_token: String,
    #[serde(alias = "refresh_token", alias = "refresh")]
    pub refresh_token: String,
    #[serde(alias = "user")]
    pub identity: Identity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsListResponse {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub results: Option<Vec<Article>>,
}

/// `GET /categories` answers either a paginated envelope or a bare array.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CategoriesResponse {
    Paged { results: Vec<Category> },
    Bare(Vec<Category>),
}

impl CategoriesResponse {
    pub fn into_categories(self) -> Vec<Category> {
        match self {
            CategoriesResponse::Paged { results } => results,
            CategoriesResponse::Bare(v) => v,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CategoryRef {
    Id(i64),
    Object { id: i64 },
}

impl CategoryRef {
    pub fn id(&self) -> i64 {
        match self {
            CategoryRef::Id(id) | CategoryRef::Object { id } => *id,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesResponse {
    #[serde(default, alias = "preferred_categories")]
    pub preferred_categories: Vec<CategoryRef>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesUpdate {
    pub preferred_categories: Vec<i64>,
}
