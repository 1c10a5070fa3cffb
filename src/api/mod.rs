//! Remote portal API: wire models, the raw HTTP binding and its session-aware wrapper.

mod models;
mod client;
mod portal;

pub use models::{
    Article, ArticleCategory, Author, CategoriesResponse, Category, CategoryRef, LoginResponse,
    NewsListResponse, PreferencesResponse, Sentiment,
};
pub use client::ApiClient;
pub use portal::{NewsFetch, PortalClient};
