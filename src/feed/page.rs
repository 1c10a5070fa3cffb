use serde::Serialize;

use super::preferences::PreferenceSet;
use crate::api::Article;

/// Which narrowing produced a page's contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Personalization {
    None,
    ServerSide,
    /// The page was filtered locally; it may hold fewer than `page_size` articles
    /// while totals still reflect the server.
    ClientSide,
}

/// Render-ready result of one fetch. Totals are always the server's.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    articles: Vec<Article>,
    pub current_page: u32,
    pub total_pages: u32,
    pub total_count: u64,
    pub personalization: Personalization,
}

impl FeedPage {
    pub fn articles(&self) -> &[Article] { &self.articles }
    pub fn len(&self) -> usize { self.articles.len() }
    pub fn is_empty(&self) -> bool { self.articles.is_empty() }
}

impl IntoIterator for FeedPage {
    type Item = Article;
    type IntoIter = std::vec::IntoIter<Article>;

    fn into_iter(self) -> Self::IntoIter { self.articles.into_iter() }
}

pub fn total_pages(count: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    let pages = count.div_ceil(page_size as u64);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// Newest first; `sort_by` is stable so ties keep backend order.
pub fn sort_newest_first(articles: &mut [Article]) {
    articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
}

pub(crate) struct PageAssembly {
    pub articles: Vec<Article>,
    pub count: u64,
    pub page: u32,
    pub page_size: u32,
    pub personalization: Personalization,
    pub narrow_to: Option<PreferenceSet>,
}

impl PageAssembly {
    pub fn build(self) -> FeedPage {
        let mut articles = self.articles;
        if let Some(prefs) = &self.narrow_to {
            articles.retain(|a| prefs.admits(a));
        }
        sort_newest_first(&mut articles);
        FeedPage {
            articles,
            current_page: self.page,
            total_pages: total_pages(self.count, self.page_size),
            total_count: self.count,
            personalization: self.personalization,
        }
    }
}
