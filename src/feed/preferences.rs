use std::collections::BTreeSet;

use serde::Serialize;

use crate::api::Article;

/// Category ids a user opted into. Order is irrelevant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PreferenceSet {
    ids: BTreeSet<i64>,
}

impl PreferenceSet {
    pub fn from_ids<I: IntoIterator<Item = i64>>(ids: I) -> Self {
        Self { ids: ids.into_iter().collect() }
    }

    pub fn contains(&self, category_id: i64) -> bool { self.ids.contains(&category_id) }
    pub fn len(&self) -> usize { self.ids.len() }
    pub fn is_empty(&self) -> bool { self.ids.is_empty() }
    pub fn ids(&self) -> Vec<i64> { self.ids.iter().copied().collect() }

    /// Whether an article falls inside the set. Uncategorized articles never do.
    pub fn admits(&self, article: &Article) -> bool {
        article.category_id().map(|id| self.contains(id)).unwrap_or(false)
    }
}
