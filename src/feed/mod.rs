//! Paginated article feed with optional preference narrowing.

mod preferences;
mod query;
mod page;
mod controller;

pub use preferences::PreferenceSet;
pub use query::{FeedQuery, PersonalizationMode};
pub use page::{sort_newest_first, total_pages, FeedPage, Personalization};
pub use controller::{FeedController, FeedOutcome, FeedState};
