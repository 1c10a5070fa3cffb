use std::fmt;
use std::str::FromStr;

use serde::Serialize;

/// Where preference narrowing happens. Fixed per controller so one page load
/// never mixes the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonalizationMode {
    /// The server narrows results for the credentialed user (canonical).
    Server,
    /// Fallback for servers that cannot narrow: the client filters the page.
    Client,
}

impl FromStr for PersonalizationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "server" | "a" => Ok(PersonalizationMode::Server),
            "client" | "b" => Ok(PersonalizationMode::Client),
            other => Err(format!("unknown personalization mode '{}' (expected server|client)", other)),
        }
    }
}

impl fmt::Display for PersonalizationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersonalizationMode::Server => f.write_str("server"),
            PersonalizationMode::Client => f.write_str("client"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedQuery {
    pub category_id: Option<i64>,
    pub page: u32,
    pub applies_preferences: bool,
}

impl Default for FeedQuery {
    fn default() -> Self { Self { category_id: None, page: 1, applies_preferences: true } }
}

impl FeedQuery {
    pub fn page(page: u32) -> Self { Self { page, ..Self::default() } }

    pub fn with_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn without_preferences(mut self) -> Self {
        self.applies_preferences = false;
        self
    }

    /// Page numbers below 1 are clamped rather than rejected.
    pub fn normalized(mut self) -> Self {
        if self.page < 1 {
            self.page = 1;
        }
        self
    }

    /// An explicit category always overrides personalization.
    pub fn wants_personalization(&self) -> bool {
        self.applies_preferences && self.category_id.is_none()
    }
}
