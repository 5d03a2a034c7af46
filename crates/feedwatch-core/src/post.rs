use chrono::{DateTime, Utc};
use serde::Serialize;

/// A post extracted from one scrape pass.
///
/// Lives only for the duration of a task execution; only `unique_id`
/// survives, as a processed marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScrapedPost {
    /// Value of the post element's identifier attribute.
    pub unique_id: String,
    /// `"<author>: <body>"`, trimmed.
    pub content: String,
    /// Absolute time resolved from `time_label`.
    pub posted_at: DateTime<Utc>,
    /// Relative label as rendered on the page, separator noise removed.
    pub time_label: String,
    pub url: String,
}

impl ScrapedPost {
    /// Returns the post body without the leading `"<author>:"` prefix.
    #[must_use]
    pub fn body(&self) -> &str {
        self.content
            .split_once(':')
            .map_or(self.content.as_str(), |(_, body)| body)
            .trim()
    }
}
