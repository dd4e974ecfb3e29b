use serde::{Deserialize, Serialize};

use super::MessagePayload;

/// Payload-level predicates for search and scroll. Both predicates are
/// combined with boolean AND by every repository implementation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PointFilter {
    /// Exact match on the payload's channel id.
    pub channel_id: Option<String>,
    /// Inclusive numeric range on the payload's timestamp.
    pub time_range: Option<(f64, f64)>,
}

impl PointFilter {
    pub fn is_empty(&self) -> bool {
        self.channel_id.is_none() && self.time_range.is_none()
    }
}

/// A semantic search request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    query: String,
    limit: usize,
    min_score: Option<f32>,
    channel_id: Option<String>,
    time_range: Option<(f64, f64)>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: 10,
            min_score: None,
            channel_id: None,
            time_range: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        // Ensure at least 1 result is requested
        self.limit = limit.max(1);
        self
    }

    pub fn with_min_score(mut self, score: f32) -> Self {
        self.min_score = Some(score);
        self
    }

    pub fn with_channel(mut self, channel_id: impl Into<String>) -> Self {
        self.channel_id = Some(channel_id.into());
        self
    }

    pub fn with_time_range(mut self, oldest: f64, newest: f64) -> Self {
        self.time_range = Some((oldest, newest));
        self
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn min_score(&self) -> Option<f32> {
        self.min_score
    }

    pub fn filter(&self) -> PointFilter {
        PointFilter {
            channel_id: self.channel_id.clone(),
            time_range: self.time_range,
        }
    }
}

/// One search hit, payload already decrypted for the caller.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    payload: MessagePayload,
    score: f32,
}

impl SearchResult {
    pub fn new(payload: MessagePayload, score: f32) -> Self {
        Self { payload, score }
    }

    pub fn payload(&self) -> &MessagePayload {
        &self.payload
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn display_line(&self) -> String {
        let author = self.payload.user_name.as_deref().unwrap_or("unknown");
        let text = self.payload.text.as_deref().unwrap_or("");
        format!(
            "#{} {}: {} (score: {:.3})",
            self.payload.channel_name, author, text, self.score
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builder() {
        let query = SearchQuery::new("budget review")
            .with_limit(20)
            .with_min_score(0.4)
            .with_channel("C1")
            .with_time_range(100.0, 200.0);

        assert_eq!(query.query(), "budget review");
        assert_eq!(query.limit(), 20);
        assert_eq!(query.min_score(), Some(0.4));

        let filter = query.filter();
        assert_eq!(filter.channel_id.as_deref(), Some("C1"));
        assert_eq!(filter.time_range, Some((100.0, 200.0)));
    }

    #[test]
    fn test_limit_floor() {
        let query = SearchQuery::new("q").with_limit(0);
        assert_eq!(query.limit(), 1);
    }

    #[test]
    fn test_empty_filter() {
        assert!(SearchQuery::new("q").filter().is_empty());
    }
}
