//! Dashboard presentation state

use crate::domain::metric::DisplayMetric;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Category populated from remote metrics data
pub const METRICS_CATEGORY: &str = "Inflation";

/// Classification of a failed refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    /// Network, connection or non-2xx response
    TransportError,
    /// Endpoint answered with a rate-limit status
    RateLimited,
    /// Unsuccessful envelope, malformed body or missing metrics section
    ProtocolError,
}

impl ErrorKind {
    /// Short message shown to the user
    pub fn user_message(self) -> &'static str {
        match self {
            ErrorKind::RateLimited => "Too many requests. Data will refresh automatically shortly.",
            ErrorKind::TransportError | ErrorKind::ProtocolError => {
                "Failed to fetch inflation data"
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::TransportError => "transport",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::ProtocolError => "protocol",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category label -> metrics, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryMap {
    entries: Vec<(String, Vec<DisplayMetric>)>,
}

impl CategoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map holding only the remote metrics category
    pub fn from_metrics(metrics: impl Into<Vec<DisplayMetric>>) -> Self {
        let mut map = Self::new();
        map.insert(METRICS_CATEGORY, metrics.into());
        map
    }

    /// Insert or replace a category, keeping its original position on replace
    pub fn insert(&mut self, label: impl Into<String>, metrics: Vec<DisplayMetric>) {
        let label = label.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == label) {
            Some((_, slot)) => *slot = metrics,
            None => self.entries.push((label, metrics)),
        }
    }

    pub fn get(&self, label: &str) -> Option<&[DisplayMetric]> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == label)
            .map(|(_, metrics)| metrics.as_slice())
    }

    pub fn contains(&self, label: &str) -> bool {
        self.get(label).is_some()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(label, _)| label.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[DisplayMetric])> {
        self.entries.iter().map(|(label, metrics)| (label.as_str(), metrics.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read-only snapshot handed to renderers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardState {
    pub categories: CategoryMap,
    pub selected_category: Option<String>,
    /// True only while the first fetch is pending
    pub loading: bool,
    pub error: Option<ErrorKind>,
    /// When the current categories were applied
    pub last_refreshed: Option<DateTime<Utc>>,
    /// `last_updated` of the envelope the categories came from
    pub data_as_of: Option<String>,
}

impl Default for DashboardState {
    fn default() -> Self {
        Self {
            categories: CategoryMap::new(),
            selected_category: None,
            loading: true,
            error: None,
            last_refreshed: None,
            data_as_of: None,
        }
    }
}

impl DashboardState {
    /// Metrics of the selected category; empty when nothing is selected or
    /// the category has no data
    pub fn selected_metrics(&self) -> &[DisplayMetric] {
        self.selected_category
            .as_deref()
            .and_then(|label| self.categories.get(label))
            .unwrap_or(&[])
    }

    pub fn error_message(&self) -> Option<&'static str> {
        self.error.map(ErrorKind::user_message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::normalize::normalize;
    use serde_json::Map;

    fn metrics() -> Vec<DisplayMetric> {
        normalize(&Map::new(), None).to_vec()
    }

    #[test]
    fn test_initial_state() {
        let state = DashboardState::default();
        assert!(state.loading);
        assert!(state.categories.is_empty());
        assert_eq!(state.selected_category, None);
        assert_eq!(state.error, None);
        assert!(state.selected_metrics().is_empty());
    }

    #[test]
    fn test_rate_limit_message_is_distinct() {
        assert_ne!(
            ErrorKind::RateLimited.user_message(),
            ErrorKind::TransportError.user_message()
        );
        assert_eq!(
            ErrorKind::TransportError.user_message(),
            ErrorKind::ProtocolError.user_message()
        );
    }

    #[test]
    fn test_category_map_preserves_insertion_order() {
        let mut map = CategoryMap::new();
        map.insert("Inflation", metrics());
        map.insert("Energy", vec![]);
        map.insert("Inflation", vec![]);

        let labels: Vec<&str> = map.labels().collect();
        assert_eq!(labels, vec!["Inflation", "Energy"]);
        assert_eq!(map.get("Inflation").map(<[_]>::len), Some(0));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_selected_metrics() {
        let mut state = DashboardState {
            categories: CategoryMap::from_metrics(metrics()),
            ..Default::default()
        };
        assert!(state.selected_metrics().is_empty());

        state.selected_category = Some(METRICS_CATEGORY.to_string());
        assert_eq!(state.selected_metrics().len(), 5);

        state.selected_category = Some("Housing Affordability".to_string());
        assert!(state.selected_metrics().is_empty());
    }
}
