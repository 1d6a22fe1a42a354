//! Metric identities and the display-ready metric record

use serde::{Deserialize, Serialize};

/// One of the five tracked economic indicators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Cpi,
    CoreCpi,
    Food,
    Gas,
    Housing,
}

impl MetricKind {
    /// Fixed display order. Normalized output always follows it.
    pub const ALL: [MetricKind; 5] = [
        MetricKind::Cpi,
        MetricKind::CoreCpi,
        MetricKind::Food,
        MetricKind::Gas,
        MetricKind::Housing,
    ];

    /// Key used in the remote `metrics` object
    pub fn key(self) -> &'static str {
        match self {
            MetricKind::Cpi => "cpi",
            MetricKind::CoreCpi => "core_cpi",
            MetricKind::Food => "food",
            MetricKind::Gas => "gas",
            MetricKind::Housing => "housing",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.key() == key)
    }

    /// Title shown when the payload does not carry one
    pub fn default_title(self) -> &'static str {
        match self {
            MetricKind::Cpi => "Consumer Price Index",
            MetricKind::CoreCpi => "Core CPI",
            MetricKind::Food => "Food Prices",
            MetricKind::Gas => "Gas Prices",
            MetricKind::Housing => "Housing Prices",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            MetricKind::Cpi => "Overall consumer price inflation for all urban consumers",
            MetricKind::CoreCpi => "Consumer price inflation excluding food and energy",
            MetricKind::Food => "Consumer prices for food at home and away from home",
            MetricKind::Gas => "Average US regular gasoline price per gallon",
            MetricKind::Housing => "Case-Shiller national home price index",
        }
    }

    /// Upstream FRED series backing this indicator
    pub fn series_id(self) -> &'static str {
        match self {
            MetricKind::Cpi => "CPIAUCSL",
            MetricKind::CoreCpi => "CPILFESL",
            MetricKind::Food => "CPIUFDSL",
            MetricKind::Gas => "GASREGW",
            MetricKind::Housing => "CSUSHPISA",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Single observation in a metric's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPoint {
    pub date: String,
    pub value: f64,
}

/// Direction of a metric's change, used for coloring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    /// Prices went up
    Rising,
    /// Prices held or went down
    Falling,
    Unknown,
}

/// Normalized, render-ready metric
///
/// Numeric fields stay `None` when the payload omits them. They are never
/// coerced to zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayMetric {
    pub id: MetricKind,
    pub title: String,
    pub description: &'static str,
    pub metric_type: MetricKind,
    pub current_value: Option<f64>,
    pub baseline_value: Option<f64>,
    pub percentage_change: Option<f64>,
    pub historical_data: Vec<HistoricalPoint>,
    pub units: Option<String>,
    pub last_updated: Option<String>,
    pub analysis: Option<String>,
    pub series_id: Option<String>,
}

impl DisplayMetric {
    pub fn formatted_value(&self) -> String {
        match self.current_value {
            Some(value) => format!("{:.2}", value),
            None => "N/A".to_string(),
        }
    }

    pub fn formatted_change(&self) -> String {
        match self.percentage_change {
            Some(change) if change > 0.0 => format!("+{:.2}%", change),
            Some(change) => format!("{:.2}%", change),
            None => "N/A".to_string(),
        }
    }

    pub fn trend(&self) -> Trend {
        match self.percentage_change {
            Some(change) if change > 0.0 => Trend::Rising,
            Some(_) => Trend::Falling,
            None => Trend::Unknown,
        }
    }

    pub fn last_updated_or_unknown(&self) -> &str {
        self.last_updated.as_deref().unwrap_or("Unknown")
    }

    /// Historical values only, in chart order
    pub fn history_values(&self) -> Vec<f64> {
        self.historical_data.iter().map(|point| point.value).collect()
    }
}
