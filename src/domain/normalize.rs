//! Validated `metrics` object -> fixed list of display metrics
//!
//! Pure transform. Output always has one entry per `MetricKind`, in
//! `MetricKind::ALL` order, whatever keys the payload carried. A missing or
//! non-object `metrics` section never gets here: `MetricsEnvelope` rejects it.

use crate::domain::metric::{DisplayMetric, HistoricalPoint, MetricKind};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Normalize the `metrics` object of a validated envelope
pub fn normalize(
    metrics: &Map<String, Value>,
    envelope_analysis: Option<&str>,
) -> [DisplayMetric; 5] {
    for key in metrics.keys() {
        if MetricKind::from_key(key).is_none() {
            debug!(key = %key, "normalize_unknown_metric_ignored");
        }
    }

    MetricKind::ALL.map(|kind| {
        let record = match metrics.get(kind.key()) {
            Some(Value::Object(record)) => Some(record),
            Some(other) => {
                warn!(metric = %kind, found = %json_type(other), "normalize_metric_not_object");
                None
            }
            None => None,
        };
        normalize_one(kind, record, envelope_analysis)
    })
}

fn normalize_one(
    kind: MetricKind,
    record: Option<&Map<String, Value>>,
    envelope_analysis: Option<&str>,
) -> DisplayMetric {
    let field = |name: &str| record.and_then(|r| r.get(name));
    let text = |name: &str| field(name).and_then(Value::as_str).map(str::to_string);
    let number = |name: &str| field(name).and_then(Value::as_f64);

    DisplayMetric {
        id: kind,
        title: text("title").unwrap_or_else(|| kind.default_title().to_string()),
        description: kind.description(),
        metric_type: kind,
        current_value: number("current_value"),
        baseline_value: number("baseline_value"),
        percentage_change: number("percentage_change"),
        historical_data: field("historical_data").map(|v| history(kind, v)).unwrap_or_default(),
        units: text("units"),
        last_updated: text("last_updated"),
        analysis: text("analysis").or_else(|| envelope_analysis.map(str::to_string)),
        series_id: text("series_id"),
    }
}

fn history(kind: MetricKind, value: &Value) -> Vec<HistoricalPoint> {
    let Value::Array(points) = value else {
        return Vec::new();
    };

    let parsed: Vec<HistoricalPoint> = points
        .iter()
        .filter_map(|point| {
            let date = point.get("date")?.as_str()?;
            let value = point.get("value")?.as_f64()?;
            Some(HistoricalPoint { date: date.to_string(), value })
        })
        .collect();

    if parsed.len() != points.len() {
        debug!(
            metric = %kind,
            skipped = %(points.len() - parsed.len()),
            "normalize_history_points_skipped"
        );
    }
    parsed
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
