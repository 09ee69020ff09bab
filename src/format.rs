//! Text formatting for rendered analytics values.
//!
//! Numbers coming out of a snapshot are loosely typed JSON, so every helper here
//! works on `f64` and prints the way a browser would print the same number.

use chrono::{DateTime, Utc};
use serde_json::Value;

pub const BOUNCE_RATE: &str = "bounce_rate";
pub const AVG_SESSION_TIME: &str = "avg_session_time";
pub const PAGES_PER_SESSION: &str = "pages_per_session";

pub const POSITIVE_CHANGE_CLASS: &str = "metric-change positive";
pub const NEGATIVE_CHANGE_CLASS: &str = "metric-change negative";

/// Formats a metric value according to the rule for its name.
///
/// Non-numeric values are written as their plain text.
pub fn format_metric_value(name: &str, value: &Value) -> String {
    let Some(number) = value.as_f64() else {
        return value_text(value);
    };

    match name {
        BOUNCE_RATE => format!("{}%", to_fixed(number, 1)),
        AVG_SESSION_TIME => format_duration(number),
        PAGES_PER_SESSION => to_fixed(number, 1),
        _ => locale_number(number),
    }
}

/// `"Ns"` under a minute, `"Nm Ns"` under an hour, `"Nh Nm"` otherwise.
pub fn format_duration(seconds: f64) -> String {
    if seconds < 60.0 {
        format!("{}s", js_number(round_half_up(seconds)))
    } else if seconds < 3600.0 {
        let mins = (seconds / 60.0).floor();
        let secs = round_half_up(seconds % 60.0);
        format!("{}m {}s", js_number(mins), js_number(secs))
    } else {
        let hours = (seconds / 3600.0).floor();
        let mins = ((seconds % 3600.0) / 60.0).floor();
        format!("{}h {}m", js_number(hours), js_number(mins))
    }
}

/// Signed percentage text plus the style class for a metric delta.
/// Zero counts as positive.
pub fn format_change(change: f64) -> (String, &'static str) {
    let text = if change > 0.0 {
        format!("+{}%", js_number(change))
    } else {
        format!("{}%", js_number(change))
    };
    let class = if change >= 0.0 {
        POSITIVE_CHANGE_CLASS
    } else {
        NEGATIVE_CHANGE_CLASS
    };
    (text, class)
}

/// Relative time in the coarsest applicable unit.
pub fn format_time_ago(timestamp_ms: Option<i64>, now: DateTime<Utc>) -> String {
    let Some(timestamp_ms) = timestamp_ms else {
        return "Just now".to_string();
    };

    let Some(elapsed_ms) = now.timestamp_millis().checked_sub(timestamp_ms) else {
        return "Just now".to_string();
    };
    let seconds = elapsed_ms.div_euclid(1000);

    if seconds < 60 {
        "Just now".to_string()
    } else if seconds < 3600 {
        format!("{}m ago", seconds / 60)
    } else if seconds < 86400 {
        format!("{}h ago", seconds / 3600)
    } else {
        format!("{}d ago", seconds / 86400)
    }
}

/// Reads a `lastSeen`-style timestamp: epoch milliseconds or RFC 3339 text.
/// Zero, empty, unparsable and out-of-range values count as absent.
pub fn timestamp_millis(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .filter(|ms| ms.is_finite() && *ms != 0.0)
            .and_then(|ms| DateTime::from_timestamp_millis(ms as i64))
            .map(|dt| dt.timestamp_millis()),
        Value::String(s) if !s.is_empty() => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.timestamp_millis())
            .ok(),
        _ => None,
    }
}

pub fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Fixed-point text with `digits` decimals. Exact halves round away from zero.
pub fn to_fixed(value: f64, digits: usize) -> String {
    if !value.is_finite() {
        return js_number(value);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    let mut magnitude = value.abs();

    // `{:.N}` prints the exact binary value, so a tie shows up as a 5
    // followed only by zeros.
    let expanded = format!("{:.*}", digits + 32, magnitude);
    let tail = &expanded[expanded.len() - 32..];
    if tail.starts_with('5') && tail[1..].bytes().all(|b| b == b'0') {
        magnitude = f64::from_bits(magnitude.to_bits() + 1);
    }

    format!("{}{:.*}", sign, digits, magnitude)
}

/// Prints a number the way a browser stringifies it: whole numbers have no
/// fractional part and negative zero prints as `0`.
pub fn js_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    if value.fract() == 0.0 && value.abs() < 1e21 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}

/// en-US grouped number with at most three fraction digits.
pub fn locale_number(value: f64) -> String {
    if !value.is_finite() {
        return js_number(value);
    }

    let fixed = to_fixed(value.abs(), 3);
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let fraction = fraction.trim_end_matches('0');

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let is_zero = whole.chars().all(|c| c == '0') && fraction.is_empty();
    let sign = if value < 0.0 && !is_zero { "-" } else { "" };

    if fraction.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{fraction}")
    }
}

/// Plain text of a JSON scalar as it would appear when interpolated into markup.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.as_f64().map(js_number).unwrap_or_else(|| n.to_string()),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}
