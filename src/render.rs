//! Projection of a [`Snapshot`] onto the regions of a [`DashboardView`].
//!
//! Each section is rendered independently. A section whose region is missing from
//! the view is skipped, so partial layouts render whatever they contain.

use crate::error::{Error, Result};
use crate::format::{
    escape_html, format_change, format_metric_value, format_time_ago, timestamp_millis, to_fixed,
};
use crate::snapshot::{Record, Snapshot};
use crate::view::{DashboardView, Region, Section};
use chrono::{DateTime, Utc};
use serde_json::Value;

pub const METRIC_PLACEHOLDER: &str = "-";

/// Renders `snapshot` into every region present in `view`.
///
/// An absent snapshot replaces the loading placeholders with a "No data available"
/// error and returns [`Error::NoData`].
pub fn render(
    view: &mut dyn DashboardView,
    snapshot: Option<&Snapshot>,
    now: DateTime<Utc>,
) -> Result<()> {
    let Some(snapshot) = snapshot else {
        show_error(view, &Error::NoData.to_string());
        return Err(Error::NoData);
    };

    render_metrics(view, snapshot);

    for section in Section::ALL {
        let region = Region::Section(section);
        if view.contains(&region) {
            view.set_markup(&region, section_markup(section, snapshot, now));
        } else {
            log::trace!("No {} region, skipping", section.attribute());
        }
    }

    Ok(())
}

pub fn render_metrics(view: &mut dyn DashboardView, snapshot: &Snapshot) {
    for name in view.metric_names() {
        let metric = Region::metric(name.as_str());

        let Some(value) = snapshot.metric(&name) else {
            view.set_text(&metric, METRIC_PLACEHOLDER);
            continue;
        };
        view.set_text(&metric, &format_metric_value(&name, value));

        let change_region = Region::metric_change(name.as_str());
        if !view.contains(&change_region) {
            continue;
        }
        if let Some(change) = snapshot.metric_change(&name) {
            let (text, class) = format_change(change);
            view.set_text(&change_region, &text);
            view.set_class(&change_region, class);
        }
    }
}

/// Markup for one section: the fixed empty message, or one row per entry.
pub fn section_markup(section: Section, snapshot: &Snapshot, now: DateTime<Utc>) -> String {
    let rows: &[Value] = match section {
        Section::VisitorsList | Section::VisitorsMap => snapshot.active_visitors.as_slice(),
        Section::TopPages => snapshot.top_pages.as_slice(),
        Section::EntryPages => snapshot.entry_pages.as_slice(),
        Section::ExitPages => snapshot.exit_pages.as_slice(),
        Section::TrafficSources => snapshot.traffic_sources.as_slice(),
        Section::Devices => snapshot.devices.as_slice(),
        Section::Browsers => snapshot.browsers.as_slice(),
        Section::Geography => snapshot.geography.as_slice(),
    };

    if rows.is_empty() {
        return empty_markup(section);
    }

    if section == Section::VisitorsMap {
        return visitors_map(rows);
    }

    rows.iter()
        .map(|row| row_markup(section, Record(row), now))
        .collect()
}

pub fn empty_markup(section: Section) -> String {
    format!(
        r#"<div class="analytics-empty">{}</div>"#,
        section.empty_message()
    )
}

fn row_markup(section: Section, row: Record<'_>, now: DateTime<Utc>) -> String {
    match section {
        Section::VisitorsList => {
            let last_seen = row.field("lastSeen").and_then(timestamp_millis);
            format!(
                concat!(
                    r#"<div class="visitor-item">"#,
                    r#"<div class="visitor-info">"#,
                    r#"<div class="visitor-page">{}</div>"#,
                    r#"<div class="visitor-details">"#,
                    r#"<span>{}</span>"#,
                    r#"<span>{}</span></div></div>"#,
                    r#"<div class="visitor-time">{}</div></div>"#,
                ),
                escape_html(&row.text_or(&["currentPage"], "/")),
                escape_html(&row.text_or(&["device"], "Unknown")),
                escape_html(&row.text_or(&["location"], "Unknown")),
                format_time_ago(last_seen, now),
            )
        }
        Section::TopPages => format!(
            concat!(
                r#"<div class="page-item">"#,
                r#"<div class="page-url">{}</div>"#,
                r#"<div class="page-stats">"#,
                r#"<span class="page-views">{} views</span>"#,
                r#"<span>{}% bounce</span></div></div>"#,
            ),
            page_url(row),
            escape_html(&row.count("views")),
            to_fixed(row.number("bounceRate"), 1),
        ),
        Section::EntryPages => format!(
            concat!(
                r#"<div class="page-item">"#,
                r#"<div class="page-url">{}</div>"#,
                r#"<div class="page-stats">"#,
                r#"<span class="page-views">{} entries</span></div></div>"#,
            ),
            page_url(row),
            escape_html(&row.count("entries")),
        ),
        Section::ExitPages => format!(
            concat!(
                r#"<div class="page-item">"#,
                r#"<div class="page-url">{}</div>"#,
                r#"<div class="page-stats">"#,
                r#"<span class="page-views">{} exits</span></div></div>"#,
            ),
            page_url(row),
            escape_html(&row.count("exits")),
        ),
        Section::TrafficSources => format!(
            concat!(
                r#"<div class="traffic-source-item">"#,
                r#"<div class="traffic-source-name">{}</div>"#,
                r#"<div class="traffic-source-stats">"#,
                r#"<span>{} visitors</span>"#,
                r#"<span>{}%</span></div></div>"#,
            ),
            escape_html(&row.text_or(&["source"], "Direct")),
            escape_html(&row.count("visitors")),
            to_fixed(row.number("percentage"), 1),
        ),
        Section::Devices => format!(
            concat!(
                r#"<div class="device-item">"#,
                r#"<div class="device-name">{}</div>"#,
                r#"<div class="device-stats">"#,
                r#"<span>{} ({}%)</span></div></div>"#,
            ),
            escape_html(&row.text_or(&["type"], "Unknown")),
            escape_html(&row.count("count")),
            to_fixed(row.number("percentage"), 1),
        ),
        Section::Browsers => format!(
            concat!(
                r#"<div class="browser-item">"#,
                r#"<div class="browser-name">{}</div>"#,
                r#"<div class="browser-stats">"#,
                r#"<span>{} ({}%)</span></div></div>"#,
            ),
            escape_html(&row.text_or(&["name"], "Unknown")),
            escape_html(&row.count("count")),
            to_fixed(row.number("percentage"), 1),
        ),
        Section::Geography => format!(
            concat!(
                r#"<div class="geography-item">"#,
                r#"<div class="geography-country">{}</div>"#,
                r#"<div class="geography-stats">"#,
                r#"<span>{} visitors ({}%)</span></div></div>"#,
            ),
            escape_html(&row.text_or(&["country"], "Unknown")),
            escape_html(&row.count("visitors")),
            to_fixed(row.number("percentage"), 1),
        ),
        Section::VisitorsMap => String::new(),
    }
}

fn page_url(row: Record<'_>) -> String {
    escape_html(&row.text_or(&["path", "url"], ""))
}

/// Visitors grouped by location, first-seen order. Visitors without a
/// location are left out.
fn visitors_map(visitors: &[Value]) -> String {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for location in visitors.iter().filter_map(|v| Record(v).text(&["location"])) {
        match counts.iter_mut().find(|(l, _)| *l == location) {
            Some((_, count)) => *count += 1,
            None => counts.push((location, 1)),
        }
    }

    let lines: String = counts
        .iter()
        .map(|(location, count)| {
            format!(
                "<div>{}: {} visitor(s)</div>",
                escape_html(location),
                count
            )
        })
        .collect();

    format!(r#"<div style="text-align: left;">{}</div>"#, lines)
}

/// Text shown in place of loading placeholders when a refresh fails.
pub fn error_message(message: &str) -> String {
    format!("Error loading analytics: {}", message)
}

pub fn show_error(view: &mut dyn DashboardView, message: &str) -> usize {
    let markup = format!(
        r#"<div class="analytics-error">{}</div>"#,
        escape_html(&error_message(message))
    );
    view.replace_loading(&markup)
}
