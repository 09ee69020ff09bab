//! Binding a dashboard instance to its element in an HTML page.
//!
//! The page is parsed once. Everything the controller later needs from it (which
//! sub-regions exist, which metrics are shown, the controls and the `data-*`
//! settings) is copied into a [`MemoryView`].

use crate::config::RegionAttributes;
use crate::error::{Error, Result};
use crate::selector::CssSelector;
use crate::view::{MemoryView, Section};
use select::document::Document;
use select::node::Node;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DASHBOARD_CLASS: &str = "analytics-dashboard";
pub const WIDGET_CLASS: &str = "analytics-dashboard-widget";
pub const LOADING_CLASS: &str = "analytics-loading";
pub const REFRESH_BUTTON_CLASS: &str = "analytics-refresh-btn";
pub const TIME_RANGE_ATTR: &str = "data-time-range";
pub const METRIC_ATTR: &str = "data-metric";
pub const METRIC_CHANGE_ATTR: &str = "data-metric-change";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Full,
    Widget,
}

impl Variant {
    pub const ALL: [Variant; 2] = [Variant::Full, Variant::Widget];

    /// Selector of the bound element. The widget carries both classes, so the
    /// full dashboard excludes it explicitly.
    pub fn selector(&self) -> CssSelector {
        match self {
            Variant::Full => {
                CssSelector::class(DASHBOARD_CLASS).and(CssSelector::class(WIDGET_CLASS).not())
            }
            Variant::Widget => CssSelector::class(WIDGET_CLASS),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Variant::Full => "dashboard",
            Variant::Widget => "widget",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A page element claimed by one dashboard instance.
#[derive(Debug, Clone)]
pub struct BoundRegion {
    pub variant: Variant,
    pub attributes: RegionAttributes,
    pub view: MemoryView,
}

/// Locates the `variant` element in `html` and captures its sub-regions.
pub fn bind(html: &str, variant: Variant) -> Result<BoundRegion> {
    let document = Document::from(html);
    let selector = variant.selector();

    let root = document
        .find(&selector)
        .next()
        .ok_or_else(|| Error::MissingContainer(selector.to_css_string()))?;

    let attributes = RegionAttributes {
        api_url: root.attr("data-api-url").map(str::to_string),
        shop: root.attr("data-shop").map(str::to_string),
        refresh_interval: root.attr("data-refresh-interval").map(str::to_string),
    };

    Ok(BoundRegion {
        variant,
        attributes,
        view: capture_view(root),
    })
}

fn capture_view(root: Node<'_>) -> MemoryView {
    let mut view = MemoryView::new();

    for section in Section::ALL {
        if let Some(node) = root.find(CssSelector::attr(section.attribute())).next() {
            view = view.with_section_markup(section, node.inner_html());
        }
    }

    for node in root.find(CssSelector::attr(METRIC_ATTR)) {
        if let Some(name) = node.attr(METRIC_ATTR) {
            view = view.with_metric(name);
        }
    }

    for node in root.find(CssSelector::attr(METRIC_CHANGE_ATTR)) {
        if let Some(name) = node.attr(METRIC_CHANGE_ATTR) {
            view = view.with_metric_change(name, node.attr("class").map(str::to_string));
        }
    }

    for _ in root.find(CssSelector::class(LOADING_CLASS)) {
        view = view.with_loading();
    }

    if root.find(CssSelector::class(REFRESH_BUTTON_CLASS)).next().is_some() {
        view = view.with_refresh_control();
    }

    if let Some(control) = root.find(CssSelector::attr(TIME_RANGE_ATTR)).next() {
        view = view.with_time_range_control(time_range_value(control));
    }

    view
}

/// Selected option of the time-range control, else its first option, else
/// its own `value`.
fn time_range_value(control: Node<'_>) -> String {
    let option = CssSelector::tag("option");
    let chosen = control
        .find(option.clone().and(CssSelector::attr("selected")))
        .next()
        .or_else(|| control.find(&option).next());

    match chosen {
        Some(node) => node
            .attr("value")
            .map(str::to_string)
            .unwrap_or_else(|| node.text().trim().to_string()),
        None => control.attr("value").unwrap_or_default().to_string(),
    }
}
