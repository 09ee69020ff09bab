use std::fmt;

pub mod memory;

pub use memory::MemoryView;

/// A named list-shaped area of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    VisitorsList,
    TopPages,
    EntryPages,
    ExitPages,
    TrafficSources,
    Devices,
    Browsers,
    Geography,
    VisitorsMap,
}

impl Section {
    pub const ALL: [Section; 9] = [
        Section::VisitorsList,
        Section::TopPages,
        Section::EntryPages,
        Section::ExitPages,
        Section::TrafficSources,
        Section::Devices,
        Section::Browsers,
        Section::Geography,
        Section::VisitorsMap,
    ];

    /// Attribute marking the section's element in a page.
    pub fn attribute(&self) -> &'static str {
        match self {
            Section::VisitorsList => "data-visitors-list",
            Section::TopPages => "data-top-pages",
            Section::EntryPages => "data-entry-pages",
            Section::ExitPages => "data-exit-pages",
            Section::TrafficSources => "data-traffic-sources",
            Section::Devices => "data-devices",
            Section::Browsers => "data-browsers",
            Section::Geography => "data-geography",
            Section::VisitorsMap => "data-visitors-map",
        }
    }

    /// Message rendered when the section has nothing to show.
    pub fn empty_message(&self) -> &'static str {
        match self {
            Section::VisitorsList => "No active visitors",
            Section::TopPages => "No page data available",
            Section::EntryPages => "No entry page data",
            Section::ExitPages => "No exit page data",
            Section::TrafficSources => "No traffic source data",
            Section::Devices => "No device data",
            Section::Browsers => "No browser data",
            Section::Geography => "No geographic data",
            Section::VisitorsMap => "No active visitors to display on map",
        }
    }
}

/// Key of an optional sub-region inside the bound region.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Region {
    Section(Section),
    Metric(String),
    MetricChange(String),
}

impl Region {
    pub fn metric(name: impl Into<String>) -> Self {
        Region::Metric(name.into())
    }

    pub fn metric_change(name: impl Into<String>) -> Self {
        Region::MetricChange(name.into())
    }
}

impl From<Section> for Region {
    fn from(section: Section) -> Self {
        Region::Section(section)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Section(section) => write!(f, "{}", section.attribute()),
            Region::Metric(name) => write!(f, "data-metric={}", name),
            Region::MetricChange(name) => write!(f, "data-metric-change={}", name),
        }
    }
}

/// A loading placeholder. Once replaced by an error message it is no longer
/// a placeholder and later loading or error calls leave it alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadingSlot {
    pub visible: bool,
    pub replaced_by: Option<String>,
}

/// What the controller may do to the page it is bound to.
///
/// Writes to a region that does not exist are ignored.
pub trait DashboardView: Send {
    fn regions(&self) -> Vec<Region>;

    fn contains(&self, region: &Region) -> bool;

    fn text(&self, region: &Region) -> Option<String>;
    fn set_text(&mut self, region: &Region, text: &str);

    fn markup(&self, region: &Region) -> Option<String>;
    fn set_markup(&mut self, region: &Region, markup: String);

    fn class(&self, region: &Region) -> Option<String>;
    fn set_class(&mut self, region: &Region, class: &str);

    /// Names carried by every `data-metric` element, in page order.
    fn metric_names(&self) -> Vec<String>;

    /// Makes every loading placeholder visible. Returns how many there were.
    fn show_loading(&mut self) -> usize;

    fn loading(&self) -> Vec<LoadingSlot>;

    /// Swaps every loading placeholder for `markup`. Returns how many were replaced.
    fn replace_loading(&mut self, markup: &str) -> usize;

    fn has_refresh_control(&self) -> bool;

    /// Current value of the time-range selector, if the page has one.
    fn time_range_control(&self) -> Option<String>;
}
