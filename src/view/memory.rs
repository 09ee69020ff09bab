use super::{DashboardView, LoadingSlot, Region, Section};
use crate::format::escape_html;
use select::document::Document;
use select::predicate::Text;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq)]
struct Slot {
    text: String,
    markup: String,
    class: Option<String>,
}

/// In-memory bound region. Page binding fills it from an HTML document;
/// tests build it directly.
#[derive(Debug, Clone, Default)]
pub struct MemoryView {
    slots: BTreeMap<Region, Slot>,
    metric_order: Vec<String>,
    loading: Vec<LoadingSlot>,
    refresh_control: bool,
    time_range_control: Option<String>,
}

impl MemoryView {
    pub fn new() -> Self {
        Self::default()
    }

    /// A view with every section, no metrics and no controls.
    pub fn with_all_sections() -> Self {
        Section::ALL
            .iter()
            .fold(Self::new(), |view, s| view.with_section(*s))
    }

    pub fn with_section(mut self, section: Section) -> Self {
        self.slots.entry(Region::Section(section)).or_default();
        self
    }

    pub fn with_section_markup(mut self, section: Section, markup: impl Into<String>) -> Self {
        let markup = markup.into();
        self.slots.insert(
            Region::Section(section),
            Slot {
                text: markup_text(&markup),
                markup,
                class: None,
            },
        );
        self
    }

    pub fn with_metric(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.metric_order.contains(&name) {
            self.metric_order.push(name.clone());
        }
        self.slots.entry(Region::Metric(name)).or_default();
        self
    }

    pub fn with_metric_change(mut self, name: impl Into<String>, class: Option<String>) -> Self {
        let slot = self.slots.entry(Region::MetricChange(name.into())).or_default();
        slot.class = class;
        self
    }

    pub fn with_loading(mut self) -> Self {
        self.loading.push(LoadingSlot {
            visible: false,
            replaced_by: None,
        });
        self
    }

    pub fn with_refresh_control(mut self) -> Self {
        self.refresh_control = true;
        self
    }

    pub fn with_time_range_control(mut self, value: impl Into<String>) -> Self {
        self.time_range_control = Some(value.into());
        self
    }
}

impl DashboardView for MemoryView {
    fn regions(&self) -> Vec<Region> {
        self.slots.keys().cloned().collect()
    }

    fn contains(&self, region: &Region) -> bool {
        self.slots.contains_key(region)
    }

    fn text(&self, region: &Region) -> Option<String> {
        self.slots.get(region).map(|s| s.text.clone())
    }

    fn set_text(&mut self, region: &Region, text: &str) {
        if let Some(slot) = self.slots.get_mut(region) {
            slot.text = text.to_string();
            slot.markup = escape_html(text);
        }
    }

    fn markup(&self, region: &Region) -> Option<String> {
        self.slots.get(region).map(|s| s.markup.clone())
    }

    fn set_markup(&mut self, region: &Region, markup: String) {
        if let Some(slot) = self.slots.get_mut(region) {
            slot.text = markup_text(&markup);
            slot.markup = markup;
        }
    }

    fn class(&self, region: &Region) -> Option<String> {
        self.slots.get(region).and_then(|s| s.class.clone())
    }

    fn set_class(&mut self, region: &Region, class: &str) {
        if let Some(slot) = self.slots.get_mut(region) {
            slot.class = Some(class.to_string());
        }
    }

    fn metric_names(&self) -> Vec<String> {
        self.metric_order.clone()
    }

    fn show_loading(&mut self) -> usize {
        let mut shown = 0;
        for slot in self.loading.iter_mut().filter(|s| s.replaced_by.is_none()) {
            slot.visible = true;
            shown += 1;
        }
        shown
    }

    fn loading(&self) -> Vec<LoadingSlot> {
        self.loading.clone()
    }

    fn replace_loading(&mut self, markup: &str) -> usize {
        let mut replaced = 0;
        for slot in self.loading.iter_mut().filter(|s| s.replaced_by.is_none()) {
            slot.replaced_by = Some(markup.to_string());
            replaced += 1;
        }
        replaced
    }

    fn has_refresh_control(&self) -> bool {
        self.refresh_control
    }

    fn time_range_control(&self) -> Option<String> {
        self.time_range_control.clone()
    }
}

/// Text content of a markup fragment with entities decoded and whitespace collapsed.
fn markup_text(markup: &str) -> String {
    let document = Document::from(markup);
    let text = document
        .find(Text)
        .map(|node| node.text())
        .collect::<Vec<_>>()
        .join(" ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_decodes_entities() {
        let view = MemoryView::new().with_section_markup(
            Section::Devices,
            "<div><span>AT&amp;T &lt;ads&gt;</span><span>3 (0.0%)</span></div>",
        );
        assert_eq!(
            view.text(&Section::Devices.into()).as_deref(),
            Some("AT&T <ads> 3 (0.0%)")
        );
    }
}
