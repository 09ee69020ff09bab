use crate::error::Result;
use crate::view::DashboardView;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

pub mod console;
pub mod json;

/// Contents of one dashboard instance after a refresh cycle.
#[derive(Debug, Clone, Serialize)]
pub struct RenderedFrame {
    pub instance: String,
    pub time_range: String,
    pub outcome: String,
    pub captured_at: DateTime<Utc>,
    pub regions: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl RenderedFrame {
    pub fn capture(
        instance: &str,
        time_range: &str,
        outcome: &str,
        view: &dyn DashboardView,
        errors: Vec<String>,
    ) -> Self {
        let regions = view
            .regions()
            .into_iter()
            .filter_map(|region| {
                let content = view.markup(&region)?;
                Some((region.to_string(), content))
            })
            .collect();

        Self {
            instance: instance.to_string(),
            time_range: time_range.to_string(),
            outcome: outcome.to_string(),
            captured_at: Utc::now(),
            regions,
            errors,
        }
    }
}

#[async_trait]
pub trait FrameSink: Send + Sync {
    async fn write(&mut self, frame: &RenderedFrame) -> Result<()>;
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
