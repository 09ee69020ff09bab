//! Explicit construction of the dashboard instances found in a page.

use crate::config::{BootstrapConfig, DashboardConfig, DashboardOptions};
use crate::controller::{ControlEvent, DashboardController, RefreshOutcome};
use crate::error::{Error, Result};
use crate::page::{self, BoundRegion, Variant};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Binds every variant present in `html`: at most one full dashboard and one widget.
pub fn discover(html: &str) -> Vec<BoundRegion> {
    Variant::ALL
        .iter()
        .filter_map(|variant| match page::bind(html, *variant) {
            Ok(region) => {
                log::info!("Found analytics {}", variant);
                Some(region)
            }
            Err(Error::MissingContainer(selector)) => {
                log::debug!("No {} element ({}) in page", variant, selector);
                None
            }
            Err(e) => {
                log::error!("Failed to bind {}: {}", variant, e);
                None
            }
        })
        .collect()
}

pub fn options_for(config: &BootstrapConfig, variant: Variant) -> &DashboardOptions {
    match variant {
        Variant::Full => &config.dashboard,
        Variant::Widget => &config.widget,
    }
}

/// Resolves the instance's settings and wires it to the HTTP API.
pub fn controller_for(
    region: BoundRegion,
    options: &DashboardOptions,
) -> Result<DashboardController> {
    let config = DashboardConfig::resolve(options, &region.attributes)?;
    DashboardController::with_http_source(region.variant.name(), config, Box::new(region.view))
}

/// Initializes `controller` on its own task, so a slow first fetch in one
/// instance does not hold back the others.
pub fn spawn_instance(
    controller: Arc<DashboardController>,
    controls: mpsc::Receiver<ControlEvent>,
) -> JoinHandle<RefreshOutcome> {
    tokio::spawn(async move {
        let outcome = controller.initialize(controls).await;
        log::info!("[{}] First refresh: {}", controller.name(), outcome.label());
        outcome
    })
}
