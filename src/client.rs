use crate::config::TimeRange;
use crate::error::{Error, Result};
use crate::snapshot::Snapshot;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use url::Url;

/// Where a controller gets its snapshots from.
///
/// `Ok(None)` means the API answered with a `null` body.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self, shop_id: &str, time_range: TimeRange) -> Result<Option<Snapshot>>;
}

pub struct HttpSnapshotSource {
    endpoint: String,
    client: Client,
}

impl HttpSnapshotSource {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        // No timeout: a fetch lasts as long as the transport allows.
        let client = Client::builder()
            .user_agent(concat!("analytics-dashboard/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::with_client(endpoint, client))
    }

    pub fn with_client(endpoint: impl Into<String>, client: Client) -> Self {
        Self {
            endpoint: endpoint.into(),
            client,
        }
    }

    /// `{endpoint}/stats?shop=..&timeRange=..`
    pub fn stats_url(&self, shop_id: &str, time_range: TimeRange) -> Result<Url> {
        let base = format!("{}/stats", self.endpoint.trim_end_matches('/'));
        let mut url = Url::parse(&base)
            .map_err(|e| Error::Config(format!("Invalid endpoint {}: {}", self.endpoint, e)))?;

        url.query_pairs_mut()
            .append_pair("shop", shop_id)
            .append_pair("timeRange", time_range.as_str());

        Ok(url)
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn fetch(&self, shop_id: &str, time_range: TimeRange) -> Result<Option<Snapshot>> {
        let url = self.stats_url(shop_id, time_range)?;
        log::debug!("Fetching {}", url);

        let res = self
            .client
            .get(url)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            // hyper only keeps the phrase when it differs from the canonical one.
            let reason = match res.extensions().get::<hyper::ext::ReasonPhrase>() {
                Some(phrase) => String::from_utf8_lossy(phrase.as_bytes()).into_owned(),
                None => status.canonical_reason().unwrap_or_default().to_string(),
            };
            return Err(Error::Api {
                status: status.as_u16(),
                reason,
            });
        }

        let body = res.bytes().await?;
        log::debug!("Snapshot length: {} bytes", body.len());

        Ok(serde_json::from_slice(&body)?)
    }
}
