use super::{FrameSink, RenderedFrame};
use crate::error::{Error, Result};
use async_trait::async_trait;
use indicatif::MultiProgress;
use std::sync::Arc;

pub struct ConsoleSink {
    multi: Option<Arc<MultiProgress>>,
}

impl ConsoleSink {
    pub fn new(multi: Option<Arc<MultiProgress>>) -> Self {
        Self { multi }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl FrameSink for ConsoleSink {
    async fn write(&mut self, frame: &RenderedFrame) -> Result<()> {
        let output = serde_json::to_string_pretty(frame)?;

        match &self.multi {
            Some(multi) => {
                for line in output.lines() {
                    multi.println(line).map_err(|e| Error::Internal(e.to_string()))?;
                }
            }
            None => println!("{}", output),
        }
        Ok(())
    }
}
