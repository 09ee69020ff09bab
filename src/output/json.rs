use super::{FrameSink, RenderedFrame};
use crate::error::Result;
use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

/// Appends one JSON object per frame.
pub struct JsonLinesSink {
    file: File,
}

impl JsonLinesSink {
    pub fn new(path: PathBuf) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file })
    }
}

#[async_trait]
impl FrameSink for JsonLinesSink {
    async fn write(&mut self, frame: &RenderedFrame) -> Result<()> {
        serde_json::to_writer(&mut self.file, frame)?;
        writeln!(self.file)?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.file.flush()?;
        Ok(())
    }
}
