use super::staged::StagedBatch;
use crate::domain::model::Row;
use crate::domain::ports::Sink;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;
use tokio::io::AsyncWrite;

/// Writes each row as one JSON document per line. Every batch is encoded
/// up front and then written followed by a flush; an interrupted write is
/// resumed by the next call.
pub struct JsonLinesSink<W> {
    writer: W,
    staged: StagedBatch,
}

impl<W: AsyncWrite + Unpin + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            staged: StagedBatch::default(),
        }
    }
}

impl JsonLinesSink<tokio::fs::File> {
    pub async fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = tokio::fs::File::create(path).await?;
        Ok(Self::new(file))
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> Sink for JsonLinesSink<W> {
    async fn bulk_insert(&mut self, rows: &[Row]) -> Result<()> {
        let mut buffer = Vec::new();
        for row in self.staged.fresh(rows) {
            serde_json::to_writer(&mut buffer, row)?;
            buffer.push(b'\n');
        }
        self.staged.stage(&buffer, rows.len());

        if let Err(e) = self.staged.drain(&mut self.writer).await {
            tracing::warn!(
                sink = "jsonl",
                unwritten = self.staged.pending(),
                "Write interrupted, remaining bytes kept for the next flush"
            );
            return Err(e);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "jsonl"
    }
}
