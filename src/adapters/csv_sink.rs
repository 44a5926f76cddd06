use super::staged::StagedBatch;
use crate::core::transform::stringify;
use crate::domain::model::{Row, Value};
use crate::domain::ports::Sink;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::io::AsyncWrite;

/// CSV (or TSV) writer sink.
///
/// The header line comes from [`with_header`](CsvSink::with_header) or, if
/// none was given, from the keys of the first keyed row. Keyed rows are
/// written in header order; missing fields become empty cells. Records may
/// differ in width, so the output never depends on where batches split.
///
/// A write that fails partway is resumed by the next `bulk_insert` with the
/// same leading rows; bytes already written are not repeated.
pub struct CsvSink<W> {
    writer: W,
    header: Option<Vec<String>>,
    header_written: bool,
    delimiter: u8,
    staged: StagedBatch,
}

impl<W: AsyncWrite + Unpin + Send> CsvSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            header: None,
            header_written: false,
            delimiter: b',',
            staged: StagedBatch::default(),
        }
    }

    pub fn with_header<I, T>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.header = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    fn encode(&mut self, rows: &[Row]) -> Result<Vec<u8>> {
        let mut csv = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_writer(Vec::new());
        let mut header_written = self.header_written;

        for row in rows {
            if !header_written {
                if self.header.is_none() {
                    self.header = row
                        .as_keyed()
                        .map(|fields| fields.keys().map(str::to_string).collect());
                }
                if let Some(header) = &self.header {
                    csv.write_record(header)?;
                }
                header_written = true;
            }

            let cells: Vec<String> = match (row.as_keyed(), &self.header) {
                (Some(fields), Some(header)) => header
                    .iter()
                    .map(|name| fields.get(name).map(cell).unwrap_or_default())
                    .collect(),
                _ => row.values().iter().map(cell).collect(),
            };
            csv.write_record(&cells)?;
        }

        let bytes = csv
            .into_inner()
            .map_err(|e| EtlError::sink("csv", e.to_string()))?;
        self.header_written = header_written;
        Ok(bytes)
    }
}

impl CsvSink<tokio::fs::File> {
    pub async fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = tokio::fs::File::create(path).await?;
        Ok(Self::new(file))
    }
}

fn cell(value: &Value) -> String {
    stringify(value).unwrap_or_default()
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> Sink for CsvSink<W> {
    async fn bulk_insert(&mut self, rows: &[Row]) -> Result<()> {
        let fresh = self.staged.fresh(rows);
        let bytes = self.encode(fresh)?;
        self.staged.stage(&bytes, rows.len());

        if let Err(e) = self.staged.drain(&mut self.writer).await {
            tracing::warn!(
                sink = "csv",
                unwritten = self.staged.pending(),
                "Write interrupted, remaining bytes kept for the next flush"
            );
            return Err(e);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "csv"
    }
}
