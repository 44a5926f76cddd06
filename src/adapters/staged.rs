use crate::domain::model::Row;
use crate::utils::error::Result;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Encoded bytes of a batch that have not fully reached the writer.
///
/// A failed write keeps the unwritten tail together with the number of rows
/// already encoded. The next call resumes from there instead of encoding
/// those rows again, so a retried buffer never duplicates output. Callers
/// retrying a failed batch must pass the same leading rows, as
/// `BatchLoader` does.
#[derive(Debug, Default)]
pub(crate) struct StagedBatch {
    bytes: Vec<u8>,
    written: usize,
    rows: usize,
}

impl StagedBatch {
    /// Rows of `rows` that are not encoded yet.
    pub fn fresh<'a>(&self, rows: &'a [Row]) -> &'a [Row] {
        &rows[self.rows.min(rows.len())..]
    }

    pub fn stage(&mut self, bytes: &[u8], total_rows: usize) {
        self.bytes.extend_from_slice(bytes);
        self.rows = total_rows;
    }

    pub fn pending(&self) -> usize {
        self.bytes.len() - self.written
    }

    /// Writes the remaining bytes and flushes. The stage is cleared only
    /// once everything reached the writer.
    pub async fn drain<W: AsyncWrite + Unpin>(&mut self, writer: &mut W) -> Result<()> {
        while self.written < self.bytes.len() {
            let n = writer.write(&self.bytes[self.written..]).await?;
            if n == 0 {
                return Err(std::io::Error::from(std::io::ErrorKind::WriteZero).into());
            }
            self.written += n;
        }
        writer.flush().await?;

        *self = StagedBatch::default();
        Ok(())
    }
}
