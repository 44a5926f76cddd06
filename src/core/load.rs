use crate::domain::model::{Frame, KeyingPolicy, Row};
use crate::domain::ports::{Loader, Sink};
use crate::utils::error::{EtlError, Result};

pub const DEFAULT_BATCH_SIZE: usize = 500;

/// 載入階段設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSettings {
    pub batch_size: usize,
    pub columns: Option<Vec<String>>,
    pub keying: KeyingPolicy,
}

impl Default for LoadSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            columns: None,
            keying: KeyingPolicy::Strict,
        }
    }
}

impl LoadSettings {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(EtlError::invalid_argument("Batch size must be at least 1"));
        }
        if matches!(&self.columns, Some(columns) if columns.is_empty()) {
            return Err(EtlError::invalid_argument("Output column names cannot be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub frames_accepted: usize,
    pub flushes: usize,
    pub rows_written: usize,
}

/// Buffers shaped rows and writes them to the sink in bulk.
///
/// A flush happens when the buffer reaches the batch size or when the frame
/// just accepted carries the end-of-stream marker, whichever comes first.
/// If the sink fails the buffer is kept as is and the error is returned.
pub struct BatchLoader<S: Sink> {
    sink: S,
    settings: LoadSettings,
    batch: Vec<Row>,
    count: usize,
    stats: LoadStats,
}

impl<S: Sink> BatchLoader<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            settings: LoadSettings::default(),
            batch: Vec::new(),
            count: 0,
            stats: LoadStats::default(),
        }
    }

    pub fn with_settings(sink: S, settings: LoadSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            batch: Vec::with_capacity(settings.batch_size.min(DEFAULT_BATCH_SIZE)),
            settings,
            ..Self::new(sink)
        })
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(EtlError::invalid_argument("Batch size must be at least 1"));
        }
        self.settings.batch_size = batch_size;
        Ok(self)
    }

    /// Output column names the frame values get keyed by before buffering.
    pub fn with_columns<I, T>(mut self, columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        if columns.is_empty() {
            return Err(EtlError::invalid_argument("Output column names cannot be empty"));
        }
        self.settings.columns = Some(columns);
        Ok(self)
    }

    pub fn with_keying_policy(mut self, policy: KeyingPolicy) -> Self {
        self.settings.keying = policy;
        self
    }

    pub async fn accept(&mut self, frame: &Frame) -> Result<()> {
        let row = self.shape(frame)?;
        self.batch.push(row);
        self.count += 1;
        self.stats.frames_accepted += 1;

        if self.count >= self.settings.batch_size || frame.is_end() {
            self.flush().await?;
        }

        Ok(())
    }

    fn shape(&self, frame: &Frame) -> Result<Row> {
        match &self.settings.columns {
            Some(columns) => frame.data().keyed_by(columns, self.settings.keying),
            None => Ok(frame.data().clone()),
        }
    }

    async fn flush(&mut self) -> Result<()> {
        tracing::debug!(
            sink = self.sink.name(),
            rows = self.batch.len(),
            "Flushing batch"
        );

        if let Err(e) = self.sink.bulk_insert(&self.batch).await {
            tracing::warn!(
                sink = self.sink.name(),
                rows = self.batch.len(),
                "Bulk insert failed, batch kept: {}",
                e
            );
            return Err(e);
        }

        self.stats.flushes += 1;
        self.stats.rows_written += self.batch.len();
        self.count = 0;
        self.batch.clear();
        Ok(())
    }

    pub fn batch_size(&self) -> usize {
        self.settings.batch_size
    }

    pub fn columns(&self) -> Option<&[String]> {
        self.settings.columns.as_deref()
    }

    /// Rows waiting for the next flush.
    pub fn buffered(&self) -> &[Row] {
        &self.batch
    }

    pub fn pending(&self) -> usize {
        self.count
    }

    pub fn stats(&self) -> LoadStats {
        self.stats
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

#[async_trait::async_trait]
impl<S: Sink> Loader for BatchLoader<S> {
    async fn load(&mut self, frame: &Frame) -> Result<()> {
        self.accept(frame).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemorySink;
    use crate::domain::model::FrameData;
    use serde_json::json;

    fn frame(values: Vec<serde_json::Value>) -> Frame {
        Frame::new().with_data(values).unwrap()
    }

    #[tokio::test]
    async fn test_buffers_below_threshold() {
        let mut loader = BatchLoader::new(MemorySink::new()).with_batch_size(3).unwrap();

        loader.accept(&frame(vec![json!(1)])).await.unwrap();
        loader.accept(&frame(vec![json!(2)])).await.unwrap();

        assert_eq!(loader.pending(), 2);
        assert_eq!(loader.buffered().len(), 2);
        assert!(loader.sink().batches().is_empty());
    }

    #[tokio::test]
    async fn test_threshold_flush_empties_buffer() {
        let mut loader = BatchLoader::new(MemorySink::new()).with_batch_size(3).unwrap();

        for i in 0..3 {
            loader.accept(&frame(vec![json!(i)])).await.unwrap();
        }

        assert_eq!(loader.sink().batches().len(), 1);
        assert_eq!(loader.sink().batches()[0].len(), 3);
        assert_eq!(loader.pending(), 0);
        assert!(loader.buffered().is_empty());
    }

    #[tokio::test]
    async fn test_end_marker_forces_flush() {
        let mut loader = BatchLoader::new(MemorySink::new());

        loader.accept(&frame(vec![json!("a")])).await.unwrap();
        let mut last = frame(vec![json!("b")]);
        last.set_end();
        loader.accept(&last).await.unwrap();

        let batches = loader.sink().batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(
            batches[0],
            vec![
                FrameData::Positional(vec![json!("a")]),
                FrameData::Positional(vec![json!("b")])
            ]
        );
    }

    #[tokio::test]
    async fn test_columns_rekey_rows() {
        let mut loader = BatchLoader::new(MemorySink::new())
            .with_columns(["user_id", "user_name"])
            .unwrap();

        let mut keyed = Frame::new()
            .with_header(["id", "name"])
            .with_data(vec![json!(1), json!("Ada")])
            .unwrap();
        keyed.set_end();
        loader.accept(&keyed).await.unwrap();

        let row = &loader.sink().batches()[0][0];
        let fields = row.as_keyed().unwrap();
        assert_eq!(fields.keys().collect::<Vec<_>>(), vec!["user_id", "user_name"]);
        assert_eq!(fields.get("user_name"), Some(&json!("Ada")));
    }

    #[tokio::test]
    async fn test_column_mismatch_leaves_state_untouched() {
        let mut loader = BatchLoader::new(MemorySink::new())
            .with_columns(["a", "b"])
            .unwrap();

        let err = loader.accept(&frame(vec![json!(1)])).await.unwrap_err();

        assert!(matches!(err, EtlError::HeaderLengthMismatch { .. }));
        assert_eq!(loader.pending(), 0);
        assert!(loader.buffered().is_empty());
    }

    #[tokio::test]
    async fn test_column_mismatch_truncates_when_allowed() {
        let mut loader = BatchLoader::new(MemorySink::new())
            .with_columns(["a", "b"])
            .unwrap()
            .with_keying_policy(KeyingPolicy::Truncate);

        loader.accept(&frame(vec![json!(1)])).await.unwrap();
        assert_eq!(loader.buffered()[0].len(), 1);
    }

    #[tokio::test]
    async fn test_sink_failure_keeps_buffer() {
        let mut loader = BatchLoader::new(MemorySink::failing_on_call(1))
            .with_batch_size(2)
            .unwrap();

        loader.accept(&frame(vec![json!(1)])).await.unwrap();
        let err = loader.accept(&frame(vec![json!(2)])).await.unwrap_err();

        assert!(matches!(err, EtlError::SinkError { .. }));
        assert_eq!(loader.buffered().len(), 2);
        assert_eq!(loader.stats().flushes, 0);

        // 下一次 flush 會把整批重新寫入
        let mut last = frame(vec![json!(3)]);
        last.set_end();
        loader.accept(&last).await.unwrap();
        assert_eq!(loader.sink().batches()[0].len(), 3);
        assert_eq!(loader.stats().rows_written, 3);
    }

    #[test]
    fn test_invalid_settings_are_rejected() {
        assert!(BatchLoader::new(MemorySink::new()).with_batch_size(0).is_err());
        assert!(BatchLoader::new(MemorySink::new())
            .with_columns(Vec::<String>::new())
            .is_err());

        let settings = LoadSettings {
            columns: Some(vec![]),
            ..LoadSettings::default()
        };
        assert!(matches!(
            BatchLoader::with_settings(MemorySink::new(), settings),
            Err(EtlError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_default_batch_size() {
        let loader = BatchLoader::new(MemorySink::new());
        assert_eq!(loader.batch_size(), 500);
        assert!(loader.columns().is_none());
    }
}
