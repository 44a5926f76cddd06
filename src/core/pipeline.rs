use crate::domain::model::Frame;
use crate::domain::ports::{Loader, Transformer};
use crate::utils::error::{EtlError, Result};
use std::iter::Peekable;
use std::time::{Duration, Instant};

/// Pipeline 執行摘要
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: usize,
    pub duration: Duration,
}

/// Sequential stage chain: every frame goes through all transformers, in
/// registration order, and then into the loader before the next one is
/// pulled.
pub struct Pipeline<L: Loader> {
    name: String,
    transformers: Vec<Box<dyn Transformer>>,
    loader: L,
}

impl<L: Loader> Pipeline<L> {
    pub fn new(name: impl Into<String>, loader: L) -> Self {
        Self {
            name: name.into(),
            transformers: Vec::new(),
            loader,
        }
    }

    pub fn with_transformer<T: Transformer + 'static>(mut self, transformer: T) -> Self {
        self.transformers.push(Box::new(transformer));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage_count(&self) -> usize {
        self.transformers.len()
    }

    /// Runs a single frame through the chain and hands it to the loader.
    pub async fn process(&mut self, mut frame: Frame) -> Result<()> {
        let end = frame.is_end();

        for transformer in &self.transformers {
            frame = transformer.apply(frame)?;

            // 結束標記只能設定，不能被任何階段清除
            if end && !frame.is_end() {
                return Err(EtlError::EndMarkerCleared {
                    stage: transformer.name().to_string(),
                });
            }
        }

        self.loader.load(&frame).await
    }

    pub async fn run<I>(&mut self, frames: I) -> Result<RunSummary>
    where
        I: IntoIterator<Item = Frame>,
    {
        let start = Instant::now();
        let mut count = 0;
        tracing::info!(
            pipeline = %self.name,
            stages = self.transformers.len(),
            "Starting pipeline"
        );

        for frame in frames {
            count += 1;
            if let Err(e) = self.process(frame).await {
                tracing::error!(
                    pipeline = %self.name,
                    frame = count,
                    category = ?e.category(),
                    "Pipeline stopped: {}",
                    e
                );
                return Err(e);
            }
        }

        let summary = RunSummary {
            frames: count,
            duration: start.elapsed(),
        };
        tracing::info!(
            pipeline = %self.name,
            frames = summary.frames,
            "Pipeline finished in {:?}",
            summary.duration
        );
        Ok(summary)
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    pub fn into_loader(self) -> L {
        self.loader
    }
}

/// Iterator adaptor that latches the end-of-stream marker on the final
/// frame of an in-memory sequence.
pub struct WithEndMarker<I: Iterator<Item = Frame>> {
    inner: Peekable<I>,
}

impl<I: Iterator<Item = Frame>> Iterator for WithEndMarker<I> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        let mut frame = self.inner.next()?;
        if self.inner.peek().is_none() {
            frame.set_end();
        }
        Some(frame)
    }
}

pub fn with_end_marker<I>(frames: I) -> WithEndMarker<I::IntoIter>
where
    I: IntoIterator<Item = Frame>,
{
    WithEndMarker {
        inner: frames.into_iter().peekable(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemorySink;
    use crate::core::load::BatchLoader;
    use crate::core::transform::TrimTransformer;
    use serde_json::json;

    fn frames(values: &[&str]) -> Vec<Frame> {
        values
            .iter()
            .map(|value| Frame::new().with_data(vec![json!(value)]).unwrap())
            .collect()
    }

    #[test]
    fn test_with_end_marker_latches_last_frame_only() {
        let marked: Vec<Frame> = with_end_marker(frames(&["a", "b", "c"])).collect();

        assert_eq!(marked.len(), 3);
        assert!(!marked[0].is_end());
        assert!(!marked[1].is_end());
        assert!(marked[2].is_end());
    }

    #[test]
    fn test_with_end_marker_empty_stream() {
        assert_eq!(with_end_marker(Vec::<Frame>::new()).count(), 0);
    }

    #[tokio::test]
    async fn test_stages_run_in_order() {
        let loader = BatchLoader::new(MemorySink::new());
        let mut pipeline = Pipeline::new("ordered", loader)
            .with_transformer(|mut frame: Frame| -> Result<Frame> {
                frame.set_data(vec![json!("  padded  ")])?;
                Ok(frame)
            })
            .with_transformer(TrimTransformer::new().transform_column(0usize, None, None));

        let mut frame = Frame::new();
        frame.set_end();
        pipeline.process(frame).await.unwrap();

        let sink = pipeline.into_loader().into_sink();
        assert_eq!(sink.batches()[0][0].values(), vec![json!("padded")]);
    }

    #[tokio::test]
    async fn test_clearing_end_marker_is_rejected() {
        let loader = BatchLoader::new(MemorySink::new());
        let mut pipeline =
            Pipeline::new("reset", loader).with_transformer(|frame: Frame| -> Result<Frame> {
                Ok(Frame::new().with_data(frame.data().values())?)
            });

        let mut frame = Frame::new().with_data(vec![json!(1)]).unwrap();
        frame.set_end();

        let err = pipeline.process(frame).await.unwrap_err();
        assert!(matches!(err, EtlError::EndMarkerCleared { stage } if stage == "transformer"));
        assert!(pipeline.loader().buffered().is_empty());
    }

    #[tokio::test]
    async fn test_run_returns_summary() {
        let loader = BatchLoader::new(MemorySink::new()).with_batch_size(2).unwrap();
        let mut pipeline = Pipeline::new("summary", loader);

        let summary = pipeline
            .run(with_end_marker(frames(&["a", "b", "c"])))
            .await
            .unwrap();

        assert_eq!(summary.frames, 3);
        assert_eq!(pipeline.loader().stats().flushes, 2);
    }
}
