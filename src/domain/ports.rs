use crate::domain::model::{Frame, Row};
use crate::utils::error::Result;
use async_trait::async_trait;

/// A transform stage: takes a frame and hands back the (possibly mutated) frame.
pub trait Transformer: Send + Sync {
    fn apply(&self, frame: Frame) -> Result<Frame>;

    fn name(&self) -> &str {
        "transformer"
    }
}

impl<F> Transformer for F
where
    F: Fn(Frame) -> Result<Frame> + Send + Sync,
{
    fn apply(&self, frame: Frame) -> Result<Frame> {
        self(frame)
    }
}

/// Terminal stage of a pipeline.
#[async_trait]
pub trait Loader: Send {
    async fn load(&mut self, frame: &Frame) -> Result<()>;
}

/// Bulk writer the load stage flushes batches into.
///
/// A call either persists every row or fails as a whole; the caller keeps
/// the rows on failure.
#[async_trait]
pub trait Sink: Send {
    async fn bulk_insert(&mut self, rows: &[Row]) -> Result<()>;

    fn name(&self) -> &str;
}
