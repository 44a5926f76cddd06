use crate::domain::model::Row;
use crate::domain::ports::Sink;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;

/// Keeps every flushed batch in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    batches: Vec<Vec<Row>>,
    calls: usize,
    fail_on_call: Option<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink whose `n`-th bulk insert (1-based) fails without storing anything.
    pub fn failing_on_call(n: usize) -> Self {
        Self {
            fail_on_call: Some(n),
            ..Self::default()
        }
    }

    pub fn batches(&self) -> &[Vec<Row>] {
        &self.batches
    }

    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.batches.iter().flatten()
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn bulk_insert(&mut self, rows: &[Row]) -> Result<()> {
        self.calls += 1;
        if self.fail_on_call == Some(self.calls) {
            return Err(EtlError::sink(
                self.name(),
                format!("bulk insert #{} rejected", self.calls),
            ));
        }

        self.batches.push(rows.to_vec());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
