pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{CsvSink, JsonLinesSink, MemorySink};
pub use config::PipelineConfig;
pub use crate::core::load::{BatchLoader, LoadSettings, LoadStats};
pub use crate::core::pipeline::{with_end_marker, Pipeline, RunSummary};
pub use crate::core::transform::{TrimDefaults, TrimTransformer};
pub use domain::model::{Attributes, ColumnKey, Fields, Frame, FrameData, KeyingPolicy, Row, Value};
pub use domain::ports::{Loader, Sink, Transformer};
pub use utils::error::{EtlError, Result};
