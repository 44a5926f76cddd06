pub mod load;
pub mod pipeline;
pub mod transform;

pub use crate::domain::model::{ColumnKey, Frame, FrameData, KeyingPolicy, Row, Value};
pub use crate::domain::ports::{Loader, Sink, Transformer};
pub use crate::utils::error::Result;
