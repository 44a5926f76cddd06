// Adapters layer: concrete sinks the load stage can flush into.

pub mod csv_sink;
pub mod jsonl;
pub mod memory;
mod staged;

pub use csv_sink::CsvSink;
pub use jsonl::JsonLinesSink;
pub use memory::MemorySink;
