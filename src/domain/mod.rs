// Domain layer: frame model and the stage/sink ports. No I/O here.

pub mod model;
pub mod ports;
