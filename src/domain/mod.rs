// Domain layer - Core models with no I/O
pub mod snapshot;
pub mod tank;
pub mod telemetry;
