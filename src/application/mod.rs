// Application layer - Use cases and the repository seam
pub mod device_registry;
#[cfg(test)]
pub mod fake_repository;
pub mod metric_cache;
pub mod range_service;
pub mod snapshot_service;
pub mod streaming_service;
pub mod tank_settings;
pub mod timeseries_repository;
