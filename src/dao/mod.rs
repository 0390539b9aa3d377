/// Persisted entity definitions shared across layers.
pub mod models;
/// Device-local store: durable action queue, caches, sync metadata.
pub mod offline_store;
/// Storage abstraction layer shared by store backends.
pub mod storage;
