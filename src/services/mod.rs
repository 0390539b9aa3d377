/// Inning advancement controller.
pub mod inning_service;
/// Connectivity observation and probing.
pub mod network_monitor;
/// Pitcher substitution controller.
pub mod pitcher_service;
/// Game and at-bat lifecycle controller.
pub mod scoring_service;
/// Optimistic dispatch, queue draining, and the periodic sync supervisor.
pub mod sync_service;

#[cfg(test)]
pub(crate) mod test_support;
