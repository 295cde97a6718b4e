//! Service configuration. No CLI, env, or persistence surface for the
//! core — configuration flows in at construction.

/// Configurable properties of a `HeadController` instance.
#[derive(Debug, Clone)]
pub struct ServerlessConfig {
    /// Sleep modeling container startup overhead, in seconds. Applied once
    /// per invocation dispatch, before the compute action begins.
    pub container_startup_overhead_secs: f64,
    /// Buffer reserved on top of each invocation's `disk_limit_bytes` when
    /// carving its scratch store.
    pub scratch_space_buffer_size: u64,
}

impl Default for ServerlessConfig {
    fn default() -> Self {
        Self {
            container_startup_overhead_secs: 0.0,
            scratch_space_buffer_size: 0,
        }
    }
}
