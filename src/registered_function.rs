//! RegisteredFunction: a function bound to a compute service with concrete resource limits.

use std::sync::Arc;

use crate::function::Function;

/// Handle to a `RegisteredFunction` held by the function manager and the
/// head controller's arena. A plain id rather than a back-pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(pub u64);

/// A function bound to a compute service with resource limits. Immutable
/// after registration; equality is by name within a compute service.
#[derive(Debug, Clone)]
pub struct RegisteredFunction {
    pub id: FunctionId,
    pub function: Arc<Function>,
    pub time_limit_secs: f64,
    pub disk_limit_bytes: u64,
    pub ram_limit_bytes: u64,
    pub ingress_bytes: u64,
    pub egress_bytes: u64,
}

impl RegisteredFunction {
    pub fn name(&self) -> &str {
        &self.function.name
    }
}

impl PartialEq for RegisteredFunction {
    fn eq(&self, other: &Self) -> bool {
        self.function.name == other.function.name
    }
}
impl Eq for RegisteredFunction {}
