//! Service-port message set. Each request carries a reply port.

use tokio::sync::{mpsc, oneshot};

use crate::error::FailureCause;
use crate::function::{Function, FunctionInput};
use crate::invocation::{InvocationId, InvocationInfo, InvocationNotification};
use crate::registered_function::RegisteredFunction;
use crate::residency::ResourceSnapshot;

pub struct FunctionRegisterRequestMessage {
    pub function: Function,
    pub time_limit_secs: f64,
    pub disk_limit_bytes: u64,
    pub ram_limit_bytes: u64,
    pub ingress_bytes: u64,
    pub egress_bytes: u64,
    pub reply: oneshot::Sender<FunctionRegisterAnswer>,
}

#[derive(Debug, Clone)]
pub struct FunctionRegisterAnswer {
    pub success: bool,
    pub function: Option<std::sync::Arc<RegisteredFunction>>,
    pub failure_cause: Option<FailureCause>,
}

pub struct FunctionInvokeRequestMessage {
    pub registered_function: std::sync::Arc<RegisteredFunction>,
    pub input: FunctionInput,
    pub notify_port: mpsc::UnboundedSender<InvocationNotification>,
    pub reply: oneshot::Sender<FunctionInvokeAnswer>,
}

#[derive(Debug, Clone)]
pub struct FunctionInvokeAnswer {
    pub success: bool,
    pub invocation: Option<InvocationId>,
    pub failure_cause: Option<FailureCause>,
}

pub struct StopDaemonMessage {
    pub ack: oneshot::Sender<()>,
}

pub struct QueryInvocationMessage {
    pub invocation: InvocationId,
    pub reply: oneshot::Sender<Option<InvocationInfo>>,
}

/// The head controller's single inbox message type. FIFO per inbox, one
/// message handled per main-loop iteration.
pub enum ControllerMessage {
    RegisterFunction(FunctionRegisterRequestMessage),
    InvokeFunction(FunctionInvokeRequestMessage),
    ActionDone(crate::action::ActionDone),
    Stop(StopDaemonMessage),
    /// Not part of spec.md §6's wire contract — observability queries used
    /// by the function manager and test harnesses to read controller
    /// state without touching it directly.
    QueryInvocation(QueryInvocationMessage),
    QueryResources(oneshot::Sender<ResourceSnapshot>),
}
