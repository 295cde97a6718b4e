//! FunctionManager: client-side actor mediating between user code and a
//! `HeadController`. Turns request/response exchanges into async calls and
//! aggregates wait-one / wait-all semantics over its own notify port.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::error::FailureCause;
use crate::function::{Function, FunctionBody, FunctionInput, FunctionOutput, Image};
use crate::head_controller::HeadControllerHandle;
use crate::invocation::{InvocationId, InvocationNotification};
use crate::registered_function::RegisteredFunction;

/// Terminal outcome of one invocation, as observed by the function manager.
#[derive(Debug, Clone)]
pub enum InvocationOutcome {
    Completed(FunctionOutput),
    Failed(FailureCause),
}

struct Shared {
    head: HeadControllerHandle,
    notify_tx: mpsc::UnboundedSender<InvocationNotification>,
    notify_rx: Mutex<mpsc::UnboundedReceiver<InvocationNotification>>,
    outcomes: Mutex<HashMap<InvocationId, InvocationOutcome>>,
}

/// Client API for registering and invoking functions and awaiting their
/// completion. Cheap to clone: every clone shares the same notify port and
/// outcome table.
#[derive(Clone)]
pub struct FunctionManager {
    shared: Arc<Shared>,
}

impl FunctionManager {
    pub fn new(head: HeadControllerHandle) -> Self {
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        Self {
            shared: Arc::new(Shared {
                head,
                notify_tx,
                notify_rx: Mutex::new(notify_rx),
                outcomes: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Build a client-side function descriptor, not yet bound to any
    /// service. The same `Function` may later be registered against
    /// multiple services with different resource limits.
    pub fn create_function(&self, name: impl Into<String>, body: FunctionBody, image: Image) -> Function {
        Function::new(name, body, image)
    }

    pub async fn register_function(
        &self,
        function: Function,
        time_limit_secs: f64,
        disk_limit_bytes: u64,
        ram_limit_bytes: u64,
        ingress_bytes: u64,
        egress_bytes: u64,
    ) -> Result<Arc<RegisteredFunction>, FailureCause> {
        let answer = self
            .shared
            .head
            .register_function(function, time_limit_secs, disk_limit_bytes, ram_limit_bytes, ingress_bytes, egress_bytes)
            .await;
        if answer.success {
            Ok(answer.function.expect("success answer carries a function"))
        } else {
            Err(answer.failure_cause.unwrap_or(FailureCause::ServiceDown))
        }
    }

    pub async fn invoke_function(
        &self,
        registered_function: Arc<RegisteredFunction>,
        input: FunctionInput,
    ) -> Result<InvocationId, FailureCause> {
        let answer = self
            .shared
            .head
            .invoke_function(registered_function, input, self.shared.notify_tx.clone())
            .await;
        if answer.success {
            Ok(answer.invocation.expect("success answer carries an invocation"))
        } else {
            Err(answer.failure_cause.unwrap_or(FailureCause::ServiceDown))
        }
    }

    /// Non-blocking: whether `invocation` has reached a terminal state.
    pub async fn is_done(&self, invocation: InvocationId) -> bool {
        self.drain_available().await;
        self.shared.outcomes.lock().await.contains_key(&invocation)
    }

    /// Block until `invocation` terminates, then return its outcome.
    pub async fn wait_one(&self, invocation: InvocationId) -> InvocationOutcome {
        loop {
            if let Some(outcome) = self.shared.outcomes.lock().await.get(&invocation).cloned() {
                return outcome;
            }
            self.recv_one().await;
        }
    }

    /// Block until every invocation in `invocations` has terminated.
    ///
    /// Cancellation-safe: a notification is only ever removed from the
    /// notify port by `mpsc::Receiver::recv`, itself cancel-safe, and is
    /// recorded into `outcomes` in the same poll that consumes it — so if
    /// the calling task is dropped mid-wait, no notification is lost and a
    /// subsequent `wait_all`/`wait_one` observes the same terminal state.
    pub async fn wait_all(&self, invocations: &[InvocationId]) -> HashMap<InvocationId, InvocationOutcome> {
        loop {
            {
                let outcomes = self.shared.outcomes.lock().await;
                if invocations.iter().all(|id| outcomes.contains_key(id)) {
                    return invocations.iter().map(|id| (*id, outcomes[id].clone())).collect();
                }
            }
            self.recv_one().await;
        }
    }

    pub async fn stop(&self) {
        self.shared.head.stop().await;
    }

    /// Observability query, grounded on `HeadControllerHandle::invocation_info`.
    pub async fn invocation_info(&self, invocation: InvocationId) -> Option<crate::invocation::InvocationInfo> {
        self.shared.head.invocation_info(invocation).await
    }

    /// Observability query, grounded on `HeadControllerHandle::resource_snapshot`.
    pub async fn resource_snapshot(&self) -> Option<crate::residency::ResourceSnapshot> {
        self.shared.head.resource_snapshot().await
    }

    async fn recv_one(&self) {
        let notification = {
            let mut rx = self.shared.notify_rx.lock().await;
            rx.recv().await
        };
        if let Some(notification) = notification {
            self.record(notification).await;
        }
    }

    async fn drain_available(&self) {
        loop {
            let notification = {
                let mut rx = self.shared.notify_rx.lock().await;
                rx.try_recv().ok()
            };
            match notification {
                Some(notification) => self.record(notification).await,
                None => break,
            }
        }
    }

    async fn record(&self, notification: InvocationNotification) {
        let mut outcomes = self.shared.outcomes.lock().await;
        match notification {
            InvocationNotification::Completed { invocation, output } => {
                outcomes.insert(invocation, InvocationOutcome::Completed(output));
            }
            InvocationNotification::Failed { invocation, cause } => {
                outcomes.insert(invocation, InvocationOutcome::Failed(cause));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerlessConfig;
    use crate::function::Image;
    use crate::head_controller::HeadController;
    use crate::platform::{Host, Link, Platform};
    use crate::scheduler::random::RandomScheduler;

    fn single_node_platform() -> Platform {
        Platform {
            head_node: Host::new("head", 4, 1 << 30, 1 << 30, 10.0e9),
            repository: Host::new("repo", 1, 0, 0, 1.0e9),
            compute_nodes: vec![Host::new("n0", 4, 64 << 30, 1 << 40, 10.0e9)],
            repository_link: Link::new(1.0e9, 0.0),
            head_to_node_link: Link::new(1.0e9, 0.0),
        }
    }

    #[tokio::test]
    async fn invoke_before_register_fails_synchronously() {
        let handle = HeadController::spawn(
            single_node_platform(),
            ServerlessConfig::default(),
            Arc::new(RandomScheduler::with_seed(1)),
        );
        let manager = FunctionManager::new(handle);

        let function = Arc::new(Function::new("g", FunctionBody::Flops(1.0), Image::new("img", 10)));
        let registered = Arc::new(RegisteredFunction {
            id: crate::registered_function::FunctionId(0),
            function,
            time_limit_secs: 10.0,
            disk_limit_bytes: 1,
            ram_limit_bytes: 1,
            ingress_bytes: 0,
            egress_bytes: 0,
        });
        let result = manager.invoke_function(registered, FunctionInput::default()).await;
        assert_eq!(result.unwrap_err(), FailureCause::FunctionNotRegistered);
    }

    #[tokio::test]
    async fn duplicate_registration_fails_synchronously() {
        let handle = HeadController::spawn(
            single_node_platform(),
            ServerlessConfig::default(),
            Arc::new(RandomScheduler::with_seed(1)),
        );
        let manager = FunctionManager::new(handle);

        let function = manager.create_function("f", FunctionBody::Flops(1.0), Image::new("img", 10));
        manager
            .register_function(function.clone(), 10.0, 1024, 1024, 0, 0)
            .await
            .unwrap();
        let second = manager.register_function(function, 10.0, 1024, 1024, 0, 0).await;
        assert_eq!(second.unwrap_err(), FailureCause::FunctionAlreadyRegistered);
    }
}
