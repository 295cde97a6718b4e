//! HeadController: the serverless compute service's main actor.
//!
//! Owns all queues, drives the admission/scheduling/dispatch pipeline, owns
//! head-node storage accounting, manages image-action lifecycles, and
//! relays completion back to callers. Single-threaded cooperative: the only
//! suspension points are receiving from its inbox and the sleeps modeling
//! action durations.

mod actions;
mod admission;
mod completions;

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::action::{ActionKind, ActionTag};
use crate::bare_metal::BareMetalComputeService;
use crate::config::ServerlessConfig;
use crate::error::FailureCause;
use crate::function::{Function, FunctionInput, Image};
use crate::invocation::{Invocation, InvocationId, InvocationInfo, InvocationNotification, InvocationState};
use crate::messages::{
    ControllerMessage, FunctionInvokeAnswer, FunctionInvokeRequestMessage, FunctionRegisterAnswer,
    FunctionRegisterRequestMessage, QueryInvocationMessage, StopDaemonMessage,
};
use crate::platform::Platform;
use crate::registered_function::{FunctionId, RegisteredFunction};
use crate::residency::{ImageResidency, NodeBudgets, ResourceSnapshot};
use crate::scheduler::Scheduler;
use crate::storage::SimpleStorageService;

/// What a pending action tag refers to, so its completion can be routed and
/// its reservations released on failure.
#[derive(Debug, Clone)]
pub(crate) enum PendingAction {
    ImageDownload {
        image: Image,
    },
    ImageCopy {
        node: String,
        image: Image,
    },
    ImageLoad {
        node: String,
        image: Image,
    },
    InvocationCompute {
        invocation: InvocationId,
        node: String,
        output: Option<crate::function::FunctionOutput>,
    },
}

/// A clonable capability to talk to a running `HeadController` over its
/// service port.
#[derive(Clone)]
pub struct HeadControllerHandle {
    inbox: mpsc::UnboundedSender<ControllerMessage>,
}

impl HeadControllerHandle {
    /// Synchronous request/response: register a function with resource
    /// limits.
    pub async fn register_function(
        &self,
        function: Function,
        time_limit_secs: f64,
        disk_limit_bytes: u64,
        ram_limit_bytes: u64,
        ingress_bytes: u64,
        egress_bytes: u64,
    ) -> FunctionRegisterAnswer {
        let (reply, rx) = oneshot::channel();
        let sent = self.inbox.send(ControllerMessage::RegisterFunction(FunctionRegisterRequestMessage {
            function,
            time_limit_secs,
            disk_limit_bytes,
            ram_limit_bytes,
            ingress_bytes,
            egress_bytes,
            reply,
        }));
        if sent.is_err() {
            return FunctionRegisterAnswer {
                success: false,
                function: None,
                failure_cause: Some(FailureCause::ServiceDown),
            };
        }
        rx.await.unwrap_or(FunctionRegisterAnswer {
            success: false,
            function: None,
            failure_cause: Some(FailureCause::ServiceDown),
        })
    }

    /// Synchronous request/response: submit an invocation. The invocation's
    /// own completion arrives later on `notify_port`.
    pub async fn invoke_function(
        &self,
        registered_function: Arc<RegisteredFunction>,
        input: FunctionInput,
        notify_port: mpsc::UnboundedSender<InvocationNotification>,
    ) -> FunctionInvokeAnswer {
        let (reply, rx) = oneshot::channel();
        let sent = self.inbox.send(ControllerMessage::InvokeFunction(FunctionInvokeRequestMessage {
            registered_function,
            input,
            notify_port,
            reply,
        }));
        if sent.is_err() {
            return FunctionInvokeAnswer {
                success: false,
                invocation: None,
                failure_cause: Some(FailureCause::ServiceDown),
            };
        }
        rx.await.unwrap_or(FunctionInvokeAnswer {
            success: false,
            invocation: None,
            failure_cause: Some(FailureCause::ServiceDown),
        })
    }

    pub async fn stop(&self) {
        let (ack, rx) = oneshot::channel();
        if self.inbox.send(ControllerMessage::Stop(StopDaemonMessage { ack })).is_ok() {
            let _ = rx.await;
        }
    }

    /// Observability query: read an invocation's lifecycle bookkeeping
    /// (state, assigned node, simulated timestamps). Returns `None` if the
    /// controller has no record of that id.
    pub async fn invocation_info(&self, invocation: InvocationId) -> Option<InvocationInfo> {
        let (reply, rx) = oneshot::channel();
        if self
            .inbox
            .send(ControllerMessage::QueryInvocation(QueryInvocationMessage { invocation, reply }))
            .is_err()
        {
            return None;
        }
        rx.await.ok().flatten()
    }

    /// Observability query: a point-in-time copy of every node's free
    /// resource budget.
    pub async fn resource_snapshot(&self) -> Option<ResourceSnapshot> {
        let (reply, rx) = oneshot::channel();
        if self.inbox.send(ControllerMessage::QueryResources(reply)).is_err() {
            return None;
        }
        rx.await.ok()
    }
}

pub struct HeadController {
    platform: Platform,
    config: ServerlessConfig,
    scheduler: Arc<dyn Scheduler>,

    next_function_id: u64,
    next_invocation_id: u64,
    next_action_tag: u64,

    registered_by_name: HashMap<String, Arc<RegisteredFunction>>,
    invocations: HashMap<InvocationId, Invocation>,

    new_queue: VecDeque<InvocationId>,
    admitted_by_image: HashMap<Image, VecDeque<InvocationId>>,
    schedulable: Vec<InvocationId>,
    running: HashSet<InvocationId>,
    finished: VecDeque<InvocationId>,

    residency: ImageResidency,
    budgets: NodeBudgets,

    /// One storage service for the head node and one per compute node, plus
    /// one bare-metal executor per compute node, owned for the controller's
    /// lifetime and torn down with it.
    head_storage: SimpleStorageService,
    node_storage: HashMap<String, SimpleStorageService>,
    bare_metal: HashMap<String, BareMetalComputeService>,

    pending_actions: HashMap<ActionTag, PendingAction>,

    inbox: mpsc::UnboundedReceiver<ControllerMessage>,
    inbox_tx: mpsc::UnboundedSender<ControllerMessage>,

    stopping: bool,
    /// Elapsed simulated seconds, advanced only by observing `tokio::time::Instant`
    /// deltas against the time this controller was constructed.
    epoch: tokio::time::Instant,
}

impl HeadController {
    pub fn new(platform: Platform, config: ServerlessConfig, scheduler: Arc<dyn Scheduler>) -> (Self, HeadControllerHandle) {
        let (inbox_tx, inbox) = mpsc::unbounded_channel();
        let head_disk_bytes = platform.head_node.disk_bytes;
        let budgets = NodeBudgets::new(
            platform.compute_nodes.iter().map(|h| (h.name.clone(), h.cores, h.ram_bytes, h.disk_bytes)),
            head_disk_bytes,
        );
        let handle = HeadControllerHandle { inbox: inbox_tx.clone() };
        let node_storage = platform
            .compute_nodes
            .iter()
            .map(|h| (h.name.clone(), SimpleStorageService::new(h.name.clone())))
            .collect();
        let bare_metal = platform
            .compute_nodes
            .iter()
            .map(|h| (h.name.clone(), BareMetalComputeService::new(h.name.clone())))
            .collect();
        let controller = Self {
            head_storage: SimpleStorageService::new(platform.head_node.name.clone()),
            node_storage,
            bare_metal,
            platform,
            config,
            scheduler,
            next_function_id: 0,
            next_invocation_id: 0,
            next_action_tag: 0,
            registered_by_name: HashMap::new(),
            invocations: HashMap::new(),
            new_queue: VecDeque::new(),
            admitted_by_image: HashMap::new(),
            schedulable: Vec::new(),
            running: HashSet::new(),
            finished: VecDeque::new(),
            residency: ImageResidency::new(),
            budgets,
            pending_actions: HashMap::new(),
            inbox,
            inbox_tx,
            stopping: false,
            epoch: tokio::time::Instant::now(),
        };
        (controller, handle)
    }

    fn now_secs(&self) -> f64 {
        tokio::time::Instant::now().saturating_duration_since(self.epoch).as_secs_f64()
    }

    fn next_action_tag(&mut self) -> ActionTag {
        let tag = ActionTag(self.next_action_tag);
        self.next_action_tag += 1;
        tag
    }

    /// Spawn the controller's main loop as a background task and return a
    /// handle to its service port.
    pub fn spawn(platform: Platform, config: ServerlessConfig, scheduler: Arc<dyn Scheduler>) -> HeadControllerHandle {
        let (controller, handle) = Self::new(platform, config, scheduler);
        tokio::spawn(controller.run());
        handle
    }

    /// Main loop: receive one message, dispatch, and — if queues or
    /// residency materially changed — run admit → schedule → act.
    pub async fn run(mut self) {
        while let Some(message) = self.inbox.recv().await {
            let do_scheduling = self.dispatch(message).await;
            if do_scheduling {
                self.pipeline_pass();
            }
            if self.stopping && self.running.is_empty() {
                break;
            }
        }
        info!("head controller stopped");
    }

    /// Handle one message; returns whether queues/residency materially
    /// changed and a scheduling pass should run.
    async fn dispatch(&mut self, message: ControllerMessage) -> bool {
        match message {
            ControllerMessage::RegisterFunction(request) => {
                self.handle_register(request);
                false
            }
            ControllerMessage::InvokeFunction(request) => self.handle_invoke(request),
            ControllerMessage::ActionDone(event) => self.handle_action_done(event),
            ControllerMessage::Stop(stop) => {
                self.handle_stop(stop);
                false
            }
            ControllerMessage::QueryInvocation(query) => {
                let info = self.invocations.get(&query.invocation).map(InvocationInfo::from);
                let _ = query.reply.send(info);
                false
            }
            ControllerMessage::QueryResources(reply) => {
                let _ = reply.send(self.budgets.snapshot());
                false
            }
        }
    }

    fn handle_register(&mut self, request: FunctionRegisterRequestMessage) {
        let FunctionRegisterRequestMessage {
            function,
            time_limit_secs,
            disk_limit_bytes,
            ram_limit_bytes,
            ingress_bytes,
            egress_bytes,
            reply,
        } = request;

        if self.registered_by_name.contains_key(&function.name) {
            let _ = reply.send(FunctionRegisterAnswer {
                success: false,
                function: None,
                failure_cause: Some(FailureCause::FunctionAlreadyRegistered),
            });
            return;
        }

        if ram_limit_bytes > self.platform.max_node_ram() {
            let _ = reply.send(FunctionRegisterAnswer {
                success: false,
                function: None,
                failure_cause: Some(FailureCause::NotEnoughResources),
            });
            return;
        }

        let id = FunctionId(self.next_function_id);
        self.next_function_id += 1;
        let registered = Arc::new(RegisteredFunction {
            id,
            function: Arc::new(function),
            time_limit_secs,
            disk_limit_bytes,
            ram_limit_bytes,
            ingress_bytes,
            egress_bytes,
        });
        debug!(function = %registered.name(), "function registered");
        self.registered_by_name.insert(registered.name().to_string(), registered.clone());
        let _ = reply.send(FunctionRegisterAnswer {
            success: true,
            function: Some(registered),
            failure_cause: None,
        });
    }

    fn handle_invoke(&mut self, request: FunctionInvokeRequestMessage) -> bool {
        let FunctionInvokeRequestMessage {
            registered_function,
            input,
            notify_port,
            reply,
        } = request;

        let is_registered = self
            .registered_by_name
            .get(registered_function.name())
            .is_some_and(|stored| stored.id == registered_function.id);
        if !is_registered {
            let _ = reply.send(FunctionInvokeAnswer {
                success: false,
                invocation: None,
                failure_cause: Some(FailureCause::FunctionNotRegistered),
            });
            return false;
        }

        let id = InvocationId(self.next_invocation_id);
        self.next_invocation_id += 1;
        let invocation = Invocation {
            id,
            registered_function,
            input,
            notify_port,
            state: InvocationState::Admitted,
            output: None,
            failure: None,
            admitted_at_secs: self.now_secs(),
            started_at_secs: None,
            ended_at_secs: None,
            assigned_node: None,
        };
        self.invocations.insert(id, invocation);
        self.new_queue.push_back(id);

        let _ = reply.send(FunctionInvokeAnswer {
            success: true,
            invocation: Some(id),
            failure_cause: None,
        });
        true
    }

    fn handle_stop(&mut self, stop: StopDaemonMessage) {
        self.stopping = true;
        // Every in-flight invocation fails with ServiceDown.
        let running: Vec<InvocationId> = self.running.iter().copied().collect();
        for id in running {
            self.fail_invocation(id, FailureCause::ServiceDown);
        }
        let _ = stop.ack.send(());
    }

    /// admit → schedule → act, run whenever a message materially changed
    /// queues or residency.
    fn pipeline_pass(&mut self) {
        self.admit();
        let decisions = self.invoke_scheduler();
        self.act(decisions);
    }

    fn fail_invocation(&mut self, id: InvocationId, cause: FailureCause) {
        let now = self.now_secs();
        if let Some(invocation) = self.invocations.get_mut(&id) {
            if invocation.is_terminal() {
                return;
            }
            invocation.fail(cause.clone(), now);
            let _ = invocation.notify_port.send(InvocationNotification::Failed { invocation: id, cause });
        }
        self.running.remove(&id);
        self.schedulable.retain(|i| *i != id);
        self.new_queue.retain(|i| *i != id);
        self.finished.push_back(id);
    }

    fn complete_invocation(&mut self, id: InvocationId, output: crate::function::FunctionOutput) {
        let now = self.now_secs();
        if let Some(invocation) = self.invocations.get_mut(&id) {
            if invocation.is_terminal() {
                return;
            }
            invocation.complete(output.clone(), now);
            let _ = invocation.notify_port.send(InvocationNotification::Completed { invocation: id, output });
        }
        self.running.remove(&id);
        self.finished.push_back(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::FunctionBody;
    use crate::platform::{Host, Link};

    fn single_node_platform() -> Platform {
        Platform {
            head_node: Host::new("head", 4, 1 << 30, 1 << 30, 10.0e9),
            repository: Host::new("repo", 1, 0, 0, 1.0),
            compute_nodes: vec![Host::new("n0", 4, 64 << 30, 1 << 40, 10.0e9)],
            repository_link: Link::new(1.0e9, 0.0),
            head_to_node_link: Link::new(1.0e9, 0.0),
        }
    }

    fn scheduler() -> Arc<dyn Scheduler> {
        Arc::new(crate::scheduler::random::RandomScheduler::with_seed(1))
    }

    #[tokio::test]
    async fn register_function_succeeds_once() {
        let (mut controller, handle) = HeadController::new(single_node_platform(), ServerlessConfig::default(), scheduler());
        tokio::spawn(async move { controller.run().await });

        let function = Function::new("f", FunctionBody::Flops(1.0), Image::new("img", 10));
        let answer = handle.register_function(function.clone(), 10.0, 1024, 1024, 0, 0).await;
        assert!(answer.success);

        let answer2 = handle.register_function(function, 10.0, 1024, 1024, 0, 0).await;
        assert!(!answer2.success);
        assert_eq!(answer2.failure_cause, Some(FailureCause::FunctionAlreadyRegistered));
    }

    #[tokio::test]
    async fn register_function_rejects_excessive_ram() {
        let (controller, handle) = HeadController::new(single_node_platform(), ServerlessConfig::default(), scheduler());
        tokio::spawn(controller.run());

        let function = Function::new("f", FunctionBody::Flops(1.0), Image::new("img", 10));
        let answer = handle.register_function(function, 10.0, 1024, 1 << 40, 0, 0).await;
        assert!(!answer.success);
        assert_eq!(answer.failure_cause, Some(FailureCause::NotEnoughResources));
    }

    #[tokio::test]
    async fn invoke_unregistered_function_fails_synchronously() {
        let (controller, handle) = HeadController::new(single_node_platform(), ServerlessConfig::default(), scheduler());
        tokio::spawn(controller.run());

        let function = Arc::new(Function::new("g", FunctionBody::Flops(1.0), Image::new("img", 10)));
        let registered = Arc::new(RegisteredFunction {
            id: FunctionId(0),
            function,
            time_limit_secs: 10.0,
            disk_limit_bytes: 1,
            ram_limit_bytes: 1,
            ingress_bytes: 0,
            egress_bytes: 0,
        });
        let (tx, _rx) = mpsc::unbounded_channel();
        let answer = handle.invoke_function(registered, FunctionInput::default(), tx).await;
        assert!(!answer.success);
        assert_eq!(answer.failure_cause, Some(FailureCause::FunctionNotRegistered));
    }
}
