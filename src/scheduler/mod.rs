//! Scheduler: pluggable policy producing copy/load/start decisions.
//!
//! Modeled as a capability object (a trait object held by the controller),
//! not a class hierarchy, so adding a policy never touches the controller.

pub mod random;

use std::collections::HashMap;

use crate::function::Image;
use crate::invocation::{Invocation, InvocationId};
use crate::state_view::StateView;

/// Scheduling decisions for one pipeline pass: per-node images to copy from
/// head to node disk, images to load from node disk to node RAM, and
/// invocations to start.
#[derive(Debug, Default, Clone)]
pub struct SchedulingDecisions {
    pub images_to_copy_to_node_disk: HashMap<String, Vec<Image>>,
    pub images_to_load_to_ram: HashMap<String, Vec<Image>>,
    pub invocations_to_start: HashMap<String, Vec<InvocationId>>,
}

impl SchedulingDecisions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn copy(&mut self, node: impl Into<String>, image: Image) {
        self.images_to_copy_to_node_disk.entry(node.into()).or_default().push(image);
    }

    pub fn load(&mut self, node: impl Into<String>, image: Image) {
        self.images_to_load_to_ram.entry(node.into()).or_default().push(image);
    }

    pub fn start(&mut self, node: impl Into<String>, invocation: InvocationId) {
        self.invocations_to_start.entry(node.into()).or_default().push(invocation);
    }
}

/// A pluggable scheduling policy. Given the schedulable invocations and a
/// read-only snapshot of system state, decide what to copy, load, and
/// start. Must not mutate the view; the controller validates and acts on
/// the returned decisions after `schedule` returns.
pub trait Scheduler: Send + Sync {
    fn schedule(&self, schedulable: &[&Invocation], state: &StateView<'_>) -> SchedulingDecisions;
}
