//! Reference scheduler: for each schedulable invocation, pick a uniformly
//! random eligible compute node and emit whichever of (copy, load, start)
//! is the next missing step.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{Scheduler, SchedulingDecisions};
use crate::invocation::Invocation;
use crate::state_view::StateView;

pub struct RandomScheduler {
    rng: Mutex<StdRng>,
}

impl RandomScheduler {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic constructor for tests.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for RandomScheduler {
    fn schedule(&self, schedulable: &[&Invocation], state: &StateView<'_>) -> SchedulingDecisions {
        let mut decisions = SchedulingDecisions::new();
        let hosts = state.compute_hosts();
        if hosts.is_empty() {
            return decisions;
        }

        // Track what we've already decided this pass so we don't emit
        // duplicate copy/load targets for the same (node, image) pair.
        let mut planned_copy: std::collections::HashSet<(String, crate::function::Image)> = Default::default();
        let mut planned_load: std::collections::HashSet<(String, crate::function::Image)> = Default::default();
        let mut started_this_pass: std::collections::HashSet<crate::invocation::InvocationId> = Default::default();

        for invocation in schedulable {
            let node = {
                let mut rng = self.rng.lock().unwrap();
                let idx = rng.gen_range(0..hosts.len());
                hosts[idx].clone()
            };
            let image = invocation.image().clone();

            if state.is_image_in_ram(&node, &image) {
                if !started_this_pass.contains(&invocation.id) {
                    decisions.start(node.clone(), invocation.id);
                    started_this_pass.insert(invocation.id);
                }
            } else if state.is_image_on_node(&node, &image) {
                if !state.is_image_being_loaded(&node, &image) && !planned_load.contains(&(node.clone(), image.clone())) {
                    decisions.load(node.clone(), image.clone());
                    planned_load.insert((node.clone(), image));
                }
            } else if !state.is_image_being_copied(&node, &image) && !planned_copy.contains(&(node.clone(), image.clone())) {
                decisions.copy(node.clone(), image.clone());
                planned_copy.insert((node, image));
            }
        }

        decisions
    }
}
