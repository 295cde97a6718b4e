//! Scheduling call and action dispatch: snapshot the schedulable queue,
//! call the pluggable scheduler, then validate and issue its decisions.

use std::collections::HashSet;

use tracing::warn;

use crate::action::{spawn_action, spawn_bounded_action, ActionKind, ActionOutcome};
use crate::invocation::InvocationState;
use crate::scheduler::SchedulingDecisions;
use crate::state_view::StateView;

use super::{HeadController, PendingAction};

impl HeadController {
    /// Build a fresh read-only snapshot and call the scheduler. Does not
    /// mutate any queue itself.
    pub(super) fn invoke_scheduler(&self) -> SchedulingDecisions {
        let refs: Vec<&crate::invocation::Invocation> =
            self.schedulable.iter().filter_map(|id| self.invocations.get(id)).collect();
        let view = StateView::new(&self.platform, &self.budgets, &self.residency);
        self.scheduler.schedule(&refs, &view)
    }

    /// Act on scheduling decisions: issue copies, then loads, then
    /// dispatch invocations. Entries that violate a residency or budget
    /// contract are dropped with a warning rather than acted on.
    pub(super) fn act(&mut self, decisions: SchedulingDecisions) {
        for (node, images) in decisions.images_to_copy_to_node_disk {
            for image in images {
                self.try_copy(&node, image);
            }
        }
        for (node, images) in decisions.images_to_load_to_ram {
            for image in images {
                self.try_load(&node, image);
            }
        }

        let mut started: HashSet<crate::invocation::InvocationId> = HashSet::new();
        for (node, invocation_ids) in decisions.invocations_to_start {
            for invocation_id in invocation_ids {
                if !started.insert(invocation_id) {
                    warn!(?invocation_id, "scheduler listed invocation to start on more than one node; dropping duplicate");
                    continue;
                }
                self.try_start(&node, invocation_id);
            }
        }
    }

    fn try_copy(&mut self, node: &str, image: crate::function::Image) {
        if !self.residency.on_head_disk.contains(&image) {
            warn!(node, image = %image.file_id, "scheduler requested copy of image not on head disk; dropping");
            return;
        }
        if self.residency.is_on_node_disk(node, &image) || self.residency.is_copying(node, &image) {
            warn!(node, image = %image.file_id, "scheduler requested duplicate copy; dropping");
            return;
        }
        if !self.budgets.reserve_node_disk(node, image.size_bytes) {
            warn!(node, image = %image.file_id, "insufficient node disk for copy; dropping");
            return;
        }

        self.residency.start_copy(node, image.clone());
        let tag = self.next_action_tag();
        self.pending_actions.insert(
            tag,
            PendingAction::ImageCopy {
                node: node.to_string(),
                image: image.clone(),
            },
        );
        let duration_secs = self
            .node_storage
            .get(node)
            .map(|store| store.transfer_seconds(&image, &self.platform.head_to_node_link))
            .unwrap_or(0.0);
        spawn_action(
            tag,
            ActionKind::ImageCopy { node: node.to_string() },
            tokio::time::Duration::from_secs_f64(duration_secs),
            ActionOutcome::Success,
            self.inbox_tx.clone(),
        );
    }

    fn try_load(&mut self, node: &str, image: crate::function::Image) {
        if !self.residency.is_on_node_disk(node, &image) {
            warn!(node, image = %image.file_id, "scheduler requested load of image not on node disk; dropping");
            return;
        }
        if self.residency.is_in_ram(node, &image) || self.residency.is_loading(node, &image) {
            warn!(node, image = %image.file_id, "scheduler requested duplicate load; dropping");
            return;
        }
        if !self.budgets.reserve_ram(node, image.size_bytes) {
            warn!(node, image = %image.file_id, "insufficient node RAM for load; dropping");
            return;
        }

        self.residency.start_load(node, image.clone());
        let tag = self.next_action_tag();
        self.pending_actions.insert(
            tag,
            PendingAction::ImageLoad {
                node: node.to_string(),
                image: image.clone(),
            },
        );
        // No separate local-disk link exists in the platform model; a
        // disk-to-RAM read has no network latency, so drop the link's fixed
        // latency term and keep only its bandwidth-derived transfer time.
        let link = &self.platform.head_to_node_link;
        let load_secs = self
            .node_storage
            .get(node)
            .map(|store| store.transfer_seconds(&image, link) - link.latency_secs)
            .unwrap_or(0.0);
        spawn_action(
            tag,
            ActionKind::ImageLoad { node: node.to_string() },
            tokio::time::Duration::from_secs_f64(load_secs.max(0.0)),
            ActionOutcome::Success,
            self.inbox_tx.clone(),
        );
    }

    fn try_start(&mut self, node: &str, invocation_id: crate::invocation::InvocationId) {
        let (image, ram_limit, disk_limit, time_limit) = match self.invocations.get(&invocation_id) {
            Some(invocation) => (
                invocation.image().clone(),
                invocation.registered_function.ram_limit_bytes,
                invocation.registered_function.disk_limit_bytes,
                invocation.registered_function.time_limit_secs,
            ),
            None => return,
        };

        if !self.residency.is_in_ram(node, &image) {
            warn!(node, invocation = ?invocation_id, "scheduler requested start without image in RAM; dropping");
            return;
        }
        if self.budgets.available_cores(node) < 1 {
            warn!(node, invocation = ?invocation_id, "insufficient cores to start invocation; dropping");
            return;
        }
        if self.budgets.available_ram(node) < ram_limit {
            warn!(node, invocation = ?invocation_id, "insufficient RAM to start invocation; dropping");
            return;
        }
        let scratch_bytes = disk_limit + self.config.scratch_space_buffer_size;
        if self.budgets.available_disk(node) < scratch_bytes {
            warn!(node, invocation = ?invocation_id, "insufficient disk to start invocation; dropping");
            return;
        }

        self.budgets.reserve_core(node);
        self.budgets.reserve_ram(node, ram_limit);
        self.budgets.reserve_node_disk(node, scratch_bytes);

        self.schedulable.retain(|id| *id != invocation_id);
        self.running.insert(invocation_id);

        // The callback body is pure and non-blocking, so it is safe to run
        // synchronously at dispatch time; only the simulated FLOP delay is
        // deferred to the compute action's completion.
        let mut scratch = match self.node_storage.get(node) {
            Some(store) => store.allocate_scratch(disk_limit),
            None => crate::function::Scratch::new(disk_limit),
        };
        let (flops, output) = match self.invocations.get(&invocation_id) {
            Some(invocation) => invocation.registered_function.function.execute(&invocation.input, &mut scratch),
            None => return,
        };

        let now = self.now_secs();
        if let Some(invocation) = self.invocations.get_mut(&invocation_id) {
            invocation.transition(InvocationState::Running);
            invocation.started_at_secs = Some(now);
            invocation.assigned_node = Some(node.to_string());
        }

        let host = self
            .platform
            .compute_host(node)
            .expect("node in decisions must be in platform")
            .clone();
        let startup = self.config.container_startup_overhead_secs;
        let compute_secs = self
            .bare_metal
            .get(node)
            .map(|executor| executor.compute_seconds(&host, flops))
            .unwrap_or(0.0);
        let total_secs = startup + compute_secs;

        let tag = self.next_action_tag();
        self.pending_actions.insert(
            tag,
            PendingAction::InvocationCompute {
                invocation: invocation_id,
                node: node.to_string(),
                output,
            },
        );
        spawn_bounded_action(
            tag,
            ActionKind::Compute { node: node.to_string() },
            tokio::time::Duration::from_secs_f64(total_secs),
            tokio::time::Duration::from_secs_f64(time_limit),
            ActionOutcome::Success,
            self.inbox_tx.clone(),
        );
    }
}
