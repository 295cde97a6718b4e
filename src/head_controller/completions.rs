//! Routing of action completions back into controller state.

use tracing::{debug, warn};

use crate::action::{ActionDone, ActionOutcome};
use crate::function::FunctionOutput;
use crate::invocation::InvocationState;

use super::{HeadController, PendingAction};

impl HeadController {
    /// Handle one `ActionDone` event. Returns whether a scheduling pass
    /// should follow (residency or a queue materially changed).
    pub(super) fn handle_action_done(&mut self, event: ActionDone) -> bool {
        let pending = match self.pending_actions.remove(&event.tag) {
            Some(pending) => pending,
            None => {
                warn!(tag = ?event.tag, "completion for unknown action tag; ignoring");
                return false;
            }
        };

        match pending {
            PendingAction::ImageDownload { image } => self.on_image_download_done(image, event.outcome),
            PendingAction::ImageCopy { node, image } => self.on_image_copy_done(node, image, event.outcome),
            PendingAction::ImageLoad { node, image } => self.on_image_load_done(node, image, event.outcome),
            PendingAction::InvocationCompute { invocation, node, output } => {
                self.on_invocation_compute_done(invocation, node, output, event.outcome)
            }
        }
    }

    fn on_image_download_done(&mut self, image: crate::function::Image, outcome: ActionOutcome) -> bool {
        let waiters = self.admitted_by_image.remove(&image).unwrap_or_default();

        match outcome {
            ActionOutcome::Success => {
                debug!(image = %image.file_id, "image download completed");
                self.residency.on_head_disk.insert(image);
                for id in waiters {
                    if let Some(invocation) = self.invocations.get_mut(&id) {
                        invocation.transition(InvocationState::Schedulable);
                    }
                    self.schedulable.push(id);
                }
            }
            ActionOutcome::Failed(cause) => {
                self.budgets.release_head_disk(image.size_bytes);
                for id in waiters {
                    self.fail_invocation(id, cause.clone());
                }
            }
        }
        true
    }

    fn on_image_copy_done(&mut self, node: String, image: crate::function::Image, outcome: ActionOutcome) -> bool {
        match outcome {
            ActionOutcome::Success => {
                debug!(node, image = %image.file_id, "image copy completed");
                self.residency.finish_copy(&node, &image);
            }
            ActionOutcome::Failed(_) => {
                if let Some(set) = self.residency.copying_to_node.get_mut(&node) {
                    set.remove(&image);
                }
                self.budgets.release_node_disk(&node, image.size_bytes);
            }
        }
        true
    }

    fn on_image_load_done(&mut self, node: String, image: crate::function::Image, outcome: ActionOutcome) -> bool {
        match outcome {
            ActionOutcome::Success => {
                debug!(node, image = %image.file_id, "image load completed");
                self.residency.finish_load(&node, &image);
            }
            ActionOutcome::Failed(_) => {
                if let Some(set) = self.residency.loading_to_ram.get_mut(&node) {
                    set.remove(&image);
                }
                self.budgets.release_ram(&node, image.size_bytes);
            }
        }
        true
    }

    fn on_invocation_compute_done(
        &mut self,
        invocation_id: crate::invocation::InvocationId,
        node: String,
        output: Option<FunctionOutput>,
        outcome: ActionOutcome,
    ) -> bool {
        let (ram_limit, scratch_bytes) = match self.invocations.get(&invocation_id) {
            Some(invocation) => (
                invocation.registered_function.ram_limit_bytes,
                invocation.registered_function.disk_limit_bytes + self.config.scratch_space_buffer_size,
            ),
            // Invocation was already removed (e.g. the service stopped and
            // force-failed it); still release the node's reservation.
            None => {
                self.budgets.release_core(&node);
                return true;
            }
        };

        self.budgets.release_core(&node);
        self.budgets.release_ram(&node, ram_limit);
        self.budgets.release_node_disk(&node, scratch_bytes);

        let already_terminal = self.invocations.get(&invocation_id).is_some_and(|i| i.is_terminal());
        if already_terminal {
            return true;
        }

        match outcome {
            ActionOutcome::Success => {
                self.complete_invocation(invocation_id, output.unwrap_or_default());
            }
            ActionOutcome::Failed(cause) => {
                self.fail_invocation(invocation_id, cause);
            }
        }
        true
    }
}
