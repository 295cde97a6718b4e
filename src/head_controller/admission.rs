//! Admission: drain the `new` queue, triggering an image download for any
//! invocation whose image isn't yet on head disk.

use tracing::debug;

use crate::action::{spawn_action, ActionKind, ActionOutcome};
use crate::error::FailureCause;
use crate::invocation::InvocationState;

use super::{HeadController, PendingAction};

impl HeadController {
    pub(super) fn admit(&mut self) {
        let ids: Vec<_> = self.new_queue.drain(..).collect();
        for id in ids {
            let image = match self.invocations.get(&id) {
                Some(invocation) => invocation.image().clone(),
                None => continue,
            };

            if self.residency.on_head_disk.contains(&image) {
                if let Some(invocation) = self.invocations.get_mut(&id) {
                    invocation.transition(InvocationState::Schedulable);
                }
                self.schedulable.push(id);
                continue;
            }

            if let Some(queue) = self.admitted_by_image.get_mut(&image) {
                queue.push_back(id);
                if let Some(invocation) = self.invocations.get_mut(&id) {
                    invocation.transition(InvocationState::ImagePulling);
                }
                continue;
            }

            if !self.budgets.reserve_head_disk(image.size_bytes) {
                self.fail_invocation(id, FailureCause::NotEnoughSpace);
                continue;
            }

            if let Some(invocation) = self.invocations.get_mut(&id) {
                invocation.transition(InvocationState::ImagePulling);
            }
            self.admitted_by_image.entry(image.clone()).or_default().push_back(id);
            self.initiate_image_download(image);
        }
    }

    fn initiate_image_download(&mut self, image: crate::function::Image) {
        let tag = self.next_action_tag();
        let duration_secs = self.head_storage.transfer_seconds(&image, &self.platform.repository_link);
        self.pending_actions.insert(tag, PendingAction::ImageDownload { image: image.clone() });
        debug!(image = %image.file_id, duration_secs, "image download started");

        spawn_action(
            tag,
            ActionKind::ImageDownload { node: "head".to_string() },
            tokio::time::Duration::from_secs_f64(duration_secs),
            ActionOutcome::Success,
            self.inbox_tx.clone(),
        );
    }
}
