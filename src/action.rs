//! Action: a kernel-level unit of simulated work with a start and completion
//! event (GLOSSARY). Stands in for the discrete-event kernel's action
//! abstraction, scoped to what the head controller dispatches.

use std::fmt;

use tokio::sync::mpsc;
use tokio::time::Duration;

use crate::error::FailureCause;
use crate::messages::ControllerMessage;

/// Monotonically increasing tag identifying one in-flight action, used as
/// the pending-table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionTag(pub u64);

/// What kind of simulated work an action performs.
#[derive(Debug, Clone)]
pub enum ActionKind {
    ImageDownload { node: String },
    ImageCopy { node: String },
    ImageLoad { node: String },
    Compute { node: String },
}

/// Outcome of a completed action.
#[derive(Debug, Clone)]
pub enum ActionOutcome {
    Success,
    Failed(FailureCause),
}

/// A completion event delivered back to the head controller.
#[derive(Debug, Clone)]
pub struct ActionDone {
    pub tag: ActionTag,
    pub kind: ActionKind,
    pub outcome: ActionOutcome,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::ImageDownload { node } => write!(f, "image-download@{node}"),
            ActionKind::ImageCopy { node } => write!(f, "image-copy@{node}"),
            ActionKind::ImageLoad { node } => write!(f, "image-load@{node}"),
            ActionKind::Compute { node } => write!(f, "compute@{node}"),
        }
    }
}

/// Run a simulated action for `duration`, then report completion on
/// `inbox`. Spawned as an independent task so the caller's dispatch stays
/// non-blocking: issuing an action must initiate and return, never suspend.
pub fn spawn_action(
    tag: ActionTag,
    kind: ActionKind,
    duration: Duration,
    outcome: ActionOutcome,
    inbox: mpsc::UnboundedSender<ControllerMessage>,
) {
    tokio::spawn(async move {
        tokio::time::sleep(duration).await;
        let _ = inbox.send(ControllerMessage::ActionDone(ActionDone { tag, kind, outcome }));
    });
}

/// Run a simulated action bounded by `time_limit`. If `duration` exceeds
/// the limit, the action is killed and reported as `TimedOut` at the limit
/// instead of at `duration`.
pub fn spawn_bounded_action(
    tag: ActionTag,
    kind: ActionKind,
    duration: Duration,
    time_limit: Duration,
    outcome_if_on_time: ActionOutcome,
    inbox: mpsc::UnboundedSender<ControllerMessage>,
) {
    tokio::spawn(async move {
        if duration <= time_limit {
            tokio::time::sleep(duration).await;
            let _ = inbox.send(ControllerMessage::ActionDone(ActionDone {
                tag,
                kind,
                outcome: outcome_if_on_time,
            }));
        } else {
            tokio::time::sleep(time_limit).await;
            let _ = inbox.send(ControllerMessage::ActionDone(ActionDone {
                tag,
                kind,
                outcome: ActionOutcome::Failed(FailureCause::TimedOut),
            }));
        }
    });
}
