//! Fan-out of workflow progress events to live observers.
//!
//! Observers subscribe per project and receive events over an unbounded
//! channel, which preserves publish order per subscriber. A subscriber
//! whose receiving end is gone is dropped from the registry without
//! affecting delivery to the others or the publisher.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use ideaforge_types::WorkflowEvent;

struct Subscriber {
    id: Uuid,
    sender: mpsc::UnboundedSender<WorkflowEvent>,
}

/// Registry mapping project ids to their current observers.
///
/// The registry is the only shared mutable structure in the process; the
/// mutex is held only for map manipulation, never across an await point.
#[derive(Default)]
pub struct ProgressBroadcaster {
    subscribers: Mutex<HashMap<Uuid, Vec<Subscriber>>>,
}

impl ProgressBroadcaster {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer for a project. Returns the subscription id and
    /// the receiving end of the event channel.
    pub fn subscribe(
        &self,
        project_id: Uuid,
    ) -> (Uuid, mpsc::UnboundedReceiver<WorkflowEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        subscribers
            .entry(project_id)
            .or_default()
            .push(Subscriber { id, sender });
        debug!(%project_id, subscriber = %id, "observer subscribed");
        (id, receiver)
    }

    /// Remove one observer. Unknown ids are ignored.
    pub fn unsubscribe(&self, project_id: Uuid, subscriber_id: Uuid) {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(list) = subscribers.get_mut(&project_id) {
            list.retain(|s| s.id != subscriber_id);
            if list.is_empty() {
                subscribers.remove(&project_id);
            }
        }
    }

    /// Deliver an event to every current observer of the project, stamping
    /// a server timestamp if the event carries none. A project with no
    /// observers is a silent no-op. Failed observers are removed; delivery
    /// to the rest proceeds.
    pub fn publish(&self, project_id: Uuid, mut event: WorkflowEvent) {
        if event.timestamp.is_none() {
            event.timestamp = Some(Utc::now());
        }

        let mut subscribers = self.subscribers.lock().unwrap_or_else(|e| e.into_inner());
        let Some(list) = subscribers.get_mut(&project_id) else {
            debug!(%project_id, "no observers for project");
            return;
        };

        list.retain(|subscriber| match subscriber.sender.send(event.clone()) {
            Ok(()) => true,
            Err(_) => {
                warn!(
                    %project_id,
                    subscriber = %subscriber.id,
                    "observer gone, removing"
                );
                false
            }
        });

        if list.is_empty() {
            subscribers.remove(&project_id);
        }
    }

    /// Number of current observers for a project.
    #[must_use]
    pub fn subscriber_count(&self, project_id: Uuid) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&project_id)
            .map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ideaforge_types::{WorkflowEventKind, WorkflowPhase};

    fn started_event(message: &str) -> WorkflowEvent {
        WorkflowEvent::new(WorkflowEventKind::PhaseStarted {
            phase: WorkflowPhase::Detection,
            message: message.to_string(),
        })
    }

    #[tokio::test]
    async fn publish_with_no_observers_is_a_no_op() {
        let broadcaster = ProgressBroadcaster::new();
        broadcaster.publish(Uuid::new_v4(), started_event("hello"));
    }

    #[tokio::test]
    async fn events_arrive_in_publish_order_with_timestamps() {
        let broadcaster = ProgressBroadcaster::new();
        let project_id = Uuid::new_v4();
        let (_, mut receiver) = broadcaster.subscribe(project_id);

        broadcaster.publish(project_id, started_event("first"));
        broadcaster.publish(project_id, started_event("second"));

        let first = receiver.recv().await.unwrap();
        let second = receiver.recv().await.unwrap();
        assert!(first.timestamp.is_some());
        match (first.kind, second.kind) {
            (
                WorkflowEventKind::PhaseStarted { message: m1, .. },
                WorkflowEventKind::PhaseStarted { message: m2, .. },
            ) => {
                assert_eq!(m1, "first");
                assert_eq!(m2, "second");
            }
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[tokio::test]
    async fn dead_observer_is_removed_and_others_still_receive() {
        let broadcaster = ProgressBroadcaster::new();
        let project_id = Uuid::new_v4();
        let (_, dead_receiver) = broadcaster.subscribe(project_id);
        let (_, mut live_receiver) = broadcaster.subscribe(project_id);
        assert_eq!(broadcaster.subscriber_count(project_id), 2);

        drop(dead_receiver);
        broadcaster.publish(project_id, started_event("still delivered"));

        assert!(live_receiver.recv().await.is_some());
        assert_eq!(broadcaster.subscriber_count(project_id), 1);
    }

    #[tokio::test]
    async fn unsubscribe_removes_only_the_named_observer() {
        let broadcaster = ProgressBroadcaster::new();
        let project_id = Uuid::new_v4();
        let (first_id, _first_rx) = broadcaster.subscribe(project_id);
        let (_, _second_rx) = broadcaster.subscribe(project_id);

        broadcaster.unsubscribe(project_id, first_id);
        assert_eq!(broadcaster.subscriber_count(project_id), 1);

        // Events for other projects do not leak across ids.
        assert_eq!(broadcaster.subscriber_count(Uuid::new_v4()), 0);
    }
}
