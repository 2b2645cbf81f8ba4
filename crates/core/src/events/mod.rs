//! Pipeline events broadcast to observers.
//!
//! Every state transition is published, along with which composition path
//! ran, so callers and tests can tell a real composition from a fallback.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::composition::CompositionPath;
use crate::pipeline::PipelineState;

/// Event emitted by a pipeline session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// The session moved to a new state.
    StateChanged {
        user_id: String,
        state: PipelineState,
    },
    /// The composition stage finished.
    CompositionCompleted {
        user_id: String,
        path: CompositionPath,
    },
    /// The gate refused to start a run.
    QuotaRejected {
        user_id: String,
        count: u32,
        limit: u32,
    },
    /// A ticket was committed.
    TicketCreated { user_id: String, ticket_id: String },
    /// A ticket was deleted by the user.
    TicketDeleted { user_id: String, ticket_id: String },
    /// Persisting failed; the in-memory copy is still authoritative.
    StoreWriteFailed { user_id: String, error: String },
}

impl PipelineEvent {
    pub fn user_id(&self) -> &str {
        match self {
            PipelineEvent::StateChanged { user_id, .. }
            | PipelineEvent::CompositionCompleted { user_id, .. }
            | PipelineEvent::QuotaRejected { user_id, .. }
            | PipelineEvent::TicketCreated { user_id, .. }
            | PipelineEvent::TicketDeleted { user_id, .. }
            | PipelineEvent::StoreWriteFailed { user_id, .. } => user_id,
        }
    }
}

/// Broadcaster for pipeline events using a tokio broadcast channel.
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<PipelineEvent>,
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventBroadcaster {
    /// Create a new broadcaster with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: PipelineEvent) {
        let _ = self.sender.send(event);
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
