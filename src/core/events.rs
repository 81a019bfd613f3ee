//! Session event bus for observers of a collection session
//!
//! Sessions can be driven by pulling [`ViewState`](crate::session::ViewState)
//! or by subscribing here. The bus uses `tokio::sync::broadcast`, so any
//! number of observers can listen and publishing never blocks.
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut rx = session.subscribe();
//! session.request_more().await?;
//!
//! if let Ok(envelope) = rx.recv().await {
//!     println!("{:?}", envelope.event);
//! }
//! ```

use crate::core::coordinator::LoadKind;
use crate::core::sort::SortOption;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Something observable happened to a session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SessionEvent {
    /// A load completed and its result was committed
    Loaded {
        kind: LoadKind,
        total: usize,
        displayed: usize,
    },
    /// A load was rejected by the data source; prior data is intact
    LoadFailed { kind: LoadKind, message: String },
    /// A load completed for an outdated query and was dropped
    ResultDiscarded { kind: LoadKind, generation: u64 },
    /// Filter or sort changed; pagination restarted
    QueryChanged {
        generation: u64,
        sort: SortOption,
        total: usize,
    },
    /// An item was added to the source collection
    ItemInserted { id: Uuid },
    /// An item was edited in place
    ItemEdited { id: Uuid },
    /// An item was removed
    ItemDeleted { id: Uuid },
}

impl SessionEvent {
    /// Get the action name
    pub fn action(&self) -> &str {
        match self {
            SessionEvent::Loaded { .. } => "loaded",
            SessionEvent::LoadFailed { .. } => "load_failed",
            SessionEvent::ResultDiscarded { .. } => "result_discarded",
            SessionEvent::QueryChanged { .. } => "query_changed",
            SessionEvent::ItemInserted { .. } => "item_inserted",
            SessionEvent::ItemEdited { .. } => "item_edited",
            SessionEvent::ItemDeleted { .. } => "item_deleted",
        }
    }
}

/// Envelope wrapping a session event with metadata
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    /// Unique event ID
    pub id: Uuid,
    /// When the event occurred
    pub timestamp: DateTime<Utc>,
    /// The actual event
    pub event: SessionEvent,
}

impl EventEnvelope {
    pub fn new(event: SessionEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            event,
        }
    }
}

/// Broadcast-based event bus
///
/// Cheap to clone. Slow receivers that fall behind by more than `capacity`
/// events get a `Lagged` error on their next `recv()`.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event to all subscribers
    ///
    /// Returns the number of receivers that will receive the event.
    pub fn publish(&self, event: SessionEvent) -> usize {
        // send() only fails when nobody is listening
        self.sender.send(EventEnvelope::new(event)).unwrap_or(0)
    }

    /// Receive every event published after this call
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
