//! Timing and addressing shared by every conversation of a client.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::foundation::{ComponentId, Destination};
use crate::ports::{MessageBus, TimerService};

/// Default identification-phase timeout.
pub const DEFAULT_IDENTIFICATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Default operation-phase timeout when no estimate is available.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Default whole-conversation limit, enforced by the mediator sweep.
pub const DEFAULT_CONVERSATION_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

/// Client-wide conversation settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSettings {
    /// Sender id stamped on outbound requests.
    pub client_id: ComponentId,

    /// Collection-wide topic that identify requests are broadcast on.
    pub collection_destination: Destination,

    /// The client's inbox; reply-to of every outbound request.
    pub receiver_destination: Destination,

    pub identification_timeout: Duration,
    pub operation_timeout: Duration,

    /// Blocking callers give up after this long.
    pub conversation_timeout: Duration,
}

impl ConversationSettings {
    /// Creates settings with default timeouts.
    pub fn new(
        client_id: ComponentId,
        collection_destination: Destination,
        receiver_destination: Destination,
    ) -> Self {
        Self {
            client_id,
            collection_destination,
            receiver_destination,
            identification_timeout: DEFAULT_IDENTIFICATION_TIMEOUT,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            conversation_timeout: DEFAULT_CONVERSATION_TIMEOUT,
        }
    }

    pub fn with_identification_timeout(mut self, timeout: Duration) -> Self {
        self.identification_timeout = timeout;
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    pub fn with_conversation_timeout(mut self, timeout: Duration) -> Self {
        self.conversation_timeout = timeout;
        self
    }
}

/// Collaborators a conversation needs, injected by whoever creates it.
#[derive(Clone)]
pub struct ConversationContext {
    pub settings: ConversationSettings,
    pub bus: Arc<dyn MessageBus>,
    pub timers: Arc<dyn TimerService>,
}

impl ConversationContext {
    pub fn new(
        settings: ConversationSettings,
        bus: Arc<dyn MessageBus>,
        timers: Arc<dyn TimerService>,
    ) -> Self {
        Self {
            settings,
            bus,
            timers,
        }
    }
}
