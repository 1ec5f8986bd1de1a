//! Application layer - Routing, housekeeping and the caller-facing client.
//!
//! Orchestrates conversations through the ports: the mediator owns the
//! correlation registry and the sweep, the client creates and starts
//! conversations.

mod client;
mod mediator;
mod registry;

pub use client::ConversationClient;
pub use mediator::{ConversationMediator, MediatorConfig, SweepReport};
pub use registry::{ConversationRegistry, RegistryPass};
