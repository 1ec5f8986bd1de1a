//! Domain layer containing the conversation engine and its primitives.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, state machine)
//! - `conversation` - Conversation aggregate, selectors, status tracking and events

pub mod conversation;
pub mod foundation;
