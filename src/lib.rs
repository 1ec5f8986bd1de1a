//! Pillar Conversations - Coordination of multi-pillar collection operations
//!
//! A client performs an operation on a collection by first identifying which
//! pillars can do it, selecting among them by policy, sending each selected
//! pillar the operation request and aggregating their answers into a single
//! outcome. This crate implements that conversation engine on top of a
//! publish/subscribe message bus.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod telemetry;
