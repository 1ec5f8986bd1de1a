//! Simulated pillars for demos and tests.

mod contributor;

pub use contributor::{IdentifyBehavior, OperationBehavior, SimulatedContributor};
