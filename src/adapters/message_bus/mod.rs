//! Message bus adapters.
//!
//! - `InMemoryMessageBus` - In-process bus with asynchronous delivery, for tests and demos

mod in_memory;

pub use in_memory::InMemoryMessageBus;
