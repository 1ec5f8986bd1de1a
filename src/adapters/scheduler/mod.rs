//! Timer service adapters.

mod tokio_timer;

pub use tokio_timer::TokioTimerService;
