//! OperationEventHandler port - Observer of conversation lifecycle events.

use async_trait::async_trait;

use crate::domain::conversation::OperationEvent;
use crate::domain::foundation::DomainError;

/// Caller-supplied observer receiving every lifecycle event of a conversation.
///
/// Events of one conversation are delivered one at a time, in phase order.
/// Errors returned here are logged and otherwise ignored; they never change
/// the conversation's course.
///
/// # Example
///
/// ```ignore
/// struct ProgressPrinter;
///
/// #[async_trait]
/// impl OperationEventHandler for ProgressPrinter {
///     async fn handle_event(&self, event: OperationEvent) -> Result<(), DomainError> {
///         println!("{}", event);
///         Ok(())
///     }
///
///     fn name(&self) -> &'static str {
///         "ProgressPrinter"
///     }
/// }
/// ```
#[async_trait]
pub trait OperationEventHandler: Send + Sync {
    /// Process one event.
    async fn handle_event(&self, event: OperationEvent) -> Result<(), DomainError>;

    /// Handler name for logging.
    fn name(&self) -> &'static str;
}
