use async_trait::async_trait;

use crate::Event;

/// Reacts to one event and returns the follow-up events it caused.
///
/// Handlers form the stages of a pipeline: the pipeline feeds every event to
/// every handler, and a handler ignores events it does not care about by
/// returning an empty vector. Returning follow-up events instead of calling
/// the next stage directly keeps each stage testable on its own.
///
/// Errors are reported to the pipeline, which decides whether they are fatal.
#[async_trait]
pub trait EventHandler<E: Event>: Send + Sync {
    /// Stable name used in logs.
    fn name(&self) -> &'static str;

    async fn handle(&self, event: &E) -> anyhow::Result<Vec<E>>;
}
