use chrono::{DateTime, Utc};

/// A domain-agnostic event.
///
/// Events are immutable facts describing a committed state change. They are
/// produced only after the mutation they describe has been persisted.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Stable event name (e.g. "remanejamento.tarefa.concluida").
    fn event_type(&self) -> &'static str;

    /// Schema version for this event type.
    fn version(&self) -> u32;

    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;
}
