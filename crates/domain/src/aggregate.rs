//! Traits for state rebuilt by folding timeline entries.

use common::TicketId;
use progress_store::Version;
use serde::{Serialize, de::DeserializeOwned};

/// A recorded fact about a saga. Never edited once appended.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Tag used in logs and the serialized timeline.
    fn event_type(&self) -> &'static str;
}

/// State derived from an append-only log of events.
///
/// A checkpoint stores the folded state; replaying the same events from
/// scratch must give the same result.
pub trait Aggregate: Send + Sync + Sized {
    /// The type of events this aggregate consumes.
    type Event: DomainEvent;

    fn aggregate_type() -> &'static str;

    fn id(&self) -> &TicketId;

    /// Returns the version of the last persisted checkpoint.
    fn version(&self) -> Version;

    /// Called after each successful checkpoint.
    fn set_version(&mut self, version: Version);

    /// Folds one event into the state. Infallible and free of side effects.
    fn apply(&mut self, event: Self::Event);

    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }
}
