//! # tarla-events
//!
//! Events the scheduling engine publishes after a state change has been
//! validated and stored.
//!
//! Payloads carry identifiers, dates and reason codes only. Farmer names,
//! phone numbers and field geometry never leave the mission store.
//!
//! Each [`EventEnvelope`] names its aggregate (a mission or a pilot), the
//! actor that caused the change and an optional correlation id that ties
//! together everything one job run or queue task produced. Event names
//! follow `mission.*` and `pilot.*`; see [`event_types`].

mod envelope;
mod error;
mod types;

pub use envelope::{ActorType, AggregateType, EventEnvelope, EventEnvelopeBuilder};
pub use error::EventError;
pub use types::*;
