//! Port implementations shipped with the engine.

pub mod memory;

pub use memory::{
    InMemoryAuditLog, InMemoryEventSink, InMemoryMissionStore, InMemoryReplanQueue, JobLogEntry,
};
