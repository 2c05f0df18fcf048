use serde::{Deserialize, Serialize};

use crate::define_id;

define_id!(PilotId, "plt");
define_id!(MissionId, "msn");
define_id!(FieldId, "fld");
define_id!(SubscriptionId, "sub");

define_id!(ReplanTaskId, "rpl");
define_id!(RequestId, "req");
define_id!(AdminId, "adm");

/// Position of an event within one aggregate's history, starting at 1.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AggregateSeq(u32);

impl AggregateSeq {
    pub const FIRST: Self = Self(1);

    #[must_use]
    pub const fn new(seq: u32) -> Self {
        Self(seq)
    }

    #[must_use]
    pub const fn value(&self) -> u32 {
        self.0
    }

    /// Saturates at `u32::MAX` rather than wrapping back to zero.
    #[must_use]
    pub const fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl Default for AggregateSeq {
    fn default() -> Self {
        Self::FIRST
    }
}

impl std::fmt::Display for AggregateSeq {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
