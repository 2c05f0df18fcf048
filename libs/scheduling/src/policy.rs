//! Assignment policy tags attached to every dispatch decision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tarla_events::AssignmentSource;
use tarla_id::AdminId;

/// Why an assignment was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssignmentReason {
    AutoDispatch,
    AdminOverride,
    Reassignment,
}

impl AssignmentReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AutoDispatch => "AUTO_DISPATCH",
            Self::AdminOverride => "ADMIN_OVERRIDE",
            Self::Reassignment => "REASSIGNMENT",
        }
    }
}

impl std::fmt::Display for AssignmentReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who overrode the dispatcher, why and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideMetadata {
    pub admin_id: AdminId,
    pub reason_text: String,
    pub timestamp: DateTime<Utc>,
}

/// Source and reason of an assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentPolicy {
    pub source: AssignmentSource,
    pub reason: AssignmentReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_meta: Option<OverrideMetadata>,
}

impl AssignmentPolicy {
    /// Tag for regular dispatcher output.
    pub fn auto_dispatch() -> Self {
        Self {
            source: AssignmentSource::SystemSeed,
            reason: AssignmentReason::AutoDispatch,
            override_meta: None,
        }
    }

    /// Tag for missions re-matched after a disruption.
    pub fn reassignment() -> Self {
        Self {
            source: AssignmentSource::SystemSeed,
            reason: AssignmentReason::Reassignment,
            override_meta: None,
        }
    }

    /// Tag for a manual assignment; draws from the pull quota.
    pub fn admin_override(
        admin_id: AdminId,
        reason_text: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            source: AssignmentSource::Pull,
            reason: AssignmentReason::AdminOverride,
            override_meta: Some(OverrideMetadata {
                admin_id,
                reason_text: reason_text.into(),
                timestamp: at,
            }),
        }
    }

    pub fn is_override(&self) -> bool {
        self.override_meta.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_dispatch_tag() {
        let policy = AssignmentPolicy::auto_dispatch();
        assert_eq!(policy.source, AssignmentSource::SystemSeed);
        assert_eq!(policy.reason, AssignmentReason::AutoDispatch);
        assert!(!policy.is_override());
    }

    #[test]
    fn test_admin_override_carries_metadata() {
        let admin = AdminId::new();
        let at = Utc::now();
        let policy = AssignmentPolicy::admin_override(admin, "pilot requested swap", at);

        assert_eq!(policy.source, AssignmentSource::Pull);
        assert_eq!(policy.reason, AssignmentReason::AdminOverride);
        let meta = policy.override_meta.unwrap();
        assert_eq!(meta.admin_id, admin);
        assert_eq!(meta.reason_text, "pilot requested swap");
        assert_eq!(meta.timestamp, at);
    }

    #[test]
    fn test_policy_wire_format() {
        let json = serde_json::to_value(AssignmentPolicy::reassignment()).unwrap();
        assert_eq!(json["source"], "SYSTEM_SEED");
        assert_eq!(json["reason"], "REASSIGNMENT");
        assert!(json.get("override_meta").is_none());
    }
}
