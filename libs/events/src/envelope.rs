use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tarla_id::{AggregateSeq, RequestId};

use crate::EventError;

/// Who caused an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    /// Farmer or pilot, through the app.
    User,
    /// Operations staff.
    Admin,
    /// Dispatcher, replan worker or weekly job.
    #[default]
    System,
}

impl ActorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
            Self::System => "system",
        }
    }
}

impl fmt::Display for ActorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateType {
    #[default]
    Mission,
    Pilot,
    Subscription,
}

impl AggregateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mission => "mission",
            Self::Pilot => "pilot",
            Self::Subscription => "subscription",
        }
    }
}

impl fmt::Display for AggregateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A published event plus the metadata consumers route and audit on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope<P> {
    pub event_type: String,
    pub event_version: i32,

    pub aggregate_type: AggregateType,
    pub aggregate_id: String,
    /// Starts at 1 for each aggregate.
    pub aggregate_seq: AggregateSeq,

    pub actor_type: ActorType,
    pub actor_id: String,

    pub occurred_at: DateTime<Utc>,
    pub request_id: RequestId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    pub payload: P,
}

impl<P> EventEnvelope<P> {
    pub fn builder() -> EventEnvelopeBuilder<P> {
        EventEnvelopeBuilder::default()
    }

    /// `"{aggregate_type}/{aggregate_id}"`, the partition key for consumers
    /// that need per-aggregate ordering.
    pub fn stream_key(&self) -> String {
        format!("{}/{}", self.aggregate_type, self.aggregate_id)
    }
}

/// Collects envelope fields; [`build`](Self::build) checks the required ones.
#[derive(Debug)]
pub struct EventEnvelopeBuilder<P> {
    event_type: Option<String>,
    event_version: i32,
    aggregate: Option<(AggregateType, String)>,
    aggregate_seq: Option<AggregateSeq>,
    actor: Option<(ActorType, String)>,
    occurred_at: Option<DateTime<Utc>>,
    request_id: Option<RequestId>,
    correlation_id: Option<String>,
    payload: Option<P>,
}

impl<P> Default for EventEnvelopeBuilder<P> {
    fn default() -> Self {
        Self {
            event_type: None,
            event_version: 1,
            aggregate: None,
            aggregate_seq: None,
            actor: None,
            occurred_at: None,
            request_id: None,
            correlation_id: None,
            payload: None,
        }
    }
}

impl<P> EventEnvelopeBuilder<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn event_type(self, event_type: impl Into<String>) -> Self {
        Self {
            event_type: Some(event_type.into()),
            ..self
        }
    }

    pub fn event_version(self, event_version: i32) -> Self {
        Self {
            event_version,
            ..self
        }
    }

    pub fn aggregate(self, kind: AggregateType, id: impl Into<String>) -> Self {
        Self {
            aggregate: Some((kind, id.into())),
            ..self
        }
    }

    pub fn aggregate_seq(self, seq: AggregateSeq) -> Self {
        Self {
            aggregate_seq: Some(seq),
            ..self
        }
    }

    pub fn actor(self, kind: ActorType, id: impl Into<String>) -> Self {
        Self {
            actor: Some((kind, id.into())),
            ..self
        }
    }

    pub fn occurred_at(self, at: DateTime<Utc>) -> Self {
        Self {
            occurred_at: Some(at),
            ..self
        }
    }

    pub fn request_id(self, request_id: RequestId) -> Self {
        Self {
            request_id: Some(request_id),
            ..self
        }
    }

    pub fn correlation_id(self, correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: Some(correlation_id.into()),
            ..self
        }
    }

    pub fn payload(self, payload: P) -> Self {
        Self {
            payload: Some(payload),
            ..self
        }
    }

    /// Fails on the first missing required field, in field order:
    /// `event_type`, `aggregate`, `actor`, `payload`. Timestamp, sequence
    /// and request id fall back to now, [`AggregateSeq::FIRST`] and a fresh id.
    pub fn build(self) -> Result<EventEnvelope<P>, EventError> {
        let event_type = self.event_type.ok_or(EventError::MissingField("event_type"))?;
        let (aggregate_type, aggregate_id) =
            self.aggregate.ok_or(EventError::MissingField("aggregate"))?;
        let (actor_type, actor_id) = self.actor.ok_or(EventError::MissingField("actor"))?;
        let payload = self.payload.ok_or(EventError::MissingField("payload"))?;

        Ok(EventEnvelope {
            event_type,
            event_version: self.event_version,
            aggregate_type,
            aggregate_id,
            aggregate_seq: self.aggregate_seq.unwrap_or_default(),
            actor_type,
            actor_id,
            occurred_at: self.occurred_at.unwrap_or_else(Utc::now),
            request_id: self.request_id.unwrap_or_default(),
            correlation_id: self.correlation_id,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    const MISSION: &str = "msn_01HV4Z2WQXKJNM8GPQY6VBKC3D";

    fn assigned() -> EventEnvelopeBuilder<Value> {
        EventEnvelope::builder()
            .event_type("mission.assigned")
            .aggregate(AggregateType::Mission, MISSION)
            .actor(ActorType::System, "auto_dispatcher")
            .payload(json!({ "pilot_id": "plt_01HV4Z3MXNKPQR9HSTZ7WCLD4E" }))
    }

    #[test]
    fn test_defaults_fill_optional_fields() {
        let envelope = assigned().build().unwrap();

        assert_eq!(envelope.event_version, 1);
        assert_eq!(envelope.aggregate_seq, AggregateSeq::FIRST);
        assert!(envelope.correlation_id.is_none());
        assert_eq!(envelope.stream_key(), format!("mission/{MISSION}"));
    }

    #[test]
    fn test_wire_shape() {
        let envelope = assigned()
            .correlation_id("corr-1")
            .aggregate_seq(AggregateSeq::new(4))
            .build()
            .unwrap();
        let wire = serde_json::to_value(&envelope).unwrap();

        assert_eq!(wire["actor_type"], "system");
        assert_eq!(wire["aggregate_type"], "mission");
        assert_eq!(wire["aggregate_seq"], 4);
        assert_eq!(wire["correlation_id"], "corr-1");

        let back: EventEnvelope<Value> = serde_json::from_value(wire).unwrap();
        assert_eq!(back.aggregate_id, MISSION);
        assert_eq!(back.request_id, envelope.request_id);
    }

    #[test]
    fn test_uncorrelated_envelope_omits_field() {
        let wire = serde_json::to_value(assigned().build().unwrap()).unwrap();
        assert!(wire.get("correlation_id").is_none());
    }

    #[test]
    fn test_missing_actor_is_reported() {
        let result = EventEnvelope::<Value>::builder()
            .event_type("mission.assigned")
            .aggregate(AggregateType::Mission, MISSION)
            .payload(json!({}))
            .build();

        assert_eq!(result.unwrap_err(), EventError::MissingField("actor"));
    }

    #[test]
    fn test_display_names() {
        assert_eq!(ActorType::Admin.to_string(), "admin");
        assert_eq!(AggregateType::Subscription.to_string(), "subscription");
    }
}
