use crate::domain::VisitEvent;
use bytes::Bytes;
use serde::Serialize;

const EVENT_ENVELOPE_TYPE: &str = "event";

/// Body of `POST /api/track`: `{"payload": <event>, "type": "event"}`.
#[derive(Debug, Serialize)]
pub struct TrackEnvelope<'a> {
    pub payload: &'a VisitEvent,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

impl<'a> TrackEnvelope<'a> {
    pub fn new(payload: &'a VisitEvent) -> Self {
        Self {
            payload,
            kind: EVENT_ENVELOPE_TYPE,
        }
    }

    pub fn to_bytes(&self) -> Result<Bytes, serde_json::Error> {
        serde_json::to_vec(self).map(Bytes::from)
    }
}
