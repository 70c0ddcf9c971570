//! Inbound socket events for live views.
//!
//! This crate defines the message a browser sends over an upgraded socket
//! when the user interacts with a mounted page. It has no dependencies on
//! the other internal crates so both the session loop and the handler
//! context can share it.
//!
//! # Wire format
//!
//! ```json
//! {"id": "increment", "selector": "#count", "template": "count", "params": {"by": 2}}
//! ```
//!
//! Only `id` is required and it must be non-empty. `params` is kept as raw
//! JSON and decoded on demand by the handler into whatever shape it wants.

pub mod error;

use error::{Error, EventErrorKind};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::fmt;

/// A single user interaction received from a socket.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Event {
    /// Identifies which handler the event is routed to.
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Box<RawValue>>,
}

impl Event {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Decodes one socket frame, rejecting malformed JSON and events without an id.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        let event: Event = serde_json::from_slice(bytes).map_err(|err| Error {
            source: Some(err),
            error_kind: EventErrorKind::Malformed,
        })?;

        if event.id.is_empty() {
            return Err(Error {
                source: None,
                error_kind: EventErrorKind::MissingId,
            });
        }

        Ok(event)
    }

    pub fn with_params<T: Serialize>(mut self, params: &T) -> Result<Self, Error> {
        let raw = serde_json::value::to_raw_value(params).map_err(|err| Error {
            source: Some(err),
            error_kind: EventErrorKind::Malformed,
        })?;
        self.params = Some(raw);
        Ok(self)
    }

    /// Decodes `params` into `T`. A missing payload decodes as JSON `null`,
    /// so `Option<_>` and unit shapes accept it.
    pub fn decode_params<T: DeserializeOwned>(&self) -> Result<T, Error> {
        let raw = self.params.as_ref().map(|p| p.get()).unwrap_or("null");
        serde_json::from_str(raw).map_err(|err| Error {
            source: Some(err),
            error_kind: EventErrorKind::Params,
        })
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match serde_json::to_string_pretty(self) {
            Ok(json) => write!(f, "{json}"),
            Err(_) => write!(f, "{self:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Step {
        by: i64,
    }

    #[test]
    fn from_slice_decodes_all_fields() {
        let event = Event::from_slice(
            br##"{"id":"increment","selector":"#count","template":"count","params":{"by":2}}"##,
        )
        .unwrap();

        assert_eq!(event.id, "increment");
        assert_eq!(event.selector.as_deref(), Some("#count"));
        assert_eq!(event.template.as_deref(), Some("count"));
        assert_eq!(event.decode_params::<Step>().unwrap(), Step { by: 2 });
    }

    #[test]
    fn from_slice_rejects_missing_or_empty_id() {
        let missing = Event::from_slice(br#"{"params":{}}"#).unwrap_err();
        assert_eq!(missing.error_kind, EventErrorKind::MissingId);

        let empty = Event::from_slice(br#"{"id":""}"#).unwrap_err();
        assert_eq!(empty.error_kind, EventErrorKind::MissingId);
    }

    #[test]
    fn from_slice_rejects_malformed_json() {
        let err = Event::from_slice(b"{not json").unwrap_err();
        assert_eq!(err.error_kind, EventErrorKind::Malformed);
        assert!(err.source.is_some());
    }

    #[test]
    fn decode_params_reports_shape_mismatch() {
        let event = Event::from_slice(br#"{"id":"x","params":{"by":"two"}}"#).unwrap();
        let err = event.decode_params::<Step>().unwrap_err();
        assert_eq!(err.error_kind, EventErrorKind::Params);
    }

    #[test]
    fn decode_params_without_payload_is_null() {
        let event = Event::new("noop");
        assert_eq!(event.decode_params::<Option<Step>>().unwrap(), None);
        assert!(event.decode_params::<Step>().is_err());
    }

    #[test]
    fn with_params_round_trips_through_decode() {
        let event = Event::new("set")
            .with_params(&serde_json::json!({"by": 5}))
            .unwrap();
        assert_eq!(event.decode_params::<Step>().unwrap(), Step { by: 5 });
    }
}
