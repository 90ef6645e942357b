//! The uniform `{ok, status, data}` result returned for every request.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::http::HttpResponse;

/// Result of a request that reached the backend (or a refresh that did not).
///
/// `ok` always equals `200 <= status < 300`. `data` holds the parsed body only
/// when the response declared `application/json` and the body parsed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    pub ok: bool,
    pub status: u16,
    pub data: Option<Value>,
}

impl Envelope {
    /// Build an envelope from a raw response. Parse failures degrade to
    /// `data: None`.
    pub fn from_response(response: &HttpResponse) -> Self {
        Self::new(response.status, parse_json(response))
    }

    pub fn new(status: u16, data: Option<Value>) -> Self {
        Self {
            ok: (200..300).contains(&status),
            status,
            data,
        }
    }

    /// Envelope standing in for a request that never got an answer.
    pub(crate) fn unreachable() -> Self {
        Self::new(0, None)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Backend error code from `data.error`, when present.
    pub fn error_code(&self) -> Option<&str> {
        self.data.as_ref()?.get("error")?.as_str()
    }

    /// Deserialize `data` into `T`. `None` when there is no data or it does
    /// not have that shape.
    pub fn decode<T: DeserializeOwned>(&self) -> Option<T> {
        let data = self.data.clone()?;
        serde_json::from_value(data).ok()
    }
}

fn parse_json(response: &HttpResponse) -> Option<Value> {
    if !response
        .content_type()
        .to_ascii_lowercase()
        .contains("application/json")
    {
        return None;
    }
    serde_json::from_slice(&response.body).ok()
}
