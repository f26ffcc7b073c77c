//! Envelope format for successful API responses.
//!
//! ```json
//! {
//!   "data": { ... },
//!   "meta": { "request_id": "...", "timestamp": "...", "response_time_ms": 5 },
//!   "_links": { "self": "..." }
//! }
//! ```
//!
//! Errors use the same `meta` block with an `errors` list, see [`super::error::AppError`].

use std::collections::HashMap;
use std::time::Instant;

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ApiMeta,
    #[serde(rename = "_links", skip_serializing_if = "HashMap::is_empty")]
    pub links: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct ApiMeta {
    /// UUID v7 so ids sort by arrival.
    pub request_id: String,
    pub timestamp: String,
    pub response_time_ms: u64,
}

impl ApiMeta {
    pub fn new(request_id: String, response_time_ms: u64) -> Self {
        Self {
            request_id,
            timestamp: chrono::Utc::now().to_rfc3339(),
            response_time_ms,
        }
    }
}

/// Request-scoped id and clock, started when a handler begins.
pub struct RequestTimer {
    start: Instant,
    request_id: String,
}

impl RequestTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
            request_id: Uuid::now_v7().to_string(),
        }
    }

    pub fn finish<T: Serialize>(self, data: T) -> ApiResponse<T> {
        let elapsed = self.start.elapsed().as_millis() as u64;
        ApiResponse {
            data,
            meta: ApiMeta::new(self.request_id, elapsed),
            links: HashMap::new(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub fn with_link(mut self, rel: &str, href: &str) -> Self {
        self.links.insert(rel.to_string(), href.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let resp = RequestTimer::start()
            .finish(serde_json::json!({ "reply": null }))
            .with_link("self", "/api/v1/messages");
        let value = serde_json::to_value(&resp).unwrap();

        assert!(value["data"]["reply"].is_null());
        assert_eq!(value["_links"]["self"], "/api/v1/messages");
        assert!(!value["meta"]["request_id"].as_str().unwrap().is_empty());
    }

    #[test]
    fn test_links_omitted_when_empty() {
        let resp = RequestTimer::start().finish(1);
        let value = serde_json::to_value(&resp).unwrap();
        assert!(value.get("_links").is_none());
    }
}
