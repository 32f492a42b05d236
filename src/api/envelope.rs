//! The JSON envelope every endpoint answers with, and its unwrapping.
//!
//! Success: `{"success": true, "message"?: string, "data"?: T}`
//! Failure: `{"success": false, "error": string}`

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::navigation::{LOGIN_ROUTE, Navigator};
use crate::error::{ApiError, Result};
use crate::store::SessionStore;

pub const UNAUTHORIZED: u16 = 401;

/// Response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T = Value> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    /// Successful envelope carrying a payload.
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            error: None,
        }
    }

    /// Successful envelope carrying a payload and a message.
    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
            error: None,
        }
    }

    /// Successful envelope with no payload.
    pub fn acknowledge(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            error: None,
        }
    }

    /// Failure envelope.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// The parts of an HTTP response the unwrapper looks at.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn json(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: Some("application/json".to_string()),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.contains("application/json"))
    }

    fn parse_json(&self) -> Option<Value> {
        if !self.is_json() {
            return None;
        }
        serde_json::from_slice(&self.body).ok()
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Turn a response into its payload, without any session side effects.
///
/// A 401 is reported like any other failure status here; `ResponseHandler`
/// is what gives it special treatment.
pub fn unwrap_envelope<T: DeserializeOwned>(response: &RawResponse) -> Result<T> {
    if !response.is_success() {
        return Err(match response.parse_json() {
            Some(body) => ApiError::Api(
                string_field(&body, "error")
                    .or_else(|| string_field(&body, "message"))
                    .unwrap_or_else(|| "Request failed".to_string()),
            ),
            None => ApiError::Api(format!("Request failed with status {}", response.status)),
        });
    }

    let body = response.parse_json().ok_or(ApiError::InvalidResponse)?;

    let success = body.get("success").and_then(Value::as_bool).unwrap_or(false);
    if !success {
        return Err(ApiError::Api(
            string_field(&body, "message").unwrap_or_else(|| "Request failed".to_string()),
        ));
    }

    // A present `data` key wins even when it is null; only an absent one
    // means "return the envelope itself".
    let payload = match body.get("data") {
        Some(data) => data.clone(),
        None => body,
    };
    Ok(serde_json::from_value(payload)?)
}

/// Unwraps responses and tears the session down on 401.
#[derive(Clone)]
pub struct ResponseHandler {
    session: SessionStore,
    navigator: Arc<dyn Navigator>,
}

impl ResponseHandler {
    pub fn new(session: SessionStore, navigator: Arc<dyn Navigator>) -> Self {
        Self { session, navigator }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn handle<T: DeserializeOwned>(&self, response: RawResponse) -> Result<T> {
        if response.status == UNAUTHORIZED {
            self.expire_session();
            return Err(ApiError::SessionExpired);
        }
        unwrap_envelope(&response)
    }

    fn expire_session(&self) {
        warn!("Server rejected credentials, ending session");

        if let Err(e) = self.session.logout() {
            warn!(error = %e, "Failed to clear stored session");
        }
        if let Err(e) = self.session.mark_session_expired() {
            warn!(error = %e, "Failed to record session expiry");
        }
        self.navigator.navigate(LOGIN_ROUTE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::User;
    use crate::store::storage::{SESSION_EXPIRED_KEY, TOKEN_KEY, USER_KEY};
    use crate::store::{MemoryStorage, Storage};
    use serde_json::json;
    use std::sync::Mutex;

    fn text(status: u16, body: &str) -> RawResponse {
        RawResponse {
            status,
            content_type: Some("text/plain".to_string()),
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn returns_data_unchanged() {
        let data = json!({"id": "c1", "nested": {"list": [1, 2, 3]}, "flag": null});
        let body = json!({"success": true, "message": "ok", "data": data}).to_string();

        let value: Value = unwrap_envelope(&RawResponse::json(200, body)).unwrap();
        assert_eq!(value, data);
    }

    #[test]
    fn returns_typed_data() {
        let body = json!({"success": true, "data": [{"id": 1, "username": "admin", "nickname": "A"}]});
        let users: Vec<User> = unwrap_envelope(&RawResponse::json(200, body.to_string())).unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "admin");
    }

    #[test]
    fn returns_envelope_when_data_absent() {
        let body = json!({"success": true, "message": "Container started successfully"});
        let value: Value = unwrap_envelope(&RawResponse::json(200, body.to_string())).unwrap();
        assert_eq!(value, body);
    }

    #[test]
    fn null_data_is_still_data() {
        let body = json!({"success": true, "data": null});
        let value: Value = unwrap_envelope(&RawResponse::json(200, body.to_string())).unwrap();
        assert_eq!(value, Value::Null);
    }

    #[test]
    fn unsuccessful_envelope_surfaces_message() {
        let body = json!({"success": false, "message": "Container not found"});
        let err = unwrap_envelope::<Value>(&RawResponse::json(200, body.to_string())).unwrap_err();
        assert_eq!(err.to_string(), "Container not found");
    }

    #[test]
    fn unsuccessful_envelope_without_message() {
        let body = json!({"success": false});
        let err = unwrap_envelope::<Value>(&RawResponse::json(200, body.to_string())).unwrap_err();
        assert_eq!(err.to_string(), "Request failed");
    }

    #[test]
    fn failure_status_surfaces_error_field() {
        let body = json!({"success": false, "error": "Volume is in use"});
        let err = unwrap_envelope::<Value>(&RawResponse::json(409, body.to_string())).unwrap_err();
        assert!(matches!(&err, ApiError::Api(m) if m == "Volume is in use"));
    }

    #[test]
    fn failure_status_falls_back_to_message_field() {
        let body = json!({"success": false, "message": "Invalid request body"});
        let err = unwrap_envelope::<Value>(&RawResponse::json(400, body.to_string())).unwrap_err();
        assert_eq!(err.to_string(), "Invalid request body");
    }

    #[test]
    fn failure_status_without_json() {
        let err = unwrap_envelope::<Value>(&text(502, "Bad Gateway")).unwrap_err();
        assert_eq!(err.to_string(), "Request failed with status 502");
    }

    #[test]
    fn success_status_without_json_is_invalid() {
        let err = unwrap_envelope::<Value>(&text(200, "<html></html>")).unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse));
        assert_eq!(err.to_string(), "Invalid response format");
    }

    #[test]
    fn json_content_type_with_garbage_body_is_invalid() {
        let err = unwrap_envelope::<Value>(&RawResponse::json(200, "{oops")).unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse));
    }

    #[test]
    fn mismatched_payload_is_decode_error() {
        let body = json!({"success": true, "data": "not a list"});
        let err = unwrap_envelope::<Vec<User>>(&RawResponse::json(200, body.to_string())).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[derive(Default)]
    struct Recorder {
        routes: Mutex<Vec<String>>,
    }

    impl Navigator for Recorder {
        fn navigate(&self, route: &str) {
            self.routes.lock().unwrap().push(route.to_string());
        }
    }

    fn logged_in() -> (Arc<dyn Storage>, ResponseHandler, Arc<Recorder>) {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let session = SessionStore::load(storage.clone());
        session
            .login(
                User {
                    id: 1,
                    username: "admin".to_string(),
                    nickname: "Administrator".to_string(),
                    created_at: None,
                    updated_at: None,
                },
                "tok".to_string(),
            )
            .unwrap();
        let recorder = Arc::new(Recorder::default());
        let handler = ResponseHandler::new(session, recorder.clone());
        (storage, handler, recorder)
    }

    #[test]
    fn unauthorized_tears_down_session() {
        let (storage, handler, recorder) = logged_in();

        let err = handler.handle::<Value>(text(401, "")).unwrap_err();

        assert!(err.is_session_expired());
        assert!(!handler.session().is_authenticated());
        assert!(storage.get(TOKEN_KEY).is_none());
        assert!(storage.get(USER_KEY).is_none());
        assert_eq!(storage.get(SESSION_EXPIRED_KEY).as_deref(), Some("true"));
        assert_eq!(*recorder.routes.lock().unwrap(), vec![LOGIN_ROUTE.to_string()]);
    }

    #[test]
    fn unauthorized_ignores_body() {
        let (_storage, handler, recorder) = logged_in();
        let body = json!({"success": true, "data": {"id": 1}});

        let err = handler
            .handle::<Value>(RawResponse::json(401, body.to_string()))
            .unwrap_err();

        assert!(err.is_session_expired());
        assert_eq!(recorder.routes.lock().unwrap().len(), 1);
    }

    #[test]
    fn other_statuses_leave_session_alone() {
        let (storage, handler, recorder) = logged_in();
        let body = json!({"success": false, "error": "forbidden"});

        let err = handler
            .handle::<Value>(RawResponse::json(403, body.to_string()))
            .unwrap_err();

        assert_eq!(err.to_string(), "forbidden");
        assert!(handler.session().is_authenticated());
        assert!(storage.get(SESSION_EXPIRED_KEY).is_none());
        assert!(recorder.routes.lock().unwrap().is_empty());
    }
}
