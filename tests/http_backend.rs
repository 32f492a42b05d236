use std::sync::{Arc, Mutex};

use dockpanel::api::{
    AuthApi, ConfigApi, ContainerApi, HealthApi, HttpBackend, LOGIN_ROUTE, Navigator,
    ResponseHandler, UserApi, VolumeApi,
};
use dockpanel::error::ApiError;
use dockpanel::models::{Action, ContainerAction, LoginCredentials, User};
use dockpanel::store::storage::{SESSION_EXPIRED_KEY, TOKEN_KEY, USER_KEY};
use dockpanel::store::{MemoryStorage, SessionStore, Storage};
use mockito::{Matcher, Server};
use serde_json::json;

#[derive(Default)]
struct RecordingNavigator {
    routes: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    fn routes(&self) -> Vec<String> {
        self.routes.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: &str) {
        self.routes.lock().unwrap().push(route.to_string());
    }
}

struct Fixture {
    backend: HttpBackend,
    session: SessionStore,
    storage: Arc<MemoryStorage>,
    navigator: Arc<RecordingNavigator>,
}

fn fixture(url: String) -> Fixture {
    let storage = Arc::new(MemoryStorage::new());
    let session = SessionStore::load(storage.clone());
    let navigator = Arc::new(RecordingNavigator::default());
    let backend = HttpBackend::new(url, ResponseHandler::new(session.clone(), navigator.clone()));

    Fixture {
        backend,
        session,
        storage,
        navigator,
    }
}

fn admin() -> User {
    User {
        id: 1,
        username: "admin".to_string(),
        nickname: "Administrator".to_string(),
        created_at: None,
        updated_at: None,
    }
}

#[tokio::test]
async fn test_protected_call_sends_bearer_token() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/users")
        .match_header("authorization", "Bearer tok-123")
        .match_header("content-type", "application/json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"success": true, "data": [admin()]}).to_string())
        .create_async()
        .await;

    let f = fixture(server.url());
    f.session.login(admin(), "tok-123".to_string()).unwrap();

    let users = f.backend.get_users().await.unwrap();
    assert_eq!(users, vec![admin()]);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_token_is_read_from_storage_each_call() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/containers")
        .match_header("authorization", "Bearer rotated")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"success": true, "data": []}).to_string())
        .create_async()
        .await;

    let f = fixture(server.url());
    f.session.login(admin(), "original".to_string()).unwrap();
    // Another handle on the same storage replaced the token.
    f.storage.set(TOKEN_KEY, "rotated").unwrap();

    assert!(f.backend.get_containers().await.unwrap().is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_login_sends_no_authorization_header() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/auth/login")
        .match_header("authorization", Matcher::Missing)
        .match_body(Matcher::Json(json!({"username": "admin", "password": "admin123"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "success": true,
                "message": "Login successful",
                "data": {"token": "jwt", "username": "admin"}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let f = fixture(server.url());
    f.storage.set(TOKEN_KEY, "stale").unwrap();

    let result = f
        .backend
        .login(&LoginCredentials {
            username: "admin".to_string(),
            password: "admin123".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(result.token, "jwt");
    assert_eq!(result.user.username, "admin");
    assert_eq!(result.user.id, 0);
    assert_eq!(result.user.nickname, "admin");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_unauthorized_tears_down_session() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/volumes")
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body(json!({"success": false, "error": "Invalid token"}).to_string())
        .create_async()
        .await;

    let f = fixture(server.url());
    f.session.login(admin(), "expired".to_string()).unwrap();

    let err = f.backend.get_volumes().await.unwrap_err();

    assert!(matches!(err, ApiError::SessionExpired));
    assert!(!f.session.is_authenticated());
    assert!(f.storage.get(TOKEN_KEY).is_none());
    assert!(f.storage.get(USER_KEY).is_none());
    assert_eq!(f.storage.get(SESSION_EXPIRED_KEY).as_deref(), Some("true"));
    assert_eq!(f.navigator.routes(), vec![LOGIN_ROUTE.to_string()]);

    assert!(f.session.take_session_expired());
    assert!(!f.session.take_session_expired());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_each_unauthorized_call_navigates_once() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/config")
        .with_status(401)
        .with_header("content-type", "text/plain")
        .with_body("unauthorized")
        .expect(2)
        .create_async()
        .await;

    let f = fixture(server.url());

    assert!(f.backend.get_config().await.unwrap_err().is_session_expired());
    assert!(f.backend.get_config().await.unwrap_err().is_session_expired());

    assert_eq!(f.navigator.routes().len(), 2);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_error_envelope_message_is_surfaced() {
    let mut server = Server::new_async().await;
    server
        .mock("DELETE", "/volumes/mysql-data")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(json!({"success": false, "error": "volume is in use"}).to_string())
        .create_async()
        .await;

    let f = fixture(server.url());
    let err = f.backend.delete_volume("mysql-data").await.unwrap_err();

    assert_eq!(err.to_string(), "volume is in use");
    assert!(f.navigator.routes().is_empty());
}

#[tokio::test]
async fn test_non_json_failure_reports_status() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/containers/abc")
        .with_status(502)
        .with_header("content-type", "text/html")
        .with_body("<h1>Bad Gateway</h1>")
        .create_async()
        .await;

    let f = fixture(server.url());
    let err = f.backend.get_container("abc").await.unwrap_err();

    assert_eq!(err.to_string(), "Request failed with status 502");
}

#[tokio::test]
async fn test_success_false_uses_message() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/containers/abc/stop")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"success": false, "message": "already stopped"}).to_string())
        .create_async()
        .await;

    let f = fixture(server.url());
    let err = f
        .backend
        .control_container(&ContainerAction {
            container_id: "abc".to_string(),
            action: Action::Stop,
        })
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "already stopped");
}

#[tokio::test]
async fn test_envelope_without_data_is_returned_whole() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/health")
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"success": true, "message": "Server is running"}).to_string())
        .create_async()
        .await;

    let f = fixture(server.url());
    f.session.login(admin(), "tok".to_string()).unwrap();

    let report = f.backend.check_health().await.unwrap();
    assert!(report.success);
    assert_eq!(report.message.as_deref(), Some("Server is running"));
}

#[tokio::test]
async fn test_html_success_is_invalid_response() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/config/public")
        .with_status(200)
        .with_header("content-type", "text/html")
        .with_body("<html></html>")
        .create_async()
        .await;

    let f = fixture(server.url());
    let err = f.backend.get_public_config().await.unwrap_err();

    assert!(matches!(err, ApiError::InvalidResponse));
    assert_eq!(err.to_string(), "Invalid response format");
}

#[tokio::test]
async fn test_volume_paths_are_encoded_on_the_wire() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/volumes/my%20data%3F/files")
        .match_query(Matcher::UrlEncoded(
            "path".to_string(),
            "/a b/c#d&e".to_string(),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"success": true, "data": []}).to_string())
        .create_async()
        .await;

    let f = fixture(server.url());
    let entries = f
        .backend
        .explore_volume_files("my data?", Some("/a b/c#d&e"))
        .await
        .unwrap();

    assert!(entries.is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_explore_defaults_to_root() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/volumes/redis-data/files")
        .match_query(Matcher::UrlEncoded("path".to_string(), "/".to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"success": true, "data": []}).to_string())
        .create_async()
        .await;

    let f = fixture(server.url());
    f.backend
        .explore_volume_files("redis-data", None)
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_delete_user_uses_id_in_path() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("DELETE", "/users/7")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"success": true, "message": "User deleted successfully"}).to_string())
        .create_async()
        .await;

    let f = fixture(server.url());
    f.backend.delete_user(7).await.unwrap();
    mock.assert_async().await;
}

#[tokio::test]
async fn test_unreachable_server_is_a_transport_error() {
    let f = fixture("http://127.0.0.1:1".to_string());
    let err = f.backend.check_health().await.unwrap_err();

    assert!(matches!(err, ApiError::Transport(_)));
    assert!(f.navigator.routes().is_empty());
}
