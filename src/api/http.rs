//! Backend that talks to the panel server over HTTP.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use urlencoding::encode;

use super::envelope::{RawResponse, ResponseHandler};
use super::{AuthApi, ConfigApi, ContainerApi, HealthApi, ROOT_PATH, UserApi, VolumeApi};
use crate::error::Result;
use crate::models::{
    Container, ContainerAction, LoginCredentials, LoginResponse, LoginResult, NewUser,
    PublicConfig, RegisterRequest, StatusReport, SystemConfig, UpdateConfigRequest, User, Volume,
    VolumeFileContent, VolumeFileInfo,
};
use crate::store::Storage;
use crate::store::storage::TOKEN_KEY;

/// Headers for an authenticated call.
///
/// The token is read from durable storage every time, so a login or logout
/// by another handle on the same storage is picked up immediately. Without a
/// token the request goes out unauthenticated and the server's 401 is left
/// to the response handler.
pub fn auth_headers(storage: &dyn Storage) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    if let Some(token) = storage.get(TOKEN_KEY) {
        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(value) => {
                headers.insert(AUTHORIZATION, value);
            }
            Err(_) => debug!("Stored token is not a valid header value, sending without it"),
        }
    }

    headers
}

fn public_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

pub struct HttpBackend {
    client: Client,
    base_url: String,
    responses: ResponseHandler,
}

impl HttpBackend {
    /// `base_url` includes the `/api` prefix, e.g. `http://localhost:8080/api`.
    pub fn new(base_url: impl Into<String>, responses: ResponseHandler) -> Self {
        Self::with_client(Client::new(), base_url, responses)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>, responses: ResponseHandler) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            responses,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let headers = auth_headers(self.responses.session().storage().as_ref());
        debug!(%method, path, "API request");
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .headers(headers)
    }

    fn public_request(&self, method: Method, path: &str) -> RequestBuilder {
        debug!(%method, path, "API request (public)");
        self.client
            .request(method, format!("{}{}", self.base_url, path))
            .headers(public_headers())
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await?.to_vec();

        debug!(status, bytes = body.len(), "API response");

        self.responses.handle(RawResponse {
            status,
            content_type,
            body,
        })
    }

    /// For endpoints that answer with a bare acknowledgement.
    async fn send_ack(&self, request: RequestBuilder) -> Result<()> {
        let _: Value = self.send(request).await?;
        Ok(())
    }
}

fn volume_path(name: &str, suffix: &str, path: &str) -> String {
    format!("/volumes/{}/{}?path={}", encode(name), suffix, encode(path))
}

#[async_trait]
impl AuthApi for HttpBackend {
    async fn login(&self, credentials: &LoginCredentials) -> Result<LoginResult> {
        let response: LoginResponse = self
            .send(self.public_request(Method::POST, "/auth/login").json(credentials))
            .await?;
        Ok(LoginResult::from_response(response))
    }

    async fn register(&self, request: &RegisterRequest) -> Result<User> {
        self.send(self.public_request(Method::POST, "/auth/register").json(request))
            .await
    }

    async fn logout(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl UserApi for HttpBackend {
    async fn get_users(&self) -> Result<Vec<User>> {
        self.send(self.request(Method::GET, "/users")).await
    }

    async fn create_user(&self, user: &NewUser) -> Result<User> {
        self.send(self.request(Method::POST, "/users").json(user)).await
    }

    async fn delete_user(&self, id: i64) -> Result<()> {
        self.send_ack(self.request(Method::DELETE, &format!("/users/{id}")))
            .await
    }
}

#[async_trait]
impl ContainerApi for HttpBackend {
    async fn get_containers(&self) -> Result<Vec<Container>> {
        self.send(self.request(Method::GET, "/containers")).await
    }

    async fn get_container(&self, id: &str) -> Result<Container> {
        self.send(self.request(Method::GET, &format!("/containers/{}", encode(id))))
            .await
    }

    async fn control_container(&self, action: &ContainerAction) -> Result<()> {
        let path = format!(
            "/containers/{}/{}",
            encode(&action.container_id),
            action.action.as_str()
        );
        self.send_ack(self.request(Method::POST, &path)).await
    }
}

#[async_trait]
impl VolumeApi for HttpBackend {
    async fn get_volumes(&self) -> Result<Vec<Volume>> {
        self.send(self.request(Method::GET, "/volumes")).await
    }

    async fn explore_volume_files(
        &self,
        name: &str,
        path: Option<&str>,
    ) -> Result<Vec<VolumeFileInfo>> {
        let path = volume_path(name, "files", path.unwrap_or(ROOT_PATH));
        self.send(self.request(Method::GET, &path)).await
    }

    async fn read_volume_file(&self, name: &str, path: &str) -> Result<VolumeFileContent> {
        self.send(self.request(Method::GET, &volume_path(name, "file", path)))
            .await
    }

    async fn delete_volume_file(&self, name: &str, path: &str) -> Result<()> {
        self.send_ack(self.request(Method::DELETE, &volume_path(name, "file", path)))
            .await
    }

    async fn delete_volume(&self, name: &str) -> Result<()> {
        self.send_ack(self.request(Method::DELETE, &format!("/volumes/{}", encode(name))))
            .await
    }
}

#[async_trait]
impl ConfigApi for HttpBackend {
    async fn get_config(&self) -> Result<SystemConfig> {
        self.send(self.request(Method::GET, "/config")).await
    }

    async fn update_config(&self, config: &SystemConfig) -> Result<SystemConfig> {
        self.send(self.request(Method::PUT, "/config").json(config))
            .await
    }

    async fn patch_config(&self, patch: &UpdateConfigRequest) -> Result<SystemConfig> {
        self.send(self.request(Method::PATCH, "/config").json(patch))
            .await
    }

    async fn get_public_config(&self) -> Result<PublicConfig> {
        self.send(self.public_request(Method::GET, "/config/public"))
            .await
    }
}

#[async_trait]
impl HealthApi for HttpBackend {
    async fn check_health(&self) -> Result<StatusReport> {
        self.send(self.public_request(Method::GET, "/health")).await
    }

    async fn check_docker_health(&self) -> Result<StatusReport> {
        self.send(self.request(Method::GET, "/docker/health")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStorage;

    #[test]
    fn headers_without_token() {
        let storage = MemoryStorage::new();
        let headers = auth_headers(&storage);

        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert!(headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn headers_follow_storage() {
        let storage = MemoryStorage::new();
        storage.set(TOKEN_KEY, "abc.def").unwrap();
        assert_eq!(auth_headers(&storage).get(AUTHORIZATION).unwrap(), "Bearer abc.def");

        storage.remove(TOKEN_KEY).unwrap();
        assert!(auth_headers(&storage).get(AUTHORIZATION).is_none());
    }

    #[test]
    fn volume_paths_are_percent_encoded() {
        assert_eq!(
            volume_path("my data?", "files", "/a b/c#d&e"),
            "/volumes/my%20data%3F/files?path=%2Fa%20b%2Fc%23d%26e"
        );
    }
}
