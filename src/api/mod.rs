//! Resource API modules.
//!
//! Each resource family (auth, users, containers, volumes, config, health) is
//! a trait with one method per REST endpoint. Two backends implement all of
//! them:
//!
//! - `HttpBackend`: talks to the real server over HTTP
//! - `MockBackend`: answers from an in-memory fixture
//!
//! The backend is picked once at startup by [`create_api`]; callers only see
//! `Arc<dyn PanelApi>`.

pub mod envelope;
pub mod http;
pub mod mock;
pub mod navigation;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::config::AppConfig;
use crate::error::Result;
use crate::models::{
    Container, ContainerAction, LoginCredentials, LoginResult, NewUser, PublicConfig,
    RegisterRequest, StatusReport, SystemConfig, UpdateConfigRequest, User, Volume,
    VolumeFileContent, VolumeFileInfo,
};
use crate::store::SessionStore;

pub use envelope::{Envelope, RawResponse, ResponseHandler, unwrap_envelope};
pub use http::HttpBackend;
pub use mock::{MOCK_TOKEN, MockBackend, MockState};
pub use navigation::{LOGIN_ROUTE, Navigator};

/// Directory listed when no path is given.
pub const ROOT_PATH: &str = "/";

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, credentials: &LoginCredentials) -> Result<LoginResult>;
    async fn register(&self, request: &RegisterRequest) -> Result<User>;
    /// The server keeps no session state; this only exists so both backends
    /// have the same shape.
    async fn logout(&self) -> Result<()>;
}

#[async_trait]
pub trait UserApi: Send + Sync {
    async fn get_users(&self) -> Result<Vec<User>>;
    async fn create_user(&self, user: &NewUser) -> Result<User>;
    async fn delete_user(&self, id: i64) -> Result<()>;
}

#[async_trait]
pub trait ContainerApi: Send + Sync {
    async fn get_containers(&self) -> Result<Vec<Container>>;
    async fn get_container(&self, id: &str) -> Result<Container>;
    async fn control_container(&self, action: &ContainerAction) -> Result<()>;
}

#[async_trait]
pub trait VolumeApi: Send + Sync {
    async fn get_volumes(&self) -> Result<Vec<Volume>>;
    /// Lists `path` inside the volume, `/` when `None`.
    async fn explore_volume_files(&self, name: &str, path: Option<&str>)
    -> Result<Vec<VolumeFileInfo>>;
    async fn read_volume_file(&self, name: &str, path: &str) -> Result<VolumeFileContent>;
    async fn delete_volume_file(&self, name: &str, path: &str) -> Result<()>;
    async fn delete_volume(&self, name: &str) -> Result<()>;
}

#[async_trait]
pub trait ConfigApi: Send + Sync {
    async fn get_config(&self) -> Result<SystemConfig>;
    /// Replace the whole configuration.
    async fn update_config(&self, config: &SystemConfig) -> Result<SystemConfig>;
    /// Change only the fields present in `patch`.
    async fn patch_config(&self, patch: &UpdateConfigRequest) -> Result<SystemConfig>;
    async fn get_public_config(&self) -> Result<PublicConfig>;
}

#[async_trait]
pub trait HealthApi: Send + Sync {
    async fn check_health(&self) -> Result<StatusReport>;
    async fn check_docker_health(&self) -> Result<StatusReport>;
}

/// Everything the control panel can ask of a backend.
pub trait PanelApi: AuthApi + UserApi + ContainerApi + VolumeApi + ConfigApi + HealthApi {}

impl<T> PanelApi for T where T: AuthApi + UserApi + ContainerApi + VolumeApi + ConfigApi + HealthApi
{}

/// Build the backend selected by `config.use_mock`.
pub fn create_api(
    config: &AppConfig,
    session: SessionStore,
    navigator: Arc<dyn Navigator>,
) -> Arc<dyn PanelApi> {
    if config.use_mock {
        info!(latency_ms = config.mock_latency_ms, "Using in-memory mock backend");
        return Arc::new(MockBackend::new(Duration::from_millis(config.mock_latency_ms)));
    }

    info!(url = %config.api_url, "Using HTTP backend");
    Arc::new(HttpBackend::new(
        config.api_url.clone(),
        ResponseHandler::new(session, navigator),
    ))
}
