//! In-memory backend for local development and tests.
//!
//! Every call sleeps for the configured latency to approximate a network
//! round trip, then reads or mutates its own [`MockState`]. Lookups by id,
//! name or path fail with a descriptive error and leave the state untouched,
//! the way the real server does.

mod fixtures;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use tokio::sync::RwLock;
use tokio::time::sleep;
use tracing::{debug, info};

pub use fixtures::{MockState, MockUser};

use super::{AuthApi, ConfigApi, ContainerApi, HealthApi, ROOT_PATH, UserApi, VolumeApi};
use crate::error::{ApiError, Result};
use crate::models::{
    Action, Container, ContainerAction, ContainerState, LoginCredentials, LoginResult, NewUser,
    PublicConfig, RegisterRequest, StatusReport, SystemConfig, UpdateConfigRequest, User, Volume,
    VolumeFileContent, VolumeFileInfo,
};

/// The token every successful mock login hands out.
pub const MOCK_TOKEN: &str = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.mock.token";

/// Default artificial latency per call.
pub const DEFAULT_LATENCY: Duration = Duration::from_millis(300);

#[derive(Clone)]
pub struct MockBackend {
    state: Arc<RwLock<MockState>>,
    latency: Duration,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new(DEFAULT_LATENCY)
    }
}

/// `/a/b/` and `a/b` both become `/a/b`; empty becomes `/`.
fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        ROOT_PATH.to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn parent_of(path: &str) -> String {
    match path.rfind('/') {
        Some(0) | None => ROOT_PATH.to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

impl MockBackend {
    /// Seeded fixture with the given per-call latency.
    pub fn new(latency: Duration) -> Self {
        Self::with_state(MockState::seeded(), latency)
    }

    pub fn with_state(state: MockState, latency: Duration) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
            latency,
        }
    }

    /// Seeded fixture that answers immediately.
    pub fn instant() -> Self {
        Self::new(Duration::ZERO)
    }

    /// A copy of the current state.
    pub async fn snapshot(&self) -> MockState {
        self.state.read().await.clone()
    }

    /// Whether `token` is one this backend issued.
    pub fn accepts_token(&self, token: &str) -> bool {
        token == MOCK_TOKEN
    }

    async fn delay(&self) {
        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }
    }

    fn new_user(
        state: &MockState,
        username: &str,
        nickname: &str,
        password: &str,
    ) -> Result<MockUser> {
        if state.users.iter().any(|u| u.user.username == username) {
            return Err(ApiError::api("Username already exists"));
        }

        let id = state.users.iter().map(|u| u.user.id).max().unwrap_or(0) + 1;
        let stamp = now();
        Ok(MockUser {
            user: User {
                id,
                username: username.to_string(),
                nickname: nickname.to_string(),
                created_at: Some(stamp.clone()),
                updated_at: Some(stamp),
            },
            password: password.to_string(),
        })
    }
}

#[async_trait]
impl AuthApi for MockBackend {
    async fn login(&self, credentials: &LoginCredentials) -> Result<LoginResult> {
        self.delay().await;
        let state = self.state.read().await;

        let user = state
            .users
            .iter()
            .find(|u| u.user.username == credentials.username && u.password == credentials.password)
            .ok_or_else(|| ApiError::api("Invalid credentials"))?;

        debug!(username = %user.user.username, "Mock login");
        Ok(LoginResult {
            user: user.user.clone(),
            token: MOCK_TOKEN.to_string(),
        })
    }

    async fn register(&self, request: &RegisterRequest) -> Result<User> {
        self.delay().await;
        let mut state = self.state.write().await;

        if state.config.disable_registration {
            return Err(ApiError::api("Registration is disabled"));
        }

        let created = Self::new_user(&state, &request.username, &request.nickname, &request.password)?;
        let user = created.user.clone();
        state.users.push(created);

        info!(id = user.id, username = %user.username, "Mock user registered");
        Ok(user)
    }

    async fn logout(&self) -> Result<()> {
        self.delay().await;
        Ok(())
    }
}

#[async_trait]
impl UserApi for MockBackend {
    async fn get_users(&self) -> Result<Vec<User>> {
        self.delay().await;
        let state = self.state.read().await;
        Ok(state.users.iter().map(|u| u.user.clone()).collect())
    }

    async fn create_user(&self, user: &NewUser) -> Result<User> {
        self.delay().await;
        let mut state = self.state.write().await;

        let created = Self::new_user(&state, &user.username, &user.nickname, &user.password)?;
        let user = created.user.clone();
        state.users.push(created);

        info!(id = user.id, username = %user.username, "Mock user created");
        Ok(user)
    }

    async fn delete_user(&self, id: i64) -> Result<()> {
        self.delay().await;
        let mut state = self.state.write().await;

        let idx = state
            .users
            .iter()
            .position(|u| u.user.id == id)
            .ok_or_else(|| ApiError::api("User not found"))?;
        state.users.remove(idx);

        info!(id, "Mock user deleted");
        Ok(())
    }
}

#[async_trait]
impl ContainerApi for MockBackend {
    async fn get_containers(&self) -> Result<Vec<Container>> {
        self.delay().await;
        Ok(self.state.read().await.containers.clone())
    }

    async fn get_container(&self, id: &str) -> Result<Container> {
        self.delay().await;
        let state = self.state.read().await;
        state
            .containers
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| ApiError::api("Container not found"))
    }

    async fn control_container(&self, action: &ContainerAction) -> Result<()> {
        self.delay().await;
        let mut state = self.state.write().await;

        let container = state
            .containers
            .iter_mut()
            .find(|c| c.id == action.container_id)
            .ok_or_else(|| ApiError::api("Container not found"))?;

        let (new_state, status) = match action.action {
            Action::Start | Action::Restart => (ContainerState::Running, "Up 1 second"),
            Action::Stop => (ContainerState::Exited, "Exited (0) 1 second ago"),
        };
        container.state = new_state;
        container.status = status.to_string();

        info!(id = %action.container_id, action = %action.action, "Mock container action");
        Ok(())
    }
}

#[async_trait]
impl VolumeApi for MockBackend {
    async fn get_volumes(&self) -> Result<Vec<Volume>> {
        self.delay().await;
        Ok(self.state.read().await.volumes.clone())
    }

    async fn explore_volume_files(
        &self,
        name: &str,
        path: Option<&str>,
    ) -> Result<Vec<VolumeFileInfo>> {
        self.delay().await;
        let state = self.state.read().await;
        let path = normalize_path(path.unwrap_or(ROOT_PATH));

        match state.listings.get(&(name.to_string(), path.clone())) {
            Some(entries) if !entries.is_empty() => Ok(entries.clone()),
            _ => Err(ApiError::Api(format!(
                "Directory {path} in volume {name} not found or empty"
            ))),
        }
    }

    async fn read_volume_file(&self, name: &str, path: &str) -> Result<VolumeFileContent> {
        self.delay().await;
        let state = self.state.read().await;
        let path = normalize_path(path);

        state
            .files
            .get(&(name.to_string(), path.clone()))
            .cloned()
            .ok_or_else(|| ApiError::Api(format!("File {path} not found in volume {name}")))
    }

    async fn delete_volume_file(&self, name: &str, path: &str) -> Result<()> {
        self.delay().await;
        let mut state = self.state.write().await;
        let path = normalize_path(path);
        let key = (name.to_string(), parent_of(&path));

        let entries = state
            .listings
            .get_mut(&key)
            .ok_or_else(|| ApiError::Api(format!("File {path} not found in volume {name}")))?;
        let idx = entries
            .iter()
            .position(|e| e.path == path)
            .ok_or_else(|| ApiError::Api(format!("File {path} not found in volume {name}")))?;
        if entries[idx].is_directory {
            return Err(ApiError::Api(format!("{path} is a directory")));
        }

        entries.remove(idx);
        state.files.remove(&(name.to_string(), path.clone()));

        info!(volume = name, path = %path, "Mock volume file deleted");
        Ok(())
    }

    async fn delete_volume(&self, name: &str) -> Result<()> {
        self.delay().await;
        let mut state = self.state.write().await;

        let idx = state
            .volumes
            .iter()
            .position(|v| v.name == name)
            .ok_or_else(|| ApiError::Api(format!("Volume {name} not found")))?;

        let users = state.volumes[idx].containers.len();
        if users > 0 {
            return Err(ApiError::Api(format!(
                "Volume {name} is in use by {users} container(s)"
            )));
        }

        state.volumes.remove(idx);
        state.listings.retain(|(volume, _), _| volume != name);
        state.files.retain(|(volume, _), _| volume != name);

        info!(volume = name, "Mock volume deleted");
        Ok(())
    }
}

#[async_trait]
impl ConfigApi for MockBackend {
    async fn get_config(&self) -> Result<SystemConfig> {
        self.delay().await;
        Ok(self.state.read().await.config.clone())
    }

    async fn update_config(&self, config: &SystemConfig) -> Result<SystemConfig> {
        self.delay().await;
        let mut state = self.state.write().await;
        state.config = config.clone();
        Ok(state.config.clone())
    }

    async fn patch_config(&self, patch: &UpdateConfigRequest) -> Result<SystemConfig> {
        self.delay().await;
        let mut state = self.state.write().await;
        patch.apply_to(&mut state.config);
        Ok(state.config.clone())
    }

    async fn get_public_config(&self) -> Result<PublicConfig> {
        self.delay().await;
        Ok(PublicConfig {
            disable_registration: self.state.read().await.config.disable_registration,
        })
    }
}

#[async_trait]
impl HealthApi for MockBackend {
    async fn check_health(&self) -> Result<StatusReport> {
        self.delay().await;
        Ok(StatusReport {
            success: true,
            message: Some("Server is running".to_string()),
        })
    }

    async fn check_docker_health(&self) -> Result<StatusReport> {
        self.delay().await;
        Ok(StatusReport {
            success: true,
            message: Some("Docker daemon is accessible".to_string()),
        })
    }
}
