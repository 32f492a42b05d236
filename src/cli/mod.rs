//! Command handlers behind the `dockpanel` binary.
//!
//! Each handler takes the wired [`AppContext`], calls the API and prints the
//! result. Errors bubble up as `anyhow` for `main` to report.

pub mod output;

use std::io::{self, BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::debug;

use crate::api::{
    AuthApi, ConfigApi, ContainerApi, HealthApi, LOGIN_ROUTE, MockBackend, Navigator, UserApi,
    VolumeApi,
};
use crate::config::AppConfig;
use crate::context::AppContext;
use crate::error::ApiError;
use crate::models::{
    Action, ContainerAction, LoginCredentials, NewUser, RegisterRequest, UpdateConfigRequest, User,
};
use crate::server::MockServer;
use crate::store::Theme;

pub use output::DisplayMode;

pub const SESSION_EXPIRED_HINT: &str =
    "Your session has expired. Run `dockpanel login` to sign in again.";

/// Navigation has no screen to switch to in a terminal. The re-login hint is
/// printed by `main` once the failed command returns, so a rejected login
/// never shows it.
pub struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn navigate(&self, route: &str) {
        if route == LOGIN_ROUTE {
            debug!("Session ended by the server");
        } else {
            debug!(route, "Ignoring navigation request");
        }
    }
}

/// Whether a command failed because the server ended the session.
pub fn session_expired(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ApiError>()
        .is_some_and(ApiError::is_session_expired)
}

fn require_session(ctx: &AppContext) -> Result<User> {
    match ctx.session.session().user() {
        Some(user) if ctx.session.is_authenticated() => Ok(user.clone()),
        _ => bail!("Not logged in. Run `dockpanel login` first."),
    }
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn password_or_prompt(password: Option<String>) -> Result<String> {
    match password {
        Some(p) => Ok(p),
        None => prompt("Password"),
    }
}

pub async fn login(ctx: &AppContext, username: &str, password: Option<String>) -> Result<()> {
    if ctx.session.take_session_expired() {
        println!("Your previous session expired. Please log in again.");
    }

    let credentials = LoginCredentials {
        username: username.to_string(),
        password: password_or_prompt(password)?,
    };

    match ctx.api.login(&credentials).await {
        Ok(result) => {
            ctx.session
                .login(result.user.clone(), result.token)
                .context("Failed to store session")?;
            println!("Logged in as {}", result.user.username);
            Ok(())
        }
        Err(ApiError::SessionExpired) => {
            // Bad credentials come back as 401, which also leaves an expiry notice.
            ctx.session.take_session_expired();
            bail!("Invalid credentials")
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn logout(ctx: &AppContext) -> Result<()> {
    if !ctx.session.is_authenticated() {
        println!("Not logged in.");
        return Ok(());
    }

    ctx.api.logout().await?;
    ctx.session.logout().context("Failed to clear stored session")?;
    println!("Logged out.");
    Ok(())
}

pub async fn register(
    ctx: &AppContext,
    username: &str,
    nickname: Option<String>,
    password: Option<String>,
) -> Result<()> {
    let public = ctx.api.get_public_config().await?;
    if public.disable_registration {
        bail!("Registration is disabled on this server");
    }

    let request = RegisterRequest {
        username: username.to_string(),
        nickname: nickname.unwrap_or_else(|| username.to_string()),
        password: password_or_prompt(password)?,
    };
    let user = ctx.api.register(&request).await?;
    println!("Registered {} (id {}). You can now log in.", user.username, user.id);
    Ok(())
}

pub fn whoami(ctx: &AppContext) -> Result<()> {
    let user = require_session(ctx)?;
    if user.nickname != user.username {
        println!("{} ({})", user.username, user.nickname);
    } else {
        println!("{}", user.username);
    }
    Ok(())
}

pub async fn list_users(ctx: &AppContext, mode: DisplayMode) -> Result<()> {
    require_session(ctx)?;
    let users = ctx.api.get_users().await?;
    println!("{}", output::users(&users, mode));
    Ok(())
}

pub async fn create_user(
    ctx: &AppContext,
    username: &str,
    nickname: Option<String>,
    password: Option<String>,
) -> Result<()> {
    require_session(ctx)?;
    let user = ctx
        .api
        .create_user(&NewUser {
            username: username.to_string(),
            nickname: nickname.unwrap_or_else(|| username.to_string()),
            password: password_or_prompt(password)?,
        })
        .await?;
    println!("Created user {} (id {})", user.username, user.id);
    Ok(())
}

pub async fn delete_user(ctx: &AppContext, id: i64) -> Result<()> {
    require_session(ctx)?;
    ctx.api.delete_user(id).await?;
    println!("Deleted user {id}");
    Ok(())
}

pub async fn list_containers(ctx: &AppContext, mode: DisplayMode) -> Result<()> {
    require_session(ctx)?;
    let containers = ctx.api.get_containers().await?;
    println!("{}", output::containers(&containers, mode));
    Ok(())
}

pub async fn show_container(ctx: &AppContext, id: &str) -> Result<()> {
    require_session(ctx)?;
    let container = ctx.api.get_container(id).await?;
    println!("{}", output::container_details(&container));
    Ok(())
}

pub async fn control_container(ctx: &AppContext, id: &str, action: Action) -> Result<()> {
    require_session(ctx)?;
    ctx.api
        .control_container(&ContainerAction {
            container_id: id.to_string(),
            action,
        })
        .await?;

    let container = ctx.api.get_container(id).await?;
    println!("{}: {} ({})", container.name, container.state, container.status);
    Ok(())
}

pub async fn list_volumes(ctx: &AppContext, mode: DisplayMode) -> Result<()> {
    require_session(ctx)?;
    let volumes = ctx.api.get_volumes().await?;
    println!("{}", output::volumes(&volumes, mode));
    Ok(())
}

pub async fn list_volume_files(
    ctx: &AppContext,
    name: &str,
    path: Option<&str>,
    mode: DisplayMode,
) -> Result<()> {
    require_session(ctx)?;
    let entries = ctx.api.explore_volume_files(name, path).await?;
    println!("{}", output::files(&entries, mode));
    Ok(())
}

pub async fn read_volume_file(ctx: &AppContext, name: &str, path: &str) -> Result<()> {
    require_session(ctx)?;
    let file = ctx.api.read_volume_file(name, path).await?;
    print!("{}", file.content);
    if !file.content.ends_with('\n') {
        println!();
    }
    Ok(())
}

pub async fn delete_volume_file(ctx: &AppContext, name: &str, path: &str) -> Result<()> {
    require_session(ctx)?;
    ctx.api.delete_volume_file(name, path).await?;
    println!("Deleted {path} from {name}");
    Ok(())
}

pub async fn delete_volume(ctx: &AppContext, name: &str) -> Result<()> {
    require_session(ctx)?;
    ctx.api.delete_volume(name).await?;
    println!("Deleted volume {name}");
    Ok(())
}

pub async fn show_config(ctx: &AppContext) -> Result<()> {
    require_session(ctx)?;
    let config = ctx.api.get_config().await?;
    println!("{}", output::system_config(&config));
    Ok(())
}

pub async fn patch_config(ctx: &AppContext, patch: UpdateConfigRequest) -> Result<()> {
    require_session(ctx)?;
    if patch.is_empty() {
        bail!("Nothing to change; pass at least one setting");
    }

    let config = ctx.api.patch_config(&patch).await?;
    println!("{}", output::system_config(&config));
    Ok(())
}

pub async fn public_config(ctx: &AppContext) -> Result<()> {
    let config = ctx.api.get_public_config().await?;
    println!("disable_registration  {}", config.disable_registration);
    Ok(())
}

pub async fn health(ctx: &AppContext) -> Result<()> {
    let server = ctx.api.check_health().await?;
    println!("server: {}", server.message.as_deref().unwrap_or("ok"));

    if !ctx.session.is_authenticated() {
        println!("docker: unknown (log in to check)");
        return Ok(());
    }

    match ctx.api.check_docker_health().await {
        Ok(docker) => println!("docker: {}", docker.message.as_deref().unwrap_or("ok")),
        Err(ApiError::SessionExpired) => return Err(ApiError::SessionExpired.into()),
        Err(e) => println!("docker: {e}"),
    }
    Ok(())
}

pub fn show_theme(ctx: &AppContext) -> Result<()> {
    let state = ctx.theme.state();
    if state.theme == Theme::System {
        println!("system ({})", state.resolved);
    } else {
        println!("{}", state.theme);
    }
    Ok(())
}

pub fn set_theme(ctx: &AppContext, theme: Theme) -> Result<()> {
    ctx.theme.set_theme(theme).context("Failed to store theme")?;
    show_theme(ctx)
}

pub fn toggle_theme(ctx: &AppContext) -> Result<()> {
    ctx.theme.toggle().context("Failed to store theme")?;
    show_theme(ctx)
}

/// Serve the seeded mock backend over HTTP until Ctrl-C.
pub async fn serve_mock(config: &AppConfig) -> Result<()> {
    let backend = MockBackend::new(std::time::Duration::from_millis(config.mock_latency_ms));
    let server = MockServer::new(backend, config.mock_bind);

    println!("Mock API listening on http://{}/api", config.mock_bind);

    tokio::select! {
        result = server.start() => result.context("Mock server failed")?,
        _ = tokio::signal::ctrl_c() => {
            server.shutdown();
            println!("Shutting down.");
        }
    }
    Ok(())
}

/// Write `config` as TOML to `path`. Refuses to overwrite unless `force`.
pub fn write_config(config: &AppConfig, path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists; pass --force to overwrite", path.display());
    }

    let content = toml::to_string_pretty(config).context("Failed to serialize config")?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote {}", path.display());
    Ok(())
}
