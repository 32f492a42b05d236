use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dockpanel::cli::{self, DisplayMode, TerminalNavigator};
use dockpanel::models::{Action, UpdateConfigRequest};
use dockpanel::store::Theme;
use dockpanel::{config, context, logging};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "dockpanel")]
#[command(about = "Control panel client for a Docker management server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalArgs,

    /// Show fewer columns in lists
    #[arg(long, global = true)]
    compact: bool,
}

/// Flags that override the layered config.
#[derive(Args, Serialize)]
struct GlobalArgs {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Use the in-memory mock backend instead of the server
    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long, global = true)]
    use_mock: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long, global = true)]
    mock_latency_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long, global = true)]
    verbose: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long, global = true)]
    log_json: Option<bool>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session
    Login {
        username: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Create an account on a server that allows registration
    Register {
        username: String,
        #[arg(long)]
        nickname: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    /// Show the logged-in user
    Whoami,
    #[command(subcommand)]
    Users(UsersCommand),
    #[command(subcommand)]
    Containers(ContainersCommand),
    #[command(subcommand)]
    Volumes(VolumesCommand),
    /// Server configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Check the server and its Docker daemon
    Health,
    /// Colour theme preference
    #[command(subcommand)]
    Theme(ThemeCommand),
    /// Serve the mock backend over HTTP
    ServeMock(ServeArgs),
    /// Write the effective client configuration to a TOML file
    ConfigInit {
        /// Defaults to dockpanel.toml, or DOCKPANEL_CONFIG when set
        path: Option<PathBuf>,
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum UsersCommand {
    List,
    Create {
        username: String,
        #[arg(long)]
        nickname: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    Delete {
        id: i64,
    },
}

#[derive(Subcommand)]
enum ContainersCommand {
    List,
    Show { id: String },
    Start { id: String },
    Stop { id: String },
    Restart { id: String },
}

#[derive(Subcommand)]
enum VolumesCommand {
    List,
    /// List a directory inside a volume
    Files { name: String, path: Option<String> },
    /// Print a file from a volume
    Cat { name: String, path: String },
    /// Delete a file from a volume
    Rm { name: String, path: String },
    /// Delete an unused volume
    Delete { name: String },
}

#[derive(Subcommand)]
enum ConfigCommand {
    Show,
    /// Change one or more settings
    Set(ConfigSetArgs),
    /// Settings visible without logging in
    Public,
}

#[derive(Args)]
struct ConfigSetArgs {
    #[arg(long)]
    docker_socket: Option<String>,
    #[arg(long)]
    log_level: Option<String>,
    #[arg(long)]
    volume_explorer_image: Option<String>,
    /// Hours
    #[arg(long)]
    session_max_timeout: Option<u32>,
    #[arg(long)]
    disable_registration: Option<bool>,
}

impl From<ConfigSetArgs> for UpdateConfigRequest {
    fn from(args: ConfigSetArgs) -> Self {
        Self {
            docker_socket: args.docker_socket,
            log_level: args.log_level,
            volume_explorer_image: args.volume_explorer_image,
            session_max_timeout: args.session_max_timeout,
            disable_registration: args.disable_registration,
        }
    }
}

#[derive(Subcommand)]
enum ThemeCommand {
    Show,
    Set { theme: Theme },
    /// system -> light -> dark -> system
    Toggle,
}

#[derive(Args)]
struct ServeArgs {
    /// Overrides mock_bind
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let mut config = config::AppConfig::new(Some(&args.global)).context("Failed to load config")?;

    let mut log_config = logging::LogConfig::from(&config);
    if let Commands::ServeMock(serve) = &args.command {
        if let Some(bind) = serve.bind {
            config.mock_bind = bind;
        }
        log_config.service = true;
    }
    logging::init(log_config);

    let mode = if args.compact {
        DisplayMode::Compact
    } else {
        DisplayMode::Standard
    };

    match args.command {
        Commands::ServeMock(_) => return cli::serve_mock(&config).await,
        Commands::ConfigInit { path, force } => {
            let path = path.unwrap_or_else(config::config_path);
            return cli::write_config(&config, &path, force);
        }
        command => {
            let ctx = context::AppContext::open(config, Arc::new(TerminalNavigator))
                .context("Failed to open client storage")?;
            match run(&ctx, command, mode).await {
                Err(e) if cli::session_expired(&e) => {
                    eprintln!("{}", cli::SESSION_EXPIRED_HINT);
                    Ok(())
                }
                result => result,
            }
        }
    }
}

async fn run(ctx: &context::AppContext, command: Commands, mode: DisplayMode) -> Result<()> {
    match command {
        Commands::Login { username, password } => cli::login(ctx, &username, password).await,
        Commands::Logout => cli::logout(ctx).await,
        Commands::Register {
            username,
            nickname,
            password,
        } => cli::register(ctx, &username, nickname, password).await,
        Commands::Whoami => cli::whoami(ctx),
        Commands::Users(cmd) => match cmd {
            UsersCommand::List => cli::list_users(ctx, mode).await,
            UsersCommand::Create {
                username,
                nickname,
                password,
            } => cli::create_user(ctx, &username, nickname, password).await,
            UsersCommand::Delete { id } => cli::delete_user(ctx, id).await,
        },
        Commands::Containers(cmd) => match cmd {
            ContainersCommand::List => cli::list_containers(ctx, mode).await,
            ContainersCommand::Show { id } => cli::show_container(ctx, &id).await,
            ContainersCommand::Start { id } => cli::control_container(ctx, &id, Action::Start).await,
            ContainersCommand::Stop { id } => cli::control_container(ctx, &id, Action::Stop).await,
            ContainersCommand::Restart { id } => {
                cli::control_container(ctx, &id, Action::Restart).await
            }
        },
        Commands::Volumes(cmd) => match cmd {
            VolumesCommand::List => cli::list_volumes(ctx, mode).await,
            VolumesCommand::Files { name, path } => {
                cli::list_volume_files(ctx, &name, path.as_deref(), mode).await
            }
            VolumesCommand::Cat { name, path } => cli::read_volume_file(ctx, &name, &path).await,
            VolumesCommand::Rm { name, path } => cli::delete_volume_file(ctx, &name, &path).await,
            VolumesCommand::Delete { name } => cli::delete_volume(ctx, &name).await,
        },
        Commands::Config(cmd) => match cmd {
            ConfigCommand::Show => cli::show_config(ctx).await,
            ConfigCommand::Set(args) => cli::patch_config(ctx, args.into()).await,
            ConfigCommand::Public => cli::public_config(ctx).await,
        },
        Commands::Health => cli::health(ctx).await,
        Commands::Theme(cmd) => match cmd {
            ThemeCommand::Show => cli::show_theme(ctx),
            ThemeCommand::Set { theme } => cli::set_theme(ctx, theme),
            ThemeCommand::Toggle => cli::toggle_theme(ctx),
        },
        Commands::ServeMock(_) | Commands::ConfigInit { .. } => Ok(()),
    }
}
