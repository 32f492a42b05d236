//! Layered application configuration.
//!
//! Sources, lowest precedence first: built-in defaults, the TOML file
//! (`dockpanel.toml`, or the path in `DOCKPANEL_CONFIG`), `DOCKPANEL_*`
//! environment variables, then whatever command line flags were given.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

use crate::store::ResolvedTheme;

pub const CONFIG_ENV: &str = "DOCKPANEL_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "dockpanel.toml";
const ENV_PREFIX: &str = "DOCKPANEL_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server base URL including the `/api` prefix.
    pub api_url: String,
    /// Answer from the in-memory mock instead of the server.
    pub use_mock: bool,
    /// Holds `storage.json`.
    pub state_dir: PathBuf,
    pub mock_latency_ms: u64,
    /// Where `serve-mock` listens.
    pub mock_bind: SocketAddr,
    /// What the `system` theme resolves to.
    pub system_theme: ResolvedTheme,
    pub verbose: bool,
    pub log_json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080/api".to_string(),
            use_mock: true,
            state_dir: PathBuf::from(".dockpanel"),
            mock_latency_ms: 300,
            mock_bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            system_theme: ResolvedTheme::Light,
            verbose: false,
            log_json: false,
        }
    }
}

/// Path of the TOML file to read.
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

impl AppConfig {
    /// Load from every source, with `args` (serialized CLI flags) on top.
    pub fn new<T: Serialize>(args: Option<&T>) -> Result<Self, figment::Error> {
        Self::load_from(&config_path(), args)
    }

    pub fn load_from<T: Serialize>(path: &Path, args: Option<&T>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).ignore(&["config"]));

        if let Some(args) = args {
            figment = figment.merge(Serialized::defaults(args));
        }

        figment.extract()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            AppConfig::load_from(&dir.path().join("missing.toml"), None::<&()>).unwrap();

        assert_eq!(config.api_url, "http://localhost:8080/api");
        assert!(config.use_mock);
        assert_eq!(config.mock_latency_ms, 300);
    }

    #[test]
    fn file_then_args() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dockpanel.toml");
        std::fs::write(
            &path,
            "use_mock = false\napi_url = \"http://panel:9000/api\"\nsystem_theme = \"dark\"\n",
        )
        .unwrap();

        let config = AppConfig::load_from(&path, None::<&()>).unwrap();
        assert!(!config.use_mock);
        assert_eq!(config.api_url, "http://panel:9000/api");
        assert_eq!(config.system_theme, ResolvedTheme::Dark);

        let args = HashMap::from([("api_url", "http://override/api")]);
        let config = AppConfig::load_from(&path, Some(&args)).unwrap();
        assert_eq!(config.api_url, "http://override/api");
        assert!(!config.use_mock);
    }

    #[test]
    fn rejects_bad_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dockpanel.toml");
        std::fs::write(&path, "mock_latency_ms = \"soon\"\n").unwrap();

        assert!(AppConfig::load_from(&path, None::<&()>).is_err());
    }
}
