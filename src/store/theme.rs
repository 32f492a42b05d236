//! Colour theme preference, persisted under the `theme` key.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::Observable;
use super::storage::{Storage, THEME_KEY};
use crate::error::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::System => "system",
        }
    }

    /// system -> light -> dark -> system
    pub fn next(self) -> Self {
        match self {
            Theme::System => Theme::Light,
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::System,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "system" => Ok(Theme::System),
            other => Err(format!("unknown theme: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolvedTheme {
    #[default]
    Light,
    Dark,
}

impl fmt::Display for ResolvedTheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedTheme::Light => f.write_str("light"),
            ResolvedTheme::Dark => f.write_str("dark"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeState {
    pub theme: Theme,
    pub resolved: ResolvedTheme,
}

#[derive(Clone)]
pub struct ThemeStore {
    state: Observable<ThemeState>,
    system: Observable<ResolvedTheme>,
    storage: Arc<dyn Storage>,
}

fn resolve(theme: Theme, system: ResolvedTheme) -> ResolvedTheme {
    match theme {
        Theme::Light => ResolvedTheme::Light,
        Theme::Dark => ResolvedTheme::Dark,
        Theme::System => system,
    }
}

impl ThemeStore {
    /// Load the stored preference; unknown values fall back to `system`.
    pub fn load(storage: Arc<dyn Storage>, system: ResolvedTheme) -> Self {
        let theme = storage
            .get(THEME_KEY)
            .and_then(|saved| saved.parse().ok())
            .unwrap_or_default();

        Self {
            state: Observable::new(ThemeState {
                theme,
                resolved: resolve(theme, system),
            }),
            system: Observable::new(system),
            storage,
        }
    }

    pub fn state(&self) -> ThemeState {
        self.state.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<ThemeState> {
        self.state.subscribe()
    }

    pub fn set_theme(&self, theme: Theme) -> Result<(), StorageError> {
        self.storage.set(THEME_KEY, theme.as_str())?;
        self.state.set(ThemeState {
            theme,
            resolved: resolve(theme, self.system.get()),
        });
        Ok(())
    }

    pub fn toggle(&self) -> Result<Theme, StorageError> {
        let next = self.state.with(|s| s.theme.next());
        self.set_theme(next)?;
        Ok(next)
    }

    /// The platform preference changed. Only matters while following `system`.
    pub fn system_preference_changed(&self, resolved: ResolvedTheme) {
        self.system.set(resolved);
        self.state.update(|state| {
            if state.theme == Theme::System {
                state.resolved = resolved;
            }
        });
    }
}
