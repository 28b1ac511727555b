use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::keys::{AUTO_THEME, IS_CONFIGURED, USER_SALARY, USER_THEME};
use super::CredentialStore;

/// Colour scheme name. Bordeaux doubles as the dark default, Emerald as the
/// light one.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Bordeaux,
    Emerald,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bordeaux => "bordeaux",
            Self::Emerald => "emerald",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "bordeaux" => Some(Self::Bordeaux),
            "emerald" => Some(Self::Emerald),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Bordeaux => Self::Emerald,
            Self::Emerald => Self::Bordeaux,
        }
    }

    /// Theme that follows the system colour scheme.
    pub fn for_system(prefers_dark: bool) -> Self {
        if prefers_dark {
            Self::Bordeaux
        } else {
            Self::Emerald
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host-app preferences kept in the secure store next to the PIN.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// Monthly salary entered during setup.
    pub salary: Option<f64>,
    /// Manually chosen theme, if any.
    pub theme: Option<Theme>,
    pub auto_theme: bool,
    /// Whether first-run setup has completed.
    pub configured: bool,
}

impl Preferences {
    /// Theme to render with. With auto theme on, the system preference wins
    /// over the stored choice.
    pub fn effective_theme(&self, system_prefers_dark: bool) -> Theme {
        if self.auto_theme {
            Theme::for_system(system_prefers_dark)
        } else {
            self.theme.unwrap_or_default()
        }
    }

    /// Flip the manual theme and turn auto theme off.
    pub async fn toggle_theme(&mut self, store: &dyn CredentialStore) -> Theme {
        let next = self.theme.unwrap_or_default().toggled();
        self.theme = Some(next);
        self.auto_theme = false;
        store.set(USER_THEME, next.as_str()).await;
        store.set(AUTO_THEME, "false").await;
        debug!("Theme switched to {}", next);
        next
    }

    pub async fn set_auto_theme(&mut self, store: &dyn CredentialStore, enabled: bool) {
        self.auto_theme = enabled;
        store.set(AUTO_THEME, if enabled { "true" } else { "false" }).await;
    }

    /// Write every field. Unset optional fields are deleted.
    pub async fn save(&self, store: &dyn CredentialStore) {
        match self.salary {
            Some(salary) => store.set(USER_SALARY, &salary.to_string()).await,
            None => store.delete(USER_SALARY).await,
        }
        match self.theme {
            Some(theme) => store.set(USER_THEME, theme.as_str()).await,
            None => store.delete(USER_THEME).await,
        }
        store.set(AUTO_THEME, if self.auto_theme { "true" } else { "false" }).await;
        store.set(IS_CONFIGURED, if self.configured { "true" } else { "false" }).await;
    }
}

/// Load preferences, falling back to defaults for anything missing or
/// unparseable.
pub async fn load_preferences(store: &dyn CredentialStore) -> Preferences {
    let salary = store.get(USER_SALARY).await.and_then(|raw| {
        raw.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .or_else(|| {
                warn!("Ignoring unparseable stored salary");
                None
            })
    });

    let theme = store.get(USER_THEME).await.and_then(|raw| {
        Theme::parse(&raw).or_else(|| {
            warn!("Ignoring unknown stored theme {:?}", raw);
            None
        })
    });

    Preferences {
        salary,
        theme,
        auto_theme: store.get(AUTO_THEME).await.as_deref() == Some("true"),
        configured: store.get(IS_CONFIGURED).await.as_deref() == Some("true"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryBackend, SecureStore};

    #[tokio::test]
    async fn test_load_defaults_from_empty_store() {
        let store = SecureStore::new(MemoryBackend::new());
        let prefs = load_preferences(&store).await;
        assert_eq!(prefs, Preferences::default());
        assert_eq!(prefs.effective_theme(true), Theme::Bordeaux);
    }

    #[tokio::test]
    async fn test_load_stored_values() {
        let store = SecureStore::new(MemoryBackend::new());
        store.set(USER_SALARY, "5250.75").await;
        store.set(USER_THEME, "emerald").await;
        store.set(IS_CONFIGURED, "true").await;

        let prefs = load_preferences(&store).await;
        assert_eq!(prefs.salary, Some(5250.75));
        assert_eq!(prefs.theme, Some(Theme::Emerald));
        assert!(prefs.configured);
        assert!(!prefs.auto_theme);
    }

    #[tokio::test]
    async fn test_garbage_values_fall_back() {
        let store = SecureStore::new(MemoryBackend::new());
        store.set(USER_SALARY, "lots").await;
        store.set(USER_THEME, "neon").await;
        store.set(IS_CONFIGURED, "yes").await;

        let prefs = load_preferences(&store).await;
        assert_eq!(prefs.salary, None);
        assert_eq!(prefs.theme, None);
        assert!(!prefs.configured);
    }

    #[tokio::test]
    async fn test_toggle_theme_disables_auto() {
        let store = SecureStore::new(MemoryBackend::new());
        let mut prefs = Preferences::default();
        prefs.set_auto_theme(&store, true).await;
        assert_eq!(prefs.effective_theme(false), Theme::Emerald);

        let theme = prefs.toggle_theme(&store).await;
        assert_eq!(theme, Theme::Emerald);
        assert!(!prefs.auto_theme);

        let reloaded = load_preferences(&store).await;
        assert_eq!(reloaded.theme, Some(Theme::Emerald));
        assert!(!reloaded.auto_theme);
        assert_eq!(reloaded.effective_theme(true), Theme::Emerald);
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let store = SecureStore::new(MemoryBackend::new());
        let prefs = Preferences {
            salary: Some(1800.0),
            theme: Some(Theme::Emerald),
            auto_theme: true,
            configured: true,
        };
        prefs.save(&store).await;
        assert_eq!(load_preferences(&store).await, prefs);

        let cleared = Preferences {
            configured: true,
            ..Default::default()
        };
        cleared.save(&store).await;
        assert_eq!(store.get(USER_SALARY).await, None);
        assert_eq!(load_preferences(&store).await, cleared);
    }

    #[test]
    fn test_auto_theme_follows_system() {
        let prefs = Preferences {
            theme: Some(Theme::Emerald),
            auto_theme: true,
            ..Default::default()
        };
        assert_eq!(prefs.effective_theme(true), Theme::Bordeaux);
        assert_eq!(prefs.effective_theme(false), Theme::Emerald);
    }
}
