use ratatui::style::Color;
use serde::{Deserialize, Serialize};

/// All themeable colors in the application
#[derive(Clone, Debug)]
pub struct Theme {
    pub name: &'static str,

    // Header
    pub header_title: Color,
    pub header_info: Color,

    // Log view
    pub line_number: Color,
    pub system_line: Color,
    pub divider: Color,

    // Status badges
    pub badge_live: Color,
    pub badge_paused: Color,
    pub badge_history: Color,
    pub badge_offline: Color,
    pub pending_badge: Color,

    // Chrome
    pub border_focused: Color,
    pub border_unfocused: Color,
    pub status_help: Color,
    pub alias_current: Color,
    pub empty_state: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            name: "dark",
            header_title: Color::Cyan,
            header_info: Color::DarkGray,
            line_number: Color::DarkGray,
            system_line: Color::Gray,
            divider: Color::Blue,
            badge_live: Color::Green,
            badge_paused: Color::Yellow,
            badge_history: Color::Magenta,
            badge_offline: Color::Red,
            pending_badge: Color::Yellow,
            border_focused: Color::Cyan,
            border_unfocused: Color::DarkGray,
            status_help: Color::DarkGray,
            alias_current: Color::Green,
            empty_state: Color::DarkGray,
        }
    }

    pub fn light() -> Self {
        Self {
            name: "light",
            header_title: Color::Blue,
            header_info: Color::Gray,
            line_number: Color::Gray,
            system_line: Color::DarkGray,
            divider: Color::Blue,
            badge_live: Color::Green,
            badge_paused: Color::Yellow,
            badge_history: Color::Magenta,
            badge_offline: Color::Red,
            pending_badge: Color::Yellow,
            border_focused: Color::Blue,
            border_unfocused: Color::Gray,
            status_help: Color::Gray,
            alias_current: Color::Blue,
            empty_state: Color::Gray,
        }
    }

    pub fn all() -> Vec<Theme> {
        vec![Self::dark(), Self::light()]
    }

    pub fn by_name(name: &str) -> Option<Theme> {
        Self::all().into_iter().find(|t| t.name == name)
    }

    /// The theme after this one in the cycle
    pub fn next(&self) -> Theme {
        let all = Self::all();
        let idx = all.iter().position(|t| t.name == self.name).unwrap_or(0);
        all[(idx + 1) % all.len()].clone()
    }
}

/// The single persisted viewer preference: the selected theme.
#[derive(Serialize, Deserialize)]
struct Prefs {
    theme: String,
}

fn prefs_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|dir| dir.join("porthole").join("prefs.toml"))
}

/// Restore the saved theme, falling back to the default.
pub fn load_saved() -> Theme {
    let Some(path) = prefs_path() else {
        return Theme::default();
    };
    std::fs::read_to_string(path)
        .ok()
        .and_then(|raw| toml::from_str::<Prefs>(&raw).ok())
        .and_then(|prefs| Theme::by_name(&prefs.theme))
        .unwrap_or_default()
}

/// Persist the selected theme name. Failures are logged, never surfaced.
pub fn persist(name: &str) {
    let Some(path) = prefs_path() else {
        return;
    };
    let prefs = Prefs {
        theme: name.to_string(),
    };
    let raw = match toml::to_string(&prefs) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::debug!(error = %e, "could not serialize prefs");
            return;
        }
    };
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    if let Err(e) = std::fs::write(&path, raw) {
        tracing::debug!(error = %e, "could not persist theme preference");
    }
}
