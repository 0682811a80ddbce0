use std::path::{Path, PathBuf};
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub key_bindings: KeyBindings,
    /// Hold time that turns a press on the terminal button into a long press.
    pub long_press_ms: u64,
    /// Host redraw interval.
    pub frame_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub advance: String,
    pub advance_alt: String,
    pub close: String,
    pub quit: String,
    pub open_cinematic: String,
    pub open_game: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        KeyBindings {
            advance: "Enter".into(),
            advance_alt: "Space".into(),
            close: "Esc".into(),
            quit: "q".into(),
            open_cinematic: "c".into(),
            open_game: "g".into(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        PlayerConfig {
            key_bindings: KeyBindings::default(),
            long_press_ms: 800,
            frame_ms: 33,
            log_file: None,
        }
    }
}

impl PlayerConfig {
    /// `~/.config/sitesync-terminal/config.json` on Linux, the platform
    /// config dir elsewhere.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sitesync-terminal").join("config.json"))
    }

    /// Read `path`. A missing file is `Ok(None)`.
    pub fn try_load(path: &Path) -> Result<Option<Self>, ConfigError> {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Like `try_load`, falling back to defaults with a warning when the file
    /// is unreadable or invalid.
    pub fn load(path: &Path) -> Self {
        Self::or_defaults(Self::try_load(path))
    }

    /// Settle a `try_load` result: the file's config, or defaults with a
    /// warning.
    pub fn or_defaults(loaded: Result<Option<Self>, ConfigError>) -> Self {
        match loaded {
            Ok(config) => config.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("{e}, using defaults");
                Self::default()
            }
        }
    }

    pub fn long_press(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_ms.max(1))
    }
}

/// Check whether a crossterm `KeyEvent` matches a binding string from config.
pub fn matches_binding(binding: &str, event: &KeyEvent) -> bool {
    if let Some(rest) = binding.strip_prefix("Alt-") {
        if !event.modifiers.contains(KeyModifiers::ALT) {
            return false;
        }
        return key_matches(rest, event.code);
    }

    if let Some(rest) = binding.strip_prefix("Ctrl-") {
        if !event.modifiers.contains(KeyModifiers::CONTROL) {
            return false;
        }
        return key_matches(rest, event.code);
    }

    // Plain bindings never fire while Ctrl or Alt is held.
    if event.modifiers.contains(KeyModifiers::CONTROL)
        || event.modifiers.contains(KeyModifiers::ALT)
    {
        return false;
    }

    key_matches(binding, event.code)
}

fn key_matches(name: &str, code: KeyCode) -> bool {
    match name {
        "Right" => code == KeyCode::Right,
        "Left" => code == KeyCode::Left,
        "Up" => code == KeyCode::Up,
        "Down" => code == KeyCode::Down,
        "Enter" => code == KeyCode::Enter,
        "Esc" => code == KeyCode::Esc,
        "Space" => code == KeyCode::Char(' '),
        "Tab" => code == KeyCode::Tab,
        "Backspace" => code == KeyCode::Backspace,
        "Home" => code == KeyCode::Home,
        "End" => code == KeyCode::End,
        s => {
            if let Some(n) = s.strip_prefix('F').and_then(|rest| rest.parse::<u8>().ok()) {
                return code == KeyCode::F(n);
            }
            let mut chars = s.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => code == KeyCode::Char(c),
                _ => false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        assert!(PlayerConfig::try_load(&path).unwrap().is_none());
        assert_eq!(PlayerConfig::load(&path), PlayerConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "long_press_ms": 500, "key_bindings": {{ "quit": "Ctrl-c" }} }}"#).unwrap();
        let config = PlayerConfig::load(file.path());
        assert_eq!(config.long_press_ms, 500);
        assert_eq!(config.frame_ms, 33);
        assert_eq!(config.key_bindings.quit, "Ctrl-c");
        assert_eq!(config.key_bindings.close, "Esc");
    }

    #[test]
    fn invalid_json_is_reported_then_defaulted() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            PlayerConfig::try_load(file.path()),
            Err(ConfigError::Parse { .. })
        ));
        assert_eq!(PlayerConfig::load(file.path()), PlayerConfig::default());
    }

    #[test]
    fn unreadable_path_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be read as a file.
        let loaded = PlayerConfig::try_load(dir.path());
        assert!(matches!(loaded, Err(ConfigError::Read { .. })));
        assert_eq!(PlayerConfig::or_defaults(loaded), PlayerConfig::default());
        assert_eq!(PlayerConfig::load(dir.path()), PlayerConfig::default());
    }

    #[test]
    fn bindings_respect_modifiers() {
        assert!(matches_binding("q", &key(KeyCode::Char('q'), KeyModifiers::NONE)));
        assert!(!matches_binding("q", &key(KeyCode::Char('q'), KeyModifiers::ALT)));
        assert!(matches_binding("Ctrl-c", &key(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(!matches_binding("Ctrl-c", &key(KeyCode::Char('c'), KeyModifiers::NONE)));
        assert!(matches_binding("Space", &key(KeyCode::Char(' '), KeyModifiers::NONE)));
        assert!(matches_binding("F5", &key(KeyCode::F(5), KeyModifiers::NONE)));
        assert!(!matches_binding("Esc", &key(KeyCode::Enter, KeyModifiers::NONE)));
        assert!(!matches_binding("qq", &key(KeyCode::Char('q'), KeyModifiers::NONE)));
    }
}
