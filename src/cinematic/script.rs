use serde::{Deserialize, Serialize};

use crate::error::ScriptError;
use crate::playback::{CustomAction, TextStyle};

const BUILTIN_SCRIPT: &str = include_str!("../../assets/cinematic.json");

fn default_title() -> String {
    "SITESYNC_TERMINAL_V4.0".to_string()
}

fn default_speed_ms() -> u64 {
    30
}

fn default_pause_ms() -> u64 {
    300
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CinematicScript {
    #[serde(default = "default_title")]
    pub title: String,
    pub scenes: Vec<CinematicScene>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CinematicScene {
    pub lines: Vec<Line>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Line {
    Custom { custom: CustomAction },
    Typed(TypedLine),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedLine {
    pub text: String,
    #[serde(default)]
    pub style: TextStyle,
    #[serde(default = "default_speed_ms", alias = "speed")]
    pub speed_ms: u64,
    #[serde(default = "default_pause_ms", alias = "pause")]
    pub pause_after_ms: u64,
}

impl TypedLine {
    pub fn new(text: impl Into<String>) -> Self {
        TypedLine {
            text: text.into(),
            style: TextStyle::default(),
            speed_ms: default_speed_ms(),
            pause_after_ms: default_pause_ms(),
        }
    }
}

impl CinematicScript {
    pub fn from_json(json: &str) -> Result<Self, ScriptError> {
        let script: CinematicScript = serde_json::from_str(json)?;
        if script.scenes.is_empty() {
            return Err(ScriptError::Empty);
        }
        Ok(script)
    }

    pub fn builtin() -> Result<Self, ScriptError> {
        CinematicScript::from_json(BUILTIN_SCRIPT)
    }

    pub fn line_count(&self) -> usize {
        self.scenes.iter().map(|s| s.lines.len()).sum()
    }
}
