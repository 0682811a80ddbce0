//! Error types shared by the sprite table, the scripts and playback.

use std::path::PathBuf;

use thiserror::Error;

/// Failures looking up or validating sprites.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpriteError {
    #[error("sprite \"{name}\" not found")]
    NotFound { name: String },

    #[error("sprite \"{name}\" is malformed: {reason}")]
    Malformed { name: String, reason: String },

    #[error("sprite table could not be parsed: {0}")]
    Parse(String),
}

/// Failures loading a cinematic script or a game story.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("script could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("script has no scenes")]
    Empty,

    #[error("scene {scene} references unknown sprite \"{sprite}\"")]
    UnknownSprite { scene: usize, sprite: String },
}

/// Failures reading the player config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Outcome of a suspended or failed playback step.
///
/// `Aborted` is the expected result of cancelling a run. It unwinds every
/// pending suspension and is swallowed by the top-level playback loop.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    #[error("playback aborted")]
    Aborted,

    #[error("mount point detached")]
    Detached,

    #[error("scene {scene}, step {step}: {reason}")]
    Step {
        scene: usize,
        step: usize,
        reason: String,
    },
}

impl PlaybackError {
    pub fn is_aborted(&self) -> bool {
        matches!(self, PlaybackError::Aborted)
    }
}

pub type PlaybackResult<T = ()> = Result<T, PlaybackError>;
