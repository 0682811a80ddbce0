//! Story format: the declarative scene list the sequencer plays.
//!
//! Scenes are ordered lists of tagged steps. Optional fields are resolved to
//! their defaults while deserializing, so nothing is duck-typed at play time.

use serde::{Deserialize, Serialize};

use crate::error::ScriptError;
use crate::playback::{CustomAction, Effect, TextStyle};
use crate::sprites::SpriteTable;

const BUILTIN_STORY: &str = include_str!("../../assets/story.json");

fn default_fade_ms() -> u64 {
    400
}

fn default_speed_ms() -> u64 {
    30
}

fn default_walk_interval_ms() -> u64 {
    150
}

fn default_walk_dx() -> i32 {
    1
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Story {
    pub scenes: Vec<GameScene>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameScene {
    #[serde(default)]
    pub title: String,
    /// Fade applied to the previous scene before this one is built.
    /// Ignored for the first scene.
    #[serde(default = "default_fade_ms")]
    pub fade_out_ms: u64,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    ShowSprite(SpritePlacement),
    /// Make a hidden sprite visible.
    Reveal {
        id: String,
        #[serde(default)]
        effect: Option<Effect>,
    },
    Walk(WalkCycle),
    TypeText {
        text: String,
        #[serde(default)]
        style: TextStyle,
        #[serde(default = "default_speed_ms")]
        speed_ms: u64,
    },
    Wait {
        ms: u64,
    },
    /// Suspend until the mount is clicked.
    WaitForClick,
    Custom {
        action: CustomAction,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpritePlacement {
    /// Handle later steps use to refer to this sprite.
    #[serde(default)]
    pub id: Option<String>,
    pub sprite: String,
    #[serde(default)]
    pub frame: usize,
    #[serde(default)]
    pub x: i32,
    /// Row from the top of the stage; omitted stands the sprite on the ground.
    #[serde(default)]
    pub y: Option<i32>,
    #[serde(default)]
    pub effect: Option<Effect>,
    #[serde(default)]
    pub hidden: bool,
}

/// Two-frame walk: every tick advances the frame and moves by `dx` columns
/// until `until_x` is reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkCycle {
    pub id: String,
    #[serde(default = "default_walk_dx")]
    pub dx: i32,
    #[serde(default = "default_walk_interval_ms")]
    pub interval_ms: u64,
    pub until_x: i32,
    #[serde(default = "default_true")]
    pub hide_after: bool,
}

impl Story {
    pub fn from_json(json: &str) -> Result<Story, ScriptError> {
        let story: Story = serde_json::from_str(json)?;
        if story.scenes.is_empty() {
            return Err(ScriptError::Empty);
        }
        Ok(story)
    }

    pub fn builtin() -> Result<Story, ScriptError> {
        Story::from_json(BUILTIN_STORY)
    }

    /// Every sprite the story shows must exist in `table`.
    pub fn validate(&self, table: &SpriteTable) -> Result<(), ScriptError> {
        for (index, scene) in self.scenes.iter().enumerate() {
            for step in &scene.steps {
                if let Step::ShowSprite(placement) = step {
                    if !table.contains(&placement.sprite) {
                        return Err(ScriptError::UnknownSprite {
                            scene: index,
                            sprite: placement.sprite.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
