//! Sprite table: the static pixel-art registry.
//!
//! Sprites are authored as grids of palette keys (`"t"` marks a transparent
//! cell) and loaded once per process from the embedded `assets/sprites.json`.
//! Nothing here is mutated after load.

mod palette;
pub mod render;

use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::SpriteError;
use crate::types::Color;

pub use palette::Palette;
pub use render::{Pixel, SpriteRenderer, Visual};

/// Cell value marking a transparent pixel.
pub const TRANSPARENT: &str = "t";

const BUILTIN_SPRITES: &str = include_str!("../../assets/sprites.json");

/// One pixel of a sprite grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PixelCell {
    Transparent,
    /// A palette key, or exceptionally a literal colour value.
    Paint(String),
}

impl From<String> for PixelCell {
    fn from(value: String) -> Self {
        if value == TRANSPARENT {
            PixelCell::Transparent
        } else {
            PixelCell::Paint(value)
        }
    }
}

impl From<PixelCell> for String {
    fn from(cell: PixelCell) -> Self {
        match cell {
            PixelCell::Transparent => TRANSPARENT.to_string(),
            PixelCell::Paint(key) => key,
        }
    }
}

/// Rows × columns of pixel cells.
pub type Grid = Vec<Vec<PixelCell>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpriteArt {
    Pixels(Grid),
    /// Animation frames, all sharing the sprite's width and height.
    Frames(Vec<Grid>),
}

fn default_scale() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sprite {
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_scale")]
    pub scale: u32,
    #[serde(flatten)]
    pub art: SpriteArt,
}

impl Sprite {
    pub fn frame_count(&self) -> usize {
        match &self.art {
            SpriteArt::Pixels(_) => 1,
            SpriteArt::Frames(frames) => frames.len(),
        }
    }

    pub fn is_animated(&self) -> bool {
        matches!(self.art, SpriteArt::Frames(_))
    }

    /// Grid for `index`. Out-of-range indices wrap around the frame list,
    /// so a walk cycle can simply count upwards. Single-grid sprites ignore
    /// the index.
    pub fn grid(&self, index: usize) -> Option<&Grid> {
        match &self.art {
            SpriteArt::Pixels(grid) => Some(grid),
            SpriteArt::Frames(frames) if frames.is_empty() => None,
            SpriteArt::Frames(frames) => frames.get(index % frames.len()),
        }
    }

    fn grids(&self) -> Vec<&Grid> {
        match &self.art {
            SpriteArt::Pixels(grid) => vec![grid],
            SpriteArt::Frames(frames) => frames.iter().collect(),
        }
    }

    fn validate(&self, name: &str, palette: &Palette) -> Result<(), SpriteError> {
        let malformed = |reason: String| SpriteError::Malformed {
            name: name.to_string(),
            reason,
        };

        if self.scale == 0 {
            return Err(malformed("scale must be at least 1".into()));
        }
        let grids = self.grids();
        if grids.is_empty() {
            return Err(malformed("no frames".into()));
        }

        for (f, grid) in grids.iter().enumerate() {
            if grid.len() != self.height as usize {
                return Err(malformed(format!(
                    "frame {f} has {} rows, expected {}",
                    grid.len(),
                    self.height
                )));
            }
            for (y, row) in grid.iter().enumerate() {
                if row.len() != self.width as usize {
                    return Err(malformed(format!(
                        "frame {f} row {y} has {} cells, expected {}",
                        row.len(),
                        self.width
                    )));
                }
                for cell in row {
                    if let PixelCell::Paint(key) = cell {
                        if !palette.contains(key) && Color::parse(key).is_none() {
                            return Err(malformed(format!(
                                "frame {f} row {y}: \"{key}\" is neither a palette key nor a colour"
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// The palette plus every named sprite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpriteTable {
    pub palette: Palette,
    pub sprites: BTreeMap<String, Sprite>,
}

impl SpriteTable {
    /// Parse and validate a table.
    pub fn from_json(json: &str) -> Result<Self, SpriteError> {
        let table: SpriteTable =
            serde_json::from_str(json).map_err(|e| SpriteError::Parse(e.to_string()))?;
        table.validate()?;
        Ok(table)
    }

    /// The embedded asset table, loaded on first use.
    ///
    /// A table that fails to load is logged and replaced by an empty one, so
    /// every lookup degrades to `SpriteError::NotFound` instead of panicking.
    pub fn builtin() -> &'static SpriteTable {
        static TABLE: OnceLock<SpriteTable> = OnceLock::new();
        TABLE.get_or_init(|| match SpriteTable::from_json(BUILTIN_SPRITES) {
            Ok(table) => {
                tracing::debug!(sprites = table.sprites.len(), "sprite table loaded");
                table
            }
            Err(e) => {
                tracing::error!("built-in sprite table unusable: {e}");
                SpriteTable::default()
            }
        })
    }

    pub fn get(&self, name: &str) -> Result<&Sprite, SpriteError> {
        self.sprites.get(name).ok_or_else(|| SpriteError::NotFound {
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sprites.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sprites.keys().map(String::as_str)
    }

    pub fn validate(&self) -> Result<(), SpriteError> {
        for (name, sprite) in &self.sprites {
            sprite.validate(name, &self.palette)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_loads_every_sprite() {
        let table = SpriteTable::builtin();
        assert_eq!(table.sprites.len(), 19);
        assert_eq!(table.palette.len(), 24);
        for name in ["building", "workerWithBriefcase", "logo", "trophy", "accessPanel"] {
            assert!(table.contains(name), "missing {name}");
        }
    }

    #[test]
    fn grids_match_declared_dimensions() {
        let table = SpriteTable::builtin();
        for (name, sprite) in &table.sprites {
            for grid in sprite.grids() {
                assert_eq!(grid.len(), sprite.height as usize, "{name} height");
                for row in grid {
                    assert_eq!(row.len(), sprite.width as usize, "{name} width");
                }
            }
        }
    }

    #[test]
    fn every_painted_cell_resolves_to_a_colour() {
        let table = SpriteTable::builtin();
        for (name, sprite) in &table.sprites {
            for grid in sprite.grids() {
                for cell in grid.iter().flatten() {
                    if let PixelCell::Paint(key) = cell {
                        let resolved = table.palette.resolve(key);
                        assert!(!resolved.is_empty(), "{name}: empty colour for {key}");
                        assert!(table.palette.color(key).is_some(), "{name}: {key}");
                    }
                }
            }
        }
    }

    #[test]
    fn walk_cycles_have_two_frames() {
        let table = SpriteTable::builtin();
        for name in ["worker", "workerWithBriefcase", "elevator", "accessPanel", "battery"] {
            let sprite = table.get(name).unwrap();
            assert!(sprite.is_animated());
            assert_eq!(sprite.frame_count(), 2, "{name}");
        }
    }

    #[test]
    fn frame_index_wraps() {
        let table = SpriteTable::builtin();
        let sprite = table.get("worker").unwrap();
        assert_eq!(sprite.grid(2), sprite.grid(0));
        assert_eq!(sprite.grid(3), sprite.grid(1));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let json = r##"{
            "palette": { "a": "#ffffff" },
            "sprites": { "bad": { "width": 2, "height": 2, "pixels": [["a", "a"], ["a"]] } }
        }"##;
        let err = SpriteTable::from_json(json).unwrap_err();
        assert!(matches!(err, SpriteError::Malformed { ref name, .. } if name == "bad"));
    }

    #[test]
    fn mismatched_frames_are_rejected() {
        let json = r##"{
            "palette": {},
            "sprites": { "bad": { "width": 1, "height": 1,
                "frames": [[["#fff"]], [["#fff"], ["#fff"]]] } }
        }"##;
        assert!(SpriteTable::from_json(json).is_err());
    }

    #[test]
    fn unresolvable_cell_is_rejected() {
        let json = r##"{
            "palette": {},
            "sprites": { "bad": { "width": 1, "height": 1, "pixels": [["nope"]] } }
        }"##;
        assert!(SpriteTable::from_json(json).is_err());
    }

    #[test]
    fn unknown_name_is_not_found() {
        let err = SpriteTable::builtin().get("doesNotExist").unwrap_err();
        assert_eq!(
            err,
            SpriteError::NotFound {
                name: "doesNotExist".into()
            }
        );
    }
}
