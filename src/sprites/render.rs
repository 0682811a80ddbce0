//! Sprite renderer: turns sprite grids into visual descriptors.
//!
//! Pure functions over the read-only table. Rendering the same sprite and
//! frame twice yields identical output.

use crate::error::SpriteError;
use crate::view::{Element, ElementKind, SpriteInstance};

use super::{PixelCell, SpriteTable};

/// One coloured unit square.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pixel {
    pub x: u32,
    pub y: u32,
    pub size: u32,
    pub color: String,
}

/// Renderable description of a sprite frame: one `Pixel` per painted cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Visual {
    pub width: u32,
    pub height: u32,
    pub scale: u32,
    pub pixels: Vec<Pixel>,
}

impl Visual {
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SpriteRenderer<'a> {
    table: &'a SpriteTable,
}

impl SpriteRenderer<'static> {
    pub fn builtin() -> Self {
        SpriteRenderer::new(SpriteTable::builtin())
    }
}

impl<'a> SpriteRenderer<'a> {
    pub fn new(table: &'a SpriteTable) -> Self {
        SpriteRenderer { table }
    }

    pub fn table(&self) -> &'a SpriteTable {
        self.table
    }

    pub fn render(&self, name: &str, frame: usize) -> Result<Visual, SpriteError> {
        let sprite = self.table.get(name)?;
        let scale = sprite.scale.max(1);
        let mut visual = Visual {
            width: sprite.width * scale,
            height: sprite.height * scale,
            scale,
            pixels: Vec::new(),
        };
        let Some(grid) = sprite.grid(frame) else {
            return Ok(visual);
        };

        for (y, row) in grid.iter().enumerate() {
            for (x, cell) in row.iter().enumerate() {
                if let PixelCell::Paint(key) = cell {
                    visual.pixels.push(Pixel {
                        x: x as u32 * scale,
                        y: y as u32 * scale,
                        size: scale,
                        color: self.table.palette.resolve(key).to_string(),
                    });
                }
            }
        }
        Ok(visual)
    }

    /// Size in pixels, `(0, 0)` for unknown sprites.
    pub fn dimensions(&self, name: &str) -> (u32, u32) {
        match self.table.get(name) {
            Ok(sprite) => {
                let scale = sprite.scale.max(1);
                (sprite.width * scale, sprite.height * scale)
            }
            Err(_) => (0, 0),
        }
    }

    /// Build a sprite element tagged with its name and frame. Unknown sprites
    /// are logged and yield `None`.
    pub fn create_element(&self, name: &str, frame: usize, class: &str) -> Option<Element> {
        match self.render(name, frame) {
            Ok(visual) => {
                let instance = SpriteInstance {
                    name: name.to_string(),
                    frame,
                    visual,
                };
                Some(
                    Element::new(ElementKind::Sprite(instance))
                        .with_class("pixel-sprite")
                        .with_class(class),
                )
            }
            Err(e) => {
                tracing::error!("{e}");
                None
            }
        }
    }

    /// Swap the frame of a rendered sprite, wrapping past the last frame.
    /// Single-frame sprites are left untouched; returns whether anything
    /// changed.
    pub fn update_frame(&self, instance: &mut SpriteInstance, frame: usize) -> bool {
        let frames = match self.table.get(&instance.name) {
            Ok(sprite) if sprite.is_animated() && sprite.frame_count() > 0 => sprite.frame_count(),
            _ => return false,
        };
        let frame = frame % frames;
        match self.render(&instance.name, frame) {
            Ok(visual) => {
                instance.visual = visual;
                instance.frame = frame;
                true
            }
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    #[test]
    fn pixels_are_scaled_and_resolved() {
        let renderer = SpriteRenderer::builtin();
        let visual = renderer.render("dataPacket", 0).unwrap();
        // 4x4 with the four corners transparent
        assert_eq!(visual.pixels.len(), 12);
        assert_eq!((visual.width, visual.height, visual.scale), (8, 8, 2));
        let first = &visual.pixels[0];
        assert_eq!((first.x, first.y, first.size), (2, 0, 2));
        assert_eq!(first.color, "#58a6ff");
    }

    #[test]
    fn unknown_sprite_yields_no_visual() {
        let renderer = SpriteRenderer::builtin();
        assert!(renderer.render("doesNotExist", 0).is_err());
        assert!(renderer.create_element("doesNotExist", 0, "").is_none());
        assert_eq!(renderer.dimensions("doesNotExist"), (0, 0));
    }

    #[test]
    fn dimensions_apply_scale() {
        let renderer = SpriteRenderer::builtin();
        assert_eq!(renderer.dimensions("building"), (48, 60));
        assert_eq!(renderer.dimensions("heart"), (16, 16));
    }

    #[test]
    fn element_carries_sprite_and_frame() {
        let renderer = SpriteRenderer::builtin();
        let el = renderer.create_element("worker", 1, "sprite-floating").unwrap();
        assert!(el.has_class("pixel-sprite"));
        assert!(el.has_class("sprite-floating"));
        let instance = el.sprite().unwrap();
        assert_eq!(instance.name, "worker");
        assert_eq!(instance.frame, 1);
    }

    #[test]
    fn update_frame_only_touches_animated_sprites() {
        let renderer = SpriteRenderer::builtin();

        let mut logo = renderer.create_element("logo", 0, "").unwrap();
        if let ElementKind::Sprite(instance) = &mut logo.kind {
            let before = instance.clone();
            assert!(!renderer.update_frame(instance, 1));
            assert_eq!(*instance, before);
        }

        let mut worker = renderer.create_element("worker", 0, "").unwrap();
        if let ElementKind::Sprite(instance) = &mut worker.kind {
            let frame0 = instance.visual.clone();
            assert!(renderer.update_frame(instance, 1));
            assert_eq!(instance.frame, 1);
            assert_ne!(instance.visual, frame0);
        }
    }

    proptest! {
        #[test]
        fn rendering_is_idempotent(index in 0usize..19, frame in 0usize..8) {
            let renderer = SpriteRenderer::builtin();
            let names: Vec<&str> = renderer.table().names().collect();
            let name = names[index % names.len()];
            prop_assert_eq!(renderer.render(name, frame), renderer.render(name, frame));
        }

        #[test]
        fn out_of_range_frames_wrap(frame in 0usize..64) {
            let renderer = SpriteRenderer::builtin();
            let wrapped = renderer.render("workerWithBriefcase", frame % 2).unwrap();
            prop_assert_eq!(renderer.render("workerWithBriefcase", frame).unwrap(), wrapped);
        }
    }
}
