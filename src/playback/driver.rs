use serde::{Deserialize, Serialize};

use crate::view::{NodeId, ViewTree};

/// Entrance and idle effects a scene can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    SlideLeft,
    GrowIn,
    DropIn,
    Shake,
    Floating,
    FadeIn,
    Sparkle,
}

impl Effect {
    pub fn class(self) -> &'static str {
        match self {
            Effect::SlideLeft => "sprite-slide-left",
            Effect::GrowIn => "sprite-grow-in",
            Effect::DropIn => "sprite-drop-in",
            Effect::Shake => "sprite-shake",
            Effect::Floating => "sprite-floating",
            Effect::FadeIn => "sprite-fade-in",
            Effect::Sparkle => "sparkle-particle",
        }
    }
}

/// The external animation engine. Playback only asks it to start an effect
/// on an element; its scheduling is its own business.
pub trait AnimationDriver {
    fn trigger(&self, tree: &mut ViewTree, node: NodeId, effect: Effect);
}

/// Default driver: tags the element with the effect's class and lets the
/// renderer decide what, if anything, to draw differently.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClassDriver;

impl AnimationDriver for ClassDriver {
    fn trigger(&self, tree: &mut ViewTree, node: NodeId, effect: Effect) {
        tree.add_class(node, effect.class());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::Element;

    #[test]
    fn class_driver_tags_element() {
        let mut tree = ViewTree::new();
        let id = tree.append(tree.root(), Element::block("pixel-sprite")).unwrap();
        ClassDriver.trigger(&mut tree, id, Effect::DropIn);
        assert!(tree.get(id).unwrap().has_class("sprite-drop-in"));
    }

    #[test]
    fn effects_deserialize_from_snake_case() {
        let effect: Effect = serde_json::from_str("\"slide_left\"").unwrap();
        assert_eq!(effect, Effect::SlideLeft);
    }
}
