use serde::{Deserialize, Serialize};

use crate::view::{Element, ElementKind, NodeId, UiAction, ViewTree};

/// One-shot view actions a script can run in place of typed text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CustomAction {
    /// Keycap button that closes the overlay.
    DismissKey { label: String },
    /// Closing call-to-action button at the end of the game.
    CallToAction { label: String },
    HealthBar { label: String },
    /// Lines between the stage's buildings.
    Connections {
        #[serde(default)]
        broken: bool,
    },
}

/// Where in a game scene an action's elements belong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Stage,
    Scene,
}

impl CustomAction {
    pub fn surface(&self) -> Surface {
        match self {
            CustomAction::HealthBar { .. } | CustomAction::Connections { .. } => Surface::Stage,
            CustomAction::DismissKey { .. } | CustomAction::CallToAction { .. } => Surface::Scene,
        }
    }

    /// Build the action's elements under `parent`. Returns the outermost one.
    pub fn apply(&self, tree: &mut ViewTree, parent: NodeId) -> Option<NodeId> {
        match self {
            CustomAction::DismissKey { label } => {
                let container = tree.append(parent, Element::block("keycap-container"))?;
                tree.append(
                    container,
                    Element::new(ElementKind::Button(UiAction::Close))
                        .with_class("keycap-btn")
                        .with_text(label.as_str()),
                )?;
                Some(container)
            }
            CustomAction::CallToAction { label } => tree.append(
                parent,
                Element::new(ElementKind::Button(UiAction::Close))
                    .with_class("game-cta")
                    .with_text(label.as_str()),
            ),
            CustomAction::HealthBar { label } => tree.append(
                parent,
                Element::new(ElementKind::Meter { fill: 100 })
                    .with_class("health-bar")
                    .with_text(label.as_str()),
            ),
            CustomAction::Connections { broken } => {
                let class = if *broken {
                    "broken-connection"
                } else {
                    "connection-line"
                };
                tree.append(
                    parent,
                    Element::new(ElementKind::Connection { broken: *broken }).with_class(class),
                )
            }
        }
    }
}
