use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tokio::task::LocalSet;
use tokio::time::sleep;

use sitesync_terminal::game::story::Story;
use sitesync_terminal::game::SceneSequencer;
use sitesync_terminal::playback::{AnimationDriver, Effect};
use sitesync_terminal::sprites::{SpriteRenderer, SpriteTable};
use sitesync_terminal::view::{Mount, NodeId, ViewTree};

/// Records every effect it is asked to start, by sprite name.
#[derive(Default)]
struct Recorder {
    triggered: RefCell<Vec<(String, Effect)>>,
}

impl AnimationDriver for Recorder {
    fn trigger(&self, tree: &mut ViewTree, node: NodeId, effect: Effect) {
        let name = tree
            .get(node)
            .and_then(|el| el.sprite())
            .map(|s| s.name.clone())
            .unwrap_or_default();
        self.triggered.borrow_mut().push((name, effect));
    }
}

impl Recorder {
    fn triggered(&self) -> Vec<(String, Effect)> {
        self.triggered.borrow().clone()
    }
}

fn sprite_hidden(mount: &Mount, name: &str) -> Option<bool> {
    mount.read(|tree| {
        tree.find_by_class("pixel-sprite")
            .into_iter()
            .filter_map(|id| tree.get(id))
            .find(|el| el.sprite().is_some_and(|s| s.name == name))
            .map(|el| el.hidden)
    })
}

#[tokio::test(start_paused = true)]
async fn effects_go_through_the_installed_driver() {
    LocalSet::new()
        .run_until(async {
            let mount = Mount::new();
            let recorder = Rc::new(Recorder::default());
            let story = Story::from_json(
                r#"{ "scenes": [ { "steps": [
                    { "step": "show_sprite", "id": "h", "sprite": "heart", "effect": "drop_in" },
                    { "step": "show_sprite", "id": "t", "sprite": "trophy", "hidden": true, "effect": "grow_in" },
                    { "step": "wait", "ms": 100 },
                    { "step": "reveal", "id": "t", "effect": "sparkle" }
                ] } ] }"#,
            )
            .unwrap();
            let game = SceneSequencer::new(mount.clone(), story).with_driver(recorder.clone());
            let handle = game.start().unwrap();

            sleep(Duration::from_millis(50)).await;
            assert_eq!(recorder.triggered(), [("heart".to_string(), Effect::DropIn)]);
            assert_eq!(sprite_hidden(&mount, "trophy"), Some(true));
            // The default driver's class tagging is bypassed.
            assert_eq!(mount.count_class("sprite-drop-in"), 0);

            handle.await.unwrap();
            assert_eq!(
                recorder.triggered(),
                [
                    ("heart".to_string(), Effect::DropIn),
                    ("trophy".to_string(), Effect::Sparkle),
                ]
            );
            assert_eq!(sprite_hidden(&mount, "trophy"), Some(false));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn sprites_come_from_the_installed_renderer() {
    LocalSet::new()
        .run_until(async {
            let table = SpriteTable::from_json(
                r##"{
                    "palette": { "g": "#00ff00" },
                    "sprites": { "gem": { "width": 1, "height": 1, "pixels": [["g"]] } }
                }"##,
            )
            .unwrap();
            let table: &'static SpriteTable = Box::leak(Box::new(table));

            let mount = Mount::new();
            let story = Story::from_json(
                r#"{ "scenes": [ { "steps": [
                    { "step": "show_sprite", "sprite": "gem", "x": 3 },
                    { "step": "show_sprite", "sprite": "heart", "x": 9 }
                ] } ] }"#,
            )
            .unwrap();
            let game =
                SceneSequencer::new(mount.clone(), story).with_renderer(SpriteRenderer::new(table));
            game.start().unwrap().await.unwrap();

            // "heart" only exists in the built-in table, so it is skipped.
            assert_eq!(mount.count_class("pixel-sprite"), 1);
            let gem = mount.read(|tree| {
                let id = tree.first_by_class("pixel-sprite").unwrap();
                let sprite = tree.get(id).unwrap().sprite().unwrap().clone();
                (sprite.name, sprite.visual.pixels[0].color.clone())
            });
            assert_eq!(gem, ("gem".to_string(), "#00ff00".to_string()));
        })
        .await;
}
