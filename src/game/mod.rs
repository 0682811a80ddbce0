//! Scene sequencer: the pixel-art story player.
//!
//! Plays a `Story` into a mount point: one scene at a time, each scene a
//! strictly ordered list of steps, with a click gate between scenes and a
//! progress marker per scene. A run owns exactly one cancellation token;
//! `stop()` fires it and clears the mount synchronously, and the run task
//! unwinds from whatever suspension it was parked in without touching the
//! view again.
//!
//! Lifecycle: `Idle → Playing → (Idle | Aborted)`.

pub mod story;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tokio::task::JoinHandle;

use crate::error::{PlaybackError, PlaybackResult};
use crate::playback::{
    self, type_line, AnimationDriver, CancelSource, CancelToken, ClassDriver, Surface, TypeLine,
};
use crate::sprites::SpriteRenderer;
use crate::view::{Element, ElementKind, Mount, NodeId, ViewTree};

use story::{GameScene, SpritePlacement, Step, Story, WalkCycle};

pub const CONTINUE_PROMPT: &str = "CLICK TO CONTINUE";
pub const GAME_CLASS: &str = "terminal-game";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Playing,
    Aborted,
}

struct PlaybackState {
    phase: Phase,
    current_scene: usize,
    /// Incremented by every `start()`; a finishing task only updates state
    /// that still belongs to its own run.
    run: u64,
    cancel: Option<CancelSource>,
    mounted: bool,
}

pub struct SceneSequencer {
    mount: Mount,
    story: Rc<Story>,
    renderer: SpriteRenderer<'static>,
    driver: Rc<dyn AnimationDriver>,
    state: Rc<RefCell<PlaybackState>>,
}

/// Everything a run task needs, detached from the sequencer handle.
struct Run {
    mount: Mount,
    story: Rc<Story>,
    renderer: SpriteRenderer<'static>,
    driver: Rc<dyn AnimationDriver>,
    state: Rc<RefCell<PlaybackState>>,
    token: CancelToken,
    id: u64,
    wrapper: NodeId,
    progress: NodeId,
}

impl SceneSequencer {
    pub fn new(mount: Mount, story: Story) -> Self {
        SceneSequencer {
            mount,
            story: Rc::new(story),
            renderer: SpriteRenderer::builtin(),
            driver: Rc::new(ClassDriver),
            state: Rc::new(RefCell::new(PlaybackState {
                phase: Phase::Idle,
                current_scene: 0,
                run: 0,
                cancel: None,
                mounted: false,
            })),
        }
    }

    pub fn with_driver(mut self, driver: Rc<dyn AnimationDriver>) -> Self {
        self.driver = driver;
        self
    }

    pub fn with_renderer(mut self, renderer: SpriteRenderer<'static>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn mount(&self) -> &Mount {
        &self.mount
    }

    pub fn phase(&self) -> Phase {
        self.state.borrow().phase
    }

    pub fn is_playing(&self) -> bool {
        self.phase() == Phase::Playing
    }

    pub fn current_scene(&self) -> usize {
        self.state.borrow().current_scene
    }

    /// Number of runs started over the sequencer's lifetime.
    pub fn runs(&self) -> u64 {
        self.state.borrow().run
    }

    pub fn scene_count(&self) -> usize {
        self.story.scenes.len()
    }

    /// Mount the view and spawn playback on the current `LocalSet`.
    ///
    /// Returns `None` without touching anything when a run is already
    /// playing.
    pub fn start(&self) -> Option<JoinHandle<()>> {
        let (token, id) = {
            let mut state = self.state.borrow_mut();
            if state.phase == Phase::Playing {
                return None;
            }
            let source = CancelSource::new();
            let token = source.token();
            state.phase = Phase::Playing;
            state.current_scene = 0;
            state.run += 1;
            state.cancel = Some(source);
            state.mounted = true;
            (token, state.run)
        };

        let scene_count = self.story.scenes.len();
        let (wrapper, progress) = self.mount.update(|tree| {
            tree.reset();
            let root = tree.root();
            tree.add_class(root, GAME_CLASS);
            let wrapper = tree.append(root, Element::block("game-scene"));
            let progress = tree.append(root, Element::block("game-progress"));
            if let Some(progress) = progress {
                for _ in 0..scene_count {
                    tree.append(progress, Element::block("progress-dot"));
                }
            }
            (wrapper, progress)
        });
        let (Some(wrapper), Some(progress)) = (wrapper, progress) else {
            tracing::error!("game container could not be mounted");
            self.stop();
            return None;
        };

        tracing::debug!(run = id, scenes = scene_count, "game started");
        let run = Run {
            mount: self.mount.clone(),
            story: Rc::clone(&self.story),
            renderer: self.renderer,
            driver: Rc::clone(&self.driver),
            state: Rc::clone(&self.state),
            token,
            id,
            wrapper,
            progress,
        };
        Some(tokio::task::spawn_local(run.play()))
    }

    /// Cancel the active run and clear the mount. A no-op when nothing is
    /// playing.
    pub fn stop(&self) {
        let source = {
            let mut state = self.state.borrow_mut();
            if state.phase != Phase::Playing {
                return;
            }
            state.phase = Phase::Aborted;
            state.mounted = false;
            state.cancel.take()
        };
        if let Some(source) = source {
            source.cancel();
        }
        self.mount.reset();
        tracing::debug!("game stopped");
    }

    /// Stop any run and tear down whatever this sequencer mounted, including
    /// the final scene of a finished run.
    pub fn destroy(&self) {
        self.stop();
        let mounted = std::mem::replace(&mut self.state.borrow_mut().mounted, false);
        if mounted {
            self.mount.reset();
        }
    }
}

impl Run {
    async fn play(self) {
        let _end = RunEnd {
            state: Rc::clone(&self.state),
            id: self.id,
        };
        match self.play_scenes().await {
            Ok(()) => {
                let count = self.story.scenes.len();
                self.mount.update(|tree| mark_progress(tree, self.progress, count));
                tracing::debug!(run = self.id, "game finished");
            }
            Err(e) if e.is_aborted() => tracing::debug!(run = self.id, "game aborted"),
            Err(e) => tracing::error!(run = self.id, "game error: {e}"),
        }
    }

    async fn play_scenes(&self) -> PlaybackResult {
        let count = self.story.scenes.len();
        for (index, scene) in self.story.scenes.iter().enumerate() {
            self.token.check()?;
            self.state.borrow_mut().current_scene = index;
            self.mount.update(|tree| mark_progress(tree, self.progress, index));
            tracing::debug!(run = self.id, scene = index, title = %scene.title, "scene");

            self.play_scene(index, scene).await?;

            if index + 1 < count {
                let prompt = self.mount.update(|tree| {
                    tree.append(
                        self.wrapper,
                        Element::new(ElementKind::Text)
                            .with_class("click-continue")
                            .with_text(CONTINUE_PROMPT),
                    )
                });
                playback::wait_for_click(&self.mount, &self.token).await?;
                if let Some(prompt) = prompt {
                    self.mount.update(|tree| tree.remove(prompt));
                }
            }
        }
        Ok(())
    }

    async fn play_scene(&self, index: usize, scene: &GameScene) -> PlaybackResult {
        if index > 0 && scene.fade_out_ms > 0 {
            self.mount.update(|tree| tree.add_class(self.wrapper, "fade-out"));
            playback::sleep(&self.token, scene.fade_out_ms).await?;
            self.mount.update(|tree| tree.remove_class(self.wrapper, "fade-out"));
        }

        let (stage, text) = self
            .mount
            .update(|tree| {
                tree.clear(self.wrapper);
                let stage = tree.append(
                    self.wrapper,
                    Element::new(ElementKind::Stage).with_class("game-stage"),
                )?;
                let text = tree.append(self.wrapper, Element::block("game-text-container"))?;
                Some((stage, text))
            })
            .ok_or(PlaybackError::Detached)?;

        let mut scope = SceneScope {
            stage,
            text,
            named: HashMap::new(),
        };
        for (step_index, step) in scene.steps.iter().enumerate() {
            match self.run_step(&mut scope, step).await {
                Ok(()) => {}
                Err(e) if e.is_aborted() || self.token.is_cancelled() => {
                    return Err(PlaybackError::Aborted);
                }
                Err(e) => {
                    let e = match e {
                        PlaybackError::Step { reason, .. } => PlaybackError::Step {
                            scene: index,
                            step: step_index,
                            reason,
                        },
                        other => other,
                    };
                    tracing::error!("{e}");
                }
            }
        }
        Ok(())
    }

    async fn run_step(&self, scope: &mut SceneScope, step: &Step) -> PlaybackResult {
        match step {
            Step::ShowSprite(placement) => {
                self.show_sprite(scope, placement);
                Ok(())
            }
            Step::Reveal { id, effect } => {
                let node = scope.lookup(id)?;
                self.mount.update(|tree| {
                    if let Some(el) = tree.get_mut(node) {
                        el.hidden = false;
                    }
                    if let Some(effect) = effect {
                        self.driver.trigger(tree, node, *effect);
                    }
                });
                Ok(())
            }
            Step::Walk(walk) => self.walk(scope, walk).await,
            Step::TypeText {
                text,
                style,
                speed_ms,
            } => {
                let line = TypeLine {
                    text: text.as_str(),
                    class: "game-text",
                    style: *style,
                    speed_ms: *speed_ms,
                    cursor: true,
                };
                type_line(&self.mount, &self.token, scope.text, line).await?;
                Ok(())
            }
            Step::Wait { ms } => playback::sleep(&self.token, *ms).await,
            Step::WaitForClick => playback::wait_for_click(&self.mount, &self.token).await,
            Step::Custom { action } => {
                let parent = match action.surface() {
                    Surface::Stage => scope.stage,
                    Surface::Scene => self.wrapper,
                };
                self.mount
                    .update(|tree| action.apply(tree, parent))
                    .map(|_| ())
                    .ok_or(PlaybackError::Detached)
            }
        }
    }

    /// Unknown sprites are logged by the renderer and skipped.
    fn show_sprite(&self, scope: &mut SceneScope, placement: &SpritePlacement) {
        let Some(element) = self
            .renderer
            .create_element(&placement.sprite, placement.frame, "")
        else {
            return;
        };
        let element = element
            .at(placement.x, placement.y)
            .hidden(placement.hidden);
        let node = self.mount.update(|tree| {
            let node = tree.append(scope.stage, element)?;
            if let (Some(effect), false) = (placement.effect, placement.hidden) {
                self.driver.trigger(tree, node, effect);
            }
            Some(node)
        });
        if let (Some(node), Some(id)) = (node, &placement.id) {
            scope.named.insert(id.clone(), node);
        }
    }

    async fn walk(&self, scope: &SceneScope, walk: &WalkCycle) -> PlaybackResult {
        let node = scope.lookup(&walk.id)?;
        let start = self
            .mount
            .read(|tree| tree.get(node).map(|el| el.x))
            .ok_or(PlaybackError::Detached)?;
        let target = i64::from(walk.until_x);
        let heading = (target - i64::from(start)).signum();
        if heading != 0 && i64::from(walk.dx).signum() != heading {
            return Err(step_error(format!(
                "walk from {start} to {} with dx {} never arrives",
                walk.until_x, walk.dx
            )));
        }

        let mut frame = self
            .mount
            .read(|tree| tree.get(node).and_then(|el| el.sprite()).map(|s| s.frame))
            .unwrap_or(0);
        let mut x = start;
        while heading != 0 && (target - i64::from(x)).signum() == heading {
            playback::sleep(&self.token, walk.interval_ms).await?;
            frame = frame.wrapping_add(1);
            x = x
                .checked_add(walk.dx)
                .ok_or_else(|| step_error(format!("walk from x = {x} by {} overflows", walk.dx)))?;
            let attached = self.mount.update(|tree| match tree.get_mut(node) {
                Some(el) => {
                    if let ElementKind::Sprite(instance) = &mut el.kind {
                        self.renderer.update_frame(instance, frame);
                    }
                    el.x = x;
                    true
                }
                None => false,
            });
            if !attached {
                return Err(PlaybackError::Detached);
            }
        }

        if walk.hide_after {
            self.mount.update(|tree| {
                if let Some(el) = tree.get_mut(node) {
                    el.hidden = true;
                }
            });
        }
        Ok(())
    }
}

/// Hands the sequencer back to `Idle` when its run ends, whether the task
/// returns, panics or is dropped.
struct RunEnd {
    state: Rc<RefCell<PlaybackState>>,
    id: u64,
}

impl Drop for RunEnd {
    fn drop(&mut self) {
        let Ok(mut state) = self.state.try_borrow_mut() else {
            return;
        };
        if state.run == self.id && state.phase == Phase::Playing {
            state.phase = Phase::Idle;
            state.cancel = None;
        }
    }
}

/// Elements built for the scene being played.
struct SceneScope {
    stage: NodeId,
    text: NodeId,
    named: HashMap<String, NodeId>,
}

impl SceneScope {
    fn lookup(&self, id: &str) -> PlaybackResult<NodeId> {
        self.named
            .get(id)
            .copied()
            .ok_or_else(|| step_error(format!("no sprite with id \"{id}\" in this scene")))
    }
}

fn step_error(reason: String) -> PlaybackError {
    // Indices are filled in by the scene loop.
    PlaybackError::Step {
        scene: 0,
        step: 0,
        reason,
    }
}

/// Markers before `current` are complete, `current` is active.
fn mark_progress(tree: &mut ViewTree, progress: NodeId, current: usize) {
    let dots = tree.children(progress).to_vec();
    for (i, dot) in dots.into_iter().enumerate() {
        tree.remove_class(dot, "active");
        tree.remove_class(dot, "complete");
        if i < current {
            tree.add_class(dot, "complete");
        } else if i == current {
            tree.add_class(dot, "active");
        }
    }
}
