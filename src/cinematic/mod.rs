//! Cinematic player: the text-only story inside the terminal overlay.
//!
//! Scenes play back to back with no click gate; pacing comes entirely from
//! each line's pause. Every `open()` restarts from the first scene, and the
//! player never holds more than one live cancellation token.

pub mod script;

use std::cell::RefCell;
use std::rc::Rc;

use tokio::task::JoinHandle;

use crate::error::{PlaybackError, PlaybackResult};
use crate::playback::{self, type_line, CancelSource, CancelToken, TypeLine};
use crate::view::{Element, ElementKind, Mount, NodeId, UiAction};

use script::{CinematicScript, Line};

pub const OVERLAY_CLASS: &str = "terminal-overlay";
pub const OPEN_CLASS: &str = "open";

#[derive(Default)]
struct OverlayState {
    open: bool,
    playing: bool,
    run: u64,
    cancel: Option<CancelSource>,
    body: Option<NodeId>,
}

pub struct CinematicPlayer {
    mount: Mount,
    script: Rc<CinematicScript>,
    state: Rc<RefCell<OverlayState>>,
}

impl CinematicPlayer {
    pub fn new(mount: Mount, script: CinematicScript) -> Self {
        CinematicPlayer {
            mount,
            script: Rc::new(script),
            state: Rc::new(RefCell::new(OverlayState::default())),
        }
    }

    pub fn mount(&self) -> &Mount {
        &self.mount
    }

    pub fn is_open(&self) -> bool {
        self.state.borrow().open
    }

    pub fn is_playing(&self) -> bool {
        self.state.borrow().playing
    }

    /// Body element the lines are typed into, once the overlay exists.
    pub fn body(&self) -> Option<NodeId> {
        self.state.borrow().body
    }

    /// Build the overlay chrome on first use.
    fn init(&self) -> Option<NodeId> {
        if let Some(body) = self.state.borrow().body {
            if self.mount.read(|tree| tree.contains(body)) {
                return Some(body);
            }
        }

        let title = self.script.title.clone();
        let body = self.mount.update(|tree| {
            tree.reset();
            let root = tree.root();
            tree.add_class(root, OVERLAY_CLASS);
            let window = tree.append(root, Element::block("terminal-window"))?;
            let header = tree.append(
                window,
                Element::new(ElementKind::Text)
                    .with_class("terminal-header")
                    .with_text(title),
            )?;
            tree.append(
                header,
                Element::new(ElementKind::Button(UiAction::Close))
                    .with_class("term-close")
                    .with_text("x"),
            )?;
            tree.append(window, Element::block("terminal-body"))
        });
        self.state.borrow_mut().body = body;
        body
    }

    /// Show the overlay and (re)start the cinematic from its first scene.
    /// Any run still in flight is cancelled first.
    pub fn open(&self) -> Option<JoinHandle<()>> {
        let Some(body) = self.init() else {
            tracing::error!("terminal overlay could not be mounted");
            return None;
        };

        let (token, id) = {
            let mut state = self.state.borrow_mut();
            if let Some(previous) = state.cancel.take() {
                previous.cancel();
            }
            let source = CancelSource::new();
            let token = source.token();
            state.cancel = Some(source);
            state.open = true;
            state.playing = true;
            state.run += 1;
            (token, state.run)
        };

        self.mount.update(|tree| {
            let root = tree.root();
            tree.add_class(root, OPEN_CLASS);
            tree.clear(body);
        });

        tracing::debug!(run = id, "cinematic opened");
        let run = Run {
            mount: self.mount.clone(),
            script: Rc::clone(&self.script),
            state: Rc::clone(&self.state),
            token,
            id,
            body,
        };
        Some(tokio::task::spawn_local(run.play()))
    }

    /// Hide the overlay and cancel in-flight typing. Safe to call at any
    /// time, any number of times.
    pub fn close(&self) {
        let source = {
            let mut state = self.state.borrow_mut();
            state.open = false;
            state.playing = false;
            state.cancel.take()
        };
        if let Some(source) = source {
            source.cancel();
            tracing::debug!("cinematic closed");
        }
        self.mount.update(|tree| {
            let root = tree.root();
            tree.remove_class(root, OPEN_CLASS);
        });
    }

    /// Close and remove the overlay from the mount entirely.
    pub fn destroy(&self) {
        self.close();
        let body = self.state.borrow_mut().body.take();
        if body.is_some() {
            self.mount.reset();
        }
    }
}

struct Run {
    mount: Mount,
    script: Rc<CinematicScript>,
    state: Rc<RefCell<OverlayState>>,
    token: CancelToken,
    id: u64,
    body: NodeId,
}

impl Run {
    async fn play(self) {
        match self.play_lines().await {
            Ok(()) => tracing::debug!(run = self.id, "cinematic finished"),
            Err(e) if e.is_aborted() => tracing::debug!(run = self.id, "cinematic aborted"),
            Err(e) => tracing::error!(run = self.id, "cinematic error: {e}"),
        }
        let mut state = self.state.borrow_mut();
        if state.run == self.id {
            state.playing = false;
        }
    }

    async fn play_lines(&self) -> PlaybackResult {
        for scene in &self.script.scenes {
            for line in &scene.lines {
                self.token.check()?;
                match line {
                    Line::Custom { custom } => {
                        self.mount
                            .update(|tree| custom.apply(tree, self.body))
                            .ok_or(PlaybackError::Detached)?;
                    }
                    Line::Typed(line) => {
                        let typed = TypeLine {
                            text: line.text.as_str(),
                            class: "terminal-line",
                            style: line.style,
                            speed_ms: line.speed_ms,
                            cursor: false,
                        };
                        type_line(&self.mount, &self.token, self.body, typed).await?;
                        playback::sleep(&self.token, line.pause_after_ms).await?;
                    }
                }
            }
        }
        Ok(())
    }
}
