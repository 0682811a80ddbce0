//! Playback primitives shared by the scene sequencer and the cinematic player.
//!
//! Every wait is a suspension point that yields to the host event loop and
//! races the run's cancellation token. Once the token fires, a suspension
//! resolves to `PlaybackError::Aborted` instead of completing, and whatever
//! timer or listener it held is released on the way out.

mod action;
mod cancel;
mod driver;
mod text;

use std::time::Duration;

use tokio::sync::oneshot;

use crate::error::{PlaybackError, PlaybackResult};
use crate::view::{ListenerId, Mount};

pub use action::{CustomAction, Surface};
pub use cancel::{CancelSource, CancelToken};
pub use driver::{AnimationDriver, ClassDriver, Effect};
pub use text::{type_line, TextStyle, TypeLine};

/// Suspend for `ms` milliseconds unless the run is cancelled first.
pub async fn sleep(token: &CancelToken, ms: u64) -> PlaybackResult {
    token.check()?;
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(PlaybackError::Aborted),
        _ = tokio::time::sleep(Duration::from_millis(ms)) => Ok(()),
    }
}

/// Suspend until the mount point is clicked or the run is cancelled,
/// whichever comes first. The listener is detached on every exit path.
pub async fn wait_for_click(mount: &Mount, token: &CancelToken) -> PlaybackResult {
    token.check()?;
    let (tx, rx) = oneshot::channel();
    let id = mount.update(|tree| tree.add_click_listener(tx));
    let _listener = ListenerGuard { mount, id };

    tokio::select! {
        biased;
        _ = token.cancelled() => Err(PlaybackError::Aborted),
        // A dropped sender means the mount was reset under us.
        clicked = rx => clicked.map_err(|_| PlaybackError::Aborted),
    }
}

struct ListenerGuard<'a> {
    mount: &'a Mount,
    id: ListenerId,
}

impl Drop for ListenerGuard<'_> {
    fn drop(&mut self) {
        self.mount.try_update(|tree| tree.remove_click_listener(self.id));
    }
}
