use tokio::sync::watch;

use crate::error::{PlaybackError, PlaybackResult};

/// Owning side of a cancellation signal. One per playback run.
#[derive(Debug)]
pub struct CancelSource {
    tx: watch::Sender<bool>,
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelSource {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        CancelSource { tx }
    }

    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }

    /// Fire the signal. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Observing side, threaded through every suspension point of a run.
///
/// A token whose source has been dropped counts as cancelled.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    pub fn check(&self) -> PlaybackResult {
        if self.is_cancelled() {
            Err(PlaybackError::Aborted)
        } else {
            Ok(())
        }
    }

    /// Resolves once the signal fires.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // Err means the source is gone, which is cancellation too.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_live() {
        let source = CancelSource::new();
        assert!(source.token().check().is_ok());
    }

    #[test]
    fn cancel_reaches_every_token() {
        let source = CancelSource::new();
        let a = source.token();
        let b = a.clone();
        source.cancel();
        source.cancel();
        assert!(a.is_cancelled());
        assert_eq!(b.check(), Err(PlaybackError::Aborted));
    }

    #[test]
    fn dropped_source_cancels() {
        let source = CancelSource::new();
        let token = source.token();
        drop(source);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn cancelled_resolves_after_cancel() {
        let source = CancelSource::new();
        let token = source.token();
        source.cancel();
        token.cancelled().await;
    }
}
