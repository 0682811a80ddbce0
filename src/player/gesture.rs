use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressKind {
    Short,
    Long,
}

/// Press-and-hold classifier for the launcher button.
///
/// A long press fires once, while the button is still held, as soon as the
/// threshold elapses; releasing afterwards does nothing. Releasing earlier is
/// a short press. Leaving the button cancels the press outright.
#[derive(Debug, Clone)]
pub struct PressTracker {
    threshold: Duration,
    pressed_at: Option<Instant>,
    fired: bool,
}

impl PressTracker {
    pub fn new(threshold: Duration) -> Self {
        PressTracker {
            threshold,
            pressed_at: None,
            fired: false,
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed_at.is_some()
    }

    pub fn press(&mut self, now: Instant) {
        self.pressed_at = Some(now);
        self.fired = false;
    }

    pub fn poll(&mut self, now: Instant) -> Option<PressKind> {
        let at = self.pressed_at?;
        if self.fired || now.duration_since(at) < self.threshold {
            return None;
        }
        self.fired = true;
        Some(PressKind::Long)
    }

    pub fn release(&mut self, now: Instant) -> Option<PressKind> {
        let at = self.pressed_at.take()?;
        if std::mem::take(&mut self.fired) {
            return None;
        }
        if now.duration_since(at) >= self.threshold {
            Some(PressKind::Long)
        } else {
            Some(PressKind::Short)
        }
    }

    pub fn cancel(&mut self) {
        self.pressed_at = None;
        self.fired = false;
    }
}
