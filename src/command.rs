//! Request/response messages for strip control.

use crate::animation::Animation;
use crate::colors::Rgb;

/// Operations that can be sent to a strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripAction {
    /// Render or queue an animation.
    AddAnimation { animation: Animation, brightness: u8 },
    /// Drop queued animations.
    ClearAnimations,
    /// Transmit the current frame and start playback.
    Start,
    /// Stop playback.
    Stop,
    /// Drive every LED off.
    Reset,
    /// Set one LED.
    SetColor { index: usize, color: Rgb },
    /// Set every LED.
    FillColor(Rgb),
    /// Set LEDs `start..=end`.
    FillSegment { start: usize, end: usize, color: Rgb },
    /// Query the strip length.
    GetLedCount,
}

/// Successful outcome of a [`StripAction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StripResponse {
    Done,
    LedCount(usize),
}

/// Action targeting a specific strip.
#[derive(Debug, Clone, Copy)]
pub struct StripCommand<Id> {
    pub strip_id: Id,
    pub action: StripAction,
}

impl<Id> StripCommand<Id> {
    /// Creates command.
    pub fn new(strip_id: Id, action: StripAction) -> Self {
        Self { strip_id, action }
    }
}
