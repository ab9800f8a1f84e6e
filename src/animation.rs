//! Animation plugins and the per-strip queue of repeating animations.
//!
//! [`Animation`] is the closed set of animations a strip accepts. Static kinds
//! ([`Animation::SolidColor`], [`Animation::SegmentFill`]) are rendered once
//! into the pixel buffer and leave nothing behind. Dynamic kinds
//! ([`Animation::Rainbow`]) become a [`DynamicAnimation`] that lives in the
//! strip's [`AnimationQueue`] and is rebuilt on every frame tick.

use crate::colors::{BLACK, Hsv, Rgb, hsv, scale_color};
use crate::pixels::{PixelBuffer, PixelError};
use heapless::Vec;

/// Hue travel of a rainbow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Colors move toward higher LED indices.
    #[default]
    Up,
    /// Colors move toward lower LED indices.
    Down,
}

/// A base color over the whole strip with a differently colored segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentFill {
    pub base: Rgb,
    pub segment: Rgb,
    /// First LED of the segment.
    pub start: usize,
    /// Last LED of the segment, inclusive.
    pub end: usize,
}

impl SegmentFill {
    pub fn render<const N: usize>(&self, brightness: u8, pixels: &mut PixelBuffer<N>) -> Result<(), AnimationError> {
        let len = pixels.len();
        if self.start > self.end || self.end >= len {
            return Err(PixelError::InvalidSegment {
                start: self.start,
                end: self.end,
                len,
            }
            .into());
        }

        if self.base != BLACK {
            pixels.fill(scale_color(self.base, brightness));
        }
        pixels.fill_segment(self.start, self.end, scale_color(self.segment, brightness))?;
        Ok(())
    }
}

/// Parameters of a moving rainbow over `segment_start..=segment_end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RainbowParams {
    pub direction: Direction,
    /// Hue of the first frame's offset plus the saturation and value of every LED.
    pub start_color: Hsv,
    pub segment_start: usize,
    pub segment_end: usize,
    /// Hue offset change per update. Must not be zero.
    pub speed: u8,
    /// Hue difference between neighbouring LEDs.
    pub hue_step: u8,
    /// Frame ticks skipped between updates.
    pub frames_per_update: u32,
}

impl RainbowParams {
    pub fn validate(&self, led_count: usize) -> Result<(), AnimationError> {
        if self.speed == 0 {
            return Err(AnimationError::ZeroSpeed);
        }

        if self.segment_start >= self.segment_end || self.segment_end >= led_count {
            return Err(PixelError::InvalidSegment {
                start: self.segment_start,
                end: self.segment_end,
                len: led_count,
            }
            .into());
        }

        Ok(())
    }
}

/// Animation payload of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Animation {
    SolidColor(Rgb),
    SegmentFill(SegmentFill),
    Rainbow(RainbowParams),
}

impl Animation {
    /// Whether the animation is queued and rebuilt every frame.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Animation::Rainbow(_))
    }
}

/// Errors raised while building an animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AnimationError {
    Pixel(PixelError),
    /// A rainbow needs a nonzero speed.
    ZeroSpeed,
    /// The queue has no room for another dynamic animation.
    QueueFull { capacity: usize },
}

impl core::fmt::Display for AnimationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AnimationError::Pixel(err) => write!(f, "{}", err),
            AnimationError::ZeroSpeed => write!(f, "rainbow speed must not be zero"),
            AnimationError::QueueFull { capacity } => {
                write!(f, "animation queue is full ({} entries)", capacity)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for AnimationError {}

impl From<PixelError> for AnimationError {
    fn from(err: PixelError) -> Self {
        AnimationError::Pixel(err)
    }
}

/// Renders an animation once. For a rainbow this is its first frame only;
/// repeating playback goes through [`DynamicAnimation`].
pub fn render_static<const N: usize>(
    animation: &Animation,
    brightness: u8,
    pixels: &mut PixelBuffer<N>,
) -> Result<(), AnimationError> {
    match animation {
        Animation::SolidColor(color) => {
            pixels.fill(scale_color(*color, brightness));
            Ok(())
        }
        Animation::SegmentFill(segment) => segment.render(brightness, pixels),
        Animation::Rainbow(params) => {
            let mut rainbow = Rainbow::new(*params, brightness);
            rainbow.build(pixels)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum RainbowState {
    Init,
    Run,
}

/// Runtime state of a rainbow.
#[derive(Debug, Clone)]
pub struct Rainbow {
    params: RainbowParams,
    brightness: u8,
    state: RainbowState,
    hue_offset: u8,
    frame_counter: u32,
}

impl Rainbow {
    pub fn new(params: RainbowParams, brightness: u8) -> Self {
        Self {
            params,
            brightness,
            state: RainbowState::Init,
            hue_offset: params.start_color.hue,
            frame_counter: 0,
        }
    }

    pub fn params(&self) -> &RainbowParams {
        &self.params
    }

    /// Hue of the segment's first LED on the next update.
    pub fn hue_offset(&self) -> u8 {
        self.hue_offset
    }

    /// Advances one frame tick.
    ///
    /// The first call validates the parameters and renders immediately.
    /// Later calls count down `frames_per_update` before rendering again.
    pub fn build<const N: usize>(&mut self, pixels: &mut PixelBuffer<N>) -> Result<(), AnimationError> {
        if self.state == RainbowState::Init {
            self.params.validate(pixels.len())?;
            self.hue_offset = self.params.start_color.hue;
            self.frame_counter = 0;
            self.state = RainbowState::Run;
        } else if self.frame_counter < self.params.frames_per_update {
            self.frame_counter += 1;
            return Ok(());
        }

        let Hsv {
            saturation, value, ..
        } = self.params.start_color;

        for led in self.params.segment_start..=self.params.segment_end {
            let hue = self
                .hue_offset
                .wrapping_add((led as u8).wrapping_mul(self.params.hue_step));
            let color = scale_color(hsv(hue, saturation, value), self.brightness);

            if let Err(err) = pixels.set(led, color) {
                self.state = RainbowState::Init;
                return Err(err.into());
            }
        }

        self.hue_offset = match self.params.direction {
            Direction::Up => self.hue_offset.wrapping_sub(self.params.speed),
            Direction::Down => self.hue_offset.wrapping_add(self.params.speed),
        };
        self.frame_counter = 0;
        Ok(())
    }
}

/// A queued animation that is rebuilt on every frame tick.
#[derive(Debug, Clone)]
pub enum DynamicAnimation {
    Rainbow(Rainbow),
}

impl DynamicAnimation {
    /// Creates the runtime state for a dynamic descriptor.
    pub fn from_animation(animation: &Animation, brightness: u8) -> Option<Self> {
        match animation {
            Animation::Rainbow(params) => Some(DynamicAnimation::Rainbow(Rainbow::new(*params, brightness))),
            Animation::SolidColor(_) | Animation::SegmentFill(_) => None,
        }
    }

    pub fn build<const N: usize>(&mut self, pixels: &mut PixelBuffer<N>) -> Result<(), AnimationError> {
        match self {
            DynamicAnimation::Rainbow(rainbow) => rainbow.build(pixels),
        }
    }
}

/// Dynamic animations of one strip, newest first.
///
/// Removing an entry drops its state; there is no separate release step.
#[derive(Debug, Clone)]
pub struct AnimationQueue<const M: usize> {
    entries: Vec<DynamicAnimation, M>,
}

impl<const M: usize> Default for AnimationQueue<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const M: usize> AnimationQueue<M> {
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Puts `animation` at the head of the queue.
    pub fn push_front(&mut self, animation: DynamicAnimation) -> Result<(), AnimationError> {
        self.entries
            .insert(0, animation)
            .map_err(|_| AnimationError::QueueFull { capacity: M })
    }

    /// Builds every entry, newest first. Stops at the first failure.
    pub fn build_all<const N: usize>(&mut self, pixels: &mut PixelBuffer<N>) -> Result<(), AnimationError> {
        self.entries.iter_mut().try_for_each(|entry| entry.build(pixels))
    }

    /// Drops every entry and returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        M
    }

    pub fn iter(&self) -> impl Iterator<Item = &DynamicAnimation> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rainbow(frames_per_update: u32) -> RainbowParams {
        RainbowParams {
            direction: Direction::Up,
            start_color: Hsv::new(10, 255, 255),
            segment_start: 0,
            segment_end: 3,
            speed: 4,
            hue_step: 8,
            frames_per_update,
        }
    }

    fn strip() -> PixelBuffer<8> {
        let mut pixels = PixelBuffer::new();
        pixels.resize(8).unwrap();
        pixels
    }

    #[test]
    fn rainbow_first_build_renders_and_advances() {
        let mut pixels = strip();
        let mut rainbow = Rainbow::new(rainbow(0), 255);

        rainbow.build(&mut pixels).unwrap();

        assert_eq!(rainbow.hue_offset(), 6);
        assert_eq!(pixels.get(0), Some(hsv(10, 255, 255)));
        assert_eq!(pixels.get(3), Some(hsv(34, 255, 255)));
        assert_eq!(pixels.get(4), Some(BLACK));
    }

    #[test]
    fn rainbow_down_adds_speed() {
        let mut pixels = strip();
        let mut params = rainbow(0);
        params.direction = Direction::Down;
        let mut rainbow = Rainbow::new(params, 255);

        rainbow.build(&mut pixels).unwrap();
        rainbow.build(&mut pixels).unwrap();

        assert_eq!(rainbow.hue_offset(), 18);
    }

    #[test]
    fn rainbow_skips_frames_between_updates() {
        let mut pixels = strip();
        let mut rainbow = Rainbow::new(rainbow(2), 255);

        rainbow.build(&mut pixels).unwrap();
        assert_eq!(rainbow.hue_offset(), 6);

        rainbow.build(&mut pixels).unwrap();
        rainbow.build(&mut pixels).unwrap();
        assert_eq!(rainbow.hue_offset(), 6);

        rainbow.build(&mut pixels).unwrap();
        assert_eq!(rainbow.hue_offset(), 2);
    }

    #[test]
    fn rainbow_rejects_zero_speed_and_bad_segment() {
        let mut pixels = strip();

        let mut params = rainbow(0);
        params.speed = 0;
        assert_eq!(Rainbow::new(params, 255).build(&mut pixels), Err(AnimationError::ZeroSpeed));

        let mut params = rainbow(0);
        params.segment_end = 8;
        assert!(Rainbow::new(params, 255).build(&mut pixels).is_err());

        let mut params = rainbow(0);
        params.segment_start = 3;
        assert!(Rainbow::new(params, 255).build(&mut pixels).is_err());
    }

    #[test]
    fn segment_fill_skips_black_base() {
        let mut pixels = strip();
        pixels.fill(Rgb::new(1, 2, 3));

        let fill = SegmentFill {
            base: BLACK,
            segment: Rgb::new(255, 255, 255),
            start: 2,
            end: 3,
        };
        fill.render(255, &mut pixels).unwrap();

        assert_eq!(pixels.get(0), Some(Rgb::new(1, 2, 3)));
        assert_eq!(pixels.get(2), Some(Rgb::new(255, 255, 255)));
        assert_eq!(pixels.get(3), Some(Rgb::new(255, 255, 255)));
    }

    #[test]
    fn queue_is_newest_first_and_bounded() {
        let mut queue = AnimationQueue::<2>::new();
        let mut first = rainbow(0);
        first.speed = 1;
        let mut second = rainbow(0);
        second.speed = 2;

        queue.push_front(DynamicAnimation::Rainbow(Rainbow::new(first, 255))).unwrap();
        queue.push_front(DynamicAnimation::Rainbow(Rainbow::new(second, 255))).unwrap();

        let speeds: heapless::Vec<u8, 2> = queue
            .iter()
            .map(|entry| match entry {
                DynamicAnimation::Rainbow(r) => r.params().speed,
            })
            .collect();
        assert_eq!(speeds.as_slice(), &[2, 1]);

        let overflow = queue.push_front(DynamicAnimation::Rainbow(Rainbow::new(first, 255)));
        assert_eq!(overflow, Err(AnimationError::QueueFull { capacity: 2 }));
        assert_eq!(queue.clear(), 2);
        assert!(queue.is_empty());
    }
}
