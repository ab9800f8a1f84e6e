//! Stream orchestration for one LED strip.
//!
//! [`LedStrip`] ties a [`Ws2812Driver`] to its pixel buffer, a queue of
//! repeating animations, a completion event, and a periodic frame timer. It is
//! meant to live in a `static` and be shared by three contexts:
//!
//! - **Application tasks** call the operations below. Only [`start`],
//!   [`stop`] and [`reset`] suspend, each on the completion event with a
//!   bounded timeout. Everything else fails fast with [`StripError::Busy`]
//!   when another context holds the strip's lock.
//! - **The DMA interrupt** calls [`on_dma_interrupt`]. It never takes the
//!   strip's lock. Driver and pixels sit behind a critical-section mutex, and
//!   the driver is only armed while no transfer is in flight, so the interrupt
//!   owns the codeword buffer from arming until it reports completion.
//! - **The frame timer** ([`run_frame_timer`], or [`on_frame_tick`] from a
//!   timer of your own) rebuilds queued animations and arms the next frame,
//!   but only after the previous one has been fully transmitted.
//!
//! # State Machine
//!
//! ```text
//!   Idle ──add/clear──► Building ──► Idle
//!   Idle ──start──► Running ──► Updating ──(tick)──► Running ──► ...
//!                         └─────── stop / empty queue / arm failure ──► Idle
//! ```
//!
//! [`start`]: LedStrip::start
//! [`stop`]: LedStrip::stop
//! [`reset`]: LedStrip::reset
//! [`on_dma_interrupt`]: LedStrip::on_dma_interrupt
//! [`run_frame_timer`]: LedStrip::run_frame_timer
//! [`on_frame_tick`]: LedStrip::on_frame_tick

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::{Ticker, with_timeout};
use portable_atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};

use crate::animation::{Animation, AnimationError, AnimationQueue, DynamicAnimation, render_static};
use crate::colors::Rgb;
use crate::command::{StripAction, StripResponse};
use crate::config::{ConfigError, StripConfig};
use crate::driver::{DriverError, TransferEvent, Ws2812Driver};
use crate::hal::{DmaController, DmaFlag, TimingHarness};
use crate::pixels::{PixelBuffer, PixelError};

/// Orchestration state of a strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum StripState {
    /// Nothing playing. Animations may be added or cleared.
    Idle = 0,
    /// An animation is being added.
    Building = 1,
    /// Playback active, next frame being prepared.
    Running = 2,
    /// Playback active, a frame has been handed to the driver.
    Updating = 3,
}

impl StripState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => StripState::Building,
            2 => StripState::Running,
            3 => StripState::Updating,
            _ => StripState::Idle,
        }
    }
}

/// Result of one frame timer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameTick {
    /// Animations were rebuilt and the next frame is on its way.
    Rendered,
    /// The previous frame is still in flight, or the strip was locked.
    Skipped,
    /// Playback ended; the timer is disarmed.
    Stopped,
}

/// Errors returned by strip operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StripError {
    /// [`LedStrip::init`] has not succeeded yet.
    NotInitialized,
    /// Another context holds the strip's lock.
    Busy,
    /// Operation called from an invalid state.
    InvalidState {
        expected: &'static str,
        actual: StripState,
    },
    Config(ConfigError),
    Pixel(PixelError),
    Animation(AnimationError),
    Driver(DriverError),
    /// The completion event did not arrive in time.
    Timeout,
    /// The transfer hit a DMA error or could not be restarted. The driver
    /// is idle again.
    TransferFailed,
}

impl core::fmt::Display for StripError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            StripError::NotInitialized => write!(f, "strip not initialized"),
            StripError::Busy => write!(f, "strip is busy"),
            StripError::InvalidState { expected, actual } => {
                write!(f, "invalid state: expected {}, but strip is in {:?}", expected, actual)
            }
            StripError::Config(err) => write!(f, "configuration error: {}", err),
            StripError::Pixel(err) => write!(f, "pixel error: {}", err),
            StripError::Animation(err) => write!(f, "animation error: {}", err),
            StripError::Driver(err) => write!(f, "driver error: {}", err),
            StripError::Timeout => write!(f, "timed out waiting for transfer completion"),
            StripError::TransferFailed => write!(f, "transfer failed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for StripError {}

impl From<ConfigError> for StripError {
    fn from(err: ConfigError) -> Self {
        StripError::Config(err)
    }
}

impl From<PixelError> for StripError {
    fn from(err: PixelError) -> Self {
        StripError::Pixel(err)
    }
}

impl From<AnimationError> for StripError {
    fn from(err: AnimationError) -> Self {
        StripError::Animation(err)
    }
}

impl From<DriverError> for StripError {
    fn from(err: DriverError) -> Self {
        StripError::Driver(err)
    }
}

/// Periodic timer gate. The timer task sleeps until armed.
struct FrameTimer {
    armed: AtomicBool,
    wake: Signal<CriticalSectionRawMutex, ()>,
}

impl FrameTimer {
    const fn new() -> Self {
        Self {
            armed: AtomicBool::new(false),
            wake: Signal::new(),
        }
    }

    fn arm(&self) {
        self.armed.store(true, Ordering::Release);
        self.wake.signal(());
    }

    fn disarm(&self) {
        self.armed.store(false, Ordering::Release);
    }

    fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    async fn wait_armed(&self) {
        while !self.is_armed() {
            self.wake.wait().await;
        }
    }
}

/// State shared with the DMA interrupt.
struct Hardware<H: TimingHarness, D: DmaController, const LEDS: usize> {
    driver: Ws2812Driver<H, D>,
    pixels: PixelBuffer<LEDS>,
}

/// One WS2812B strip with its animation queue and frame timer.
///
/// # Type Parameters
/// * `H` - Timer channel implementation
/// * `D` - DMA stream implementation
/// * `LEDS` - Pixel buffer capacity
/// * `ANIMATIONS` - Maximum number of queued dynamic animations
pub struct LedStrip<H: TimingHarness, D: DmaController, const LEDS: usize, const ANIMATIONS: usize> {
    config: StripConfig,
    hardware: BlockingMutex<CriticalSectionRawMutex, RefCell<Hardware<H, D, LEDS>>>,
    animations: Mutex<CriticalSectionRawMutex, AnimationQueue<ANIMATIONS>>,
    state: AtomicU8,
    initialized: AtomicBool,
    in_flight: AtomicBool,
    transfer_errors: AtomicU32,
    completion: Signal<CriticalSectionRawMutex, TransferEvent>,
    frame_timer: FrameTimer,
}

impl<H: TimingHarness, D: DmaController, const LEDS: usize, const ANIMATIONS: usize>
    LedStrip<H, D, LEDS, ANIMATIONS>
{
    /// Creates an uninitialized strip. Call [`init`](Self::init) before use.
    pub fn new(harness: H, dma: D, config: StripConfig) -> Self {
        Self {
            config,
            hardware: BlockingMutex::new(RefCell::new(Hardware {
                driver: Ws2812Driver::new(harness, dma, config.led_count),
                pixels: PixelBuffer::new(),
            })),
            animations: Mutex::new(AnimationQueue::new()),
            state: AtomicU8::new(StripState::Idle as u8),
            initialized: AtomicBool::new(false),
            in_flight: AtomicBool::new(false),
            transfer_errors: AtomicU32::new(0),
            completion: Signal::new(),
            frame_timer: FrameTimer::new(),
        }
    }

    /// Validates the configuration, initializes the driver and zeroes the
    /// pixel buffer. Calling it again after success does nothing.
    pub fn init(&self) -> Result<(), StripError> {
        if self.is_initialized() {
            return Ok(());
        }

        self.config.validate(LEDS)?;
        self.with_hardware(|hw| -> Result<(), StripError> {
            hw.driver.init()?;
            hw.pixels.resize(self.config.led_count)?;
            Ok(())
        })?;

        self.initialized.store(true, Ordering::Release);
        info!("strip: initialized with {} leds", self.config.led_count);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn config(&self) -> &StripConfig {
        &self.config
    }

    pub fn state(&self) -> StripState {
        StripState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn led_count(&self) -> usize {
        self.config.led_count
    }

    /// Number of failed transfers since creation: DMA errors and streams
    /// that could not be restarted.
    pub fn transfer_errors(&self) -> u32 {
        self.transfer_errors.load(Ordering::Acquire)
    }

    pub fn frame_timer_armed(&self) -> bool {
        self.frame_timer.is_armed()
    }

    /// Whether the driver currently owns the codeword buffer.
    pub fn transfer_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Reads back one pixel in storage order.
    pub fn pixel(&self, index: usize) -> Option<Rgb> {
        self.with_hardware(|hw| hw.pixels.get(index))
    }

    /// Number of queued dynamic animations.
    pub fn queued_animations(&self) -> Result<usize, StripError> {
        let queue = self.animations.try_lock().map_err(|_| StripError::Busy)?;
        Ok(queue.len())
    }

    /// Runs `f` against the driver inside a critical section.
    pub fn with_driver<R>(&self, f: impl FnOnce(&Ws2812Driver<H, D>) -> R) -> R {
        self.with_hardware(|hw| f(&hw.driver))
    }

    /// Renders a static animation, or queues a dynamic one after rendering
    /// its first frame.
    pub fn add_animation(&self, animation: Animation, brightness: u8) -> Result<(), StripError> {
        self.ensure_initialized()?;
        let mut queue = self.animations.try_lock().map_err(|_| StripError::Busy)?;
        self.require_idle()?;

        self.set_state(StripState::Building);

        let result = match DynamicAnimation::from_animation(&animation, brightness) {
            Some(_) if queue.len() >= queue.capacity() => Err(AnimationError::QueueFull {
                capacity: queue.capacity(),
            }),
            Some(mut dynamic) => self
                .with_hardware(|hw| dynamic.build(&mut hw.pixels))
                .and_then(|_| queue.push_front(dynamic)),
            None => self.with_hardware(|hw| render_static(&animation, brightness, &mut hw.pixels)),
        };

        self.set_state(StripState::Idle);

        if let Err(err) = &result {
            warn!("strip: animation rejected: {}", err);
        }
        result.map_err(StripError::from)
    }

    /// Drops every queued animation and turns all pixels off.
    ///
    /// Succeeds without touching the pixels when nothing is queued.
    pub fn clear_animations(&self) -> Result<(), StripError> {
        self.ensure_initialized()?;
        let mut queue = self.animations.try_lock().map_err(|_| StripError::Busy)?;
        self.require_idle()?;

        if queue.is_empty() {
            return Ok(());
        }

        let removed = queue.clear();
        self.with_hardware(|hw| hw.pixels.clear());
        debug!("strip: cleared {} animations", removed);
        Ok(())
    }

    /// Transmits the current pixels and waits until the frame is out.
    ///
    /// Returns only after the completion event, or fails with
    /// [`StripError::Timeout`] and returns to `Idle`. If dynamic animations
    /// are queued, the frame timer is armed before returning; otherwise the
    /// strip is back in `Idle`.
    pub async fn start(&self) -> Result<(), StripError> {
        self.ensure_initialized()?;
        let queue = self.animations.try_lock().map_err(|_| StripError::Busy)?;
        self.require_idle()?;

        self.set_state(StripState::Running);
        self.completion.reset();
        let errors_before = self.transfer_errors();

        if let Err(err) = self.arm_frame() {
            self.set_state(StripState::Idle);
            return Err(err);
        }

        if let Err(err) = self.wait_completion(errors_before).await {
            warn!("strip: start failed: {}", err);
            self.set_state(StripState::Idle);
            return Err(err);
        }

        if queue.is_empty() {
            self.set_state(StripState::Idle);
            return Ok(());
        }

        self.frame_timer.arm();
        debug!("strip: playing {} animations", queue.len());
        Ok(())
    }

    /// Disarms the frame timer and waits for the transfer in flight, if any.
    ///
    /// A transfer that ends in an error still counts as finished.
    pub async fn stop(&self) -> Result<(), StripError> {
        self.ensure_initialized()?;

        if !self.frame_timer.is_armed() && !self.transfer_in_flight() {
            return Ok(());
        }

        {
            let _queue = self.animations.try_lock().map_err(|_| StripError::Busy)?;
            self.frame_timer.disarm();
            self.set_state(StripState::Idle);
        }

        if !self.transfer_in_flight() {
            return Ok(());
        }

        with_timeout(self.config.flag_timeout, self.completion.wait())
            .await
            .map_err(|_| StripError::Timeout)?;
        Ok(())
    }

    /// Drives every LED off and clears the pixel buffer.
    pub async fn reset(&self) -> Result<(), StripError> {
        self.ensure_initialized()?;
        let _queue = self.animations.try_lock().map_err(|_| StripError::Busy)?;
        self.require_idle()?;

        self.completion.reset();
        let errors_before = self.transfer_errors();
        self.with_hardware(|hw| -> Result<(), StripError> {
            hw.driver.reset()?;
            self.in_flight.store(true, Ordering::Release);
            Ok(())
        })?;

        self.wait_completion(errors_before).await?;

        self.with_hardware(|hw| hw.pixels.clear());
        Ok(())
    }

    pub fn set_color(&self, index: usize, color: Rgb) -> Result<(), StripError> {
        self.ensure_initialized()?;
        Ok(self.with_hardware(|hw| hw.pixels.set(index, color))?)
    }

    pub fn fill_color(&self, color: Rgb) -> Result<(), StripError> {
        self.ensure_initialized()?;
        self.with_hardware(|hw| hw.pixels.fill(color));
        Ok(())
    }

    /// Sets LEDs `start..=end`.
    pub fn fill_segment(&self, start: usize, end: usize, color: Rgb) -> Result<(), StripError> {
        self.ensure_initialized()?;
        Ok(self.with_hardware(|hw| hw.pixels.fill_segment(start, end, color))?)
    }

    /// Executes a request message against this strip.
    pub async fn handle_action(&self, action: StripAction) -> Result<StripResponse, StripError> {
        match action {
            StripAction::AddAnimation {
                animation,
                brightness,
            } => self.add_animation(animation, brightness)?,
            StripAction::ClearAnimations => self.clear_animations()?,
            StripAction::Start => self.start().await?,
            StripAction::Stop => self.stop().await?,
            StripAction::Reset => self.reset().await?,
            StripAction::SetColor { index, color } => self.set_color(index, color)?,
            StripAction::FillColor(color) => self.fill_color(color)?,
            StripAction::FillSegment { start, end, color } => self.fill_segment(start, end, color)?,
            StripAction::GetLedCount => return Ok(StripResponse::LedCount(self.led_count())),
        }
        Ok(StripResponse::Done)
    }

    /// DMA interrupt entry point. Never blocks.
    pub fn on_dma_interrupt(&self, flag: DmaFlag) {
        let event = self.with_hardware(|hw| {
            let Hardware { driver, pixels } = hw;
            driver.on_dma_flag(flag, pixels.as_slice())
        });

        match event {
            Some(TransferEvent::Complete) => {
                self.in_flight.store(false, Ordering::Release);
                self.completion.signal(TransferEvent::Complete);
            }
            Some(TransferEvent::TransferError) => {
                self.transfer_errors.fetch_add(1, Ordering::AcqRel);
            }
            Some(TransferEvent::Aborted) => {
                self.transfer_errors.fetch_add(1, Ordering::AcqRel);
                self.in_flight.store(false, Ordering::Release);
                self.completion.signal(TransferEvent::Aborted);
            }
            None => {}
        }
    }

    /// One frame timer period: rebuild queued animations and arm the next
    /// frame.
    pub fn on_frame_tick(&self) -> FrameTick {
        if !self.frame_timer.is_armed() {
            return FrameTick::Stopped;
        }

        if self.transfer_in_flight() {
            trace!("strip: frame still in flight");
            return FrameTick::Skipped;
        }

        let Ok(mut queue) = self.animations.try_lock() else {
            return FrameTick::Skipped;
        };

        if !self.frame_timer.is_armed() {
            return FrameTick::Stopped;
        }

        self.set_state(StripState::Running);

        if queue.is_empty() {
            self.halt_playback();
            return FrameTick::Stopped;
        }

        if let Err(err) = self.with_hardware(|hw| queue.build_all(&mut hw.pixels)) {
            warn!("strip: animation build failed: {}", err);
        }

        self.completion.reset();
        if let Err(err) = self.arm_frame() {
            warn!("strip: frame not armed: {}", err);
            self.halt_playback();
            return FrameTick::Stopped;
        }

        FrameTick::Rendered
    }

    /// Frame timer task. Sleeps until playback starts, then ticks every
    /// refresh period until playback ends.
    pub async fn run_frame_timer(&self) -> ! {
        loop {
            self.frame_timer.wait_armed().await;
            let mut ticker = Ticker::every(self.config.refresh_period);

            loop {
                ticker.next().await;
                if self.on_frame_tick() == FrameTick::Stopped {
                    break;
                }
            }
        }
    }

    /// Waits for the transfer armed after `completion` was reset. Fails if it
    /// timed out or any transfer failed since `errors_before` was read.
    async fn wait_completion(&self, errors_before: u32) -> Result<(), StripError> {
        let event = with_timeout(self.config.flag_timeout, self.completion.wait())
            .await
            .map_err(|_| StripError::Timeout)?;

        if event == TransferEvent::Aborted || self.transfer_errors() != errors_before {
            return Err(StripError::TransferFailed);
        }
        Ok(())
    }

    fn arm_frame(&self) -> Result<(), StripError> {
        self.set_state(StripState::Updating);
        self.with_hardware(|hw| -> Result<(), StripError> {
            let Hardware { driver, pixels } = hw;
            driver.set(pixels.as_slice())?;
            self.in_flight.store(true, Ordering::Release);
            Ok(())
        })
    }

    fn halt_playback(&self) {
        self.frame_timer.disarm();
        self.set_state(StripState::Idle);
        debug!("strip: playback stopped");
    }

    fn with_hardware<R>(&self, f: impl FnOnce(&mut Hardware<H, D, LEDS>) -> R) -> R {
        self.hardware.lock(|cell| f(&mut cell.borrow_mut()))
    }

    fn set_state(&self, state: StripState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn ensure_initialized(&self) -> Result<(), StripError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(StripError::NotInitialized)
        }
    }

    fn require_idle(&self) -> Result<(), StripError> {
        let actual = self.state();
        if actual == StripState::Idle {
            Ok(())
        } else {
            Err(StripError::InvalidState {
                expected: "Idle",
                actual,
            })
        }
    }
}
