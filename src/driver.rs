//! Interrupt-driven WS2812B transmission state machine.
//!
//! [`Ws2812Driver`] owns a circular buffer of [`BUFFER_LEN`] codewords split
//! into two halves of [`LEDS_PER_HALF`] LEDs each. While DMA reads one half,
//! the interrupt handler re-encodes the other one. The half to refill is taken
//! from the identity of the flag that fired, never from a running index:
//!
//! - [`DmaFlag::HalfTransfer`]: the first half was just read and is free.
//! - [`DmaFlag::TransferComplete`]: the second half was just read and is free.
//!
//! A frame walks `Idle -> Transfer -> Latch -> Idle`. The all-off sequence
//! started by [`Ws2812Driver::reset`] walks `Idle -> Reset -> Latch -> Idle`.
//!
//! # Ownership
//!
//! Once [`set`](Ws2812Driver::set) or [`reset`](Ws2812Driver::reset) returns
//! `Ok`, the codeword buffer belongs to the interrupt handler until
//! [`on_dma_flag`](Ws2812Driver::on_dma_flag) reports
//! [`TransferEvent::Complete`] or [`TransferEvent::Aborted`]. Callers must
//! not call `set` or `reset` again before that; both reject any state other
//! than `Idle`.

use crate::colors::{BLACK, Rgb};
use crate::encoder::{
    BITS_PER_LED, BUFFER_LEN, BitTiming, Codeword, HALF_BUFFER_LEN, LATCH_LED_TRANSFERS,
    LEDS_PER_HALF, encode_led, min_refresh_period_ms,
};
use crate::hal::{DmaController, DmaFlag, HalError, TimingHarness};

/// All-low line for the latch gap.
static LATCH_CODEWORDS: [Codeword; BUFFER_LEN] = [0; BUFFER_LEN];

/// Transmission state of a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverState {
    /// No transfer in flight. The codeword buffer may be written.
    Idle,
    /// Pixel data is streaming.
    Transfer,
    /// Holding the line low to commit the frame.
    Latch,
    /// Streaming `0` bits to every LED.
    Reset,
}

/// Region of the double buffer the next refill writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RefillTarget {
    /// Nothing in flight: encode both halves.
    Both,
    FirstHalf,
    SecondHalf,
}

impl RefillTarget {
    /// The half that DMA has just finished reading.
    pub fn vacated_by(flag: DmaFlag) -> Self {
        match flag {
            DmaFlag::TransferComplete => RefillTarget::SecondHalf,
            _ => RefillTarget::FirstHalf,
        }
    }

    fn range(self) -> core::ops::Range<usize> {
        match self {
            RefillTarget::Both => 0..BUFFER_LEN,
            RefillTarget::FirstHalf => 0..HALF_BUFFER_LEN,
            RefillTarget::SecondHalf => HALF_BUFFER_LEN..BUFFER_LEN,
        }
    }
}

/// Outcome reported from the interrupt handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferEvent {
    /// The latch finished and the driver is idle again.
    Complete,
    /// DMA reported a bus error. The driver has started the reset sequence.
    TransferError,
    /// The stream could not be restarted. The driver stopped and is idle.
    Aborted,
}

/// Errors from driver operations. None of them touch the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverError {
    /// [`Ws2812Driver::init`] has not succeeded yet.
    NotInitialized,
    /// The driver was not in the state the operation requires.
    InvalidState {
        expected: &'static str,
        actual: DriverState,
    },
    /// Zero LEDs, or more than the strip has.
    InvalidLedCount { requested: usize, capacity: usize },
    /// The timer resolution cannot express the bit timing.
    UnsupportedResolution(u32),
    Hal(HalError),
}

impl core::fmt::Display for DriverError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            DriverError::NotInitialized => write!(f, "driver not initialized"),
            DriverError::InvalidState { expected, actual } => {
                write!(f, "invalid state: expected {}, but driver is in {:?}", expected, actual)
            }
            DriverError::InvalidLedCount { requested, capacity } => {
                write!(f, "cannot send {} LEDs on a strip of {}", requested, capacity)
            }
            DriverError::UnsupportedResolution(resolution) => {
                write!(f, "timer resolution {} is too coarse for the bit timing", resolution)
            }
            DriverError::Hal(err) => write!(f, "hardware error: {}", err),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DriverError {}

impl From<HalError> for DriverError {
    fn from(err: HalError) -> Self {
        DriverError::Hal(err)
    }
}

/// Double-buffered DMA transmitter for one strip.
pub struct Ws2812Driver<H: TimingHarness, D: DmaController> {
    harness: H,
    dma: D,
    led_count: usize,
    initialized: bool,
    state: DriverState,
    refill_target: RefillTarget,
    timing: BitTiming,
    destination: usize,
    leds_to_send: usize,
    encoded_leds: usize,
    sent_leds: usize,
    codewords: [Codeword; BUFFER_LEN],
    reset_codewords: [Codeword; BUFFER_LEN],
}

impl<H: TimingHarness, D: DmaController> Ws2812Driver<H, D> {
    /// Creates an uninitialized driver for a strip of `led_count` LEDs.
    pub fn new(harness: H, dma: D, led_count: usize) -> Self {
        Self {
            harness,
            dma,
            led_count,
            initialized: false,
            state: DriverState::Idle,
            refill_target: RefillTarget::Both,
            timing: BitTiming { high: 0, low: 0 },
            destination: 0,
            leds_to_send: 0,
            encoded_leds: 0,
            sent_leds: 0,
            codewords: [0; BUFFER_LEN],
            reset_codewords: [0; BUFFER_LEN],
        }
    }

    /// Derives the bit timing from the timer and prepares the reset buffer.
    ///
    /// Calling it again after success does nothing.
    pub fn init(&mut self) -> Result<(), DriverError> {
        if self.initialized {
            return Ok(());
        }

        if self.led_count == 0 {
            return Err(DriverError::InvalidLedCount {
                requested: 0,
                capacity: 0,
            });
        }

        let resolution = self.harness.resolution();
        self.timing =
            BitTiming::from_resolution(resolution).ok_or(DriverError::UnsupportedResolution(resolution))?;
        self.destination = self.harness.compare_register_address();
        self.reset_codewords.fill(self.timing.low);
        self.initialized = true;

        debug!(
            "ws2812: init, {} leds, high {} low {}",
            self.led_count, self.timing.high, self.timing.low
        );
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == DriverState::Idle
    }

    pub fn led_count(&self) -> usize {
        self.led_count
    }

    pub fn timing(&self) -> BitTiming {
        self.timing
    }

    /// Current contents of the double buffer.
    pub fn codewords(&self) -> &[Codeword] {
        &self.codewords
    }

    /// See [`min_refresh_period_ms`].
    pub fn min_refresh_period_ms(&self) -> u32 {
        min_refresh_period_ms(self.led_count)
    }

    pub fn harness(&self) -> &H {
        &self.harness
    }

    pub fn dma(&self) -> &D {
        &self.dma
    }

    /// Starts transmitting `pixels`, which may be shorter than the strip.
    ///
    /// Both halves are encoded up front, then DMA and the PWM channel are
    /// enabled and the driver enters `Transfer`.
    pub fn set(&mut self, pixels: &[Rgb]) -> Result<(), DriverError> {
        self.check_ready()?;

        if pixels.is_empty() || pixels.len() > self.led_count {
            return Err(DriverError::InvalidLedCount {
                requested: pixels.len(),
                capacity: self.led_count,
            });
        }

        self.leds_to_send = pixels.len();
        self.encoded_leds = 0;
        self.sent_leds = 0;

        self.codewords.fill(0);
        self.refill_target = RefillTarget::Both;
        self.refill(pixels);

        if let Err(err) = self
            .dma
            .configure(&self.codewords, self.destination)
            .and_then(|_| self.start_stream())
        {
            self.shutdown();
            return Err(err.into());
        }

        self.state = DriverState::Transfer;
        trace!("ws2812: transfer of {} leds", self.leds_to_send);
        Ok(())
    }

    /// Drives every LED of the strip off, then latches.
    pub fn reset(&mut self) -> Result<(), DriverError> {
        self.check_ready()?;

        self.leds_to_send = self.led_count;
        self.sent_leds = 0;

        if let Err(err) = self
            .dma
            .configure(&self.reset_codewords, self.destination)
            .and_then(|_| self.start_stream())
        {
            self.shutdown();
            return Err(err.into());
        }

        self.state = DriverState::Reset;
        trace!("ws2812: reset of {} leds", self.leds_to_send);
        Ok(())
    }

    /// Advances the state machine for one DMA interrupt.
    ///
    /// `pixels` must be the same buffer that was passed to [`set`](Self::set).
    /// Returns an event when the transfer ended or failed. After
    /// [`TransferEvent::Complete`] and [`TransferEvent::Aborted`] the driver
    /// is idle.
    pub fn on_dma_flag(&mut self, flag: DmaFlag, pixels: &[Rgb]) -> Option<TransferEvent> {
        self.dma.clear_flag(flag);

        if flag == DmaFlag::TransferError {
            warn!("ws2812: DMA transfer error in {}", self.state);
            return Some(self.recover());
        }

        self.sent_leds += LEDS_PER_HALF;

        match self.state {
            DriverState::Transfer => {
                self.refill_target = RefillTarget::vacated_by(flag);

                if self.sent_leds < self.leds_to_send {
                    self.refill(pixels);
                    None
                } else {
                    self.latch()
                }
            }
            DriverState::Latch if self.sent_leds >= self.leds_to_send => {
                self.stop();
                Some(TransferEvent::Complete)
            }
            DriverState::Reset if self.sent_leds >= self.leds_to_send => self.latch(),
            _ => None,
        }
    }

    fn check_ready(&self) -> Result<(), DriverError> {
        if !self.initialized {
            return Err(DriverError::NotInitialized);
        }

        if self.state != DriverState::Idle {
            return Err(DriverError::InvalidState {
                expected: "Idle",
                actual: self.state,
            });
        }

        Ok(())
    }

    fn start_stream(&mut self) -> Result<(), HalError> {
        self.dma.clear_all_flags();
        for flag in DmaFlag::ALL {
            self.dma.enable_interrupt(flag)?;
        }
        self.dma.enable()?;
        self.harness.enable_channel()?;
        Ok(())
    }

    /// Encodes the next LEDs into the target region. Once pixel data runs
    /// out, the rest of that region is zeroed and nothing else is encoded.
    fn refill(&mut self, pixels: &[Rgb]) {
        let target = self.refill_target;
        let region = &mut self.codewords[target.range()];

        for chunk in region.chunks_mut(BITS_PER_LED) {
            if self.encoded_leds >= self.leds_to_send {
                chunk.fill(0);
                continue;
            }

            let color = pixels.get(self.encoded_leds).copied().unwrap_or(BLACK);
            encode_led(color, &self.timing, chunk);
            self.encoded_leds += 1;
        }
    }

    fn latch(&mut self) -> Option<TransferEvent> {
        self.sent_leds = 0;
        self.leds_to_send = LATCH_LED_TRANSFERS;

        self.dma.disable();
        let restarted = self
            .dma
            .configure(&LATCH_CODEWORDS, self.destination)
            .and_then(|_| self.dma.enable());

        self.state = DriverState::Latch;

        if restarted.is_err() {
            error!("ws2812: latch could not restart DMA");
            self.stop();
            return Some(TransferEvent::Aborted);
        }
        None
    }

    /// Silences the line and the stream.
    fn shutdown(&mut self) {
        self.harness.disable_channel();
        self.dma.disable();
        self.dma.clear_all_flags();
    }

    fn stop(&mut self) {
        self.shutdown();

        self.refill_target = RefillTarget::Both;
        self.state = DriverState::Idle;
        trace!("ws2812: idle");
    }

    /// Abandons the current transfer and starts the reset sequence.
    fn recover(&mut self) -> TransferEvent {
        self.harness.disable_channel();
        self.dma.disable();
        self.state = DriverState::Idle;

        match self.reset() {
            Ok(()) => TransferEvent::TransferError,
            Err(err) => {
                error!("ws2812: reset after transfer error failed: {}", err);
                self.stop();
                TransferEvent::Aborted
            }
        }
    }
}
