//! Shared test infrastructure for ws2812-dma-stream integration tests

#![allow(dead_code)] // Items used across multiple test files; Rust analyzes per-file

use std::cell::RefCell;
use std::rc::Rc;

use embassy_futures::yield_now;
use ws2812_dma_stream::encoder::Codeword;
use ws2812_dma_stream::{
    DmaController, DmaFlag, HalError, LedStrip, Rgb, StripConfig, TimingHarness,
};

/// Timer ticks per bit: high = 68, low = 32.
pub const RESOLUTION: u32 = 100;
pub const HIGH: Codeword = 68;
pub const LOW: Codeword = 32;

pub const COMPARE_REGISTER: usize = 0x4000_0C34;

pub const RED: Rgb = Rgb::new(255, 0, 0);
pub const GREEN: Rgb = Rgb::new(0, 255, 0);
pub const BLUE: Rgb = Rgb::new(0, 0, 255);
pub const WHITE: Rgb = Rgb::new(255, 255, 255);
pub const BLACK: Rgb = Rgb::new(0, 0, 0);

// ============================================================================
// Hardware Log
// ============================================================================

/// Everything the mock peripherals were asked to do.
#[derive(Debug, Default)]
pub struct HardwareLog {
    pub channel_enabled: bool,
    pub channel_enable_count: usize,
    pub dma_enabled: bool,
    /// Copy of `source` at each `configure` call.
    pub configured: Vec<Vec<Codeword>>,
    pub destinations: Vec<usize>,
    pub cleared_flags: Vec<DmaFlag>,
    pub enabled_interrupts: Vec<DmaFlag>,
    /// Half the DMA will report next: true for the first half.
    pub next_is_first_half: bool,
    pub fail_configure: bool,
    pub fail_channel: bool,
}

impl HardwareLog {
    /// Flag the DMA would raise after reading its next half.
    pub fn next_flag(&mut self) -> DmaFlag {
        let flag = if self.next_is_first_half {
            DmaFlag::HalfTransfer
        } else {
            DmaFlag::TransferComplete
        };
        self.next_is_first_half = !self.next_is_first_half;
        flag
    }

    pub fn last_source(&self) -> &[Codeword] {
        self.configured.last().map(Vec::as_slice).unwrap_or(&[])
    }
}

pub type SharedLog = Rc<RefCell<HardwareLog>>;

pub fn new_log() -> SharedLog {
    Rc::new(RefCell::new(HardwareLog {
        next_is_first_half: true,
        ..HardwareLog::default()
    }))
}

// ============================================================================
// Mock Peripherals
// ============================================================================

/// Mock timer channel that records enable/disable calls
pub struct MockHarness {
    log: SharedLog,
    resolution: u32,
}

impl MockHarness {
    pub fn new(log: &SharedLog) -> Self {
        Self::with_resolution(log, RESOLUTION)
    }

    pub fn with_resolution(log: &SharedLog, resolution: u32) -> Self {
        Self {
            log: log.clone(),
            resolution,
        }
    }
}

impl TimingHarness for MockHarness {
    fn enable_channel(&mut self) -> Result<(), HalError> {
        let mut log = self.log.borrow_mut();
        if log.fail_channel {
            return Err(HalError::Channel);
        }
        log.channel_enabled = true;
        log.channel_enable_count += 1;
        Ok(())
    }

    fn disable_channel(&mut self) {
        self.log.borrow_mut().channel_enabled = false;
    }

    fn compare_register_address(&self) -> usize {
        COMPARE_REGISTER
    }

    fn resolution(&self) -> u32 {
        self.resolution
    }
}

/// Mock DMA stream that snapshots every configured source buffer
pub struct MockDma {
    log: SharedLog,
}

impl MockDma {
    pub fn new(log: &SharedLog) -> Self {
        Self { log: log.clone() }
    }
}

impl DmaController for MockDma {
    fn configure(&mut self, source: &[Codeword], destination: usize) -> Result<(), HalError> {
        let mut log = self.log.borrow_mut();
        if log.fail_configure {
            return Err(HalError::Dma);
        }
        log.configured.push(source.to_vec());
        log.destinations.push(destination);
        log.next_is_first_half = true;
        Ok(())
    }

    fn enable(&mut self) -> Result<(), HalError> {
        self.log.borrow_mut().dma_enabled = true;
        Ok(())
    }

    fn disable(&mut self) {
        self.log.borrow_mut().dma_enabled = false;
    }

    fn clear_flag(&mut self, flag: DmaFlag) {
        self.log.borrow_mut().cleared_flags.push(flag);
    }

    fn enable_interrupt(&mut self, flag: DmaFlag) -> Result<(), HalError> {
        self.log.borrow_mut().enabled_interrupts.push(flag);
        Ok(())
    }
}

// ============================================================================
// Strip Helpers
// ============================================================================

pub const LEDS: usize = 8;
pub const ANIMATIONS: usize = 4;

pub type TestStrip = LedStrip<MockHarness, MockDma, LEDS, ANIMATIONS>;

/// Creates an initialized strip of `led_count` LEDs and its hardware log.
pub fn strip(led_count: usize) -> (TestStrip, SharedLog) {
    let log = new_log();
    let strip = TestStrip::new(
        MockHarness::new(&log),
        MockDma::new(&log),
        StripConfig::new(led_count),
    );
    strip.init().unwrap();
    (strip, log)
}

/// Raises the next DMA flag on `strip` as the hardware would.
pub fn fire_next(strip: &TestStrip, log: &SharedLog) {
    let flag = log.borrow_mut().next_flag();
    strip.on_dma_interrupt(flag);
}

/// Plays the DMA for one transfer: waits for the strip to arm the driver,
/// then raises flags until the transfer completes. Gives up after a bounded
/// number of polls so a broken strip fails the test instead of hanging it.
pub async fn pump_transfer(strip: &TestStrip, log: &SharedLog) -> bool {
    for _ in 0..1_000 {
        if strip.transfer_in_flight() {
            break;
        }
        yield_now().await;
    }

    for _ in 0..1_000 {
        if !strip.transfer_in_flight() {
            return true;
        }
        fire_next(strip, log);
        yield_now().await;
    }

    false
}

/// Raises flags until the in-flight transfer completes, without yielding.
pub fn drain_transfer(strip: &TestStrip, log: &SharedLog) {
    for _ in 0..1_000 {
        if !strip.transfer_in_flight() {
            return;
        }
        fire_next(strip, log);
    }
    panic!("transfer did not complete");
}

/// Builds a log of codewords for one LED in wire order.
pub fn encoded_led(color: Rgb) -> Vec<Codeword> {
    [color.green, color.red, color.blue]
        .iter()
        .flat_map(|byte| (0..8).map(move |bit| if byte & (0x80 >> bit) != 0 { HIGH } else { LOW }))
        .collect()
}
