//! Hardware collaborators consumed by the driver.
//!
//! The bit-stream is produced by a timer channel in PWM mode whose compare
//! register is rewritten once per bit by a DMA stream. Neither peripheral is
//! configured here: board support code implements [`TimingHarness`] and
//! [`DmaController`] for its own timer and DMA stream, and routes the DMA
//! interrupt to [`LedStrip::on_dma_interrupt`](crate::LedStrip::on_dma_interrupt).

use crate::encoder::Codeword;

/// Interrupt sources of a DMA stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaFlag {
    /// The second half of the circular buffer has been read.
    TransferComplete,
    /// The first half of the circular buffer has been read.
    HalfTransfer,
    /// The stream hit a bus error and stopped.
    TransferError,
}

impl DmaFlag {
    /// Every flag the driver enables.
    pub const ALL: [DmaFlag; 3] = [
        DmaFlag::TransferComplete,
        DmaFlag::HalfTransfer,
        DmaFlag::TransferError,
    ];
}

/// Failure reported by a peripheral implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HalError {
    /// The timer channel refused the request.
    Channel,
    /// The DMA stream refused the request.
    Dma,
}

impl core::fmt::Display for HalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            HalError::Channel => write!(f, "timer channel rejected the request"),
            HalError::Dma => write!(f, "DMA stream rejected the request"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HalError {}

/// Timer peripheral driving the data line.
pub trait TimingHarness {
    /// Starts PWM output on the data channel.
    fn enable_channel(&mut self) -> Result<(), HalError>;

    /// Stops PWM output. The line idles low.
    fn disable_channel(&mut self);

    /// Address of the compare register the DMA stream writes to.
    fn compare_register_address(&self) -> usize;

    /// Timer ticks per bit period.
    fn resolution(&self) -> u32;
}

/// DMA stream feeding codewords into the compare register.
///
/// The stream runs in circular mode and raises [`DmaFlag::HalfTransfer`] and
/// [`DmaFlag::TransferComplete`] as each half of `source` is consumed.
pub trait DmaController {
    /// Points the stream at `source` and the peripheral register at `destination`.
    ///
    /// `source` must stay in place while the stream is enabled.
    fn configure(&mut self, source: &[Codeword], destination: usize) -> Result<(), HalError>;

    fn enable(&mut self) -> Result<(), HalError>;

    fn disable(&mut self);

    fn clear_flag(&mut self, flag: DmaFlag);

    fn clear_all_flags(&mut self) {
        for flag in DmaFlag::ALL {
            self.clear_flag(flag);
        }
    }

    fn enable_interrupt(&mut self, flag: DmaFlag) -> Result<(), HalError>;
}
