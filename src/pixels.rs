//! Per-strip color storage.

use crate::colors::{BLACK, Rgb};
use heapless::Vec;

/// Errors from pixel buffer accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PixelError {
    /// The LED index is not below the strip length.
    OutOfBounds { index: usize, len: usize },
    /// `start > end`, or `end` is not below the strip length.
    InvalidSegment { start: usize, end: usize, len: usize },
    /// The requested length exceeds the buffer capacity.
    CapacityExceeded { requested: usize, capacity: usize },
}

impl core::fmt::Display for PixelError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PixelError::OutOfBounds { index, len } => {
                write!(f, "LED {} is out of range for a strip of {}", index, len)
            }
            PixelError::InvalidSegment { start, end, len } => {
                write!(f, "segment {}..={} is invalid for a strip of {}", start, end, len)
            }
            PixelError::CapacityExceeded {
                requested,
                capacity,
            } => {
                write!(f, "{} LEDs exceed the buffer capacity of {}", requested, capacity)
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PixelError {}

/// Colors for up to `N` LEDs, kept in storage (RGB) order.
///
/// The active length is fixed by [`resize`](Self::resize); all accessors are
/// bounds-checked against it.
#[derive(Debug, Clone)]
pub struct PixelBuffer<const N: usize> {
    pixels: Vec<Rgb, N>,
}

impl<const N: usize> Default for PixelBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> PixelBuffer<N> {
    pub const fn new() -> Self {
        Self { pixels: Vec::new() }
    }

    /// Sets the active length. Every LED is turned off.
    pub fn resize(&mut self, len: usize) -> Result<(), PixelError> {
        self.pixels.clear();
        self.pixels
            .resize(len, BLACK)
            .map_err(|_| PixelError::CapacityExceeded {
                requested: len,
                capacity: N,
            })
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Rgb> {
        self.pixels.get(index).copied()
    }

    pub fn set(&mut self, index: usize, color: Rgb) -> Result<(), PixelError> {
        let len = self.pixels.len();
        let pixel = self
            .pixels
            .get_mut(index)
            .ok_or(PixelError::OutOfBounds { index, len })?;
        *pixel = color;
        Ok(())
    }

    pub fn fill(&mut self, color: Rgb) {
        self.pixels.fill(color);
    }

    /// Sets LEDs `start..=end`.
    pub fn fill_segment(&mut self, start: usize, end: usize, color: Rgb) -> Result<(), PixelError> {
        let len = self.pixels.len();
        if start > end || end >= len {
            return Err(PixelError::InvalidSegment { start, end, len });
        }

        self.pixels[start..=end].fill(color);
        Ok(())
    }

    /// Turns every LED off.
    pub fn clear(&mut self) {
        self.fill(BLACK);
    }

    pub fn as_slice(&self) -> &[Rgb] {
        &self.pixels
    }
}
