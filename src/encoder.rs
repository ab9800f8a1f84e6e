//! Bit-level encoding of pixel data into PWM compare values.
//!
//! Every transmitted bit is one [`Codeword`]: the number of timer ticks the
//! line stays high within one bit period. A `1` bit holds the line high for
//! roughly 850 ns of the 1250 ns period, a `0` bit for roughly 400 ns. A
//! codeword of zero keeps the line low for the whole period and is used as
//! filler and for the latch gap.

use crate::colors::Rgb;

/// Compare value for a single serial bit.
pub type Codeword = u32;

pub const BITS_PER_BYTE: usize = 8;
pub const CHANNELS_PER_LED: usize = 3;
pub const BITS_PER_LED: usize = CHANNELS_PER_LED * BITS_PER_BYTE;

/// LEDs encoded into each half of the double buffer.
pub const LEDS_PER_HALF: usize = 2;
pub const HALF_BUFFER_LEN: usize = LEDS_PER_HALF * BITS_PER_LED;
pub const BUFFER_LEN: usize = 2 * HALF_BUFFER_LEN;

/// LED periods of low line that commit a frame.
pub const LATCH_LED_TRANSFERS: usize = 2;

pub const BIT_PERIOD_NS: u32 = 1250;
pub const HIGH_TIME_NS: u32 = 850;
pub const LOW_TIME_NS: u32 = 400;

/// Smallest timer resolution that yields a nonzero `0` pulse.
pub const MIN_RESOLUTION: u32 = BIT_PERIOD_NS.div_ceil(LOW_TIME_NS);

/// High and low compare values for one timer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitTiming {
    pub high: Codeword,
    pub low: Codeword,
}

impl BitTiming {
    /// Derives the compare values from the timer's ticks per bit period.
    ///
    /// Returns `None` when the resolution is too coarse to tell the two pulse
    /// widths apart from an idle line.
    pub fn from_resolution(resolution: u32) -> Option<Self> {
        if resolution < MIN_RESOLUTION {
            return None;
        }

        let scale = |ns: u32| (u64::from(resolution) * u64::from(ns) / u64::from(BIT_PERIOD_NS)) as Codeword;
        let timing = Self {
            high: scale(HIGH_TIME_NS),
            low: scale(LOW_TIME_NS),
        };

        (timing.low > 0 && timing.high > timing.low && timing.high <= resolution).then_some(timing)
    }

    #[inline]
    pub fn codeword(&self, bit: bool) -> Codeword {
        if bit { self.high } else { self.low }
    }
}

/// Writes the 8 codewords of `byte`, most significant bit first.
pub fn encode_byte(byte: u8, timing: &BitTiming, out: &mut [Codeword]) {
    for (bit, slot) in out.iter_mut().take(BITS_PER_BYTE).enumerate() {
        *slot = timing.codeword(byte & (0x80 >> bit) != 0);
    }
}

/// Channel bytes in transmission order: green, red, blue.
#[inline]
pub fn wire_order(color: Rgb) -> [u8; CHANNELS_PER_LED] {
    [color.green, color.red, color.blue]
}

/// Writes the 24 codewords of one LED in wire order.
pub fn encode_led(color: Rgb, timing: &BitTiming, out: &mut [Codeword]) {
    for (byte, chunk) in wire_order(color).into_iter().zip(out.chunks_mut(BITS_PER_BYTE)) {
        encode_byte(byte, timing, chunk);
    }
}

/// Shortest frame period in milliseconds that fits one full transmission
/// of `led_count` LEDs plus the latch gap. Never less than 1.
pub fn min_refresh_period_ms(led_count: usize) -> u32 {
    let bits = (led_count as u64 + LATCH_LED_TRANSFERS as u64) * BITS_PER_LED as u64;
    let nanos = bits * u64::from(BIT_PERIOD_NS);
    nanos.div_ceil(1_000_000).max(1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMING: BitTiming = BitTiming { high: 68, low: 32 };

    #[test]
    fn timing_scales_with_resolution() {
        let timing = BitTiming::from_resolution(100).unwrap();
        assert_eq!(timing, BitTiming { high: 68, low: 32 });

        let timing = BitTiming::from_resolution(105).unwrap();
        assert_eq!(timing.high, 71);
        assert_eq!(timing.low, 33);
    }

    #[test]
    fn timing_rejects_coarse_resolution() {
        assert!(BitTiming::from_resolution(0).is_none());
        assert!(BitTiming::from_resolution(3).is_none());
        assert!(BitTiming::from_resolution(MIN_RESOLUTION).is_some());
    }

    #[test]
    fn byte_is_encoded_msb_first() {
        let mut out = [0; BITS_PER_BYTE];
        encode_byte(0b1011_0000, &TIMING, &mut out);
        assert_eq!(out, [68, 32, 68, 68, 32, 32, 32, 32]);
    }

    #[test]
    fn led_is_encoded_green_red_blue() {
        let mut out = [0; BITS_PER_LED];
        encode_led(Rgb::new(0x00, 0xFF, 0x01), &TIMING, &mut out);

        assert!(out[..8].iter().all(|&c| c == TIMING.high));
        assert!(out[8..16].iter().all(|&c| c == TIMING.low));
        assert!(out[16..23].iter().all(|&c| c == TIMING.low));
        assert_eq!(out[23], TIMING.high);
    }

    #[test]
    fn refresh_period_covers_frame_and_latch() {
        // 30 us per LED, 62 LEDs incl. latch -> 1.86 ms
        assert_eq!(min_refresh_period_ms(60), 2);
        assert_eq!(min_refresh_period_ms(1), 1);
        assert_eq!(min_refresh_period_ms(0), 1);
        // 1002 * 30 us = 30.06 ms
        assert_eq!(min_refresh_period_ms(1000), 31);
    }
}
