#![cfg_attr(not(feature = "std"), no_std)]
#![doc = include_str!("../README.md")]

//! # Core Concepts
//!
//! - **`LedStrip`**: One strip: pixel buffer, animation queue, frame timer, and DMA driver
//! - **`Ws2812Driver`**: Double-buffered DMA state machine that streams the bit codewords
//! - **`TimingHarness`** / **`DmaController`**: Traits to implement for your timer and DMA stream
//! - **`Animation`**: Solid color, segment fill, or rainbow, applied with a brightness
//! - **`StripConfig`**: LED count, refresh period and completion timeout
//! - **`StripCollection`**: Registry routing descriptors and commands to strips by `StripId`
//!
//! Pixels are stored as `Srgb<u8>` in red, green, blue order and reordered to
//! green, red, blue only when encoded for the wire.

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub use palette::Srgb;

pub mod animation;
pub mod collection;
pub mod colors;
pub mod command;
pub mod config;
pub mod driver;
pub mod encoder;
pub mod hal;
pub mod pixels;
pub mod strip;

pub use animation::{Animation, AnimationError, AnimationQueue, Direction, DynamicAnimation, Rainbow, RainbowParams, SegmentFill};
pub use collection::{AnimationDescriptor, CollectionError, StripCollection, StripId};
pub use colors::{BLACK, Hsv, NamedColor, Rgb};
pub use command::{StripAction, StripCommand, StripResponse};
pub use config::{ConfigError, DEFAULT_FLAG_TIMEOUT, DEFAULT_REFRESH_PERIOD, StripConfig};
pub use driver::{DriverError, DriverState, TransferEvent, Ws2812Driver};
pub use encoder::{BitTiming, Codeword};
pub use hal::{DmaController, DmaFlag, HalError, TimingHarness};
pub use pixels::{PixelBuffer, PixelError};
pub use strip::{FrameTick, LedStrip, StripError, StripState};
