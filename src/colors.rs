//! Pixel color types and helpers.
//!
//! Pixels are stored as 8-bit `Srgb<u8>` in red, green, blue order. HSV values
//! use the 8-bit hue wheel common to LED firmware: hue 0..=255 covers the full
//! circle, so `hue + step` wraps naturally.

use palette::{FromColor, Hsv as PaletteHsv, Srgb};

/// One pixel in storage order.
pub type Rgb = Srgb<u8>;

pub const BLACK: Rgb = Rgb::new(0, 0, 0);

/// Brightness value that leaves a color unchanged.
pub const MAX_BRIGHTNESS: u8 = u8::MAX;

/// An 8-bit HSV color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Hsv {
    pub hue: u8,
    pub saturation: u8,
    pub value: u8,
}

impl Hsv {
    pub const fn new(hue: u8, saturation: u8, value: u8) -> Self {
        Self {
            hue,
            saturation,
            value,
        }
    }

    pub fn to_rgb(self) -> Rgb {
        hsv(self.hue, self.saturation, self.value)
    }
}

/// Creates an RGB color from 8-bit HSV components.
#[inline]
pub fn hsv(hue: u8, saturation: u8, value: u8) -> Rgb {
    let hsv: PaletteHsv = PaletteHsv::new(
        f32::from(hue) * 360.0 / 256.0,
        f32::from(saturation) / 255.0,
        f32::from(value) / 255.0,
    );
    Srgb::<f32>::from_color(hsv).into_format::<u8>()
}

/// Scales one channel: `value * brightness / 255`.
#[inline]
pub fn scale_brightness(value: u8, brightness: u8) -> u8 {
    ((u16::from(value) * u16::from(brightness)) / u16::from(MAX_BRIGHTNESS)) as u8
}

/// Scales every channel of `color`.
pub fn scale_color(color: Rgb, brightness: u8) -> Rgb {
    Rgb::new(
        scale_brightness(color.red, brightness),
        scale_brightness(color.green, brightness),
        scale_brightness(color.blue, brightness),
    )
}

/// Frequently used colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NamedColor {
    Off,
    Red,
    Green,
    Blue,
    Yellow,
    Cyan,
    Magenta,
    White,
}

impl NamedColor {
    pub const fn rgb(self) -> Rgb {
        match self {
            NamedColor::Off => BLACK,
            NamedColor::Red => Rgb::new(255, 0, 0),
            NamedColor::Green => Rgb::new(0, 255, 0),
            NamedColor::Blue => Rgb::new(0, 0, 255),
            NamedColor::Yellow => Rgb::new(255, 255, 0),
            NamedColor::Cyan => Rgb::new(0, 255, 255),
            NamedColor::Magenta => Rgb::new(255, 0, 255),
            NamedColor::White => Rgb::new(255, 255, 255),
        }
    }

    /// Position of the color on the 8-bit hue wheel.
    pub const fn hsv(self) -> Hsv {
        match self {
            NamedColor::Off => Hsv::new(0, 0, 0),
            NamedColor::Red => Hsv::new(0, 255, 255),
            NamedColor::Green => Hsv::new(85, 255, 255),
            NamedColor::Blue => Hsv::new(171, 255, 255),
            NamedColor::Yellow => Hsv::new(43, 255, 255),
            NamedColor::Cyan => Hsv::new(128, 255, 255),
            NamedColor::Magenta => Hsv::new(213, 255, 255),
            NamedColor::White => Hsv::new(0, 0, 255),
        }
    }
}

impl From<NamedColor> for Rgb {
    fn from(color: NamedColor) -> Self {
        color.rgb()
    }
}
