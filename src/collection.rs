use crate::animation::Animation;
use crate::command::{StripAction, StripCommand, StripResponse};
use crate::hal::{DmaController, TimingHarness};
use crate::strip::{LedStrip, StripError, StripState};

/// An identifier for a strip within a collection.
///
/// A plain index wrapper. Users pick the ID when registering a strip and use
/// it to target that strip with descriptors and commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StripId(pub usize);

impl From<usize> for StripId {
    fn from(id: usize) -> Self {
        StripId(id)
    }
}

impl From<StripId> for usize {
    fn from(id: StripId) -> Self {
        id.0
    }
}

/// An animation addressed to a strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationDescriptor {
    pub strip: StripId,
    pub animation: Animation,
    /// 0 turns the animation's LEDs off, 255 leaves its colors unchanged.
    pub brightness: u8,
}

impl AnimationDescriptor {
    pub fn new(strip: StripId, animation: Animation, brightness: u8) -> Self {
        Self {
            strip,
            animation,
            brightness,
        }
    }
}

/// Errors that can occur during collection operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CollectionError {
    /// No strip is registered under this ID.
    InvalidStripId(StripId),

    /// A strip is already registered under this ID.
    DuplicateStripId(StripId),

    /// The ID exceeds the collection's capacity.
    StripIdOutOfBounds { id: StripId, capacity: usize },

    /// A strip operation failed.
    Strip(StripError),
}

impl core::fmt::Display for CollectionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CollectionError::InvalidStripId(id) => {
                write!(f, "strip ID {} does not exist in collection", id.0)
            }
            CollectionError::DuplicateStripId(id) => {
                write!(f, "strip ID {} already exists in collection", id.0)
            }
            CollectionError::StripIdOutOfBounds { id, capacity } => {
                write!(f, "strip ID {} exceeds collection capacity of {}", id.0, capacity)
            }
            CollectionError::Strip(err) => write!(f, "strip error: {}", err),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CollectionError {}

impl From<StripError> for CollectionError {
    fn from(err: StripError) -> Self {
        CollectionError::Strip(err)
    }
}

/// Registry of the strips on a board.
///
/// Strips are shared with their interrupt handlers and frame timer tasks, so
/// the collection only borrows them. All strips share one hardware type.
///
/// # Type Parameters
/// * `'a` - Lifetime of the registered strips (usually `'static`)
/// * `H`, `D` - Timer channel and DMA stream implementations
/// * `LEDS` - Pixel buffer capacity of each strip
/// * `ANIMATIONS` - Animation queue capacity of each strip
/// * `MAX_STRIPS` - Maximum number of strips this collection can hold
pub struct StripCollection<
    'a,
    H: TimingHarness,
    D: DmaController,
    const LEDS: usize,
    const ANIMATIONS: usize,
    const MAX_STRIPS: usize,
> {
    strips: [Option<&'a LedStrip<H, D, LEDS, ANIMATIONS>>; MAX_STRIPS],
}

impl<'a, H, D, const LEDS: usize, const ANIMATIONS: usize, const MAX_STRIPS: usize> Default
    for StripCollection<'a, H, D, LEDS, ANIMATIONS, MAX_STRIPS>
where
    H: TimingHarness,
    D: DmaController,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, H, D, const LEDS: usize, const ANIMATIONS: usize, const MAX_STRIPS: usize>
    StripCollection<'a, H, D, LEDS, ANIMATIONS, MAX_STRIPS>
where
    H: TimingHarness,
    D: DmaController,
{
    pub fn new() -> Self {
        Self {
            strips: [None; MAX_STRIPS],
        }
    }

    /// Registers `strip` under `id`.
    ///
    /// # Errors
    /// * `DuplicateStripId` - A strip with this ID already exists
    /// * `StripIdOutOfBounds` - The ID exceeds the collection's capacity
    pub fn add_strip(&mut self, id: StripId, strip: &'a LedStrip<H, D, LEDS, ANIMATIONS>) -> Result<(), CollectionError> {
        let idx = id.0;

        if idx >= MAX_STRIPS {
            return Err(CollectionError::StripIdOutOfBounds {
                id,
                capacity: MAX_STRIPS,
            });
        }

        if self.strips[idx].is_some() {
            return Err(CollectionError::DuplicateStripId(id));
        }

        self.strips[idx] = Some(strip);
        Ok(())
    }

    /// Looks up a registered strip.
    pub fn strip(&self, id: StripId) -> Result<&'a LedStrip<H, D, LEDS, ANIMATIONS>, CollectionError> {
        self.strips
            .get(id.0)
            .copied()
            .flatten()
            .ok_or(CollectionError::InvalidStripId(id))
    }

    /// Initializes every registered strip.
    ///
    /// All strips are attempted; the first failure is returned.
    pub fn init_all(&self) -> Result<(), CollectionError> {
        let mut result = Ok(());

        for strip in self.strips.iter().flatten() {
            if let Err(err) = strip.init() {
                error!("collection: strip init failed: {}", err);
                if result.is_ok() {
                    result = Err(CollectionError::Strip(err));
                }
            }
        }

        result
    }

    /// Routes a descriptor to its strip.
    pub fn add_animation(&self, descriptor: AnimationDescriptor) -> Result<(), CollectionError> {
        let strip = self.strip(descriptor.strip)?;
        Ok(strip.add_animation(descriptor.animation, descriptor.brightness)?)
    }

    pub fn clear_animations(&self, id: StripId) -> Result<(), CollectionError> {
        Ok(self.strip(id)?.clear_animations()?)
    }

    /// Routes a command to the specified strip.
    pub async fn handle_command(&self, command: StripCommand<StripId>) -> Result<StripResponse, CollectionError> {
        self.handle_action(command.strip_id, command.action).await
    }

    pub async fn handle_action(&self, id: StripId, action: StripAction) -> Result<StripResponse, CollectionError> {
        let strip = self.strip(id)?;
        Ok(strip.handle_action(action).await?)
    }

    /// Number of LEDs on the strip.
    pub fn led_count(&self, id: StripId) -> Result<usize, CollectionError> {
        Ok(self.strip(id)?.led_count())
    }

    pub fn get_state(&self, id: StripId) -> Result<StripState, CollectionError> {
        Ok(self.strip(id)?.state())
    }

    /// Returns the number of strips currently in the collection.
    pub fn len(&self) -> usize {
        self.strips.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: StripId) -> bool {
        self.strip(id).is_ok()
    }
}
