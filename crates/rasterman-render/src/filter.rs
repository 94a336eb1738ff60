//! The filter model: kinds, the slot table, values and filter instances.
//!
//! Every filter kind owns exactly one slot in a fixed-length, fixed-order
//! [`FilterChain`]. Slots are only ever replaced. A toggle that is switched
//! off is replaced by [`Filter::Identity`], so the chain never shrinks and no
//! other slot moves.

use std::fmt;
use std::str::FromStr;

use image::RgbaImage;
use rasterman_core::logging::targets;

use crate::color::Color;
use crate::error::FilterError;
use crate::ops;

/// Number of slots in the filter table.
pub const SLOT_COUNT: usize = 9;

/// A filter the panel can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterKind {
    /// Additive brightness.
    Brightness,
    /// Contrast around mid-gray.
    Contrast,
    /// Saturation scaling.
    Saturation,
    /// Hue rotation, in half turns.
    HueRotation,
    /// Gaussian blur.
    Blur,
    /// Block pixelation.
    Pixelate,
    /// Multiplicative color tint.
    Tint,
    /// Grayscale toggle.
    Grayscale,
    /// Color inversion toggle.
    Invert,
}

impl FilterKind {
    /// Every kind, in slot order.
    pub const ALL: [FilterKind; SLOT_COUNT] = [
        FilterKind::Brightness,
        FilterKind::Contrast,
        FilterKind::Saturation,
        FilterKind::HueRotation,
        FilterKind::Blur,
        FilterKind::Pixelate,
        FilterKind::Tint,
        FilterKind::Grayscale,
        FilterKind::Invert,
    ];

    /// The slot this kind occupies in every [`FilterChain`].
    pub const fn slot(self) -> usize {
        match self {
            FilterKind::Brightness => 0,
            FilterKind::Contrast => 1,
            FilterKind::Saturation => 2,
            FilterKind::HueRotation => 3,
            FilterKind::Blur => 4,
            FilterKind::Pixelate => 5,
            FilterKind::Tint => 6,
            FilterKind::Grayscale => 7,
            FilterKind::Invert => 8,
        }
    }

    /// The identifier used by input events.
    pub const fn id(self) -> &'static str {
        match self {
            FilterKind::Brightness => "brightness",
            FilterKind::Contrast => "contrast",
            FilterKind::Saturation => "saturation",
            FilterKind::HueRotation => "hue-rotation",
            FilterKind::Blur => "blur",
            FilterKind::Pixelate => "pixelate",
            FilterKind::Tint => "tint",
            FilterKind::Grayscale => "grayscale",
            FilterKind::Invert => "invert",
        }
    }

    /// The input control that drives this kind.
    pub const fn control(self) -> FilterControl {
        match self {
            FilterKind::Brightness => FilterControl::Slider(SliderRange::new(-0.8, 0.8, 0.05, 0.0)),
            FilterKind::Contrast => FilterControl::Slider(SliderRange::new(-1.0, 1.0, 0.05, 0.0)),
            FilterKind::Saturation => FilterControl::Slider(SliderRange::new(-1.0, 1.0, 0.05, 0.0)),
            FilterKind::HueRotation => FilterControl::Slider(SliderRange::new(-1.0, 1.0, 0.01, 0.0)),
            FilterKind::Blur => FilterControl::Slider(SliderRange::new(0.0, 1.0, 0.01, 0.0)),
            FilterKind::Pixelate => FilterControl::Slider(SliderRange::new(1.0, 20.0, 1.0, 1.0)),
            FilterKind::Tint => FilterControl::Color,
            FilterKind::Grayscale | FilterKind::Invert => FilterControl::Toggle,
        }
    }

    /// The slider range, for slider-driven kinds.
    pub const fn range(self) -> Option<SliderRange> {
        match self.control() {
            FilterControl::Slider(range) => Some(range),
            FilterControl::Color | FilterControl::Toggle => None,
        }
    }

    /// Whether this kind is a binary toggle.
    pub const fn is_toggle(self) -> bool {
        matches!(self.control(), FilterControl::Toggle)
    }

    /// The value a freshly opened panel shows for this kind.
    pub fn default_value(self) -> FilterValue {
        match self.control() {
            FilterControl::Slider(range) => FilterValue::Scalar(range.default),
            FilterControl::Color => FilterValue::Color(Color::WHITE.to_string()),
            FilterControl::Toggle => FilterValue::Flag(false),
        }
    }
}

// The slot table and the slot mapping must agree.
const _: () = {
    let mut i = 0;
    while i < SLOT_COUNT {
        assert!(FilterKind::ALL[i].slot() == i);
        i += 1;
    }
};

impl FromStr for FilterKind {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterKind::ALL
            .into_iter()
            .find(|kind| kind.id() == s)
            .ok_or_else(|| FilterError::UnknownKind(s.to_string()))
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// How a filter kind is edited.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterControl {
    /// A numeric slider.
    Slider(SliderRange),
    /// A color picker.
    Color,
    /// An on/off switch.
    Toggle,
}

/// Bounds and step of a numeric slider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliderRange {
    /// Lowest accepted value.
    pub min: f32,
    /// Highest accepted value.
    pub max: f32,
    /// Slider increment.
    pub step: f32,
    /// Neutral value.
    pub default: f32,
}

impl SliderRange {
    /// Create a range.
    pub const fn new(min: f32, max: f32, step: f32, default: f32) -> Self {
        Self {
            min,
            max,
            step,
            default,
        }
    }

    /// Clamp `value` into the range. NaN maps to the default.
    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            self.default
        } else {
            value.clamp(self.min, self.max)
        }
    }
}

/// A raw parameter from an input control.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// A slider position.
    Scalar(f32),
    /// A color string such as `#ff8800`.
    Color(String),
    /// A toggle state.
    Flag(bool),
}

impl FilterValue {
    /// Whether the value switches a toggle filter on.
    pub fn is_truthy(&self) -> bool {
        match self {
            FilterValue::Scalar(v) => *v != 0.0 && !v.is_nan(),
            FilterValue::Color(c) => !c.is_empty(),
            FilterValue::Flag(b) => *b,
        }
    }

    fn shape(&self) -> &'static str {
        match self {
            FilterValue::Scalar(_) => "scalar",
            FilterValue::Color(_) => "color",
            FilterValue::Flag(_) => "flag",
        }
    }
}

impl From<f32> for FilterValue {
    fn from(v: f32) -> Self {
        FilterValue::Scalar(v)
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        FilterValue::Flag(v)
    }
}

impl From<&str> for FilterValue {
    fn from(v: &str) -> Self {
        FilterValue::Color(v.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(v: String) -> Self {
        FilterValue::Color(v)
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Scalar(v) => write!(f, "{v}"),
            FilterValue::Color(c) => f.write_str(c),
            FilterValue::Flag(b) => write!(f, "{b}"),
        }
    }
}

/// A filter instance occupying one slot.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// The neutral filter. Leaves pixels untouched.
    Identity,
    /// Add `value * 255` to each color channel.
    Brightness(f32),
    /// Contrast adjustment in `-1.0..=1.0`.
    Contrast(f32),
    /// Saturation adjustment in `-1.0..=1.0`; `-1.0` is fully desaturated.
    Saturation(f32),
    /// Hue rotation in half turns.
    HueRotation(f32),
    /// Blur amount in `0.0..=1.0`.
    Blur(f32),
    /// Block size in pixels.
    Pixelate(u32),
    /// Multiply by a color.
    Tint(Color),
    /// Luminance grayscale.
    Grayscale,
    /// Channel inversion.
    Invert,
}

impl Filter {
    /// Build the instance for `kind` from an input value.
    ///
    /// Slider values are clamped to the kind's range. Toggles produce the
    /// effect when the value is truthy and [`Filter::Identity`] otherwise.
    pub fn build(kind: FilterKind, value: &FilterValue) -> Result<Self, FilterError> {
        if kind.is_toggle() {
            if !value.is_truthy() {
                return Ok(Filter::Identity);
            }
            return Ok(match kind {
                FilterKind::Grayscale => Filter::Grayscale,
                _ => Filter::Invert,
            });
        }

        match (kind.control(), value) {
            (FilterControl::Color, FilterValue::Color(text)) => {
                Ok(Filter::Tint(Color::from_hex(text)?))
            }
            (FilterControl::Slider(range), FilterValue::Scalar(raw)) => {
                let v = range.clamp(*raw);
                Ok(match kind {
                    FilterKind::Brightness => Filter::Brightness(v),
                    FilterKind::Contrast => Filter::Contrast(v),
                    FilterKind::Saturation => Filter::Saturation(v),
                    FilterKind::HueRotation => Filter::HueRotation(v),
                    FilterKind::Blur => Filter::Blur(v),
                    _ => Filter::Pixelate(v.round() as u32),
                })
            }
            (control, value) => {
                tracing::debug!(
                    target: targets::FILTER,
                    %kind,
                    got = value.shape(),
                    "filter value has the wrong shape"
                );
                Err(FilterError::ValueMismatch {
                    kind,
                    expected: match control {
                        FilterControl::Slider(_) => "scalar",
                        FilterControl::Color => "color",
                        FilterControl::Toggle => "flag",
                    },
                })
            }
        }
    }

    /// Whether this instance leaves pixels unchanged.
    pub fn is_identity(&self) -> bool {
        match self {
            Filter::Identity => true,
            Filter::Brightness(v)
            | Filter::Contrast(v)
            | Filter::Saturation(v)
            | Filter::HueRotation(v)
            | Filter::Blur(v) => *v == 0.0,
            Filter::Pixelate(size) => *size <= 1,
            Filter::Tint(color) => *color == Color::WHITE,
            Filter::Grayscale | Filter::Invert => false,
        }
    }

    /// Apply this filter to an RGBA image.
    pub fn apply(&self, image: RgbaImage) -> RgbaImage {
        match *self {
            Filter::Identity => image,
            Filter::Brightness(v) => ops::brightness(image, v),
            Filter::Contrast(v) => ops::contrast(image, v),
            Filter::Saturation(v) => ops::saturation(image, v),
            Filter::HueRotation(v) => ops::hue_rotate(image, v * 180.0),
            Filter::Blur(v) => ops::blur(image, v),
            Filter::Pixelate(size) => ops::pixelate(image, size),
            Filter::Tint(color) => ops::tint(image, color),
            Filter::Grayscale => ops::grayscale(image),
            Filter::Invert => ops::invert(image),
        }
    }
}

impl Default for Filter {
    fn default() -> Self {
        Filter::Identity
    }
}

/// The ordered, fixed-length filter list attached to an image.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterChain {
    slots: [Filter; SLOT_COUNT],
}

impl FilterChain {
    /// A chain with every slot neutral.
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| Filter::Identity),
        }
    }

    /// Number of slots. Always [`SLOT_COUNT`].
    pub const fn len(&self) -> usize {
        SLOT_COUNT
    }

    /// Always `false`; the table has a fixed, non-zero length.
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// The filter in `slot`.
    pub fn get(&self, slot: usize) -> Option<&Filter> {
        self.slots.get(slot)
    }

    /// The filter in `kind`'s slot.
    pub fn filter(&self, kind: FilterKind) -> &Filter {
        &self.slots[kind.slot()]
    }

    /// Replace the filter in `slot`, returning the previous one.
    ///
    /// Returns `None` and leaves the chain untouched when `slot` is outside
    /// the table.
    pub fn replace(&mut self, slot: usize, filter: Filter) -> Option<Filter> {
        self.slots
            .get_mut(slot)
            .map(|current| std::mem::replace(current, filter))
    }

    /// Slots in order.
    pub fn iter(&self) -> impl Iterator<Item = &Filter> {
        self.slots.iter()
    }

    /// Whether every slot is neutral.
    pub fn is_identity(&self) -> bool {
        self.slots.iter().all(Filter::is_identity)
    }

    /// Run `source` through every non-neutral slot, in slot order.
    pub fn render(&self, source: &RgbaImage) -> RgbaImage {
        self.slots
            .iter()
            .filter(|filter| !filter.is_identity())
            .fold(source.clone(), |image, filter| filter.apply(image))
    }
}

impl Default for FilterChain {
    fn default() -> Self {
        Self::new()
    }
}
