//! Filter model and rendering for Rasterman.
//!
//! This crate is the rendering half of the image-filter panel:
//!
//! - **Filter model**: [`FilterKind`] with its explicit slot table,
//!   [`FilterValue`], [`Filter`] instances and the fixed-length
//!   [`FilterChain`]
//! - **Engine capability**: the [`RenderEngine`] trait, the three operations
//!   the pipeline consumes
//! - **Pipeline**: [`FilterPipeline`] applies an edit to whatever image the
//!   [`ImageBinding`] holds at invocation time
//! - **Software engine**: [`SoftwareEngine`] and [`FilteredImage`], a CPU
//!   implementation with PNG export
//!
//! # Example
//!
//! ```
//! use image::{Rgba, RgbaImage};
//! use rasterman_render::{
//!     Applied, CanvasConfig, FilterKind, FilterPipeline, FilterValue, FilteredImage,
//!     ImageBinding, SoftwareEngine,
//! };
//!
//! let binding = ImageBinding::new();
//! let engine = SoftwareEngine::new(CanvasConfig::default())?;
//! let pipeline = FilterPipeline::new(engine, binding.clone());
//!
//! binding.bind(FilteredImage::new(RgbaImage::from_pixel(8, 8, Rgba([40, 80, 120, 255]))));
//! let applied = pipeline.apply(FilterKind::Brightness, &FilterValue::Scalar(0.2))?;
//! assert_eq!(applied, Applied::Rendered);
//!
//! let png = binding.with_image(|image| image.export_png()).unwrap()?;
//! assert!(!png.is_empty());
//! # Ok::<(), rasterman_render::RenderError>(())
//! ```

mod color;
mod engine;
mod error;
mod filter;
pub mod ops;
mod pipeline;
mod software;

pub use color::Color;
pub use engine::RenderEngine;
pub use error::{FilterError, RenderError, RenderResult};
pub use filter::{Filter, FilterChain, FilterControl, FilterKind, FilterValue, SliderRange, SLOT_COUNT};
pub use pipeline::{Applied, FilterPipeline, ImageBinding};
pub use software::{CanvasConfig, FilteredImage, SoftwareEngine};
