//! CPU reference engine built on the `image` crate.
//!
//! A [`FilteredImage`] keeps the decoded source untouched and re-renders its
//! output from it on every [`reapply_filters`](RenderEngine::reapply_filters),
//! so filters never compound. [`SoftwareEngine`] owns the canvas surface the
//! bound image is painted onto.

use std::io::Cursor;

use image::{imageops, DynamicImage, ImageFormat, RgbaImage};
use rasterman_core::logging::targets;

use crate::color::Color;
use crate::engine::RenderEngine;
use crate::error::{RenderError, RenderResult};
use crate::filter::{Filter, FilterChain, FilterKind, SLOT_COUNT};

/// Canvas size and background.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasConfig {
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Fill behind the image.
    pub background: Color,
}

impl CanvasConfig {
    /// A canvas of the given size on the default background.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            background: Color::CANVAS_GRAY,
        }
    }

    /// Set the background.
    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self::new(300, 300)
    }
}

/// A decoded image with its filter list and rendered output.
#[derive(Clone)]
pub struct FilteredImage {
    source: RgbaImage,
    chain: FilterChain,
    output: RgbaImage,
}

impl FilteredImage {
    /// Wrap decoded pixels. Every slot starts neutral.
    pub fn new(source: RgbaImage) -> Self {
        Self {
            output: source.clone(),
            source,
            chain: FilterChain::new(),
        }
    }

    /// Decode an image from encoded bytes (PNG, JPEG, ...).
    pub fn from_bytes(bytes: &[u8]) -> RenderResult<Self> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|e| RenderError::ImageLoad(format!("Failed to decode image: {}", e)))?;
        Ok(Self::new(decoded.to_rgba8()))
    }

    /// The unfiltered source.
    pub fn source(&self) -> &RgbaImage {
        &self.source
    }

    /// The output of the last reapply.
    pub fn output(&self) -> &RgbaImage {
        &self.output
    }

    /// The filter list.
    pub fn chain(&self) -> &FilterChain {
        &self.chain
    }

    /// The filter in `kind`'s slot.
    pub fn filter(&self, kind: FilterKind) -> &Filter {
        self.chain.filter(kind)
    }

    /// Source dimensions.
    pub fn dimensions(&self) -> (u32, u32) {
        self.source.dimensions()
    }

    /// Encode the filtered output as PNG.
    pub fn export_png(&self) -> RenderResult<Vec<u8>> {
        encode_png(&self.output)
    }
}

impl std::fmt::Debug for FilteredImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilteredImage")
            .field("dimensions", &self.dimensions())
            .field("chain", &self.chain)
            .finish()
    }
}

/// The CPU rendering engine and its canvas.
pub struct SoftwareEngine {
    canvas: CanvasConfig,
    surface: RgbaImage,
    repaints: u64,
}

impl SoftwareEngine {
    /// Create an engine painting onto a canvas described by `canvas`.
    pub fn new(canvas: CanvasConfig) -> RenderResult<Self> {
        if canvas.width == 0 || canvas.height == 0 {
            return Err(RenderError::InvalidDimensions {
                width: canvas.width,
                height: canvas.height,
            });
        }
        Ok(Self {
            surface: RgbaImage::from_pixel(canvas.width, canvas.height, canvas.background.to_rgba()),
            canvas,
            repaints: 0,
        })
    }

    /// The canvas configuration.
    pub fn canvas(&self) -> &CanvasConfig {
        &self.canvas
    }

    /// The painted canvas.
    pub fn surface(&self) -> &RgbaImage {
        &self.surface
    }

    /// Number of repaints since creation.
    pub fn repaint_count(&self) -> u64 {
        self.repaints
    }

    /// Clear the canvas to its background.
    pub fn clear(&mut self) {
        let background = self.canvas.background.to_rgba();
        for pixel in self.surface.pixels_mut() {
            *pixel = background;
        }
    }

    /// Encode the painted canvas as PNG.
    pub fn export_surface_png(&self) -> RenderResult<Vec<u8>> {
        encode_png(&self.surface)
    }
}

impl std::fmt::Debug for SoftwareEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoftwareEngine")
            .field("canvas", &self.canvas)
            .field("repaints", &self.repaints)
            .finish()
    }
}

impl RenderEngine for SoftwareEngine {
    type Image = FilteredImage;

    fn set_filter_at_slot(
        &mut self,
        image: &mut FilteredImage,
        slot: usize,
        filter: Filter,
    ) -> RenderResult<()> {
        image
            .chain
            .replace(slot, filter)
            .map(|_| ())
            .ok_or(RenderError::SlotOutOfRange {
                slot,
                len: SLOT_COUNT,
            })
    }

    fn reapply_filters(&mut self, image: &mut FilteredImage) -> RenderResult<()> {
        let _span = rasterman_core::PerfSpan::new("reapply_filters");
        image.output = image.chain.render(&image.source);
        Ok(())
    }

    fn repaint(&mut self, image: &FilteredImage) -> RenderResult<()> {
        self.clear();

        let (width, height) = image.output.dimensions();
        if width > 0 && height > 0 {
            let scale = (self.canvas.width as f32 / width as f32)
                .min(self.canvas.height as f32 / height as f32);
            let fit_w = ((width as f32 * scale).round() as u32).clamp(1, self.canvas.width);
            let fit_h = ((height as f32 * scale).round() as u32).clamp(1, self.canvas.height);

            let fitted = if (fit_w, fit_h) == (width, height) {
                image.output.clone()
            } else {
                imageops::resize(&image.output, fit_w, fit_h, imageops::FilterType::Triangle)
            };

            let x = (self.canvas.width - fit_w) / 2;
            let y = (self.canvas.height - fit_h) / 2;
            imageops::overlay(&mut self.surface, &fitted, x as i64, y as i64);
        }

        self.repaints += 1;
        tracing::trace!(
            target: targets::ENGINE,
            repaints = self.repaints,
            "canvas repainted"
        );
        Ok(())
    }
}

fn encode_png(pixels: &RgbaImage) -> RenderResult<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(pixels.clone())
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| RenderError::ImageEncode(format!("Failed to encode PNG: {}", e)))?;
    Ok(buffer.into_inner())
}

static_assertions::assert_impl_all!(SoftwareEngine: Send, Sync);
static_assertions::assert_impl_all!(FilteredImage: Send, Sync);
