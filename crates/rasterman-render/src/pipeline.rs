//! The Filter Application Pipeline.
//!
//! [`FilterPipeline::apply`] is what the panel's frame coalescers call. It
//! reads the [`ImageBinding`] at invocation time, so an image swapped or
//! unbound between scheduling and firing is handled on current state: with
//! no image bound the call does nothing.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rasterman_core::logging::targets;

use crate::engine::RenderEngine;
use crate::error::RenderResult;
use crate::filter::{Filter, FilterKind, FilterValue};

/// The currently active image, or none.
///
/// Clones share the same binding.
pub struct ImageBinding<I> {
    current: Arc<RwLock<Option<I>>>,
}

impl<I> ImageBinding<I> {
    /// An empty binding.
    pub fn new() -> Self {
        Self {
            current: Arc::new(RwLock::new(None)),
        }
    }

    /// Bind `image`, returning the previously bound one.
    pub fn bind(&self, image: I) -> Option<I> {
        self.current.write().replace(image)
    }

    /// Unbind the current image and return it.
    pub fn unbind(&self) -> Option<I> {
        self.current.write().take()
    }

    /// Whether an image is bound.
    pub fn is_bound(&self) -> bool {
        self.current.read().is_some()
    }

    /// Run `f` on the bound image.
    pub fn with_image<R>(&self, f: impl FnOnce(&I) -> R) -> Option<R> {
        self.current.read().as_ref().map(f)
    }

    /// Run `f` on the bound image, mutably.
    pub fn with_image_mut<R>(&self, f: impl FnOnce(&mut I) -> R) -> Option<R> {
        self.current.write().as_mut().map(f)
    }
}

impl<I> Clone for ImageBinding<I> {
    fn clone(&self) -> Self {
        Self {
            current: self.current.clone(),
        }
    }
}

impl<I> Default for ImageBinding<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I> std::fmt::Debug for ImageBinding<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageBinding")
            .field("bound", &self.is_bound())
            .finish()
    }
}

/// Outcome of [`FilterPipeline::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The filter was applied and the canvas repainted.
    Rendered,
    /// No image was bound; nothing happened.
    NoImage,
}

/// Applies filter edits to the bound image through a [`RenderEngine`].
///
/// Clones share the engine and the binding.
pub struct FilterPipeline<E: RenderEngine> {
    engine: Arc<Mutex<E>>,
    binding: ImageBinding<E::Image>,
}

impl<E: RenderEngine> FilterPipeline<E> {
    /// Create a pipeline over `engine` and `binding`.
    pub fn new(engine: E, binding: ImageBinding<E::Image>) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            binding,
        }
    }

    /// The image binding.
    pub fn binding(&self) -> &ImageBinding<E::Image> {
        &self.binding
    }

    /// Run `f` with the engine locked.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut E) -> R) -> R {
        f(&mut self.engine.lock())
    }

    /// Replace `kind`'s slot on the bound image with a filter built from
    /// `value`, reapply the filter list and repaint.
    ///
    /// A no-op returning [`Applied::NoImage`] when nothing is bound.
    pub fn apply(&self, kind: FilterKind, value: &FilterValue) -> RenderResult<Applied> {
        let mut current = self.binding.current.write();
        let Some(image) = current.as_mut() else {
            tracing::trace!(
                target: targets::PIPELINE,
                %kind,
                "no image bound; dropping filter edit"
            );
            return Ok(Applied::NoImage);
        };

        let filter = Filter::build(kind, value)?;
        tracing::debug!(
            target: targets::PIPELINE,
            %kind,
            slot = kind.slot(),
            ?filter,
            "applying filter"
        );

        let _span = rasterman_core::PerfSpan::new("apply_filter");
        let mut engine = self.engine.lock();
        engine.set_filter_at_slot(image, kind.slot(), filter)?;
        engine.reapply_filters(image)?;
        engine.repaint(image)?;
        Ok(Applied::Rendered)
    }

    /// Repaint the bound image without changing its filters.
    pub fn repaint(&self) -> RenderResult<Applied> {
        let current = self.binding.current.read();
        match current.as_ref() {
            Some(image) => {
                self.engine.lock().repaint(image)?;
                Ok(Applied::Rendered)
            }
            None => Ok(Applied::NoImage),
        }
    }
}

impl<E: RenderEngine> Clone for FilterPipeline<E> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            binding: self.binding.clone(),
        }
    }
}

impl<E: RenderEngine> std::fmt::Debug for FilterPipeline<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterPipeline")
            .field("binding", &self.binding)
            .finish_non_exhaustive()
    }
}
