//! The rendering-engine capability consumed by the filter pipeline.

use crate::error::RenderResult;
use crate::filter::Filter;

/// The three operations the pipeline needs from a rendering engine.
///
/// The engine decides how filters are stored on its images. The pipeline
/// only relies on one addressable slot per filter kind, in a fixed order.
pub trait RenderEngine: Send + 'static {
    /// The engine's image object.
    type Image: Send + Sync + 'static;

    /// Replace the filter at `slot` on `image`.
    fn set_filter_at_slot(
        &mut self,
        image: &mut Self::Image,
        slot: usize,
        filter: Filter,
    ) -> RenderResult<()>;

    /// Recompute `image`'s rendered output from its filter list.
    fn reapply_filters(&mut self, image: &mut Self::Image) -> RenderResult<()>;

    /// Redraw the canvas showing `image`.
    fn repaint(&mut self, image: &Self::Image) -> RenderResult<()>;
}
