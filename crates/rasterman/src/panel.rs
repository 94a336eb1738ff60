//! The filter panel: one two-tier throttle per slider.
//!
//! Every filter kind gets its own input stream:
//!
//! ```text
//! input(kind, value) -> Debouncer -> FrameCoalescer -> FilterPipeline::apply
//! ```
//!
//! The debouncer absorbs the flood of events from a drag; the frame
//! coalescer makes sure at most one render per kind happens per frame.
//! Streams are independent, so a brightness edit never overwrites a pending
//! contrast edit.

use std::sync::Arc;

use parking_lot::Mutex;
use rasterman_core::logging::targets;
use rasterman_core::{DebounceConfig, Debouncer, FrameCoalescer, FrameService, TimerService};
use rasterman_render::{
    Applied, FilterKind, FilterPipeline, FilterValue, ImageBinding, RenderEngine, SLOT_COUNT,
};

use crate::error::Result;

/// The coalescers behind one slider.
struct SliderStream {
    debouncer: Debouncer<FilterValue>,
    frame: Arc<FrameCoalescer<FilterValue>>,
}

impl SliderStream {
    fn is_pending(&self) -> bool {
        self.debouncer.is_pending() || self.frame.is_scheduled()
    }

    fn cancel(&self) {
        self.debouncer.cancel();
        self.frame.cancel();
    }

    fn flush(&self) {
        self.debouncer.flush();
        self.frame.flush();
    }
}

/// A set of filter sliders driving a [`FilterPipeline`].
pub struct FilterPanel<E: RenderEngine> {
    pipeline: FilterPipeline<E>,
    streams: Vec<SliderStream>,
    values: Arc<Mutex<[FilterValue; SLOT_COUNT]>>,
}

impl<E: RenderEngine> FilterPanel<E> {
    /// Build one stream per filter kind on the given host services.
    pub fn new(
        pipeline: FilterPipeline<E>,
        timers: Arc<dyn TimerService>,
        frames: Arc<dyn FrameService>,
        debounce: DebounceConfig,
    ) -> Result<Self> {
        let streams = FilterKind::ALL
            .into_iter()
            .map(|kind| -> Result<SliderStream> {
                let target = pipeline.clone();
                let frame = Arc::new(FrameCoalescer::new(frames.clone(), move |value: FilterValue| {
                    match target.apply(kind, &value) {
                        Ok(Applied::Rendered) => {}
                        Ok(Applied::NoImage) => {
                            tracing::trace!(target: targets::PANEL, %kind, "edit dropped, no image");
                        }
                        Err(error) => {
                            tracing::warn!(
                                target: targets::PANEL,
                                %kind,
                                %value,
                                %error,
                                "filter edit rejected"
                            );
                        }
                    }
                }));

                let to_frame = frame.clone();
                let debouncer = Debouncer::new(timers.clone(), debounce, move |value: FilterValue| {
                    to_frame.submit(value)
                })?;
                Ok(SliderStream { debouncer, frame })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            pipeline,
            streams,
            values: Arc::new(Mutex::new(FilterKind::ALL.map(FilterKind::default_value))),
        })
    }

    /// Feed one input event from `kind`'s control.
    pub fn input(&self, kind: FilterKind, value: impl Into<FilterValue>) {
        let value = value.into();
        self.values.lock()[kind.slot()] = value.clone();
        self.streams[kind.slot()].debouncer.schedule(value);
    }

    /// Feed one input event addressed by filter identifier.
    pub fn input_named(&self, id: &str, value: impl Into<FilterValue>) -> Result<FilterKind> {
        let kind: FilterKind = id.parse()?;
        self.input(kind, value);
        Ok(kind)
    }

    /// Whether any edit is still waiting to be rendered.
    pub fn is_pending(&self) -> bool {
        self.streams.iter().any(SliderStream::is_pending)
    }

    /// Whether `kind`'s edit is still waiting to be rendered.
    pub fn is_kind_pending(&self, kind: FilterKind) -> bool {
        self.streams[kind.slot()].is_pending()
    }

    /// Drop every pending edit without rendering it.
    pub fn cancel_all(&self) {
        for stream in &self.streams {
            stream.cancel();
        }
    }

    /// Render every pending edit now.
    pub fn flush(&self) {
        for stream in &self.streams {
            stream.flush();
        }
    }

    /// Drop pending edits and return every control to its neutral value.
    pub fn reset(&self) {
        self.cancel_all();
        *self.values.lock() = FilterKind::ALL.map(FilterKind::default_value);
    }

    /// The last value fed to `kind`.
    pub fn value(&self, kind: FilterKind) -> FilterValue {
        self.values.lock()[kind.slot()].clone()
    }

    /// The last value fed to every control, in slot order.
    pub fn values(&self) -> Vec<(FilterKind, FilterValue)> {
        let values = self.values.lock();
        FilterKind::ALL
            .into_iter()
            .zip(values.iter().cloned())
            .collect()
    }

    /// The pipeline edits are rendered through.
    pub fn pipeline(&self) -> &FilterPipeline<E> {
        &self.pipeline
    }

    /// The image binding the pipeline reads.
    pub fn binding(&self) -> &ImageBinding<E::Image> {
        self.pipeline.binding()
    }
}

impl<E: RenderEngine> Drop for FilterPanel<E> {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

impl<E: RenderEngine> std::fmt::Debug for FilterPanel<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterPanel")
            .field("pending", &self.is_pending())
            .field("binding", self.binding())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use image::{Rgba, RgbaImage};
    use rasterman_core::SimulatedHost;
    use rasterman_render::{CanvasConfig, Filter, FilteredImage, SoftwareEngine};

    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn panel(host: &SimulatedHost) -> FilterPanel<SoftwareEngine> {
        let binding = ImageBinding::new();
        binding.bind(FilteredImage::new(RgbaImage::from_pixel(
            4,
            4,
            Rgba([100, 100, 100, 255]),
        )));
        let engine = SoftwareEngine::new(CanvasConfig::new(8, 8)).unwrap();
        FilterPanel::new(
            FilterPipeline::new(engine, binding),
            host.timers(),
            host.frames(),
            DebounceConfig::new(ms(80)),
        )
        .unwrap()
    }

    fn repaints(panel: &FilterPanel<SoftwareEngine>) -> u64 {
        panel.pipeline().with_engine(|engine| engine.repaint_count())
    }

    #[test]
    fn test_drag_renders_once_after_settling() {
        let host = SimulatedHost::new();
        let panel = panel(&host);

        for step in 0..8 {
            panel.input(FilterKind::Brightness, step as f32 * 0.05);
            host.advance(ms(10));
            host.run_frame();
        }
        assert_eq!(repaints(&panel), 0);
        assert!(panel.is_pending());

        host.advance(ms(80));
        assert!(panel.is_kind_pending(FilterKind::Brightness));
        host.run_frame();

        assert_eq!(repaints(&panel), 1);
        assert!(!panel.is_pending());
        panel.binding().with_image(|image| {
            assert_eq!(image.filter(FilterKind::Brightness), &Filter::Brightness(7.0 * 0.05));
        });
    }

    #[test]
    fn test_sliders_do_not_clobber_each_other() {
        let host = SimulatedHost::new();
        let panel = panel(&host);

        panel.input(FilterKind::Contrast, 0.4_f32);
        panel.input(FilterKind::Invert, true);
        host.advance(ms(100));
        host.run_frame();

        panel.binding().with_image(|image| {
            assert_eq!(image.filter(FilterKind::Contrast), &Filter::Contrast(0.4));
            assert_eq!(image.filter(FilterKind::Invert), &Filter::Invert);
        });
        assert_eq!(repaints(&panel), 2);
    }

    #[test]
    fn test_input_named() {
        let host = SimulatedHost::new();
        let panel = panel(&host);

        assert_eq!(panel.input_named("hue-rotation", 0.5_f32).unwrap(), FilterKind::HueRotation);
        assert!(matches!(
            panel.input_named("sharpen", 0.5_f32),
            Err(crate::PanelError::Filter(_))
        ));
        assert_eq!(panel.value(FilterKind::HueRotation), FilterValue::Scalar(0.5));
    }

    #[test]
    fn test_cancel_all_drops_edits() {
        let host = SimulatedHost::new();
        let panel = panel(&host);

        panel.input(FilterKind::Blur, 0.3_f32);
        panel.cancel_all();
        panel.cancel_all();
        assert!(!panel.is_pending());

        host.advance(ms(200));
        host.run_frame();
        assert_eq!(repaints(&panel), 0);
    }

    #[test]
    fn test_flush_renders_immediately() {
        let host = SimulatedHost::new();
        let panel = panel(&host);

        panel.input(FilterKind::Grayscale, true);
        panel.flush();
        assert!(!panel.is_pending());
        assert_eq!(repaints(&panel), 1);
        assert_eq!(host.timers().active_count(), 0);
        assert!(!host.frames().has_pending());
    }

    #[test]
    fn test_invalid_color_is_dropped() {
        let host = SimulatedHost::new();
        let panel = panel(&host);

        panel.input(FilterKind::Tint, "chartreuse-ish");
        panel.flush();
        assert_eq!(repaints(&panel), 0);
        panel.binding().with_image(|image| {
            assert_eq!(image.filter(FilterKind::Tint), &Filter::Identity);
        });
    }

    #[test]
    fn test_values_and_reset() {
        let host = SimulatedHost::new();
        let panel = panel(&host);

        panel.input(FilterKind::Pixelate, 6.0_f32);
        let values = panel.values();
        assert_eq!(values.len(), SLOT_COUNT);
        assert_eq!(values[FilterKind::Pixelate.slot()], (FilterKind::Pixelate, FilterValue::Scalar(6.0)));

        panel.reset();
        assert!(!panel.is_pending());
        assert_eq!(panel.value(FilterKind::Pixelate), FilterValue::Scalar(1.0));
    }

    #[test]
    fn test_drop_cancels_pending_work() {
        let host = SimulatedHost::new();
        let panel = panel(&host);

        panel.input(FilterKind::Saturation, -0.5_f32);
        drop(panel);
        assert_eq!(host.timers().active_count(), 0);
        assert!(!host.frames().has_pending());
    }
}
