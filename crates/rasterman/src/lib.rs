//! Rasterman: an image-filter panel for a host design editor.
//!
//! The host exports the selected image and hands it to the panel. Each
//! slider on the panel feeds its own two-tier throttle, a [`Debouncer`]
//! followed by a [`FrameCoalescer`], so dragging a slider costs one render
//! per settled value instead of one per input event. When the user is done,
//! the panel flushes pending edits and sends the filtered PNG back.
//!
//! # Example
//!
//! ```
//! use rasterman::{EditorSession, PanelConfig, PluginMessage};
//! use rasterman_core::SimulatedHost;
//! use rasterman_render::FilterKind;
//!
//! let host = SimulatedHost::new();
//! let mut session = EditorSession::new(PanelConfig::default(), host.timers(), host.frames())?;
//!
//! session.handle_json(r#"{"type":"theme","content":"dark"}"#)?;
//! assert_eq!(session.theme(), "dark");
//!
//! session.panel().input(FilterKind::Brightness, 0.25_f32);
//! assert!(session.panel().is_pending());
//!
//! // Nothing is selected, so there is nothing to hand back.
//! let mut outbox: Vec<PluginMessage> = Vec::new();
//! assert!(session.finish(&mut outbox).is_err());
//! # Ok::<(), rasterman::PanelError>(())
//! ```
//!
//! [`Debouncer`]: rasterman_core::Debouncer
//! [`FrameCoalescer`]: rasterman_core::FrameCoalescer

mod config;
mod error;
mod host;
mod panel;

pub use config::{CanvasSettings, DebounceSettings, PanelConfig};
pub use error::{PanelError, Result};
pub use host::{EditedImage, EditorSession, HostTransport, JsonLinesTransport, PluginMessage};
pub use panel::FilterPanel;

static_assertions::assert_impl_all!(FilterPanel<rasterman_render::SoftwareEngine>: Send, Sync);
static_assertions::assert_impl_all!(EditorSession: Send, Sync);
