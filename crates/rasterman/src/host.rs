//! Host protocol and the editor session.
//!
//! The host editor and the panel exchange JSON messages tagged by `type`:
//!
//! ```json
//! {"type": "theme", "content": "dark"}
//! {"type": "changing-selection-start"}
//! {"type": "selection", "data": "iVBORw0KGgo..."}
//! {"type": "changing-selection-end"}
//! {"type": "edited-image", "data": {"image": "iVBORw0KGgo...", "width": 120, "height": 85}}
//! {"type": "image-success"}
//! ```
//!
//! Image payloads are PNG bytes. They are written as base64 strings and read
//! from either a base64 string or an array of byte values.

use std::io::Write;
use std::sync::Arc;

use rasterman_core::logging::targets;
use rasterman_core::{EventLoop, FrameService, TimerService};
use rasterman_render::{FilterPipeline, FilteredImage, ImageBinding, SoftwareEngine};
use serde::{Deserialize, Serialize};

use crate::config::PanelConfig;
use crate::error::{PanelError, Result};
use crate::panel::FilterPanel;

/// A message between the host editor and the panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PluginMessage {
    /// Host -> panel: the host's theme changed.
    Theme { content: String },
    /// Host -> panel: the selection is being exported.
    ChangingSelectionStart,
    /// Host -> panel: the exported selection as PNG bytes.
    Selection {
        #[serde(with = "image_bytes")]
        data: Vec<u8>,
    },
    /// Host -> panel: the selection holds no image.
    ChangingSelectionEnd,
    /// Panel -> host: the filtered image to place on the canvas.
    EditedImage { data: EditedImage },
    /// Host -> panel: the edited image was uploaded.
    ImageSuccess,
}

impl PluginMessage {
    /// Parse a message from JSON.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize the message to JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// The protocol name of this message.
    pub fn kind(&self) -> &'static str {
        match self {
            PluginMessage::Theme { .. } => "theme",
            PluginMessage::ChangingSelectionStart => "changing-selection-start",
            PluginMessage::Selection { .. } => "selection",
            PluginMessage::ChangingSelectionEnd => "changing-selection-end",
            PluginMessage::EditedImage { .. } => "edited-image",
            PluginMessage::ImageSuccess => "image-success",
        }
    }
}

/// The filtered image handed back to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditedImage {
    /// PNG bytes.
    #[serde(with = "image_bytes")]
    pub image: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

mod image_bytes {
    use std::fmt;

    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::de::{self, SeqAccess, Visitor};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        deserializer.deserialize_any(BytesVisitor)
    }

    struct BytesVisitor;

    impl<'de> Visitor<'de> for BytesVisitor {
        type Value = Vec<u8>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a base64 string or an array of bytes")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Vec<u8>, E> {
            // Data URLs carry a prefix up to the first comma.
            let payload = v.split_once(',').map_or(v, |(_, data)| data);
            STANDARD.decode(payload.trim()).map_err(E::custom)
        }

        fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Vec<u8>, E> {
            Ok(v.to_vec())
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Vec<u8>, A::Error> {
            let mut bytes = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(byte) = seq.next_element::<u8>()? {
                bytes.push(byte);
            }
            Ok(bytes)
        }
    }
}

/// The outbound side of the host channel.
pub trait HostTransport {
    /// Deliver one message to the host.
    fn send(&mut self, message: PluginMessage) -> Result<()>;
}

impl HostTransport for Vec<PluginMessage> {
    fn send(&mut self, message: PluginMessage) -> Result<()> {
        self.push(message);
        Ok(())
    }
}

/// Writes each message as one line of JSON.
#[derive(Debug)]
pub struct JsonLinesTransport<W> {
    writer: W,
}

impl<W: Write> JsonLinesTransport<W> {
    /// Wrap a writer.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Unwrap the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> HostTransport for JsonLinesTransport<W> {
    fn send(&mut self, message: PluginMessage) -> Result<()> {
        serde_json::to_writer(&mut self.writer, &message)?;
        self.writer
            .write_all(b"\n")
            .and_then(|()| self.writer.flush())
            .map_err(|e| PanelError::Transport(e.to_string()))
    }
}

/// One editing session: the panel plus the host conversation around it.
///
/// The session reacts to host messages by binding and unbinding the
/// selected image, and hands the filtered result back with
/// [`finish`](Self::finish).
pub struct EditorSession {
    config: PanelConfig,
    panel: FilterPanel<SoftwareEngine>,
    theme: String,
    loading: bool,
}

impl EditorSession {
    /// Build a session on the given host services.
    pub fn new(
        config: PanelConfig,
        timers: Arc<dyn TimerService>,
        frames: Arc<dyn FrameService>,
    ) -> Result<Self> {
        config.validate()?;
        let engine = SoftwareEngine::new(config.canvas.to_canvas_config()?)?;
        let pipeline = FilterPipeline::new(engine, ImageBinding::new());
        let panel = FilterPanel::new(
            pipeline,
            timers,
            frames,
            config.debounce.to_debounce_config(),
        )?;
        tracing::debug!(target: targets::HOST, ?config, "editor session created");
        Ok(Self {
            config,
            panel,
            theme: String::from("light"),
            loading: false,
        })
    }

    /// Build a session driven by a real-time event loop.
    pub fn on_event_loop(config: PanelConfig, event_loop: &EventLoop) -> Result<Self> {
        Self::new(config, event_loop.timers(), event_loop.frames())
    }

    /// React to one host message.
    pub fn handle_message(&mut self, message: PluginMessage) -> Result<()> {
        tracing::trace!(target: targets::HOST, kind = message.kind(), "host message");
        match message {
            PluginMessage::Theme { content } => {
                self.theme = content;
            }
            PluginMessage::ChangingSelectionStart => {
                self.loading = true;
            }
            PluginMessage::Selection { data } => {
                self.loading = false;
                self.panel.reset();
                let image = match FilteredImage::from_bytes(&data) {
                    Ok(image) => image,
                    Err(error) => {
                        self.clear_image();
                        return Err(error.into());
                    }
                };
                let (width, height) = image.dimensions();
                self.binding().bind(image);
                self.panel.pipeline().repaint()?;
                tracing::debug!(target: targets::HOST, width, height, "selection bound");
            }
            PluginMessage::ChangingSelectionEnd => {
                self.loading = false;
                self.panel.reset();
                self.clear_image();
            }
            PluginMessage::ImageSuccess => {
                tracing::info!(target: targets::HOST, "host accepted the edited image");
            }
            PluginMessage::EditedImage { .. } => {
                tracing::warn!(target: targets::HOST, "ignoring panel-bound edited-image message");
            }
        }
        Ok(())
    }

    /// Parse and react to one JSON host message.
    pub fn handle_json(&mut self, text: &str) -> Result<()> {
        self.handle_message(PluginMessage::from_json(text)?)
    }

    /// Render pending edits, export the result and send it to the host.
    pub fn finish(&self, transport: &mut dyn HostTransport) -> Result<EditedImage> {
        self.panel.flush();
        let edited = self
            .binding()
            .with_image(|image| {
                let (width, height) = image.dimensions();
                image.export_png().map(|png| EditedImage {
                    image: png,
                    width,
                    height,
                })
            })
            .ok_or(PanelError::NoImage)??;

        transport.send(PluginMessage::EditedImage {
            data: edited.clone(),
        })?;
        tracing::debug!(
            target: targets::HOST,
            width = edited.width,
            height = edited.height,
            bytes = edited.image.len(),
            "edited image sent"
        );
        Ok(edited)
    }

    /// The configuration the session was built from.
    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    /// The host's current theme.
    pub fn theme(&self) -> &str {
        &self.theme
    }

    /// Whether the host is exporting a new selection.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// The filter panel.
    pub fn panel(&self) -> &FilterPanel<SoftwareEngine> {
        &self.panel
    }

    fn binding(&self) -> &ImageBinding<FilteredImage> {
        self.panel.binding()
    }

    fn clear_image(&self) {
        self.binding().unbind();
        self.panel.pipeline().with_engine(SoftwareEngine::clear);
    }
}

impl std::fmt::Debug for EditorSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditorSession")
            .field("theme", &self.theme)
            .field("loading", &self.loading)
            .field("panel", &self.panel)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_tags() {
        let json = PluginMessage::ChangingSelectionStart.to_json().unwrap();
        assert_eq!(json, r#"{"type":"changing-selection-start"}"#);

        let theme = PluginMessage::from_json(r#"{"type":"theme","content":"dark"}"#).unwrap();
        assert_eq!(theme, PluginMessage::Theme { content: "dark".into() });
        assert_eq!(theme.kind(), "theme");
    }

    #[test]
    fn test_selection_accepts_base64_and_byte_arrays() {
        let from_b64 = PluginMessage::from_json(r#"{"type":"selection","data":"AQID"}"#).unwrap();
        let from_array = PluginMessage::from_json(r#"{"type":"selection","data":[1,2,3]}"#).unwrap();
        let from_url = PluginMessage::from_json(
            r#"{"type":"selection","data":"data:image/png;base64, AQID"}"#,
        )
        .unwrap();

        let expected = PluginMessage::Selection { data: vec![1, 2, 3] };
        assert_eq!(from_b64, expected);
        assert_eq!(from_array, expected);
        assert_eq!(from_url, expected);
    }

    #[test]
    fn test_edited_image_wire_shape() {
        let message = PluginMessage::EditedImage {
            data: EditedImage {
                image: vec![0xff, 0x00],
                width: 2,
                height: 1,
            },
        };
        let value: serde_json::Value = serde_json::from_str(&message.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "edited-image");
        assert_eq!(value["data"]["image"], "/wA=");
        assert_eq!(value["data"]["width"], 2);
        assert_eq!(value["data"]["height"], 1);
    }

    #[test]
    fn test_malformed_message() {
        assert!(matches!(
            PluginMessage::from_json(r#"{"type":"resize"}"#),
            Err(PanelError::Message(_))
        ));
        assert!(matches!(
            PluginMessage::from_json(r#"{"type":"selection","data":"***"}"#),
            Err(PanelError::Message(_))
        ));
    }

    #[test]
    fn test_json_lines_transport() {
        let mut transport = JsonLinesTransport::new(Vec::new());
        transport.send(PluginMessage::ImageSuccess).unwrap();
        transport
            .send(PluginMessage::Theme { content: "light".into() })
            .unwrap();

        let text = String::from_utf8(transport.into_inner()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines, [
            r#"{"type":"image-success"}"#,
            r#"{"type":"theme","content":"light"}"#,
        ]);
    }
}
