// SPDX-License-Identifier: GPL-3.0-only

//! Scanner screen state
//!
//! The screen owns every view (preview, highlight, status label, top bar) and
//! the confirmation modal. It is mutated only from the event loop that drains
//! the session's channels, so nothing here is shared or locked.

use crate::app::confirm::{ConfirmationPrompt, DecodedUrl, UrlOpener};
use crate::app::detection::{self, HighlightUpdate};
use crate::app::frame_processor::{DetectedSymbol, SupportedCodeTypes};
use crate::app::highlight::HighlightView;
use crate::app::preview::{PreviewLayer, ScreenRect, VideoGravity};
use crate::backends::camera::types::CameraFrame;
use crate::constants::{APP_TITLE, NO_CODE_DETECTED};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Views stacked on the screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Preview,
    Highlight,
    MessageLabel,
    TopBar,
}

/// Back-to-front drawing order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewStack(Vec<Layer>);

impl Default for ViewStack {
    fn default() -> Self {
        Self(vec![
            Layer::Preview,
            Layer::Highlight,
            Layer::MessageLabel,
            Layer::TopBar,
        ])
    }
}

impl ViewStack {
    /// Move a layer to the top of the stack
    pub fn bring_to_front(&mut self, layer: Layer) {
        self.0.retain(|l| *l != layer);
        self.0.push(layer);
    }

    pub fn front(&self) -> Option<Layer> {
        self.0.last().copied()
    }

    /// Layers from back to front
    pub fn iter(&self) -> impl Iterator<Item = Layer> + '_ {
        self.0.iter().copied()
    }
}

/// The scanner screen
pub struct ScannerScreen {
    preview: PreviewLayer,
    highlight: HighlightView,
    message_label: String,
    top_bar: String,
    supported: Arc<SupportedCodeTypes>,
    opener: Arc<dyn UrlOpener>,
    modal: Option<ConfirmationPrompt>,
    views: ViewStack,
}

impl ScannerScreen {
    /// Load the screen
    ///
    /// The status label and top bar start above the preview and highlight.
    pub fn new(
        supported: Arc<SupportedCodeTypes>,
        opener: Arc<dyn UrlOpener>,
        gravity: VideoGravity,
        mirrored: bool,
    ) -> Self {
        let mut views = ViewStack::default();
        views.bring_to_front(Layer::MessageLabel);
        views.bring_to_front(Layer::TopBar);

        Self {
            preview: PreviewLayer::new(gravity, mirrored),
            highlight: HighlightView::new(),
            message_label: NO_CODE_DETECTED.to_string(),
            top_bar: APP_TITLE.to_string(),
            supported,
            opener,
            modal: None,
            views,
        }
    }

    /// Size the preview surface to the screen
    pub fn resize(&mut self, width: f32, height: f32) {
        self.preview
            .set_bounds(ScreenRect::new(0.0, 0.0, width, height));
    }

    pub fn update_frame(&mut self, frame: CameraFrame) {
        self.preview.update_frame(frame);
    }

    /// Handle one frame's detections
    pub fn metadata_output(&mut self, symbols: &[DetectedSymbol]) {
        let outcome = detection::evaluate(
            symbols,
            &self.supported,
            &self.preview,
            self.opener.as_ref(),
        );

        if let Some(status) = outcome.status {
            self.message_label = status;
        }

        match outcome.highlight {
            HighlightUpdate::Clear => self.highlight.clear(),
            HighlightUpdate::Move(rect) => {
                self.highlight.set_frame(rect);
                self.views.bring_to_front(Layer::Highlight);
            }
            HighlightUpdate::Unchanged => {}
        }

        if let Some(decoded) = outcome.url_to_confirm {
            self.launch_app(decoded);
        }
    }

    /// Ask the user before opening a URL
    ///
    /// Does nothing while a prompt is already presented.
    pub fn launch_app(&mut self, decoded: DecodedUrl) {
        if self.modal.is_some() {
            return;
        }
        debug!(url = %decoded.url, "Presenting open prompt");
        self.modal = Some(ConfirmationPrompt::new(decoded));
    }

    /// Open the prompt's URL and dismiss it
    pub fn confirm_modal(&mut self) {
        if let Some(prompt) = self.modal.take() {
            info!(url = %prompt.url, "User confirmed opening URL");
            if let Err(e) = self.opener.open(&prompt.url) {
                warn!(url = %prompt.url, error = %e, "Failed to open URL");
            }
        }
    }

    /// Dismiss the prompt without opening anything
    pub fn cancel_modal(&mut self) {
        if let Some(prompt) = self.modal.take() {
            debug!(url = %prompt.url, "User cancelled opening URL");
        }
    }

    pub fn modal(&self) -> Option<&ConfirmationPrompt> {
        self.modal.as_ref()
    }

    pub fn modal_mut(&mut self) -> Option<&mut ConfirmationPrompt> {
        self.modal.as_mut()
    }

    pub fn message(&self) -> &str {
        &self.message_label
    }

    pub fn top_bar(&self) -> &str {
        &self.top_bar
    }

    pub fn set_top_bar(&mut self, text: impl Into<String>) {
        self.top_bar = text.into();
    }

    pub fn highlight(&self) -> &HighlightView {
        &self.highlight
    }

    pub fn preview(&self) -> &PreviewLayer {
        &self.preview
    }

    pub fn preview_mut(&mut self) -> &mut PreviewLayer {
        &mut self.preview
    }

    pub fn views(&self) -> &ViewStack {
        &self.views
    }

    pub fn supported_types(&self) -> &SupportedCodeTypes {
        &self.supported
    }
}
