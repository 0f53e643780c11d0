// SPDX-License-Identifier: GPL-3.0-only

//! Detection callback handling
//!
//! [`evaluate`] decides what the screen should do with one frame's detection
//! list. It has no side effects: the screen applies the returned
//! [`DetectionOutcome`] to its views and starts the confirmation flow.

use crate::app::confirm::{DecodedUrl, UrlOpener};
use crate::app::frame_processor::{DetectedSymbol, SupportedCodeTypes};
use crate::app::preview::ScreenRect;
use crate::constants::NO_CODE_DETECTED;
use tracing::{debug, trace};

/// Maps a symbol's frame region to preview-surface coordinates
pub trait RegionMapper {
    /// `None` when the mapping is not possible yet (no video size or surface)
    fn map_region(&self, symbol: &DetectedSymbol) -> Option<ScreenRect>;
}

/// What happens to the highlight rectangle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HighlightUpdate {
    /// Collapse to [`ScreenRect::ZERO`]
    Clear,
    /// Move to the given rectangle and bring the highlight to the front
    Move(ScreenRect),
    /// Leave it where it is
    Unchanged,
}

/// Screen changes for one detection callback
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionOutcome {
    /// New status label text, `None` keeps the current text
    pub status: Option<String>,
    pub highlight: HighlightUpdate,
    /// URL to offer in the confirmation prompt
    pub url_to_confirm: Option<DecodedUrl>,
}

impl DetectionOutcome {
    fn nothing_detected() -> Self {
        Self {
            status: Some(NO_CODE_DETECTED.to_string()),
            highlight: HighlightUpdate::Clear,
            url_to_confirm: None,
        }
    }
}

/// Evaluate one frame's detections
///
/// Only the first symbol is considered. Unsupported symbol types may still
/// update the status text but are never highlighted or offered for opening.
pub fn evaluate(
    symbols: &[DetectedSymbol],
    supported: &SupportedCodeTypes,
    mapper: &dyn RegionMapper,
    opener: &dyn UrlOpener,
) -> DetectionOutcome {
    let Some(symbol) = symbols.first() else {
        trace!("No symbols in frame");
        return DetectionOutcome::nothing_detected();
    };

    let status = symbol.text.clone();

    if !supported.contains(symbol.symbology) {
        debug!(symbology = %symbol.symbology, "Ignoring unsupported symbol type");
        return DetectionOutcome {
            status,
            highlight: HighlightUpdate::Unchanged,
            url_to_confirm: None,
        };
    }

    let highlight = match mapper.map_region(symbol) {
        Some(rect) => HighlightUpdate::Move(rect),
        None => HighlightUpdate::Unchanged,
    };

    let url_to_confirm = symbol
        .text
        .as_deref()
        .and_then(DecodedUrl::parse)
        .filter(|decoded| opener.can_open(&decoded.url));

    DetectionOutcome {
        status,
        highlight,
        url_to_confirm,
    }
}
