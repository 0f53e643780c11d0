// SPDX-License-Identifier: GPL-3.0-only

//! Highlight rectangle around the detected symbol

use crate::app::preview::ScreenRect;
use crate::constants::highlight::{BORDER_WIDTH, THICK_BORDER_THRESHOLD};
use ratatui::style::Color;
use ratatui::widgets::BorderType;

/// Border drawn over the preview where the last symbol was found
///
/// The frame is in preview-surface coordinates. An empty frame hides the
/// highlight.
#[derive(Debug, Clone, PartialEq)]
pub struct HighlightView {
    frame: ScreenRect,
    border_width: u16,
    color: Color,
}

impl Default for HighlightView {
    fn default() -> Self {
        Self::new()
    }
}

impl HighlightView {
    /// Green border in the reference width, initially hidden
    pub fn new() -> Self {
        Self {
            frame: ScreenRect::ZERO,
            border_width: BORDER_WIDTH,
            color: Color::Green,
        }
    }

    pub fn with_style(border_width: u16, color: Color) -> Self {
        Self {
            frame: ScreenRect::ZERO,
            border_width,
            color,
        }
    }

    pub fn frame(&self) -> ScreenRect {
        self.frame
    }

    pub fn set_frame(&mut self, frame: ScreenRect) {
        self.frame = frame;
    }

    /// Collapse to the empty rectangle
    pub fn clear(&mut self) {
        self.frame = ScreenRect::ZERO;
    }

    pub fn is_visible(&self) -> bool {
        !self.frame.is_empty() && self.border_width > 0
    }

    pub fn border_width(&self) -> u16 {
        self.border_width
    }

    pub fn color(&self) -> Color {
        self.color
    }

    /// Line glyphs approximating the border width in a terminal
    pub fn border_type(&self) -> BorderType {
        if self.border_width >= THICK_BORDER_THRESHOLD {
            BorderType::Thick
        } else {
            BorderType::Plain
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_hidden() {
        let view = HighlightView::new();
        assert_eq!(view.frame(), ScreenRect::ZERO);
        assert!(!view.is_visible());
        assert_eq!(view.border_width(), 5);
        assert_eq!(view.color(), Color::Green);
        assert_eq!(view.border_type(), BorderType::Thick);
    }

    #[test]
    fn test_set_and_clear() {
        let mut view = HighlightView::new();
        view.set_frame(ScreenRect::new(1.0, 2.0, 3.0, 4.0));
        assert!(view.is_visible());
        view.clear();
        assert_eq!(view.frame(), ScreenRect::ZERO);
        assert!(!view.is_visible());
    }

    #[test]
    fn test_thin_border() {
        let view = HighlightView::with_style(1, Color::Red);
        assert_eq!(view.border_type(), BorderType::Plain);
    }
}
