// SPDX-License-Identifier: GPL-3.0-only

//! Open-URL confirmation flow
//!
//! A decoded URL is never opened directly. The screen presents a
//! [`ConfirmationPrompt`] and only hands the URL to a [`UrlOpener`] once the
//! user confirms.

use crate::constants::{DEFAULT_OPENABLE_SCHEMES, prompt};
use std::fmt;
use tracing::info;
use url::Url;

/// Errors from the URL open service
#[derive(Debug, Clone)]
pub enum OpenError {
    /// The scheme is not handled
    Unsupported(String),
    /// The system handler could not be launched
    Launch(String),
}

impl fmt::Display for OpenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenError::Unsupported(scheme) => write!(f, "Unsupported URL scheme: {}", scheme),
            OpenError::Launch(msg) => write!(f, "Failed to launch handler: {}", msg),
        }
    }
}

impl std::error::Error for OpenError {}

/// External URL open service
pub trait UrlOpener: Send + Sync {
    /// Whether some handler will accept this URL
    fn can_open(&self, url: &Url) -> bool;

    /// Hand the URL to its handler without waiting for it
    fn open(&self, url: &Url) -> Result<(), OpenError>;
}

/// Opens URLs with the desktop's default handler
#[derive(Debug, Clone)]
pub struct SystemUrlOpener {
    schemes: Vec<String>,
}

impl SystemUrlOpener {
    pub fn new(schemes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            schemes: schemes
                .into_iter()
                .map(|s| s.into().to_ascii_lowercase())
                .collect(),
        }
    }
}

impl Default for SystemUrlOpener {
    fn default() -> Self {
        Self::new(DEFAULT_OPENABLE_SCHEMES.iter().copied())
    }
}

impl UrlOpener for SystemUrlOpener {
    fn can_open(&self, url: &Url) -> bool {
        // Url normalizes schemes to lowercase
        self.schemes.iter().any(|s| s == url.scheme())
    }

    fn open(&self, url: &Url) -> Result<(), OpenError> {
        if !self.can_open(url) {
            return Err(OpenError::Unsupported(url.scheme().to_string()));
        }

        info!(url = %url, "Opening URL");
        open::that_detached(url.as_str()).map_err(|e| OpenError::Launch(e.to_string()))
    }
}

/// Decoded text that parses as a URL
///
/// `text` is what the code carried and is what the user sees. `url` is the
/// normalized form handed to the opener.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedUrl {
    pub text: String,
    pub url: Url,
}

impl DecodedUrl {
    pub fn parse(text: &str) -> Option<Self> {
        let url = Url::parse(text).ok()?;
        Some(Self {
            text: text.to_string(),
            url,
        })
    }
}

/// Which prompt action has focus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptAction {
    Confirm,
    #[default]
    Cancel,
}

/// Modal asking the user before a URL is opened
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationPrompt {
    pub title: String,
    pub message: String,
    pub url: Url,
    pub selected: PromptAction,
}

impl ConfirmationPrompt {
    pub fn new(decoded: DecodedUrl) -> Self {
        Self {
            title: prompt::TITLE.to_string(),
            message: prompt::message(&decoded.text),
            url: decoded.url,
            selected: PromptAction::default(),
        }
    }

    /// Move focus to the other action
    pub fn toggle_selection(&mut self) {
        self.selected = match self.selected {
            PromptAction::Confirm => PromptAction::Cancel,
            PromptAction::Cancel => PromptAction::Confirm,
        };
    }

    /// Action labels in display order
    pub fn actions() -> [(PromptAction, &'static str); 2] {
        [
            (PromptAction::Confirm, prompt::CONFIRM),
            (PromptAction::Cancel, prompt::CANCEL),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_default_schemes() {
        let opener = SystemUrlOpener::default();
        assert!(opener.can_open(&url("https://example.com")));
        assert!(opener.can_open(&url("HTTP://example.com")));
        assert!(opener.can_open(&url("mailto:someone@example.com")));
        assert!(opener.can_open(&url("tel:+15555550100")));
        assert!(!opener.can_open(&url("file:///etc/passwd")));
        assert!(!opener.can_open(&url("javascript:alert(1)")));
    }

    #[test]
    fn test_custom_schemes() {
        let opener = SystemUrlOpener::new(["HTTPS"]);
        assert!(opener.can_open(&url("https://example.com")));
        assert!(!opener.can_open(&url("http://example.com")));
    }

    #[test]
    fn test_open_rejects_unknown_scheme() {
        let opener = SystemUrlOpener::new(["https"]);
        let result = opener.open(&url("ftp://example.com/file"));
        assert!(matches!(result, Err(OpenError::Unsupported(s)) if s == "ftp"));
    }

    fn decoded(s: &str) -> DecodedUrl {
        DecodedUrl::parse(s).unwrap()
    }

    #[test]
    fn test_prompt_text() {
        let prompt = ConfirmationPrompt::new(decoded("https://example.com"));
        assert_eq!(prompt.title, "Open App");
        assert_eq!(prompt.message, "You're going to open https://example.com");
        assert_eq!(prompt.url.as_str(), "https://example.com/");
        assert_eq!(prompt.selected, PromptAction::Cancel);
    }

    #[test]
    fn test_prompt_shows_text_as_scanned() {
        let prompt = ConfirmationPrompt::new(decoded("HTTPS://Example.COM/Menu?table=4"));
        assert_eq!(
            prompt.message,
            "You're going to open HTTPS://Example.COM/Menu?table=4"
        );
        assert_eq!(prompt.url.as_str(), "https://example.com/Menu?table=4");
    }

    #[test]
    fn test_decoded_url_rejects_plain_text() {
        assert!(DecodedUrl::parse("hello world").is_none());
        assert_eq!(decoded("tel:+15555550100").text, "tel:+15555550100");
    }

    #[test]
    fn test_prompt_toggle() {
        let mut prompt = ConfirmationPrompt::new(decoded("https://example.com"));
        prompt.toggle_selection();
        assert_eq!(prompt.selected, PromptAction::Confirm);
        prompt.toggle_selection();
        assert_eq!(prompt.selected, PromptAction::Cancel);
    }
}
