//! Operator-facing rendering of terminal call failures.
//!
//! The gateway hands a [`Presentation`] to the configured [`Presenter`]: a display model
//! of the error plus a [`CopyAction`] a UI binds to its "copy" button.

use crate::error::CanonicalError;
use serde_json::Value;
use std::sync::{Arc, Mutex, RwLock};
use tracing::warn;

/// Display model of a [`CanonicalError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorView {
    pub title: String,
    pub code: String,
    pub message: String,
    /// Pretty-printed details, if the error carried any
    pub details: Option<String>,
}

impl ErrorView {
    pub fn from_error(command: &str, err: &CanonicalError) -> Self {
        Self {
            title: format!("Request '{}' failed", command),
            code: err.code.clone(),
            message: err.message.clone(),
            details: err.details.as_ref().map(pretty),
        }
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Text sink behind the copy affordance.
pub trait Clipboard: Send + Sync {
    fn write_text(&self, text: &str) -> std::io::Result<()>;
}

/// Clipboard that keeps the last copied text, for headless hosts and tests.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    contents: Mutex<Option<String>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Option<String> {
        self.contents.lock().ok().and_then(|c| c.clone())
    }
}

impl Clipboard for MemoryClipboard {
    fn write_text(&self, text: &str) -> std::io::Result<()> {
        let mut contents = self
            .contents
            .lock()
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::Other, "clipboard poisoned"))?;
        *contents = Some(text.to_string());
        Ok(())
    }
}

/// One-click copy of the full error as text.
#[derive(Clone)]
pub struct CopyAction {
    text: String,
    clipboard: Option<Arc<dyn Clipboard>>,
}

impl CopyAction {
    pub fn new(err: &CanonicalError, clipboard: Option<Arc<dyn Clipboard>>) -> Self {
        Self {
            text: pretty(&err.to_value()),
            clipboard,
        }
    }

    /// The text that a copy would place on the clipboard.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn copy(&self) -> std::io::Result<()> {
        match &self.clipboard {
            Some(clipboard) => clipboard.write_text(&self.text),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "no clipboard configured",
            )),
        }
    }
}

impl std::fmt::Debug for CopyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CopyAction")
            .field("text", &self.text)
            .field("has_clipboard", &self.clipboard.is_some())
            .finish()
    }
}

/// What a presenter receives.
#[derive(Debug, Clone)]
pub struct Presentation {
    pub view: ErrorView,
    pub copy: CopyAction,
}

/// Presentation sink; its outcome never affects the call.
pub trait Presenter: Send + Sync {
    fn present(&self, presentation: Presentation);
}

/// Shows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPresenter;

impl Presenter for NoopPresenter {
    fn present(&self, _presentation: Presentation) {}
}

/// Logs the view through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingPresenter;

impl Presenter for TracingPresenter {
    fn present(&self, presentation: Presentation) {
        let view = presentation.view;
        warn!(
            code = view.code.as_str(),
            details = view.details.as_deref().unwrap_or(""),
            "{}: {}",
            view.title,
            view.message
        );
    }
}

/// Records presentations, for testing.
#[derive(Default)]
pub struct InMemoryPresenter {
    shown: RwLock<Vec<Presentation>>,
}

impl InMemoryPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn presentations(&self) -> Vec<Presentation> {
        self.shown.read().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.shown.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Presenter for InMemoryPresenter {
    fn present(&self, presentation: Presentation) {
        if let Ok(mut shown) = self.shown.write() {
            shown.push(presentation);
        }
    }
}
