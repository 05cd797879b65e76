//! View state for both flows and the controllers that drive it.
//!
//! Each flow owns an explicit state object; [`crate::render`] maps it to markup.
//! Controllers perform one request/response cycle against a backend and mutate
//! the state only from the calling task.

use std::fmt::Display;

use tokio::sync::mpsc;
use tracing::debug;

use crate::types::{ScanRequest, ScanResult, UrlCheckResult};

pub const EMPTY_INPUT_ERROR: &str = "Please enter a URL to check";
pub const CHECK_LABEL: &str = "🔍 Check URL";
pub const LOADING_LABEL: &str = "Scanning...";

/// Anything that can answer a URL check.
#[allow(async_fn_in_trait)]
pub trait CheckBackend {
    type Error: Display;

    async fn check_url(&self, url: &str) -> Result<UrlCheckResult, Self::Error>;
}

/// Anything that can validate a decoded barcode.
#[allow(async_fn_in_trait)]
pub trait ScanBackend {
    type Error: Display;

    async fn scan_barcode(&self, req: &ScanRequest) -> Result<ScanResult, Self::Error>;
}

/// State of the URL-check page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlCheckView {
    pub input: String,
    pub loading: bool,
    /// Message without the "❌ " prefix; `None` hides the error box.
    pub error: Option<String>,
    /// `None` hides the result panel.
    pub result: Option<UrlCheckResult>,
    pub info_visible: bool,
}

impl Default for UrlCheckView {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlCheckView {
    pub fn new() -> Self {
        Self { input: String::new(), loading: false, error: None, result: None, info_visible: true }
    }

    pub fn with_input(input: impl Into<String>) -> Self {
        Self { input: input.into(), ..Self::new() }
    }

    pub fn button_label(&self) -> &'static str {
        if self.loading {
            LOADING_LABEL
        } else {
            CHECK_LABEL
        }
    }

    pub fn show_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    /// Validate the input and enter the loading state.
    ///
    /// Returns the trimmed URL to submit, or `None` after showing the local
    /// error when the input is blank.
    pub fn begin_check(&mut self) -> Option<String> {
        let url = self.input.trim().to_string();
        if url.is_empty() {
            self.show_error(EMPTY_INPUT_ERROR);
            return None;
        }
        self.loading = true;
        self.error = None;
        self.result = None;
        Some(url)
    }

    /// Apply the outcome of a check. Leaves `loading` untouched.
    pub fn apply<E: Display>(&mut self, outcome: Result<UrlCheckResult, E>) {
        match outcome {
            Ok(result) => {
                self.result = Some(result);
                self.info_visible = false;
            }
            Err(e) => self.show_error(e.to_string()),
        }
    }

    pub fn reset(&mut self) {
        self.input.clear();
        self.result = None;
        self.error = None;
        self.info_visible = true;
    }
}

/// Keeps the view in its loading state; leaving scope restores it.
struct Loading<'a>(&'a mut UrlCheckView);

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        self.0.loading = false;
    }
}

/// Run one check cycle: validate, load, request, render, release.
///
/// Blank input returns without touching the backend.
pub async fn check_url<B: CheckBackend>(view: &mut UrlCheckView, backend: &B) {
    let Some(url) = view.begin_check() else {
        return;
    };
    let guard = Loading(view);
    let outcome = backend.check_url(&url).await;
    guard.0.apply(outcome);
}

/// Keys the controller distinguishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Enter,
    Other(String),
}

/// User interactions on the URL-check page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Input(String),
    KeyPress(Key),
    Click,
    Reset,
}

pub async fn handle_event<B: CheckBackend>(view: &mut UrlCheckView, backend: &B, event: UiEvent) {
    match event {
        UiEvent::Input(text) => view.input = text,
        UiEvent::KeyPress(Key::Enter) | UiEvent::Click => check_url(view, backend).await,
        UiEvent::KeyPress(Key::Other(_)) => {}
        UiEvent::Reset => view.reset(),
    }
}

/// What the scan panel currently shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScanView {
    #[default]
    Idle,
    Scanning,
    Error(String),
    Result(ScanResult),
}

impl ScanView {
    /// A new decode replaces whatever was shown before.
    pub fn on_decode(&mut self, decoded: &str, is_sealed: bool) -> ScanRequest {
        *self = ScanView::Scanning;
        ScanRequest { barcode: decoded.to_string(), is_sealed }
    }

    pub fn on_response<E: Display>(&mut self, outcome: Result<ScanResult, E>) {
        *self = match outcome {
            Ok(r) => ScanView::Result(r),
            Err(e) => ScanView::Error(e.to_string()),
        };
    }
}

pub async fn scan_once<B: ScanBackend>(view: &mut ScanView, backend: &B, decoded: &str, is_sealed: bool) {
    let req = view.on_decode(decoded, is_sealed);
    let outcome = backend.scan_barcode(&req).await;
    view.on_response(outcome);
}

/// Consume decode events until the widget stops, rendering after every state change.
pub async fn run_scan_flow<B, F>(mut decodes: mpsc::Receiver<String>, backend: &B, is_sealed: bool, mut on_render: F)
where
    B: ScanBackend,
    F: FnMut(&ScanView),
{
    let mut view = ScanView::default();
    while let Some(decoded) = decodes.recv().await {
        debug!(len = decoded.len(), "decode event");
        let req = view.on_decode(&decoded, is_sealed);
        on_render(&view);
        let outcome = backend.scan_barcode(&req).await;
        view.on_response(outcome);
        on_render(&view);
    }
}
