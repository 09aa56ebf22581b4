//! Rendering engine contract.
//!
//! The session never parses archives or paginates text itself. Everything
//! that touches book content goes through [`RenderingEngine`]. Work that the
//! engine finishes later (book ready, first render, relocation, location
//! index progress) comes back as [`EngineEvent`]s from
//! [`RenderingEngine::poll_event`], each tagged with the [`ListenerId`] the
//! session registered with [`RenderingEngine::on`].

pub mod scripted;

use std::fmt;

use serde::Deserialize;
use thiserror::Error;

use crate::theme::Theme;

/// Engine-assigned reference to an opened book archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BookHandle(pub u64);

/// Engine-assigned reference to a live view of a book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenditionHandle(pub u64);

/// Opaque engine-native position reference (an EPUB CFI).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cfi(String);

impl Cfi {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cfi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named jump target from the book's navigation document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub label: String,
    pub href: String,
}

/// Metadata available once a book reports ready.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookMetadata {
    pub title: Option<String>,
    pub toc: Vec<TocEntry>,
}

/// Single page vs. two-page side-by-side layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Spread {
    #[default]
    Auto,
    None,
}

impl Spread {
    pub fn as_str(self) -> &'static str {
        match self {
            Spread::Auto => "auto",
            Spread::None => "none",
        }
    }
}

impl fmt::Display for Spread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content flow of a rendition. Only paginated flow is used by the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Flow {
    Paginated,
}

/// Options passed to [`RenderingEngine::render_to`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenditionOptions {
    pub width: String,
    pub height: String,
    pub spread: Spread,
    pub flow: Flow,
}

impl RenditionOptions {
    /// Full-size paginated view with the given spread.
    pub fn paginated(spread: Spread) -> Self {
        Self {
            width: "100%".into(),
            height: "100%".into(),
            spread,
            flow: Flow::Paginated,
        }
    }
}

/// The surface a rendition draws into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayTarget {
    pub id: String,
}

impl DisplayTarget {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Identifies the load a listener belongs to. Bumped on every load and close.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

/// Listener identity chosen by the session and echoed back by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId {
    pub generation: Generation,
    pub slot: u32,
}

/// What a listener is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventSource {
    Book(BookHandle),
    Rendition(RenditionHandle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Book finished (or failed) opening.
    Ready,
    Rendered,
    Relocated,
    TouchStart,
    TouchMove,
    TouchEnd,
    LocationsProgress,
    LocationsGenerated,
}

impl EventKind {
    pub fn name(self) -> &'static str {
        match self {
            EventKind::Ready => "ready",
            EventKind::Rendered => "rendered",
            EventKind::Relocated => "relocated",
            EventKind::TouchStart => "touchstart",
            EventKind::TouchMove => "touchmove",
            EventKind::TouchEnd => "touchend",
            EventKind::LocationsProgress => "progress",
            EventKind::LocationsGenerated => "generated",
        }
    }
}

/// Position reported by a `relocated` notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// CFI of the first visible position, when the engine knows it.
    pub start: Option<Cfi>,
    pub at_start: bool,
    pub at_end: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TouchPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Ready(Result<(), EngineError>),
    Rendered,
    Relocated(Location),
    Touch(TouchPoint),
    /// Fraction of the location index built so far (0.0..=1.0).
    Progress(f64),
    /// Location index finished; carries the number of locations.
    Generated(Result<usize, EngineError>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineEvent {
    pub listener: ListenerId,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("malformed book archive: {0}")]
    Malformed(String),

    #[error("unknown book handle {0:?}")]
    UnknownBook(BookHandle),

    #[error("unknown rendition handle {0:?}")]
    UnknownRendition(RenditionHandle),

    #[error("cannot resolve display target '{0}'")]
    BadTarget(String),

    #[error("location index failed: {0}")]
    Locations(String),
}

/// The operations the reading session needs from an EPUB rendering engine.
///
/// Calls that start asynchronous work return immediately; completion is
/// reported through listeners registered with [`on`](Self::on).
pub trait RenderingEngine {
    /// Open an archive from raw bytes. Format problems are reported later
    /// through a `Ready` notification, not here.
    fn open_book(&mut self, bytes: Vec<u8>) -> Result<BookHandle, EngineError>;

    /// Title and table of contents. Only meaningful after `Ready`.
    fn metadata(&self, book: BookHandle) -> Result<BookMetadata, EngineError>;

    fn destroy_book(&mut self, book: BookHandle);

    fn render_to(
        &mut self,
        book: BookHandle,
        target: &DisplayTarget,
        options: &RenditionOptions,
    ) -> Result<RenditionHandle, EngineError>;

    fn destroy_rendition(&mut self, rendition: RenditionHandle);

    fn register_theme(&mut self, rendition: RenditionHandle, theme: &Theme)
    -> Result<(), EngineError>;

    fn select_theme(&mut self, rendition: RenditionHandle, name: &str) -> Result<(), EngineError>;

    /// Live style override applied on top of the selected theme.
    fn override_style(
        &mut self,
        rendition: RenditionHandle,
        property: &str,
        value: &str,
    ) -> Result<(), EngineError>;

    fn set_spread(&mut self, rendition: RenditionHandle, spread: Spread) -> Result<(), EngineError>;

    /// Display a CFI or an href. `None` displays the start of the book.
    fn display(&mut self, rendition: RenditionHandle, target: Option<&str>)
    -> Result<(), EngineError>;

    fn prev(&mut self, rendition: RenditionHandle) -> Result<(), EngineError>;

    fn next(&mut self, rendition: RenditionHandle) -> Result<(), EngineError>;

    fn on(&mut self, source: EventSource, kind: EventKind, listener: ListenerId);

    fn off(&mut self, listener: ListenerId);

    /// Start building the location index. `density` is the target number of
    /// characters per location.
    fn generate_locations(&mut self, book: BookHandle, density: u32) -> Result<(), EngineError>;

    /// CFI of the 0-based location `index`.
    fn cfi_from_location(&self, book: BookHandle, index: usize) -> Option<Cfi>;

    /// 0-based location containing `cfi`.
    fn location_from_cfi(&self, book: BookHandle, cfi: &Cfi) -> Option<usize>;

    /// Next pending notification for a registered listener.
    fn poll_event(&mut self) -> Option<EngineEvent>;
}
