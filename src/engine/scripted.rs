//! Deterministic in-process rendering engine.
//!
//! Books are TOML manifests rather than EPUB archives: a title and a list of
//! chapters with a label, an href and a length in characters. Pages are
//! windows of characters whose size follows the font-size and line-height
//! overrides and the spread mode, which is enough to drive a reading session
//! end to end without a browser.
//!
//! Every asynchronous result (ready, rendered, relocated, locations progress)
//! is queued and only handed out through [`poll_event`](RenderingEngine::poll_event),
//! so callers see the same ordering a real engine would produce.

use std::collections::{HashMap, VecDeque};

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use super::{
    BookHandle, BookMetadata, Cfi, DisplayTarget, EngineError, EngineEvent, EventKind, EventPayload,
    EventSource, ListenerId, Location, RenderingEngine, RenditionHandle, RenditionOptions,
    Spread, TocEntry, TouchPoint,
};
use crate::theme::Theme;

const DEFAULT_FONT_SIZE_PX: f64 = 18.0;
const DEFAULT_LINE_HEIGHT: f64 = 1.6;
/// Characters on one single-spread page at the default font size and line height.
const BASE_CHARS_PER_PAGE: f64 = 1200.0;

// ---------------------------------------------------------------------------
// Manifest
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookManifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Make location index generation fail after reporting some progress.
    #[serde(default)]
    pub fail_locations: bool,
    #[serde(default)]
    pub chapters: Vec<ChapterSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterSpec {
    pub label: String,
    pub href: String,
    /// Length in characters.
    pub length: u32,
}

impl BookManifest {
    /// A book of `chapters` equally long chapters named `Chapter N`.
    pub fn uniform(title: &str, chapters: usize, length: u32) -> Self {
        Self {
            title: Some(title.to_string()),
            fail_locations: false,
            chapters: (1..=chapters)
                .map(|n| ChapterSpec {
                    label: format!("Chapter {n}"),
                    href: format!("chapter{n:02}.xhtml"),
                    length,
                })
                .collect(),
        }
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, EngineError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| EngineError::Malformed(format!("manifest is not UTF-8: {e}")))?;
        let manifest: BookManifest =
            toml::from_str(text).map_err(|e| EngineError::Malformed(e.message().to_string()))?;
        if manifest.chapters.is_empty() {
            return Err(EngineError::Malformed("book has no chapters".into()));
        }
        Ok(manifest)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        toml::to_string(self)
            .map(String::into_bytes)
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Position {
    chapter: usize,
    offset: u32,
}

impl Position {
    const START: Position = Position { chapter: 0, offset: 0 };

    fn cfi(self) -> Cfi {
        Cfi::new(format!(
            "epubcfi(/6/{}!/4/1:{})",
            (self.chapter + 1) * 2,
            self.offset
        ))
    }

    fn parse(raw: &str) -> Option<Position> {
        let inner = raw.strip_prefix("epubcfi(/6/")?.strip_suffix(')')?;
        let (spine, offset) = inner.split_once("!/4/1:")?;
        let step: usize = spine.parse().ok()?;
        if step < 2 || step % 2 != 0 {
            return None;
        }
        Some(Position {
            chapter: step / 2 - 1,
            offset: offset.parse().ok()?,
        })
    }
}

// ---------------------------------------------------------------------------
// Engine state
// ---------------------------------------------------------------------------

/// Calls the engine received, in order. Lets tests assert on ordering
/// (e.g. theme registration before first display, teardown order).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    OpenBook(BookHandle),
    DestroyBook(BookHandle),
    RenderTo { book: BookHandle, spread: Spread },
    DestroyRendition(RenditionHandle),
    RegisterTheme(String),
    SelectTheme(String),
    OverrideStyle { property: String, value: String },
    SetSpread(Spread),
    Display(Option<String>),
    Prev,
    Next,
    On(EventKind),
    Off(ListenerId),
    GenerateLocations(u32),
}

struct ScriptedBook {
    manifest: Result<BookManifest, EngineError>,
    locations: Option<Vec<Position>>,
}

struct ScriptedRendition {
    book: BookHandle,
    position: Position,
    font_size_px: f64,
    line_height: f64,
    spread: Spread,
    themes: Vec<String>,
    selected_theme: Option<String>,
}

impl ScriptedRendition {
    fn page_len(&self) -> u32 {
        let font_scale = (DEFAULT_FONT_SIZE_PX / self.font_size_px).powi(2);
        let line_scale = DEFAULT_LINE_HEIGHT / self.line_height;
        let spread_scale = match self.spread {
            Spread::Auto => 2.0,
            Spread::None => 1.0,
        };
        (BASE_CHARS_PER_PAGE * font_scale * line_scale * spread_scale)
            .round()
            .max(1.0) as u32
    }
}

/// What the rendition currently shows; used by the terminal viewer and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSnapshot {
    pub chapter_index: usize,
    pub chapter_count: usize,
    pub chapter_label: String,
    pub offset: u32,
    pub chapter_length: u32,
    pub page_len: u32,
    pub font_size_px: f64,
    pub line_height: f64,
    pub spread: Spread,
    pub theme: Option<String>,
}

#[derive(Default)]
pub struct ScriptedEngine {
    next_handle: u64,
    books: HashMap<BookHandle, ScriptedBook>,
    renditions: HashMap<RenditionHandle, ScriptedRendition>,
    listeners: Vec<(EventSource, EventKind, ListenerId)>,
    pending: VecDeque<(EventSource, EventKind, EventPayload)>,
    ready: VecDeque<EngineEvent>,
    calls: Vec<EngineCall>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls received so far.
    pub fn calls(&self) -> &[EngineCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<EngineCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn live_books(&self) -> usize {
        self.books.len()
    }

    pub fn live_renditions(&self) -> usize {
        self.renditions.len()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Queue a touch notification as if the user touched the rendition.
    pub fn touch(&mut self, rendition: RenditionHandle, kind: EventKind, x: f64, y: f64) {
        self.pending.push_back((
            EventSource::Rendition(rendition),
            kind,
            EventPayload::Touch(TouchPoint { x, y }),
        ));
    }

    pub fn view(&self, rendition: RenditionHandle) -> Option<ViewSnapshot> {
        let r = self.renditions.get(&rendition)?;
        let manifest = self.books.get(&r.book)?.manifest.as_ref().ok()?;
        let chapter = manifest.chapters.get(r.position.chapter)?;
        Some(ViewSnapshot {
            chapter_index: r.position.chapter,
            chapter_count: manifest.chapters.len(),
            chapter_label: chapter.label.clone(),
            offset: r.position.offset,
            chapter_length: chapter.length,
            page_len: r.page_len(),
            font_size_px: r.font_size_px,
            line_height: r.line_height,
            spread: r.spread,
            theme: r.selected_theme.clone(),
        })
    }

    fn alloc_handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }

    fn rendition_mut(
        &mut self,
        rendition: RenditionHandle,
    ) -> Result<&mut ScriptedRendition, EngineError> {
        self.renditions
            .get_mut(&rendition)
            .ok_or(EngineError::UnknownRendition(rendition))
    }

    fn manifest_for(&self, rendition: RenditionHandle) -> Result<&BookManifest, EngineError> {
        let r = self
            .renditions
            .get(&rendition)
            .ok_or(EngineError::UnknownRendition(rendition))?;
        let book = self
            .books
            .get(&r.book)
            .ok_or(EngineError::UnknownBook(r.book))?;
        book.manifest.as_ref().map_err(Clone::clone)
    }

    fn resolve_target(manifest: &BookManifest, target: &str) -> Result<Position, EngineError> {
        if target.starts_with("epubcfi(") {
            let pos =
                Position::parse(target).ok_or_else(|| EngineError::BadTarget(target.into()))?;
            let chapter = manifest
                .chapters
                .get(pos.chapter)
                .ok_or_else(|| EngineError::BadTarget(target.into()))?;
            if pos.offset > chapter.length {
                return Err(EngineError::BadTarget(target.into()));
            }
            return Ok(pos);
        }
        let path = target.split_once('#').map_or(target, |(p, _)| p);
        manifest
            .chapters
            .iter()
            .position(|c| c.href.split_once('#').map_or(c.href.as_str(), |(p, _)| p) == path)
            .map(|chapter| Position { chapter, offset: 0 })
            .ok_or_else(|| EngineError::BadTarget(target.into()))
    }

    /// Move to `pos` and notify rendered + relocated listeners.
    fn relocate(&mut self, rendition: RenditionHandle, pos: Position) -> Result<(), EngineError> {
        let manifest = self.manifest_for(rendition)?;
        let last = manifest.chapters.len() - 1;
        let last_len = manifest.chapters[last].length;
        let r = self.rendition_mut(rendition)?;
        r.position = pos;
        let page = r.page_len();
        let location = Location {
            start: Some(pos.cfi()),
            at_start: pos == Position::START,
            at_end: pos.chapter == last && pos.offset.saturating_add(page) >= last_len,
        };
        trace!("scripted: relocated to {:?} (page_len={page})", pos);
        let source = EventSource::Rendition(rendition);
        self.pending.push_back((source, EventKind::Rendered, EventPayload::Rendered));
        self.pending.push_back((
            source,
            EventKind::Relocated,
            EventPayload::Relocated(location),
        ));
        Ok(())
    }
}

fn location_entries(manifest: &BookManifest, density: u32) -> Vec<Position> {
    let step = density.max(1) as usize;
    manifest
        .chapters
        .iter()
        .enumerate()
        .flat_map(|(chapter, spec)| {
            (0..spec.length.max(1))
                .step_by(step)
                .map(move |offset| Position { chapter, offset })
        })
        .collect()
}

impl RenderingEngine for ScriptedEngine {
    fn open_book(&mut self, bytes: Vec<u8>) -> Result<BookHandle, EngineError> {
        let handle = BookHandle(self.alloc_handle());
        let manifest = BookManifest::parse(&bytes);
        debug!(
            "scripted: open_book {:?} ({} bytes, ok={})",
            handle,
            bytes.len(),
            manifest.is_ok()
        );
        let ready = manifest.as_ref().map(|_| ()).map_err(Clone::clone);
        self.books.insert(
            handle,
            ScriptedBook {
                manifest,
                locations: None,
            },
        );
        self.pending.push_back((
            EventSource::Book(handle),
            EventKind::Ready,
            EventPayload::Ready(ready),
        ));
        self.calls.push(EngineCall::OpenBook(handle));
        Ok(handle)
    }

    fn metadata(&self, book: BookHandle) -> Result<BookMetadata, EngineError> {
        let b = self.books.get(&book).ok_or(EngineError::UnknownBook(book))?;
        let manifest = b.manifest.as_ref().map_err(Clone::clone)?;
        Ok(BookMetadata {
            title: manifest.title.clone(),
            toc: manifest
                .chapters
                .iter()
                .map(|c| TocEntry {
                    label: c.label.clone(),
                    href: c.href.clone(),
                })
                .collect(),
        })
    }

    fn destroy_book(&mut self, book: BookHandle) {
        self.books.remove(&book);
        let source = EventSource::Book(book);
        self.pending.retain(|(s, _, _)| *s != source);
        self.listeners.retain(|(s, _, _)| *s != source);
        self.calls.push(EngineCall::DestroyBook(book));
    }

    fn render_to(
        &mut self,
        book: BookHandle,
        _target: &DisplayTarget,
        options: &RenditionOptions,
    ) -> Result<RenditionHandle, EngineError> {
        if !self.books.contains_key(&book) {
            return Err(EngineError::UnknownBook(book));
        }
        let handle = RenditionHandle(self.alloc_handle());
        self.renditions.insert(
            handle,
            ScriptedRendition {
                book,
                position: Position::START,
                font_size_px: DEFAULT_FONT_SIZE_PX,
                line_height: DEFAULT_LINE_HEIGHT,
                spread: options.spread,
                themes: Vec::new(),
                selected_theme: None,
            },
        );
        self.calls.push(EngineCall::RenderTo {
            book,
            spread: options.spread,
        });
        Ok(handle)
    }

    fn destroy_rendition(&mut self, rendition: RenditionHandle) {
        self.renditions.remove(&rendition);
        let source = EventSource::Rendition(rendition);
        self.pending.retain(|(s, _, _)| *s != source);
        self.listeners.retain(|(s, _, _)| *s != source);
        self.calls.push(EngineCall::DestroyRendition(rendition));
    }

    fn register_theme(
        &mut self,
        rendition: RenditionHandle,
        theme: &Theme,
    ) -> Result<(), EngineError> {
        self.rendition_mut(rendition)?.themes.push(theme.name.to_string());
        self.calls.push(EngineCall::RegisterTheme(theme.name.to_string()));
        Ok(())
    }

    fn select_theme(&mut self, rendition: RenditionHandle, name: &str) -> Result<(), EngineError> {
        let r = self.rendition_mut(rendition)?;
        if !r.themes.iter().any(|t| t == name) {
            return Err(EngineError::BadTarget(format!("theme {name}")));
        }
        r.selected_theme = Some(name.to_string());
        self.calls.push(EngineCall::SelectTheme(name.to_string()));
        Ok(())
    }

    fn override_style(
        &mut self,
        rendition: RenditionHandle,
        property: &str,
        value: &str,
    ) -> Result<(), EngineError> {
        let r = self.rendition_mut(rendition)?;
        match property {
            "font-size" => {
                if let Ok(px) = value.trim_end_matches("px").parse::<f64>()
                    && px > 0.0
                {
                    r.font_size_px = px;
                }
            }
            "line-height" => {
                if let Ok(lh) = value.parse::<f64>()
                    && lh > 0.0
                {
                    r.line_height = lh;
                }
            }
            _ => {}
        }
        self.calls.push(EngineCall::OverrideStyle {
            property: property.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    fn set_spread(
        &mut self,
        rendition: RenditionHandle,
        spread: Spread,
    ) -> Result<(), EngineError> {
        self.rendition_mut(rendition)?.spread = spread;
        self.calls.push(EngineCall::SetSpread(spread));
        Ok(())
    }

    fn display(
        &mut self,
        rendition: RenditionHandle,
        target: Option<&str>,
    ) -> Result<(), EngineError> {
        self.calls.push(EngineCall::Display(target.map(str::to_string)));
        let pos = match target {
            None => Position::START,
            Some(t) => Self::resolve_target(self.manifest_for(rendition)?, t)?,
        };
        self.relocate(rendition, pos)
    }

    fn prev(&mut self, rendition: RenditionHandle) -> Result<(), EngineError> {
        self.calls.push(EngineCall::Prev);
        let manifest = self.manifest_for(rendition)?;
        let r = &self.renditions[&rendition];
        let page = r.page_len();
        let pos = r.position;
        let target = if pos.offset > 0 {
            Position {
                chapter: pos.chapter,
                offset: pos.offset.saturating_sub(page),
            }
        } else if pos.chapter > 0 {
            let len = manifest.chapters[pos.chapter - 1].length;
            Position {
                chapter: pos.chapter - 1,
                offset: len.saturating_sub(1) / page * page,
            }
        } else {
            return Ok(());
        };
        self.relocate(rendition, target)
    }

    fn next(&mut self, rendition: RenditionHandle) -> Result<(), EngineError> {
        self.calls.push(EngineCall::Next);
        let manifest = self.manifest_for(rendition)?;
        let r = &self.renditions[&rendition];
        let page = r.page_len();
        let pos = r.position;
        let target = if pos.offset.saturating_add(page) < manifest.chapters[pos.chapter].length {
            Position {
                chapter: pos.chapter,
                offset: pos.offset + page,
            }
        } else if pos.chapter + 1 < manifest.chapters.len() {
            Position {
                chapter: pos.chapter + 1,
                offset: 0,
            }
        } else {
            return Ok(());
        };
        self.relocate(rendition, target)
    }

    fn on(&mut self, source: EventSource, kind: EventKind, listener: ListenerId) {
        trace!("scripted: on {:?} {} -> {:?}", source, kind.name(), listener);
        self.listeners.push((source, kind, listener));
        self.calls.push(EngineCall::On(kind));
    }

    fn off(&mut self, listener: ListenerId) {
        self.listeners.retain(|(_, _, l)| *l != listener);
        self.calls.push(EngineCall::Off(listener));
    }

    fn generate_locations(&mut self, book: BookHandle, density: u32) -> Result<(), EngineError> {
        self.calls.push(EngineCall::GenerateLocations(density));
        let b = self
            .books
            .get_mut(&book)
            .ok_or(EngineError::UnknownBook(book))?;
        let source = EventSource::Book(book);
        let manifest = match &b.manifest {
            Ok(m) => m,
            Err(e) => {
                let err = e.clone();
                self.pending.push_back((
                    source,
                    EventKind::LocationsGenerated,
                    EventPayload::Generated(Err(err)),
                ));
                return Ok(());
            }
        };

        if manifest.fail_locations {
            self.pending.push_back((
                source,
                EventKind::LocationsProgress,
                EventPayload::Progress(0.5),
            ));
            self.pending.push_back((
                source,
                EventKind::LocationsGenerated,
                EventPayload::Generated(Err(EngineError::Locations(
                    "navigation data is corrupt".into(),
                ))),
            ));
            return Ok(());
        }

        let entries = location_entries(manifest, density);
        let chapters = manifest.chapters.len();
        let total = entries.len();
        b.locations = Some(entries);
        for done in 1..=chapters {
            self.pending.push_back((
                source,
                EventKind::LocationsProgress,
                EventPayload::Progress(done as f64 / chapters as f64),
            ));
        }
        self.pending.push_back((
            source,
            EventKind::LocationsGenerated,
            EventPayload::Generated(Ok(total)),
        ));
        debug!("scripted: generating {total} locations (density={density})");
        Ok(())
    }

    fn cfi_from_location(&self, book: BookHandle, index: usize) -> Option<Cfi> {
        let entries = self.books.get(&book)?.locations.as_ref()?;
        entries.get(index).map(|p| p.cfi())
    }

    fn location_from_cfi(&self, book: BookHandle, cfi: &Cfi) -> Option<usize> {
        let entries = self.books.get(&book)?.locations.as_ref()?;
        let pos = Position::parse(cfi.as_str())?;
        entries.partition_point(|p| *p <= pos).checked_sub(1)
    }

    fn poll_event(&mut self) -> Option<EngineEvent> {
        loop {
            if let Some(ev) = self.ready.pop_front() {
                return Some(ev);
            }
            let (source, kind, payload) = self.pending.pop_front()?;
            let mut delivered = false;
            for (_, _, listener) in self
                .listeners
                .iter()
                .filter(|(s, k, _)| *s == source && *k == kind)
            {
                self.ready.push_back(EngineEvent {
                    listener: *listener,
                    payload: payload.clone(),
                });
                delivered = true;
            }
            if !delivered {
                trace!("scripted: no listener for {} on {:?}", kind.name(), source);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Generation;

    fn listener(slot: u32) -> ListenerId {
        ListenerId {
            generation: Generation(1),
            slot,
        }
    }

    fn open(engine: &mut ScriptedEngine, manifest: &BookManifest) -> (BookHandle, RenditionHandle) {
        let book = engine.open_book(manifest.to_bytes()).unwrap();
        let rendition = engine
            .render_to(
                book,
                &DisplayTarget::new("viewer"),
                &RenditionOptions::paginated(Spread::None),
            )
            .unwrap();
        (book, rendition)
    }

    fn drain(engine: &mut ScriptedEngine) -> Vec<EngineEvent> {
        std::iter::from_fn(|| engine.poll_event()).collect()
    }

    #[test]
    fn manifest_roundtrips_through_toml() {
        let manifest = BookManifest::uniform("Sample", 3, 5000);
        let parsed = BookManifest::parse(&manifest.to_bytes()).unwrap();
        assert_eq!(parsed, manifest);
    }

    #[test]
    fn garbage_bytes_fail_ready_not_open() {
        let mut engine = ScriptedEngine::new();
        let book = engine.open_book(b"PK\x03\x04 not a manifest".to_vec()).unwrap();
        engine.on(EventSource::Book(book), EventKind::Ready, listener(1));
        let events = drain(&mut engine);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0].payload,
            EventPayload::Ready(Err(EngineError::Malformed(_)))
        ));
    }

    #[test]
    fn cfi_parse_roundtrip() {
        let pos = Position { chapter: 4, offset: 3300 };
        assert_eq!(Position::parse(pos.cfi().as_str()), Some(pos));
        assert_eq!(Position::parse("epubcfi(/6/3!/4/1:0)"), None);
        assert_eq!(Position::parse("chapter01.xhtml"), None);
    }

    #[test]
    fn events_without_listeners_are_dropped() {
        let mut engine = ScriptedEngine::new();
        let manifest = BookManifest::uniform("Sample", 2, 3000);
        let (_, rendition) = open(&mut engine, &manifest);
        engine.display(rendition, None).unwrap();
        assert!(drain(&mut engine).is_empty());
    }

    #[test]
    fn next_walks_pages_then_chapters() {
        let mut engine = ScriptedEngine::new();
        let manifest = BookManifest::uniform("Sample", 2, 3000);
        let (_, rendition) = open(&mut engine, &manifest);
        engine.display(rendition, None).unwrap();
        assert_eq!(engine.view(rendition).unwrap().page_len, 1200);

        engine.next(rendition).unwrap();
        assert_eq!(engine.view(rendition).unwrap().offset, 1200);
        engine.next(rendition).unwrap();
        engine.next(rendition).unwrap();
        let view = engine.view(rendition).unwrap();
        assert_eq!((view.chapter_index, view.offset), (1, 0));

        engine.prev(rendition).unwrap();
        let view = engine.view(rendition).unwrap();
        assert_eq!((view.chapter_index, view.offset), (0, 2400));
    }

    #[test]
    fn relocated_reports_boundaries() {
        let mut engine = ScriptedEngine::new();
        let manifest = BookManifest::uniform("Sample", 1, 1000);
        let (_, rendition) = open(&mut engine, &manifest);
        engine.on(
            EventSource::Rendition(rendition),
            EventKind::Relocated,
            listener(1),
        );
        engine.display(rendition, None).unwrap();
        let events = drain(&mut engine);
        let EventPayload::Relocated(loc) = &events[0].payload else {
            panic!("expected relocated, got {:?}", events[0].payload);
        };
        // A single short page is both the start and the end.
        assert!(loc.at_start && loc.at_end);
    }

    #[test]
    fn larger_font_shrinks_pages() {
        let mut engine = ScriptedEngine::new();
        let manifest = BookManifest::uniform("Sample", 1, 10_000);
        let (_, rendition) = open(&mut engine, &manifest);
        let before = engine.view(rendition).unwrap().page_len;
        engine.override_style(rendition, "font-size", "36px").unwrap();
        let after = engine.view(rendition).unwrap().page_len;
        assert_eq!(after, before / 4);
    }

    #[test]
    fn href_with_fragment_resolves_to_chapter_start() {
        let mut engine = ScriptedEngine::new();
        let manifest = BookManifest::uniform("Sample", 3, 1000);
        let (_, rendition) = open(&mut engine, &manifest);
        engine.display(rendition, Some("chapter03.xhtml#part2")).unwrap();
        assert_eq!(engine.view(rendition).unwrap().chapter_index, 2);
        assert!(matches!(
            engine.display(rendition, Some("missing.xhtml")),
            Err(EngineError::BadTarget(_))
        ));
    }

    #[test]
    fn locations_map_both_ways() {
        let mut engine = ScriptedEngine::new();
        let manifest = BookManifest::uniform("Sample", 2, 3300);
        let (book, _) = open(&mut engine, &manifest);
        engine.on(
            EventSource::Book(book),
            EventKind::LocationsGenerated,
            listener(1),
        );
        engine.generate_locations(book, 1650).unwrap();
        let events = drain(&mut engine);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload, EventPayload::Generated(Ok(4)));

        for i in 0..4 {
            let cfi = engine.cfi_from_location(book, i).unwrap();
            assert_eq!(engine.location_from_cfi(book, &cfi), Some(i));
        }
        // Mid-location positions map to the location that contains them.
        let mid = Position { chapter: 1, offset: 2000 }.cfi();
        assert_eq!(engine.location_from_cfi(book, &mid), Some(3));
        assert_eq!(engine.cfi_from_location(book, 4), None);
    }

    #[test]
    fn destroy_book_drops_pending_notifications() {
        let mut engine = ScriptedEngine::new();
        let manifest = BookManifest::uniform("Sample", 2, 3300);
        let (book, _) = open(&mut engine, &manifest);
        engine.on(EventSource::Book(book), EventKind::Ready, listener(1));
        engine.destroy_book(book);
        assert!(drain(&mut engine).is_empty());
        assert_eq!(engine.live_books(), 0);
    }
}
