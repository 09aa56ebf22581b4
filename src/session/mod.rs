//! Reading session state machine.
//!
//! A [`ReadingSession`] owns at most one book/rendition pair on a rendering
//! engine and everything derived from it: title, contents, location index,
//! navigation position, presentation settings and menu state. Engine work
//! completes asynchronously; [`ReadingSession::pump`] drains the engine's
//! notifications and applies them.
//!
//! Loading flows one way:
//!
//! ```text
//! bytes ─► open_book ─► render_to/themes/display ─► ready ─► generate_locations
//!                                     │                          │
//!                               rendered (once)           progress … generated
//! ```
//!
//! Every load and every close bumps the session [`Generation`]. Listener ids
//! carry the generation they were registered under, so notifications that
//! belong to an earlier book are dropped instead of leaking into the current
//! one.

mod gesture;
mod locations;
mod navigation;
mod settings;
mod subscriptions;

pub use gesture::SwipeTracker;
pub use locations::LocationIndex;
pub use navigation::Direction;
pub use settings::{FontSize, LineHeight, ReaderSettings};

use std::io::Read;
use std::path::Path;

use log::{debug, info, warn};

use crate::config::ReaderConfig;
use crate::engine::{
    BookHandle, Cfi, DisplayTarget, EngineError, EngineEvent, EventKind, EventPayload,
    EventSource, Generation, RenderingEngine, RenditionHandle, RenditionOptions, TocEntry,
};
use crate::error::SessionError;
use crate::theme::Theme;

use settings::Viewport;
use subscriptions::Subscriptions;

/// Localization keys of a user-visible notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notice {
    pub title_key: &'static str,
    pub description_key: &'static str,
}

impl Notice {
    pub const FILE_READ: Notice = Notice {
        title_key: "error.reading_file_title",
        description_key: "error.reading_file_error_description",
    };
    pub const BOOK_LOAD: Notice = Notice {
        title_key: "error.loading_book_title",
        description_key: "error.loading_book_description",
    };
}

/// Coarse lifecycle state, for choosing what to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No book; the upload screen.
    Idle,
    /// A book is open but not yet rendered or indexed; the loading overlay.
    Preparing,
    Reading,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MenuTab {
    #[default]
    Contents,
    Settings,
}

#[derive(Debug, Default)]
struct MenuState {
    open: bool,
    tab: MenuTab,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct NavPosition {
    current_page: usize,
    total_pages: usize,
    at_start: bool,
    at_end: bool,
    last_cfi: Option<Cfi>,
}

impl Default for NavPosition {
    fn default() -> Self {
        Self {
            current_page: 0,
            total_pages: 0,
            at_start: true,
            at_end: false,
            last_cfi: None,
        }
    }
}

#[derive(Debug)]
struct ActiveBook {
    book: BookHandle,
    rendition: Option<RenditionHandle>,
    title: Option<String>,
    toc: Vec<TocEntry>,
    position: NavPosition,
    index: LocationIndex,
    rendered: bool,
}

impl ActiveBook {
    fn new(book: BookHandle) -> Self {
        Self {
            book,
            rendition: None,
            title: None,
            toc: Vec::new(),
            position: NavPosition::default(),
            index: LocationIndex::NotStarted,
            rendered: false,
        }
    }
}

pub struct ReadingSession<E: RenderingEngine> {
    engine: E,
    surface: DisplayTarget,
    config: ReaderConfig,
    theme: &'static Theme,
    generation: Generation,
    subs: Subscriptions,
    active: Option<ActiveBook>,
    settings: ReaderSettings,
    viewport: Viewport,
    menu: MenuState,
    page_input: String,
    swipe: SwipeTracker,
    notices: Vec<Notice>,
}

/// The `.epub` filter of the file picker. Only the extension is checked;
/// whether the bytes are a book is up to the engine.
pub fn accepts_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("epub"))
}

impl<E: RenderingEngine> ReadingSession<E> {
    pub fn new(
        engine: E,
        surface: DisplayTarget,
        config: ReaderConfig,
        theme: &'static Theme,
    ) -> Self {
        let viewport = Viewport::default();
        Self {
            engine,
            surface,
            settings: ReaderSettings::initial(&config, viewport.is_mobile),
            config,
            theme,
            generation: Generation::default(),
            subs: Subscriptions::default(),
            active: None,
            viewport,
            menu: MenuState::default(),
            page_input: String::new(),
            swipe: SwipeTracker::default(),
            notices: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    /// Read `reader` to the end and load the bytes as a book.
    pub fn load_file<R: Read>(&mut self, mut reader: R) -> Result<(), SessionError> {
        let mut buf = Vec::new();
        if let Err(e) = reader.read_to_end(&mut buf) {
            return Err(self.read_failed(e));
        }
        self.load_bytes(buf)
    }

    pub fn load_path(&mut self, path: &Path) -> Result<(), SessionError> {
        info!("session: loading {}", path.display());
        match std::fs::read(path) {
            Ok(bytes) => self.load_bytes(bytes),
            Err(e) => Err(self.read_failed(e)),
        }
    }

    /// Hand `bytes` to the engine. Format problems are not detected here;
    /// they arrive later as a failed `ready` notification.
    pub fn load_bytes(&mut self, bytes: Vec<u8>) -> Result<(), SessionError> {
        self.close_book();
        self.generation = self.generation.next();
        self.settings = ReaderSettings::initial(&self.config, self.viewport.is_mobile);
        self.page_input.clear();
        info!(
            "session: opening book ({} bytes, generation={})",
            bytes.len(),
            self.generation.0
        );

        let book = match self.engine.open_book(bytes) {
            Ok(book) => book,
            Err(e) => return Err(self.fail_load(e)),
        };
        self.active = Some(ActiveBook::new(book));
        self.subs.subscribe(
            &mut self.engine,
            self.generation,
            EventSource::Book(book),
            EventKind::Ready,
        );

        if let Err(e) = self.attach(book) {
            return Err(self.fail_load(e));
        }
        Ok(())
    }

    /// Create the rendition, style it and show the start of the book.
    fn attach(&mut self, book: BookHandle) -> Result<(), EngineError> {
        let options = RenditionOptions::paginated(self.settings.spread);
        let rendition = self.engine.render_to(book, &self.surface, &options)?;
        if let Some(active) = self.active.as_mut() {
            active.rendition = Some(rendition);
        }
        debug!(
            "session: attached rendition {:?} to '{}' (spread={})",
            rendition, self.surface.id, options.spread
        );

        // Themes go in before the first display.
        self.engine.register_theme(rendition, self.theme)?;
        self.engine.select_theme(rendition, self.theme.name)?;
        self.apply_typography(rendition);

        let source = EventSource::Rendition(rendition);
        for kind in [
            EventKind::Rendered,
            EventKind::Relocated,
            EventKind::TouchStart,
            EventKind::TouchMove,
            EventKind::TouchEnd,
        ] {
            self.subs.subscribe(&mut self.engine, self.generation, source, kind);
        }

        // A book that fails to open reports it through `ready`; that path
        // does the teardown.
        if let Err(e) = self.engine.display(rendition, None) {
            warn!("session: initial display failed: {e}");
        }
        Ok(())
    }

    fn on_book_ready(&mut self) -> Result<(), EngineError> {
        let Some(book) = self.book() else {
            return Ok(());
        };
        let metadata = self.engine.metadata(book)?;
        info!(
            "session: book ready, title={:?}, {} contents entries",
            metadata.title,
            metadata.toc.len()
        );
        if let Some(active) = self.active.as_mut() {
            active.title = metadata.title;
            active.toc = metadata.toc;
        }
        self.subs.unsubscribe_kind(&mut self.engine, EventKind::Ready);
        self.start_index_build()
    }

    fn read_failed(&mut self, e: std::io::Error) -> SessionError {
        warn!("session: failed to read book file: {e}");
        self.close_book();
        self.notices.push(Notice::FILE_READ);
        SessionError::FileRead(e)
    }

    /// Tear down a half-loaded book and tell the user.
    fn fail_load(&mut self, e: EngineError) -> SessionError {
        warn!("session: failed to load book: {e}");
        self.close_book();
        self.notices.push(Notice::BOOK_LOAD);
        SessionError::BookLoad(e)
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------

    /// Release listeners, then the rendition, then the book. Back to idle.
    pub fn close_book(&mut self) {
        self.menu.open = false;
        self.subs.clear(&mut self.engine);
        if let Some(active) = self.active.take() {
            if let Some(rendition) = active.rendition {
                self.engine.destroy_rendition(rendition);
            }
            self.engine.destroy_book(active.book);
            info!("session: closed book {:?}", active.book);
        }
        self.page_input.clear();
        self.swipe.reset();
        self.generation = self.generation.next();
    }

    // -----------------------------------------------------------------------
    // Event dispatch
    // -----------------------------------------------------------------------

    /// Drain pending engine notifications. Returns how many were applied.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.engine.poll_event() {
            if self.handle_event(event) {
                handled += 1;
            }
        }
        handled
    }

    /// Apply one notification. Returns false for stale or unknown listeners.
    pub fn handle_event(&mut self, event: EngineEvent) -> bool {
        let listener = event.listener;
        if listener.generation != self.generation {
            debug!(
                "session: dropping stale event from generation {} (current {})",
                listener.generation.0, self.generation.0
            );
            return false;
        }
        let Some(kind) = self.subs.kind_of(listener) else {
            debug!("session: dropping event for unsubscribed listener {listener:?}");
            return false;
        };

        match (kind, event.payload) {
            (EventKind::Ready, EventPayload::Ready(Ok(()))) => {
                if let Err(e) = self.on_book_ready() {
                    self.fail_load(e);
                }
            }
            (EventKind::Ready, EventPayload::Ready(Err(e))) => {
                self.fail_load(e);
            }
            (EventKind::Rendered, EventPayload::Rendered) => {
                if let Some(active) = self.active.as_mut()
                    && !active.rendered
                {
                    active.rendered = true;
                    debug!("session: first render done");
                }
                self.subs.unsubscribe(&mut self.engine, listener);
            }
            (EventKind::Relocated, EventPayload::Relocated(location)) => {
                self.on_location_changed(location);
            }
            (EventKind::TouchStart, EventPayload::Touch(point)) => self.swipe.start(point),
            (EventKind::TouchMove, EventPayload::Touch(point)) => self.swipe.moved(point),
            (EventKind::TouchEnd, EventPayload::Touch(_)) => {
                if let Some(direction) = self.swipe.end(self.config.swipe_threshold_px) {
                    debug!("session: swipe {direction:?}");
                    self.go_to_adjacent(direction);
                }
            }
            (EventKind::LocationsProgress, EventPayload::Progress(fraction)) => {
                self.on_index_progress(fraction);
            }
            (EventKind::LocationsGenerated, EventPayload::Generated(result)) => {
                self.on_index_generated(result);
            }
            (kind, payload) => {
                warn!(
                    "session: unexpected payload {payload:?} for {} listener",
                    kind.name()
                );
                return false;
            }
        }
        true
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn title(&self) -> Option<&str> {
        self.active.as_ref().and_then(|a| a.title.as_deref())
    }

    pub fn toc(&self) -> &[TocEntry] {
        self.active.as_ref().map_or(&[], |a| a.toc.as_slice())
    }

    /// 1-based page of the current position; 0 until the index is ready.
    pub fn current_page(&self) -> usize {
        self.active.as_ref().map_or(0, |a| a.position.current_page)
    }

    pub fn total_pages(&self) -> usize {
        self.active.as_ref().map_or(0, |a| a.position.total_pages)
    }

    pub fn at_start(&self) -> bool {
        self.active.as_ref().is_none_or(|a| a.position.at_start)
    }

    pub fn at_end(&self) -> bool {
        self.active.as_ref().is_some_and(|a| a.position.at_end)
    }

    pub fn last_cfi(&self) -> Option<&Cfi> {
        self.active.as_ref().and_then(|a| a.position.last_cfi.as_ref())
    }

    pub fn location_index(&self) -> LocationIndex {
        self.active.as_ref().map_or(LocationIndex::NotStarted, |a| a.index)
    }

    pub fn locations_ready(&self) -> bool {
        self.location_index().is_ready()
    }

    /// Index build progress, 0..=100.
    pub fn loading_progress(&self) -> u8 {
        self.location_index().progress()
    }

    pub fn is_book_loaded(&self) -> bool {
        self.active.is_some()
    }

    pub fn is_rendered(&self) -> bool {
        self.active.as_ref().is_some_and(|a| a.rendered)
    }

    /// A book is open but its location index is not ready yet.
    pub fn is_processing(&self) -> bool {
        self.active.is_some() && !self.locations_ready()
    }

    pub fn phase(&self) -> Phase {
        match &self.active {
            None => Phase::Idle,
            Some(a) if a.rendered && a.index.is_ready() => Phase::Reading,
            Some(_) => Phase::Preparing,
        }
    }

    pub fn rendition(&self) -> Option<RenditionHandle> {
        self.active.as_ref().and_then(|a| a.rendition)
    }

    pub fn book(&self) -> Option<BookHandle> {
        self.active.as_ref().map(|a| a.book)
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn listener_count(&self) -> usize {
        self.subs.len()
    }

    pub fn theme(&self) -> &'static Theme {
        self.theme
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    // -----------------------------------------------------------------------
    // Menu
    // -----------------------------------------------------------------------

    pub fn menu_open(&self) -> bool {
        self.menu.open
    }

    pub fn menu_tab(&self) -> MenuTab {
        self.menu.tab
    }

    pub fn open_menu(&mut self, tab: MenuTab) {
        self.menu.open = true;
        self.menu.tab = tab;
    }

    pub fn close_menu(&mut self) {
        self.menu.open = false;
    }

    pub fn toggle_menu(&mut self) {
        self.menu.open = !self.menu.open;
    }

    pub fn set_menu_tab(&mut self, tab: MenuTab) {
        self.menu.tab = tab;
    }
}
