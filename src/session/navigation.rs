//! Navigation: adjacent pages, contents entries, typed page numbers, and the
//! engine's location-changed feedback.

use crossterm::event::KeyEvent;
use log::{debug, warn};

use crate::engine::{Cfi, Location, RenderingEngine, RenditionHandle};
use crate::error::{NavigationInputError, Result};
use crate::input::{Action, KeyContext, map_key_event};

use super::{LocationIndex, ReadingSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Prev,
    Next,
}

impl<E: RenderingEngine> ReadingSession<E> {
    /// Turn one page. No-op at the corresponding boundary or without a rendition.
    pub fn go_to_adjacent(&mut self, direction: Direction) -> bool {
        let Some(active) = &self.active else {
            return false;
        };
        let Some(rendition) = active.rendition else {
            return false;
        };
        let blocked = match direction {
            Direction::Prev => active.position.at_start,
            Direction::Next => active.position.at_end,
        };
        if blocked {
            debug!("navigation: {direction:?} blocked at boundary");
            return false;
        }
        let result = match direction {
            Direction::Prev => self.engine.prev(rendition),
            Direction::Next => self.engine.next(rendition),
        };
        if let Err(e) = result {
            warn!("navigation: {direction:?} failed: {e}");
            return false;
        }
        true
    }

    /// Whether the prev/next control should be enabled.
    pub fn can_go(&self, direction: Direction) -> bool {
        let Some(active) = &self.active else {
            return false;
        };
        if !active.index.is_ready() {
            return false;
        }
        match direction {
            Direction::Prev => !active.position.at_start,
            Direction::Next => !active.position.at_end,
        }
    }

    /// Jump to a contents entry and close the menu.
    pub fn go_to_toc_entry(&mut self, href: &str) -> bool {
        let Some(rendition) = self.rendition() else {
            return false;
        };
        debug!("navigation: contents entry {href}");
        if let Err(e) = self.engine.display(rendition, Some(href)) {
            warn!("navigation: display {href} failed: {e}");
        }
        self.close_menu();
        true
    }

    pub fn go_to_toc_index(&mut self, index: usize) -> bool {
        let Some(href) = self.toc().get(index).map(|e| e.href.clone()) else {
            return false;
        };
        self.go_to_toc_entry(&href)
    }

    /// Jump to a 1-based page number typed by the user.
    ///
    /// Invalid input restores the page field to the current page and returns
    /// [`NavigationInputError`]; no notice is raised.
    pub fn go_to_page_number(&mut self, input: &str) -> Result<()> {
        let outcome = self.resolve_page(input).and_then(|(rendition, page, cfi)| {
            debug!("navigation: page {page} -> {cfi}");
            self.engine
                .display(rendition, Some(cfi.as_str()))
                .map_err(|e| {
                    warn!("navigation: display {cfi} failed: {e}");
                    NavigationInputError::Unresolved(page)
                })
        });
        if let Err(e) = outcome {
            debug!("navigation: rejected page input '{input}': {e}");
            self.page_input = self.current_page().to_string();
            return Err(e.into());
        }
        Ok(())
    }

    fn resolve_page(
        &self,
        input: &str,
    ) -> std::result::Result<(RenditionHandle, usize, Cfi), NavigationInputError> {
        let trimmed = input.trim();
        let page: i64 = trimmed
            .parse()
            .map_err(|_| NavigationInputError::NotANumber(trimmed.to_string()))?;
        let active = self
            .active
            .as_ref()
            .ok_or(NavigationInputError::IndexNotReady)?;
        let LocationIndex::Ready { total } = active.index else {
            return Err(NavigationInputError::IndexNotReady);
        };
        if page < 1 || page as u64 > total as u64 {
            return Err(NavigationInputError::OutOfRange { page, total });
        }
        let page = page as usize;
        let rendition = active.rendition.ok_or(NavigationInputError::IndexNotReady)?;
        let cfi = self
            .engine
            .cfi_from_location(active.book, page - 1)
            .ok_or(NavigationInputError::Unresolved(page))?;
        Ok((rendition, page, cfi))
    }

    pub fn page_input(&self) -> &str {
        &self.page_input
    }

    pub fn set_page_input(&mut self, text: impl Into<String>) {
        self.page_input = text.into();
    }

    /// Enter/blur on the page field.
    pub fn submit_page_input(&mut self) -> Result<()> {
        let input = self.page_input.clone();
        self.go_to_page_number(&input)
    }

    pub fn page_input_enabled(&self) -> bool {
        self.locations_ready()
    }

    /// The engine's relocation notification. The only place position changes.
    pub fn on_location_changed(&mut self, location: Location) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        active.position.at_start = location.at_start;
        active.position.at_end = location.at_end;
        if let Some(cfi) = location.start {
            active.position.last_cfi = Some(cfi);
        }
        self.refresh_current_page();
    }

    /// Map the retained CFI to a page number, once the index exists.
    pub(super) fn refresh_current_page(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if !active.index.is_ready() {
            return;
        }
        let Some(cfi) = &active.position.last_cfi else {
            return;
        };
        if let Some(index) = self.engine.location_from_cfi(active.book, cfi) {
            active.position.current_page = index + 1;
            self.page_input = (index + 1).to_string();
        }
    }

    /// Map a key through the reader shortcuts and apply it.
    pub fn handle_key(&mut self, key: KeyEvent, input_focused: bool) -> Option<Action> {
        let ctx = KeyContext {
            book_loaded: self.is_book_loaded(),
            input_focused,
        };
        let action = map_key_event(key, ctx)?;
        self.apply_action(action);
        Some(action)
    }

    /// Apply a keyboard action produced by [`crate::input::map_key_event`].
    pub fn apply_action(&mut self, action: Action) {
        debug!("navigation: action {action:?}");
        match action {
            Action::NextPage => {
                self.go_to_adjacent(Direction::Next);
            }
            Action::PrevPage => {
                self.go_to_adjacent(Direction::Prev);
            }
            Action::ToggleMenu => self.toggle_menu(),
            Action::FontSizeUp => self.set_font_size(self.settings.font_size.larger()),
            Action::FontSizeDown => self.set_font_size(self.settings.font_size.smaller()),
            Action::LineHeightUp => self.set_line_height(self.settings.line_height.taller()),
            Action::LineHeightDown => self.set_line_height(self.settings.line_height.shorter()),
            Action::CloseOverlays => self.close_menu(),
        }
    }
}
