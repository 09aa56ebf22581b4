//! Viewer key mapping: upload prompt, page box, and the viewer-level keys
//! layered on top of the reader shortcuts.
//!
//! Pure logic, no I/O.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::session::MenuTab;

/// Keys on the upload screen (typing a path).
#[derive(Debug, PartialEq, Eq)]
pub(super) enum UploadAction {
    Type(char),
    Backspace,
    Submit,
    Quit,
}

pub(super) fn map_upload_key(key: KeyEvent) -> Option<UploadAction> {
    let KeyEvent { code, modifiers, .. } = key;
    match (code, modifiers) {
        (KeyCode::Esc, _) | (KeyCode::Char('c'), KeyModifiers::CONTROL) => {
            Some(UploadAction::Quit)
        }
        (KeyCode::Enter, _) => Some(UploadAction::Submit),
        (KeyCode::Backspace, _) => Some(UploadAction::Backspace),
        (KeyCode::Char(c), m) if !m.contains(KeyModifiers::CONTROL) => Some(UploadAction::Type(c)),
        _ => None,
    }
}

/// Keys while the page box has focus.
#[derive(Debug, PartialEq, Eq)]
pub(super) enum PageInputAction {
    Type(char),
    Backspace,
    /// Enter.
    Submit,
    /// Tab moves focus out of the box; submits like a browser blur.
    Blur,
    /// Esc: drop the typed text without navigating.
    Cancel,
}

pub(super) fn map_page_input_key(key: KeyEvent) -> Option<PageInputAction> {
    match key.code {
        KeyCode::Enter => Some(PageInputAction::Submit),
        KeyCode::Tab => Some(PageInputAction::Blur),
        KeyCode::Esc => Some(PageInputAction::Cancel),
        KeyCode::Backspace => Some(PageInputAction::Backspace),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(PageInputAction::Type(c))
        }
        _ => None,
    }
}

/// Viewer-level keys while reading. Anything else goes to the reader
/// shortcuts.
#[derive(Debug, PartialEq, Eq)]
pub(super) enum ViewerAction {
    Quit,
    FocusPageInput,
    MenuUp,
    MenuDown,
    MenuSelect,
    SwitchTab,
    ToggleSpread,
    ReadNewBook,
}

pub(super) fn map_reading_key(
    key: KeyEvent,
    menu_open: bool,
    tab: MenuTab,
) -> Option<ViewerAction> {
    let KeyEvent { code, modifiers, .. } = key;

    match (code, modifiers) {
        (KeyCode::Char('q'), _) | (KeyCode::Char('c'), KeyModifiers::CONTROL) => {
            Some(ViewerAction::Quit)
        }
        (KeyCode::Char('g'), KeyModifiers::NONE) => Some(ViewerAction::FocusPageInput),
        _ if !menu_open => None,

        (KeyCode::Up | KeyCode::Char('k'), _) => Some(ViewerAction::MenuUp),
        (KeyCode::Down | KeyCode::Char('j'), _) => Some(ViewerAction::MenuDown),
        (KeyCode::Enter, _) if tab == MenuTab::Contents => Some(ViewerAction::MenuSelect),
        (KeyCode::Tab, _) => Some(ViewerAction::SwitchTab),
        (KeyCode::Char('s'), _) if tab == MenuTab::Settings => Some(ViewerAction::ToggleSpread),
        (KeyCode::Char('n'), _) => Some(ViewerAction::ReadNewBook),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEventKind, KeyEventState};

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        }
    }

    fn simple_key(code: KeyCode) -> KeyEvent {
        key(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_upload_typing() {
        assert_eq!(map_upload_key(simple_key(KeyCode::Char('/'))), Some(UploadAction::Type('/')));
        assert_eq!(map_upload_key(simple_key(KeyCode::Enter)), Some(UploadAction::Submit));
        assert_eq!(map_upload_key(simple_key(KeyCode::Esc)), Some(UploadAction::Quit));
        let ctrl_c = key(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(map_upload_key(ctrl_c), Some(UploadAction::Quit));
    }

    #[test]
    fn test_page_input_blur_and_submit() {
        assert_eq!(
            map_page_input_key(simple_key(KeyCode::Char('4'))),
            Some(PageInputAction::Type('4'))
        );
        assert_eq!(map_page_input_key(simple_key(KeyCode::Enter)), Some(PageInputAction::Submit));
        assert_eq!(map_page_input_key(simple_key(KeyCode::Tab)), Some(PageInputAction::Blur));
        assert_eq!(map_page_input_key(simple_key(KeyCode::Esc)), Some(PageInputAction::Cancel));
        assert_eq!(map_page_input_key(simple_key(KeyCode::Right)), None);
    }

    #[test]
    fn test_q_quits_with_menu_closed() {
        let a = map_reading_key(simple_key(KeyCode::Char('q')), false, MenuTab::Contents);
        assert_eq!(a, Some(ViewerAction::Quit));
    }

    #[test]
    fn test_menu_keys_need_open_menu() {
        let down = simple_key(KeyCode::Down);
        assert_eq!(map_reading_key(down, false, MenuTab::Contents), None);
        assert_eq!(map_reading_key(down, true, MenuTab::Contents), Some(ViewerAction::MenuDown));
    }

    #[test]
    fn test_enter_selects_only_in_contents() {
        let enter = simple_key(KeyCode::Enter);
        assert_eq!(map_reading_key(enter, true, MenuTab::Contents), Some(ViewerAction::MenuSelect));
        assert_eq!(map_reading_key(enter, true, MenuTab::Settings), None);
    }

    #[test]
    fn test_spread_toggle_only_in_settings() {
        let s = simple_key(KeyCode::Char('s'));
        assert_eq!(map_reading_key(s, true, MenuTab::Settings), Some(ViewerAction::ToggleSpread));
        assert_eq!(map_reading_key(s, true, MenuTab::Contents), None);
    }

    #[test]
    fn test_reader_keys_fall_through() {
        assert_eq!(map_reading_key(simple_key(KeyCode::Right), false, MenuTab::Contents), None);
        assert_eq!(map_reading_key(simple_key(KeyCode::Char('t')), true, MenuTab::Contents), None);
    }
}
