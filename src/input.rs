//! Reader keyboard shortcuts.
//!
//! Pure logic, no I/O: a key event plus a little context becomes an
//! [`Action`] for [`ReadingSession::apply_action`](crate::session::ReadingSession::apply_action).

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    NextPage,
    PrevPage,
    ToggleMenu,
    FontSizeUp,
    FontSizeDown,
    LineHeightUp,
    LineHeightDown,
    /// Escape: close the menu and any other overlay.
    CloseOverlays,
}

/// What the key handler needs to know about the surrounding UI.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyContext {
    pub book_loaded: bool,
    /// A text field (the page box) has focus.
    pub input_focused: bool,
}

/// (keys, description) pairs for help screens.
pub const KEY_HELP: &[(&str, &str)] = &[
    ("→ / ←", "next / previous page"),
    ("t", "toggle contents and settings menu"),
    ("+ / -", "font size up / down"),
    ("] / [", "line height up / down"),
    ("Esc", "close menu"),
];

/// Map a key event to an `Action`.
///
/// Escape always closes overlays, even while the page box has focus. Every
/// other shortcut needs a loaded book, an unfocused text field and no
/// ctrl/alt/meta modifier.
pub fn map_key_event(key: KeyEvent, ctx: KeyContext) -> Option<Action> {
    let KeyEvent { code, modifiers, .. } = key;

    if code == KeyCode::Esc {
        return Some(Action::CloseOverlays);
    }
    if !ctx.book_loaded || ctx.input_focused {
        return None;
    }
    let chord =
        KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER | KeyModifiers::META;
    if modifiers.intersects(chord) {
        return None;
    }

    match code {
        KeyCode::Right => Some(Action::NextPage),
        KeyCode::Left => Some(Action::PrevPage),
        KeyCode::Char('t' | 'T') => Some(Action::ToggleMenu),
        // `=` is `+` without shift on most layouts
        KeyCode::Char('+' | '=') => Some(Action::FontSizeUp),
        KeyCode::Char('-') => Some(Action::FontSizeDown),
        KeyCode::Char(']') => Some(Action::LineHeightUp),
        KeyCode::Char('[') => Some(Action::LineHeightDown),
        _ => None,
    }
}
