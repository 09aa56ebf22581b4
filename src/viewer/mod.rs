//! Interactive terminal reader.
//!
//! Screens:
//!   Upload   : path prompt (the file picker)
//!   Reading  : page view, loading overlay while the location index builds,
//!              menu panel (contents / settings) toggled with `t`
//!   row rows-1 : status bar (title, page n of N, typography, flash messages)
//!
//! The viewer drives a [`ReadingSession`] over the scripted engine. Each loop
//! iteration drains engine notifications with `pump()`, turns session notices
//! into localized flash messages, and redraws when anything changed.

mod input;
mod state;
mod terminal;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyEvent, KeyEventKind},
    terminal as crossterm_terminal,
};
use log::{debug, info, warn};

use crate::config::Config;
use crate::engine::scripted::ScriptedEngine;
use crate::engine::{DisplayTarget, Spread};
use crate::i18n::Localizer;
use crate::session::{Direction, MenuTab, Notice, Phase, ReadingSession, accepts_file};
use crate::theme;

use input::{
    PageInputAction, UploadAction, ViewerAction, map_page_input_key, map_reading_key,
    map_upload_key,
};
use state::{Layout, ViewerMode, ViewerState};
use terminal::{MenuLine, MenuPanel, UploadScreen};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

type Session = ReadingSession<ScriptedEngine>;

/// Run the terminal reader, optionally opening `book` right away.
pub fn run(config: Config, book: Option<PathBuf>) -> anyhow::Result<()> {
    terminal::check_tty()?;

    let theme = theme::get(&config.theme)
        .ok_or_else(|| anyhow::anyhow!("unknown theme '{}'", config.theme))?;
    let mut i18n = Localizer::new(config.locales_dir.clone());
    i18n.set_locale(&config.locale);

    let mut session = ReadingSession::new(
        ScriptedEngine::new(),
        DisplayTarget::new("viewer"),
        config.reader.clone(),
        theme,
    );

    let winsize = crossterm_terminal::window_size()
        .map_err(|e| anyhow::anyhow!("failed to get terminal size: {e}"))?;
    let mut layout = state::compute_layout(winsize.columns, winsize.rows, winsize.width);
    session.set_viewport_width(layout.viewport_px);

    let mut guard = terminal::RawGuard::enter()?;
    let mut vs = ViewerState::new();

    if let Some(path) = book {
        open_book(&mut session, &mut vs, &i18n, &path);
    }

    let mut dirty = true;
    loop {
        if session.pump() > 0 {
            dirty = true;
        }
        if collect_notices(&mut session, &mut vs, &i18n) {
            dirty = true;
        }
        if sync_mode(&session, &mut vs) {
            dirty = true;
        }
        if dirty {
            redraw(&layout, &session, &vs, &i18n)?;
            dirty = false;
        }

        if !event::poll(POLL_INTERVAL)? {
            continue;
        }
        let ev = event::read()?;
        debug!("event: {:?}", ev);
        match ev {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                vs.flash = None;
                if handle_key(key, &mut session, &mut vs, &i18n) {
                    break;
                }
                dirty = true;
            }
            Event::Resize(cols, rows) => {
                let px = crossterm_terminal::window_size()
                    .map(|w| w.width)
                    .unwrap_or(0);
                layout = state::compute_layout(cols, rows, px);
                session.set_viewport_width(layout.viewport_px);
                dirty = true;
            }
            _ => {}
        }
    }

    session.close_book();
    guard.cleanup();
    Ok(())
}

fn open_book(session: &mut Session, vs: &mut ViewerState, i18n: &Localizer, path: &Path) {
    if !accepts_file(path) {
        vs.flash = Some(i18n.t("app.not_epub"));
        return;
    }
    // Failures raise notices; collect_notices shows them.
    if let Err(e) = session.load_path(path) {
        warn!("viewer: {e}");
        return;
    }
    info!("viewer: opened {}", path.display());
    vs.mode = ViewerMode::Reading;
    vs.toc_cursor = 0;
}

fn collect_notices(session: &mut Session, vs: &mut ViewerState, i18n: &Localizer) -> bool {
    let Some(notice) = session.take_notices().pop() else {
        return false;
    };
    let mut flash = format!(
        "{}: {}",
        i18n.t(notice.title_key),
        i18n.t(notice.description_key)
    );
    if notice == Notice::BOOK_LOAD {
        flash.push(' ');
        flash.push_str(&i18n.t("app.engine_note"));
    }
    vs.flash = Some(flash);
    true
}

/// A failed load returns to the upload screen.
fn sync_mode(session: &Session, vs: &mut ViewerState) -> bool {
    if session.phase() == Phase::Idle && vs.mode != ViewerMode::Upload {
        vs.mode = ViewerMode::Upload;
        return true;
    }
    if vs.mode == ViewerMode::PageInput && !session.page_input_enabled() {
        vs.mode = ViewerMode::Reading;
        return true;
    }
    false
}

/// Returns true when the viewer should quit.
fn handle_key(
    key: KeyEvent,
    session: &mut Session,
    vs: &mut ViewerState,
    i18n: &Localizer,
) -> bool {
    match vs.mode {
        ViewerMode::Upload => match map_upload_key(key) {
            Some(UploadAction::Quit) => return true,
            Some(UploadAction::Type(c)) => vs.upload_input.push(c),
            Some(UploadAction::Backspace) => {
                vs.upload_input.pop();
            }
            Some(UploadAction::Submit) => {
                let path = PathBuf::from(vs.upload_input.trim());
                open_book(session, vs, i18n, &path);
            }
            None => {}
        },

        ViewerMode::PageInput => match map_page_input_key(key) {
            Some(PageInputAction::Type(c)) if c.is_ascii_digit() => {
                let mut text = session.page_input().to_string();
                text.push(c);
                session.set_page_input(text);
            }
            Some(PageInputAction::Type(_)) => {}
            Some(PageInputAction::Backspace) => {
                let mut text = session.page_input().to_string();
                text.pop();
                session.set_page_input(text);
            }
            Some(PageInputAction::Submit) => submit_page(session),
            Some(PageInputAction::Blur) => {
                if session.page_input().is_empty() {
                    session.set_page_input(session.current_page().to_string());
                } else {
                    submit_page(session);
                }
                vs.mode = ViewerMode::Reading;
                session.close_menu();
            }
            Some(PageInputAction::Cancel) => {
                session.set_page_input(session.current_page().to_string());
                vs.mode = ViewerMode::Reading;
                session.close_menu();
            }
            None => {}
        },

        ViewerMode::Reading => {
            match map_reading_key(key, session.menu_open(), session.menu_tab()) {
                Some(action) => return apply_viewer_action(action, session, vs),
                None => {
                    session.handle_key(key, false);
                }
            }
        }
    }
    false
}

/// Rejected input only resets the field; there is no message.
fn submit_page(session: &mut Session) {
    if let Err(e) = session.submit_page_input() {
        debug!("viewer: page input rejected: {e}");
    }
}

fn apply_viewer_action(
    action: ViewerAction,
    session: &mut Session,
    vs: &mut ViewerState,
) -> bool {
    match action {
        ViewerAction::Quit => return true,
        ViewerAction::FocusPageInput => {
            if session.page_input_enabled() {
                session.set_page_input("");
                vs.mode = ViewerMode::PageInput;
            }
        }
        ViewerAction::MenuUp => vs.move_cursor(true, session.toc().len()),
        ViewerAction::MenuDown => vs.move_cursor(false, session.toc().len()),
        ViewerAction::MenuSelect => {
            session.go_to_toc_index(vs.toc_cursor);
        }
        ViewerAction::SwitchTab => {
            let next = match session.menu_tab() {
                MenuTab::Contents => MenuTab::Settings,
                MenuTab::Settings => MenuTab::Contents,
            };
            session.set_menu_tab(next);
        }
        ViewerAction::ToggleSpread => {
            let next = match session.settings().spread {
                Spread::Auto => Spread::None,
                Spread::None => Spread::Auto,
            };
            session.set_spread(next);
        }
        ViewerAction::ReadNewBook => {
            session.close_book();
            vs.upload_input.clear();
            vs.mode = ViewerMode::Upload;
        }
    }
    false
}

// ---------------------------------------------------------------------------
// Drawing
// ---------------------------------------------------------------------------

fn redraw(
    layout: &Layout,
    session: &Session,
    vs: &ViewerState,
    i18n: &Localizer,
) -> anyhow::Result<()> {
    terminal::clear_screen()?;

    if vs.mode == ViewerMode::Upload {
        let (title, tagline) = (i18n.t("app.title"), i18n.t("app.tagline"));
        let (prompt, hint) = (i18n.t("app.upload_prompt"), i18n.t("app.upload_hint"));
        let note = i18n.t("app.engine_note");
        terminal::draw_upload(
            layout,
            &UploadScreen {
                title: &title,
                tagline: &tagline,
                prompt: &prompt,
                hint: &hint,
                note: &note,
                input: &vs.upload_input,
            },
        )?;
        let status = vs.flash.clone().unwrap_or_else(|| i18n.t("app.upload"));
        terminal::draw_status_bar(layout, &format!(" {status}"))?;
        return Ok(());
    }

    let title = session
        .title()
        .map_or_else(|| i18n.t("reader.loading"), str::to_string);
    if let Some(view) = session.rendition().and_then(|r| session.engine().view(r)) {
        terminal::draw_page(layout, &title, &view)?;
    }
    if shows_loading_overlay(session) {
        let label = i18n.t("reader.preparing_book");
        terminal::draw_progress(layout, &label, session.loading_progress())?;
    }
    if session.menu_open() {
        terminal::draw_menu(layout, &menu_panel(session, vs, i18n))?;
    }
    terminal::draw_status_bar(layout, &status_line(session, vs, i18n, &title))?;
    Ok(())
}

/// The overlay stays up until the first render and the location index are
/// both done.
fn shows_loading_overlay(session: &Session) -> bool {
    session.phase() == Phase::Preparing
}

fn menu_panel(session: &Session, vs: &ViewerState, i18n: &Localizer) -> MenuPanel {
    let tab = session.menu_tab();
    let lines = match tab {
        MenuTab::Contents if session.toc().is_empty() => vec![MenuLine {
            text: i18n.t("menu.no_contents"),
            selected: false,
            dimmed: true,
        }],
        MenuTab::Contents => session
            .toc()
            .iter()
            .enumerate()
            .map(|(i, entry)| MenuLine {
                text: entry.label.clone(),
                selected: i == vs.toc_cursor,
                dimmed: false,
            })
            .collect(),
        MenuTab::Settings => settings_lines(session, i18n),
    };
    let footer = match tab {
        MenuTab::Contents => "↑/↓ select  Enter go  Tab settings  n new book",
        MenuTab::Settings => "s spread  +/- font  [/] line height  Tab contents",
    };
    MenuPanel {
        title: i18n.t("menu.title"),
        tabs: [
            (i18n.t("menu.contents"), tab == MenuTab::Contents),
            (i18n.t("menu.settings"), tab == MenuTab::Settings),
        ],
        lines,
        footer,
    }
}

fn settings_lines(session: &Session, i18n: &Localizer) -> Vec<MenuLine> {
    let s = session.settings();
    let spread = match s.spread {
        Spread::Auto => i18n.t("settings.two_page"),
        Spread::None => i18n.t("settings.single"),
    };
    let mut lines = vec![
        MenuLine {
            text: format!("{}: {spread}", i18n.t("settings.page_view")),
            selected: false,
            dimmed: !session.spread_control_enabled(),
        },
        MenuLine {
            text: format!("{}: {}px", i18n.t("settings.font_size"), s.font_size.px()),
            selected: false,
            dimmed: false,
        },
        MenuLine {
            text: format!("{}: {}", i18n.t("settings.line_height"), s.line_height),
            selected: false,
            dimmed: false,
        },
    ];
    if !session.spread_control_enabled() {
        lines.push(MenuLine {
            text: i18n.t("settings.spread_disabled"),
            selected: false,
            dimmed: true,
        });
    }
    lines
}

fn status_line(
    session: &Session,
    vs: &ViewerState,
    i18n: &Localizer,
    title: &str,
) -> String {
    if let Some(msg) = &vs.flash {
        return format!(" {title} | {msg}");
    }
    let total = if session.locations_ready() {
        session.total_pages().to_string()
    } else {
        "...".to_string()
    };
    if vs.mode == ViewerMode::PageInput {
        return format!(
            " {}: {}_ / {total}  [Enter go  Esc done]",
            i18n.t("reader.go_to_page"),
            session.page_input()
        );
    }
    let page = i18n.t_with(
        "reader.page_of",
        &[("current", &session.current_page()), ("total", &total)],
    );
    let s = session.settings();
    let prev = if session.can_go(Direction::Prev) { "←" } else { " " };
    let next = if session.can_go(Direction::Next) { "→" } else { " " };
    format!(
        " {title} | {prev} {page} {next} | {}px {} {} | [t:menu g:page +/- [/] q:quit]",
        s.font_size.px(),
        s.line_height,
        s.spread,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReaderConfig;
    use crate::engine::RenderingEngine;
    use crate::engine::scripted::{BookManifest, EngineCall};
    use crossterm::event::{KeyCode, KeyModifiers};

    fn reading() -> (Session, ViewerState, Localizer) {
        let mut session = ReadingSession::new(
            ScriptedEngine::new(),
            DisplayTarget::new("viewer"),
            ReaderConfig::default(),
            theme::get(theme::DEFAULT_THEME).unwrap(),
        );
        session
            .load_bytes(BookManifest::uniform("T", 10, 3300).to_bytes())
            .unwrap();
        session.pump();
        let mut vs = ViewerState::new();
        vs.mode = ViewerMode::Reading;
        (session, vs, Localizer::new(None))
    }

    fn press(code: KeyCode, session: &mut Session, vs: &mut ViewerState, i18n: &Localizer) {
        let quit = handle_key(KeyEvent::new(code, KeyModifiers::NONE), session, vs, i18n);
        assert!(!quit);
    }

    fn type_page(text: &str, session: &mut Session, vs: &mut ViewerState, i18n: &Localizer) {
        press(KeyCode::Char('g'), session, vs, i18n);
        assert_eq!(vs.mode, ViewerMode::PageInput);
        for c in text.chars() {
            press(KeyCode::Char(c), session, vs, i18n);
        }
    }

    #[test]
    fn rejected_page_number_only_resets_field() {
        let (mut session, mut vs, i18n) = reading();
        type_page("999", &mut session, &mut vs, &i18n);
        press(KeyCode::Enter, &mut session, &mut vs, &i18n);
        assert_eq!(vs.flash, None);
        assert_eq!(session.page_input(), "1");
        assert!(session.take_notices().is_empty());
    }

    #[test]
    fn esc_in_page_box_cancels_without_moving() {
        let (mut session, mut vs, i18n) = reading();
        type_page("12", &mut session, &mut vs, &i18n);
        session.open_menu(MenuTab::Contents);
        session.engine_mut().take_calls();

        press(KeyCode::Esc, &mut session, &mut vs, &i18n);
        session.pump();
        assert_eq!(vs.mode, ViewerMode::Reading);
        assert!(!session.menu_open());
        assert_eq!(session.page_input(), "1");
        assert_eq!(session.current_page(), 1);
        assert!(
            !session
                .engine()
                .calls()
                .iter()
                .any(|c| matches!(c, EngineCall::Display(_)))
        );
    }

    #[test]
    fn tab_in_page_box_submits() {
        let (mut session, mut vs, i18n) = reading();
        type_page("12", &mut session, &mut vs, &i18n);
        press(KeyCode::Tab, &mut session, &mut vs, &i18n);
        session.pump();
        assert_eq!(vs.mode, ViewerMode::Reading);
        assert_eq!(session.current_page(), 12);
    }

    #[test]
    fn loading_overlay_follows_preparing_phase() {
        let mut session = ReadingSession::new(
            ScriptedEngine::new(),
            DisplayTarget::new("viewer"),
            ReaderConfig::default(),
            theme::get(theme::DEFAULT_THEME).unwrap(),
        );
        assert!(!shows_loading_overlay(&session));
        session
            .load_bytes(BookManifest::uniform("T", 2, 3300).to_bytes())
            .unwrap();
        assert!(shows_loading_overlay(&session));

        // first render alone is not enough
        while !session.is_rendered() {
            let event = session.engine_mut().poll_event().unwrap();
            session.handle_event(event);
        }
        assert!(!session.locations_ready());
        assert!(shows_loading_overlay(&session));

        session.pump();
        assert!(!shows_loading_overlay(&session));
    }

    #[test]
    fn failed_load_flash_mentions_manifest_format() {
        let (mut session, mut vs, i18n) = reading();
        let _ = session.load_bytes(b"PK\x03\x04".to_vec());
        session.pump();
        assert!(collect_notices(&mut session, &mut vs, &i18n));
        let flash = vs.flash.unwrap();
        assert!(flash.starts_with("Error loading book"), "{flash}");
        assert!(flash.contains("TOML"), "{flash}");
    }
}
