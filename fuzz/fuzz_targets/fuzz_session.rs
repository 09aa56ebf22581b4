#![no_main]

use libfuzzer_sys::fuzz_target;

use folio::config::ReaderConfig;
use folio::engine::scripted::{BookManifest, ScriptedEngine};
use folio::engine::{DisplayTarget, EventKind, Spread};
use folio::input::Action;
use folio::session::{Direction, ReadingSession};
use folio::theme;

const ACTIONS: [Action; 8] = [
    Action::NextPage,
    Action::PrevPage,
    Action::ToggleMenu,
    Action::FontSizeUp,
    Action::FontSizeDown,
    Action::LineHeightUp,
    Action::LineHeightDown,
    Action::CloseOverlays,
];

// Each byte is one user or engine step against a small book. Whatever the
// order, the session must keep its page counter inside the index and never
// leak engine objects.
fuzz_target!(|data: &[u8]| {
    let Some(theme) = theme::get(theme::DEFAULT_THEME) else {
        return;
    };
    let mut session = ReadingSession::new(
        ScriptedEngine::new(),
        DisplayTarget::new("fuzz"),
        ReaderConfig::default(),
        theme,
    );
    let book = BookManifest::uniform("Fuzz", 3, 2000).to_bytes();

    for &op in data {
        let arg = op >> 4;
        match op & 0x0f {
            0 => {
                let _ = session.load_bytes(book.clone());
            }
            1 => session.close_book(),
            2 => {
                session.pump();
            }
            3 => {
                // Deliver one notification at a time to interleave with user steps.
                if let Some(event) = session.engine_mut().poll_event() {
                    session.handle_event(event);
                }
            }
            4 => session.apply_action(ACTIONS[arg as usize % ACTIONS.len()]),
            5 => {
                let _ = session.go_to_page_number(&(arg as i64 - 2).to_string());
            }
            6 => {
                session.go_to_toc_index(arg as usize);
            }
            7 => session.set_viewport_width(300 + arg as u32 * 100),
            8 => {
                let spread = if arg % 2 == 0 { Spread::Auto } else { Spread::None };
                session.set_spread(spread);
            }
            9 => {
                if let Some(rendition) = session.rendition() {
                    let x = arg as f64 * 40.0;
                    let engine = session.engine_mut();
                    engine.touch(rendition, EventKind::TouchStart, 300.0, 200.0);
                    engine.touch(rendition, EventKind::TouchMove, x, 200.0);
                    engine.touch(rendition, EventKind::TouchEnd, x, 200.0);
                }
            }
            10 => {
                let direction = if arg % 2 == 0 { Direction::Next } else { Direction::Prev };
                session.go_to_adjacent(direction);
            }
            _ => {}
        }

        assert!(session.current_page() <= session.total_pages());
        assert!(session.engine().live_books() <= 1);
        assert!(session.engine().live_renditions() <= 1);
        assert_eq!(session.engine().listener_count(), session.listener_count());
    }
});
