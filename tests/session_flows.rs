use std::io::{self, Read};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use folio::config::ReaderConfig;
use folio::engine::scripted::{BookManifest, EngineCall, ScriptedEngine};
use folio::engine::{
    Cfi, DisplayTarget, EngineEvent, EventKind, EventPayload, Generation, ListenerId, Location,
    Spread,
};
use folio::session::{Direction, FontSize, LineHeight, LocationIndex, Notice, Phase, ReadingSession};
use folio::{NavigationInputError, RenderingEngine, SessionError, theme};

const TEN_CHAPTERS: &[u8] = include_bytes!("fixtures/ten_chapters.toml");

fn session() -> ReadingSession<ScriptedEngine> {
    ReadingSession::new(
        ScriptedEngine::new(),
        DisplayTarget::new("viewer"),
        ReaderConfig::default(),
        theme::get(theme::DEFAULT_THEME).expect("default theme should exist"),
    )
}

/// Load the ten-chapter fixture and drain every notification.
fn reading_session() -> ReadingSession<ScriptedEngine> {
    let mut s = session();
    s.load_bytes(TEN_CHAPTERS.to_vec()).expect("fixture should load");
    s.pump();
    assert_eq!(s.phase(), Phase::Reading);
    s
}

fn press(s: &mut ReadingSession<ScriptedEngine>, c: char) {
    s.handle_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE), false);
}

#[test]
fn test_contents_lists_every_chapter() {
    let s = reading_session();
    assert_eq!(s.title(), Some("Ten Chapters"));
    let toc = s.toc();
    assert_eq!(toc.len(), 10);
    assert_eq!(toc[0].label, "Loomings");
    assert_eq!(toc[9].href, "text/ch10.xhtml");
    // 3300 characters per chapter, one location every 1650
    assert_eq!(s.total_pages(), 20);
    assert_eq!(s.current_page(), 1);
    assert_eq!(s.page_input(), "1");
}

#[test]
fn test_contents_entry_closes_menu_and_moves() {
    let mut s = reading_session();
    press(&mut s, 't');
    assert!(s.menu_open());

    assert!(s.go_to_toc_index(4));
    assert!(!s.menu_open(), "choosing an entry should close the menu");
    s.pump();
    // chapter 5 starts at location 8
    assert_eq!(s.current_page(), 9);
    assert_eq!(s.page_input(), "9");
    let rendition = s.rendition().expect("rendition should exist");
    let view = s.engine().view(rendition).expect("view should exist");
    assert_eq!(view.chapter_label, "Breakfast");
}

#[test]
fn test_font_size_keys_clamp_at_max() {
    let mut s = reading_session();
    s.engine_mut().take_calls();
    for _ in 0..12 {
        press(&mut s, '+');
    }
    assert_eq!(s.settings().font_size, FontSize::MAX);
    assert_eq!(s.settings().font_size.px(), 36);

    // Unchanged values are not pushed again.
    let overrides: Vec<String> = s
        .engine()
        .calls()
        .iter()
        .filter_map(|c| match c {
            EngineCall::OverrideStyle { property, value } if property == "font-size" => {
                Some(value.clone())
            }
            _ => None,
        })
        .collect();
    assert_eq!(overrides.len(), 9);
    assert_eq!(overrides.last().map(String::as_str), Some("36px"));
}

#[test]
fn test_line_height_keys_clamp_at_min() {
    let mut s = reading_session();
    for _ in 0..8 {
        press(&mut s, '[');
    }
    assert_eq!(s.settings().line_height, LineHeight::MIN);
    assert_eq!(s.settings().line_height.to_string(), "1.2");

    let rendition = s.rendition().expect("rendition should exist");
    let view = s.engine().view(rendition).expect("view should exist");
    assert!((view.line_height - 1.2).abs() < 1e-9);
}

#[test]
fn test_shortcuts_ignored_while_page_box_focused() {
    let mut s = reading_session();
    let plus = KeyEvent::new(KeyCode::Char('+'), KeyModifiers::NONE);
    assert_eq!(s.handle_key(plus, true), None);
    assert_eq!(s.settings().font_size, FontSize::default());
}

#[test]
fn test_mobile_viewport_forces_single_page() {
    let mut s = reading_session();
    assert_eq!(s.settings().spread, Spread::Auto);
    assert!(s.spread_control_enabled());

    s.set_viewport_width(500);
    assert!(s.is_mobile());
    assert_eq!(s.settings().spread, Spread::None);
    assert!(!s.spread_control_enabled());
    assert!(!s.set_spread(Spread::Auto), "auto must be refused on mobile");
    assert_eq!(s.settings().spread, Spread::None);

    // Growing back does not restore two-page mode.
    s.set_viewport_width(1280);
    assert!(s.spread_control_enabled());
    assert_eq!(s.settings().spread, Spread::None);
}

#[test]
fn test_load_on_narrow_viewport_renders_single_page() {
    let mut s = session();
    s.set_viewport_width(500);
    s.load_bytes(TEN_CHAPTERS.to_vec()).expect("fixture should load");
    s.pump();

    assert_eq!(s.settings().spread, Spread::None);
    let spreads: Vec<Spread> = s
        .engine()
        .calls()
        .iter()
        .filter_map(|c| match c {
            EngineCall::RenderTo { spread, .. } => Some(*spread),
            _ => None,
        })
        .collect();
    assert_eq!(spreads, vec![Spread::None]);
}

#[test]
fn test_spread_change_redisplays_retained_position() {
    let mut s = reading_session();
    assert!(s.go_to_adjacent(Direction::Next));
    s.pump();
    let cfi = s.last_cfi().cloned().expect("position should be retained");
    assert_ne!(cfi.as_str(), "epubcfi(/6/2!/4/1:0)");

    s.engine_mut().take_calls();
    assert!(s.set_spread(Spread::None));
    assert_eq!(
        s.engine().calls(),
        &[
            EngineCall::SetSpread(Spread::None),
            EngineCall::Display(Some(cfi.as_str().to_string())),
        ]
    );
}

#[test]
fn test_second_load_mid_build_replaces_first() {
    let mut s = session();
    s.load_bytes(TEN_CHAPTERS.to_vec()).expect("fixture should load");

    // Let the first book report ready and start indexing, then switch books.
    let ready = s.engine_mut().poll_event().expect("ready should be queued");
    assert!(s.handle_event(ready));
    assert!(matches!(s.location_index(), LocationIndex::Building { .. }));

    let second = BookManifest::uniform("Second", 4, 1650);
    s.load_bytes(second.to_bytes()).expect("second book should load");
    s.pump();

    assert_eq!(s.phase(), Phase::Reading);
    assert_eq!(s.title(), Some("Second"));
    assert_eq!(s.toc().len(), 4);
    assert_eq!(s.total_pages(), 4);
    assert_eq!(s.current_page(), 1);
    assert_eq!(s.engine().live_books(), 1);
    assert_eq!(s.engine().live_renditions(), 1);
}

#[test]
fn test_stale_notifications_are_dropped() {
    let mut s = reading_session();
    let current = s.generation();
    let bogus_end = Location {
        start: Some(Cfi::new("epubcfi(/6/20!/4/1:1650)")),
        at_start: false,
        at_end: true,
    };

    let stale = EngineEvent {
        listener: ListenerId {
            generation: Generation(current.0 - 1),
            slot: 1,
        },
        payload: EventPayload::Relocated(bogus_end.clone()),
    };
    assert!(!s.handle_event(stale));

    let unknown = EngineEvent {
        listener: ListenerId {
            generation: current,
            slot: 9999,
        },
        payload: EventPayload::Relocated(bogus_end),
    };
    assert!(!s.handle_event(unknown));

    assert!(!s.at_end());
    assert_eq!(s.current_page(), 1);
}

#[test]
fn test_teardown_order() {
    let mut s = reading_session();
    let rendition = s.rendition().expect("rendition should exist");
    let book = s.book().expect("book should exist");
    let listeners = s.listener_count();
    assert!(listeners > 0);
    assert_eq!(s.engine().listener_count(), listeners);

    s.engine_mut().take_calls();
    s.close_book();
    let calls = s.engine().calls();
    assert_eq!(calls.len(), listeners + 2);
    assert!(calls[..listeners].iter().all(|c| matches!(c, EngineCall::Off(_))));
    assert_eq!(calls[listeners], EngineCall::DestroyRendition(rendition));
    assert_eq!(calls[listeners + 1], EngineCall::DestroyBook(book));

    assert_eq!(s.phase(), Phase::Idle);
    assert_eq!(s.listener_count(), 0);
    assert_eq!(s.engine().listener_count(), 0);
}

#[test]
fn test_rendered_handled_once() {
    let mut s = reading_session();
    assert!(s.is_rendered());
    let rendered_subs = s
        .engine()
        .calls()
        .iter()
        .filter(|c| **c == EngineCall::On(EventKind::Rendered))
        .count();
    assert_eq!(rendered_subs, 1);

    assert!(s.go_to_adjacent(Direction::Next));
    // Only the relocation reaches the session.
    assert_eq!(s.pump(), 1);
}

#[test]
fn test_page_number_round_trip() {
    let mut s = reading_session();
    let total = s.total_pages();
    for n in 1..=total {
        s.go_to_page_number(&n.to_string())
            .unwrap_or_else(|e| panic!("page {n} should resolve: {e}"));
        s.pump();
        assert_eq!(s.current_page(), n, "after jumping to page {n}");
    }
    assert!(s.at_end());
}

#[test]
fn test_invalid_page_input_restores_field() {
    let mut s = reading_session();
    s.go_to_page_number("5").expect("page 5 should resolve");
    s.pump();
    assert_eq!(s.current_page(), 5);

    for input in ["0", "21", "-3", "abc", "", "4.5"] {
        s.set_page_input(input);
        let err = s.submit_page_input().expect_err("input should be rejected");
        assert!(
            matches!(err, SessionError::NavigationInput(_)),
            "'{input}' gave {err:?}"
        );
        assert_eq!(s.page_input(), "5", "field not restored after '{input}'");
        assert_eq!(s.current_page(), 5);
    }
    assert!(s.notices().is_empty(), "bad input must not raise notices");

    assert!(matches!(
        s.go_to_page_number("21"),
        Err(SessionError::NavigationInput(NavigationInputError::OutOfRange {
            page: 21,
            total: 20
        }))
    ));
    // surrounding whitespace is fine
    s.go_to_page_number(" 7 ").expect("trimmed input should resolve");
}

#[test]
fn test_page_input_needs_index() {
    let mut s = session();
    s.load_bytes(TEN_CHAPTERS.to_vec()).expect("fixture should load");
    assert!(!s.page_input_enabled());
    assert!(matches!(
        s.go_to_page_number("1"),
        Err(SessionError::NavigationInput(NavigationInputError::IndexNotReady))
    ));
}

#[test]
fn test_boundaries_are_no_ops() {
    let mut s = reading_session();
    assert!(s.at_start());
    assert!(!s.can_go(Direction::Prev));
    s.engine_mut().take_calls();
    assert!(!s.go_to_adjacent(Direction::Prev));
    assert!(s.engine().calls().is_empty());

    s.go_to_page_number("20").expect("last page should resolve");
    s.pump();
    assert!(s.at_end());
    assert!(!s.can_go(Direction::Next));
    s.engine_mut().take_calls();
    assert!(!s.go_to_adjacent(Direction::Next));
    assert!(s.engine().calls().is_empty());
}

#[test]
fn test_swipes_turn_pages() {
    let mut s = reading_session();
    let rendition = s.rendition().expect("rendition should exist");

    let engine = s.engine_mut();
    engine.touch(rendition, EventKind::TouchStart, 400.0, 200.0);
    engine.touch(rendition, EventKind::TouchMove, 250.0, 210.0);
    engine.touch(rendition, EventKind::TouchEnd, 250.0, 210.0);
    s.pump();
    // two-page spread: 2400 characters forward lands in location 2
    assert_eq!(s.current_page(), 2);

    // mostly vertical: a scroll, not a page turn
    let engine = s.engine_mut();
    engine.touch(rendition, EventKind::TouchStart, 400.0, 100.0);
    engine.touch(rendition, EventKind::TouchMove, 330.0, 300.0);
    engine.touch(rendition, EventKind::TouchEnd, 330.0, 300.0);
    s.pump();
    assert_eq!(s.current_page(), 2);

    let engine = s.engine_mut();
    engine.touch(rendition, EventKind::TouchStart, 100.0, 200.0);
    engine.touch(rendition, EventKind::TouchMove, 300.0, 200.0);
    engine.touch(rendition, EventKind::TouchEnd, 300.0, 200.0);
    s.pump();
    assert_eq!(s.current_page(), 1);
    assert!(s.at_start());
}

#[test]
fn test_index_failure_tears_down() {
    let mut manifest = BookManifest::uniform("Broken", 3, 3300);
    manifest.fail_locations = true;

    let mut s = session();
    s.load_bytes(manifest.to_bytes()).expect("bytes should be accepted");
    s.pump();

    assert_eq!(s.phase(), Phase::Idle);
    assert_eq!(s.take_notices(), vec![Notice::BOOK_LOAD]);
    assert_eq!(s.engine().live_books(), 0);
    assert_eq!(s.engine().live_renditions(), 0);
    assert_eq!(s.engine().listener_count(), 0);
}

struct FailingReader;

impl Read for FailingReader {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::other("device unplugged"))
    }
}

#[test]
fn test_unreadable_file_raises_notice() {
    let mut s = session();
    let err = s.load_file(FailingReader).expect_err("read should fail");
    assert!(matches!(err, SessionError::FileRead(_)));
    assert_eq!(s.take_notices(), vec![Notice::FILE_READ]);
    assert_eq!(s.phase(), Phase::Idle);
    assert!(s.engine().calls().iter().all(|c| !matches!(c, EngineCall::OpenBook(_))));
}

#[test]
fn test_new_load_resets_settings() {
    let mut s = reading_session();
    press(&mut s, '+');
    press(&mut s, ']');
    assert_ne!(s.settings().font_size, FontSize::default());

    s.load_bytes(TEN_CHAPTERS.to_vec()).expect("fixture should load");
    s.pump();
    assert_eq!(s.settings().font_size, FontSize::default());
    assert_eq!(s.settings().line_height, LineHeight::default());
    assert_eq!(s.current_page(), 1);
}
